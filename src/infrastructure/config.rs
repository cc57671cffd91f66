use std::collections::HashSet;
use std::path::PathBuf;
use std::str::FromStr;

use crate::application::agent::orchestrator::{AgentMode, DEFAULT_MAX_ITERATIONS};
use crate::application::services::similarity_search::{DEFAULT_MIN_SIMILARITY, DEFAULT_TOP_K};
use crate::domain::value_objects::keyword_query::default_stop_words;

const DEFAULT_CHUNK_MAX_CHARS: usize = 900;
const DEFAULT_EMBEDDING_DIMENSION: usize = 768;
const DEFAULT_PORT: u16 = 3000;

#[derive(Debug)]
pub enum ConfigError {
    Missing(String),
    Invalid { key: String, reason: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} must be set", key),
            ConfigError::Invalid { key, reason } => write!(f, "Invalid {}: {}", key, reason),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogBackend {
    Postgres,
    Memory,
}

impl CatalogBackend {
    pub fn from_string(s: &str) -> Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(CatalogBackend::Postgres),
            "memory" => Ok(CatalogBackend::Memory),
            other => Err(format!("expected postgres or memory, got {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend: CatalogBackend,
    pub database_url: Option<String>,
    pub catalog_seed_path: Option<PathBuf>,
    pub embeddings_service_url: String,
    pub embedding_model: String,
    pub embedding_dimension: usize,
    pub chunk_max_chars: usize,
    pub retrieval_top_k: usize,
    pub retrieval_min_similarity: f32,
    pub stop_words: HashSet<String>,
    pub llm_base_url: String,
    pub llm_api_key: Option<String>,
    pub agent_settings_path: PathBuf,
    pub agent_max_iterations: usize,
    pub agent_mode: AgentMode,
    pub port: u16,
}

impl AppConfig {
    /// Reads the process environment. Call `dotenv().ok()` first to pick up `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let backend = match var("CATALOG_BACKEND") {
            Some(raw) => CatalogBackend::from_string(&raw).map_err(|reason| ConfigError::Invalid {
                key: "CATALOG_BACKEND".to_string(),
                reason,
            })?,
            None => CatalogBackend::Postgres,
        };

        let database_url = var("DATABASE_URL");
        if backend == CatalogBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL".to_string()));
        }

        let agent_mode = match var("AGENT_MODE") {
            Some(raw) => AgentMode::from_string(&raw).map_err(|reason| ConfigError::Invalid {
                key: "AGENT_MODE".to_string(),
                reason,
            })?,
            None => AgentMode::Live,
        };

        let stop_words = match var("RETRIEVAL_STOP_WORDS") {
            Some(raw) => raw
                .split(',')
                .map(|word| word.trim().to_lowercase())
                .filter(|word| !word.is_empty())
                .collect(),
            None => default_stop_words(),
        };

        let retrieval_min_similarity: f32 =
            parse_or(&var, "RETRIEVAL_MIN_SIMILARITY", DEFAULT_MIN_SIMILARITY)?;
        if !(retrieval_min_similarity > 0.0 && retrieval_min_similarity <= 1.0) {
            return Err(ConfigError::Invalid {
                key: "RETRIEVAL_MIN_SIMILARITY".to_string(),
                reason: "must be in (0, 1]".to_string(),
            });
        }

        let embedding_dimension = parse_or(&var, "EMBEDDING_DIMENSION", DEFAULT_EMBEDDING_DIMENSION)?;
        let chunk_max_chars = parse_or(&var, "CHUNK_MAX_CHARS", DEFAULT_CHUNK_MAX_CHARS)?;
        let retrieval_top_k = parse_or(&var, "RETRIEVAL_TOP_K", DEFAULT_TOP_K)?;
        for (key, value) in [
            ("EMBEDDING_DIMENSION", embedding_dimension),
            ("CHUNK_MAX_CHARS", chunk_max_chars),
            ("RETRIEVAL_TOP_K", retrieval_top_k),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    key: key.to_string(),
                    reason: "must be greater than zero".to_string(),
                });
            }
        }

        Ok(Self {
            backend,
            database_url,
            catalog_seed_path: var("CATALOG_SEED_PATH").map(PathBuf::from),
            embeddings_service_url: var("EMBEDDINGS_SERVICE_URL")
                .unwrap_or_else(|| "http://localhost:8000".to_string()),
            embedding_model: var("EMBEDDING_MODEL")
                .unwrap_or_else(|| "nomic-embed-text-v1.5".to_string()),
            embedding_dimension,
            chunk_max_chars,
            retrieval_top_k,
            retrieval_min_similarity,
            stop_words,
            llm_base_url: var("LLM_BASE_URL").unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            llm_api_key: var("LLM_API_KEY"),
            agent_settings_path: var("AGENT_SETTINGS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./agent_settings.json")),
            agent_max_iterations: parse_or(&var, "AGENT_MAX_ITERATIONS", DEFAULT_MAX_ITERATIONS)?,
            agent_mode,
            port: parse_or(&var, "PORT", DEFAULT_PORT)?,
        })
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key: key.to_string(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_memory_backend_defaults() {
        let config = config(&[("CATALOG_BACKEND", "memory")]).unwrap();

        assert_eq!(config.backend, CatalogBackend::Memory);
        assert_eq!(config.chunk_max_chars, 900);
        assert_eq!(config.retrieval_top_k, 5);
        assert_eq!(config.retrieval_min_similarity, 0.30);
        assert_eq!(config.agent_max_iterations, 3);
        assert_eq!(config.agent_mode, AgentMode::Live);
        assert!(config.stop_words.contains("the"));
    }

    #[test]
    fn test_postgres_requires_database_url() {
        assert!(matches!(config(&[]), Err(ConfigError::Missing(_))));
        assert!(config(&[("DATABASE_URL", "postgres://localhost/catalog")]).is_ok());
    }

    #[test]
    fn test_stop_words_from_comma_list() {
        let config = config(&[
            ("CATALOG_BACKEND", "memory"),
            ("RETRIEVAL_STOP_WORDS", "Le, la , ,les"),
        ])
        .unwrap();

        let expected: HashSet<String> = ["le", "la", "les"].iter().map(|w| w.to_string()).collect();
        assert_eq!(config.stop_words, expected);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(config(&[("CATALOG_BACKEND", "sqlite")]).is_err());
        assert!(config(&[("CATALOG_BACKEND", "memory"), ("PORT", "http")]).is_err());
        assert!(config(&[("CATALOG_BACKEND", "memory"), ("RETRIEVAL_MIN_SIMILARITY", "0")]).is_err());
        assert!(config(&[("CATALOG_BACKEND", "memory"), ("CHUNK_MAX_CHARS", "0")]).is_err());
        assert!(matches!(
            config(&[("CATALOG_BACKEND", "memory"), ("AGENT_MODE", "verbose")]),
            Err(ConfigError::Invalid { .. })
        ));
    }
}
