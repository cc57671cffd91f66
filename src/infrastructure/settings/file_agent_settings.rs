use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::sync::RwLock;

use crate::application::ports::agent_settings::{
    AgentSettings, AgentSettingsError, AgentSettingsSource,
};

struct Cached {
    modified: SystemTime,
    settings: AgentSettings,
}

/// Agent settings kept in a JSON file and re-read whenever its mtime changes.
pub struct FileAgentSettingsSource {
    path: PathBuf,
    cache: RwLock<Option<Cached>>,
}

impl FileAgentSettingsSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<AgentSettings, AgentSettingsError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| AgentSettingsError::Unavailable(format!("{}: {}", self.path.display(), e)))?;

        let settings: AgentSettings = serde_json::from_str(&raw)
            .map_err(|e| AgentSettingsError::Invalid(e.to_string()))?;

        if settings.system_prompt.trim().is_empty() {
            return Err(AgentSettingsError::Invalid(
                "systemPrompt must not be empty".to_string(),
            ));
        }
        if settings.model.trim().is_empty() {
            return Err(AgentSettingsError::Invalid("model must not be empty".to_string()));
        }

        Ok(settings)
    }
}

#[async_trait]
impl AgentSettingsSource for FileAgentSettingsSource {
    async fn current(&self) -> Result<AgentSettings, AgentSettingsError> {
        let modified = tokio::fs::metadata(&self.path)
            .await
            .and_then(|meta| meta.modified())
            .map_err(|e| AgentSettingsError::Unavailable(format!("{}: {}", self.path.display(), e)))?;

        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.modified == modified {
                    return Ok(cached.settings.clone());
                }
            }
        }

        let settings = self.load().await?;
        tracing::info!(
            "Loaded agent settings from {} (model {})",
            self.path.display(),
            settings.model
        );

        let mut cache = self.cache.write().await;
        *cache = Some(Cached {
            modified,
            settings: settings.clone(),
        });
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("{}-{}.json", name, uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_reads_settings_with_defaults() {
        let path = temp_path("agent-settings");
        tokio::fs::write(&path, r#"{"systemPrompt":"You sell wine.","model":"gpt-test"}"#)
            .await
            .unwrap();

        let source = FileAgentSettingsSource::new(&path);
        let settings = source.current().await.unwrap();

        assert_eq!(settings.system_prompt, "You sell wine.");
        assert_eq!(settings.max_tokens, 1024);
        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn test_reloads_after_modification() {
        let path = temp_path("agent-settings-reload");
        tokio::fs::write(&path, r#"{"systemPrompt":"First.","model":"a"}"#)
            .await
            .unwrap();
        let source = FileAgentSettingsSource::new(&path);
        assert_eq!(source.current().await.unwrap().system_prompt, "First.");

        tokio::time::sleep(Duration::from_millis(20)).await;
        tokio::fs::write(&path, r#"{"systemPrompt":"Second.","model":"b"}"#)
            .await
            .unwrap();
        let file = std::fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(5))
            .unwrap();

        let settings = source.current().await.unwrap();
        assert_eq!(settings.system_prompt, "Second.");
        assert_eq!(settings.model, "b");
        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn test_missing_file_is_unavailable() {
        let source = FileAgentSettingsSource::new(temp_path("missing"));
        assert!(matches!(
            source.current().await,
            Err(AgentSettingsError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_prompt_is_invalid() {
        let path = temp_path("agent-settings-empty");
        tokio::fs::write(&path, r#"{"systemPrompt":"  ","model":"a"}"#)
            .await
            .unwrap();

        let source = FileAgentSettingsSource::new(&path);
        assert!(matches!(
            source.current().await,
            Err(AgentSettingsError::Invalid(_))
        ));
        let _ = tokio::fs::remove_file(&path).await;
    }
}
