use async_trait::async_trait;
use reqwest::{Client, Error as ReqwestError, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::application::ports::embedding_provider::{
    BatchEmbeddingRequest, BatchEmbeddingResponse, EmbeddingProvider, EmbeddingProviderError,
    EmbeddingRequest, EmbeddingResponse, ProviderEmbedding,
};

#[derive(Serialize)]
pub struct EmbeddingsRequest {
    pub text: TextInput,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextInput {
    Single(String),
    Multiple(Vec<String>),
}

/// Service reply; each entry is pooled or per-token depending on the model.
#[derive(Deserialize)]
pub struct EmbeddingsResponse {
    #[serde(default = "default_success")]
    pub success: bool,
    pub embeddings: Vec<ProviderEmbedding>,
    #[serde(default)]
    pub shape: Vec<usize>,
}

fn default_success() -> bool {
    true
}

#[derive(Debug, Clone)]
pub struct EmbeddingsClientConfig {
    pub service_url: String,
    pub model_name: String,
    pub dimension: usize,
    pub max_retries: u32,
    pub timeout_secs: u64,
    pub backoff_factor: f64,
}

impl EmbeddingsClientConfig {
    pub fn new(service_url: String, model_name: String, dimension: usize) -> Self {
        Self {
            service_url,
            model_name,
            dimension,
            max_retries: 3,
            timeout_secs: 30,
            backoff_factor: 1.5,
        }
    }
}

#[derive(Debug)]
pub enum EmbeddingsError {
    RequestError(String),
    ParseError(String),
    RateLimited,
    ServerError(String),
    MaxRetriesExceeded(String),
}

impl std::fmt::Display for EmbeddingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbeddingsError::RequestError(msg) => write!(f, "Request error: {}", msg),
            EmbeddingsError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            EmbeddingsError::RateLimited => write!(f, "Rate limited"),
            EmbeddingsError::ServerError(msg) => write!(f, "Server error: {}", msg),
            EmbeddingsError::MaxRetriesExceeded(msg) => write!(f, "{}", msg),
        }
    }
}

impl EmbeddingsError {
    fn is_retryable(&self) -> bool {
        !matches!(self, EmbeddingsError::ParseError(_))
    }
}

impl From<EmbeddingsError> for EmbeddingProviderError {
    fn from(error: EmbeddingsError) -> Self {
        match error {
            EmbeddingsError::RequestError(msg) => EmbeddingProviderError::NetworkError(msg),
            EmbeddingsError::ParseError(msg) => EmbeddingProviderError::ApiError(msg),
            EmbeddingsError::RateLimited => EmbeddingProviderError::RateLimitExceeded,
            EmbeddingsError::ServerError(_) | EmbeddingsError::MaxRetriesExceeded(_) => {
                EmbeddingProviderError::ServiceUnavailable
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct InferenceClient {
    client: Client,
    config: EmbeddingsClientConfig,
}

impl InferenceClient {
    pub fn new(config: EmbeddingsClientConfig) -> Result<Self, ReqwestError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    pub async fn get_embedding(&self, text: &str) -> Result<EmbeddingsResponse, EmbeddingsError> {
        let request = EmbeddingsRequest {
            text: TextInput::Single(text.to_string()),
            model: Some(self.config.model_name.clone()),
        };

        self.send_request(request).await
    }

    pub async fn get_embeddings(
        &self,
        texts: &[String],
    ) -> Result<EmbeddingsResponse, EmbeddingsError> {
        let request = EmbeddingsRequest {
            text: TextInput::Multiple(texts.to_vec()),
            model: Some(self.config.model_name.clone()),
        };

        self.send_request(request).await
    }

    async fn send_request(
        &self,
        request: EmbeddingsRequest,
    ) -> Result<EmbeddingsResponse, EmbeddingsError> {
        let mut attempts = 0;

        loop {
            attempts += 1;

            match self.execute_request(&request).await {
                Ok(response) => return Ok(response),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    if attempts > self.config.max_retries {
                        return Err(EmbeddingsError::MaxRetriesExceeded(format!(
                            "Gave up after {} attempts: {}",
                            attempts, e
                        )));
                    }

                    let backoff_time = Duration::from_millis(
                        (self.config.backoff_factor.powi(attempts as i32 - 1) * 1000.0) as u64,
                    );
                    tracing::warn!(
                        "Embedding request failed (attempt {}), retrying in {} ms: {}",
                        attempts,
                        backoff_time.as_millis(),
                        e
                    );

                    tokio::time::sleep(backoff_time).await;
                }
            }
        }
    }

    async fn execute_request(
        &self,
        request: &EmbeddingsRequest,
    ) -> Result<EmbeddingsResponse, EmbeddingsError> {
        let response = self
            .client
            .post(&self.config.service_url)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| EmbeddingsError::RequestError(e.without_url().to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(EmbeddingsError::RateLimited);
        }
        if status.is_server_error() {
            return Err(EmbeddingsError::ServerError(status.to_string()));
        }
        if !status.is_success() {
            return Err(EmbeddingsError::ParseError(format!(
                "Embedding service rejected the request with {}",
                status
            )));
        }

        let parsed = response
            .json::<EmbeddingsResponse>()
            .await
            .map_err(|e| EmbeddingsError::ParseError(e.to_string()))?;

        if !parsed.success {
            return Err(EmbeddingsError::ServerError(
                "Embedding service reported failure".to_string(),
            ));
        }

        Ok(parsed)
    }
}

pub struct InferenceEmbeddingProvider {
    client: InferenceClient,
    model_name: String,
    dimension: usize,
}

impl InferenceEmbeddingProvider {
    pub fn new(config: EmbeddingsClientConfig) -> Result<Self, ReqwestError> {
        let model_name = config.model_name.clone();
        let dimension = config.dimension;
        Ok(Self {
            client: InferenceClient::new(config)?,
            model_name,
            dimension,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for InferenceEmbeddingProvider {
    async fn generate_embedding(
        &self,
        request: EmbeddingRequest,
    ) -> Result<EmbeddingResponse, EmbeddingProviderError> {
        let response = self.client.get_embedding(&request.text).await?;

        let embedding = response.embeddings.into_iter().next().ok_or_else(|| {
            EmbeddingProviderError::ApiError("No embeddings returned".to_string())
        })?;

        Ok(EmbeddingResponse {
            embedding,
            model_name: request.model_name.unwrap_or_else(|| self.model_name.clone()),
        })
    }

    async fn generate_embeddings(
        &self,
        request: BatchEmbeddingRequest,
    ) -> Result<BatchEmbeddingResponse, EmbeddingProviderError> {
        if request.texts.is_empty() {
            return Err(EmbeddingProviderError::InvalidInput(
                "No texts to embed".to_string(),
            ));
        }

        let response = self.client.get_embeddings(&request.texts).await?;

        Ok(BatchEmbeddingResponse {
            embeddings: response.embeddings,
            model_name: request.model_name.unwrap_or_else(|| self.model_name.clone()),
        })
    }

    async fn health_check(&self) -> Result<bool, EmbeddingProviderError> {
        let test_request = EmbeddingRequest {
            text: "health check".to_string(),
            model_name: None,
        };

        match self.generate_embedding(test_request).await {
            Ok(_) => Ok(true),
            Err(_) => Ok(false),
        }
    }

    fn model_name(&self) -> String {
        self.model_name.clone()
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }
}
