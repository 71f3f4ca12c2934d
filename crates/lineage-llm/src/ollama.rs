//! Ollama Provider Implementation
//!
//! Provides integration with Ollama's local LLM API.
//!
//! # Features
//!
//! - Async HTTP communication with Ollama API
//! - Configurable endpoint, model, temperature and JSON mode
//! - HTTP status mapping onto [`LlmError`] so throttling is retryable
//! - Timeout handling
//!
//! Retries are not performed here; wrap the provider in a
//! [`ResilientInvoker`](crate::ResilientInvoker).
//!
//! # Examples
//!
//! ```no_run
//! use lineage_llm::OllamaProvider;
//!
//! let provider = OllamaProvider::new("http://localhost:11434", "llama3").unwrap();
//! ```

use crate::{LlmError, ModelClient};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default Ollama API endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Default timeout for LLM requests (120 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default sampling temperature
pub const DEFAULT_TEMPERATURE: f64 = 0.5;

/// Settings for [`OllamaProvider`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// API endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model to use (e.g. "llama3", "mistral")
    pub model: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Ask Ollama to constrain output to JSON
    #[serde(default = "default_json_mode")]
    pub json_mode: bool,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

fn default_json_mode() -> bool {
    true
}

impl OllamaConfig {
    /// Configuration for `model` at the default endpoint
    pub fn for_model(model: impl Into<String>) -> Self {
        Self {
            endpoint: default_endpoint(),
            model: model.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            temperature: DEFAULT_TEMPERATURE,
            json_mode: true,
        }
    }
}

/// Ollama API provider for local LLM inference
pub struct OllamaProvider {
    config: OllamaConfig,
    client: reqwest::Client,
}

/// Request body for Ollama generate API
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f64,
}

/// Response from Ollama generate API
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
    #[allow(dead_code)]
    done: bool,
}

impl OllamaProvider {
    /// Create a new Ollama provider with default settings for `model`
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        let mut config = OllamaConfig::for_model(model);
        config.endpoint = endpoint.into();
        Self::from_config(config)
    }

    /// Create a provider from explicit settings
    pub fn from_config(config: OllamaConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Communication(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Provider settings
    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    /// Generate text using Ollama API
    ///
    /// # Errors
    ///
    /// - `RateLimitExceeded` on HTTP 429 or 503
    /// - `ModelNotAvailable` on HTTP 404
    /// - `Communication` on other HTTP or network failures
    /// - `InvalidResponse` when the body cannot be decoded
    pub async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.config.endpoint.trim_end_matches('/'));

        let request_body = OllamaGenerateRequest {
            model: &self.config.model,
            prompt,
            stream: false,
            format: self.config.json_mode.then_some("json"),
            options: OllamaOptions {
                temperature: self.config.temperature,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| LlmError::Communication(format!("Request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            let body = response
                .json::<OllamaGenerateResponse>()
                .await
                .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;
            return Ok(body.response.trim().to_string());
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        Err(match status {
            reqwest::StatusCode::NOT_FOUND => LlmError::ModelNotAvailable(self.config.model.clone()),
            reqwest::StatusCode::TOO_MANY_REQUESTS | reqwest::StatusCode::SERVICE_UNAVAILABLE => {
                LlmError::RateLimitExceeded(format!("HTTP {}: {}", status, error_text))
            }
            _ => LlmError::Communication(format!("HTTP {}: {}", status, error_text)),
        })
    }
}

#[async_trait]
impl ModelClient for OllamaProvider {
    async fn invoke_model(&self, prompt: &str) -> Result<String, LlmError> {
        self.generate(prompt).await
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ollama_provider_creation() {
        let provider = OllamaProvider::new("http://localhost:11434", "llama2").unwrap();
        assert_eq!(provider.config.endpoint, "http://localhost:11434");
        assert_eq!(provider.model_name(), "llama2");
        assert!(provider.config.json_mode);
    }

    #[test]
    fn test_config_defaults_from_toml() {
        let config: OllamaConfig = toml::from_str(r#"model = "mistral""#).unwrap();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.temperature, DEFAULT_TEMPERATURE);
    }

    #[test]
    fn test_request_body_shape() {
        let body = OllamaGenerateRequest {
            model: "llama3",
            prompt: "hi",
            stream: false,
            format: Some("json"),
            options: OllamaOptions { temperature: 0.5 },
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["format"], "json");
        assert_eq!(value["options"]["temperature"], 0.5);
        assert_eq!(value["stream"], false);
    }

    // Integration tests (requires running Ollama)
    #[tokio::test]
    #[ignore] // Only run when Ollama is available
    async fn test_ollama_generate_integration() {
        let provider = OllamaProvider::new(DEFAULT_ENDPOINT, "llama3").unwrap();
        let result = provider.generate("Say 'hello' and nothing else").await;

        if let Ok(response) = result {
            assert!(!response.is_empty());
        }
    }

    #[tokio::test]
    async fn test_ollama_error_handling() {
        // Use invalid endpoint to trigger error
        let provider = OllamaProvider::new("http://localhost:99999", "llama2").unwrap();

        let result = provider.generate("test").await;

        match result {
            Err(LlmError::Communication(_)) => {} // Expected
            other => panic!("Expected Communication error, got {:?}", other.map(|_| ())),
        }
        assert!(!LlmError::Communication("connection refused".into()).is_transient());
    }
}
