//! Lineage LLM Provider Layer
//!
//! Pluggable text-generation backends behind the [`ModelClient`] trait, plus
//! the resilient invoker that retries throttled calls.
//!
//! # Architecture
//!
//! Providers only perform a single round trip and report failures as
//! [`LlmError`]. Retry policy lives in [`ResilientInvoker`], which classifies
//! each error as transient (throttling) or fatal and backs off accordingly.
//!
//! # Providers
//!
//! - `MockProvider`: Deterministic mock for testing
//! - `OllamaProvider`: Local Ollama API integration
//!
//! # Examples
//!
//! ```
//! use lineage_llm::{MockProvider, ModelClient};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let provider = MockProvider::new("Hello from LLM!");
//! let result = provider.invoke_model("test prompt").await.unwrap();
//! assert_eq!(result, "Hello from LLM!");
//! # });
//! ```

#![warn(missing_docs)]

pub mod ollama;
pub mod retry;

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use thiserror::Error;

pub use ollama::{OllamaConfig, OllamaProvider};
pub use retry::{InvokeError, ResilientInvoker, RetryPolicy, Sleeper, TokioSleeper};

/// Error message fragments that identify throttling
const THROTTLE_SIGNATURES: &[&str] = &[
    "throttl",
    "rate limit",
    "rate exceeded",
    "ratelimit",
    "too many requests",
];

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from LLM
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

impl LlmError {
    /// Whether the error is a throttling signal worth retrying
    ///
    /// Rate limit errors always are; communication and generic errors are
    /// when their message carries a throttling signature.
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::RateLimitExceeded(_) => true,
            LlmError::Communication(msg) | LlmError::Other(msg) => looks_throttled(msg),
            LlmError::InvalidResponse(_) | LlmError::ModelNotAvailable(_) => false,
        }
    }
}

fn looks_throttled(message: &str) -> bool {
    let lower = message.to_lowercase();
    THROTTLE_SIGNATURES.iter().any(|sig| lower.contains(sig))
}

/// A text-generation model reachable over some transport
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send `prompt` and return the generated text
    async fn invoke_model(&self, prompt: &str) -> Result<String, LlmError>;

    /// Name of the model behind this client
    fn model_name(&self) -> &str;
}

/// Mock LLM provider for deterministic testing
///
/// This provider returns pre-configured responses without making any network calls.
/// Scripted results are consumed first, in order; after that, the first
/// registered fragment contained in the prompt selects the response, and
/// anything else gets the default response.
///
/// # Examples
///
/// ```
/// use lineage_llm::{LlmError, MockProvider, ModelClient};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let mut provider = MockProvider::default();
/// provider.add_response("orders", "{\"lineageNodes\": []}");
/// provider.push_error(LlmError::RateLimitExceeded("slow down".into()));
///
/// assert!(provider.invoke_model("entity orders").await.is_err());
/// assert_eq!(provider.invoke_model("entity orders").await.unwrap(), "{\"lineageNodes\": []}");
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    responses: Arc<Mutex<Vec<(String, MockReply)>>>,
    script: Arc<Mutex<VecDeque<Result<String, LlmError>>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

#[derive(Debug, Clone)]
enum MockReply {
    Text(String),
    Fatal,
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            responses: Arc::new(Mutex::new(Vec::new())),
            script: Arc::new(Mutex::new(VecDeque::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Return `response` for any prompt containing `fragment`
    pub fn add_response(&mut self, fragment: impl Into<String>, response: impl Into<String>) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push((fragment.into(), MockReply::Text(response.into())));
        }
    }

    /// Fail with a fatal error for any prompt containing `fragment`
    pub fn add_error(&mut self, fragment: impl Into<String>) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push((fragment.into(), MockReply::Fatal));
        }
    }

    /// Queue a successful result ahead of fragment matching
    pub fn push_response(&self, response: impl Into<String>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Ok(response.into()));
        }
    }

    /// Queue an error ahead of fragment matching
    pub fn push_error(&self, error: LlmError) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Err(error));
        }
    }

    /// Get the number of times the model was invoked
    pub fn call_count(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or(0)
    }

    /// Prompts received so far, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// Reset the call history
    pub fn reset_call_count(&self) {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.clear();
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

#[async_trait]
impl ModelClient for MockProvider {
    async fn invoke_model(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts
            .lock()
            .map_err(|e| LlmError::Other(format!("Mock lock error: {}", e)))?
            .push(prompt.to_string());

        let scripted = self
            .script
            .lock()
            .map_err(|e| LlmError::Other(format!("Mock lock error: {}", e)))?
            .pop_front();
        if let Some(result) = scripted {
            return result;
        }

        let responses = self
            .responses
            .lock()
            .map_err(|e| LlmError::Other(format!("Mock lock error: {}", e)))?;
        match responses.iter().find(|(fragment, _)| prompt.contains(fragment.as_str())) {
            Some((_, MockReply::Text(response))) => Ok(response.clone()),
            Some((_, MockReply::Fatal)) => Err(LlmError::Other("Mock error".to_string())),
            None => Ok(self.default_response.clone()),
        }
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}
