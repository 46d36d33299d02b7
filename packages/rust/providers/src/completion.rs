//! Generative text capability.
//!
//! Whatever comes back from a model is untrusted text; callers route it
//! through `bibresolve_textparse` before using it.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, instrument};

use bibresolve_shared::{AppConfig, BibError, Result, completion_api_key};
use bibresolve_textparse::extract_generated_text;

use crate::transport::{HttpRequest, RequestExecutor};

/// Produces free text for a system/user prompt pair.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

/// OpenAI-compatible chat-completions client (OpenRouter by default).
pub struct ChatCompletionClient {
    executor: Arc<dyn RequestExecutor>,
    endpoint: String,
    model: String,
    api_key: String,
}

impl ChatCompletionClient {
    pub fn new(
        executor: Arc<dyn RequestExecutor>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            executor,
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    /// Build from `[completion]`, reading the API key from its env var.
    pub fn from_config(executor: Arc<dyn RequestExecutor>, config: &AppConfig) -> Result<Self> {
        let api_key = completion_api_key(config)?;
        Ok(Self::new(
            executor,
            config.completion.endpoint.clone(),
            config.completion.model.clone(),
            api_key,
        ))
    }
}

#[async_trait]
impl TextCompletion for ChatCompletionClient {
    #[instrument(skip_all, fields(model = %self.model))]
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "temperature": 0.2,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
        });

        let request = HttpRequest::post_json(self.endpoint.as_str(), &body)?
            .header("Authorization", format!("Bearer {}", self.api_key));

        let response = self
            .executor
            .execute(request)
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| BibError::Completion(e.to_string()))?;

        let text = extract_generated_text(&response.text());
        if text.trim().is_empty() {
            return Err(BibError::Completion("model returned no text".into()));
        }

        debug!(chars = text.len(), "completion received");
        Ok(text)
    }
}
