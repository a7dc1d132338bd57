use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use super::Oracle;
use super::prompt::{GRADER_CONTEXT, build_prompt};
use crate::error::OracleError;
use crate::request::EvaluationRequest;

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Judge backed by the OpenAI Chat Completions API.
///
/// Asks for a JSON object response and returns the first choice's message
/// content undecoded. Every failure, HTTP or shape, is a transport failure
/// for the invoker to retry.
pub struct OpenAiOracle {
    client: reqwest::Client,
    api_key: String,
    model: String,
    url: String,
}

impl OpenAiOracle {
    pub fn new(api_key: String, model: String) -> Result<Self, OracleError> {
        Self::with_url(api_key, model, CHAT_COMPLETIONS_URL.to_string())
    }

    /// Point the oracle at another endpoint, e.g. a compatible gateway or a
    /// mock server.
    pub fn with_url(api_key: String, model: String, url: String) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| OracleError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key,
            model,
            url,
        })
    }

    fn build_body(&self, request: &EvaluationRequest) -> serde_json::Value {
        json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": GRADER_CONTEXT},
                {"role": "user", "content": build_prompt(request)},
            ],
            "response_format": {"type": "json_object"},
        })
    }
}

#[async_trait]
impl Oracle for OpenAiOracle {
    async fn evaluate(&self, request: &EvaluationRequest) -> Result<String, OracleError> {
        let body = self.build_body(request);
        let resp = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| OracleError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(OracleError::Transport(format!(
                "OpenAI chat API error (status {status}): {text}"
            )));
        }

        let json: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| OracleError::Transport(format!("unreadable OpenAI response: {e}")))?;
        debug!(model = %self.model, "OpenAI response received");

        json.pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .filter(|content| !content.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                OracleError::Transport("OpenAI response has no message content".into())
            })
    }
}
