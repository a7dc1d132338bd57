use std::sync::Arc;

use async_trait::async_trait;

use super::Oracle;
use super::prompt::{GRADER_CONTEXT, build_prompt};
use crate::anthropic::{AnthropicClient, Message, MessagesRequest};
use crate::error::OracleError;
use crate::request::EvaluationRequest;

/// Judge backed by the Anthropic Messages API.
pub struct AnthropicOracle {
    client: Arc<AnthropicClient>,
    model: String,
    max_tokens: u32,
}

impl AnthropicOracle {
    pub fn new(client: Arc<AnthropicClient>, model: String, max_tokens: u32) -> Self {
        Self {
            client,
            model,
            max_tokens,
        }
    }

    fn build_request(&self, request: &EvaluationRequest) -> MessagesRequest {
        MessagesRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: Some(GRADER_CONTEXT.to_string()),
            messages: vec![Message::user(build_prompt(request))],
        }
    }
}

#[async_trait]
impl Oracle for AnthropicOracle {
    async fn evaluate(&self, request: &EvaluationRequest) -> Result<String, OracleError> {
        let req = self.build_request(request);
        Ok(self.client.complete_text(&req).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_carries_system_context() {
        let client = Arc::new(AnthropicClient::new("sk-test".into()).unwrap());
        let oracle = AnthropicOracle::new(client, "claude-sonnet-4-5-20250929".into(), 1024);
        let req = oracle.build_request(&EvaluationRequest::new("Q", "A"));
        assert_eq!(req.max_tokens, 1024);
        assert!(req.system.unwrap().starts_with("You are an experienced educator"));
        assert_eq!(req.messages.len(), 1);
        assert_eq!(req.messages[0].role, "user");
        assert!(req.messages[0].content.contains("Question:\nQ"));
    }
}
