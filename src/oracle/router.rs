use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::Oracle;
use crate::error::OracleError;
use crate::request::{EvaluationRequest, LlmType};

/// Sends each request to the judge named by its `llmType`.
///
/// A request for a provider that was never registered fails like any other
/// transport failure, so the job ends FAILED with a message naming the
/// missing provider.
#[derive(Default)]
pub struct OracleRouter {
    oracles: HashMap<LlmType, Arc<dyn Oracle>>,
}

impl OracleRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, llm_type: LlmType, oracle: Arc<dyn Oracle>) -> Self {
        self.oracles.insert(llm_type, oracle);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.oracles.is_empty()
    }

    /// Registered providers, in a stable order for logging.
    pub fn providers(&self) -> Vec<LlmType> {
        let mut providers: Vec<LlmType> = self.oracles.keys().copied().collect();
        providers.sort_by_key(|p| p.to_string());
        providers
    }
}

#[async_trait]
impl Oracle for OracleRouter {
    async fn evaluate(&self, request: &EvaluationRequest) -> Result<String, OracleError> {
        let Some(oracle) = self.oracles.get(&request.llm_type) else {
            return Err(OracleError::Transport(format!(
                "no {} judge configured",
                request.llm_type
            )));
        };
        debug!(llm_type = %request.llm_type, "routing oracle call");
        oracle.evaluate(request).await
    }
}
