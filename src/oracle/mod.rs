//! The external judge: its capability seam, the strict decoder for what it
//! returns, and the retrying invoker that wraps a single logical call.

mod anthropic;
mod openai;
mod prompt;
mod retry;
mod router;
#[cfg(test)]
pub(crate) mod stub;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::OracleError;
use crate::request::EvaluationRequest;

pub use anthropic::AnthropicOracle;
pub use openai::OpenAiOracle;
pub use retry::{Backoff, Invocation, OracleInvoker, RetryPolicy};
pub use router::OracleRouter;

/// Tri-state classification the judge assigns to an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "correct")]
    Positive,
    #[serde(rename = "incorrect")]
    Negative,
    #[serde(rename = "incomplete")]
    Partial,
}

/// One decoded judge opinion. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OracleResponse {
    #[serde(rename = "status")]
    pub verdict: Verdict,
    #[serde(rename = "points")]
    pub score: f64,
    pub feedback: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passed_rubrics: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_rubrics: Option<Vec<String>>,
}

/// The scoring capability. Implementations perform exactly one call per
/// `evaluate`; retries belong to [`OracleInvoker`].
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Returns the judge's raw, undecoded output.
    async fn evaluate(&self, request: &EvaluationRequest) -> Result<String, OracleError>;
}

/// Strictly decode raw judge output into an [`OracleResponse`].
///
/// Judges tend to wrap their JSON in prose, so only the span from the first
/// `{` to the last `}` is parsed.
pub fn decode(raw: &str) -> Result<OracleResponse, OracleError> {
    let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) else {
        return Err(OracleError::Malformed("no JSON object in output".into()));
    };
    if end < start {
        return Err(OracleError::Malformed("no JSON object in output".into()));
    }

    let response: OracleResponse = serde_json::from_str(&raw[start..=end])
        .map_err(|e| OracleError::Malformed(e.to_string()))?;
    if !response.score.is_finite() {
        return Err(OracleError::Malformed(format!(
            "points must be finite, got {}",
            response.score
        )));
    }
    Ok(response)
}
