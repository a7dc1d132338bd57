//! The evaluation payload carried by every job.
//!
//! The queue and dispatcher never look inside it apart from
//! [`EvaluationRequest::repetitions`]; the oracle router reads
//! [`EvaluationRequest::llm_type`] and the chosen judge turns the rest into a
//! prompt.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A single rubric item the answer is graded against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rubric {
    pub id: String,
    pub title: String,
    pub points: f64,
}

/// Which judge provider grades the request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmType {
    #[default]
    #[serde(alias = "CLAUDE")]
    Claude,
    #[serde(alias = "GPT")]
    Gpt,
}

impl fmt::Display for LlmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmType::Claude => write!(f, "claude"),
            LlmType::Gpt => write!(f, "gpt"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRequest {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub rubrics: Vec<Rubric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_solution: Option<String>,
    #[serde(default = "default_max_points")]
    pub max_points: f64,
    #[serde(default)]
    pub min_points: f64,
    #[serde(default = "default_point_step")]
    pub point_step: f64,
    /// How many independent oracle opinions to collect. `None` means one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repetitions: Option<u32>,
    #[serde(default)]
    pub llm_type: LlmType,
}

fn default_max_points() -> f64 {
    1.0
}

fn default_point_step() -> f64 {
    0.5
}

impl EvaluationRequest {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            rubrics: Vec::new(),
            model_solution: None,
            max_points: default_max_points(),
            min_points: 0.0,
            point_step: default_point_step(),
            repetitions: None,
            llm_type: LlmType::default(),
        }
    }

    pub fn with_repetitions(mut self, repetitions: u32) -> Self {
        self.repetitions = Some(repetitions);
        self
    }

    pub fn with_llm_type(mut self, llm_type: LlmType) -> Self {
        self.llm_type = llm_type;
        self
    }

    /// Number of oracle calls this request asks for.
    pub fn repetition_count(&self) -> u32 {
        self.repetitions.unwrap_or(1)
    }

    /// Reject requests that must never become jobs.
    pub fn validate(&self, max_repetitions: u32) -> Result<(), ValidationError> {
        non_empty("question", &self.question)?;
        non_empty("answer", &self.answer)?;

        for rubric in &self.rubrics {
            non_empty("rubrics[].id", &rubric.id)?;
            non_empty("rubrics[].title", &rubric.title)?;
            finite("rubrics[].points", rubric.points)?;
        }

        at_least("maxPoints", self.max_points, 1.0)?;
        at_least("minPoints", self.min_points, 0.0)?;
        at_least("pointStep", self.point_step, 0.0)?;
        if self.min_points > self.max_points {
            return Err(ValidationError::InvertedRange {
                min: self.min_points,
                max: self.max_points,
            });
        }

        let repetitions = self.repetition_count();
        if repetitions == 0 || repetitions > max_repetitions {
            return Err(ValidationError::Repetitions {
                value: repetitions,
                max: max_repetitions,
            });
        }
        Ok(())
    }
}

fn non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField { field });
    }
    Ok(())
}

fn finite(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NotFinite { field });
    }
    Ok(())
}

fn at_least(field: &'static str, value: f64, min: f64) -> Result<(), ValidationError> {
    finite(field, value)?;
    if value < min {
        return Err(ValidationError::BelowMinimum { field, min, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_applies_defaults() {
        let json = r#"{"question": "What is 2 + 2?", "answer": "4"}"#;
        let req: EvaluationRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.max_points, 1.0);
        assert_eq!(req.min_points, 0.0);
        assert_eq!(req.point_step, 0.5);
        assert!(req.rubrics.is_empty());
        assert_eq!(req.repetition_count(), 1);
        assert_eq!(req.llm_type, LlmType::Claude);
        assert!(req.validate(10).is_ok());
    }

    #[test]
    fn llm_type_selects_provider() {
        let json = r#"{"question": "Q", "answer": "A", "llmType": "gpt"}"#;
        let req: EvaluationRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.llm_type, LlmType::Gpt);

        let json = r#"{"question": "Q", "answer": "A", "llmType": "CLAUDE"}"#;
        let req: EvaluationRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.llm_type, LlmType::Claude);

        let json = r#"{"question": "Q", "answer": "A", "llmType": "gemini"}"#;
        assert!(serde_json::from_str::<EvaluationRequest>(json).is_err());

        let value = serde_json::to_value(EvaluationRequest::new("Q", "A").with_llm_type(LlmType::Gpt)).unwrap();
        assert_eq!(value["llmType"], "gpt");
    }

    #[test]
    fn deserialize_camel_case_fields() {
        let json = r#"{
            "question": "Explain polymorphism.",
            "answer": "Objects taking many forms.",
            "rubrics": [{"id": "1", "title": "Mentions overriding", "points": 0.5}],
            "modelSolution": "Subtypes treated as a common supertype.",
            "maxPoints": 2,
            "repetitions": 3
        }"#;
        let req: EvaluationRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.rubrics[0].title, "Mentions overriding");
        assert_eq!(req.model_solution.as_deref(), Some("Subtypes treated as a common supertype."));
        assert_eq!(req.max_points, 2.0);
        assert_eq!(req.repetition_count(), 3);
    }

    #[test]
    fn rejects_blank_question() {
        let req = EvaluationRequest::new("   ", "Paris");
        assert_eq!(
            req.validate(10),
            Err(ValidationError::EmptyField { field: "question" })
        );
    }

    #[test]
    fn rejects_blank_rubric_title() {
        let mut req = EvaluationRequest::new("Capital of France?", "Paris");
        req.rubrics.push(Rubric {
            id: "1".into(),
            title: "".into(),
            points: 1.0,
        });
        assert_eq!(
            req.validate(10),
            Err(ValidationError::EmptyField {
                field: "rubrics[].title"
            })
        );
    }

    #[test]
    fn rejects_points_below_minimum() {
        let mut req = EvaluationRequest::new("Q", "A");
        req.max_points = 0.5;
        assert!(matches!(
            req.validate(10),
            Err(ValidationError::BelowMinimum { field: "maxPoints", .. })
        ));
    }

    #[test]
    fn rejects_inverted_range() {
        let mut req = EvaluationRequest::new("Q", "A");
        req.max_points = 2.0;
        req.min_points = 3.0;
        assert_eq!(
            req.validate(10),
            Err(ValidationError::InvertedRange { min: 3.0, max: 2.0 })
        );
    }

    #[test]
    fn rejects_repetitions_out_of_range() {
        let req = EvaluationRequest::new("Q", "A").with_repetitions(0);
        assert_eq!(
            req.validate(10),
            Err(ValidationError::Repetitions { value: 0, max: 10 })
        );

        let req = EvaluationRequest::new("Q", "A").with_repetitions(11);
        assert!(req.validate(10).is_err());
        assert!(req.validate(11).is_ok());
    }
}
