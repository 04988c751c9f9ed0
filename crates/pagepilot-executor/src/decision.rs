//! AI decision service client and its keyword-heuristic fallback.
//!
//! The service is a black box: response text and step index in, a
//! [`Classification`] out. When it is unreachable the executor degrades to
//! [`heuristic_classification`] so a down service never stalls a plan.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result};

/// Verdict on one platform reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    /// Advance to the next step.
    pub should_continue: bool,
    /// Re-run the step with a corrected prompt.
    pub needs_correction: bool,
    /// Replacement prompt for the correction, when the service has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correction_prompt: Option<String>,
    /// Human-readable advice, always present.
    pub suggestion: String,
    /// Not part of the wire contract: set by the heuristic when neither
    /// vocabulary matched, so the step can be recorded as ambiguous.
    #[serde(default, skip_serializing)]
    pub ambiguous: bool,
}

/// Classifies platform replies. Errors are recoverable by design — the
/// executor falls back to the heuristic on any failure.
#[async_trait]
pub trait DecisionService: Send + Sync {
    async fn classify(&self, response_text: &str, step_index: usize) -> Result<Classification>;
}

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    response_text: &'a str,
    step_index: usize,
}

/// JSON-over-HTTP decision service client.
pub struct HttpDecisionService {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpDecisionService {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl DecisionService for HttpDecisionService {
    async fn classify(&self, response_text: &str, step_index: usize) -> Result<Classification> {
        let request = ClassifyRequest {
            response_text,
            step_index,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Decision(e.to_string()))?;
        if !response.status().is_success() {
            return Err(Error::Decision(format!(
                "decision service returned {}",
                response.status()
            )));
        }
        response
            .json::<Classification>()
            .await
            .map_err(|e| Error::Decision(e.to_string()))
    }
}

const FAILURE_WORDS: [&str; 10] = [
    "error",
    "failed",
    "failure",
    "unable",
    "cannot",
    "can't",
    "sorry",
    "went wrong",
    "try again",
    "exception",
];

const SUCCESS_WORDS: [&str; 10] = [
    "done",
    "completed",
    "successfully",
    "created",
    "added",
    "updated",
    "generated",
    "finished",
    "here is",
    "here's",
];

/// Keyword fallback used when the decision service is down.
///
/// Failure vocabulary wins over success vocabulary: a reply like
/// "successfully failed to build" reads as a failure.
pub fn heuristic_classification(response: &str) -> Classification {
    let lower = response.to_lowercase();
    let failed = FAILURE_WORDS.iter().any(|w| lower.contains(w));
    let succeeded = SUCCESS_WORDS.iter().any(|w| lower.contains(w));
    debug!(
        "heuristic classification: failed={} succeeded={}",
        failed, succeeded
    );
    if failed {
        Classification {
            should_continue: false,
            needs_correction: true,
            correction_prompt: None,
            suggestion: "The tool reported a problem; retry with a corrected instruction.".into(),
            ambiguous: false,
        }
    } else if succeeded {
        Classification {
            should_continue: true,
            needs_correction: false,
            correction_prompt: None,
            suggestion: "The tool reported success.".into(),
            ambiguous: false,
        }
    } else {
        Classification {
            should_continue: true,
            needs_correction: false,
            correction_prompt: None,
            suggestion: "Response did not clearly indicate success; verify manually.".into(),
            ambiguous: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heuristic_failure_vocabulary() {
        let c = heuristic_classification("Sorry, something went wrong while building.");
        assert!(c.needs_correction);
        assert!(!c.should_continue);
    }

    #[test]
    fn test_heuristic_success_vocabulary() {
        let c = heuristic_classification("I've successfully created the pricing table.");
        assert!(c.should_continue);
        assert!(!c.needs_correction);
        assert!(!c.ambiguous);
    }

    #[test]
    fn test_heuristic_failure_beats_success() {
        let c = heuristic_classification("Successfully failed: unable to write the file.");
        assert!(c.needs_correction);
    }

    #[test]
    fn test_heuristic_unclear_is_ambiguous_but_continues() {
        let c = heuristic_classification("Interesting question about typography.");
        assert!(c.should_continue);
        assert!(c.ambiguous);
    }

    #[test]
    fn test_classification_wire_shape() {
        let json = r#"{
            "shouldContinue": false,
            "needsCorrection": true,
            "correctionPrompt": "Use a 3-column layout",
            "suggestion": "Layout was wrong"
        }"#;
        let c: Classification = serde_json::from_str(json).unwrap();
        assert!(!c.should_continue);
        assert!(c.needs_correction);
        assert_eq!(c.correction_prompt.as_deref(), Some("Use a 3-column layout"));
        assert!(!c.ambiguous);
    }
}
