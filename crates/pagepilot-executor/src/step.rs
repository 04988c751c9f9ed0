//! Step model. Owned exclusively by the plan; only the executor mutates it.

use serde::{Deserialize, Serialize};

use pagepilot_runtime::PendingAction;

/// Lifecycle status of one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Error,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::InProgress => "in_progress",
            StepStatus::Completed => "completed",
            StepStatus::Error => "error",
        }
    }
}

/// Outcome class of a finished step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Success,
    Error,
    Ambiguous,
}

/// Recorded outcome of one step execution.
#[derive(Debug, Clone)]
pub struct StepResult {
    pub status: ResultStatus,
    /// Short human-readable account (response excerpt or error).
    pub message: String,
    /// Classifier suggestion, when one was produced.
    pub suggestion: Option<String>,
    /// Set when a human decision is required before execution can resume.
    pub needs_user_action: Option<PendingAction>,
}

impl StepResult {
    pub fn success(message: impl Into<String>, suggestion: Option<String>) -> Self {
        Self {
            status: ResultStatus::Success,
            message: message.into(),
            suggestion,
            needs_user_action: None,
        }
    }

    pub fn error(message: impl Into<String>, suggestion: Option<String>) -> Self {
        Self {
            status: ResultStatus::Error,
            message: message.into(),
            suggestion,
            needs_user_action: None,
        }
    }

    pub fn skipped() -> Self {
        Self {
            status: ResultStatus::Success,
            message: "skipped".into(),
            suggestion: None,
            needs_user_action: None,
        }
    }
}

/// One unit of work in a plan.
#[derive(Debug, Clone)]
pub struct Step {
    pub id: String,
    pub title: String,
    pub description: String,
    /// The instruction sent to the platform. Replaced in place when the
    /// classifier supplies a correction.
    pub prompt: String,
    pub status: StepStatus,
    pub result: Option<StepResult>,
}

impl Step {
    pub fn new(id: impl Into<String>, title: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            prompt: prompt.into(),
            status: StepStatus::Pending,
            result: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_step_is_pending() {
        let step = Step::new("s1", "Hero copy", "Write landing hero copy");
        assert_eq!(step.status, StepStatus::Pending);
        assert!(step.result.is_none());
    }

    #[test]
    fn test_skipped_result_is_synthetic_success() {
        let r = StepResult::skipped();
        assert_eq!(r.status, ResultStatus::Success);
        assert_eq!(r.message, "skipped");
    }
}
