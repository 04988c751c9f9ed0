//! Observable execution events.
//!
//! Everything the executor does is mirrored onto an event stream so a
//! disconnected UI can reconcile state from the log alone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::step::{StepResult, StepStatus};
use pagepilot_runtime::PendingAction;

/// Plan-level state machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Running,
    Paused,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// One timestamped, leveled log line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogLine {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

impl LogLine {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
        }
    }
}

/// Events emitted by [`crate::PlanExecutor`] as it runs.
#[derive(Debug, Clone)]
pub enum ExecutorEvent {
    PlanStatusChanged { status: PlanStatus },
    StepStatusChanged { index: usize, status: StepStatus },
    StepFinished { index: usize, result: StepResult },
    NeedsUserAction { index: usize, action: PendingAction },
    Paused { index: usize },
    Resumed { index: usize },
    PlanFinished { status: PlanStatus, completed_steps: usize },
    Log(LogLine),
}
