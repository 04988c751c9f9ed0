//! # pagepilot-executor
//!
//! The plan auto-executor: consumes an ordered list of steps, drives each
//! through the automation runtime, classifies replies via an AI decision
//! service (with a keyword-heuristic fallback), and applies retry,
//! pause/resume and escalation policy. All retry policy lives here — the
//! runtime below never retries on its own — so execution behavior is
//! auditable from one place.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pagepilot_executor::{Plan, PlanExecutor};
//!
//! # #[tokio::main]
//! # async fn main() -> pagepilot_executor::Result<()> {
//! let plan = Plan::load("plan.yaml")?;
//! # Ok(())
//! # }
//! ```

pub mod decision;
pub mod events;
pub mod executor;
pub mod notify;
pub mod plan;
pub mod step;

pub use decision::{heuristic_classification, Classification, DecisionService, HttpDecisionService};
pub use events::{ExecutorEvent, LogLevel, LogLine, PlanStatus};
pub use executor::{Decision, ExecutorHandle, PlanExecutor, PlanReport};
pub use notify::{MemoryNotifier, Notification, NotificationSink, NotifySeverity, TracingNotifier};
pub use plan::{BrowserConfig, ParamDef, Params, Plan, RunMode, StepSpec};
pub use step::{ResultStatus, Step, StepResult, StepStatus};

/// Result type for pagepilot-executor operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors from plan loading and execution.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("plan error: {0}")]
    Plan(String),

    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("runtime error: {0}")]
    Runtime(#[from] pagepilot_runtime::Error),

    #[error("decision service error: {0}")]
    Decision(String),

    #[error("notification error: {0}")]
    Notify(String),
}
