//! Wire contract for driving a page from outside the process.
//!
//! The coordinator is a pure relay: each command maps onto one runtime or
//! driver call and every outcome, including failure, comes back as a
//! [`CoordinatorReply`]. It holds no state of its own, so the same contract
//! serves MCP tools, a browser extension port, or tests.

use serde::{Deserialize, Serialize};

use pagepilot_platform::{scan_for_issues, DetectedIssue};
use pagepilot_runtime::AutomationRuntime;

/// Commands accepted by [`dispatch`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum CoordinatorCommand {
    ClickElement { selector: String },
    FillInput { selector: String, value: String },
    GetElementText { selector: String },
    PageInfo,
    DetectPlatform,
    ScanIssues,
    RunStep { prompt: String },
    Pause,
    Resume,
}

/// Replies produced by [`dispatch`], one per command.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub enum CoordinatorReply {
    Ack {
        message: String,
    },
    Text {
        value: Option<String>,
    },
    PageInfo {
        hostname: String,
        title: String,
    },
    Platform {
        name: Option<String>,
    },
    Issues {
        issues: Vec<DetectedIssue>,
    },
    StepOutcome {
        response: String,
        platform: String,
        submitted_via: String,
        polls: u32,
    },
    Error {
        message: String,
    },
}

impl CoordinatorReply {
    fn error(e: impl std::fmt::Display) -> Self {
        CoordinatorReply::Error {
            message: e.to_string(),
        }
    }
}

/// Execute one command against the runtime's page. Infallible at the type
/// level: failures become [`CoordinatorReply::Error`].
pub async fn dispatch(runtime: &AutomationRuntime, command: CoordinatorCommand) -> CoordinatorReply {
    let driver = runtime.driver();
    match command {
        CoordinatorCommand::ClickElement { selector } => match driver.click(&selector).await {
            Ok(()) => CoordinatorReply::Ack {
                message: format!("clicked {}", selector),
            },
            Err(e) => CoordinatorReply::error(e),
        },
        CoordinatorCommand::FillInput { selector, value } => {
            match driver.fill_value(&selector, &value).await {
                Ok(()) => CoordinatorReply::Ack {
                    message: format!("filled {}", selector),
                },
                Err(e) => CoordinatorReply::error(e),
            }
        }
        CoordinatorCommand::GetElementText { selector } => {
            match driver.element_text(&selector).await {
                Ok(value) => CoordinatorReply::Text { value },
                Err(e) => CoordinatorReply::error(e),
            }
        }
        CoordinatorCommand::PageInfo => {
            let hostname = match driver.hostname().await {
                Ok(h) => h,
                Err(e) => return CoordinatorReply::error(e),
            };
            match driver.audit().await {
                Ok(audit) => CoordinatorReply::PageInfo {
                    hostname,
                    title: audit.title,
                },
                Err(e) => CoordinatorReply::error(e),
            }
        }
        CoordinatorCommand::DetectPlatform => match runtime.detect_platform().await {
            Ok(found) => CoordinatorReply::Platform {
                name: found.map(|p| p.name),
            },
            Err(e) => CoordinatorReply::error(e),
        },
        CoordinatorCommand::ScanIssues => {
            let profile = match runtime.detect_platform().await {
                Ok(Some(p)) => p,
                Ok(None) => return CoordinatorReply::error("no supported platform on this page"),
                Err(e) => return CoordinatorReply::error(e),
            };
            match scan_for_issues(&*driver, &profile).await {
                Ok(issues) => CoordinatorReply::Issues { issues },
                Err(e) => CoordinatorReply::error(e),
            }
        }
        CoordinatorCommand::RunStep { prompt } => match runtime.automate(&prompt).await {
            Ok(outcome) => CoordinatorReply::StepOutcome {
                response: outcome.response,
                platform: outcome.platform,
                submitted_via: outcome.submitted_via.to_string(),
                polls: outcome.polls,
            },
            Err(e) => CoordinatorReply::error(e),
        },
        CoordinatorCommand::Pause => {
            runtime.pause();
            CoordinatorReply::Ack {
                message: "paused".into(),
            }
        }
        CoordinatorCommand::Resume => {
            runtime.resume();
            CoordinatorReply::Ack {
                message: "resumed".into(),
            }
        }
    }
}
