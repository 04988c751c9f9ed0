//! # pagepilot-runtime
//!
//! The in-page automation runtime: injects a prompt into a recognized
//! platform's input widget, submits it, and polls the response container
//! until the reply stabilizes. Two watcher heuristics run alongside: one
//! auto-clicks "try again"-style fix buttons the page spawns, the other
//! pauses the session when a banner demands a human decision.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pagepilot_platform::Registry;
//! use pagepilot_runtime::{AutomationRuntime, CdpDriver};
//!
//! # #[tokio::main]
//! # async fn main() -> pagepilot_runtime::Result<()> {
//! let browser = eoka::Browser::launch().await?;
//! let page = browser.new_page("https://chatgpt.com").await?;
//! let driver = Arc::new(CdpDriver::new(page));
//! let runtime = AutomationRuntime::new(driver, Arc::new(Registry::builtin()));
//!
//! let outcome = runtime.automate("Write landing hero copy").await?;
//! println!("{}", outcome.response);
//! # Ok(())
//! # }
//! ```
//!
//! The runtime never retries on its own; retry policy belongs to the
//! orchestrator. Every `automate` call resolves with a result or a typed
//! error, never hangs past its polling budget.

pub mod cdp;
pub mod driver;
pub mod fake;
pub mod runtime;
pub mod session;
pub mod watch;

pub use cdp::CdpDriver;
pub use driver::{PageDriver, PageEvent};
pub use fake::FakeDriver;
pub use runtime::{AutomateSuccess, AutomationRuntime, PollConfig, SubmitMethod};
pub use session::{ActionKind, PendingAction, RuntimeSession};
pub use watch::{Watcher, WatcherConfig, WatcherRules};

// Re-export the platform layer; callers usually need both.
pub use pagepilot_platform as platform;

/// Result type for pagepilot-runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the automation runtime.
///
/// `Paused`, `ElementNotFound` and `Timeout` are terminal for a single
/// attempt only; whether to retry is the orchestrator's call.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("paused")]
    Paused,

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("response did not stabilize: {0}")]
    Timeout(String),

    #[error("no supported platform on {0}")]
    UnsupportedPlatform(String),

    #[error("platform error: {0}")]
    Platform(#[from] pagepilot_platform::Error),

    #[error("browser error: {0}")]
    Browser(#[from] eoka::Error),

    #[error("page result parse error: {0}")]
    Parse(String),
}

impl Error {
    /// Stable machine-readable tag, mirrored into step results and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Paused => "paused",
            Error::ElementNotFound(_) => "element_not_found",
            Error::Timeout(_) => "timeout",
            Error::UnsupportedPlatform(_) => "unsupported_platform",
            Error::Platform(_) => "platform",
            Error::Browser(_) => "browser",
            Error::Parse(_) => "parse",
        }
    }
}
