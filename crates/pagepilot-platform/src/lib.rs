//! # pagepilot-platform
//!
//! Knows which browser-hosted AI tools exist and how to talk to their DOM.
//!
//! Three concerns live here:
//! - the [`Registry`] of [`PlatformProfile`]s (input/submit/response selectors
//!   per tool),
//! - [`detect`] — match the current page against the registry,
//! - [`scan_for_issues`] — static DOM inspection for accessibility /
//!   performance / SEO / design defects, plus [`generate_fix_prompt`] to turn
//!   an issue into a corrective instruction.
//!
//! Page access goes through the narrow [`PageInspector`] capability trait so
//! everything is testable against a fake instead of a live document.

pub mod detect;
pub mod fix;
pub mod registry;
pub mod scan;

pub use detect::detect;
pub use fix::generate_fix_prompt;
pub use registry::{PlatformProfile, Registry, ScanCapabilities};
pub use scan::{scan_for_issues, DetectedIssue, DomAudit, IssueCategory, Severity};

use async_trait::async_trait;

/// Result type for pagepilot-platform operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during detection or scanning.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("page evaluation failed: {0}")]
    Page(String),

    #[error("audit parse error: {0}")]
    Parse(String),
}

/// Read-only view of the current page, narrow enough to fake in tests.
///
/// Implementations live with whatever owns the real page (a CDP driver, an
/// injected content script); this crate only queries through it.
#[async_trait]
pub trait PageInspector: Send + Sync {
    /// Hostname of the current page, e.g. `"chatgpt.com"`.
    async fn hostname(&self) -> Result<String>;

    /// Whether at least one element matches the CSS selector.
    async fn has_selector(&self, selector: &str) -> Result<bool>;

    /// Whether a page-global object exists (dotted paths allowed,
    /// e.g. `"__remixContext"` or `"next.router"`).
    async fn has_global(&self, path: &str) -> Result<bool>;

    /// Snapshot the structural facts the issue checks run over.
    async fn audit(&self) -> Result<DomAudit>;
}
