//! The page capability trait the runtime drives.
//!
//! `PageDriver` is the only way any pagepilot component touches a page. The
//! production implementation is [`crate::CdpDriver`]; tests and dry runs use
//! [`crate::FakeDriver`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;
use pagepilot_platform::PageInspector;

/// Something the page's mutation observer or visibility hooks reported.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageEvent {
    /// A button-like element was added to the DOM.
    ButtonAdded {
        selector: String,
        label: String,
        #[serde(default)]
        disabled: bool,
    },
    /// A notification-like node (alert, toast, banner) was added.
    NoticeAdded { selector: String, text: String },
    /// The document's visibility changed.
    Visibility { hidden: bool },
    /// The window gained or lost focus.
    Focus { focused: bool },
}

/// Write/observe capabilities on top of [`PageInspector`].
///
/// Every method resolves or errors; none may hang indefinitely.
#[async_trait]
pub trait PageDriver: PageInspector {
    /// Write `text` into the element through whichever native property
    /// matches its actual type (input value, contenteditable text, rich
    /// editor text) and dispatch the input/change events frameworks listen
    /// for, plus a synthetic Enter keydown as a compatibility fallback.
    async fn inject_prompt(&self, selector: &str, text: &str) -> Result<()>;

    /// Click the element only if it exists, is enabled, and has non-zero
    /// rendered size. Returns whether a click happened.
    async fn click_if_actionable(&self, selector: &str) -> Result<bool>;

    /// Synthetic Enter keydown/keyup with a modifier key, the submit
    /// fallback when no clickable submit control is found.
    async fn press_enter_with_modifier(&self, selector: &str) -> Result<()>;

    /// Visible text of the last matching element (streaming tools append
    /// replies, so the last match is the current one), `None` if absent.
    async fn element_text(&self, selector: &str) -> Result<Option<String>>;

    /// Plain value write plus input/change events (coordinator relay).
    async fn fill_value(&self, selector: &str, value: &str) -> Result<()>;

    /// Strict click; errors if the element is missing.
    async fn click(&self, selector: &str) -> Result<()>;

    /// Install the mutation observer and visibility/focus hooks that feed
    /// [`PageDriver::drain_events`]. Idempotent per page load.
    async fn install_watchers(&self) -> Result<()>;

    /// Drain events collected since the last call.
    async fn drain_events(&self) -> Result<Vec<PageEvent>>;

    /// Trivial evaluation that keeps the page's scheduler warm while the
    /// tab is backgrounded. Must not mutate the page.
    async fn ping(&self) -> Result<()>;
}
