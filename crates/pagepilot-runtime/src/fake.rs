//! Scripted page driver for tests and dry runs.
//!
//! Behaves like a page whose response container streams text: each read of
//! the response selector pops the next scripted snapshot, and the last one
//! sticks. Every DOM-touching call is counted so tests can assert the
//! runtime left the page alone.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::driver::{PageDriver, PageEvent};
use crate::{Error, Result};
use pagepilot_platform::{self as platform, DomAudit, PageInspector};

#[derive(Default)]
struct State {
    hostname: String,
    selectors: HashSet<String>,
    globals: HashSet<String>,
    audit: DomAudit,
    /// Per-selector scripted text snapshots; the last entry repeats.
    scripted_text: HashMap<String, VecDeque<String>>,
    /// Selectors that `click_if_actionable` accepts.
    actionable: HashSet<String>,
    events: VecDeque<PageEvent>,
    injected: Vec<(String, String)>,
    filled: Vec<(String, String)>,
    clicked: Vec<String>,
    enter_pressed: Vec<String>,
    pings: usize,
    touches: usize,
    fail_injection: bool,
}

/// In-memory [`PageDriver`] driven entirely by the test script.
#[derive(Default)]
pub struct FakeDriver {
    state: Mutex<State>,
}

impl FakeDriver {
    pub fn new(hostname: &str) -> Self {
        let driver = Self::default();
        driver.state.lock().unwrap().hostname = hostname.into();
        driver
    }

    pub fn with_selector(self, selector: &str) -> Self {
        self.state.lock().unwrap().selectors.insert(selector.into());
        self
    }

    pub fn with_global(self, path: &str) -> Self {
        self.state.lock().unwrap().globals.insert(path.into());
        self
    }

    pub fn with_audit(self, audit: DomAudit) -> Self {
        self.state.lock().unwrap().audit = audit;
        self
    }

    /// Script the text snapshots successive reads of `selector` observe.
    pub fn with_text_script<I, S>(self, selector: &str, snapshots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state.lock().unwrap().scripted_text.insert(
            selector.into(),
            snapshots.into_iter().map(Into::into).collect(),
        );
        self
    }

    pub fn with_actionable(self, selector: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .actionable
            .insert(selector.into());
        self
    }

    pub fn with_failing_injection(self) -> Self {
        self.state.lock().unwrap().fail_injection = true;
        self
    }

    /// Queue an event for the next `drain_events` call.
    pub fn push_event(&self, event: PageEvent) {
        self.state.lock().unwrap().events.push_back(event);
    }

    /// Number of DOM-touching driver calls made so far.
    pub fn touches(&self) -> usize {
        self.state.lock().unwrap().touches
    }

    pub fn injected(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().injected.clone()
    }

    pub fn filled(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().filled.clone()
    }

    pub fn clicked(&self) -> Vec<String> {
        self.state.lock().unwrap().clicked.clone()
    }

    pub fn enter_pressed(&self) -> Vec<String> {
        self.state.lock().unwrap().enter_pressed.clone()
    }

    pub fn pings(&self) -> usize {
        self.state.lock().unwrap().pings
    }
}

#[async_trait]
impl PageInspector for FakeDriver {
    async fn hostname(&self) -> platform::Result<String> {
        let mut s = self.state.lock().unwrap();
        s.touches += 1;
        Ok(s.hostname.clone())
    }

    async fn has_selector(&self, selector: &str) -> platform::Result<bool> {
        let mut s = self.state.lock().unwrap();
        s.touches += 1;
        Ok(s.selectors.contains(selector) || s.scripted_text.contains_key(selector))
    }

    async fn has_global(&self, path: &str) -> platform::Result<bool> {
        let mut s = self.state.lock().unwrap();
        s.touches += 1;
        Ok(s.globals.contains(path))
    }

    async fn audit(&self) -> platform::Result<DomAudit> {
        let mut s = self.state.lock().unwrap();
        s.touches += 1;
        Ok(s.audit.clone())
    }
}

#[async_trait]
impl PageDriver for FakeDriver {
    async fn inject_prompt(&self, selector: &str, text: &str) -> Result<()> {
        let mut s = self.state.lock().unwrap();
        s.touches += 1;
        if s.fail_injection || !s.selectors.contains(selector) {
            return Err(Error::ElementNotFound(selector.to_string()));
        }
        s.injected.push((selector.to_string(), text.to_string()));
        Ok(())
    }

    async fn click_if_actionable(&self, selector: &str) -> Result<bool> {
        let mut s = self.state.lock().unwrap();
        s.touches += 1;
        if s.actionable.contains(selector) {
            s.clicked.push(selector.to_string());
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn press_enter_with_modifier(&self, selector: &str) -> Result<()> {
        let mut s = self.state.lock().unwrap();
        s.touches += 1;
        s.enter_pressed.push(selector.to_string());
        Ok(())
    }

    async fn element_text(&self, selector: &str) -> Result<Option<String>> {
        let mut s = self.state.lock().unwrap();
        s.touches += 1;
        if let Some(queue) = s.scripted_text.get_mut(selector) {
            let text = if queue.len() > 1 {
                queue.pop_front().unwrap_or_default()
            } else {
                queue.front().cloned().unwrap_or_default()
            };
            return Ok(Some(text));
        }
        Ok(None)
    }

    async fn fill_value(&self, selector: &str, value: &str) -> Result<()> {
        let mut s = self.state.lock().unwrap();
        s.touches += 1;
        if !s.selectors.contains(selector) {
            return Err(Error::ElementNotFound(selector.to_string()));
        }
        s.filled.push((selector.to_string(), value.to_string()));
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let mut s = self.state.lock().unwrap();
        s.touches += 1;
        if !s.selectors.contains(selector) && !s.actionable.contains(selector) {
            return Err(Error::ElementNotFound(selector.to_string()));
        }
        s.clicked.push(selector.to_string());
        Ok(())
    }

    async fn install_watchers(&self) -> Result<()> {
        let mut s = self.state.lock().unwrap();
        s.touches += 1;
        Ok(())
    }

    async fn drain_events(&self) -> Result<Vec<PageEvent>> {
        let mut s = self.state.lock().unwrap();
        Ok(s.events.drain(..).collect())
    }

    async fn ping(&self) -> Result<()> {
        self.state.lock().unwrap().pings += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_text_streams_then_sticks() {
        let driver = FakeDriver::new("example.com").with_text_script("#r", ["a", "ab", "abc"]);
        assert_eq!(driver.element_text("#r").await.unwrap().unwrap(), "a");
        assert_eq!(driver.element_text("#r").await.unwrap().unwrap(), "ab");
        assert_eq!(driver.element_text("#r").await.unwrap().unwrap(), "abc");
        assert_eq!(driver.element_text("#r").await.unwrap().unwrap(), "abc");
    }

    #[tokio::test]
    async fn test_touch_counter() {
        let driver = FakeDriver::new("example.com").with_selector("#in");
        assert_eq!(driver.touches(), 0);
        driver.inject_prompt("#in", "hello").await.unwrap();
        driver.click_if_actionable("#go").await.unwrap();
        assert_eq!(driver.touches(), 2);
    }
}
