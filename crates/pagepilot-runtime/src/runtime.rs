//! The automate pipeline: detect → inject → submit → poll.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::driver::PageDriver;
use crate::session::{InFlightGuard, RuntimeSession};
use crate::{Error, Result};
use pagepilot_platform::{detect, PlatformProfile, Registry};

/// Timing knobs for the automate pipeline. Defaults match the observed
/// behavior of streaming chat tools: ~3s before anything renders, then
/// incremental updates roughly every second, with a two-minute ceiling.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Delay between injection and submission.
    pub submit_settle: Duration,
    /// Delay after submission before the first response poll.
    pub initial_wait: Duration,
    /// Interval between response polls.
    pub poll_interval: Duration,
    /// Maximum number of polls before giving up.
    pub max_polls: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            submit_settle: Duration::from_millis(1000),
            initial_wait: Duration::from_millis(3000),
            poll_interval: Duration::from_millis(1000),
            max_polls: 120,
        }
    }
}

/// How the prompt was submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitMethod {
    /// The submit control was clicked.
    Click,
    /// No actionable submit control; synthetic Enter with modifier.
    EnterFallback,
}

impl fmt::Display for SubmitMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitMethod::Click => f.write_str("click"),
            SubmitMethod::EnterFallback => f.write_str("enter-fallback"),
        }
    }
}

/// A completed automate call.
#[derive(Debug, Clone)]
pub struct AutomateSuccess {
    /// The stabilized response text.
    pub response: String,
    /// Name of the detected platform.
    pub platform: String,
    pub submitted_via: SubmitMethod,
    /// Polls consumed before the response stabilized.
    pub polls: u32,
}

/// Drives one page. Never retries; terminal per attempt.
pub struct AutomationRuntime {
    driver: Arc<dyn PageDriver>,
    registry: Arc<Registry>,
    session: RuntimeSession,
    poll: PollConfig,
}

impl AutomationRuntime {
    pub fn new(driver: Arc<dyn PageDriver>, registry: Arc<Registry>) -> Self {
        Self {
            driver,
            registry,
            session: RuntimeSession::new(),
            poll: PollConfig::default(),
        }
    }

    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Bind to an existing session (shared with a watcher).
    pub fn with_session(mut self, session: RuntimeSession) -> Self {
        self.session = session;
        self
    }

    pub fn session(&self) -> RuntimeSession {
        self.session.clone()
    }

    pub fn driver(&self) -> Arc<dyn PageDriver> {
        Arc::clone(&self.driver)
    }

    pub fn pause(&self) {
        info!("automation paused");
        self.session.pause();
    }

    pub fn resume(&self) {
        info!("automation resumed");
        self.session.resume();
    }

    /// Detect the platform on the current page.
    pub async fn detect_platform(&self) -> Result<Option<PlatformProfile>> {
        let found = detect(&*self.driver, &self.registry).await?;
        Ok(found.cloned())
    }

    /// Inject `prompt`, submit it, and wait for the reply to stabilize.
    ///
    /// Checked at entry: a paused session fails immediately with
    /// [`Error::Paused`] and no page access. Element-not-found before
    /// submission is terminal for this attempt; the caller owns retries.
    pub async fn automate(&self, prompt: &str) -> Result<AutomateSuccess> {
        if self.session.is_paused() {
            debug!("automate rejected: session paused");
            return Err(Error::Paused);
        }

        self.session.set_in_flight(true);
        let _guard = InFlightGuard(self.session.clone());

        let profile = match detect(&*self.driver, &self.registry).await? {
            Some(p) => p.clone(),
            None => {
                let host = self
                    .driver
                    .hostname()
                    .await
                    .unwrap_or_else(|_| "unknown".into());
                return Err(Error::UnsupportedPlatform(host));
            }
        };
        info!("automating against {}", profile.name);

        self.driver
            .inject_prompt(&profile.input_selector, prompt)
            .await?;
        sleep(self.poll.submit_settle).await;

        let submitted_via = self.submit(&profile).await?;
        debug!("submitted via {}", submitted_via);

        let (response, polls) = self.wait_for_response(&profile.response_selector).await?;
        info!(
            "response stabilized after {} polls ({} chars)",
            polls,
            response.len()
        );

        Ok(AutomateSuccess {
            response,
            platform: profile.name.clone(),
            submitted_via,
            polls,
        })
    }

    /// Prefer clicking the submit control; fall back to modifier-Enter on
    /// the input when the control is missing, disabled, or zero-sized.
    async fn submit(&self, profile: &PlatformProfile) -> Result<SubmitMethod> {
        if self
            .driver
            .click_if_actionable(&profile.submit_selector)
            .await?
        {
            return Ok(SubmitMethod::Click);
        }
        warn!(
            "submit control {} not actionable, falling back to Enter",
            profile.submit_selector
        );
        self.driver
            .press_enter_with_modifier(&profile.input_selector)
            .await?;
        Ok(SubmitMethod::EnterFallback)
    }

    /// Poll the response container until its text length is unchanged
    /// between two consecutive polls (streaming tools append incrementally,
    /// so a stable length is the "generation finished" proxy). An empty
    /// container never stabilizes; exhausting the budget is a timeout.
    async fn wait_for_response(&self, selector: &str) -> Result<(String, u32)> {
        sleep(self.poll.initial_wait).await;

        let mut last_len: Option<usize> = None;
        for attempt in 1..=self.poll.max_polls {
            if attempt > 1 {
                sleep(self.poll.poll_interval).await;
            }
            let text = self
                .driver
                .element_text(selector)
                .await?
                .unwrap_or_default();
            let len = text.len();
            debug!("poll {}: {} chars", attempt, len);
            if let Some(prev) = last_len {
                if prev == len && len > 0 {
                    return Ok((text, attempt));
                }
            }
            last_len = Some(len);
        }
        Err(Error::Timeout(format!(
            "no stable response in {} polls",
            self.poll.max_polls
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeDriver;
    use pagepilot_platform::registry::ScanCapabilities;

    fn test_registry() -> Arc<Registry> {
        let mut reg = Registry::new();
        reg.push(PlatformProfile {
            name: "TestTool".into(),
            host_patterns: vec!["testtool.app".into()],
            input_selector: "#prompt".into(),
            submit_selector: "#send".into(),
            response_selector: "#response".into(),
            global_markers: vec![],
            capabilities: ScanCapabilities::none(),
        });
        Arc::new(reg)
    }

    fn fast_poll() -> PollConfig {
        PollConfig {
            submit_settle: Duration::from_millis(10),
            initial_wait: Duration::from_millis(10),
            poll_interval: Duration::from_millis(10),
            max_polls: 10,
        }
    }

    fn runtime_with(driver: FakeDriver) -> (Arc<FakeDriver>, AutomationRuntime) {
        let driver = Arc::new(driver);
        let runtime = AutomationRuntime::new(driver.clone(), test_registry())
            .with_poll_config(fast_poll());
        (driver, runtime)
    }

    #[tokio::test(start_paused = true)]
    async fn test_automate_happy_path_clicks_submit() {
        let (driver, runtime) = runtime_with(
            FakeDriver::new("testtool.app")
                .with_selector("#prompt")
                .with_actionable("#send")
                .with_text_script("#response", ["Work", "Working on it", "Done!", "Done!"]),
        );
        let out = runtime.automate("do the thing").await.unwrap();
        assert_eq!(out.platform, "TestTool");
        assert_eq!(out.submitted_via, SubmitMethod::Click);
        assert_eq!(out.response, "Done!");
        assert_eq!(driver.injected(), vec![("#prompt".into(), "do the thing".into())]);
        assert_eq!(driver.clicked(), vec!["#send".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_paused_automate_fails_without_touching_dom() {
        let (driver, runtime) = runtime_with(
            FakeDriver::new("testtool.app")
                .with_selector("#prompt")
                .with_text_script("#response", ["x", "x"]),
        );
        runtime.pause();
        let err = runtime.automate("ignored").await.unwrap_err();
        assert!(matches!(err, Error::Paused));
        assert_eq!(driver.touches(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsupported_platform_fails_fast() {
        let (driver, runtime) = runtime_with(FakeDriver::new("unknown.example"));
        let err = runtime.automate("hello").await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedPlatform(_)));
        assert!(driver.injected().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_input_is_terminal_without_retry() {
        // Hostname matches and the response selector confirms the platform,
        // but the input element itself is gone.
        let (driver, runtime) = runtime_with(
            FakeDriver::new("testtool.app").with_text_script("#response", ["never read"]),
        );
        let err = runtime.automate("hello").await.unwrap_err();
        assert!(matches!(err, Error::ElementNotFound(_)));
        // One injection attempt only.
        assert!(driver.injected().is_empty());
        assert!(driver.clicked().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_falls_back_to_enter() {
        let (driver, runtime) = runtime_with(
            FakeDriver::new("testtool.app")
                .with_selector("#prompt")
                .with_text_script("#response", ["ok", "ok"]),
        );
        let out = runtime.automate("go").await.unwrap();
        assert_eq!(out.submitted_via, SubmitMethod::EnterFallback);
        assert_eq!(driver.enter_pressed(), vec!["#prompt".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_resolves_exactly_at_first_stable_poll() {
        // Lengths change at polls 1..3 and are stable at poll 4.
        let (_driver, runtime) = runtime_with(
            FakeDriver::new("testtool.app")
                .with_selector("#prompt")
                .with_actionable("#send")
                .with_text_script("#response", ["a", "ab", "abc", "abc"]),
        );
        let out = runtime.automate("x").await.unwrap();
        assert_eq!(out.polls, 4);
        assert_eq!(out.response, "abc");
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_stable_response_times_out() {
        // Strictly growing text for more polls than the budget allows.
        let snapshots: Vec<String> = (1..=20).map(|n| "x".repeat(n)).collect();
        let (_driver, runtime) = runtime_with(
            FakeDriver::new("testtool.app")
                .with_selector("#prompt")
                .with_actionable("#send")
                .with_text_script("#response", snapshots),
        );
        let err = runtime.automate("x").await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_response_never_stabilizes() {
        let (_driver, runtime) = runtime_with(
            FakeDriver::new("testtool.app")
                .with_selector("#prompt")
                .with_actionable("#send")
                .with_text_script("#response", [""]),
        );
        let err = runtime.automate("x").await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_flag_cleared_after_error() {
        let (_driver, runtime) = runtime_with(FakeDriver::new("unknown.example"));
        let _ = runtime.automate("x").await;
        assert!(!runtime.session().is_in_flight());
    }
}
