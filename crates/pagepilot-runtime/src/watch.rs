//! Watcher heuristics over page mutation events.
//!
//! Two vocabularies drive this, both data so they can be tested and extended
//! without touching control flow:
//! - fix phrases: labels of page-spawned buttons worth clicking autonomously
//!   ("Try again", "Apply fix", ...). The click is the runtime's only fully
//!   autonomous corrective action, and it only fires while no automate call
//!   is in flight, so the autonomous path and the orchestrator's retry path
//!   never interleave on the same step.
//! - action phrases: banner text meaning a human decision is needed; on a
//!   match the session is paused so the orchestrator's next call observes it.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::driver::{PageDriver, PageEvent};
use crate::session::{ActionKind, PendingAction, RuntimeSession};

/// What the matcher decided about one event.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchVerdict {
    /// Click this page-spawned fix/retry button.
    ClickFix { selector: String },
    /// Pause; a human decision is required.
    Escalate(PendingAction),
}

/// Phrase rules the matcher runs. All matching is lowercase-substring.
#[derive(Debug, Clone)]
pub struct WatcherRules {
    pub fix_phrases: Vec<String>,
    pub action_phrases: Vec<(String, ActionKind)>,
}

impl Default for WatcherRules {
    fn default() -> Self {
        let fix = [
            "try again",
            "retry",
            "fix error",
            "apply fix",
            "attempt fix",
            "regenerate",
            "fix it",
        ];
        let action: [(&str, ActionKind); 10] = [
            ("confirm", ActionKind::Confirmation),
            ("are you sure", ActionKind::Confirmation),
            ("verify", ActionKind::Confirmation),
            ("approval required", ActionKind::Approval),
            ("needs your approval", ActionKind::Approval),
            ("sign in", ActionKind::Credential),
            ("log in", ActionKind::Credential),
            ("api key", ActionKind::Credential),
            ("password", ActionKind::Credential),
            ("payment", ActionKind::Payment),
        ];
        Self {
            fix_phrases: fix.iter().map(|s| s.to_string()).collect(),
            action_phrases: action
                .iter()
                .map(|(s, k)| (s.to_string(), *k))
                .collect(),
        }
    }
}

impl WatcherRules {
    /// Pure matcher: classify one event, or ignore it.
    pub fn evaluate(&self, event: &PageEvent) -> Option<WatchVerdict> {
        match event {
            PageEvent::ButtonAdded {
                selector,
                label,
                disabled,
            } => {
                if *disabled {
                    return None;
                }
                let label = label.to_lowercase();
                self.fix_phrases
                    .iter()
                    .any(|p| label.contains(p.as_str()))
                    .then(|| WatchVerdict::ClickFix {
                        selector: selector.clone(),
                    })
            }
            PageEvent::NoticeAdded { text, .. } => {
                let lower = text.to_lowercase();
                self.action_phrases
                    .iter()
                    .find(|(phrase, _)| lower.contains(phrase.as_str()))
                    .map(|(_, kind)| {
                        WatchVerdict::Escalate(PendingAction {
                            kind: *kind,
                            prompt: text.clone(),
                        })
                    })
            }
            PageEvent::Visibility { .. } | PageEvent::Focus { .. } => None,
        }
    }
}

/// Timing knobs for the watcher loop.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// How often events are drained from the page.
    pub drain_interval: Duration,
    /// Settle delay before clicking a matched fix button.
    pub fix_settle: Duration,
    /// Keep-alive ping interval while the page is backgrounded.
    pub keepalive_interval: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            drain_interval: Duration::from_millis(500),
            fix_settle: Duration::from_millis(1500),
            keepalive_interval: Duration::from_millis(2000),
        }
    }
}

/// Background task that drains page events and acts on them.
pub struct Watcher {
    driver: Arc<dyn PageDriver>,
    session: RuntimeSession,
    rules: WatcherRules,
    config: WatcherConfig,
}

impl Watcher {
    pub fn new(driver: Arc<dyn PageDriver>, session: RuntimeSession) -> Self {
        Self {
            driver,
            session,
            rules: WatcherRules::default(),
            config: WatcherConfig::default(),
        }
    }

    pub fn with_rules(mut self, rules: WatcherRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_config(mut self, config: WatcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Install the page-side hooks and start the drain loop. The task exits
    /// when the session is closed.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(e) = self.driver.install_watchers().await {
                warn!("failed to install page watchers: {}", e);
                return;
            }
            let mut last_ping = Instant::now();
            loop {
                sleep(self.config.drain_interval).await;
                if self.session.is_closed() {
                    debug!("watcher shutting down");
                    return;
                }
                let events = match self.driver.drain_events().await {
                    Ok(events) => events,
                    Err(e) => {
                        warn!("event drain failed: {}", e);
                        continue;
                    }
                };
                for event in &events {
                    self.handle(event).await;
                }
                // Keep-alive runs only while backgrounded; it performs no
                // page mutation, it just keeps the scheduler warm.
                if self.session.is_background()
                    && last_ping.elapsed() >= self.config.keepalive_interval
                {
                    if let Err(e) = self.driver.ping().await {
                        warn!("keep-alive ping failed: {}", e);
                    }
                    last_ping = Instant::now();
                }
            }
        })
    }

    async fn handle(&self, event: &PageEvent) {
        match event {
            PageEvent::Visibility { hidden } => {
                debug!("visibility change: hidden={}", hidden);
                self.session.set_background(*hidden);
                return;
            }
            PageEvent::Focus { focused } => {
                debug!("focus change: focused={}", focused);
                self.session.set_background(!focused);
                return;
            }
            _ => {}
        }
        match self.rules.evaluate(event) {
            Some(WatchVerdict::ClickFix { selector }) => {
                // Autonomous fixes never race an in-flight automate call.
                if self.session.is_in_flight() {
                    debug!("fix button {} ignored: step in flight", selector);
                    return;
                }
                sleep(self.config.fix_settle).await;
                match self.driver.click_if_actionable(&selector).await {
                    Ok(true) => info!("auto-clicked fix button {}", selector),
                    Ok(false) => debug!("fix button {} no longer actionable", selector),
                    Err(e) => warn!("fix button click failed: {}", e),
                }
            }
            Some(WatchVerdict::Escalate(action)) => {
                info!(
                    "user action required ({}): {}",
                    action.kind.as_str(),
                    action.prompt
                );
                self.session.set_pending_action(action);
                self.session.pause();
            }
            None => {}
        }
    }
}
