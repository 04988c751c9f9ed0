//! Shared runtime session state.
//!
//! One `RuntimeSession` exists per page binding. It replaces what would
//! otherwise be ambient page-global flags: everything that needs to read or
//! flip paused/background state holds a clone.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// What kind of human decision a page banner is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Confirmation,
    Approval,
    Credential,
    Payment,
    Other,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Confirmation => "confirmation",
            ActionKind::Approval => "approval",
            ActionKind::Credential => "credential",
            ActionKind::Payment => "payment",
            ActionKind::Other => "other",
        }
    }
}

/// A human decision the page is waiting on, captured by the watcher.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAction {
    pub kind: ActionKind,
    /// The text that triggered the escalation, surfaced to the user.
    pub prompt: String,
}

#[derive(Debug, Default)]
struct Inner {
    paused: AtomicBool,
    background: AtomicBool,
    in_flight: AtomicBool,
    closed: AtomicBool,
    pending_action: Mutex<Option<PendingAction>>,
}

/// Cheap-to-clone handle on the live session flags.
#[derive(Debug, Clone, Default)]
pub struct RuntimeSession {
    inner: Arc<Inner>,
}

impl RuntimeSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block new `automate` calls. Does not interrupt an in-flight poll.
    pub fn pause(&self) {
        self.inner.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.inner.paused.store(false, Ordering::SeqCst);
        self.inner.pending_action.lock().unwrap().take();
    }

    pub fn is_paused(&self) -> bool {
        self.inner.paused.load(Ordering::SeqCst)
    }

    /// Page hidden or window unfocused; the keep-alive ticker keys off this.
    pub fn set_background(&self, background: bool) {
        self.inner.background.store(background, Ordering::SeqCst);
    }

    pub fn is_background(&self) -> bool {
        self.inner.background.load(Ordering::SeqCst)
    }

    pub(crate) fn set_in_flight(&self, in_flight: bool) {
        self.inner.in_flight.store(in_flight, Ordering::SeqCst);
    }

    /// Whether an `automate` call is currently driving the page.
    pub fn is_in_flight(&self) -> bool {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Tear down background tasks bound to this session.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    pub fn set_pending_action(&self, action: PendingAction) {
        *self.inner.pending_action.lock().unwrap() = Some(action);
    }

    /// Take the escalation recorded by the watcher, if any.
    pub fn take_pending_action(&self) -> Option<PendingAction> {
        self.inner.pending_action.lock().unwrap().take()
    }

    pub fn has_pending_action(&self) -> bool {
        self.inner.pending_action.lock().unwrap().is_some()
    }
}

/// Clears the in-flight flag even when `automate` errors mid-way.
pub(crate) struct InFlightGuard(pub(crate) RuntimeSession);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.set_in_flight(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pause_resume() {
        let s = RuntimeSession::new();
        assert!(!s.is_paused());
        s.pause();
        assert!(s.is_paused());
        s.resume();
        assert!(!s.is_paused());
    }

    #[test]
    fn test_resume_clears_pending_action() {
        let s = RuntimeSession::new();
        s.set_pending_action(PendingAction {
            kind: ActionKind::Credential,
            prompt: "Sign in to continue".into(),
        });
        s.pause();
        assert!(s.has_pending_action());
        s.resume();
        assert!(!s.has_pending_action());
    }

    #[test]
    fn test_clones_share_state() {
        let a = RuntimeSession::new();
        let b = a.clone();
        a.pause();
        assert!(b.is_paused());
        b.set_background(true);
        assert!(a.is_background());
    }

    #[test]
    fn test_in_flight_guard_resets_on_drop() {
        let s = RuntimeSession::new();
        {
            s.set_in_flight(true);
            let _guard = InFlightGuard(s.clone());
            assert!(s.is_in_flight());
        }
        assert!(!s.is_in_flight());
    }
}
