//! The plan execution state machine.
//!
//! One step at a time, in order, the index never moves backward past a
//! completed step. All retry policy lives here: the runtime reports each
//! attempt's outcome and this module decides whether to re-run, pause for a
//! human, or move on.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Notify;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::decision::{heuristic_classification, DecisionService};
use crate::events::{ExecutorEvent, LogLevel, LogLine, PlanStatus};
use crate::notify::{Notification, NotificationSink, NotifySeverity};
use crate::plan::RunMode;
use crate::step::{ResultStatus, Step, StepResult, StepStatus};
use pagepilot_runtime::{AutomationRuntime, Error as RuntimeError, RuntimeSession};

/// Corrective re-runs allowed per step, on top of the first execution.
const MAX_CORRECTIVE_RETRIES: usize = 2;

/// Breather between steps in full-auto mode, so platform rate limiting and
/// UI settling get a chance.
const STEP_DELAY: Duration = Duration::from_millis(1000);

/// Operator decision taken while execution is paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Continue with the next step (or re-enter the paused one).
    Resume,
    /// Mark the current step as skipped and advance.
    Skip,
    /// Re-run the current step with a fresh retry budget.
    Retry,
    /// Stop the plan.
    Abort,
}

#[derive(Default)]
struct ControlInner {
    aborted: AtomicBool,
    decision: Mutex<Option<Decision>>,
    notify: Notify,
}

/// Remote control for a running [`PlanExecutor`]. Cheap to clone; all clones
/// drive the same execution.
#[derive(Clone)]
pub struct ExecutorHandle {
    control: Arc<ControlInner>,
    session: RuntimeSession,
}

impl ExecutorHandle {
    /// Pause before the next `automate` call. Takes effect at the next step
    /// boundary; an in-flight poll is not interrupted.
    pub fn pause(&self) {
        self.session.pause();
    }

    pub fn resume(&self) {
        self.session.resume();
        self.submit(Decision::Resume);
    }

    pub fn skip(&self) {
        self.session.resume();
        self.submit(Decision::Skip);
    }

    pub fn retry(&self) {
        self.session.resume();
        self.submit(Decision::Retry);
    }

    pub fn abort(&self) {
        self.control.aborted.store(true, Ordering::SeqCst);
        self.session.resume();
        self.submit(Decision::Abort);
    }

    fn submit(&self, decision: Decision) {
        *self.control.decision.lock().unwrap() = Some(decision);
        self.control.notify.notify_one();
    }
}

/// Final account of one plan run.
#[derive(Debug)]
pub struct PlanReport {
    pub status: PlanStatus,
    pub completed_steps: usize,
    pub failed_steps: usize,
    /// The steps with their final statuses and recorded results.
    pub steps: Vec<Step>,
}

enum Flow {
    /// The step reached a terminal status (completed or errored). `withheld`
    /// is set when the classifier declined continuation without asking for a
    /// correction.
    Finished { withheld: bool },
    /// The whole plan cannot continue (e.g. unsupported platform).
    Fatal(String),
    Aborted,
}

enum Gate {
    Advance,
    Rerun,
    Abort,
}

/// Runs a list of steps through an [`AutomationRuntime`] under a
/// [`RunMode`] policy, emitting [`ExecutorEvent`]s as it goes.
pub struct PlanExecutor {
    runtime: AutomationRuntime,
    steps: Vec<Step>,
    mode: RunMode,
    decider: Arc<dyn DecisionService>,
    notifier: Arc<dyn NotificationSink>,
    control: Arc<ControlInner>,
    session: RuntimeSession,
    events: UnboundedSender<ExecutorEvent>,
}

impl PlanExecutor {
    pub fn new(
        runtime: AutomationRuntime,
        steps: Vec<Step>,
        mode: RunMode,
        decider: Arc<dyn DecisionService>,
        notifier: Arc<dyn NotificationSink>,
    ) -> (Self, UnboundedReceiver<ExecutorEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = runtime.session();
        let executor = Self {
            runtime,
            steps,
            mode,
            decider,
            notifier,
            control: Arc::new(ControlInner::default()),
            session,
            events: tx,
        };
        (executor, rx)
    }

    pub fn handle(&self) -> ExecutorHandle {
        ExecutorHandle {
            control: Arc::clone(&self.control),
            session: self.session.clone(),
        }
    }

    /// Run the plan to completion, abort, or fatal error.
    pub async fn run(mut self) -> PlanReport {
        info!("plan started: {} steps, mode {}", self.steps.len(), self.mode);
        self.set_plan_status(PlanStatus::Running);
        let mut status = PlanStatus::Completed;

        let mut index = 0;
        while index < self.steps.len() {
            if self.control.aborted.load(Ordering::SeqCst) {
                status = PlanStatus::Failed;
                break;
            }
            let withheld = match self.run_step(index).await {
                Flow::Finished { withheld } => withheld,
                Flow::Fatal(message) => {
                    self.log(LogLevel::Error, format!("plan aborted: {}", message));
                    status = PlanStatus::Failed;
                    break;
                }
                Flow::Aborted => {
                    status = PlanStatus::Failed;
                    break;
                }
            };
            let last = index + 1 == self.steps.len();
            match self.gate(index, last, withheld).await {
                Gate::Advance => index += 1,
                Gate::Rerun => {
                    self.steps[index].status = StepStatus::Pending;
                    self.steps[index].result = None;
                }
                Gate::Abort => {
                    status = PlanStatus::Failed;
                    break;
                }
            }
        }

        let completed = self
            .steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .count();
        let failed = self
            .steps
            .iter()
            .filter(|s| s.status == StepStatus::Error)
            .count();
        if failed > 0 {
            status = PlanStatus::Failed;
        }

        self.emit(ExecutorEvent::PlanFinished {
            status,
            completed_steps: completed,
        });
        let (severity, title) = match status {
            PlanStatus::Failed => (NotifySeverity::Error, "Plan failed"),
            _ => (NotifySeverity::Success, "Plan completed"),
        };
        self.send_notification(Notification::new(
            severity,
            title,
            format!("{} of {} steps completed", completed, self.steps.len()),
        ))
        .await;

        PlanReport {
            status,
            completed_steps: completed,
            failed_steps: failed,
            steps: self.steps,
        }
    }

    /// Execute one step until it reaches a terminal status, honoring the
    /// corrective retry budget. Runtime errors and classifier corrections
    /// draw from the same budget; a pause consumes nothing.
    async fn run_step(&mut self, index: usize) -> Flow {
        let mut executions = 0usize;
        loop {
            self.set_status(index, StepStatus::InProgress);
            let prompt = self.steps[index].prompt.clone();
            let title = self.steps[index].title.clone();
            executions += 1;
            self.log(
                LogLevel::Info,
                format!("step {} ({}): execution {}", index + 1, title, executions),
            );

            match self.runtime.automate(&prompt).await {
                Ok(outcome) => {
                    let classification = match self
                        .decider
                        .classify(&outcome.response, index)
                        .await
                    {
                        Ok(c) => c,
                        Err(e) => {
                            warn!("decision service unavailable: {}", e);
                            self.log(
                                LogLevel::Warning,
                                "decision service unavailable, using heuristic",
                            );
                            heuristic_classification(&outcome.response)
                        }
                    };

                    if classification.needs_correction {
                        if executions <= MAX_CORRECTIVE_RETRIES {
                            if let Some(corrected) = classification.correction_prompt {
                                self.steps[index].prompt = corrected;
                            }
                            self.log(
                                LogLevel::Warning,
                                format!("step {}: correction needed, re-running", index + 1),
                            );
                            continue;
                        }
                        self.finish_step(
                            index,
                            StepStatus::Error,
                            StepResult::error(
                                excerpt(&outcome.response),
                                Some(classification.suggestion),
                            ),
                        )
                        .await;
                        return Flow::Finished { withheld: false };
                    }

                    let withheld = !classification.should_continue;
                    let status = if classification.ambiguous {
                        ResultStatus::Ambiguous
                    } else {
                        ResultStatus::Success
                    };
                    self.finish_step(
                        index,
                        StepStatus::Completed,
                        StepResult {
                            status,
                            message: excerpt(&outcome.response),
                            suggestion: Some(classification.suggestion),
                            needs_user_action: None,
                        },
                    )
                    .await;
                    return Flow::Finished { withheld };
                }
                Err(RuntimeError::Paused) => {
                    // Pending action must be read before any resume clears it.
                    let action = self.session.take_pending_action();
                    executions -= 1;
                    match &action {
                        Some(a) => {
                            self.emit(ExecutorEvent::NeedsUserAction {
                                index,
                                action: a.clone(),
                            });
                            self.log(
                                LogLevel::Warning,
                                format!("step {}: page needs a human: {}", index + 1, a.prompt),
                            );
                            self.send_notification(
                                Notification::new(
                                    NotifySeverity::Warning,
                                    "Action required",
                                    a.prompt.clone(),
                                )
                                .with_metadata(serde_json::json!({ "kind": a.kind.as_str() })),
                            )
                            .await;
                        }
                        None => self.emit(ExecutorEvent::Paused { index }),
                    }
                    self.set_plan_status(PlanStatus::Paused);
                    match self.await_decision().await {
                        Decision::Resume | Decision::Retry => {
                            self.session.resume();
                            self.emit(ExecutorEvent::Resumed { index });
                            self.set_plan_status(PlanStatus::Running);
                            continue;
                        }
                        Decision::Skip => {
                            self.session.resume();
                            self.set_plan_status(PlanStatus::Running);
                            let result = StepResult {
                                needs_user_action: action,
                                ..StepResult::skipped()
                            };
                            self.finish_step(index, StepStatus::Completed, result).await;
                            return Flow::Finished { withheld: false };
                        }
                        Decision::Abort => return Flow::Aborted,
                    }
                }
                Err(e @ RuntimeError::UnsupportedPlatform(_)) => {
                    self.finish_step(
                        index,
                        StepStatus::Error,
                        StepResult::error(e.to_string(), None),
                    )
                    .await;
                    return Flow::Fatal(e.to_string());
                }
                Err(e) => {
                    if executions <= MAX_CORRECTIVE_RETRIES {
                        self.log(
                            LogLevel::Warning,
                            format!("step {}: {} ({}), retrying", index + 1, e, e.kind()),
                        );
                        continue;
                    }
                    self.finish_step(
                        index,
                        StepStatus::Error,
                        StepResult::error(e.to_string(), None),
                    )
                    .await;
                    return Flow::Finished { withheld: false };
                }
            }
        }
    }

    /// Between-step policy: manual mode pauses after every step (the last
    /// one included), auto pauses over an errored step or when the
    /// classifier withheld continuation, full-auto never pauses.
    async fn gate(&mut self, index: usize, last: bool, withheld: bool) -> Gate {
        let errored = self.steps[index].status == StepStatus::Error;
        let pause = match self.mode {
            RunMode::Manual => true,
            RunMode::Auto => errored || withheld,
            RunMode::FullAuto => false,
        };
        if !pause {
            if self.mode == RunMode::FullAuto && !last {
                sleep(STEP_DELAY).await;
            }
            return Gate::Advance;
        }

        self.session.pause();
        self.emit(ExecutorEvent::Paused { index });
        self.set_plan_status(PlanStatus::Paused);
        self.log(
            LogLevel::Info,
            format!("paused after step {}, awaiting decision", index + 1),
        );
        match self.await_decision().await {
            Decision::Resume => {
                self.session.resume();
                self.emit(ExecutorEvent::Resumed { index });
                self.set_plan_status(PlanStatus::Running);
                Gate::Advance
            }
            Decision::Skip => {
                self.session.resume();
                self.emit(ExecutorEvent::Resumed { index });
                self.set_plan_status(PlanStatus::Running);
                if errored {
                    // Skipping past a failed step forgives it.
                    self.steps[index].result = Some(StepResult::skipped());
                    self.set_status(index, StepStatus::Completed);
                }
                Gate::Advance
            }
            Decision::Retry => {
                self.session.resume();
                self.emit(ExecutorEvent::Resumed { index });
                self.set_plan_status(PlanStatus::Running);
                Gate::Rerun
            }
            Decision::Abort => Gate::Abort,
        }
    }

    async fn await_decision(&self) -> Decision {
        loop {
            if self.control.aborted.load(Ordering::SeqCst) {
                return Decision::Abort;
            }
            if let Some(decision) = self.control.decision.lock().unwrap().take() {
                return decision;
            }
            self.control.notify.notified().await;
        }
    }

    fn set_plan_status(&self, status: PlanStatus) {
        self.emit(ExecutorEvent::PlanStatusChanged { status });
    }

    fn set_status(&mut self, index: usize, status: StepStatus) {
        self.steps[index].status = status;
        self.emit(ExecutorEvent::StepStatusChanged { index, status });
    }

    async fn finish_step(&mut self, index: usize, status: StepStatus, result: StepResult) {
        self.set_status(index, status);
        self.steps[index].result = Some(result.clone());
        self.emit(ExecutorEvent::StepFinished {
            index,
            result: result.clone(),
        });

        let title = &self.steps[index].title;
        let notification = match status {
            StepStatus::Error => Notification::new(
                NotifySeverity::Error,
                format!("Step failed: {}", title),
                result.message.clone(),
            ),
            _ => Notification::new(
                NotifySeverity::Success,
                format!("Step completed: {}", title),
                result.message.clone(),
            ),
        };
        self.send_notification(notification).await;
    }

    /// Notification failures are logged and swallowed; they never affect
    /// step outcomes.
    async fn send_notification(&self, notification: Notification) {
        if let Err(e) = self.notifier.notify(&notification).await {
            warn!("notification sink failed: {}", e);
        }
    }

    fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.emit(ExecutorEvent::Log(LogLine::new(level, message)));
    }

    fn emit(&self, event: ExecutorEvent) {
        // A dropped receiver means nobody is watching; execution continues.
        let _ = self.events.send(event);
    }
}

/// First line, capped, for step result messages.
fn excerpt(text: &str) -> String {
    const MAX: usize = 400;
    let line = text.lines().next().unwrap_or_default();
    if line.len() <= MAX {
        line.to_string()
    } else {
        let mut end = MAX;
        while !line.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &line[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::Classification;
    use crate::notify::MemoryNotifier;
    use crate::{Error, Result};
    use async_trait::async_trait;
    use pagepilot_runtime::platform::registry::ScanCapabilities;
    use pagepilot_runtime::platform::{PlatformProfile, Registry};
    use pagepilot_runtime::{ActionKind, FakeDriver, PendingAction, PollConfig};

    struct FnDecider<F>(F);

    #[async_trait]
    impl<F> DecisionService for FnDecider<F>
    where
        F: Fn(&str, usize) -> Result<Classification> + Send + Sync,
    {
        async fn classify(&self, response: &str, index: usize) -> Result<Classification> {
            (self.0)(response, index)
        }
    }

    fn continue_on() -> Classification {
        Classification {
            should_continue: true,
            needs_correction: false,
            correction_prompt: None,
            suggestion: "looks good".into(),
            ambiguous: false,
        }
    }

    fn correct_with(prompt: &str) -> Classification {
        Classification {
            should_continue: false,
            needs_correction: true,
            correction_prompt: Some(prompt.into()),
            suggestion: "needs another pass".into(),
            ambiguous: false,
        }
    }

    fn withhold() -> Classification {
        Classification {
            should_continue: false,
            needs_correction: false,
            correction_prompt: None,
            suggestion: "review before continuing".into(),
            ambiguous: false,
        }
    }

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

    fn happy_driver() -> FakeDriver {
        FakeDriver::new("testtool.app")
            .with_selector("#prompt")
            .with_actionable("#send")
            .with_text_script("#response", ["All done.", "All done."])
    }

    fn runtime_with(driver: FakeDriver) -> (Arc<FakeDriver>, AutomationRuntime) {
        let driver = Arc::new(driver);
        let runtime = AutomationRuntime::new(driver.clone(), test_registry())
            .with_poll_config(fast_poll());
        (driver, runtime)
    }

    fn steps(n: usize) -> Vec<Step> {
        (1..=n)
            .map(|i| Step::new(format!("s{}", i), format!("Step {}", i), format!("do {}", i)))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_corrective_retry_budget_is_three_executions() {
        let (driver, runtime) = runtime_with(happy_driver());
        let (executor, _events) = PlanExecutor::new(
            runtime,
            steps(1),
            RunMode::FullAuto,
            Arc::new(FnDecider(|_: &str, _| Ok(correct_with("try harder")))),
            Arc::new(MemoryNotifier::new()),
        );
        let report = executor.run().await;

        assert_eq!(driver.injected().len(), 3);
        assert_eq!(driver.injected()[1].1, "try harder");
        assert_eq!(report.failed_steps, 1);
        assert_eq!(report.status, PlanStatus::Failed);
        assert_eq!(report.steps[0].status, StepStatus::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_mode_pauses_after_every_step() {
        let (_driver, runtime) = runtime_with(happy_driver());
        let (executor, mut events) = PlanExecutor::new(
            runtime,
            steps(3),
            RunMode::Manual,
            Arc::new(FnDecider(|_: &str, _| Ok(continue_on()))),
            Arc::new(MemoryNotifier::new()),
        );
        let handle = executor.handle();
        let run = tokio::spawn(executor.run());

        let mut pauses = 0;
        while let Some(event) = events.recv().await {
            match event {
                ExecutorEvent::Paused { .. } => {
                    pauses += 1;
                    handle.resume();
                }
                ExecutorEvent::PlanFinished { .. } => break,
                _ => {}
            }
        }
        let report = run.await.unwrap();
        assert_eq!(pauses, 3);
        assert_eq!(report.status, PlanStatus::Completed);
        assert_eq!(report.completed_steps, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_mode_never_pauses_on_success() {
        let (_driver, runtime) = runtime_with(happy_driver());
        let (executor, mut events) = PlanExecutor::new(
            runtime,
            steps(2),
            RunMode::Auto,
            Arc::new(FnDecider(|_: &str, _| Ok(continue_on()))),
            Arc::new(MemoryNotifier::new()),
        );
        let report = executor.run().await;

        assert_eq!(report.status, PlanStatus::Completed);
        assert_eq!(report.completed_steps, 2);
        let mut pauses = 0;
        while let Ok(event) = events.try_recv() {
            if matches!(event, ExecutorEvent::Paused { .. }) {
                pauses += 1;
            }
        }
        assert_eq!(pauses, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_mode_pauses_when_continuation_withheld() {
        let (_driver, runtime) = runtime_with(happy_driver());
        let (executor, mut events) = PlanExecutor::new(
            runtime,
            steps(2),
            RunMode::Auto,
            Arc::new(FnDecider(|_: &str, _| Ok(withhold()))),
            Arc::new(MemoryNotifier::new()),
        );
        let handle = executor.handle();
        let run = tokio::spawn(executor.run());

        let mut pauses = 0;
        while let Some(event) = events.recv().await {
            match event {
                ExecutorEvent::Paused { .. } => {
                    pauses += 1;
                    handle.resume();
                }
                ExecutorEvent::PlanFinished { .. } => break,
                _ => {}
            }
        }
        let report = run.await.unwrap();
        assert_eq!(pauses, 2);
        assert_eq!(report.status, PlanStatus::Completed);
        assert_eq!(report.completed_steps, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_at_error_pause_completes_step_as_skipped() {
        let (_driver, runtime) = runtime_with(happy_driver());
        // Step 1 never satisfies the classifier; step 2 passes.
        let decider = FnDecider(|_: &str, index: usize| {
            if index == 0 {
                Ok(correct_with("again"))
            } else {
                Ok(continue_on())
            }
        });
        let (executor, mut events) = PlanExecutor::new(
            runtime,
            steps(2),
            RunMode::Auto,
            Arc::new(decider),
            Arc::new(MemoryNotifier::new()),
        );
        let handle = executor.handle();
        let run = tokio::spawn(executor.run());

        while let Some(event) = events.recv().await {
            match event {
                ExecutorEvent::Paused { .. } => handle.skip(),
                ExecutorEvent::PlanFinished { .. } => break,
                _ => {}
            }
        }
        let report = run.await.unwrap();
        assert_eq!(report.steps[0].status, StepStatus::Completed);
        assert_eq!(report.steps[0].result.as_ref().unwrap().message, "skipped");
        assert_eq!(report.steps[1].status, StepStatus::Completed);
        assert_eq!(report.failed_steps, 0);
        assert_eq!(report.status, PlanStatus::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_plan_status_transitions_are_observable() {
        let (_driver, runtime) = runtime_with(happy_driver());
        let (executor, mut events) = PlanExecutor::new(
            runtime,
            steps(1),
            RunMode::Manual,
            Arc::new(FnDecider(|_: &str, _| Ok(continue_on()))),
            Arc::new(MemoryNotifier::new()),
        );
        let handle = executor.handle();
        let run = tokio::spawn(executor.run());

        let mut statuses = Vec::new();
        while let Some(event) = events.recv().await {
            match event {
                ExecutorEvent::PlanStatusChanged { status } => {
                    statuses.push(status);
                    if status == PlanStatus::Paused {
                        handle.resume();
                    }
                }
                ExecutorEvent::PlanFinished { .. } => break,
                _ => {}
            }
        }
        run.await.unwrap();
        assert_eq!(
            statuses,
            vec![PlanStatus::Running, PlanStatus::Paused, PlanStatus::Running]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_auto_continues_past_failed_step() {
        let (driver, runtime) = runtime_with(happy_driver());
        // Step 2 never satisfies the classifier; 1 and 3 pass.
        let decider = FnDecider(|_: &str, index: usize| {
            if index == 1 {
                Ok(correct_with("again"))
            } else {
                Ok(continue_on())
            }
        });
        let (executor, _events) = PlanExecutor::new(
            runtime,
            steps(3),
            RunMode::FullAuto,
            Arc::new(decider),
            Arc::new(MemoryNotifier::new()),
        );
        let report = executor.run().await;

        assert_eq!(report.steps[0].status, StepStatus::Completed);
        assert_eq!(report.steps[1].status, StepStatus::Error);
        assert_eq!(report.steps[2].status, StepStatus::Completed);
        assert_eq!(report.completed_steps, 2);
        assert_eq!(report.failed_steps, 1);
        assert_eq!(report.status, PlanStatus::Failed);
        // 1 + 3 (budget) + 1 executions in order.
        assert_eq!(driver.injected().len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_action_surfaces_and_skip_advances() {
        let (driver, runtime) = runtime_with(happy_driver());
        let session = runtime.session();
        session.set_pending_action(PendingAction {
            kind: ActionKind::Credential,
            prompt: "Sign in to continue".into(),
        });
        session.pause();

        let (executor, mut events) = PlanExecutor::new(
            runtime,
            steps(1),
            RunMode::Auto,
            Arc::new(FnDecider(|_: &str, _| Ok(continue_on()))),
            Arc::new(MemoryNotifier::new()),
        );
        let handle = executor.handle();
        let run = tokio::spawn(executor.run());

        let mut saw_action = false;
        while let Some(event) = events.recv().await {
            match event {
                ExecutorEvent::NeedsUserAction { action, .. } => {
                    assert_eq!(action.kind, ActionKind::Credential);
                    saw_action = true;
                    handle.skip();
                }
                ExecutorEvent::PlanFinished { .. } => break,
                _ => {}
            }
        }
        let report = run.await.unwrap();
        assert!(saw_action);
        assert_eq!(report.status, PlanStatus::Completed);
        let result = report.steps[0].result.as_ref().unwrap();
        assert_eq!(result.message, "skipped");
        // The skipped escalation is recorded on the result.
        assert_eq!(
            result.needs_user_action.as_ref().unwrap().kind,
            ActionKind::Credential
        );
        // The paused attempt never reached the page.
        assert!(driver.injected().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_decision_service_failure_falls_back_to_heuristic() {
        let (_driver, runtime) = runtime_with(happy_driver());
        let (executor, _events) = PlanExecutor::new(
            runtime,
            steps(1),
            RunMode::Auto,
            Arc::new(FnDecider(|_: &str, _| {
                Err(Error::Decision("connection refused".into()))
            })),
            Arc::new(MemoryNotifier::new()),
        );
        let report = executor.run().await;

        // "All done." matches the heuristic's success vocabulary.
        assert_eq!(report.status, PlanStatus::Completed);
        assert_eq!(report.completed_steps, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_notifications_arrive_in_step_order() {
        let (_driver, runtime) = runtime_with(happy_driver());
        let notifier = Arc::new(MemoryNotifier::new());
        let (executor, _events) = PlanExecutor::new(
            runtime,
            steps(2),
            RunMode::Auto,
            Arc::new(FnDecider(|_: &str, _| Ok(continue_on()))),
            notifier.clone(),
        );
        let report = executor.run().await;

        assert_eq!(report.status, PlanStatus::Completed);
        assert_eq!(
            notifier.titles(),
            vec![
                "Step completed: Step 1".to_string(),
                "Step completed: Step 2".to_string(),
                "Plan completed".to_string(),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_at_pause_stops_the_plan() {
        let (_driver, runtime) = runtime_with(happy_driver());
        let (executor, mut events) = PlanExecutor::new(
            runtime,
            steps(2),
            RunMode::Manual,
            Arc::new(FnDecider(|_: &str, _| Ok(continue_on()))),
            Arc::new(MemoryNotifier::new()),
        );
        let handle = executor.handle();
        let run = tokio::spawn(executor.run());

        while let Some(event) = events.recv().await {
            match event {
                ExecutorEvent::Paused { .. } => handle.abort(),
                ExecutorEvent::PlanFinished { .. } => break,
                _ => {}
            }
        }
        let report = run.await.unwrap();
        assert_eq!(report.status, PlanStatus::Failed);
        assert_eq!(report.completed_steps, 1);
        assert_eq!(report.steps[1].status, StepStatus::Pending);
    }

    #[tokio::test(start_paused = true)]
    async fn test_runtime_errors_share_the_retry_budget() {
        // Input element missing: every injection fails.
        let driver = FakeDriver::new("testtool.app")
            .with_actionable("#send")
            .with_text_script("#response", ["never read"]);
        let (driver, runtime) = runtime_with(driver);
        let (executor, _events) = PlanExecutor::new(
            runtime,
            steps(1),
            RunMode::FullAuto,
            Arc::new(FnDecider(|_: &str, _| Ok(continue_on()))),
            Arc::new(MemoryNotifier::new()),
        );
        let report = executor.run().await;

        assert_eq!(report.status, PlanStatus::Failed);
        assert_eq!(report.steps[0].status, StepStatus::Error);
        assert!(report.steps[0]
            .result
            .as_ref()
            .unwrap()
            .message
            .contains("element not found"));
        assert!(driver.injected().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsupported_platform_is_fatal() {
        let (_driver, runtime) = runtime_with(FakeDriver::new("unknown.example"));
        let (executor, _events) = PlanExecutor::new(
            runtime,
            steps(2),
            RunMode::FullAuto,
            Arc::new(FnDecider(|_: &str, _| Ok(continue_on()))),
            Arc::new(MemoryNotifier::new()),
        );
        let report = executor.run().await;

        assert_eq!(report.status, PlanStatus::Failed);
        assert_eq!(report.steps[0].status, StepStatus::Error);
        // The second step was never attempted.
        assert_eq!(report.steps[1].status, StepStatus::Pending);
    }
}
