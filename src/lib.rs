//! # pagepilot-tools
//!
//! Automation engine for browser-hosted AI tools: drive prompts through
//! chat/builder pages (ChatGPT, Claude, Lovable, Bolt, v0, ...), scan built
//! pages for structural issues, and orchestrate multi-step plans. Usable as
//! a library through [`Session`], over a serde wire contract through
//! [`coordinator`], or as an MCP server (the `pagepilot-tools` binary).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pagepilot_tools::Session;
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let mut session = Session::launch().await?;
//! session.goto("https://lovable.dev/projects/demo").await?;
//! let outcome = session.run_step("Add a pricing section").await?;
//! println!("{}", outcome.response);
//! session.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod coordinator;
pub mod mcp;

use std::sync::Arc;

use anyhow::{bail, Context};
use eoka::{Browser, StealthConfig};
use tokio::task::JoinHandle;
use tracing::info;

use pagepilot_platform::{generate_fix_prompt, scan_for_issues, DetectedIssue, PlatformProfile};
use pagepilot_runtime::platform::Registry;
use pagepilot_runtime::{AutomateSuccess, AutomationRuntime, CdpDriver, RuntimeSession, Watcher};

pub use coordinator::{dispatch, CoordinatorCommand, CoordinatorReply};

/// An owned browser session bound to one page, with the automation runtime
/// and page watchers wired up. The primary API for library use.
pub struct Session {
    browser: Browser,
    driver: Arc<CdpDriver>,
    runtime: AutomationRuntime,
    session: RuntimeSession,
    watcher: Option<JoinHandle<()>>,
    /// Issues from the last scan, indexable by `apply_fix`.
    issues: Vec<DetectedIssue>,
}

impl Session {
    /// Launch a browser with default settings.
    pub async fn launch() -> anyhow::Result<Self> {
        Self::launch_with_config(StealthConfig::default()).await
    }

    /// Launch with custom stealth config.
    pub async fn launch_with_config(stealth: StealthConfig) -> anyhow::Result<Self> {
        let browser = Browser::launch_with_config(stealth).await?;
        let page = browser.new_page("about:blank").await?;
        let driver = Arc::new(CdpDriver::new(page));
        let runtime = AutomationRuntime::new(driver.clone(), Arc::new(Registry::builtin()));
        let session = runtime.session();
        let watcher = Watcher::new(driver.clone(), session.clone()).spawn();
        info!("session launched");
        Ok(Self {
            browser,
            driver,
            runtime,
            session,
            watcher: Some(watcher),
            issues: Vec::new(),
        })
    }

    /// The underlying page, for direct browser control.
    pub fn page(&self) -> &eoka::Page {
        self.driver.page()
    }

    pub async fn goto(&mut self, url: &str) -> anyhow::Result<()> {
        self.issues.clear();
        self.page().goto(url).await?;
        Ok(())
    }

    pub async fn url(&self) -> anyhow::Result<String> {
        Ok(self.page().url().await?)
    }

    pub async fn title(&self) -> anyhow::Result<String> {
        Ok(self.page().title().await?)
    }

    /// Raw PNG screenshot of the current viewport.
    pub async fn screenshot(&self) -> anyhow::Result<Vec<u8>> {
        Ok(self.page().screenshot().await?)
    }

    /// Which supported platform, if any, is hosted on the current page.
    pub async fn detect(&self) -> anyhow::Result<Option<PlatformProfile>> {
        Ok(self.runtime.detect_platform().await?)
    }

    /// Scan the page for structural issues the detected platform's
    /// capabilities allow. Results are cached for [`Session::apply_fix`].
    pub async fn scan(&mut self) -> anyhow::Result<&[DetectedIssue]> {
        let profile = match self.detect().await? {
            Some(p) => p,
            None => bail!("no supported platform on this page"),
        };
        self.issues = scan_for_issues(self.driver.as_ref(), &profile).await?;
        Ok(&self.issues)
    }

    /// Issues from the last scan.
    pub fn issues(&self) -> &[DetectedIssue] {
        &self.issues
    }

    /// Numbered text list of the last scan's issues.
    pub fn issue_list(&self) -> String {
        let mut out = String::with_capacity(self.issues.len() * 80);
        for (i, issue) in self.issues.iter().enumerate() {
            out.push_str(&format!(
                "[{}] {:?}/{} {}: {}\n",
                i,
                issue.severity,
                issue.category.as_str(),
                issue.title,
                issue.description
            ));
        }
        out
    }

    /// Send the remediation prompt for a previously scanned issue through
    /// the platform's chat input.
    pub async fn apply_fix(&mut self, index: usize) -> anyhow::Result<AutomateSuccess> {
        let issue = self
            .issues
            .get(index)
            .with_context(|| format!("no scanned issue at index {}", index))?
            .clone();
        let profile = match self.detect().await? {
            Some(p) => p,
            None => bail!("no supported platform on this page"),
        };
        let prompt = generate_fix_prompt(&issue, &profile);
        Ok(self.runtime.automate(&prompt).await?)
    }

    /// Run one prompt through the platform and wait for the stabilized
    /// reply.
    pub async fn run_step(&mut self, prompt: &str) -> anyhow::Result<AutomateSuccess> {
        Ok(self.runtime.automate(prompt).await?)
    }

    pub fn pause(&self) {
        self.runtime.pause();
    }

    pub fn resume(&self) {
        self.runtime.resume();
    }

    /// Relay one wire-contract command. Never errors; failures come back as
    /// [`CoordinatorReply::Error`].
    pub async fn dispatch(&self, command: CoordinatorCommand) -> CoordinatorReply {
        coordinator::dispatch(&self.runtime, command).await
    }

    /// Shut down the watcher task and close the browser.
    pub async fn close(mut self) -> anyhow::Result<()> {
        self.session.close();
        if let Some(watcher) = self.watcher.take() {
            let _ = watcher.await;
        }
        self.browser.close().await?;
        Ok(())
    }
}
