//! MCP surface over [`Session`].
//!
//! The browser launches lazily on the first `navigate`; every other tool
//! requires an open page and says so instead of guessing.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::*,
    tool, tool_handler, tool_router, ServerHandler,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::Session;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct NavigateRequest {
    #[schemars(description = "URL of the AI tool page to open")]
    pub url: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RunStepRequest {
    #[schemars(description = "Instruction to send through the platform's chat input")]
    pub prompt: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ApplyFixRequest {
    #[schemars(description = "Issue index from scan_issues")]
    pub index: usize,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ClickElementRequest {
    #[schemars(description = "CSS selector of the element to click")]
    pub selector: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct FillInputRequest {
    #[schemars(description = "CSS selector of the input element")]
    pub selector: String,
    #[schemars(description = "Value to write into the element")]
    pub value: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetElementTextRequest {
    #[schemars(description = "CSS selector of the element to read")]
    pub selector: String,
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

fn err(e: impl std::fmt::Display) -> ErrorData {
    ErrorData::internal_error(e.to_string(), None::<Value>)
}

fn no_page() -> ErrorData {
    ErrorData::internal_error("No page open. Use navigate first.", None::<Value>)
}

fn text_ok(s: impl Into<String>) -> Result<CallToolResult, ErrorData> {
    Ok(CallToolResult::success(vec![Content::text(s.into())]))
}

#[derive(Clone)]
pub struct PagepilotServer {
    session: Arc<Mutex<Option<Session>>>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl PagepilotServer {
    pub fn new() -> Self {
        Self {
            session: Arc::new(Mutex::new(None)),
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "Open an AI tool page by URL. Launches the browser on first call.")]
    async fn navigate(
        &self,
        req: Parameters<NavigateRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        let mut guard = self.session.lock().await;
        if guard.is_none() {
            *guard = Some(Session::launch().await.map_err(err)?);
        }
        let session = guard.as_mut().ok_or_else(no_page)?;
        session.goto(&req.0.url).await.map_err(err)?;
        let url = session.url().await.map_err(err)?;
        let title = session.title().await.map_err(err)?;
        text_ok(format!("Navigated to: {}\nTitle: {}", url, title))
    }

    #[tool(
        description = "Identify which supported AI platform (ChatGPT, Claude, Gemini, Lovable, Bolt, v0) is hosted on the current page."
    )]
    async fn detect_platform(&self) -> Result<CallToolResult, ErrorData> {
        let guard = self.session.lock().await;
        let session = guard.as_ref().ok_or_else(no_page)?;
        match session.detect().await.map_err(err)? {
            Some(profile) => text_ok(format!("Platform: {}", profile.name)),
            None => text_ok("No supported platform on this page."),
        }
    }

    #[tool(
        description = "Scan the built page for structural issues (accessibility, performance, SEO, design). Returns a numbered list; use apply_fix with an index to remediate one."
    )]
    async fn scan_issues(&self) -> Result<CallToolResult, ErrorData> {
        let mut guard = self.session.lock().await;
        let session = guard.as_mut().ok_or_else(no_page)?;
        session.scan().await.map_err(err)?;
        let list = session.issue_list();
        text_ok(if list.is_empty() {
            "No issues found.".into()
        } else {
            list
        })
    }

    #[tool(
        description = "Send the remediation prompt for a scanned issue through the platform's chat input and wait for the reply."
    )]
    async fn apply_fix(&self, req: Parameters<ApplyFixRequest>) -> Result<CallToolResult, ErrorData> {
        let mut guard = self.session.lock().await;
        let session = guard.as_mut().ok_or_else(no_page)?;
        let outcome = session.apply_fix(req.0.index).await.map_err(err)?;
        text_ok(format!(
            "Fix submitted to {} ({} polls). Reply:\n{}",
            outcome.platform, outcome.polls, outcome.response
        ))
    }

    #[tool(
        description = "Send a prompt through the platform's chat input, submit it, and wait for the reply to stabilize. This is the core automation step."
    )]
    async fn run_step(&self, req: Parameters<RunStepRequest>) -> Result<CallToolResult, ErrorData> {
        let mut guard = self.session.lock().await;
        let session = guard.as_mut().ok_or_else(no_page)?;
        let outcome = session.run_step(&req.0.prompt).await.map_err(err)?;
        text_ok(format!(
            "Submitted via {} to {} ({} polls). Reply:\n{}",
            outcome.submitted_via, outcome.platform, outcome.polls, outcome.response
        ))
    }

    #[tool(description = "Click an element by CSS selector.")]
    async fn click_element(
        &self,
        req: Parameters<ClickElementRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        let guard = self.session.lock().await;
        let session = guard.as_ref().ok_or_else(no_page)?;
        let reply = session
            .dispatch(crate::CoordinatorCommand::ClickElement {
                selector: req.0.selector,
            })
            .await;
        reply_to_result(reply)
    }

    #[tool(description = "Write a value into an input element by CSS selector.")]
    async fn fill_input(
        &self,
        req: Parameters<FillInputRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        let guard = self.session.lock().await;
        let session = guard.as_ref().ok_or_else(no_page)?;
        let reply = session
            .dispatch(crate::CoordinatorCommand::FillInput {
                selector: req.0.selector,
                value: req.0.value,
            })
            .await;
        reply_to_result(reply)
    }

    #[tool(description = "Read the visible text of an element by CSS selector.")]
    async fn get_element_text(
        &self,
        req: Parameters<GetElementTextRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        let guard = self.session.lock().await;
        let session = guard.as_ref().ok_or_else(no_page)?;
        let reply = session
            .dispatch(crate::CoordinatorCommand::GetElementText {
                selector: req.0.selector,
            })
            .await;
        reply_to_result(reply)
    }

    #[tool(description = "Get the current page URL and title.")]
    async fn page_info(&self) -> Result<CallToolResult, ErrorData> {
        let guard = self.session.lock().await;
        let session = guard.as_ref().ok_or_else(no_page)?;
        let url = session.url().await.map_err(err)?;
        let title = session.title().await.map_err(err)?;
        text_ok(format!("URL: {}\nTitle: {}", url, title))
    }

    #[tool(description = "Pause automation. Subsequent run_step calls fail until resume.")]
    async fn pause(&self) -> Result<CallToolResult, ErrorData> {
        let guard = self.session.lock().await;
        let session = guard.as_ref().ok_or_else(no_page)?;
        session.pause();
        text_ok("Automation paused.")
    }

    #[tool(description = "Resume automation after a pause.")]
    async fn resume(&self) -> Result<CallToolResult, ErrorData> {
        let guard = self.session.lock().await;
        let session = guard.as_ref().ok_or_else(no_page)?;
        session.resume();
        text_ok("Automation resumed.")
    }

    #[tool(description = "Take a screenshot of the current page. Returns base64 PNG.")]
    async fn screenshot(&self) -> Result<CallToolResult, ErrorData> {
        let guard = self.session.lock().await;
        let session = guard.as_ref().ok_or_else(no_page)?;
        let png = session.screenshot().await.map_err(err)?;
        let b64 = BASE64.encode(&png);
        Ok(CallToolResult::success(vec![Content::image(
            b64,
            "image/png",
        )]))
    }

    #[tool(description = "Close the browser and release resources.")]
    async fn close(&self) -> Result<CallToolResult, ErrorData> {
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.take() {
            session.close().await.map_err(err)?;
        }
        text_ok("Browser closed.")
    }
}

fn reply_to_result(reply: crate::CoordinatorReply) -> Result<CallToolResult, ErrorData> {
    match reply {
        crate::CoordinatorReply::Error { message } => {
            Err(ErrorData::internal_error(message, None::<Value>))
        }
        crate::CoordinatorReply::Ack { message } => text_ok(message),
        crate::CoordinatorReply::Text { value } => {
            text_ok(value.unwrap_or_else(|| "Element not found.".into()))
        }
        other => text_ok(serde_json::to_string(&other).map_err(err)?),
    }
}

#[tool_handler]
impl ServerHandler for PagepilotServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "pagepilot-tools".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Automation server for browser-hosted AI tools. Use 'navigate' to open a tool's \
                 page (launches the browser automatically), 'detect_platform' to confirm it is \
                 supported, then 'run_step' to drive prompts through its chat input. \
                 'scan_issues' inspects the built page for structural problems and 'apply_fix' \
                 sends the remediation prompt for one of them. 'pause'/'resume' gate automation; \
                 click_element/fill_input/get_element_text give raw selector-level access."
                    .into(),
            ),
        }
    }
}

pub async fn run_server() -> anyhow::Result<()> {
    use rmcp::ServiceExt;

    let server = PagepilotServer::new();
    let service = server.serve(rmcp::transport::stdio()).await?;
    service.waiting().await?;
    Ok(())
}
