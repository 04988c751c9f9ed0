#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pagepilot_tools::mcp::run_server().await
}
