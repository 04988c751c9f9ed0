use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use pagepilot_executor::{
    ExecutorEvent, HttpDecisionService, Params, Plan, PlanExecutor, PlanStatus, TracingNotifier,
};
use pagepilot_runtime::platform::Registry;
use pagepilot_runtime::{AutomationRuntime, CdpDriver, Watcher};

#[derive(Parser)]
#[command(name = "pagepilot")]
#[command(about = "Plan-based automation for browser-hosted AI builders")]
#[command(version)]
struct Cli {
    /// Plan file to run
    plan: PathBuf,

    /// Run the browser headless (overrides the plan)
    #[arg(long)]
    headless: bool,

    /// Set a parameter (can be used multiple times)
    #[arg(short = 'P', long = "param", value_name = "KEY=VALUE")]
    params: Vec<String>,

    /// Verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Validate the plan without running it
    #[arg(long)]
    check: bool,

    /// Quiet mode (only errors)
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            _ => Level::DEBUG,
        }
    };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    let params = Params::from_args(&cli.params)?;
    let mut plan = Plan::load_with_params(&cli.plan, &params)?;

    if cli.check {
        println!("Plan valid: {}", plan.name);
        println!("  Target: {}", plan.target.url);
        println!("  Mode: {}", plan.mode);
        println!("  Steps: {}", plan.steps.len());
        if !plan.params.is_empty() {
            println!("  Parameters: {}", plan.params.len());
            for (name, def) in &plan.params {
                let req = if def.required { " (required)" } else { "" };
                let desc = def.description.as_deref().unwrap_or("");
                println!("    - {}{}: {}", name, req, desc);
            }
        }
        if let Some(ref endpoint) = plan.decision_service {
            println!("  Decision service: {}", endpoint);
        }
        return Ok(());
    }

    if cli.headless {
        plan.browser.headless = true;
    }

    println!("Running: {} ({} mode)", plan.name, plan.mode);

    let stealth = eoka::StealthConfig {
        headless: plan.browser.headless,
        proxy: plan.browser.proxy.clone(),
        user_agent: plan.browser.user_agent.clone(),
        ..Default::default()
    };
    let browser = eoka::Browser::launch_with_config(stealth).await?;
    let page = browser.new_page(&plan.target.url).await?;
    let driver = Arc::new(CdpDriver::new(page));

    let runtime = AutomationRuntime::new(driver.clone(), Arc::new(Registry::builtin()));
    let session = runtime.session();
    let watcher = Watcher::new(driver.clone(), session.clone()).spawn();

    let decider: Arc<dyn pagepilot_executor::DecisionService> = match plan.decision_service {
        Some(ref endpoint) => Arc::new(HttpDecisionService::new(endpoint.clone())),
        None => Arc::new(HeuristicOnly),
    };

    let mode = plan.mode;
    let steps = plan.into_steps();
    let total = steps.len();
    let (executor, mut events) =
        PlanExecutor::new(runtime, steps, mode, decider, Arc::new(TracingNotifier));

    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                ExecutorEvent::Log(line) => println!("  [{:?}] {}", line.level, line.message),
                ExecutorEvent::StepFinished { index, result } => {
                    println!("  step {}: {:?} - {}", index + 1, result.status, result.message)
                }
                ExecutorEvent::NeedsUserAction { action, .. } => {
                    println!("  ! action required: {}", action.prompt)
                }
                ExecutorEvent::PlanFinished { .. } => break,
                _ => {}
            }
        }
    });

    let report = executor.run().await;
    let _ = printer.await;

    session.close();
    let _ = watcher.await;
    browser.close().await?;

    println!();
    match report.status {
        PlanStatus::Completed => println!("✓ Completed"),
        _ => println!("✗ Failed"),
    }
    println!("  Steps: {}/{} completed", report.completed_steps, total);
    if report.failed_steps > 0 {
        println!("  Failed: {}", report.failed_steps);
    }

    if report.status != PlanStatus::Completed {
        std::process::exit(1);
    }

    Ok(())
}

/// Decider used when no service endpoint is configured.
struct HeuristicOnly;

#[async_trait::async_trait]
impl pagepilot_executor::DecisionService for HeuristicOnly {
    async fn classify(
        &self,
        response: &str,
        _index: usize,
    ) -> pagepilot_executor::Result<pagepilot_executor::Classification> {
        Ok(pagepilot_executor::heuristic_classification(response))
    }
}
