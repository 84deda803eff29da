//! E2E test runner entry point
//!
//! Runs the registration suite (plus any YAML scenarios) against the
//! configured base URL.
//! Run with: cargo run --package register-e2e -- --tag validation

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use register_e2e::playwright::{Browser, PlaywrightConfig};
use register_e2e::{register, E2eError, E2eResult, RunnerConfig, Scenario, TestRunner};

#[derive(Parser, Debug)]
#[command(name = "register-e2e")]
#[command(about = "Browser acceptance tests for the registration form")]
struct Args {
    /// Base URL of the site under test
    #[arg(long, env = "REGISTER_E2E_BASE_URL", default_value = register::DEFAULT_BASE_URL)]
    base_url: String,

    /// Directory with additional YAML scenarios
    #[arg(short, long)]
    specs: Option<PathBuf>,

    /// Run only scenarios with this tag
    #[arg(short, long)]
    tag: Option<String>,

    /// Run only the scenario with this name
    #[arg(short, long)]
    name: Option<String>,

    /// List the selected scenarios and exit
    #[arg(long)]
    list: bool,

    /// Browser to use (chromium, firefox, webkit)
    #[arg(long, default_value = "chromium")]
    browser: String,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Scenarios running at the same time
    #[arg(short, long, default_value = "4")]
    workers: usize,

    /// Timeout for each element lookup, interaction and assertion
    #[arg(long, default_value = "5000")]
    timeout_ms: u64,

    /// Timeout for a page load
    #[arg(long, default_value = "30000")]
    navigation_timeout_ms: u64,

    /// Limit for a single scenario
    #[arg(long, default_value = "120")]
    scenario_timeout_secs: u64,

    /// Limit for the whole run
    #[arg(long, default_value = "600")]
    run_timeout_secs: u64,

    /// Skip the reachability check of the base URL
    #[arg(long)]
    skip_preflight: bool,

    /// Node.js binary
    #[arg(long, default_value = "node")]
    node: PathBuf,

    /// node_modules directory containing playwright
    #[arg(long, default_value = "node_modules")]
    node_modules: PathBuf,

    /// Output directory for results
    #[arg(short, long, default_value = "test-results")]
    output: PathBuf,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Log as JSON lines
    #[arg(long)]
    log_json: bool,
}

fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose, args.log_json);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {}", e);
            std::process::exit(2);
        }
    };

    match rt.block_on(async_main(args)) {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

fn select(args: &Args) -> E2eResult<Vec<Scenario>> {
    let mut scenarios = register::suite();
    if let Some(dir) = &args.specs {
        scenarios.extend(Scenario::load_all(dir)?);
    }

    if let Some(tag) = &args.tag {
        scenarios.retain(|s| s.tags.iter().any(|t| t == tag));
    }
    if let Some(name) = &args.name {
        scenarios.retain(|s| &s.name == name);
        if scenarios.is_empty() {
            return Err(E2eError::SpecParse(format!("Scenario not found: {}", name)));
        }
    }

    Ok(scenarios)
}

async fn async_main(args: Args) -> E2eResult<bool> {
    let scenarios = select(&args)?;

    if args.list {
        for scenario in &scenarios {
            println!("{:<28} [{}] {}", scenario.name, scenario.tags.join(","), scenario.description);
        }
        return Ok(true);
    }

    let config = RunnerConfig {
        playwright: PlaywrightConfig {
            base_url: args.base_url,
            screenshot_dir: args.output.join("screenshots"),
            browser: args.browser.parse::<Browser>()?,
            headless: !args.headed,
            default_timeout_ms: args.timeout_ms,
            navigation_timeout_ms: args.navigation_timeout_ms,
            scenario_timeout: Duration::from_secs(args.scenario_timeout_secs),
            node_binary: args.node,
            node_modules: args.node_modules,
        },
        workers: args.workers,
        run_timeout: Duration::from_secs(args.run_timeout_secs),
        preflight: !args.skip_preflight,
        output_dir: args.output,
    };

    let runner = TestRunner::with_config(config)?;
    runner.playwright().check_playwright_installed().await?;

    let results = runner.run_scenarios(&scenarios).await?;
    runner.write_results(&results)?;

    Ok(results.all_passed())
}
