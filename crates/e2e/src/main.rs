//! Board-check harness entry point
//!
//! Run with: cargo run --package movetrainer-e2e -- --base-url http://localhost:8000

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use movetrainer_e2e::config::SettleStrategy;
use movetrainer_e2e::report::Reporter;
use movetrainer_e2e::server::{AppServer, ServerConfig};
use movetrainer_e2e::{E2eResult, HarnessConfig, HarnessRunner};

#[derive(Parser, Debug)]
#[command(name = "movetrainer-e2e")]
#[command(about = "Verify that MoveTrainer's builder and trainer boards render")]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long, env = "MOVETRAINER_E2E_CONFIG", default_value = "movetrainer-e2e.toml")]
    config: PathBuf,

    /// Application root URL
    #[arg(long, env = "MOVETRAINER_E2E_BASE_URL")]
    base_url: Option<String>,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Chrome/Chromium binary
    #[arg(long, env = "CHROME")]
    chrome: Option<PathBuf>,

    /// Directory for screenshots
    #[arg(short, long)]
    artifacts: Option<PathBuf>,

    /// Settle strategy between phases
    #[arg(long, value_enum)]
    settle: Option<SettleStrategy>,

    /// Serve this directory with the configured server command before running
    #[arg(long)]
    serve: Option<PathBuf>,

    /// Exit non-zero unless the trainer board renders sized pieces
    #[arg(long)]
    strict: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

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

async fn async_main(args: Args) -> E2eResult<bool> {
    let mut config = HarnessConfig::load(&args.config)?;
    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    }
    if args.headed {
        config.browser.headless = false;
    }
    if let Some(chrome) = args.chrome {
        config.browser.executable = Some(chrome);
    }
    if let Some(dir) = args.artifacts {
        config.artifacts.dir = dir;
    }
    if let Some(strategy) = args.settle {
        config.settle.strategy = strategy;
    }
    if let Some(dir) = args.serve {
        let server = config.server.get_or_insert_with(ServerConfig::default);
        server.working_dir = dir;
    }
    config.validate()?;

    // Held for the whole run; killed on drop if the run errors out
    let server = match &config.server {
        Some(server) => Some(AppServer::spawn(server, &config.base_url).await?),
        None => None,
    };

    let runner = HarnessRunner::new(config);
    let mut reporter = Reporter::stdout(runner.config().artifacts.dir.clone());
    let outcome = runner.run(&mut reporter).await;
    if let Some(server) = server {
        server.shutdown().await;
    }
    let summary = outcome?;

    Ok(!args.strict || summary.trainer_visible())
}
