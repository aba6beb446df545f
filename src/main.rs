//! debug-sandbox
//!
//! Runs an interactive debugger for a source file inside a container and
//! prints the result block the debugger emitted once it exits.
//! Sandbox paths may be overridden via the `DEBUG_SANDBOX_CONFIG` env var.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use debug_sandbox::{
    backend::TerminalLauncher,
    config::SandboxConfig,
    runtime::RUNTIMES,
    session::{self, LogLevel, SessionRequest},
};

#[derive(Parser, Debug)]
#[command(name = "debug-sandbox")]
#[command(about = "Debug a source file inside a container sandbox")]
struct Args {
    /// Source file to debug
    #[arg(required_unless_present = "list_runtimes")]
    file: Option<PathBuf>,

    /// Log level passed to the debugger runtime
    #[arg(long, value_enum, default_value_t = LogLevel::Off)]
    log_level: LogLevel,

    /// Print the sandbox command instead of running it
    #[arg(long)]
    dry_run: bool,

    /// List supported file extensions and exit
    #[arg(long)]
    list_runtimes: bool,

    /// Give up if no result arrives within this many seconds
    #[arg(long, value_name = "SECS")]
    result_timeout: Option<u64>,

    /// Parse the result as JSON and pretty-print it
    #[arg(long)]
    pretty: bool,

    /// Log filter for this program (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    verbosity: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // stderr keeps stdout for the debugger and the result
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.verbosity)),
        )
        .with_writer(std::io::stderr)
        .init();

    if args.list_runtimes {
        for rt in RUNTIMES {
            println!("{:<8} {:<24} {}", rt.name, rt.image, rt.extensions.join(" "));
        }
        return Ok(());
    }

    let file = args.file.context("No source file given")?;
    let config = SandboxConfig::from_env().context("Failed to load configuration")?;
    let request = SessionRequest::new(file).with_log_level(args.log_level);

    if args.dry_run {
        let plan = session::plan(&request, &config)?;
        println!("{plan}");
        return Ok(());
    }

    let launcher =
        TerminalLauncher::new().with_result_timeout(args.result_timeout.map(Duration::from_secs));
    let payload = session::run(request, &config, &launcher).await?;

    info!(payload_len = payload.len(), "Received result");

    if args.pretty {
        let value: serde_json::Value =
            serde_json::from_str(&payload).context("Result is not valid JSON")?;
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{payload}");
    }

    Ok(())
}
