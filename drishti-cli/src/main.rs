// drishti command line entry point
// Live camera preview with toggleable face, hand and pose overlays

use anyhow::{Context, Result};
use drishti_eye::{default_loader, default_source, Controller, DrishtiConfig, ShutdownReason};
use std::process::ExitCode;
use std::time::Duration;
use tokio::io::BufReader;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn print_banner(config: &DrishtiConfig) {
    println!("\n╔═══════════════════════════════════════════════════════════════╗");
    println!("║            drishti - Multi-Function Visual Detection          ║");
    println!("╚═══════════════════════════════════════════════════════════════╝");
    println!();
    println!("Commands:");
    println!("  enable <id>       - Turn a detector on");
    println!("  disable <id>      - Turn a detector off");
    println!("  {:<17} - Quit (or press 'q' in the camera window)", config.shell.exit_token);
    println!();
}

async fn run() -> Result<ShutdownReason> {
    let (config, path) = DrishtiConfig::discover().context("Failed to load configuration")?;
    match &path {
        Some(path) => info!("Using configuration from {:?}", path),
        None => info!("No configuration file found, using built-in defaults"),
    }

    print_banner(&config);
    println!("Starting camera...");

    let source = default_source(&config.camera)?;
    let controller = Controller::from_config(config, source, default_loader())?;

    let input = BufReader::new(tokio::io::stdin());
    let mut output = tokio::io::stdout();
    let report = controller.run(input, &mut output).await?;

    if let Some(stats) = report.render {
        info!(
            "Rendered {} frame(s) ({} idle polls, {} failed iterations)",
            stats.frames_rendered, stats.idle_polls, stats.failed_iterations
        );
    }
    Ok(report.shutdown)
}

fn main() -> ExitCode {
    // Logs go to stderr so the prompt on stdout stays readable; RUST_LOG overrides.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(run());
    // A pending stdin read must not hold the process open.
    runtime.shutdown_timeout(Duration::from_millis(100));

    match result {
        Ok(ShutdownReason::InputError) => ExitCode::FAILURE,
        Ok(reason) => {
            info!("Exited: {:?}", reason);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
