//! padshell - Launchpad to shell bridge
//!
//! Maps pads of a Novation Launchpad to shell commands and aliases.

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use padshell::colors;
use padshell::config::AppConfig;
use padshell::device::discovery;
use padshell::{Controller, ControllerOptions, LaunchpadDevice, ShellExecutor};

/// padshell - Run shell commands from a Launchpad
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "padshell.yaml")]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL")]
    log_level: Option<String>,

    /// List available MIDI ports
    #[arg(long)]
    list_ports: bool,

    /// Print the configured mappings and exit
    #[arg(long)]
    show_mappings: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut config = AppConfig::load_or_default(&args.config).await?;
    config
        .apply_env_overrides()
        .context("Invalid environment override")?;

    let level = args
        .log_level
        .clone()
        .or_else(|| config.log_level.clone())
        .unwrap_or_else(|| "info".to_string());
    init_logging(&level)?;

    info!("Starting padshell v{}...", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);
    if !Path::new(&args.config).exists() {
        warn!("⚠️  Config file '{}' not found, using defaults", args.config);
    }

    if args.list_ports {
        discovery::print_ports();
        return Ok(());
    }

    config.validate().context("Invalid configuration")?;

    if args.show_mappings {
        print_mappings(&config);
        return Ok(());
    }

    run_app(config, shutdown_signal()).await?;

    info!("padshell shutdown complete");
    Ok(())
}

async fn run_app(config: AppConfig, shutdown: impl std::future::Future<Output = ()>) -> Result<()> {
    let device = Arc::new(LaunchpadDevice::new());
    let executor = Arc::new(ShellExecutor::from_config(&config.shell));
    info!(
        "Shell: {} (timeout {:?})",
        config.shell.shell_path,
        executor.timeout()
    );

    let options = ControllerOptions::from_config(&config);
    let mut controller = Controller::new(device.clone(), executor, options);

    let events = controller
        .connect(&config.launchpad.port_name)
        .with_context(|| format!("Failed to connect to '{}'", config.launchpad.port_name))?;
    if let Some(port) = device.port_name() {
        let size = controller.grid_size();
        info!("🎹 Using '{}' as a {}x{} grid", port, size, size);
    }

    for mapping in &config.mappings {
        let color = mapping.color.resolve()?;
        if let Err(e) = controller.add_mapping(mapping.x, mapping.y, color, &mapping.action) {
            warn!("Skipping mapping '{}': {}", mapping.action, e);
        }
    }
    info!("✅ {} mappings registered", controller.list_mappings().len());

    if config.launchpad.debug_mode {
        info!("🐛 Debug mode: every button event is logged");
    }

    controller.run(events, shutdown).await;
    Ok(())
}

fn print_mappings(config: &AppConfig) {
    println!("\n{}", "🎹 Configured Mappings".bold().cyan());

    if config.mappings.is_empty() {
        println!("  {}", "(none)".dimmed());
    }

    for mapping in &config.mappings {
        let id = mapping
            .coordinate(config.launchpad.grid_size)
            .map(|c| c.wire_id().to_string())
            .unwrap_or_else(|_| "?".to_string());
        let color = match mapping.color.resolve() {
            Ok(value) => colors::name_of(value)
                .map(str::to_string)
                .unwrap_or_else(|| value.to_string()),
            Err(e) => e.to_string().red().to_string(),
        };
        println!(
            "  ({}, {}) id {:>3}  {:<10} {}",
            mapping.x,
            mapping.y,
            id,
            color,
            mapping.action.green()
        );
    }
    println!();
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
