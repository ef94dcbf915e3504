//! webhookd: self-hosted webhook stub service.
//!
//! Main entry point. Parses the command line, loads configuration,
//! initializes tracing and serves the HTTP API until shutdown.

mod telemetry;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use opentelemetry_sdk::trace::Tracer;
use telemetry::{OtelSettings, Telemetry};
use tracing::info;
use webhookd_api::{start_server, AppState, Config};

#[derive(Debug, Parser)]
#[command(name = "webhookd")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    global: GlobalArgs,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Start the HTTP server (the default)
    Serve,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// Host to bind to
    #[arg(long, global = true)]
    host: Option<String>,

    /// Port to listen on
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Path to a TOML or JSON config file
    #[arg(short, long, global = true, env = "WEBHOOKD_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = Config::load_from(cli.global.config.as_deref())?
        .with_overrides(cli.global.host.clone(), cli.global.port);
    config.validate().context("Invalid configuration")?;

    let otel = OtelSettings::from_env().context("Invalid OpenTelemetry configuration")?;
    let telemetry = Telemetry::init(otel.as_ref())?;
    init_tracing(&config, cli.global.verbose, telemetry.tracer())?;
    if let Some(otel) = &otel {
        info!(
            endpoint = %otel.endpoint,
            sample_ratio = otel.sample_ratio,
            "OTLP trace export enabled"
        );
    }

    let result = match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
    };

    telemetry.shutdown().await;
    result
}

async fn serve(config: Config) -> Result<()> {
    let addr = config.parse_server_addr()?;
    info!(
        addr = %addr,
        auth_configured = config.to_auth_config().is_complete(),
        protect_management = config.protect_management,
        protect_invocation = config.protect_invocation,
        "Starting webhookd"
    );

    let state = AppState::from_config(&config).context("Failed to build key cache")?;

    start_server(state, addr).await.with_context(|| format!("Failed to serve on {addr}"))?;

    info!("webhookd shutdown complete");
    Ok(())
}

/// Initializes tracing from `RUST_LOG`, falling back to the configured
/// filter. Spans are also exported when a tracer is given.
fn init_tracing(config: &Config, verbose: bool, tracer: Option<Tracer>) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let fallback = if verbose { "debug" } else { config.rust_log.as_str() };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .context("Invalid log filter")?;

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true);

    let otel_layer = tracer.map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(otel_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;
    Ok(())
}
