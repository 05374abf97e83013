//! OpenSec - runtime security gateway for autonomous AI agents

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use opensec::{
    api::build_app,
    config::OpenSecConfig,
    gateway::GatewayBuilder,
    interceptor::Interceptor,
    scanner::RiskEngine,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "opensec")]
#[command(author = "OpenSec Team")]
#[command(version)]
#[command(about = "Runtime security gateway for autonomous AI agents")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "OPENSEC_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },

    /// Screen and score a piece of text locally
    Scan {
        /// Text to inspect
        text: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.json_logs);

    let config = match &cli.config {
        Some(path) => OpenSecConfig::load(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => OpenSecConfig::default(),
    };

    match cli.command {
        Commands::Serve { host, port } => run_serve(config, host, port).await?,
        Commands::Config { default } => show_config(if default { None } else { Some(&config) })?,
        Commands::Scan { text } => run_scan(&config, &text).await?,
    }

    Ok(())
}

fn init_tracing(verbose: bool, json: bool) {
    let log_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("opensec={},tower_http=debug", log_level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn run_serve(mut config: OpenSecConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        config.gateway.host = host;
    }
    if let Some(port) = port {
        config.gateway.port = port;
    }

    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let cors_origins = config.gateway.cors_origins.clone();

    let gateway = GatewayBuilder::new().config(config).build().await?;
    let app = build_app(Arc::new(gateway), &cors_origins);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("OpenSec Gateway listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("OpenSec Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down...");
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScanReport {
    allowed: bool,
    redacted: String,
    findings: Vec<opensec::interceptor::Finding>,
    score: f64,
    blocked: bool,
    reasons: Vec<String>,
}

async fn run_scan(config: &OpenSecConfig, text: &str) -> Result<()> {
    let interceptor = Interceptor::new()?;
    let screen = interceptor.screen(text);

    let report = if screen.allowed {
        let engine = RiskEngine::from_config(&config.scanners)?;
        let outcome = engine.evaluate(&screen.redacted).await;
        ScanReport {
            allowed: !outcome.blocked,
            redacted: screen.redacted,
            findings: screen.findings,
            score: outcome.score,
            blocked: outcome.blocked,
            reasons: outcome.reasons,
        }
    } else {
        ScanReport {
            allowed: false,
            redacted: String::new(),
            findings: screen.findings,
            score: 1.0,
            blocked: true,
            reasons: screen.reason.into_iter().collect(),
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn show_config(config: Option<&OpenSecConfig>) -> Result<()> {
    let config = config.cloned().unwrap_or_default();
    let toml = toml::to_string_pretty(&config)?;
    println!("{}", toml);
    Ok(())
}
