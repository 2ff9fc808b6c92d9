use anyhow::Result;
use costwatch_analysis::CostAnalyzer;
use costwatch_metrics::{DatadogSource, MetricsSource};
use costwatch_notify::{EmailNotifier, LogNotifier, Notifier};
use costwatch_storage::CostRepository;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use costwatch_server::app;
use costwatch_server::config::ServerConfig;
use costwatch_server::state::AppState;

const DEFAULT_CONFIG_PATH: &str = "config/costwatch.toml";

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  costwatch-server [config.toml]    Start the server (default {DEFAULT_CONFIG_PATH})");
}

#[tokio::main]
async fn main() -> Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|e| anyhow::anyhow!("Failed to install default CryptoProvider: {e:?}"))?;

    costwatch_common::id::init(1, 1);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("costwatch=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(|s| s.as_str()) {
        Some("--help" | "-h") => {
            print_usage();
            Ok(())
        }
        other => run_server(other.unwrap_or(DEFAULT_CONFIG_PATH)).await,
    }
}

fn load_config(path: &str) -> Result<ServerConfig> {
    if Path::new(path).exists() {
        return ServerConfig::load(path);
    }
    tracing::warn!(path = %path, "Config file not found, using defaults");
    let mut config = ServerConfig::default();
    config.apply_overrides(|name| std::env::var(name).ok());
    Ok(config)
}

async fn run_server(config_path: &str) -> Result<()> {
    let config = load_config(config_path)?;
    tracing::info!(path = %config_path, "Configuration loaded");

    // Storage first; a broken remote store falls back to local files.
    let store = costwatch_storage::connect(&config.storage_settings()).await?;
    let repo = CostRepository::new(store, config.default_notification_config());

    let metrics: Arc<dyn MetricsSource> = Arc::new(DatadogSource::new(config.datadog_settings())?);
    if !metrics.is_configured() {
        tracing::warn!("Datadog keys not set, cost figures will be synthetic");
    }
    let generator = costwatch_ai::build_generator(config.ai.enabled, config.ai_settings())?;

    let analyzer = Arc::new(CostAnalyzer::new(metrics));
    let notifier: Arc<dyn Notifier> = match config.smtp_settings() {
        Some(smtp) => Arc::new(EmailNotifier::new(&smtp)?),
        None => {
            tracing::warn!("SMTP host not set, reports will only be logged");
            Arc::new(LogNotifier)
        }
    };

    let addr: SocketAddr = format!("{}:{}", config.http_host, config.http_port).parse()?;
    let state = AppState::build(config, repo, analyzer, generator, notifier).await?;

    let notification_config = state.repo.get_config().await;
    state.scheduler.start(&notification_config).await?;

    let http_app = app::build_http_app(state.clone());
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "HTTP server listening");

    axum::serve(listener, http_app)
        .with_graceful_shutdown(async {
            signal::ctrl_c().await.ok();
            tracing::info!("Shutdown signal received");
        })
        .await?;

    if let Err(e) = state.scheduler.stop().await {
        tracing::error!(error = %e, "Scheduler did not stop cleanly");
    }
    tracing::info!("Server stopped");
    Ok(())
}
