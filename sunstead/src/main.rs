use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sunstead::api::{create_router, AppState};
use sunstead::cache::BundleCache;
use sunstead::config::Config;
use sunstead::db::{Database, DatabaseBackend, LibSqlBackend};
use sunstead::embeddings::EmbeddingProvider;
use sunstead::llm::LlmProvider;
use sunstead::services::{HealthMonitor, RetentionManager};
use sunstead::sync::DriveClient;
use sunstead::telemetry::{BatteryMonitorClient, InverterClient, Poller, TelemetryFetcher};

#[derive(Parser)]
#[command(name = "sunstead")]
#[command(about = "Query routing and context assembly for an off-grid solar ranch")]
struct Args {
    /// Runtime mode: all, api, or poller
    #[arg(long)]
    mode: Option<String>,

    /// Run the API without the background pollers (local development)
    #[arg(long)]
    skip_pollers: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuntimeMode {
    All,
    Api,
    Poller,
}

impl RuntimeMode {
    fn parse(raw: Option<&str>) -> Self {
        let value = raw
            .map(std::string::ToString::to_string)
            .or_else(|| std::env::var("SUNSTEAD_RUNTIME_MODE").ok())
            .map(|v| v.trim().to_lowercase());

        match value.as_deref() {
            Some("api") => Self::Api,
            Some("poller") => Self::Poller,
            Some("all") | None => Self::All,
            Some(other) => {
                tracing::warn!(
                    value = %other,
                    "Invalid SUNSTEAD_RUNTIME_MODE/--mode; falling back to 'all'"
                );
                Self::All
            }
        }
    }

    fn runs_api(self) -> bool {
        matches!(self, Self::All | Self::Api)
    }

    fn runs_pollers(self) -> bool {
        matches!(self, Self::All | Self::Poller)
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Api => "api",
            Self::Poller => "poller",
        }
    }
}

fn spawn_poller(poller: Poller, cancel_token: &CancellationToken) {
    let token = cancel_token.child_token();
    tokio::spawn(async move {
        loop {
            let delay = poller.next_delay_secs();
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::info!(source = poller.source().as_str(), "Poller shutting down...");
                    break;
                }
                _ = tokio::time::sleep(tokio::time::Duration::from_secs(delay)) => {
                    if let Err(e) = poller.run_once().await {
                        tracing::warn!(source = poller.source().as_str(), error = %e, "Poll cycle failed");
                    }
                }
            }
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sunstead=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let runtime_mode = RuntimeMode::parse(args.mode.as_deref());
    tracing::info!(mode = runtime_mode.as_str(), "Runtime mode selected");

    let config = Config::from_env();

    tracing::info!("Initializing database...");
    let raw_db = Database::new(&config.database, config.embeddings.dimensions).await?;
    let db: Arc<dyn DatabaseBackend> = Arc::new(LibSqlBackend::new(raw_db));

    tracing::info!("Loading embedding model: {}...", config.embeddings.model);
    let embeddings = EmbeddingProvider::new(&config.embeddings)?;

    if let Some(llm_config) = &config.llm {
        tracing::info!("Initializing LLM provider: {}...", llm_config.model);
    }
    let llm = LlmProvider::new(config.llm.as_ref());
    if !llm.is_available() {
        tracing::warn!("LLM unavailable - reasoner agents will degrade to canned answers");
    }

    let cache = BundleCache::new(&config.cache);
    let drive = DriveClient::new(config.drive.clone())?;

    let battery_monitor = match &config.telemetry.battery_url {
        Some(url) => Some(Arc::new(BatteryMonitorClient::new(
            url.clone(),
            config.telemetry.battery_api_key.clone(),
            config.telemetry.battery_hourly_quota,
            30,
        )?)),
        None => {
            tracing::warn!("No battery monitor URL configured; shunt telemetry disabled");
            None
        }
    };

    let inverter = match &config.telemetry.inverter_url {
        Some(url) => Some(InverterClient::new(url.clone(), 30)?),
        None => {
            tracing::warn!("No inverter URL configured; inverter telemetry disabled");
            None
        }
    };

    let state = AppState::new(
        config.clone(),
        db.clone(),
        embeddings.clone(),
        llm,
        cache.clone(),
        drive,
        battery_monitor.clone(),
    );

    let cancel_token = CancellationToken::new();

    if runtime_mode.runs_pollers() && !args.skip_pollers {
        if let Some(inverter) = inverter {
            tracing::info!(
                interval_secs = config.telemetry.poll_interval_secs,
                "Starting inverter poller"
            );
            spawn_poller(
                Poller::new(
                    Arc::new(inverter),
                    db.clone(),
                    config.telemetry.poll_interval_secs,
                    config.telemetry.max_consecutive_failures,
                ),
                &cancel_token,
            );
        }

        if let Some(battery) = battery_monitor.clone() {
            tracing::info!(
                interval_secs = config.telemetry.poll_interval_secs,
                "Starting battery monitor poller"
            );
            let fetcher: Arc<dyn TelemetryFetcher> = Arc::new((*battery).clone());
            spawn_poller(
                Poller::new(
                    fetcher,
                    db.clone(),
                    config.telemetry.poll_interval_secs,
                    config.telemetry.max_consecutive_failures,
                ),
                &cancel_token,
            );
        }

        tracing::info!("Starting retention manager...");
        let retention = RetentionManager::new(db.clone(), config.telemetry.retention_hours);
        let token = cancel_token.child_token();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        tracing::info!("Retention manager shutting down...");
                        break;
                    }
                    _ = tokio::time::sleep(tokio::time::Duration::from_secs(retention.interval_secs())) => {
                        if let Err(e) = retention.run_once().await {
                            tracing::error!("Retention error: {}", e);
                        }
                    }
                }
            }
        });
    } else {
        tracing::info!("Pollers disabled in this mode");
    }

    tracing::info!(
        interval_secs = config.telemetry.health_interval_secs,
        "Starting health monitor"
    );
    let mut monitor = HealthMonitor::new(
        db.clone(),
        cache.clone(),
        config.telemetry.health_interval_secs,
    );
    {
        let embeddings = embeddings.clone();
        monitor = monitor.watch_quota("embeddings", move || embeddings.quota_usage());
    }
    if let Some(battery) = battery_monitor {
        monitor = monitor.watch_quota("battery_monitor", move || battery.quota_usage());
    }
    let token = cancel_token.child_token();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::info!("Health monitor shutting down...");
                    break;
                }
                _ = tokio::time::sleep(tokio::time::Duration::from_secs(monitor.interval_secs())) => {
                    if let Err(e) = monitor.run_once().await {
                        tracing::error!("Health monitor error: {}", e);
                    }
                }
            }
        }
    });

    // Cache recovery probe: only runs while the cache is disabled.
    {
        let cache = cache.clone();
        let probe_interval = config.cache.probe_interval_secs.max(1);
        let token = cancel_token.child_token();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(tokio::time::Duration::from_secs(probe_interval)) => {
                        if !cache.is_enabled() {
                            cache.probe().await;
                        }
                    }
                }
            }
        });
    }

    if runtime_mode.runs_api() {
        let app = create_router(state);

        let addr = format!("{}:{}", config.server.host, config.server.port);
        tracing::info!("Sunstead starting on http://{}", addr);
        tracing::info!("  Health check: http://{}/health", addr);
        tracing::info!("  API docs:     http://{}/docs", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal(cancel_token))
            .await?;

        return Ok(());
    }

    tracing::info!("Poller mode active; HTTP server disabled");
    shutdown_signal(cancel_token).await;
    Ok(())
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn shutdown_signal(cancel_token: CancellationToken) {
    wait_for_shutdown_signal().await;
    tracing::info!("Shutdown signal received, cancelling background tasks...");
    cancel_token.cancel();
}
