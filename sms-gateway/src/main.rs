//! sms-gateway binary entry point.
//!
//! Usage:
//! ```bash
//! sms-gateway --config sms-gateway.toml
//! sms-gateway --help
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::info;

use smsgw_gateway::config::Config;
use smsgw_gateway::engine::spawn_sync_task;
use smsgw_gateway::error::ServiceError;
use smsgw_gateway::http::{build_router, init_start_time};
use smsgw_gateway::publisher::{
    spawn_command_task, CommandHandler, DiscoveryOptions, MqttLink, Notifier, Topics,
};
use smsgw_gateway::server::SmsGateway;
use smsgw_gateway::storage::{SqliteStore, StateStore};
use sms_client::KeeneticClient;

/// Upper bound for background tasks to stop after shutdown is signalled.
const TASK_STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// SMS gateway for Keenetic routers.
#[derive(Parser, Debug)]
#[command(name = "sms-gateway", version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "sms-gateway.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber from RUST_LOG or default to info.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // Load configuration, or use defaults if the file does not exist.
    let config = if cli.config.exists() {
        Config::from_file(&cli.config)
            .with_context(|| format!("loading {}", cli.config.display()))?
    } else {
        info!(path = %cli.config.display(), "config file not found, using defaults");
        Config::default()
    };
    info!(?config, "configuration loaded");

    init_start_time();

    let store = Arc::new(open_store(&config).await?);
    let router = KeeneticClient::new(config.keenetic.client_config()).map_err(ServiceError::from)?;

    let topics = Topics::new(&config.mqtt.topic_prefix, &config.mqtt.discovery_prefix);
    let (notifier, mqtt) = if config.mqtt.enabled {
        let (link, driver, inbound) = MqttLink::new(&config.mqtt, &topics);
        let options = DiscoveryOptions {
            cost_enabled: !config.billing.cost().is_zero(),
            currency: config.billing.currency.clone(),
        };
        (
            Arc::new(Notifier::new(link, topics, options)),
            Some((driver, inbound)),
        )
    } else {
        info!("MQTT disabled");
        (Arc::new(Notifier::disabled(topics)), None)
    };

    let bind_address = config.http.bind_address.clone();
    let grace = config.mqtt.shutdown_grace();
    let sync = config.sync.clone();
    let gateway = Arc::new(SmsGateway::new(
        config,
        store.clone(),
        Arc::new(router),
        notifier.clone(),
    ));

    // Sync loop and command handling stop first; the broker link outlives
    // them so the final publish can go out.
    let (tasks_tx, tasks_rx) = watch::channel(false);
    let (mqtt_tx, mqtt_rx) = watch::channel(false);

    let sync_task = if sync.enabled {
        Some(spawn_sync_task(gateway.engine(), sync.interval_secs, tasks_rx.clone()))
    } else {
        info!("sync loop disabled");
        None
    };

    let (driver_task, command_task) = match mqtt {
        Some((driver, inbound)) => {
            let handler = Arc::new(CommandHandler::new(gateway.sender(), notifier.clone()));
            (
                Some(tokio::spawn(driver.run(notifier.clone(), mqtt_rx))),
                Some(spawn_command_task(handler, inbound, tasks_rx)),
            )
        }
        None => (None, None),
    };

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("binding {bind_address}"))?;
    info!("sms-gateway v{} listening on {}", env!("CARGO_PKG_VERSION"), bind_address);

    axum::serve(listener, build_router(gateway.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutting down");
    let _ = tasks_tx.send(true);
    for task in [sync_task, command_task].into_iter().flatten() {
        if tokio::time::timeout(TASK_STOP_TIMEOUT, task).await.is_err() {
            tracing::warn!("background task did not stop in time");
        }
    }

    let report = gateway.session().connectivity();
    if let Err(e) = notifier.shutdown(&report, grace).await {
        tracing::warn!(error = %e, "final MQTT publish failed");
    }
    let _ = mqtt_tx.send(true);
    if let Some(task) = driver_task {
        if tokio::time::timeout(TASK_STOP_TIMEOUT, task).await.is_err() {
            tracing::warn!("MQTT driver did not stop in time");
        }
    }

    store.flush().await.context("flushing state store")?;
    info!("sms-gateway shut down");
    Ok(())
}

/// Open the store and fold in a legacy counter file if one is configured.
async fn open_store(config: &Config) -> Result<SqliteStore, ServiceError> {
    let store = SqliteStore::open(&config.storage.database).await?;
    info!(path = %config.storage.database.display(), "state store opened");

    if let Some(legacy) = config.storage.legacy_counter_file.as_deref() {
        import_legacy(&store, legacy).await?;
    }
    Ok(store)
}

async fn import_legacy(store: &SqliteStore, path: &Path) -> Result<(), ServiceError> {
    if let Some(count) = store.import_legacy_counter(path).await? {
        info!("Imported legacy SMS counter ({} sent) from {}", count, path.display());
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("received SIGINT"); }
        () = terminate => { info!("received SIGTERM"); }
    }
}
