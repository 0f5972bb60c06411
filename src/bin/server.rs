use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use fleetwatch::{
    actors::{HubHandle, Poller, PollerHandle, PollerSettings},
    api::{ApiConfig, ApiState, spawn_api_server},
    collector::TransportCollector,
    config::{Config, HostKeyPolicy, read_config_file},
    notify::build_notifier,
    storage::InMemoryStore,
};
use tracing::{info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// JSON config file; the environment is used when omitted
    #[arg(short)]
    file: Option<String>,
}

fn init() {
    dotenv::dotenv().ok();

    let filter = filter::Targets::new().with_targets(vec![
        ("fleetwatch", LevelFilter::DEBUG),
        ("fleetwatch_server", LevelFilter::TRACE),
        ("tower_http", LevelFilter::INFO),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = match &args.file {
        Some(file) => read_config_file(file)?,
        None => Config::from_env(),
    };

    let endpoints = config.endpoints();
    if endpoints.is_empty() {
        warn!("no agents configured, nothing will be polled");
    }
    for endpoint in &endpoints {
        info!("monitoring {endpoint}");
    }
    if config.ssh.host_key_policy == HostKeyPolicy::AcceptAny {
        warn!("SSH host keys are accepted without verification");
    }

    let hub = HubHandle::spawn(config.hub_subscriber_buffer);
    let notifier = build_notifier(&config.notify);
    let collector = TransportCollector::new(
        config.collect_timeout(),
        config.top_processes,
        config.ssh.host_key_policy.clone(),
    );

    let store = Arc::new(InMemoryStore::new());
    let poller = Poller::new(
        endpoints,
        PollerSettings::from(&config),
        Arc::new(collector),
        Arc::new(notifier),
        hub.clone(),
    )
    .with_store(store.clone());

    let api_config = ApiConfig::try_from(&config.api)?;
    spawn_api_server(api_config, ApiState::new(poller.clone())).await?;

    let handle = PollerHandle::spawn(poller);

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutting down");

    handle.shutdown().await?;
    hub.shutdown().await?;
    store.close().await;

    Ok(())
}
