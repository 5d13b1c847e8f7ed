use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tibber_future_prices::clock::{Clock, SystemClock};
use tibber_future_prices::config::Config;
use tibber_future_prices::integration::{
    EntityRegistry, IntegrationSettings, LoadedEntry, setup_entry,
};
use tibber_future_prices::setup::{ConfigEntry, ConfigEntryStore, ensure_entry};
use tibber_future_prices::tibber::{ProviderConnection, TibberConnection};
use tibber_future_prices::{logging, web};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().map_err(|e| {
        eprintln!("Failed to load configuration: {e}");
        e
    })?;
    config.validate()?;
    logging::init_logging(&config.logging)?;

    info!(
        "Tibber Future Prices {} starting up",
        env!("CARGO_PKG_VERSION")
    );

    let mut store = ConfigEntryStore::new(&config.storage.config_entries_path);
    store.load()?;
    let entry = ensure_entry(&mut store)?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new(config.time_zone()?));
    let connection: Arc<dyn ProviderConnection> = Arc::new(TibberConnection::new(&config.tibber)?);
    let registry = Arc::new(EntityRegistry::new());

    let web_task = config.web.enabled.then(|| {
        let registry = Arc::clone(&registry);
        let host = config.web.host.clone();
        let port = config.web.port;
        tokio::spawn(async move {
            if let Err(e) = web::serve(registry, &host, port).await {
                error!("Web server error: {}", e);
            }
        })
    });

    let loaded = setup_until_ready(&entry, connection, clock, &config, Arc::clone(&registry)).await;

    if let Some(loaded) = loaded {
        info!(
            "Entry {} loaded with {} sensor(s)",
            loaded.entry_id(),
            loaded.homes().len()
        );
        tokio::signal::ctrl_c().await?;
        info!("Shutting down");
        loaded.unload();
    }

    if let Some(task) = web_task {
        task.abort();
    }
    Ok(())
}

/// Retry entry setup until it succeeds; `None` if interrupted first
async fn setup_until_ready(
    entry: &ConfigEntry,
    connection: Arc<dyn ProviderConnection>,
    clock: Arc<dyn Clock>,
    config: &Config,
    registry: Arc<EntityRegistry>,
) -> Option<LoadedEntry> {
    let settings = IntegrationSettings::from(config);
    let retry = Duration::from_secs(config.refresh.setup_retry_seconds.max(1));

    loop {
        let attempt = setup_entry(
            entry,
            Arc::clone(&connection),
            Arc::clone(&clock),
            &settings,
            Arc::clone(&registry),
        );
        tokio::select! {
            result = attempt => match result {
                Ok(loaded) => return Some(loaded),
                Err(e) => warn!("Setup of entry {} failed: {}; retrying in {}s", entry.entry_id, e, retry.as_secs()),
            },
            _ = tokio::signal::ctrl_c() => return None,
        }
        tokio::select! {
            () = tokio::time::sleep(retry) => {}
            _ = tokio::signal::ctrl_c() => return None,
        }
    }
}
