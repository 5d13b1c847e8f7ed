//! Configuration entry lifecycle
//!
//! [`setup_entry`] turns a configuration entry into running refresh jobs and
//! registered sensors, one pair per active Tibber home. [`LoadedEntry::unload`]
//! and [`remove_entry`] tear them down again.

use crate::clock::Clock;
use crate::config::Config;
use crate::coordinator::{
    DEFAULT_REFRESH_INTERVAL, PriceRefreshJob, PriceSubscriber, RefreshSource, bind_subscriber,
    spawn_refresh_loop,
};
use crate::error::{PriceError, Result};
use crate::logging::{LogContext, get_logger_with_context};
use crate::sensor::{FuturePriceSensor, SensorSnapshot};
use crate::setup::{ConfigEntry, ConfigEntryStore};
use crate::tibber::ProviderConnection;
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Settings the lifecycle takes from the service configuration
#[derive(Debug, Clone)]
pub struct IntegrationSettings {
    pub refresh_interval: Duration,
    pub only_active_homes: bool,
}

impl Default for IntegrationSettings {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            only_active_homes: true,
        }
    }
}

impl From<&Config> for IntegrationSettings {
    fn from(config: &Config) -> Self {
        Self {
            refresh_interval: Duration::from_secs(config.refresh.interval_seconds),
            only_active_homes: config.tibber.only_active_homes,
        }
    }
}

/// Live sensors by unique id
#[derive(Default)]
pub struct EntityRegistry {
    sensors: RwLock<BTreeMap<String, Arc<FuturePriceSensor>>>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sensor; unique ids must not collide
    pub fn register(&self, sensor: Arc<FuturePriceSensor>) -> Result<()> {
        let mut sensors = self.sensors.write().unwrap_or_else(PoisonError::into_inner);
        let unique_id = sensor.unique_id().to_string();
        if sensors.contains_key(&unique_id) {
            return Err(PriceError::validation(
                "unique_id",
                format!("entity {unique_id} is already registered"),
            ));
        }
        sensors.insert(unique_id, sensor);
        Ok(())
    }

    pub fn remove(&self, unique_id: &str) -> Option<Arc<FuturePriceSensor>> {
        self.sensors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(unique_id)
    }

    pub fn get(&self, unique_id: &str) -> Option<Arc<FuturePriceSensor>> {
        self.sensors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(unique_id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.sensors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshots(&self) -> Vec<SensorSnapshot> {
        self.sensors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|sensor| sensor.snapshot())
            .collect()
    }
}

/// Job, sensor and background tasks of one home
pub struct HomeHandle {
    pub job: Arc<PriceRefreshJob>,
    pub sensor: Arc<FuturePriceSensor>,
    tasks: Vec<JoinHandle<()>>,
}

impl Drop for HomeHandle {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// A configuration entry that has been set up
pub struct LoadedEntry {
    entry_id: String,
    homes: Vec<HomeHandle>,
    registry: Arc<EntityRegistry>,
}

impl LoadedEntry {
    pub fn entry_id(&self) -> &str {
        &self.entry_id
    }

    pub fn homes(&self) -> &[HomeHandle] {
        &self.homes
    }

    /// Stop refreshing and drop the entry's sensors from the registry
    pub fn unload(self) {
        for home in &self.homes {
            self.registry.remove(home.sensor.unique_id());
        }
        // Dropping the handles aborts their tasks
    }
}

/// Create one refresh job and one sensor per home of the account
///
/// Every job gets an initial refresh before anything is registered; if any of
/// them fails the whole setup fails with [`PriceError::NotReady`] and can be
/// retried later.
pub async fn setup_entry(
    entry: &ConfigEntry,
    connection: Arc<dyn ProviderConnection>,
    clock: Arc<dyn Clock>,
    settings: &IntegrationSettings,
    registry: Arc<EntityRegistry>,
) -> Result<LoadedEntry> {
    let logger =
        get_logger_with_context(LogContext::new("integration").with_entry_id(&entry.entry_id));

    let homes = connection
        .homes(settings.only_active_homes)
        .await
        .map_err(|e| PriceError::not_ready(format!("could not list Tibber homes: {e}")))?;

    if homes.is_empty() {
        logger.error("No active Tibber homes found.");
        return Ok(LoadedEntry {
            entry_id: entry.entry_id.clone(),
            homes: Vec::new(),
            registry,
        });
    }

    let mut jobs = Vec::with_capacity(homes.len());
    for home in homes {
        let job = Arc::new(PriceRefreshJob::new(
            home,
            Arc::clone(&connection),
            Arc::clone(&clock),
            settings.refresh_interval,
        ));
        job.first_refresh().await?;
        jobs.push(job);
    }

    let mut handles = Vec::with_capacity(jobs.len());
    for job in jobs {
        let sensor = Arc::new(FuturePriceSensor::new(job.home(), Arc::clone(&clock)));
        if let Some(latest) = job.latest() {
            sensor.on_new_result(&latest);
        }

        if let Err(e) = registry.register(Arc::clone(&sensor)) {
            logger.error(&format!("Skipping home {}: {e}", job.home().home_id));
            continue;
        }

        let subscriber: Arc<dyn PriceSubscriber> = sensor.clone();
        let tasks = vec![
            bind_subscriber(&job, subscriber),
            spawn_refresh_loop(Arc::clone(&job)),
        ];
        logger.info(&format!("Added {} for home {}", sensor.entity_id(), job.home().home_id));
        handles.push(HomeHandle { job, sensor, tasks });
    }

    Ok(LoadedEntry {
        entry_id: entry.entry_id.clone(),
        homes: handles,
        registry,
    })
}

/// Unload a running entry and delete it from the store
pub fn remove_entry(store: &mut ConfigEntryStore, loaded: LoadedEntry) -> Result<()> {
    let entry_id = loaded.entry_id().to_string();
    loaded.unload();
    store.remove(&entry_id)?;
    Ok(())
}
