mod common;

use common::{FakeConnection, oslo_clock};
use std::sync::Arc;
use std::time::Duration;
use tibber_future_prices::clock::Clock;
use tibber_future_prices::coordinator::RefreshSource;
use tibber_future_prices::error::PriceError;
use tibber_future_prices::integration::{EntityRegistry, IntegrationSettings, setup_entry};
use tibber_future_prices::setup::{ConfigEntryStore, ensure_entry};
use tibber_future_prices::tibber::HomeInfo;

fn settings() -> IntegrationSettings {
    IntegrationSettings {
        refresh_interval: Duration::from_secs(900),
        only_active_homes: true,
    }
}

fn two_homes() -> Arc<FakeConnection> {
    let conn = Arc::new(FakeConnection::with_homes(vec![
        HomeInfo::new("home-aaaa1111").with_nickname("Main House"),
        HomeInfo::new("home-bbbb2222"),
    ]));
    conn.set_prices(
        "home-aaaa1111",
        "NOK",
        &[("2026-10-19T13:00:00.000+02:00", 1.234)],
    );
    conn.set_prices(
        "home-bbbb2222",
        "SEK",
        &[
            ("2026-10-19T13:00:00.000+02:00", 5.678),
            ("2026-10-20T13:00:00.000+02:00", 6.0),
        ],
    );
    conn
}

fn entry() -> (tempfile::TempDir, tibber_future_prices::setup::ConfigEntry) {
    let dir = tempfile::tempdir().unwrap();
    let mut store = ConfigEntryStore::new(dir.path().join("entries.json"));
    let entry = ensure_entry(&mut store).unwrap();
    (dir, entry)
}

#[tokio::test]
async fn each_home_gets_its_own_job_and_sensor() {
    let (_dir, entry) = entry();
    let conn = two_homes();
    let clock: Arc<dyn Clock> = Arc::new(oslo_clock());
    let registry = Arc::new(EntityRegistry::new());

    let loaded = setup_entry(&entry, conn.clone(), clock, &settings(), Arc::clone(&registry))
        .await
        .unwrap();

    assert_eq!(loaded.homes().len(), 2);
    assert_eq!(registry.len(), 2);

    let main = registry.get("tibber_future_prices_main_house").unwrap();
    assert_eq!(main.name(), "Future Prices Main House");
    assert_eq!(main.native_value(), Some(1.23));
    assert_eq!(main.unit_of_measurement().as_deref(), Some("NOK"));
    assert!(main.attributes().tomorrow.is_empty());

    let other = registry.get("tibber_future_prices_home_2222").unwrap();
    assert_eq!(other.native_value(), Some(5.68));
    assert_eq!(other.unit_of_measurement().as_deref(), Some("SEK"));
    assert_eq!(other.attributes().tomorrow.len(), 1);

    // A failing home does not touch the other one
    conn.set_empty("home-bbbb2222");
    let failing = &loaded.homes()[1];
    assert!(failing.job.refresh().await.is_err());
    assert!(loaded.homes()[0].job.refresh().await.is_ok());
    assert_eq!(other.native_value(), Some(5.68));

    loaded.unload();
}

#[tokio::test]
async fn inactive_homes_are_skipped() {
    let (_dir, entry) = entry();
    let mut paused = HomeInfo::new("home-cccc3333");
    paused.subscription_status = Some("ended".to_string());
    let conn = Arc::new(FakeConnection::with_homes(vec![paused]));
    let registry = Arc::new(EntityRegistry::new());

    let loaded = setup_entry(
        &entry,
        conn.clone(),
        Arc::new(oslo_clock()),
        &settings(),
        Arc::clone(&registry),
    )
    .await
    .unwrap();

    assert!(loaded.homes().is_empty());
    assert!(registry.is_empty());
    assert_eq!(conn.calls(), 0);
}

#[tokio::test]
async fn failing_first_refresh_leaves_nothing_registered() {
    let (_dir, entry) = entry();
    let conn = two_homes();
    conn.set_error("home-bbbb2222", "timeout");
    let registry = Arc::new(EntityRegistry::new());

    let result = setup_entry(
        &entry,
        conn.clone(),
        Arc::new(oslo_clock()),
        &settings(),
        Arc::clone(&registry),
    )
    .await;

    assert!(matches!(result, Err(PriceError::NotReady { .. })));
    assert!(registry.is_empty());

    // Retrying once the provider recovers succeeds
    conn.set_prices("home-bbbb2222", "SEK", &[("2026-10-19T13:00:00.000+02:00", 1.0)]);
    let loaded = setup_entry(
        &entry,
        conn.clone(),
        Arc::new(oslo_clock()),
        &settings(),
        Arc::clone(&registry),
    )
    .await
    .unwrap();
    assert_eq!(registry.len(), 2);
    loaded.unload();
}

#[tokio::test]
async fn unload_removes_entities() {
    let (_dir, entry) = entry();
    let registry = Arc::new(EntityRegistry::new());
    let loaded = setup_entry(
        &entry,
        two_homes(),
        Arc::new(oslo_clock()),
        &settings(),
        Arc::clone(&registry),
    )
    .await
    .unwrap();
    assert_eq!(loaded.entry_id(), entry.entry_id);
    assert_eq!(registry.len(), 2);

    loaded.unload();
    assert!(registry.is_empty());
}
