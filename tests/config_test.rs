use tibber_future_prices::Config;
use tibber_future_prices::error::PriceError;

#[test]
fn config_round_trips_through_yaml_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");

    let mut config = Config::default();
    config.tibber.access_token = "token-123".to_string();
    config.refresh.interval_seconds = 600;
    config.timezone = "Europe/Stockholm".to_string();
    config.save_to_file(&path).unwrap();

    let loaded = Config::from_file(&path).unwrap();
    assert_eq!(loaded.tibber.access_token, "token-123");
    assert_eq!(loaded.refresh.interval_seconds, 600);
    assert_eq!(loaded.time_zone().unwrap(), chrono_tz::Europe::Stockholm);
    loaded.validate().unwrap();
}

#[test]
fn partial_file_keeps_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "tibber:\n  access_token: abc\nweb:\n  port: 9000\n").unwrap();

    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.web.port, 9000);
    assert_eq!(config.web.host, "127.0.0.1");
    assert_eq!(config.refresh.interval_seconds, 900);
    assert!(config.tibber.only_active_homes);
    assert_eq!(config.timezone, "Europe/Oslo");
}

#[test]
fn invalid_values_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "timezone: Mars/Olympus\n").unwrap();
    let config = Config::from_file(&path).unwrap();
    assert!(matches!(config.validate(), Err(PriceError::Validation { .. })));

    std::fs::write(&path, "refresh: [not, a, map]\n").unwrap();
    assert!(Config::from_file(&path).is_err());
}
