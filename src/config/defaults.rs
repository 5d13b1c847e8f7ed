use super::*;

impl Default for TibberConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            api_url: "https://api.tibber.com/v1-beta/gql".to_string(),
            request_timeout_seconds: 10,
            only_active_homes: true,
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 900,
            setup_retry_seconds: 60,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            config_entries_path: "/data/tibber_future_prices_entries.json".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            console_level: None,
            file_level: None,
            file: "/tmp/tibber_future_prices.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 8089,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tibber: TibberConfig::default(),
            refresh: RefreshConfig::default(),
            timezone: "Europe/Oslo".to_string(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
            web: WebConfig::default(),
        }
    }
}
