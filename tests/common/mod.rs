#![allow(dead_code)]

use async_trait::async_trait;
use chrono_tz::Europe::Oslo;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tibber_future_prices::clock::ManualClock;
use tibber_future_prices::error::{PriceError, Result};
use tibber_future_prices::tibber::{HomeInfo, HomePrices, ProviderConnection};

/// In-memory provider connection with scripted per-home responses
#[derive(Default)]
pub struct FakeConnection {
    homes: Vec<HomeInfo>,
    responses: Mutex<HashMap<String, std::result::Result<HomePrices, String>>>,
    calls: AtomicUsize,
}

impl FakeConnection {
    pub fn with_homes(homes: Vec<HomeInfo>) -> Self {
        Self {
            homes,
            ..Self::default()
        }
    }

    pub fn set_prices(&self, home_id: &str, currency: &str, entries: &[(&str, f64)]) {
        let prices = HomePrices {
            currency: currency.to_string(),
            price_total: entries
                .iter()
                .map(|(k, v)| ((*k).to_string(), *v))
                .collect(),
        };
        self.responses
            .lock()
            .unwrap()
            .insert(home_id.to_string(), Ok(prices));
    }

    pub fn set_empty(&self, home_id: &str) {
        self.set_prices(home_id, "NOK", &[]);
    }

    pub fn set_error(&self, home_id: &str, message: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(home_id.to_string(), Err(message.to_string()));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderConnection for FakeConnection {
    async fn homes(&self, only_active: bool) -> Result<Vec<HomeInfo>> {
        Ok(self
            .homes
            .iter()
            .filter(|h| !only_active || h.is_active())
            .cloned()
            .collect())
    }

    async fn update_info_and_price_info(&self, home_id: &str) -> Result<HomePrices> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.responses.lock().unwrap().get(home_id) {
            Some(Ok(prices)) => Ok(prices.clone()),
            Some(Err(message)) => Err(PriceError::network(message.clone())),
            None => Ok(HomePrices::default()),
        }
    }
}

/// 2026-10-19 13:15 in Oslo (CEST, +02:00)
pub fn oslo_clock() -> ManualClock {
    ManualClock::at_local(Oslo, 2026, 10, 19, 13, 15).unwrap()
}
