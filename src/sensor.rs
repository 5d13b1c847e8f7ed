//! Future price sensor entity
//!
//! A [`FuturePriceSensor`] mirrors the last result of its home's refresh job:
//! the state is the price of the current local hour, the attributes carry the
//! full `today`/`tomorrow` lists and the unit is the home's currency. It never
//! fetches anything on its own.

use crate::clock::Clock;
use crate::coordinator::{PriceSubscriber, RefreshResult, ShapedPrice, parse_timestamp};
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use crate::tibber::HomeInfo;
use chrono::{DateTime, Timelike};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};

pub const SENSOR_ICON: &str = "mdi:chart-line";
const UNIQUE_ID_PREFIX: &str = "tibber_future_prices_";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorAttributes {
    pub today: Vec<ShapedPrice>,
    pub tomorrow: Vec<ShapedPrice>,
}

/// Externally visible state of a sensor at one moment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSnapshot {
    pub entity_id: String,
    pub unique_id: String,
    pub name: String,
    pub home_id: String,
    pub icon: String,
    pub state: Option<f64>,
    pub unit_of_measurement: Option<String>,
    pub attributes: SensorAttributes,
}

#[derive(Debug, Default)]
struct SensorState {
    attributes: SensorAttributes,
    unit_of_measurement: Option<String>,
}

pub struct FuturePriceSensor {
    unique_id: String,
    name: String,
    home_id: String,
    clock: Arc<dyn Clock>,
    state: RwLock<SensorState>,
    logger: StructuredLogger,
}

/// `tibber_future_prices_` followed by the lowercased home name, spaces as underscores
pub fn unique_id_for(home_name: &str) -> String {
    format!(
        "{UNIQUE_ID_PREFIX}{}",
        home_name.to_lowercase().replace(' ', "_")
    )
}

impl FuturePriceSensor {
    pub fn new(home: &HomeInfo, clock: Arc<dyn Clock>) -> Self {
        let home_name = home.display_name();
        Self {
            unique_id: unique_id_for(&home_name),
            name: format!("Future Prices {home_name}"),
            home_id: home.home_id.clone(),
            clock,
            state: RwLock::new(SensorState::default()),
            logger: get_logger_with_context(
                LogContext::new("sensor").with_home_id(&home.home_id),
            ),
        }
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn entity_id(&self) -> String {
        format!("sensor.{}", self.unique_id)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn home_id(&self) -> &str {
        &self.home_id
    }

    /// Current hour's price right now
    pub fn native_value(&self) -> Option<f64> {
        self.native_value_at(self.clock.now())
    }

    /// Total of the first `today` price whose local hour equals the hour of `now`
    pub fn native_value_at(&self, now: DateTime<Tz>) -> Option<f64> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let tz = now.timezone();
        state.attributes.today.iter().find_map(|price| {
            let starts_at = parse_timestamp(&price.starts_at).ok()?.with_timezone(&tz);
            (starts_at.hour() == now.hour()).then_some(price.total)
        })
    }

    pub fn unit_of_measurement(&self) -> Option<String> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .unit_of_measurement
            .clone()
    }

    pub fn attributes(&self) -> SensorAttributes {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .attributes
            .clone()
    }

    pub fn snapshot(&self) -> SensorSnapshot {
        self.snapshot_at(self.clock.now())
    }

    pub fn snapshot_at(&self, now: DateTime<Tz>) -> SensorSnapshot {
        SensorSnapshot {
            entity_id: self.entity_id(),
            unique_id: self.unique_id.clone(),
            name: self.name.clone(),
            home_id: self.home_id.clone(),
            icon: SENSOR_ICON.to_string(),
            state: self.native_value_at(now),
            unit_of_measurement: self.unit_of_measurement(),
            attributes: self.attributes(),
        }
    }
}

impl PriceSubscriber for FuturePriceSensor {
    fn on_new_result(&self, result: &RefreshResult) {
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            state.attributes = SensorAttributes {
                today: result.today.clone(),
                tomorrow: result.tomorrow.clone(),
            };
            state.unit_of_measurement = Some(result.currency.clone());
        }
        self.logger.trace(&format!(
            "{} updated: {} today, {} tomorrow",
            self.entity_id(),
            result.today.len(),
            result.tomorrow.len()
        ));
    }
}
