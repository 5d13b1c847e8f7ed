//! # Tibber Future Prices
//!
//! Periodically fetches hourly electricity prices from the Tibber API and
//! exposes them as one sensor per home: the state is the price of the current
//! hour and the attributes hold the full price lists for today and tomorrow.
//!
//! ## Architecture
//!
//! - `setup`: one-time setup flow and persisted configuration entries
//! - `tibber`: provider connection (Tibber GraphQL API)
//! - `coordinator`: per-home refresh job and price shaping
//! - `sensor`: presentation entity fed by a refresh job
//! - `integration`: entry lifecycle wiring jobs, sensors and the registry
//! - `web`: read-only HTTP view of the sensors
//! - `config`, `logging`, `error`, `clock`: ambient plumbing

pub mod clock;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod integration;
pub mod logging;
pub mod sensor;
pub mod setup;
pub mod tibber;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use coordinator::{PriceRefreshJob, RefreshResult, ShapedPrice};
pub use error::{PriceError, Result};
pub use sensor::FuturePriceSensor;
