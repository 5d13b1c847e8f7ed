//! Tibber provider connection
//!
//! The integration never talks HTTP itself: it is handed an
//! `Arc<dyn ProviderConnection>` at setup time and asks it for the active
//! homes and, per home, for a fresh copy of the raw price map.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod client;
pub mod types;

pub use client::TibberConnection;

/// Subscription states Tibber reports for a home that is being supplied
const ACTIVE_SUBSCRIPTION_STATES: [&str; 3] =
    ["running", "awaiting market", "awaiting time restriction"];

/// Identity of one metered location under the user's contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomeInfo {
    pub home_id: String,
    pub app_nickname: Option<String>,
    pub subscription_status: Option<String>,
}

impl HomeInfo {
    pub fn new(home_id: impl Into<String>) -> Self {
        Self {
            home_id: home_id.into(),
            app_nickname: None,
            subscription_status: Some("running".to_string()),
        }
    }

    #[must_use]
    pub fn with_nickname(mut self, nickname: impl Into<String>) -> Self {
        self.app_nickname = Some(nickname.into());
        self
    }

    pub fn is_active(&self) -> bool {
        self.subscription_status.as_deref().is_some_and(|status| {
            ACTIVE_SUBSCRIPTION_STATES
                .iter()
                .any(|active| status.eq_ignore_ascii_case(active))
        })
    }

    /// Nickname if set, otherwise `Home` followed by the last four id characters
    pub fn display_name(&self) -> String {
        match self.app_nickname.as_deref() {
            Some(nickname) if !nickname.is_empty() => nickname.to_string(),
            _ => {
                let chars: Vec<char> = self.home_id.chars().collect();
                let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
                format!("Home {tail}")
            }
        }
    }
}

/// Raw price data of one home as last fetched from the provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HomePrices {
    pub currency: String,
    /// `startsAt` timestamp string to total price
    pub price_total: BTreeMap<String, f64>,
}

impl HomePrices {
    pub fn is_empty(&self) -> bool {
        self.price_total.is_empty()
    }
}

/// Pre-authenticated, process-wide connection to the energy provider
#[async_trait]
pub trait ProviderConnection: Send + Sync {
    /// Enumerate the homes on the account, optionally only the supplied ones
    async fn homes(&self, only_active: bool) -> Result<Vec<HomeInfo>>;

    /// Refresh and return the raw price map of one home
    async fn update_info_and_price_info(&self, home_id: &str) -> Result<HomePrices>;
}
