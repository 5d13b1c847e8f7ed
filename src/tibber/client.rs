use super::types::{
    GraphQlResponse, HOMES_QUERY, HomesData, PRICE_INFO_QUERY, PriceData, PriceInfo,
};
use super::{HomeInfo, HomePrices, ProviderConnection};
use crate::config::TibberConfig;
use crate::error::{PriceError, Result};
use crate::logging::{StructuredLogger, get_logger};
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;

/// Tibber GraphQL API connection
pub struct TibberConnection {
    http: reqwest::Client,
    api_url: String,
    access_token: String,
    logger: StructuredLogger,
}

impl TibberConnection {
    /// Build a connection from configuration; an empty token is rejected up front
    pub fn new(cfg: &TibberConfig) -> Result<Self> {
        let access_token = cfg.access_token.trim().to_string();
        if access_token.is_empty() {
            return Err(PriceError::auth("No Tibber access token configured"));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.request_timeout_seconds))
            .build()?;

        Ok(Self {
            http,
            api_url: cfg.api_url.clone(),
            access_token,
            logger: get_logger("tibber"),
        })
    }

    async fn query<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T> {
        let resp = self
            .http
            .post(&self.api_url)
            .header(AUTHORIZATION, format!("Bearer {}", self.access_token))
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .header(
                USER_AGENT,
                concat!("tibber-future-prices/", env!("CARGO_PKG_VERSION")),
            )
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            self.logger
                .error(&format!("Tibber API rejected the access token: {status}"));
            return Err(PriceError::auth(format!("Tibber API returned {status}")));
        }
        if !status.is_success() {
            self.logger.error(&format!("Tibber API error: {status}"));
            return Err(PriceError::api(format!("Tibber API returned {status}")));
        }

        let bytes = resp.bytes().await?;
        let body: GraphQlResponse<T> = serde_json::from_slice(&bytes)
            .map_err(|e| PriceError::api(format!("Invalid Tibber API response: {e}")))?;
        if let Some(first) = body.errors.as_ref().and_then(|errors| errors.first()) {
            self.logger
                .error(&format!("Tibber API GraphQL error: {}", first.message));
            return Err(PriceError::api(first.message.clone()));
        }

        body.data
            .ok_or_else(|| PriceError::api("Tibber API response contained no data"))
    }
}

#[async_trait]
impl ProviderConnection for TibberConnection {
    async fn homes(&self, only_active: bool) -> Result<Vec<HomeInfo>> {
        let data: HomesData = self.query(HOMES_QUERY, json!({})).await?;
        let homes: Vec<HomeInfo> = data
            .viewer
            .homes
            .unwrap_or_default()
            .into_iter()
            .map(HomeInfo::from)
            .filter(|home| !only_active || home.is_active())
            .collect();

        if homes.is_empty() {
            self.logger.warn("No homes in Tibber account");
        } else {
            self.logger
                .debug(&format!("Tibber account has {} home(s)", homes.len()));
        }
        Ok(homes)
    }

    async fn update_info_and_price_info(&self, home_id: &str) -> Result<HomePrices> {
        let data: PriceData = self
            .query(PRICE_INFO_QUERY, json!({ "homeId": home_id }))
            .await?;

        let home = data
            .viewer
            .home
            .ok_or_else(|| PriceError::api(format!("Unknown Tibber home {home_id}")))?;

        let info = home
            .current_subscription
            .and_then(|s| s.price_info)
            .unwrap_or_else(PriceInfo::default);

        Ok(HomePrices::from(info))
    }
}
