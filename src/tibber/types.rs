//! Wire types for the Tibber GraphQL API

use super::{HomeInfo, HomePrices};
use serde::Deserialize;

pub const HOMES_QUERY: &str = r"
query Homes {
    viewer {
        homes {
            id
            appNickname
            currentSubscription { status }
        }
    }
}
";

pub const PRICE_INFO_QUERY: &str = r"
query PriceInfo($homeId: ID!) {
    viewer {
        home(id: $homeId) {
            currentSubscription {
                priceInfo {
                    current { currency }
                    today { total startsAt currency }
                    tomorrow { total startsAt currency }
                }
            }
        }
    }
}
";

#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct HomesData {
    pub viewer: HomesViewer,
}

#[derive(Debug, Deserialize)]
pub struct HomesViewer {
    #[serde(default)]
    pub homes: Option<Vec<HomeNode>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeNode {
    pub id: String,
    pub app_nickname: Option<String>,
    pub current_subscription: Option<SubscriptionNode>,
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionNode {
    pub status: Option<String>,
}

impl From<HomeNode> for HomeInfo {
    fn from(node: HomeNode) -> Self {
        Self {
            home_id: node.id,
            app_nickname: node.app_nickname,
            subscription_status: node.current_subscription.and_then(|s| s.status),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PriceData {
    pub viewer: PriceViewer,
}

#[derive(Debug, Deserialize)]
pub struct PriceViewer {
    pub home: Option<PriceHome>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceHome {
    pub current_subscription: Option<PriceSubscription>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSubscription {
    pub price_info: Option<PriceInfo>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PriceInfo {
    pub current: Option<PriceEntry>,
    pub today: Option<Vec<PriceEntry>>,
    pub tomorrow: Option<Vec<PriceEntry>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceEntry {
    pub total: Option<f64>,
    pub starts_at: Option<String>,
    pub currency: Option<String>,
}

impl From<PriceInfo> for HomePrices {
    fn from(info: PriceInfo) -> Self {
        let entries: Vec<PriceEntry> = info
            .today
            .into_iter()
            .flatten()
            .chain(info.tomorrow.into_iter().flatten())
            .collect();

        let currency = info
            .current
            .and_then(|c| c.currency)
            .or_else(|| entries.iter().find_map(|e| e.currency.clone()))
            .unwrap_or_default();

        let price_total = entries
            .into_iter()
            .filter_map(|e| Some((e.starts_at?, e.total?)))
            .collect();

        Self {
            currency,
            price_total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn homes_response_maps_to_home_info() {
        let body = json!({
            "data": {"viewer": {"homes": [
                {"id": "h1", "appNickname": "Villa", "currentSubscription": {"status": "running"}},
                {"id": "h2", "appNickname": null, "currentSubscription": null}
            ]}}
        });
        let parsed: GraphQlResponse<HomesData> = serde_json::from_value(body).unwrap();
        let homes: Vec<HomeInfo> = parsed
            .data
            .unwrap()
            .viewer
            .homes
            .unwrap()
            .into_iter()
            .map(HomeInfo::from)
            .collect();
        assert_eq!(homes.len(), 2);
        assert!(homes[0].is_active());
        assert_eq!(homes[0].display_name(), "Villa");
        assert!(!homes[1].is_active());
    }

    #[test]
    fn price_info_merges_today_and_tomorrow() {
        let body = json!({
            "current": {"currency": "NOK"},
            "today": [
                {"total": 1.2345, "startsAt": "2026-10-19T00:00:00.000+02:00", "currency": "NOK"},
                {"total": 1.5, "startsAt": "2026-10-19T01:00:00.000+02:00", "currency": "NOK"}
            ],
            "tomorrow": null
        });
        let info: PriceInfo = serde_json::from_value(body).unwrap();
        let prices = HomePrices::from(info);
        assert_eq!(prices.currency, "NOK");
        assert_eq!(prices.price_total.len(), 2);
        assert_eq!(
            prices.price_total.get("2026-10-19T01:00:00.000+02:00"),
            Some(&1.5)
        );
    }

    #[test]
    fn incomplete_entries_are_skipped() {
        let body = json!({
            "today": [
                {"total": null, "startsAt": "2026-10-19T00:00:00.000+02:00", "currency": "SEK"},
                {"total": 0.9, "startsAt": "2026-10-19T01:00:00.000+02:00", "currency": "SEK"}
            ]
        });
        let info: PriceInfo = serde_json::from_value(body).unwrap();
        let prices = HomePrices::from(info);
        assert_eq!(prices.currency, "SEK");
        assert_eq!(prices.price_total.len(), 1);
    }
}
