//! Price refresh jobs
//!
//! One [`PriceRefreshJob`] exists per Tibber home. It asks the provider
//! connection for the home's raw price map, buckets the prices into the local
//! "today" and "tomorrow" and publishes the result to its subscribers. A failed
//! refresh never clears or overwrites the last good result; the next tick of
//! the refresh loop simply tries again.

use crate::clock::Clock;
use crate::error::{PriceError, Result};
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use crate::tibber::{HomeInfo, HomePrices, ProviderConnection};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDateTime, SecondsFormat};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::WatchStream;

/// Default cadence of the refresh loop
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// One hourly price as exposed to consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapedPrice {
    /// Local ISO-8601 start of the hour
    #[serde(rename = "startsAt")]
    pub starts_at: String,
    /// Total price rounded to two decimals
    pub total: f64,
}

/// Outcome of one successful refresh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshResult {
    pub today: Vec<ShapedPrice>,
    pub tomorrow: Vec<ShapedPrice>,
    pub currency: String,
}

/// Something that can be refreshed on demand and remembers its last good result
#[async_trait]
pub trait RefreshSource: Send + Sync {
    /// Fetch, reshape and publish; on error the previous result stays current
    async fn refresh(&self) -> Result<Arc<RefreshResult>>;

    /// Most recent successful result, if any
    fn latest(&self) -> Option<Arc<RefreshResult>>;
}

/// Receiver of newly published refresh results
pub trait PriceSubscriber: Send + Sync {
    fn on_new_result(&self, result: &RefreshResult);
}

/// Round the exact value of `value` to two decimals
pub fn round_price(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let rounded: f64 = format!("{value:.2}").parse().unwrap_or(value);
    if rounded == 0.0 { 0.0 } else { rounded }
}

/// Parse a provider timestamp; offset-less values are taken as UTC
pub fn parse_timestamp(value: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
                .map(|naive| naive.and_utc().fixed_offset())
        })
        .map_err(|e| PriceError::Timestamp {
            value: value.to_string(),
            message: e.to_string(),
        })
}

/// Split raw prices into the local today and tomorrow of `now`
///
/// Prices on any other local date are dropped. Both lists are ordered by start
/// time.
pub fn shape_prices(prices: &HomePrices, now: DateTime<Tz>) -> Result<RefreshResult> {
    let tz = now.timezone();
    let today = now.date_naive();
    let tomorrow = today.succ_opt();

    let mut today_points = Vec::new();
    let mut tomorrow_points = Vec::new();

    for (starts_at, total) in &prices.price_total {
        let local = parse_timestamp(starts_at)?.with_timezone(&tz);
        let date = local.date_naive();
        if date == today {
            today_points.push((local, *total));
        } else if Some(date) == tomorrow {
            tomorrow_points.push((local, *total));
        }
    }

    Ok(RefreshResult {
        today: into_shaped(today_points),
        tomorrow: into_shaped(tomorrow_points),
        currency: prices.currency.clone(),
    })
}

fn into_shaped(mut points: Vec<(DateTime<Tz>, f64)>) -> Vec<ShapedPrice> {
    points.sort_by_key(|(starts_at, _)| *starts_at);
    points
        .into_iter()
        .map(|(starts_at, total)| ShapedPrice {
            starts_at: starts_at.to_rfc3339_opts(SecondsFormat::AutoSi, false),
            total: round_price(total),
        })
        .collect()
}

/// Periodic price refresh for a single home
pub struct PriceRefreshJob {
    name: String,
    home: HomeInfo,
    connection: Arc<dyn ProviderConnection>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    updates: watch::Sender<Option<Arc<RefreshResult>>>,
    in_flight: Mutex<()>,
    logger: StructuredLogger,
}

impl PriceRefreshJob {
    pub fn new(
        home: HomeInfo,
        connection: Arc<dyn ProviderConnection>,
        clock: Arc<dyn Clock>,
        interval: Duration,
    ) -> Self {
        let logger = get_logger_with_context(
            LogContext::new("coordinator")
                .with_home_id(&home.home_id)
                .with_field("interval_s", interval.as_secs().to_string()),
        );
        let (updates, _) = watch::channel(None);
        Self {
            name: format!("Tibber Future Prices {}", home.home_id),
            home,
            connection,
            clock,
            interval,
            updates,
            in_flight: Mutex::new(()),
            logger,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn home(&self) -> &HomeInfo {
        &self.home
    }

    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Watch channel carrying every successful result
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<RefreshResult>>> {
        self.updates.subscribe()
    }

    /// Initial synchronous run; a failure means the entry is not ready yet
    pub async fn first_refresh(&self) -> Result<Arc<RefreshResult>> {
        self.refresh().await.map_err(|e| {
            PriceError::not_ready(format!("first refresh of {} failed: {e}", self.name))
        })
    }

    async fn fetch_and_shape(&self) -> Result<RefreshResult> {
        let prices = self
            .connection
            .update_info_and_price_info(&self.home.home_id)
            .await?;

        if prices.is_empty() {
            self.logger.warn(
                "No price data received from Tibber. Keeping previous data if available.",
            );
            return Err(PriceError::no_price_data(&self.home.home_id));
        }

        shape_prices(&prices, self.clock.now())
    }
}

#[async_trait]
impl RefreshSource for PriceRefreshJob {
    async fn refresh(&self) -> Result<Arc<RefreshResult>> {
        let _in_flight = self.in_flight.lock().await;

        match self.fetch_and_shape().await {
            Ok(result) => {
                let result = Arc::new(result);
                self.logger.debug(&format!(
                    "Refreshed prices: {} today, {} tomorrow ({})",
                    result.today.len(),
                    result.tomorrow.len(),
                    result.currency
                ));
                self.updates.send_replace(Some(Arc::clone(&result)));
                Ok(result)
            }
            Err(e) => {
                self.logger.warn(&format!("Price refresh failed: {e}"));
                Err(e)
            }
        }
    }

    fn latest(&self) -> Option<Arc<RefreshResult>> {
        self.updates.borrow().clone()
    }
}

/// Run `job` every `job.interval()`, starting one interval from now
pub fn spawn_refresh_loop(job: Arc<PriceRefreshJob>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = job.interval();
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            // Failures are logged by refresh; the next tick retries
            let _ = job.refresh().await;
        }
    })
}

/// Deliver every published result of `job` to `subscriber` until aborted
pub fn bind_subscriber(
    job: &PriceRefreshJob,
    subscriber: Arc<dyn PriceSubscriber>,
) -> JoinHandle<()> {
    let mut updates = WatchStream::new(job.subscribe());
    tokio::spawn(async move {
        while let Some(update) = updates.next().await {
            if let Some(result) = update {
                subscriber.on_new_result(&result);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Europe::Oslo;

    fn prices(entries: &[(&str, f64)]) -> HomePrices {
        HomePrices {
            currency: "NOK".to_string(),
            price_total: entries
                .iter()
                .map(|(k, v)| ((*k).to_string(), *v))
                .collect(),
        }
    }

    #[test]
    fn rounding_matches_two_decimals() {
        assert!((round_price(12.345) - 12.35).abs() < f64::EPSILON);
        assert!((round_price(0.2567) - 0.26).abs() < f64::EPSILON);
        assert!((round_price(1.234) - 1.23).abs() < f64::EPSILON);
        // Exact binary ties go to even; 2.675 is stored just below the tie
        assert!((round_price(0.125) - 0.12).abs() < f64::EPSILON);
        assert!((round_price(0.375) - 0.38).abs() < f64::EPSILON);
        assert!((round_price(2.675) - 2.67).abs() < f64::EPSILON);
        assert!((round_price(-0.001)).abs() < f64::EPSILON);
        assert!(round_price(f64::NAN).is_nan());
    }

    #[test]
    fn timestamps_parse_with_and_without_offset() {
        let with = parse_timestamp("2026-10-19T00:00:00.000+02:00").unwrap();
        assert_eq!(with.offset().local_minus_utc(), 7200);

        let naive = parse_timestamp("2026-10-19T00:00:00").unwrap();
        assert_eq!(naive.offset().local_minus_utc(), 0);

        assert!(matches!(
            parse_timestamp("yesterday"),
            Err(PriceError::Timestamp { .. })
        ));
    }

    #[test]
    fn prices_are_bucketed_by_local_date() {
        let now = Oslo.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        let raw = prices(&[
            ("2026-10-19T00:00:00.000+02:00", 1.111),
            ("2026-10-20T00:00:00.000+02:00", 2.222),
            ("2026-10-21T00:00:00.000+02:00", 3.333),
            ("2026-10-18T23:00:00.000+02:00", 4.444),
        ]);

        let result = shape_prices(&raw, now).unwrap();
        assert_eq!(result.today.len(), 1);
        assert_eq!(result.today[0].starts_at, "2026-10-19T00:00:00+02:00");
        assert!((result.today[0].total - 1.11).abs() < f64::EPSILON);
        assert_eq!(result.tomorrow.len(), 1);
        assert_eq!(result.tomorrow[0].starts_at, "2026-10-20T00:00:00+02:00");
        assert_eq!(result.currency, "NOK");
    }

    #[test]
    fn utc_timestamps_are_converted_to_local_day() {
        // 22:30 UTC on the 18th is 00:30 on the 19th in Oslo (CEST)
        let now = Oslo.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        let raw = prices(&[("2026-10-18T22:30:00Z", 0.5)]);
        let result = shape_prices(&raw, now).unwrap();
        assert_eq!(result.today.len(), 1);
        assert_eq!(result.today[0].starts_at, "2026-10-19T00:30:00+02:00");
    }

    #[test]
    fn buckets_are_sorted_by_start_time() {
        let now = Oslo.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        // Mixed offsets sort wrong lexicographically but right by instant
        let raw = prices(&[
            ("2026-10-19T03:00:00+02:00", 3.0),
            ("2026-10-19T00:30:00Z", 2.0),
            ("2026-10-19T01:00:00+02:00", 1.0),
        ]);
        let result = shape_prices(&raw, now).unwrap();
        let totals: Vec<f64> = result.today.iter().map(|p| p.total).collect();
        assert_eq!(totals, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn bad_timestamp_fails_the_shaping() {
        let now = Oslo.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        let raw = prices(&[("not a time", 1.0)]);
        assert!(shape_prices(&raw, now).is_err());
    }

    #[test]
    fn shaped_price_serializes_with_provider_keys() {
        let price = ShapedPrice {
            starts_at: "2026-10-19T00:00:00+02:00".to_string(),
            total: 0.26,
        };
        let value = serde_json::to_value(&price).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"startsAt": "2026-10-19T00:00:00+02:00", "total": 0.26})
        );
    }
}
