//! Clock alignment between the local machine and the published snapshot
//! clock.
//!
//! Every poll URL is built from `UTC(now - tide)`; getting `tide` wrong
//! means every fetch either 404s (too far ahead) or returns stale data (too
//! far behind). [`TideEstimator`] refreshes `tide` from the `ST` header on
//! `https://www.weather.go.kr/pews/pews.html` and otherwise holds its last
//! known value, so a single bad response never poisons the poll loop.

use chrono::Utc;
use reqwest::blocking::Client;
use tracing::warn;

use crate::errors::PewsError;

/// URL carrying the `ST` tide-sync header.
const TIDE_URL: &str = "https://www.weather.go.kr/pews/pews.html";

/// Initial tide value before the first successful refresh.
const INITIAL_TIDE: f64 = 1.0;

/// A source of "now", injectable so tests can simulate clock drift.
pub trait Clock: Send + Sync {
    fn now_seconds(&self) -> f64;
}

/// The real wall clock.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_seconds(&self) -> f64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64()
    }
}

/// Tracks the offset between the local clock and the server's publication
/// clock, and formats poll timestamps from it.
pub struct TideEstimator<C: Clock = SystemClock> {
    clock: C,
    tide: f64,
}

impl TideEstimator<SystemClock> {
    /// Create an estimator backed by the real wall clock.
    #[must_use]
    pub fn new() -> Self {
        Self {
            clock: SystemClock,
            tide: INITIAL_TIDE,
        }
    }
}

impl Default for TideEstimator<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> TideEstimator<C> {
    /// Create an estimator backed by a custom clock (for tests).
    #[must_use]
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            tide: INITIAL_TIDE,
        }
    }

    /// Current tide value in seconds.
    #[must_use]
    pub fn tide(&self) -> f64 {
        self.tide
    }

    /// Refresh `tide` from the `ST` header.
    ///
    /// On success, `tide = local_now - (server_time - 1)`; the `-1` is an
    /// intentional one-second back-off because snapshots publish with a
    /// short delay.
    ///
    /// # Errors
    ///
    /// Returns [`PewsError::Http`] on transport failure, or
    /// [`PewsError::TideStale`] if the `ST` header is missing or
    /// unparseable. In the latter case the previous tide is kept.
    pub fn refresh(&mut self, client: &Client) -> Result<(), PewsError> {
        let response = client.get(TIDE_URL).send()?;
        let server_time = response
            .headers()
            .get("ST")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<f64>().ok());

        let Some(server_time) = server_time else {
            warn!("ST header missing or unparseable, keeping previous tide");
            return Err(PewsError::TideStale);
        };

        self.tide = self.clock.now_seconds() - (server_time - 1.0);
        Ok(())
    }

    /// The UTC timestamp to poll for, formatted `YYYYMMDDhhmmss`.
    #[must_use]
    pub fn p_time(&self) -> String {
        let adjusted = self.clock.now_seconds() - self.tide;
        let secs = adjusted.floor() as i64;
        let nanos = ((adjusted - secs as f64) * 1e9).round() as u32;
        let dt = chrono::DateTime::from_timestamp(secs, nanos).unwrap_or_else(|| Utc::now());
        dt.format("%Y%m%d%H%M%S").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    struct FixedClock {
        seconds: AtomicI64,
    }

    impl Clock for FixedClock {
        fn now_seconds(&self) -> f64 {
            self.seconds.load(Ordering::SeqCst) as f64
        }
    }

    #[test]
    fn initial_tide_is_one_second() {
        let estimator = TideEstimator::with_clock(FixedClock {
            seconds: AtomicI64::new(1_700_000_000),
        });
        assert!((estimator.tide() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn p_time_lags_by_tide_plus_one_second_backoff() {
        // A clock running 7.3s ahead of the server should leave p_time
        // lagging real "now" by 7.3 + 1.0 = 8.3 seconds once tide is set
        // to match that drift, mirroring the refresh() computation without
        // a live HTTP round trip.
        let now = 1_700_000_000i64;
        let clock = FixedClock {
            seconds: AtomicI64::new(now),
        };
        let mut estimator = TideEstimator::with_clock(clock);

        let server_time = now as f64 - 7.3;
        estimator.tide = estimator.clock.now_seconds() - (server_time - 1.0);
        assert!((estimator.tide() - 8.3).abs() < 1e-6);

        let p_time = estimator.p_time();
        assert_eq!(p_time.len(), 14);
    }
}
