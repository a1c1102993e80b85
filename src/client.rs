//! HTTP transport for PEWS snapshot fetches and tide synchronization.
//!
//! A thin wrapper over a single shared `reqwest::blocking::Client` with the
//! 1-second connect+read timeout the poll loop's tick budget depends on.
//! No retries live at this layer; the poll loop decides what a 404 or
//! timeout means for scheduling.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use tracing::{debug, instrument};

use crate::errors::PewsError;

/// Request timeout: the entire tick budget, so fetches must not exceed it.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(1);

/// Base path for snapshot data; timestamps are appended as
/// `{DATA_PATH}/{YYYYMMDDhhmmss}.b` / `.s`.
pub const DATA_PATH: &str = "https://www.weather.go.kr/pews/data";

/// User agent string for API requests.
const USER_AGENT: &str = concat!("pews-tail/", env!("CARGO_PKG_VERSION"));

/// Fetches MMI and station snapshots over HTTP.
pub struct PewsClient {
    client: Client,
}

impl PewsClient {
    /// Create a new client with the fixed 1-second timeout.
    ///
    /// # Errors
    ///
    /// Returns [`PewsError::Http`] if the underlying HTTP client cannot be
    /// initialized.
    pub fn new() -> Result<Self, PewsError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    /// The inner blocking client, for callers that also need the tide
    /// estimator's `ST` header fetch.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Fetch the MMI snapshot (`.b`) for a given timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`PewsError::Timeout`] if the request exceeds the 1-second
    /// budget, [`PewsError::HttpStatus`] on a non-200 response (including
    /// 404, which the caller treats as "not yet published"), or
    /// [`PewsError::Http`] on other transport failures.
    #[instrument(skip(self))]
    pub fn fetch_mmi(&self, p_time: &str) -> Result<Vec<u8>, PewsError> {
        self.fetch(&format!("{DATA_PATH}/{p_time}.b"))
    }

    /// Fetch the station snapshot (`.s`) for a given timestamp.
    ///
    /// # Errors
    ///
    /// Same disposition as [`Self::fetch_mmi`].
    #[instrument(skip(self))]
    pub fn fetch_station(&self, p_time: &str) -> Result<Vec<u8>, PewsError> {
        self.fetch(&format!("{DATA_PATH}/{p_time}.s"))
    }

    /// Fetch an arbitrary replay URL, used by simulation mode.
    ///
    /// # Errors
    ///
    /// Same disposition as [`Self::fetch_mmi`].
    pub fn fetch_url(&self, url: &str) -> Result<Vec<u8>, PewsError> {
        self.fetch(url)
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>, PewsError> {
        debug!("fetching {}", url);
        let response = match self.client.get(url).send() {
            Ok(r) => r,
            Err(e) if e.is_timeout() => return Err(PewsError::Timeout),
            Err(e) => return Err(PewsError::Http(e)),
        };

        let status = response.status();
        if !status.is_success() {
            return Err(PewsError::HttpStatus(status.as_u16()));
        }

        let bytes = response_bytes(response)?;
        Ok(bytes)
    }
}

impl Default for PewsClient {
    fn default() -> Self {
        Self::new().expect("failed to build default HTTP client")
    }
}

fn response_bytes(response: Response) -> Result<Vec<u8>, PewsError> {
    Ok(response.bytes()?.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_path_builds_expected_mmi_url() {
        let p_time = "20260131120000";
        let url = format!("{DATA_PATH}/{p_time}.b");
        assert_eq!(
            url,
            "https://www.weather.go.kr/pews/data/20260131120000.b"
        );
    }

    #[test]
    fn data_path_builds_expected_station_url() {
        let p_time = "20260131120000";
        let url = format!("{DATA_PATH}/{p_time}.s");
        assert_eq!(
            url,
            "https://www.weather.go.kr/pews/data/20260131120000.s"
        );
    }
}
