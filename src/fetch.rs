//! HTTP client for the brief endpoint.
//!
//! One bounded-timeout GET per refresh attempt. The client never retries on
//! its own — retry policy belongs to the job and the scheduler cadence.

use crate::error::{BriefError, Result};
use chrono::NaiveDate;
use std::time::Duration;

/// TCP connect timeout per fetch attempt.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Read timeout per fetch attempt.
pub const READ_TIMEOUT: Duration = Duration::from_secs(15);

/// Endpoint path appended to the configured base URL.
const BRIEF_PATH: &str = "/api/brief";

/// Fixed query parameters for the brief request, besides the date.
const QUERY_MODE: &str = "execution";
const QUERY_LEVEL: &str = "3_5";
const QUERY_ITEM_COUNT: &str = "100";

/// Outcome of a single fetch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// 2xx response, body fully read.
    Success(String),
    /// Non-2xx HTTP status.
    HttpStatus(u16),
    /// Transport-level failure: timeout, DNS, connection reset, bad URL.
    Transport(String),
}

/// Client for fetching the daily brief document.
///
/// Wraps a [`reqwest::Client`]; connections are released on every exit path
/// by reqwest's scoped response handling.
pub struct BriefClient {
    http: reqwest::Client,
}

impl BriefClient {
    /// Create a client with the standard timeouts.
    pub fn new() -> Result<Self> {
        Self::with_timeouts(CONNECT_TIMEOUT, READ_TIMEOUT)
    }

    /// Create a client with explicit timeouts (tests use short ones).
    pub fn with_timeouts(connect: Duration, read: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(connect)
            .read_timeout(read)
            .build()
            .map_err(|e| BriefError::Fetch(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }

    /// Fetch the brief for `date` from `api_base`.
    ///
    /// Issues `GET {api_base}/api/brief?date=..&mode=execution&level=3_5&itemCount=100`
    /// with all query values percent-encoded. The body is treated as opaque
    /// text; no JSON validation happens at this layer.
    pub async fn fetch(&self, api_base: &str, date: NaiveDate) -> FetchOutcome {
        let url = format!("{api_base}{BRIEF_PATH}");
        let date = date.format("%Y-%m-%d").to_string();

        let response = self
            .http
            .get(&url)
            .query(&[
                ("date", date.as_str()),
                ("mode", QUERY_MODE),
                ("level", QUERY_LEVEL),
                ("itemCount", QUERY_ITEM_COUNT),
            ])
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => return FetchOutcome::Transport(describe_transport(&e)),
        };

        let status = response.status();
        if !status.is_success() {
            return FetchOutcome::HttpStatus(status.as_u16());
        }

        match response.text().await {
            Ok(body) => FetchOutcome::Success(body),
            Err(e) => FetchOutcome::Transport(describe_transport(&e)),
        }
    }
}

/// Compact, stable description of a transport failure for `lastError`.
fn describe_transport(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "timeout".to_owned()
    } else if e.is_connect() {
        format!("connect: {e}")
    } else {
        e.to_string()
    }
}
