//! # Oracle Client
//!
//! The single remote call the explorer depends on: combine two element
//! texts into a result.
//!
//! ```text
//! GET {base_url}/pair?first=Fire&second=Water
//! -> { "result": "Steam", "emoji": "💨", "isNew": true }
//! ```
//!
//! Inputs are sorted before submission. The request has a bounded timeout.
//! A 429 response is reported as [`OracleError::RateLimited`], any other
//! non-success status as [`OracleError::Http`]; both carry the
//! `retry-after` header when it holds a number of seconds.

use crucible_core::PairKey;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Default remote endpoint.
pub const DEFAULT_BASE_URL: &str = "https://neal.fun/api/infinite-craft";

/// Default bound on one oracle request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// A successful oracle answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleReply {
    pub result: String,
    #[serde(default)]
    pub emoji: String,
    #[serde(rename = "isNew", default)]
    pub is_new: bool,
}

/// Failures of one oracle call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    /// The request did not complete within the configured timeout.
    #[error("Oracle request timed out")]
    Timeout,

    /// Connection or protocol failure before a status was received.
    #[error("Oracle transport error: {0}")]
    Transport(String),

    /// HTTP 429. The caller must back off.
    #[error("Oracle rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    /// Any other non-success HTTP status.
    #[error("Oracle returned HTTP {status}")]
    Http {
        status: u16,
        retry_after: Option<Duration>,
    },

    /// The response body was not a valid reply.
    #[error("Oracle response parse error: {0}")]
    Parse(String),
}

impl OracleError {
    /// Timeouts and transport failures: the pair is skipped, the run goes on.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Transport(_))
    }
}

/// Resolves a pair of element texts into a result.
///
/// Implementations are shared across concurrently running dispatches.
pub trait Oracle: Send + Sync + 'static {
    fn combine(
        &self,
        first: &str,
        second: &str,
    ) -> impl Future<Output = Result<OracleReply, OracleError>> + Send;
}

// =============================================================================
// HTTP ORACLE
// =============================================================================

/// [`Oracle`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpOracle {
    http: reqwest::Client,
    base_url: String,
}

impl HttpOracle {
    /// Create a client for `base_url` with a per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, OracleError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OracleError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Endpoint base this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn request_error(e: reqwest::Error) -> OracleError {
    if e.is_timeout() {
        OracleError::Timeout
    } else {
        OracleError::Transport(e.to_string())
    }
}

/// `retry-after` as a number of seconds. HTTP-date values are ignored.
fn retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

impl Oracle for HttpOracle {
    async fn combine(&self, first: &str, second: &str) -> Result<OracleReply, OracleError> {
        let (first, second) = PairKey::sorted(first, second);
        let url = format!("{}/pair", self.base_url);

        let resp = self
            .http
            .get(&url)
            .query(&[("first", first), ("second", second)])
            .send()
            .await
            .map_err(request_error)?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(OracleError::RateLimited {
                retry_after: retry_after(resp.headers()),
            });
        }
        if !status.is_success() {
            return Err(OracleError::Http {
                status: status.as_u16(),
                retry_after: retry_after(resp.headers()),
            });
        }

        let body = resp.bytes().await.map_err(request_error)?;
        serde_json::from_slice(&body).map_err(|e| OracleError::Parse(e.to_string()))
    }
}
