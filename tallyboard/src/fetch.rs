//! Prometheus endpoint fetcher
//!
//! Fetches one exposition payload over HTTP. The endpoint is first probed with
//! a HEAD request to check it serves `text/plain` without downloading the
//! body. Servers that reject or fail HEAD are given a plain GET instead, and
//! the GET response is checked the same way.
//!

use std::time::Duration;

use metrics::counter;
use reqwest::{StatusCode, Url, header::CONTENT_TYPE};
use tracing::{debug, warn};

/// Errors produced by [`Fetcher`]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The endpoint is not an absolute http or https URL
    #[error("Invalid URL {0:?}")]
    InvalidUrl(String),
    /// The request could not be sent or its body could not be read
    #[error("Failed to fetch metrics: {0}")]
    Request(#[source] reqwest::Error),
    /// The endpoint answered with a non-success status
    #[error("Failed to fetch metrics: {0}")]
    Status(StatusCode),
    /// The endpoint did not serve `text/plain`
    #[error("Invalid content type {found:?}, expected text/plain")]
    ContentType {
        /// The `Content-Type` received, if any
        found: Option<String>,
    },
    /// No answer within the request timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    /// Reading a payload from disk failed
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True when the endpoint was unreachable in time, as opposed to reachable
    /// but rejecting the request.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Short label for telemetry.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvalidUrl(_) => "invalid_url",
            Self::Request(_) => "request",
            Self::Status(_) => "status",
            Self::ContentType { .. } => "content_type",
            Self::Timeout(_) => "timeout",
            Self::Io(_) => "io",
        }
    }
}

/// Whether a `Content-Type` header value names `text/plain`.
///
/// Parameters such as `version=0.0.4` or `charset=utf-8` are ignored.
#[must_use]
pub fn is_text_plain(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case("text/plain"))
}

fn check_content_type(resp: &reqwest::Response) -> Result<(), Error> {
    let found = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    if found.is_some_and(is_text_plain) {
        Ok(())
    } else {
        Err(Error::ContentType {
            found: found.map(str::to_string),
        })
    }
}

/// HTTP client for metrics endpoints
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl Fetcher {
    /// Create a new [`Fetcher`] whose requests give up after `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }

    /// The per-request deadline.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn classify(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout(self.timeout)
        } else {
            Error::Request(err)
        }
    }

    /// Fetch the payload at `endpoint`.
    ///
    /// Each outcome is counted under `tallyboard.fetch` with an `outcome`
    /// label. Nothing is retried. The timeout bounds the whole exchange, the
    /// HEAD probe and any GET fallback together.
    ///
    /// # Errors
    ///
    /// See [`Error`]. A HEAD probe that succeeds with the wrong content type
    /// fails without issuing a GET.
    pub async fn fetch(&self, endpoint: &str) -> Result<String, Error> {
        let result = tokio::time::timeout(self.timeout, self.fetch_inner(endpoint))
            .await
            .unwrap_or(Err(Error::Timeout(self.timeout)));
        match &result {
            Ok(body) => {
                counter!("tallyboard.fetch", "outcome" => "success").increment(1);
                counter!("tallyboard.fetch.bytes").increment(body.len() as u64);
            }
            Err(err) => {
                warn!("failed to fetch {endpoint}: {err}");
                counter!("tallyboard.fetch", "outcome" => err.reason()).increment(1);
            }
        }
        result
    }

    async fn fetch_inner(&self, endpoint: &str) -> Result<String, Error> {
        let url = match Url::parse(endpoint) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => url,
            _ => return Err(Error::InvalidUrl(endpoint.to_string())),
        };

        let probed = match self
            .client
            .head(url.clone())
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => {
                check_content_type(&resp)?;
                true
            }
            Ok(resp) => {
                debug!("HEAD {url} answered {}, falling back to GET", resp.status());
                false
            }
            Err(err) if err.is_timeout() => return Err(Error::Timeout(self.timeout)),
            Err(err) => {
                debug!("HEAD {url} failed, falling back to GET: {err}");
                false
            }
        };

        let resp = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.classify(e))?;
        if !resp.status().is_success() {
            return Err(Error::Status(resp.status()));
        }
        if !probed {
            check_content_type(&resp)?;
        }
        resp.text().await.map_err(|e| self.classify(e))
    }
}
