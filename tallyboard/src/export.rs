//! Saving raw payloads to disk.
//!
//! Exports are named `<domain>-metrics-<YYYY-MM-DD>.txt`, where the domain is
//! the second-to-last dot separated part of the endpoint host (`demo` for
//! `server.demo.com`) and falls back to `metrics`.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use reqwest::Url;
use tracing::info;

const FALLBACK_DOMAIN: &str = "metrics";

/// The domain part of an export file name.
#[must_use]
pub fn domain(endpoint: Option<&Url>) -> &str {
    endpoint
        .and_then(Url::host_str)
        .and_then(|host| {
            let mut parts = host.rsplit('.');
            parts.next();
            parts.next()
        })
        .filter(|part| !part.is_empty())
        .unwrap_or(FALLBACK_DOMAIN)
}

/// The file name an export of `endpoint` taken on `date` is saved under.
#[must_use]
pub fn file_name(endpoint: Option<&Url>, date: NaiveDate) -> String {
    format!("{}-metrics-{}.txt", domain(endpoint), date.format("%Y-%m-%d"))
}

/// Write `raw` into `dir` under its export name and return the path written.
///
/// # Errors
///
/// Fails if the file cannot be written.
pub async fn save(
    dir: &Path,
    endpoint: Option<&Url>,
    date: NaiveDate,
    raw: &str,
) -> Result<PathBuf, std::io::Error> {
    let path = dir.join(file_name(endpoint, date));
    tokio::fs::write(&path, raw).await?;
    info!("raw metrics saved as {}", path.display());
    Ok(path)
}
