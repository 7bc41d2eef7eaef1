//! Where exposition payloads come from.

use std::{fmt, path::PathBuf};

use reqwest::Url;
use tracing::debug;

use crate::fetch::{self, Fetcher};

/// A payload origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A live HTTP endpoint
    Endpoint(Url),
    /// A payload saved on disk
    File(PathBuf),
}

impl Source {
    /// Read one payload from this source.
    ///
    /// # Errors
    ///
    /// Endpoint errors are those of [`Fetcher::fetch`]. Files fail with
    /// [`fetch::Error::Io`].
    pub async fn read(&self, fetcher: &Fetcher) -> Result<String, fetch::Error> {
        match self {
            Self::Endpoint(url) => fetcher.fetch(url.as_str()).await,
            Self::File(path) => {
                debug!("reading payload from {}", path.display());
                Ok(tokio::fs::read_to_string(path).await?)
            }
        }
    }

    /// The endpoint URL, if this is a live source.
    #[must_use]
    pub fn endpoint(&self) -> Option<&Url> {
        match self {
            Self::Endpoint(url) => Some(url),
            Self::File(_) => None,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Endpoint(url) => write!(f, "{url}"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{io::Write, time::Duration};

    use super::*;

    #[tokio::test]
    async fn reads_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "mw_user_count 5").expect("write");
        let source = Source::File(file.path().to_path_buf());
        let body = source
            .read(&Fetcher::new(Duration::from_secs(1)))
            .await
            .expect("file is readable");
        assert_eq!(body, "mw_user_count 5\n");
        assert!(source.endpoint().is_none());
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let source = Source::File(dir.path().join("absent.txt"));
        let err = source
            .read(&Fetcher::new(Duration::from_secs(1)))
            .await
            .expect_err("file does not exist");
        assert!(matches!(err, fetch::Error::Io(_)));
        assert_eq!(err.reason(), "io");
    }
}
