//! Byte sources for dataset locators.
//!
//! A locator is one of:
//! - `classpath:<path>`: a resource bundled with the service, resolved
//!   against the configured resource directory
//! - `file://<path>`: a local file
//! - anything else: a remote URL fetched over HTTP(S)

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, error};

use darkness_common::{LightPollutionError, LightPollutionResult};

const CLASSPATH_PREFIX: &str = "classpath:";
const FILE_PREFIX: &str = "file://";

/// Opens the bytes behind a dataset locator.
#[async_trait]
pub trait SourceResolver: Send + Sync {
    /// Read the full content addressed by `locator`.
    ///
    /// Fails with `ResourceNotFound` when a bundled resource or local file
    /// does not exist, and with `Io` for any other read or transport failure.
    async fn open(&self, locator: &str) -> LightPollutionResult<Bytes>;
}

/// Parsed form of a locator string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Bundled(String),
    File(PathBuf),
    Remote(String),
}

impl Locator {
    pub fn parse(locator: &str) -> Self {
        if let Some(path) = locator.strip_prefix(CLASSPATH_PREFIX) {
            Locator::Bundled(path.to_string())
        } else if let Some(path) = locator.strip_prefix(FILE_PREFIX) {
            Locator::File(PathBuf::from(path))
        } else {
            Locator::Remote(locator.to_string())
        }
    }
}

/// Default resolver for bundled, local and remote locators.
#[derive(Debug, Clone)]
pub struct LocatorResolver {
    resource_dir: PathBuf,
    client: reqwest::Client,
}

impl LocatorResolver {
    /// Create a resolver that serves `classpath:` locators from `resource_dir`.
    pub fn new(resource_dir: impl Into<PathBuf>) -> LightPollutionResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(Duration::from_secs(600))
            .build()
            .map_err(|e| LightPollutionError::Internal(format!("HTTP client: {}", e)))?;

        Ok(Self {
            resource_dir: resource_dir.into(),
            client,
        })
    }

    pub fn resource_dir(&self) -> &Path {
        &self.resource_dir
    }

    async fn read_bundled(&self, path: &str) -> LightPollutionResult<Bytes> {
        let full_path = self.resource_dir.join(path.trim_start_matches('/'));
        match tokio::fs::read(&full_path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                error!(path = %path, "Resource not found");
                Err(LightPollutionError::ResourceNotFound(path.to_string()))
            }
            Err(e) => {
                error!(path = %path, error = %e, "IO error reading bundled resource");
                Err(LightPollutionError::io(format!("{}{}", CLASSPATH_PREFIX, path), e))
            }
        }
    }

    async fn read_file(&self, locator: &str, path: &Path) -> LightPollutionResult<Bytes> {
        match tokio::fs::read(path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                error!(path = %path.display(), "File not found");
                Err(LightPollutionError::ResourceNotFound(path.display().to_string()))
            }
            Err(e) => {
                error!(locator = %locator, error = %e, "IO error opening stream");
                Err(LightPollutionError::io(locator, e))
            }
        }
    }

    async fn read_remote(&self, url: &str) -> LightPollutionResult<Bytes> {
        let parsed = reqwest::Url::parse(url).map_err(|e| {
            error!(url = %url, error = %e, "Malformed URL");
            LightPollutionError::io(
                url,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("Malformed URL: {}", e)),
            )
        })?;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                error!(url = %url, error = %e, "IO error opening stream");
                LightPollutionError::io(url, std::io::Error::new(std::io::ErrorKind::Other, e))
            })?;

        response.bytes().await.map_err(|e| {
            error!(url = %url, error = %e, "IO error reading response body");
            LightPollutionError::io(url, std::io::Error::new(std::io::ErrorKind::Other, e))
        })
    }
}

#[async_trait]
impl SourceResolver for LocatorResolver {
    async fn open(&self, locator: &str) -> LightPollutionResult<Bytes> {
        debug!(locator = %locator, "Opening dataset source");
        match Locator::parse(locator) {
            Locator::Bundled(path) => self.read_bundled(&path).await,
            Locator::File(path) => self.read_file(locator, &path).await,
            Locator::Remote(url) => self.read_remote(&url).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{temp_test_dir, write_tiff};

    #[test]
    fn test_parse_locators() {
        assert_eq!(
            Locator::parse("classpath:/viirs/2023/average.tif"),
            Locator::Bundled("/viirs/2023/average.tif".to_string())
        );
        assert_eq!(
            Locator::parse("file:///data/average.tif"),
            Locator::File(PathBuf::from("/data/average.tif"))
        );
        assert_eq!(
            Locator::parse("https://example.com/average.tif"),
            Locator::Remote("https://example.com/average.tif".to_string())
        );
    }

    #[tokio::test]
    async fn test_open_bundled_resource() {
        let dir = temp_test_dir();
        write_tiff(dir.path(), "viirs/2023/average.tif", b"II*\0");

        let resolver = LocatorResolver::new(dir.path()).unwrap();
        let bytes = resolver
            .open("classpath:/viirs/2023/average.tif")
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"II*\0");
    }

    #[tokio::test]
    async fn test_missing_bundled_resource() {
        let dir = temp_test_dir();
        let resolver = LocatorResolver::new(dir.path()).unwrap();

        let err = resolver.open("classpath:/nope.tif").await.unwrap_err();
        assert!(matches!(err, LightPollutionError::ResourceNotFound(ref p) if p == "/nope.tif"));
    }

    #[tokio::test]
    async fn test_open_local_file() {
        let dir = temp_test_dir();
        let path = write_tiff(dir.path(), "mask.tif", &[9, 8, 7]);

        let resolver = LocatorResolver::new(dir.path()).unwrap();
        let bytes = resolver
            .open(&format!("file://{}", path.display()))
            .await
            .unwrap();
        assert_eq!(&bytes[..], &[9, 8, 7]);
    }

    #[tokio::test]
    async fn test_missing_local_file() {
        let dir = temp_test_dir();
        let resolver = LocatorResolver::new(dir.path()).unwrap();
        let missing = dir.path().join("missing.tif");

        let err = resolver
            .open(&format!("file://{}", missing.display()))
            .await
            .unwrap_err();
        assert!(matches!(err, LightPollutionError::ResourceNotFound(_)));
    }

    #[tokio::test]
    async fn test_malformed_url_is_io_error() {
        let dir = temp_test_dir();
        let resolver = LocatorResolver::new(dir.path()).unwrap();

        let err = resolver.open("not a url at all").await.unwrap_err();
        assert!(matches!(err, LightPollutionError::Io { .. }));
    }
}
