//! HTTP fetcher writing image bytes into the cache directory.

use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::application::services::UriClassifier;
use crate::domain::errors::{CacheError, CacheResult};
use crate::domain::ports::{FetcherPort, StoredFile};
use crate::infrastructure::fs::staging_path;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Downloads remote images with `reqwest`; copies `file://` sources.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http_client: reqwest::Client,
}

impl HttpFetcher {
    /// Creates a fetcher with the given request timeout.
    ///
    /// # Errors
    /// Returns `FetchFailed` if the HTTP client cannot be created.
    pub fn new(timeout: Duration) -> CacheResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pawcache/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CacheError::fetch(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { http_client })
    }

    /// Creates a fetcher with the default timeout.
    ///
    /// # Errors
    /// Returns `FetchFailed` if the HTTP client cannot be created.
    pub fn with_defaults() -> CacheResult<Self> {
        Self::new(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    async fn download(&self, uri: &str, part: &Path) -> CacheResult<(u64, Option<u64>)> {
        let mut response = self
            .http_client
            .get(uri)
            .send()
            .await
            .map_err(|e| CacheError::fetch(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(CacheError::fetch(format!(
                "HTTP {}: {}",
                response.status().as_u16(),
                response.status().canonical_reason().unwrap_or("Unknown")
            )));
        }

        let content_length = response.content_length();

        let mut file = fs::File::create(part)
            .await
            .map_err(|e| CacheError::fetch(format!("Failed to create cache file: {e}")))?;

        let mut written = 0u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| CacheError::fetch(format!("Failed to read body: {e}")))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| CacheError::fetch(format!("Failed to write cache file: {e}")))?;
            written += chunk.len() as u64;
        }

        file.flush()
            .await
            .map_err(|e| CacheError::fetch(format!("Failed to flush cache file: {e}")))?;

        Ok((written, content_length))
    }

    async fn copy_local(source: &Path, dest: &Path) -> CacheResult<StoredFile> {
        let size_bytes = fs::copy(source, dest).await.map_err(|e| {
            CacheError::fetch(format!("Failed to copy {}: {e}", source.display()))
        })?;
        Ok(StoredFile {
            path: dest.to_path_buf(),
            size_bytes,
        })
    }
}

#[async_trait]
impl FetcherPort for HttpFetcher {
    async fn fetch(&self, uri: &str, dest: &Path) -> CacheResult<StoredFile> {
        if let Some(source) = UriClassifier::local_path(uri) {
            return Self::copy_local(&source, dest).await;
        }
        if !UriClassifier::is_remote(uri) {
            return Err(CacheError::fetch(format!("Unsupported URI: {uri}")));
        }

        debug!(uri = %uri, dest = %dest.display(), "Downloading image");

        let part = staging_path(dest, "part");
        let (written, content_length) = match self.download(uri, &part).await {
            Ok(sizes) => sizes,
            Err(e) => {
                if let Err(cleanup) = fs::remove_file(&part).await
                    && cleanup.kind() != ErrorKind::NotFound
                {
                    warn!(path = %part.display(), error = %cleanup, "Failed to remove partial download");
                }
                return Err(e);
            }
        };

        fs::rename(&part, dest)
            .await
            .map_err(|e| CacheError::fetch(format!("Failed to move download into place: {e}")))?;

        let size_bytes = match content_length {
            Some(len) => len,
            None => fs::metadata(dest).await.map_or(written, |m| m.len()),
        };

        debug!(uri = %uri, size = size_bytes, "Download complete");

        Ok(StoredFile {
            path: dest.to_path_buf(),
            size_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    /// Serves one canned HTTP response and returns the base URL.
    async fn serve_once(status_line: &'static str, body: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let head = format!(
                "{status_line}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(body).await.unwrap();
            socket.flush().await.unwrap();
        });

        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_download_reports_size() {
        let base = serve_once("HTTP/1.1 200 OK", b"fake jpeg bytes").await;
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("cat.jpg");

        let fetcher = HttpFetcher::with_defaults().unwrap();
        let stored = fetcher
            .fetch(&format!("{base}/bucket/cat.jpg"), &dest)
            .await
            .unwrap();

        assert_eq!(stored.path, dest);
        assert_eq!(stored.size_bytes, 15);
        assert_eq!(std::fs::read(&dest).unwrap(), b"fake jpeg bytes");
    }

    #[tokio::test]
    async fn test_http_error_is_fetch_failed() {
        let base = serve_once("HTTP/1.1 404 Not Found", b"").await;
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("missing.jpg");

        let fetcher = HttpFetcher::with_defaults().unwrap();
        let result = fetcher.fetch(&format!("{base}/missing.jpg"), &dest).await;

        assert!(matches!(result, Err(CacheError::FetchFailed { .. })));
        assert!(!dest.exists());
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_copies_file_uri() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("source.png");
        std::fs::write(&source, b"local png").unwrap();
        let dest = temp.path().join("copy.png");

        let fetcher = HttpFetcher::with_defaults().unwrap();
        let stored = fetcher
            .fetch(&format!("file://{}", source.display()), &dest)
            .await
            .unwrap();

        assert_eq!(stored.size_bytes, 9);
        assert_eq!(std::fs::read(&dest).unwrap(), b"local png");
    }

    #[tokio::test]
    async fn test_rejects_unknown_scheme() {
        let temp = TempDir::new().unwrap();
        let fetcher = HttpFetcher::with_defaults().unwrap();
        let result = fetcher
            .fetch("ftp://example.com/a.jpg", &temp.path().join("a.jpg"))
            .await;
        assert!(matches!(result, Err(CacheError::FetchFailed { .. })));
    }
}
