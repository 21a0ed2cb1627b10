//! Fetching manifests from the remote service or local snapshots.

use std::path::Path;
use std::sync::Arc;

use reqwest::Url;
use tracing::debug;

use super::{parse_manifest, ManifestEntry};
use crate::error::{SyncError, SyncResult};
use crate::http::HttpClient;
use crate::platform::FileManager;

/// A remote manifest with the URL it was finally served from.
#[derive(Debug, Clone)]
pub struct FetchedManifest {
    /// Final response URL. Relative hrefs resolve against it and inherit its
    /// query string (signed-URL tokens).
    pub base_url: Url,
    /// Manifest entries.
    pub entries: Vec<ManifestEntry>,
}

/// Retrieves manifests.
#[derive(Clone)]
pub struct ManifestFetcher {
    http: Arc<dyn HttpClient>,
    files: Arc<dyn FileManager>,
}

impl ManifestFetcher {
    /// Create a fetcher using the given transports.
    pub fn new(http: Arc<dyn HttpClient>, files: Arc<dyn FileManager>) -> Self {
        Self { http, files }
    }

    /// Fetch the manifest for `version_id` from `url`.
    pub async fn fetch(&self, url: &str, version_id: &str) -> SyncResult<FetchedManifest> {
        let response = self.http.get(url).await?;
        if !response.is_success() {
            return Err(SyncError::HttpStatus {
                status: response.status,
                message: format!("manifest for {} unavailable: {}", version_id, response.text()),
            });
        }

        let base_url = Url::parse(&response.url).map_err(|e| SyncError::network(url, e))?;
        // An unreadable remote body counts as a failed transfer.
        let entries = parse_manifest(url, &response.body).map_err(|e| SyncError::network(url, e))?;

        debug!(
            version_id,
            base_url = %base_url,
            entries = entries.len(),
            "Fetched remote manifest"
        );

        Ok(FetchedManifest { base_url, entries })
    }

    /// Read a manifest stored on disk.
    pub async fn load_local(&self, path: &Path) -> SyncResult<Vec<ManifestEntry>> {
        let contents = self.files.read_to_string(path).await?;
        parse_manifest(&path.display().to_string(), contents.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::tests::MockHttpClient;
    use crate::platform::LocalFileManager;

    fn fetcher(mock: MockHttpClient) -> ManifestFetcher {
        ManifestFetcher::new(Arc::new(mock), Arc::new(LocalFileManager::new()))
    }

    #[tokio::test]
    async fn test_fetch_uses_final_url_as_base() {
        let mock = MockHttpClient::new();
        mock.route(
            "https://api.example.com/snapshots/v1/manifest",
            "https://cdn.example.com/v1/pro-manifest.json?token=abc",
            200,
            r#"[{"href":"index.html","size":10}]"#,
        );

        let manifest = fetcher(mock)
            .fetch("https://api.example.com/snapshots/v1/manifest", "v1")
            .await
            .unwrap();

        assert_eq!(manifest.base_url.host_str(), Some("cdn.example.com"));
        assert_eq!(manifest.base_url.query(), Some("token=abc"));
        assert_eq!(manifest.entries, vec![ManifestEntry::new("index.html", 10)]);
    }

    #[tokio::test]
    async fn test_fetch_transport_failure() {
        let result = fetcher(MockHttpClient::new())
            .fetch("https://api.example.com/none", "v1")
            .await;
        assert!(matches!(result, Err(SyncError::Network { .. })));
    }

    #[tokio::test]
    async fn test_fetch_non_json_body() {
        let mock = MockHttpClient::new();
        mock.route("https://x/m", "https://x/m", 200, "not json");
        let result = fetcher(mock).fetch("https://x/m", "v1").await;
        match result {
            Err(SyncError::Network { url, .. }) => assert_eq!(url, "https://x/m"),
            other => panic!("Expected Network, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_load_local_non_json_is_parse_error() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("pro-manifest.json");
        std::fs::write(&path, "<html>").unwrap();

        let result = fetcher(MockHttpClient::new()).load_local(&path).await;
        assert!(matches!(result, Err(SyncError::ManifestParse { .. })));
    }

    #[tokio::test]
    async fn test_fetch_error_status() {
        let mock = MockHttpClient::new();
        mock.route("https://x/m", "https://x/m", 403, "expired");
        let result = fetcher(mock).fetch("https://x/m", "v1").await;
        assert!(matches!(result, Err(SyncError::HttpStatus { status: 403, .. })));
    }

    #[tokio::test]
    async fn test_load_local() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("pro-manifest.json");
        std::fs::write(&path, r#"[{"href":"a.js","size":5}]"#).unwrap();

        let entries = fetcher(MockHttpClient::new()).load_local(&path).await.unwrap();
        assert_eq!(entries, vec![ManifestEntry::new("a.js", 5)]);
    }
}
