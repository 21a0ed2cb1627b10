//! Resolving snapshot file URLs.

use reqwest::Url;

use crate::error::{SyncError, SyncResult};

/// Absolute URL of `href` relative to the manifest's `base_url`.
///
/// The base URL's query string replaces whatever the joined URL carries, so
/// signed-URL tokens on the manifest apply to every file.
pub fn resolve_file_url(base_url: &Url, href: &str) -> SyncResult<Url> {
    let mut url = base_url
        .join(href)
        .map_err(|e| SyncError::network(base_url.as_str(), format!("bad href '{}': {}", href, e)))?;
    url.set_query(base_url.query());
    Ok(url)
}
