//! PyPI JSON API client.
//!
//! The publish date is the earliest upload time among the release's files.
//! The JSON API stopped publishing download statistics, so both counts are
//! [`DOWNLOADS_UNAVAILABLE`].

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;

use super::http::get_json;
use super::version::{with_tag_fallback, TagStyle};
use super::{base_url, Metadata, MetadataCache, MetadataClient, RegistryError, DOWNLOADS_UNAVAILABLE};

pub const DEFAULT_BASE_URL: &str = "https://pypi.org";

#[derive(serde::Deserialize)]
struct ReleaseResponse {
    info: ReleaseInfo,
    #[serde(default)]
    urls: Vec<ReleaseFile>,
}

#[derive(serde::Deserialize)]
struct ReleaseInfo {
    #[serde(default)]
    license: Option<String>,
}

#[derive(serde::Deserialize)]
struct ReleaseFile {
    upload_time_iso_8601: DateTime<Utc>,
}

pub struct PypiClient {
    http: Client,
    base_url: String,
    cache: MetadataCache,
}

impl PypiClient {
    pub fn new(http: Client, cache_ttl: Duration) -> Self {
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            cache: MetadataCache::new(cache_ttl),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = base_url(url);
        self
    }

    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }

    async fn fetch(&self, name: &str, version: &str) -> Result<Metadata, RegistryError> {
        let url = format!("{}/pypi/{}/{}/json", self.base_url, name, version);
        let release: ReleaseResponse = get_json(&self.http, &url, name, version).await?;

        let publish_date = release
            .urls
            .iter()
            .map(|f| f.upload_time_iso_8601)
            .min()
            .ok_or_else(|| RegistryError::parse(&url, "release has no uploaded files"))?;

        Ok(Metadata {
            publish_date,
            total_downloads: DOWNLOADS_UNAVAILABLE,
            recent_downloads: DOWNLOADS_UNAVAILABLE,
            license: release.info.license.filter(|l| !l.trim().is_empty()),
            source: self.ecosystem().to_string(),
        })
    }
}

impl MetadataClient for PypiClient {
    fn ecosystem(&self) -> &'static str {
        "pypi"
    }

    async fn get_metadata(&self, name: &str, version: &str) -> Result<Metadata, RegistryError> {
        self.cache
            .get_or_fetch(name, version, || {
                with_tag_fallback(version, TagStyle::Bare, |tag| async move {
                    self.fetch(name, &tag).await
                })
            })
            .await
    }
}
