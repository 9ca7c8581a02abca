//! crates.io client.
//!
//! One request to `/api/v1/crates/{name}` yields the crate's all-time and
//! recent (90-day) download counts plus the per-version publish time.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;

use super::http::get_json;
use super::version::{with_tag_fallback, TagStyle};
use super::{base_url, Metadata, MetadataCache, MetadataClient, RegistryError, DOWNLOADS_UNAVAILABLE};

pub const DEFAULT_BASE_URL: &str = "https://crates.io";

#[derive(serde::Deserialize)]
struct CrateResponse {
    #[serde(rename = "crate")]
    krate: CrateInfo,
    #[serde(default)]
    versions: Vec<CrateVersion>,
}

#[derive(serde::Deserialize)]
struct CrateInfo {
    downloads: i64,
    #[serde(default)]
    recent_downloads: Option<i64>,
}

#[derive(serde::Deserialize)]
struct CrateVersion {
    num: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    license: Option<String>,
}

pub struct CratesIoClient {
    http: Client,
    base_url: String,
    cache: MetadataCache,
}

impl CratesIoClient {
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
        let url = format!("{}/api/v1/crates/{}", self.base_url, name);
        let data: CrateResponse = get_json(&self.http, &url, name, version).await?;

        let found = data
            .versions
            .into_iter()
            .find(|v| v.num == version)
            .ok_or_else(|| RegistryError::not_found(name, version))?;

        Ok(Metadata {
            publish_date: found.created_at,
            total_downloads: data.krate.downloads,
            recent_downloads: data.krate.recent_downloads.unwrap_or(DOWNLOADS_UNAVAILABLE),
            license: found.license,
            source: self.ecosystem().to_string(),
        })
    }
}

impl MetadataClient for CratesIoClient {
    fn ecosystem(&self) -> &'static str {
        "crates.io"
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
