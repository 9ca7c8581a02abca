//! npm registry client.
//!
//! The publish time comes from the packument's `time` map. Download counts
//! come from the separate downloads API (`last-week` as the recent figure,
//! `last-year` as the total); a failed download lookup degrades to
//! [`DOWNLOADS_UNAVAILABLE`] instead of failing the metadata lookup.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::Value;

use super::http::{get_json, read_json, send};
use super::version::{with_tag_fallback, TagStyle};
use super::{base_url, Metadata, MetadataCache, MetadataClient, RegistryError, DOWNLOADS_UNAVAILABLE};

pub const DEFAULT_REGISTRY_URL: &str = "https://registry.npmjs.org";
pub const DEFAULT_DOWNLOADS_URL: &str = "https://api.npmjs.org";

#[derive(serde::Deserialize)]
struct Packument {
    #[serde(default)]
    time: HashMap<String, Value>,
    #[serde(default)]
    versions: HashMap<String, Value>,
}

#[derive(serde::Deserialize)]
struct DownloadPoint {
    downloads: i64,
}

/// Scoped packages need URL encoding: `@scope/pkg` → `%40scope%2Fpkg`.
fn encode_package_name(name: &str) -> String {
    name.replace('@', "%40").replace('/', "%2F")
}

/// `license` is either a string or a legacy `{ "type": ... }` object.
fn license_field(version: &Value) -> Option<String> {
    match version.get("license")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Object(obj) => obj.get("type").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

pub struct NpmClient {
    http: Client,
    registry_url: String,
    downloads_url: String,
    cache: MetadataCache,
}

impl NpmClient {
    pub fn new(http: Client, cache_ttl: Duration) -> Self {
        Self {
            http,
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            downloads_url: DEFAULT_DOWNLOADS_URL.to_string(),
            cache: MetadataCache::new(cache_ttl),
        }
    }

    pub fn with_registry_url(mut self, url: &str) -> Self {
        self.registry_url = base_url(url);
        self
    }

    pub fn with_downloads_url(mut self, url: &str) -> Self {
        self.downloads_url = base_url(url);
        self
    }

    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }

    async fn fetch(&self, name: &str, version: &str) -> Result<Metadata, RegistryError> {
        let url = format!("{}/{}", self.registry_url, encode_package_name(name));
        let packument: Packument = get_json(&self.http, &url, name, version).await?;

        let published = packument
            .time
            .get(version)
            .and_then(Value::as_str)
            .ok_or_else(|| RegistryError::not_found(name, version))?;
        let publish_date = DateTime::parse_from_rfc3339(published)
            .map_err(|e| RegistryError::parse(&url, format!("time[{version}]: {e}")))?
            .with_timezone(&Utc);
        let license = packument.versions.get(version).and_then(license_field);

        let (recent, total) = tokio::join!(
            self.downloads(name, "last-week"),
            self.downloads(name, "last-year"),
        );

        Ok(Metadata {
            publish_date,
            total_downloads: total,
            recent_downloads: recent,
            license,
            source: self.ecosystem().to_string(),
        })
    }

    async fn downloads(&self, name: &str, period: &str) -> i64 {
        let url = format!("{}/downloads/point/{period}/{name}", self.downloads_url);
        let result = async {
            let resp = send(self.http.get(&url), &url).await?;
            if !resp.status().is_success() {
                return Err(RegistryError::Api {
                    status: resp.status().as_u16(),
                    message: String::new(),
                });
            }
            read_json::<DownloadPoint>(resp, &url).await
        }
        .await;

        match result {
            Ok(point) => point.downloads,
            Err(e) => {
                tracing::debug!(package = name, period, %e, "npm download count unavailable");
                DOWNLOADS_UNAVAILABLE
            }
        }
    }
}

impl MetadataClient for NpmClient {
    fn ecosystem(&self) -> &'static str {
        "npm"
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
