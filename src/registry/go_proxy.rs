//! Go module proxy client.
//!
//! Reads `/{module}/@v/{version}.info` from the module proxy. The proxy
//! protocol has no download statistics, so both counts are
//! [`DOWNLOADS_UNAVAILABLE`].

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;

use super::http::get_json;
use super::version::{with_tag_fallback, TagStyle};
use super::{base_url, Metadata, MetadataCache, MetadataClient, RegistryError, DOWNLOADS_UNAVAILABLE};

pub const DEFAULT_BASE_URL: &str = "https://proxy.golang.org";

/// Encode a module path or version per the module proxy protocol.
///
/// Uppercase letters are replaced with `!` followed by the lowercase letter.
/// See <https://go.dev/ref/mod#goproxy-protocol>.
fn encode_proxy_path(path: &str) -> String {
    let mut encoded = String::with_capacity(path.len() + 8);
    for c in path.chars() {
        if c.is_ascii_uppercase() {
            encoded.push('!');
            encoded.push(c.to_ascii_lowercase());
        } else {
            encoded.push(c);
        }
    }
    encoded
}

#[derive(serde::Deserialize)]
struct ProxyInfo {
    #[serde(rename = "Time")]
    time: DateTime<Utc>,
}

pub struct GoProxyClient {
    http: Client,
    base_url: String,
    cache: MetadataCache,
}

impl GoProxyClient {
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

    async fn fetch(&self, module: &str, version: &str) -> Result<Metadata, RegistryError> {
        let url = format!(
            "{}/{}/@v/{}.info",
            self.base_url,
            encode_proxy_path(module),
            encode_proxy_path(version)
        );
        let info: ProxyInfo = get_json(&self.http, &url, module, version).await?;
        Ok(Metadata {
            publish_date: info.time,
            total_downloads: DOWNLOADS_UNAVAILABLE,
            recent_downloads: DOWNLOADS_UNAVAILABLE,
            license: None,
            source: self.ecosystem().to_string(),
        })
    }
}

impl MetadataClient for GoProxyClient {
    fn ecosystem(&self) -> &'static str {
        "go"
    }

    async fn get_metadata(&self, name: &str, version: &str) -> Result<Metadata, RegistryError> {
        self.cache
            .get_or_fetch(name, version, || {
                with_tag_fallback(version, TagStyle::Prefixed, |tag| async move {
                    self.fetch(name, &tag).await
                })
            })
            .await
    }
}
