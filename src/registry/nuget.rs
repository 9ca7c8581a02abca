//! NuGet v3 registration client.
//!
//! Reads the registration leaf for a package version. The registration
//! resource carries no download counts, so both are [`DOWNLOADS_UNAVAILABLE`].

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;

use super::http::get_json;
use super::version::{with_tag_fallback, TagStyle};
use super::{base_url, Metadata, MetadataCache, MetadataClient, RegistryError, DOWNLOADS_UNAVAILABLE};

pub const DEFAULT_BASE_URL: &str = "https://api.nuget.org";

#[derive(serde::Deserialize)]
struct RegistrationLeaf {
    published: DateTime<Utc>,
}

pub struct NugetClient {
    http: Client,
    base_url: String,
    cache: MetadataCache,
}

impl NugetClient {
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

    async fn fetch(&self, id: &str, version: &str) -> Result<Metadata, RegistryError> {
        // registration ids and versions are lowercase
        let url = format!(
            "{}/v3/registration5-semver1/{}/{}.json",
            self.base_url,
            id.to_lowercase(),
            version.to_lowercase()
        );
        let leaf: RegistrationLeaf = get_json(&self.http, &url, id, version).await?;
        Ok(Metadata {
            publish_date: leaf.published,
            total_downloads: DOWNLOADS_UNAVAILABLE,
            recent_downloads: DOWNLOADS_UNAVAILABLE,
            license: None,
            source: self.ecosystem().to_string(),
        })
    }
}

impl MetadataClient for NugetClient {
    fn ecosystem(&self) -> &'static str {
        "nuget"
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{http_client, MockResponse, MockServer};

    const LEAF: &str = r#"{
        "@id": "https://api.nuget.org/v3/registration5-semver1/newtonsoft.json/13.0.3.json",
        "listed": true,
        "published": "2023-03-08T07:42:54.647+00:00"
    }"#;

    #[tokio::test]
    async fn test_lookup_lowercases_id_and_version() {
        let server = MockServer::start().await;
        server.route(
            "/v3/registration5-semver1/newtonsoft.json/13.0.3-beta1.json",
            MockResponse::json(LEAF),
        );
        let client =
            NugetClient::new(http_client(), Duration::from_secs(60)).with_base_url(&server.url());

        let meta = client
            .get_metadata("Newtonsoft.Json", "13.0.3-Beta1")
            .await
            .unwrap();
        assert_eq!(meta.source, "nuget");
        assert_eq!(meta.total_downloads, DOWNLOADS_UNAVAILABLE);
        assert_eq!(meta.publish_date.date_naive().to_string(), "2023-03-08");
    }
}
