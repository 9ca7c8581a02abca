//! Registry metadata clients used to enrich dependencies with cooling data.
//!
//! Each ecosystem has one client implementing [`MetadataClient`]. Every
//! client owns a [`MetadataCache`], maps its registry's response into
//! [`Metadata`], and reports failures as [`RegistryError`]. Download figures
//! an ecosystem does not publish are reported as [`DOWNLOADS_UNAVAILABLE`].
//!
//! [`RegistrySet`] routes a lookup to the client for a dependency's
//! [`Language`].

pub mod cache;
pub mod crates_io;
pub mod github;
pub mod go_proxy;
pub mod npm;
pub mod nuget;
pub mod pypi;
pub mod version;

mod error;
mod http;

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::RegistryConfig;
use crate::models::Language;

pub use cache::MetadataCache;
pub use error::RegistryError;

/// Sentinel for download counts the ecosystem does not expose.
pub const DOWNLOADS_UNAVAILABLE: i64 = -1;

const USER_AGENT: &str = concat!(
    "depgate/",
    env!("CARGO_PKG_VERSION"),
    " (dependency governance)"
);

/// Age and popularity facts for one published version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub publish_date: DateTime<Utc>,
    /// All-time downloads, or [`DOWNLOADS_UNAVAILABLE`].
    pub total_downloads: i64,
    /// Recent-window downloads, or [`DOWNLOADS_UNAVAILABLE`].
    pub recent_downloads: i64,
    /// License string published alongside the version, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    /// Ecosystem that answered the lookup.
    pub source: String,
}

/// Per-ecosystem metadata lookup.
pub trait MetadataClient: Send + Sync {
    /// Ecosystem name recorded as [`Metadata::source`].
    fn ecosystem(&self) -> &'static str;

    /// Fetch metadata for `name` at `version`, cache-first.
    fn get_metadata(
        &self,
        name: &str,
        version: &str,
    ) -> impl Future<Output = Result<Metadata, RegistryError>> + Send;
}

/// Lookup routed by language; implemented by [`RegistrySet`] and by test doubles.
pub trait Registry: Send + Sync {
    fn lookup(
        &self,
        language: Language,
        name: &str,
        version: &str,
    ) -> impl Future<Output = Result<Metadata, RegistryError>> + Send;
}

/// One client per supported ecosystem, sharing a single HTTP connection pool.
pub struct RegistrySet {
    pub go: go_proxy::GoProxyClient,
    pub npm: npm::NpmClient,
    pub pypi: pypi::PypiClient,
    pub crates_io: crates_io::CratesIoClient,
    pub nuget: nuget::NugetClient,
    pub github: github::GithubClient,
}

impl RegistrySet {
    pub fn new(config: &RegistryConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let ttl = Duration::from_secs(config.cache_ttl_secs);
        let endpoints = &config.endpoints;

        let mut go = go_proxy::GoProxyClient::new(http.clone(), ttl);
        if let Some(url) = &endpoints.go_proxy {
            go = go.with_base_url(url);
        }

        let mut npm = npm::NpmClient::new(http.clone(), ttl);
        if let Some(url) = &endpoints.npm {
            npm = npm.with_registry_url(url);
        }
        if let Some(url) = &endpoints.npm_downloads {
            npm = npm.with_downloads_url(url);
        }

        let mut pypi = pypi::PypiClient::new(http.clone(), ttl);
        if let Some(url) = &endpoints.pypi {
            pypi = pypi.with_base_url(url);
        }

        let mut crates_io = crates_io::CratesIoClient::new(http.clone(), ttl);
        if let Some(url) = &endpoints.crates_io {
            crates_io = crates_io.with_base_url(url);
        }

        let mut nuget = nuget::NugetClient::new(http.clone(), ttl);
        if let Some(url) = &endpoints.nuget {
            nuget = nuget.with_base_url(url);
        }

        let mut github = github::GithubClient::new(http, ttl);
        if let Some(url) = &endpoints.github {
            github = github.with_base_url(url);
        }
        if let Ok(token) = std::env::var("GITHUB_TOKEN") {
            if !token.trim().is_empty() {
                github = github.with_token(token.trim());
            }
        }

        Ok(Self {
            go,
            npm,
            pypi,
            crates_io,
            nuget,
            github,
        })
    }
}

impl Registry for RegistrySet {
    async fn lookup(
        &self,
        language: Language,
        name: &str,
        version: &str,
    ) -> Result<Metadata, RegistryError> {
        match language {
            Language::Go => self.go.get_metadata(name, version).await,
            Language::Node => self.npm.get_metadata(name, version).await,
            Language::Python => self.pypi.get_metadata(name, version).await,
            Language::Rust => self.crates_io.get_metadata(name, version).await,
            Language::DotNet => self.nuget.get_metadata(name, version).await,
            Language::Actions => self.github.get_metadata(name, version).await,
        }
    }
}

/// Trim a configured base URL so paths can be appended with `/`.
fn base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_set_builds_from_default_config() {
        let set = RegistrySet::new(&RegistryConfig::default()).unwrap();
        assert_eq!(set.go.ecosystem(), "go");
        assert_eq!(set.npm.ecosystem(), "npm");
        assert_eq!(set.pypi.ecosystem(), "pypi");
        assert_eq!(set.crates_io.ecosystem(), "crates.io");
        assert_eq!(set.nuget.ecosystem(), "nuget");
        assert_eq!(set.github.ecosystem(), "github");
    }

    #[test]
    fn test_metadata_serialization_is_stable() {
        let meta = crate::testing::sample_metadata("npm");
        let a = serde_json::to_vec(&meta).unwrap();
        let b = serde_json::to_vec(&meta.clone()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_base_url_trims_trailing_slash() {
        assert_eq!(base_url("https://proxy.golang.org/"), "https://proxy.golang.org");
    }

    #[tokio::test]
    #[ignore = "hits the public crates.io API"]
    async fn test_live_crates_io_lookup() {
        let set = RegistrySet::new(&RegistryConfig::default()).unwrap();
        let meta = set.lookup(Language::Rust, "serde", "1.0.0").await.unwrap();
        assert_eq!(meta.source, "crates.io");
        assert!(meta.publish_date.timestamp() > 0);
    }
}
