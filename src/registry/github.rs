//! GitHub releases client.
//!
//! Resolves `owner/repo` (optionally prefixed with `github.com/` or followed
//! by a sub-path, as in `actions/cache/restore`) to the release published
//! under the requested tag. The total download figure is the sum of the
//! release assets' download counts; releases without assets and the recent
//! figure report [`DOWNLOADS_UNAVAILABLE`].

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;

use super::http::{check_response, read_json, send};
use super::version::{with_tag_fallback, TagStyle};
use super::{base_url, Metadata, MetadataCache, MetadataClient, RegistryError, DOWNLOADS_UNAVAILABLE};

pub const DEFAULT_BASE_URL: &str = "https://api.github.com";

#[derive(serde::Deserialize)]
struct Release {
    published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    assets: Vec<Asset>,
}

#[derive(serde::Deserialize)]
struct Asset {
    download_count: i64,
}

/// Extract `(owner, repo)` from a release-host package name.
fn split_repository(name: &str) -> Option<(&str, &str)> {
    let path = name
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("github.com/");
    let mut parts = path.split('/');
    let owner = parts.next().filter(|s| !s.is_empty())?;
    let repo = parts.next().filter(|s| !s.is_empty())?;
    Some((owner, repo))
}

pub struct GithubClient {
    http: Client,
    base_url: String,
    token: Option<String>,
    cache: MetadataCache,
}

impl GithubClient {
    pub fn new(http: Client, cache_ttl: Duration) -> Self {
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            cache: MetadataCache::new(cache_ttl),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = base_url(url);
        self
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }

    async fn fetch(&self, name: &str, tag: &str) -> Result<Metadata, RegistryError> {
        let (owner, repo) =
            split_repository(name).ok_or_else(|| RegistryError::not_found(name, tag))?;
        let url = format!(
            "{}/repos/{}/{}/releases/tags/{}",
            self.base_url,
            owner,
            repo,
            urlencoding::encode(tag)
        );

        let mut request = self
            .http
            .get(&url)
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let resp = check_response(send(request, &url).await?, name, tag).await?;
        let release: Release = read_json(resp, &url).await?;

        let publish_date = release
            .published_at
            .ok_or_else(|| RegistryError::parse(&url, "release has no published_at (draft?)"))?;
        let total_downloads = if release.assets.is_empty() {
            DOWNLOADS_UNAVAILABLE
        } else {
            release.assets.iter().map(|a| a.download_count).sum()
        };

        Ok(Metadata {
            publish_date,
            total_downloads,
            recent_downloads: DOWNLOADS_UNAVAILABLE,
            license: None,
            source: self.ecosystem().to_string(),
        })
    }
}

impl MetadataClient for GithubClient {
    fn ecosystem(&self) -> &'static str {
        "github"
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
