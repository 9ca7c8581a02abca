//! Attach registry cooling metadata to analyzed dependencies.
//!
//! Lookups run concurrently in batches against a shared [`Registry`]. A
//! failed or timed-out lookup never fails the run: the dependency records
//! the conservative "assume mature" fallback instead.

use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::RegistryConfig;
use crate::models::{Dependency, Language, License};
use crate::registry::{Metadata, Registry, RegistryError};

#[derive(Debug, Clone)]
pub struct EnrichOptions {
    /// Deadline for one lookup, including the tag fallback retry.
    pub timeout: Duration,
    pub batch_size: usize,
    pub show_progress: bool,
}

impl EnrichOptions {
    pub fn from_config(config: &RegistryConfig, show_progress: bool) -> Self {
        EnrichOptions {
            timeout: Duration::from_secs(config.timeout_secs),
            batch_size: config.batch_size.max(1),
            show_progress,
        }
    }
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self::from_config(&RegistryConfig::default(), false)
    }
}

/// Counts reported after an enrichment pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichSummary {
    pub looked_up: usize,
    pub failed: usize,
    pub skipped_local: usize,
}

/// Enrich every non-local dependency in place.
pub async fn enrich<R: Registry>(
    deps: &mut [Dependency],
    registry: &R,
    options: &EnrichOptions,
) -> EnrichSummary {
    let targets: Vec<usize> = deps
        .iter()
        .enumerate()
        .filter(|(_, d)| !d.metadata.is_local())
        .map(|(i, _)| i)
        .collect();

    let mut summary = EnrichSummary {
        skipped_local: deps.len() - targets.len(),
        ..Default::default()
    };

    let pb = options.show_progress.then(|| progress_bar(targets.len() as u64));

    for batch in targets.chunks(options.batch_size.max(1)) {
        let lookups: Vec<_> = batch
            .iter()
            .map(|&i| {
                let dep = &deps[i];
                lookup(
                    registry,
                    dep.language(),
                    dep.name().to_string(),
                    dep.version().to_string(),
                    options.timeout,
                )
            })
            .collect();

        let results = join_all(lookups).await;
        let now = Utc::now();

        for (&i, result) in batch.iter().zip(results) {
            let dep = &mut deps[i];
            summary.looked_up += 1;
            match result {
                Ok(metadata) => {
                    dep.metadata.record_lookup(&metadata, now);
                    fill_license(dep, &metadata);
                }
                Err(e) => {
                    summary.failed += 1;
                    tracing::warn!(
                        package = %dep.key(),
                        language = dep.language().as_str(),
                        retriable = e.is_retriable(),
                        error = %e,
                        "registry lookup failed, assuming mature"
                    );
                    dep.metadata.record_registry_failure(e.to_string());
                }
            }
            if let Some(pb) = &pb {
                pb.inc(1);
            }
        }
    }

    if let Some(pb) = pb {
        pb.finish_with_message("Done");
    }

    tracing::debug!(
        looked_up = summary.looked_up,
        failed = summary.failed,
        skipped_local = summary.skipped_local,
        "enrichment finished"
    );
    summary
}

async fn lookup<R: Registry>(
    registry: &R,
    language: Language,
    name: String,
    version: String,
    timeout: Duration,
) -> Result<Metadata, RegistryError> {
    match tokio::time::timeout(timeout, registry.lookup(language, &name, &version)).await {
        Ok(result) => result,
        Err(_) => Err(RegistryError::Timeout {
            key: format!("{name}@{version}"),
            after_secs: timeout.as_secs(),
        }),
    }
}

fn fill_license(dep: &mut Dependency, metadata: &Metadata) {
    if dep.license.is_some() {
        return;
    }
    if let Some(raw) = metadata.license.as_deref().filter(|l| !l.trim().is_empty()) {
        dep.license = Some(License::from_raw(raw));
    }
}

fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Endpoints, RegistryConfig};
    use crate::models::FALLBACK_AGE_DAYS;
    use crate::registry::{MetadataClient, RegistrySet};
    use crate::testing::{sample_metadata, MockResponse, MockServer};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers by package name: `missing` is not found, `slow` stalls,
    /// anything else returns sample metadata.
    #[derive(Default)]
    struct FakeRegistry {
        calls: AtomicUsize,
    }

    impl Registry for FakeRegistry {
        async fn lookup(
            &self,
            language: Language,
            name: &str,
            version: &str,
        ) -> Result<Metadata, RegistryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match name {
                "missing" => Err(RegistryError::NotFound {
                    name: name.to_string(),
                    version: version.to_string(),
                }),
                "slow" => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(sample_metadata(language.as_str()))
                }
                _ => Ok(sample_metadata(language.as_str())),
            }
        }
    }

    fn options(timeout: Duration) -> EnrichOptions {
        EnrichOptions {
            timeout,
            batch_size: 2,
            show_progress: false,
        }
    }

    #[tokio::test]
    async fn test_success_records_age_and_fills_license() {
        let registry = FakeRegistry::default();
        let mut deps = vec![Dependency::new("left-pad", "1.3.0", Language::Node)];

        let summary = enrich(&mut deps, &registry, &options(Duration::from_secs(5))).await;
        assert_eq!(summary.looked_up, 1);
        assert_eq!(summary.failed, 0);

        let meta = &deps[0].metadata;
        assert!(meta.age_days().unwrap() > 0);
        assert!(!meta.age_unknown());
        assert_eq!(meta.total_downloads(), Some(10_000));
        assert_eq!(meta.registry_source(), Some("node"));
        assert_eq!(deps[0].license_type(), Some("MIT"));
    }

    #[tokio::test]
    async fn test_manifest_license_is_kept() {
        let registry = FakeRegistry::default();
        let mut deps = vec![Dependency::new("x", "1.0.0", Language::Node).with_license("ISC")];
        enrich(&mut deps, &registry, &options(Duration::from_secs(5))).await;
        assert_eq!(deps[0].license_type(), Some("ISC"));
    }

    #[tokio::test]
    async fn test_failure_sets_fallback_triple() {
        let registry = FakeRegistry::default();
        let mut deps = vec![
            Dependency::new("missing", "1.0.0", Language::Python),
            Dependency::new("present", "1.0.0", Language::Python),
        ];

        let summary = enrich(&mut deps, &registry, &options(Duration::from_secs(5))).await;
        assert_eq!(summary.failed, 1);

        let failed = &deps[0].metadata;
        assert!(failed.age_unknown());
        assert_eq!(failed.age_days(), Some(FALLBACK_AGE_DAYS));
        assert!(!failed.registry_error().unwrap().is_empty());

        let ok = &deps[1].metadata;
        assert!(!ok.age_unknown());
        assert!(ok.registry_error().is_none());
    }

    #[tokio::test]
    async fn test_local_dependencies_are_not_looked_up() {
        let registry = FakeRegistry::default();
        let mut local = Dependency::new("./tools", "*", Language::Node);
        local.metadata.mark_local();
        let mut deps = vec![local, Dependency::new("a", "1.0.0", Language::Node)];

        let summary = enrich(&mut deps, &registry, &options(Duration::from_secs(5))).await;
        assert_eq!(registry.calls.load(Ordering::SeqCst), 1);
        assert_eq!(summary.skipped_local, 1);
        assert!(!deps[0].metadata.has_cooling_data());
    }

    #[tokio::test]
    async fn test_batches_cover_every_dependency() {
        let registry = FakeRegistry::default();
        let mut deps: Vec<Dependency> = (0..5)
            .map(|i| Dependency::new(format!("pkg-{i}"), "1.0.0", Language::Rust))
            .collect();

        let summary = enrich(&mut deps, &registry, &options(Duration::from_secs(5))).await;
        assert_eq!(summary.looked_up, 5);
        assert!(deps.iter().all(|d| d.metadata.has_cooling_data()));
    }

    #[tokio::test]
    async fn test_deadline_becomes_timeout_failure() {
        let registry = FakeRegistry::default();
        let mut deps = vec![Dependency::new("slow", "1.0.0", Language::Go)];

        enrich(&mut deps, &registry, &options(Duration::from_millis(50))).await;
        let meta = &deps[0].metadata;
        assert!(meta.age_unknown());
        assert!(meta.registry_error().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_timed_out_fetch_does_not_populate_cache() {
        let server = MockServer::start().await;
        server.route(
            "/example.com/slow/@v/v1.0.0.info",
            MockResponse::json(r#"{"Version":"v1.0.0","Time":"2024-01-01T00:00:00Z"}"#)
                .delayed(Duration::from_secs(2)),
        );
        let config = RegistryConfig {
            endpoints: Endpoints {
                go_proxy: Some(server.url()),
                ..Default::default()
            },
            ..Default::default()
        };
        let registry = RegistrySet::new(&config).unwrap();
        let mut deps = vec![Dependency::new("example.com/slow", "v1.0.0", Language::Go)];

        enrich(&mut deps, &registry, &options(Duration::from_millis(100))).await;
        assert!(deps[0].metadata.age_unknown());
        assert!(registry.go.cache().is_empty());
        assert_eq!(registry.go.ecosystem(), "go");
    }
}
