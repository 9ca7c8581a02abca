//! One analysis run: detect, analyze, enrich, evaluate.

use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::analyzer;
use crate::enrich::{enrich, EnrichOptions};
use crate::error::AnalysisError;
use crate::models::{AnalysisResult, Dependency, Issue, Language};
use crate::policy::evaluate_policy_file;
use crate::registry::Registry;

/// Inputs of a run, resolved from the CLI and the config file.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Languages to analyze; detected from the manifests when empty.
    pub languages: Vec<Language>,
    pub excluded: Vec<Language>,
    pub policy_path: Option<PathBuf>,
    pub enrich: Option<EnrichOptions>,
}

/// Languages a run will analyze under `path`.
pub fn languages(path: &Path, options: &RunOptions) -> Vec<Language> {
    let candidates = if options.languages.is_empty() {
        crate::detector::detect_languages(path)
    } else {
        options.languages.clone()
    };
    candidates
        .into_iter()
        .filter(|l| !options.excluded.contains(l))
        .collect()
}

/// Analyze the project at `path`.
///
/// `registry` is consulted only when `options.enrich` is set. The only
/// error is [`AnalysisError::NoManifest`]; analyzer and policy problems are
/// reported as configuration issues in the result.
pub async fn run<R: Registry>(
    path: &Path,
    options: &RunOptions,
    registry: Option<&R>,
) -> Result<AnalysisResult, AnalysisError> {
    let started = Instant::now();

    let languages = languages(path, options);
    if languages.is_empty() {
        return Err(AnalysisError::NoManifest(path.to_path_buf()));
    }

    let (mut dependencies, mut issues) = analyze(path, &languages);

    match (registry, &options.enrich) {
        (Some(registry), Some(enrich_options)) => {
            enrich(&mut dependencies, registry, enrich_options).await;
        }
        _ => tracing::debug!("registry enrichment disabled"),
    }

    match &options.policy_path {
        Some(policy_path) => issues.extend(evaluate_policy_file(policy_path, &dependencies)),
        None => tracing::debug!("no policy configured"),
    }

    let result = AnalysisResult::new(dependencies, issues, started.elapsed());
    tracing::info!(
        dependencies = result.packages_scanned,
        issues = result.issues.len(),
        passed = result.passed,
        "analysis finished"
    );
    Ok(result)
}

/// Run each language's analyzer. A failing analyzer contributes a single
/// configuration issue instead of aborting the run.
fn analyze(path: &Path, languages: &[Language]) -> (Vec<Dependency>, Vec<Issue>) {
    let mut dependencies = Vec::new();
    let mut issues = Vec::new();

    for analyzer in languages.iter().map(|&l| analyzer::for_language(l)) {
        let language = analyzer.language();
        match analyzer.analyze(path) {
            Ok(output) => {
                tracing::debug!(
                    %language,
                    dependencies = output.dependencies.len(),
                    notes = output.issues.len(),
                    "analyzed"
                );
                dependencies.extend(output.dependencies);
                issues.extend(output.issues);
            }
            Err(e) => {
                tracing::warn!(%language, error = %e, "analyzer failed");
                issues.push(Issue::configuration(format!(
                    "{language} dependencies could not be analyzed: {e:#}"
                )));
            }
        }
    }

    (dependencies, issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IssueType, Severity};
    use crate::registry::{Metadata, RegistryError};
    use crate::testing::sample_metadata;

    struct FixedRegistry;

    impl Registry for FixedRegistry {
        async fn lookup(
            &self,
            language: Language,
            name: &str,
            version: &str,
        ) -> Result<Metadata, RegistryError> {
            if name.starts_with("github.com/new/") {
                let mut meta = sample_metadata(language.as_str());
                meta.publish_date = chrono::Utc::now() - chrono::Duration::days(2);
                return Ok(meta);
            }
            if name == "unreachable.example/mod" {
                return Err(RegistryError::Api {
                    status: 503,
                    message: format!("{name}@{version} unavailable"),
                });
            }
            Ok(sample_metadata(language.as_str()))
        }
    }

    const GO_MOD: &str = "module example.com/app\n\nrequire (\n\tgithub.com/new/pkg v0.1.0\n\tgithub.com/old/pkg v1.0.0\n\tunreachable.example/mod v1.0.0\n)\n";

    fn project(go_mod: &str, policy: Option<&str>) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("go.mod"), go_mod).unwrap();
        if let Some(policy) = policy {
            std::fs::write(dir.path().join("depgate-policy.yaml"), policy).unwrap();
        }
        dir
    }

    fn options(dir: &Path, with_policy: bool) -> RunOptions {
        RunOptions {
            policy_path: with_policy.then(|| dir.join("depgate-policy.yaml")),
            enrich: Some(EnrichOptions::default()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_no_manifest_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(dir.path(), &RunOptions::default(), None::<&FixedRegistry>)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::NoManifest(_)));
    }

    #[tokio::test]
    async fn test_young_module_fails_cooling() {
        let dir = project(GO_MOD, Some("cooling:\n  enabled: true\n  min_age_days: 14\n"));
        let result = run(dir.path(), &options(dir.path(), true), Some(&FixedRegistry))
            .await
            .unwrap();

        assert_eq!(result.packages_scanned, 3);
        assert_eq!(result.count(IssueType::Cooling), 1);
        assert!(!result.passed);

        // registry outage degrades to the mature fallback, not a violation
        let unreachable = result
            .dependencies
            .iter()
            .find(|d| d.name() == "unreachable.example/mod")
            .unwrap();
        assert!(unreachable.metadata.age_unknown());
    }

    #[tokio::test]
    async fn test_without_policy_everything_passes() {
        let dir = project(GO_MOD, None);
        let result = run(dir.path(), &options(dir.path(), false), Some(&FixedRegistry))
            .await
            .unwrap();
        assert!(result.issues.is_empty());
        assert!(result.passed);
    }

    #[tokio::test]
    async fn test_offline_run_has_no_cooling_data() {
        let dir = project(GO_MOD, Some("cooling:\n  enabled: true\n  min_age_days: 14\n"));
        let mut opts = options(dir.path(), true);
        opts.enrich = None;

        let result = run(dir.path(), &opts, None::<&FixedRegistry>).await.unwrap();
        assert!(result.dependencies.iter().all(|d| !d.metadata.has_cooling_data()));
        assert!(result.passed);
    }

    #[tokio::test]
    async fn test_analyzer_failure_is_a_configuration_issue() {
        let dir = tempfile::tempdir().unwrap();
        let opts = RunOptions {
            languages: vec![Language::Actions],
            ..Default::default()
        };

        let result = run(dir.path(), &opts, None::<&FixedRegistry>).await.unwrap();
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].issue_type, IssueType::Configuration);
        assert_eq!(result.issues[0].severity, Severity::Info);
        assert!(result.passed);
    }

    #[tokio::test]
    async fn test_excluded_languages_are_skipped() {
        let dir = project(GO_MOD, None);
        let opts = RunOptions {
            excluded: vec![Language::Go],
            ..Default::default()
        };
        let err = run(dir.path(), &opts, None::<&FixedRegistry>).await.unwrap_err();
        assert!(matches!(err, AnalysisError::NoManifest(_)));
    }
}
