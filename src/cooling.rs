//! Cooling policy: reject or flag dependencies that are too new or too
//! little used.
//!
//! [`check`] is a pure, single-pass evaluation of one dependency. It does not
//! read `alert_only` or `grace_period_days`; the policy engine applies those
//! when turning violations into issues.

use chrono::{NaiveDate, Utc};
use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};

use crate::models::{Dependency, Severity};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoolingConfig {
    pub enabled: bool,
    pub min_age_days: i64,
    pub min_downloads: i64,
    pub min_downloads_recent: i64,
    /// Report violations without failing the run.
    pub alert_only: bool,
    /// Age violations within this many days of the minimum are softened.
    pub grace_period_days: i64,
    pub exceptions: Vec<CoolingException>,
}

/// A pattern-matched, optionally time-limited carve-out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoolingException {
    pub pattern: String,
    #[serde(default)]
    pub reason: String,
    /// Last day (inclusive, `YYYY-MM-DD`) the exception applies. Absent
    /// means it never expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
}

impl CoolingException {
    /// An exception is expired once `today` is past its `until` date.
    /// An unparseable date counts as expired.
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        let Some(until) = self.until.as_deref() else {
            return false;
        };
        match NaiveDate::parse_from_str(until.trim(), "%Y-%m-%d") {
            Ok(date) => today > date,
            Err(e) => {
                tracing::warn!(pattern = %self.pattern, until, %e, "ignoring exception with invalid until date");
                true
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    AgeViolation,
    DownloadViolation,
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViolationKind::AgeViolation => write!(f, "age_violation"),
            ViolationKind::DownloadViolation => write!(f, "download_violation"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub severity: Severity,
    pub message: String,
    pub actual: i64,
    pub threshold: i64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckResult {
    pub passed: bool,
    pub is_exception: bool,
    /// The exception that exempted the dependency, if any.
    pub exception: Option<CoolingException>,
    pub violations: Vec<Violation>,
}

impl CheckResult {
    fn pass() -> Self {
        CheckResult {
            passed: true,
            ..Default::default()
        }
    }
}

/// Whether `name` matches an exception `pattern`.
///
/// Glob semantics (`*`, `?`, `*` stops at `/`), plus: a pattern ending in
/// `/*` matches any name under that prefix at any depth, so `@org/*` covers
/// `@org/sub/pkg`.
pub fn matches_pattern(name: &str, pattern: &str) -> bool {
    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };
    if Pattern::new(pattern).is_ok_and(|p| p.matches_with(name, options)) {
        return true;
    }
    match pattern.strip_suffix("/*") {
        Some(prefix) => name.starts_with(&format!("{prefix}/")),
        None => false,
    }
}

/// First exception that matches `name` and has not expired.
///
/// An expired match does not stop the scan; a later exception may still
/// apply.
pub fn find_exception<'a>(
    name: &str,
    exceptions: &'a [CoolingException],
    today: NaiveDate,
) -> Option<&'a CoolingException> {
    exceptions.iter().find(|exception| {
        if !matches_pattern(name, &exception.pattern) {
            return false;
        }
        if exception.is_expired(today) {
            tracing::debug!(package = name, pattern = %exception.pattern, "cooling exception expired");
            return false;
        }
        true
    })
}

/// Check `dep` against `config` as of today (UTC).
pub fn check(dep: &Dependency, config: &CoolingConfig) -> CheckResult {
    check_at(dep, config, Utc::now().date_naive())
}

pub fn check_at(dep: &Dependency, config: &CoolingConfig, today: NaiveDate) -> CheckResult {
    if !config.enabled {
        return CheckResult::pass();
    }

    if let Some(exception) = find_exception(dep.name(), &config.exceptions, today) {
        return CheckResult {
            passed: true,
            is_exception: true,
            exception: Some(exception.clone()),
            violations: Vec::new(),
        };
    }

    // No cooling data at all means the dependency was never looked up.
    let Some(age_days) = dep.metadata.age_days() else {
        return CheckResult::pass();
    };

    let mut violations = Vec::new();

    if age_days < config.min_age_days {
        violations.push(Violation {
            kind: ViolationKind::AgeViolation,
            severity: Severity::High,
            message: format!(
                "package is only {} days old (minimum: {} days)",
                age_days, config.min_age_days
            ),
            actual: age_days,
            threshold: config.min_age_days,
        });
    }

    if let Some(total) = dep.metadata.total_downloads() {
        if total < config.min_downloads {
            violations.push(Violation {
                kind: ViolationKind::DownloadViolation,
                severity: Severity::Medium,
                message: format!(
                    "package has {} total downloads (minimum: {})",
                    total, config.min_downloads
                ),
                actual: total,
                threshold: config.min_downloads,
            });
        }
    }

    if let Some(recent) = dep.metadata.recent_downloads() {
        if recent < config.min_downloads_recent {
            violations.push(Violation {
                kind: ViolationKind::DownloadViolation,
                severity: Severity::Medium,
                message: format!(
                    "package has {} recent downloads (minimum: {})",
                    recent, config.min_downloads_recent
                ),
                actual: recent,
                threshold: config.min_downloads_recent,
            });
        }
    }

    CheckResult {
        passed: violations.is_empty(),
        is_exception: false,
        exception: None,
        violations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DependencyMetadata, Language};
    use crate::testing::aged_dep;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn config(min_age_days: i64) -> CoolingConfig {
        CoolingConfig {
            enabled: true,
            min_age_days,
            ..Default::default()
        }
    }

    fn exception(pattern: &str, until: Option<&str>) -> CoolingException {
        CoolingException {
            pattern: pattern.to_string(),
            reason: "test".to_string(),
            until: until.map(str::to_string),
            approved_by: None,
        }
    }

    #[test]
    fn test_disabled_always_passes() {
        let cfg = CoolingConfig {
            enabled: false,
            min_age_days: 30,
            ..Default::default()
        };
        let result = check_at(&aged_dep("x", 1), &cfg, today());
        assert!(result.passed);
        assert!(result.violations.is_empty());
    }

    #[test]
    fn test_young_package_has_one_age_violation() {
        let result = check_at(&aged_dep("github.com/new/pkg", 3), &config(7), today());
        assert!(!result.passed);
        assert_eq!(result.violations.len(), 1);
        let v = &result.violations[0];
        assert_eq!(v.kind, ViolationKind::AgeViolation);
        assert_eq!(v.severity, Severity::High);
        assert!(v.message.contains('3'));
        assert!(v.message.contains('7'));
    }

    #[test]
    fn test_mature_package_without_download_thresholds_passes() {
        let result = check_at(&aged_dep("github.com/old/pkg", 30), &config(7), today());
        assert!(result.passed);
        assert!(result.violations.is_empty());
    }

    #[test]
    fn test_missing_age_data_passes() {
        let dep = Dependency::new("never-looked-up", "1.0.0", Language::Node);
        let result = check_at(&dep, &config(30), today());
        assert!(result.passed);
        assert!(!result.is_exception);
    }

    #[test]
    fn test_download_violations_accumulate() {
        let dep = Dependency::new("tiny", "0.0.1", Language::Node).with_metadata(
            DependencyMetadata::default()
                .with_age_days(100)
                .with_total_downloads(50)
                .with_recent_downloads(2),
        );
        let cfg = CoolingConfig {
            enabled: true,
            min_age_days: 7,
            min_downloads: 1000,
            min_downloads_recent: 10,
            ..Default::default()
        };
        let result = check_at(&dep, &cfg, today());
        assert!(!result.passed);
        assert_eq!(result.violations.len(), 2);
        assert!(result
            .violations
            .iter()
            .all(|v| v.kind == ViolationKind::DownloadViolation && v.severity == Severity::Medium));
    }

    #[test]
    fn test_absent_download_counts_are_not_checked() {
        let cfg = CoolingConfig {
            enabled: true,
            min_age_days: 7,
            min_downloads: 1000,
            min_downloads_recent: 10,
            ..Default::default()
        };
        let result = check_at(&aged_dep("github.com/a/b", 100), &cfg, today());
        assert!(result.passed);
    }

    #[test]
    fn test_scope_pattern_matches_nested_names() {
        assert!(matches_pattern("@myorg/pkg", "@myorg/*"));
        assert!(matches_pattern("@myorg/sub/pkg", "@myorg/*"));
        assert!(!matches_pattern("@other/pkg", "@myorg/*"));
    }

    #[test]
    fn test_host_pattern_matches_only_its_owner() {
        assert!(matches_pattern("github.com/spf13/cobra", "github.com/spf13/*"));
        assert!(!matches_pattern("github.com/other/pkg", "github.com/spf13/*"));
    }

    #[test]
    fn test_glob_wildcards() {
        assert!(matches_pattern("lodash", "lod?sh"));
        assert!(matches_pattern("eslint-plugin-react", "eslint-plugin-*"));
        assert!(!matches_pattern("github.com/a/b", "github.com*b"));
        assert!(matches_pattern("exact-name", "exact-name"));
    }

    #[test]
    fn test_prefix_rule_requires_segment_boundary() {
        assert!(!matches_pattern("@myorganization/pkg", "@myorg/*"));
    }

    #[test]
    fn test_future_exception_suppresses_violation() {
        let mut cfg = config(30);
        cfg.exceptions = vec![exception("@myorg/*", Some("2025-12-31"))];
        let dep = aged_dep("@myorg/fresh", 1);

        let result = check_at(&dep, &cfg, today());
        assert!(result.passed);
        assert!(result.is_exception);
        assert!(result.violations.is_empty());
        assert_eq!(result.exception.unwrap().pattern, "@myorg/*");
    }

    #[test]
    fn test_expired_exception_behaves_as_absent() {
        let mut cfg = config(30);
        cfg.exceptions = vec![exception("@myorg/*", Some("2025-01-01"))];

        let result = check_at(&aged_dep("@myorg/fresh", 1), &cfg, today());
        assert!(!result.passed);
        assert!(!result.is_exception);
        assert_eq!(result.violations.len(), 1);
    }

    #[test]
    fn test_expired_exception_does_not_block_later_match() {
        let mut cfg = config(30);
        cfg.exceptions = vec![
            exception("@myorg/*", Some("2024-01-01")),
            exception("@myorg/fresh", None),
        ];

        let result = check_at(&aged_dep("@myorg/fresh", 1), &cfg, today());
        assert!(result.passed);
        assert!(result.is_exception);
        assert_eq!(result.exception.unwrap().pattern, "@myorg/fresh");
    }

    #[test]
    fn test_exception_is_valid_through_until_date() {
        let e = exception("x", Some("2025-06-15"));
        assert!(!e.is_expired(today()));
        assert!(e.is_expired(today().succ_opt().unwrap()));
    }

    #[test]
    fn test_invalid_until_counts_as_expired() {
        assert!(exception("x", Some("next tuesday")).is_expired(today()));
        assert!(!exception("x", None).is_expired(today()));
    }

    #[test]
    fn test_exception_applies_even_without_age_data() {
        let mut cfg = config(30);
        cfg.exceptions = vec![exception("internal-*", None)];
        let dep = Dependency::new("internal-tools", "1.0.0", Language::Node);
        let result = check_at(&dep, &cfg, today());
        assert!(result.is_exception);
    }
}
