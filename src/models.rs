//! Unified dependency and issue model shared by analyzers, the registry
//! enrichment step, the cooling checker and the policy engine.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::license::classifier::license_type;
use crate::registry::Metadata;

/// Age recorded for a dependency whose registry lookup failed.
///
/// Chosen so that a registry outage never produces a cooling violation.
pub const FALLBACK_AGE_DAYS: i64 = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Go,
    Node,
    Python,
    Rust,
    DotNet,
    Actions,
}

impl Language {
    /// Identifier used in the JSON report.
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Go => "go",
            Language::Node => "node",
            Language::Python => "python",
            Language::Rust => "rust",
            Language::DotNet => "dotnet",
            Language::Actions => "actions",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Language::Go => write!(f, "Go"),
            Language::Node => write!(f, "Node"),
            Language::Python => write!(f, "Python"),
            Language::Rust => write!(f, "Rust"),
            Language::DotNet => write!(f, ".NET"),
            Language::Actions => write!(f, "GitHub Actions"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub version: String,
    pub language: Language,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    /// License string as found in the manifest, registry or license file.
    pub name: String,
    /// Normalized SPDX identifier, `Unknown` when it could not be classified.
    #[serde(rename = "type")]
    pub license_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl License {
    /// Build a license from a raw string, deriving the normalized type.
    pub fn from_raw(raw: &str) -> Self {
        License {
            name: raw.trim().to_string(),
            license_type: license_type(raw),
            url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LicenseRisk {
    Permissive,
    WeakCopyleft,
    StrongCopyleft,
    Proprietary,
    Unknown,
}

impl std::fmt::Display for LicenseRisk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LicenseRisk::Permissive => write!(f, "Permissive"),
            LicenseRisk::WeakCopyleft => write!(f, "Weak Copyleft"),
            LicenseRisk::StrongCopyleft => write!(f, "Strong Copyleft"),
            LicenseRisk::Proprietary => write!(f, "Proprietary"),
            LicenseRisk::Unknown => write!(f, "Unknown"),
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Cooling metadata attached to a dependency.
///
/// Serialized with the flat keys consumers validate against (`age_days`,
/// `publish_date`, `total_downloads`, `recent_downloads`, `age_unknown`,
/// `registry_error`, `is_local`). The registry-failure triple is only written
/// through [`DependencyMetadata::record_registry_failure`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependencyMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    age_days: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    publish_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    total_downloads: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    recent_downloads: Option<i64>,
    #[serde(default, skip_serializing_if = "is_false")]
    age_unknown: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    registry_error: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    is_local: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    registry_source: Option<String>,
}

impl DependencyMetadata {
    pub fn age_days(&self) -> Option<i64> {
        self.age_days
    }

    pub fn publish_date(&self) -> Option<DateTime<Utc>> {
        self.publish_date
    }

    pub fn total_downloads(&self) -> Option<i64> {
        self.total_downloads
    }

    pub fn recent_downloads(&self) -> Option<i64> {
        self.recent_downloads
    }

    pub fn age_unknown(&self) -> bool {
        self.age_unknown
    }

    pub fn registry_error(&self) -> Option<&str> {
        self.registry_error.as_deref()
    }

    pub fn is_local(&self) -> bool {
        self.is_local
    }

    pub fn registry_source(&self) -> Option<&str> {
        self.registry_source.as_deref()
    }

    /// Whether any cooling data has been recorded.
    pub fn has_cooling_data(&self) -> bool {
        self.age_days.is_some()
    }

    pub fn with_age_days(mut self, days: i64) -> Self {
        self.age_days = Some(days);
        self
    }

    pub fn with_total_downloads(mut self, downloads: i64) -> Self {
        self.total_downloads = Some(downloads);
        self
    }

    pub fn with_recent_downloads(mut self, downloads: i64) -> Self {
        self.recent_downloads = Some(downloads);
        self
    }

    /// Flag a dependency with no resolvable published version.
    pub fn mark_local(&mut self) {
        self.is_local = true;
    }

    /// Record a successful registry lookup.
    ///
    /// Negative download figures are the registry "unavailable" sentinel and
    /// leave the corresponding key absent.
    pub fn record_lookup(&mut self, metadata: &Metadata, now: DateTime<Utc>) {
        let age = (now - metadata.publish_date).num_days().max(0);
        self.age_days = Some(age);
        self.publish_date = Some(metadata.publish_date);
        self.total_downloads = (metadata.total_downloads >= 0).then_some(metadata.total_downloads);
        self.recent_downloads =
            (metadata.recent_downloads >= 0).then_some(metadata.recent_downloads);
        self.registry_source = Some(metadata.source.clone());
        self.age_unknown = false;
        self.registry_error = None;
    }

    /// Record a failed registry lookup with the conservative "assume mature"
    /// fallback. Sets `age_days`, `age_unknown` and `registry_error` together.
    pub fn record_registry_failure(&mut self, message: impl Into<String>) {
        let mut message = message.into();
        if message.trim().is_empty() {
            message = "registry lookup failed".to_string();
        }
        self.age_days = Some(FALLBACK_AGE_DAYS);
        self.age_unknown = true;
        self.registry_error = Some(message);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    #[serde(flatten)]
    pub module: Module,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<License>,
    #[serde(default)]
    pub metadata: DependencyMetadata,
}

impl Dependency {
    pub fn new(name: impl Into<String>, version: impl Into<String>, language: Language) -> Self {
        Dependency {
            module: Module {
                name: name.into(),
                version: version.into(),
                language,
            },
            license: None,
            metadata: DependencyMetadata::default(),
        }
    }

    pub fn with_license(mut self, raw: &str) -> Self {
        self.license = Some(License::from_raw(raw));
        self
    }

    pub fn with_metadata(mut self, metadata: DependencyMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn name(&self) -> &str {
        &self.module.name
    }

    pub fn version(&self) -> &str {
        &self.module.version
    }

    pub fn language(&self) -> Language {
        self.module.language
    }

    /// The normalized license type, if a license is known.
    pub fn license_type(&self) -> Option<&str> {
        self.license.as_ref().map(|l| l.license_type.as_str())
    }

    /// `name@version` key used for de-duplication and caching.
    pub fn key(&self) -> String {
        format!("{}@{}", self.module.name, self.module.version)
    }
}

/// Issue severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// `high` and `critical` issues fail an analysis.
    pub fn is_failing(&self) -> bool {
        matches!(self, Severity::High | Severity::Critical)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "critical" => Ok(Severity::Critical),
            "high" => Ok(Severity::High),
            "medium" => Ok(Severity::Medium),
            "low" => Ok(Severity::Low),
            "info" => Ok(Severity::Info),
            other => Err(AnalysisError::InvalidSeverity(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueType {
    License,
    Cooling,
    Policy,
    Configuration,
}

impl std::fmt::Display for IssueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueType::License => write!(f, "license"),
            IssueType::Cooling => write!(f, "cooling"),
            IssueType::Policy => write!(f, "policy"),
            IssueType::Configuration => write!(f, "configuration"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency: Option<Dependency>,
}

impl Issue {
    pub fn new(issue_type: IssueType, severity: Severity, message: impl Into<String>) -> Self {
        Issue {
            issue_type,
            severity,
            message: message.into(),
            dependency: None,
        }
    }

    /// Informational note about a configuration gap; never fails a run.
    pub fn configuration(message: impl Into<String>) -> Self {
        Issue::new(IssueType::Configuration, Severity::Info, message)
    }

    pub fn with_dependency(mut self, dep: &Dependency) -> Self {
        self.dependency = Some(dep.clone());
        self
    }
}

/// Outcome of one analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub dependencies: Vec<Dependency>,
    pub issues: Vec<Issue>,
    pub passed: bool,
    pub duration: Duration,
    pub packages_scanned: usize,
}

impl AnalysisResult {
    pub fn new(dependencies: Vec<Dependency>, issues: Vec<Issue>, duration: Duration) -> Self {
        let passed = passes(&issues);
        let packages_scanned = dependencies.len();
        AnalysisResult {
            dependencies,
            issues,
            passed,
            duration,
            packages_scanned,
        }
    }

    pub fn count(&self, issue_type: IssueType) -> usize {
        self.issues
            .iter()
            .filter(|i| i.issue_type == issue_type)
            .count()
    }
}

/// True iff no issue carries `high` or `critical` severity.
pub fn passes(issues: &[Issue]) -> bool {
    !issues.iter().any(|i| i.severity.is_failing())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn registry_metadata(total: i64, recent: i64) -> Metadata {
        Metadata {
            publish_date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            total_downloads: total,
            recent_downloads: recent,
            license: None,
            source: "npm".to_string(),
        }
    }

    #[test]
    fn test_registry_failure_sets_all_three_fields() {
        let mut meta = DependencyMetadata::default();
        meta.record_registry_failure("connection refused");
        assert_eq!(meta.age_days(), Some(FALLBACK_AGE_DAYS));
        assert!(meta.age_unknown());
        assert_eq!(meta.registry_error(), Some("connection refused"));
    }

    #[test]
    fn test_registry_failure_never_records_empty_error() {
        let mut meta = DependencyMetadata::default();
        meta.record_registry_failure("");
        assert!(!meta.registry_error().unwrap().is_empty());
    }

    #[test]
    fn test_record_lookup_computes_age_and_drops_sentinels() {
        let mut meta = DependencyMetadata::default();
        let now = Utc.with_ymd_and_hms(2024, 1, 31, 12, 0, 0).unwrap();
        meta.record_lookup(&registry_metadata(-1, 42), now);
        assert_eq!(meta.age_days(), Some(30));
        assert_eq!(meta.total_downloads(), None);
        assert_eq!(meta.recent_downloads(), Some(42));
        assert_eq!(meta.registry_source(), Some("npm"));
        assert!(!meta.age_unknown());
    }

    #[test]
    fn test_metadata_json_keys() {
        let mut meta = DependencyMetadata::default();
        meta.record_registry_failure("timeout");
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["age_days"], 365);
        assert_eq!(json["age_unknown"], true);
        assert_eq!(json["registry_error"], "timeout");
        assert!(json.get("is_local").is_none());
        assert!(json.get("total_downloads").is_none());
    }

    #[test]
    fn test_dependency_flattens_module() {
        let dep = Dependency::new("left-pad", "1.3.0", Language::Node).with_license("MIT");
        let json = serde_json::to_value(&dep).unwrap();
        assert_eq!(json["name"], "left-pad");
        assert_eq!(json["version"], "1.3.0");
        assert_eq!(json["language"], "node");
        assert_eq!(json["license"]["type"], "MIT");
    }

    #[test]
    fn test_severity_parsing_is_strict() {
        assert_eq!("critical".parse::<Severity>().unwrap(), Severity::Critical);
        assert_eq!("info".parse::<Severity>().unwrap(), Severity::Info);
        assert!("HIGH".parse::<Severity>().is_err());
        assert!("warning".parse::<Severity>().is_err());
    }

    #[test]
    fn test_passes_only_fails_on_high_or_critical() {
        let medium = Issue::new(IssueType::Cooling, Severity::Medium, "few downloads");
        let high = Issue::new(IssueType::Cooling, Severity::High, "too new");
        assert!(passes(&[medium.clone(), Issue::configuration("note")]));
        assert!(!passes(&[medium, high]));
    }
}
