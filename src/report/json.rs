//! Machine-readable report. Field names and the severity vocabulary are a
//! compatibility surface for consumers validating against the schema.

use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::error::AnalysisError;
use crate::models::{AnalysisResult, Dependency, Issue, IssueType, Language, Severity};

pub const SCHEMA_VERSION: &str = "1.0";

#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub version: &'static str,
    pub metadata: ReportMetadata,
    pub summary: Summary,
    pub dependencies: &'a [Dependency],
    pub issues: &'a [Issue],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sbom_metadata: Option<SbomMetadata>,
}

#[derive(Debug, Serialize)]
pub struct ReportMetadata {
    pub generated_at: DateTime<Utc>,
    pub target: String,
    /// The single analyzed language, or `multi`.
    pub language: String,
    pub duration_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct Summary {
    pub dependency_count: usize,
    pub license_violations: usize,
    pub cooling_violations: usize,
    pub passed: bool,
}

#[derive(Debug, Serialize)]
pub struct SbomMetadata {
    pub tool: &'static str,
    pub tool_version: &'static str,
    pub packages_scanned: usize,
}

impl<'a> JsonReport<'a> {
    pub fn new(
        result: &'a AnalysisResult,
        target: &Path,
        languages: &[Language],
        with_sbom: bool,
    ) -> Self {
        let language = match languages {
            [single] => single.as_str().to_string(),
            _ => "multi".to_string(),
        };

        JsonReport {
            version: SCHEMA_VERSION,
            metadata: ReportMetadata {
                generated_at: Utc::now(),
                target: target.display().to_string(),
                language,
                duration_ms: u64::try_from(result.duration.as_millis()).unwrap_or(u64::MAX),
            },
            summary: Summary {
                dependency_count: result.dependencies.len(),
                license_violations: result.count(IssueType::License),
                cooling_violations: result.count(IssueType::Cooling),
                passed: result.passed,
            },
            dependencies: &result.dependencies,
            issues: &result.issues,
            sbom_metadata: with_sbom.then(|| SbomMetadata {
                tool: env!("CARGO_PKG_NAME"),
                tool_version: env!("CARGO_PKG_VERSION"),
                packages_scanned: result.packages_scanned,
            }),
        }
    }
}

/// Serialize the report, pretty-printed.
///
/// Fails with [`AnalysisError::InvalidSeverity`] if an issue's serialized
/// severity falls outside the schema's vocabulary.
pub fn render(
    result: &AnalysisResult,
    target: &Path,
    languages: &[Language],
    with_sbom: bool,
) -> Result<String> {
    let report = JsonReport::new(result, target, languages, with_sbom);
    check_severities(&serde_json::to_value(&report)?)?;
    Ok(serde_json::to_string_pretty(&report)?)
}

/// Every `issues[].severity` must parse back into a [`Severity`].
pub fn check_severities(report: &Value) -> Result<(), AnalysisError> {
    let issues = report
        .get("issues")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    for issue in issues {
        let raw = issue.get("severity").and_then(Value::as_str).unwrap_or_default();
        raw.parse::<Severity>()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;
    use crate::testing::aged_dep;
    use serde_json::json;
    use std::time::Duration;

    fn result() -> AnalysisResult {
        let young = aged_dep("github.com/new/pkg", 2);
        let gpl = aged_dep("github.com/gpl/pkg", 400).with_license("GPL-3.0");
        let issues = vec![
            Issue::new(IssueType::Cooling, Severity::High, "too new").with_dependency(&young),
            Issue::new(IssueType::License, Severity::Critical, "forbidden").with_dependency(&gpl),
            Issue::configuration("note"),
        ];
        AnalysisResult::new(vec![young, gpl], issues, Duration::from_millis(42))
    }

    #[test]
    fn test_report_schema() {
        let result = result();
        let json = render(&result, Path::new("/src/app"), &[Language::Go], false).unwrap();
        let v: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(v["version"], "1.0");
        assert_eq!(v["metadata"]["target"], "/src/app");
        assert_eq!(v["metadata"]["language"], "go");
        assert_eq!(v["metadata"]["duration_ms"], 42);
        assert_eq!(v["summary"]["dependency_count"], 2);
        assert_eq!(v["summary"]["license_violations"], 1);
        assert_eq!(v["summary"]["cooling_violations"], 1);
        assert_eq!(v["summary"]["passed"], false);
        assert_eq!(v["issues"][0]["type"], "cooling");
        assert_eq!(v["issues"][1]["severity"], "critical");
        assert_eq!(v["issues"][1]["dependency"]["license"]["type"], "GPL-3.0");
        assert_eq!(v["dependencies"][0]["metadata"]["age_days"], 2);
        assert!(v.get("sbom_metadata").is_none());
    }

    #[test]
    fn test_multi_language_and_sbom() {
        let result = result();
        let json = render(
            &result,
            Path::new("."),
            &[Language::Go, Language::Actions],
            true,
        )
        .unwrap();
        let v: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(v["metadata"]["language"], "multi");
        assert_eq!(v["sbom_metadata"]["tool"], "depgate");
        assert_eq!(v["sbom_metadata"]["packages_scanned"], 2);
    }

    #[test]
    fn test_rendered_severities_pass_the_check() {
        let result = result();
        let json = render(&result, Path::new("."), &[Language::Go], false).unwrap();
        let v: Value = serde_json::from_str(&json).unwrap();
        assert!(check_severities(&v).is_ok());
    }

    #[test]
    fn test_unknown_severity_aborts() {
        let report = json!({
            "issues": [
                { "type": "cooling", "severity": "high", "message": "ok" },
                { "type": "cooling", "severity": "urgent", "message": "bad" }
            ]
        });
        let err = check_severities(&report).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidSeverity(ref s) if s == "urgent"));
    }

    #[test]
    fn test_missing_severity_aborts() {
        let report = json!({ "issues": [ { "type": "policy", "message": "no severity" } ] });
        assert!(check_severities(&report).is_err());
    }
}
