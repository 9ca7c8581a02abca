//! Policy documents and their evaluation.
//!
//! - [`PolicyDocument`] — forbidden licenses and cooling thresholds, loaded
//!   from YAML or JSON.
//! - [`engine`] — evaluates a document against the inventory, directly and
//!   through the compiled rule set, and merges both into issues.
//! - [`rules`] — compiles a document into declarative deny-rules over
//!   dependency facts.

pub mod engine;
pub mod rules;

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cooling::CoolingConfig;
use crate::error::PolicyError;
use crate::models::Issue;

pub use engine::{evaluate_policy_file, PolicyEngine};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LicensePolicy {
    /// SPDX identifiers matched exactly against `License.type`.
    #[serde(default)]
    pub forbidden: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PolicyDocument {
    pub licenses: LicensePolicy,
    pub cooling: CoolingConfig,
}

impl PolicyDocument {
    /// Load a policy file.
    ///
    /// Sections are decoded independently: a malformed section is left at its
    /// default (not enforced) and reported in the returned issues. Unknown
    /// top-level keys are ignored.
    pub fn load(path: &Path) -> Result<(PolicyDocument, Vec<Issue>), PolicyError> {
        let content = std::fs::read_to_string(path).map_err(|source| PolicyError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let is_json = path.extension().and_then(|e| e.to_str()) == Some("json")
            || content.trim_start().starts_with('{');
        Self::parse(&content, is_json).map_err(|message| PolicyError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Parse policy text; `Err` carries a human-readable reason.
    pub fn parse(content: &str, is_json: bool) -> Result<(PolicyDocument, Vec<Issue>), String> {
        let root: Value = if content.trim().is_empty() {
            Value::Null
        } else if is_json {
            serde_json::from_str(content).map_err(|e| e.to_string())?
        } else {
            serde_yaml::from_str(content).map_err(|e| e.to_string())?
        };

        let sections = match root {
            Value::Object(map) => map,
            Value::Null => Default::default(),
            other => {
                return Err(format!(
                    "expected a mapping at the top level, found {}",
                    json_kind(&other)
                ))
            }
        };

        let mut issues = Vec::new();
        let licenses = decode_section(&sections, "licenses", &mut issues);
        let cooling = decode_section(&sections, "cooling", &mut issues);

        Ok((PolicyDocument { licenses, cooling }, issues))
    }
}

fn decode_section<T>(
    sections: &serde_json::Map<String, Value>,
    key: &str,
    issues: &mut Vec<Issue>,
) -> T
where
    T: Default + serde::de::DeserializeOwned,
{
    let Some(value) = sections.get(key) else {
        return T::default();
    };
    if value.is_null() {
        return T::default();
    }
    match serde_json::from_value(value.clone()) {
        Ok(section) => section,
        Err(e) => {
            tracing::warn!(section = key, %e, "malformed policy section, not enforced");
            issues.push(Issue::configuration(format!(
                "policy section `{key}` is malformed and was not enforced: {e}"
            )));
            T::default()
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IssueType, Severity};
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const YAML_POLICY: &str = r##"
licenses:
  forbidden: [GPL-3.0, AGPL-3.0]
cooling:
  enabled: true
  min_age_days: 14
  min_downloads: 1000
  exceptions:
    - pattern: "@myorg/*"
      reason: internal scope
      until: "2026-12-31"
      approved_by: security-team
reporting:
  channel: "#deps"
"##;

    #[test]
    fn test_parse_yaml_policy() {
        let (doc, issues) = PolicyDocument::parse(YAML_POLICY, false).unwrap();
        assert!(issues.is_empty());
        assert_eq!(doc.licenses.forbidden, vec!["GPL-3.0", "AGPL-3.0"]);
        assert!(doc.cooling.enabled);
        assert_eq!(doc.cooling.min_age_days, 14);
        assert_eq!(doc.cooling.min_downloads, 1000);
        assert_eq!(doc.cooling.min_downloads_recent, 0);
        assert_eq!(doc.cooling.exceptions.len(), 1);
        assert_eq!(
            doc.cooling.exceptions[0].approved_by.as_deref(),
            Some("security-team")
        );
    }

    #[test]
    fn test_parse_json_policy() {
        let json = r#"{"licenses": {"forbidden": ["GPL-3.0"]}, "cooling": {"enabled": true, "min_age_days": 30}}"#;
        let (doc, issues) = PolicyDocument::parse(json, true).unwrap();
        assert!(issues.is_empty());
        assert_eq!(doc.licenses.forbidden, vec!["GPL-3.0"]);
        assert_eq!(doc.cooling.min_age_days, 30);
    }

    #[test]
    fn test_malformed_section_degrades_to_not_enforced() {
        let yaml = "licenses:\n  forbidden: [MIT]\ncooling:\n  enabled: yes-please\n";
        let (doc, issues) = PolicyDocument::parse(yaml, false).unwrap();
        assert_eq!(doc.licenses.forbidden, vec!["MIT"]);
        assert_eq!(doc.cooling, CoolingConfig::default());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, IssueType::Configuration);
        assert_eq!(issues[0].severity, Severity::Info);
        assert!(issues[0].message.contains("cooling"));
    }

    #[test]
    fn test_empty_document_enforces_nothing() {
        let (doc, issues) = PolicyDocument::parse("", false).unwrap();
        assert_eq!(doc, PolicyDocument::default());
        assert!(issues.is_empty());
    }

    #[test]
    fn test_non_mapping_document_is_rejected() {
        assert!(PolicyDocument::parse("- just\n- a list\n", false).is_err());
    }

    #[test]
    fn test_load_detects_json_by_extension() {
        let mut f = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(f, r#"{{"licenses": {{"forbidden": ["GPL-2.0"]}}}}"#).unwrap();
        let (doc, _) = PolicyDocument::load(f.path()).unwrap();
        assert_eq!(doc.licenses.forbidden, vec!["GPL-2.0"]);
    }

    #[test]
    fn test_load_missing_file_is_read_error() {
        let err = PolicyDocument::load(Path::new("/nonexistent/policy.yaml")).unwrap_err();
        assert!(matches!(err, PolicyError::Read { .. }));
    }

    #[test]
    fn test_load_invalid_yaml_is_parse_error() {
        let mut f = NamedTempFile::new().unwrap();
        write!(f, "licenses: [unclosed").unwrap();
        let err = PolicyDocument::load(f.path()).unwrap_err();
        assert!(matches!(err, PolicyError::Parse { .. }));
    }
}
