use std::collections::HashSet;
use std::path::Path;

use anyhow::Result;
use regex::Regex;
use serde::Deserialize;

use super::{dependency, AnalyzerOutput};
use crate::models::{Dependency, Language};

/// Analyzer for Python projects.
///
/// Searches for manifests in priority order:
/// `Pipfile.lock` (pinned) → `requirements.txt` → `pyproject.toml`.
/// Results are deduplicated by package name (case-insensitive).
pub struct PythonAnalyzer;

impl PythonAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl super::Analyzer for PythonAnalyzer {
    fn language(&self) -> Language {
        Language::Python
    }

    fn analyze(&self, path: &Path) -> Result<AnalyzerOutput> {
        let mut out = AnalyzerOutput::default();
        let mut seen: HashSet<String> = HashSet::new();

        let sources: [(&str, fn(&Path) -> Result<Vec<Dependency>>); 3] = [
            ("Pipfile.lock", parse_pipfile_lock),
            ("requirements.txt", parse_requirements_txt),
            ("pyproject.toml", parse_pyproject_toml),
        ];

        for (file, parse) in sources {
            let manifest = path.join(file);
            if !manifest.exists() {
                continue;
            }
            match parse(&manifest) {
                Ok(deps) => {
                    for d in deps {
                        if seen.insert(normalize_name(d.name())) {
                            out.push(d);
                        }
                    }
                }
                Err(e) => out.note(format!("{file} could not be parsed: {e}")),
            }
        }

        Ok(out)
    }
}

/// PEP 503 name normalization: case-insensitive, `-`, `_` and `.` equivalent.
fn normalize_name(name: &str) -> String {
    name.to_lowercase().replace(['_', '.'], "-")
}

/// Parse `requirements.txt`. Only `==` pins resolve to a version;
/// other specifiers are recorded as local.
fn parse_requirements_txt(path: &Path) -> Result<Vec<Dependency>> {
    let content = std::fs::read_to_string(path)?;
    let re = Regex::new(r"^([A-Za-z0-9_\-\.]+)(?:\[[^\]]*\])?\s*(?:(==|>=|~=|<=|!=|>|<)\s*([^\s;,]+))?")?;
    let mut deps = Vec::new();

    for line in content.lines() {
        let line = line.split(" #").next().unwrap_or(line).trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('-') {
            continue;
        }
        if let Some(caps) = re.captures(line) {
            let version = match (caps.get(2), caps.get(3)) {
                (Some(op), Some(v)) if op.as_str() == "==" => v.as_str(),
                _ => "*",
            };
            deps.push(dependency(&caps[1], version, Language::Python));
        }
    }

    Ok(deps)
}

/// Parse `Pipfile.lock` — JSON with `default` and `develop` sections.
fn parse_pipfile_lock(path: &Path) -> Result<Vec<Dependency>> {
    let content = std::fs::read_to_string(path)?;
    let json: serde_json::Value = serde_json::from_str(&content)?;
    let mut deps = Vec::new();

    for section in ["default", "develop"] {
        if let Some(pkgs) = json.get(section).and_then(|v| v.as_object()) {
            for (name, info) in pkgs {
                let version = info
                    .get("version")
                    .and_then(|v| v.as_str())
                    .unwrap_or("*")
                    .trim_start_matches("==");
                deps.push(dependency(name, version, Language::Python));
            }
        }
    }

    Ok(deps)
}

#[derive(Debug, Deserialize)]
struct Pyproject {
    project: Option<PyprojectProject>,
}

#[derive(Debug, Deserialize)]
struct PyprojectProject {
    #[serde(default)]
    dependencies: Vec<String>,
}

/// Parse `pyproject.toml` `[project].dependencies`.
fn parse_pyproject_toml(path: &Path) -> Result<Vec<Dependency>> {
    let content = std::fs::read_to_string(path)?;
    let pyproject: Pyproject = toml::from_str(&content)?;

    let re = Regex::new(r"^([A-Za-z0-9_\-\.]+)(?:\[[^\]]*\])?\s*(?:==\s*([^\s;,\[]+))?")?;
    let mut deps = Vec::new();

    if let Some(project) = pyproject.project {
        for spec in &project.dependencies {
            if let Some(caps) = re.captures(spec.trim()) {
                let version = caps.get(2).map_or("*", |m| m.as_str());
                deps.push(dependency(&caps[1], version, Language::Python));
            }
        }
    }

    Ok(deps)
}
