use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_yaml::Value;

use super::{dependency, AnalyzerOutput};
use crate::models::{Dependency, Language};

/// Analyzer for GitHub Actions workflows.
///
/// Every `uses:` reference in `.github/workflows/*.yml|yaml` (step actions
/// and reusable workflows) becomes a dependency named `owner/repo[/path]`
/// at the referenced tag. `./` and `docker://` references are local.
pub struct ActionsAnalyzer;

impl ActionsAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl super::Analyzer for ActionsAnalyzer {
    fn language(&self) -> Language {
        Language::Actions
    }

    fn analyze(&self, path: &Path) -> Result<AnalyzerOutput> {
        let mut out = AnalyzerOutput::default();

        for workflow in workflow_files(path)? {
            let parsed = std::fs::read_to_string(&workflow)
                .with_context(|| format!("reading {}", workflow.display()))
                .and_then(|content| parse_workflow(&content));
            match parsed {
                Ok(deps) => out.extend(deps),
                Err(e) => out.note(format!("{} could not be parsed: {e:#}", workflow.display())),
            }
        }

        Ok(out)
    }
}

fn workflow_files(root: &Path) -> Result<Vec<PathBuf>> {
    let dir = root.join(".github").join("workflows");
    let mut files: Vec<PathBuf> = std::fs::read_dir(&dir)
        .with_context(|| format!("reading {}", dir.display()))?
        .flatten()
        .map(|entry| entry.path())
        .filter(|p| matches!(p.extension().and_then(|e| e.to_str()), Some("yml" | "yaml")))
        .collect();
    files.sort();
    Ok(files)
}

fn parse_workflow(content: &str) -> Result<Vec<Dependency>> {
    let doc: Value = serde_yaml::from_str(content)?;
    let mut deps = Vec::new();

    let Some(jobs) = doc.get("jobs").and_then(Value::as_mapping) else {
        return Ok(deps);
    };

    for job in jobs.values() {
        if let Some(uses) = job.get("uses").and_then(Value::as_str) {
            deps.extend(parse_uses(uses));
        }
        let steps = job.get("steps").and_then(Value::as_sequence);
        for step in steps.into_iter().flatten() {
            if let Some(uses) = step.get("uses").and_then(Value::as_str) {
                deps.extend(parse_uses(uses));
            }
        }
    }

    Ok(deps)
}

/// `actions/checkout@v4`, `org/repo/.github/workflows/ci.yml@main`,
/// `./local-action`, `docker://alpine:3.19`.
fn parse_uses(uses: &str) -> Option<Dependency> {
    let uses = uses.trim();
    if uses.starts_with("./") || uses.starts_with("docker://") {
        return Some(dependency(uses, "*", Language::Actions));
    }
    let (name, tag) = uses.rsplit_once('@')?;
    if name.is_empty() || !name.contains('/') {
        return None;
    }
    Some(dependency(name, tag, Language::Actions))
}
