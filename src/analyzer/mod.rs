use std::collections::HashSet;
use std::path::Path;

use anyhow::Result;

use crate::models::{Dependency, Issue, Language};

pub mod actions;
pub mod dotnet;
pub mod go;
pub mod node;
pub mod python;
pub mod rust;

pub trait Analyzer {
    fn language(&self) -> Language;

    /// Discover the dependencies declared under `path`.
    ///
    /// An `Err` means the manifests could not be read at all; the caller
    /// turns it into a configuration issue instead of failing the run.
    fn analyze(&self, path: &Path) -> Result<AnalyzerOutput>;
}

/// Dependencies found by one analyzer plus any notes about gaps.
#[derive(Debug, Default)]
pub struct AnalyzerOutput {
    pub dependencies: Vec<Dependency>,
    pub issues: Vec<Issue>,
    seen: HashSet<String>,
}

impl AnalyzerOutput {
    /// Add `dep` unless one with the same `name@version` is already present.
    pub fn push(&mut self, dep: Dependency) -> bool {
        if self.seen.insert(dep.key()) {
            self.dependencies.push(dep);
            true
        } else {
            false
        }
    }

    pub fn extend(&mut self, deps: impl IntoIterator<Item = Dependency>) {
        for dep in deps {
            self.push(dep);
        }
    }

    pub fn note(&mut self, message: impl Into<String>) {
        self.issues.push(Issue::configuration(message));
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }
}

pub fn for_language(language: Language) -> Box<dyn Analyzer> {
    match language {
        Language::Go => Box::new(go::GoAnalyzer::new()),
        Language::Node => Box::new(node::NodeAnalyzer::new()),
        Language::Python => Box::new(python::PythonAnalyzer::new()),
        Language::Rust => Box::new(rust::RustAnalyzer::new()),
        Language::DotNet => Box::new(dotnet::DotNetAnalyzer::new()),
        Language::Actions => Box::new(actions::ActionsAnalyzer::new()),
    }
}

/// Build a dependency, flagging versions that cannot be looked up in a
/// registry (`*`, empty) as local.
pub(crate) fn dependency(name: &str, version: &str, language: Language) -> Dependency {
    let version = version.trim();
    let mut dep = Dependency::new(name.trim(), version, language);
    if version.is_empty() || version == "*" {
        dep.metadata.mark_local();
    }
    dep
}
