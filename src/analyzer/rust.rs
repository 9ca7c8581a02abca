use std::path::Path;

use anyhow::Result;
use serde::Deserialize;

use super::{dependency, AnalyzerOutput};
use crate::models::Language;

#[derive(Debug, Deserialize)]
struct CargoLock {
    #[serde(default)]
    package: Vec<CargoLockPackage>,
}

#[derive(Debug, Deserialize)]
struct CargoLockPackage {
    name: String,
    version: String,
    /// Packages without a `source` field are local workspace members.
    source: Option<String>,
}

pub struct RustAnalyzer;

impl RustAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl super::Analyzer for RustAnalyzer {
    fn language(&self) -> Language {
        Language::Rust
    }

    fn analyze(&self, path: &Path) -> Result<AnalyzerOutput> {
        let mut out = AnalyzerOutput::default();

        let lock_path = path.join("Cargo.lock");
        if !lock_path.exists() {
            if path.join("Cargo.toml").exists() {
                out.note("Cargo.toml found without Cargo.lock; run `cargo generate-lockfile` to analyze Rust dependencies");
            }
            return Ok(out);
        }

        let content = std::fs::read_to_string(&lock_path)?;
        let lock: CargoLock = toml::from_str(&content)?;

        for p in lock.package {
            let Some(source) = p.source else {
                continue;
            };
            let mut dep = dependency(&p.name, &p.version, Language::Rust);
            // git and path sources have no registry publish date
            if !source.starts_with("registry+") && !source.starts_with("sparse+") {
                dep.metadata.mark_local();
            }
            out.push(dep);
        }

        Ok(out)
    }
}
