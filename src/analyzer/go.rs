use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;

use super::{dependency, AnalyzerOutput};
use crate::models::{Dependency, Language};

/// Analyzer for Go modules (`go.mod`).
///
/// `replace` directives are applied: a module replaced by a local directory
/// is local, a module replaced by another module is reported under the
/// replacement's path and version.
pub struct GoAnalyzer;

impl GoAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl super::Analyzer for GoAnalyzer {
    fn language(&self) -> Language {
        Language::Go
    }

    fn analyze(&self, path: &Path) -> Result<AnalyzerOutput> {
        let mut out = AnalyzerOutput::default();
        let content = std::fs::read_to_string(path.join("go.mod"))?;
        out.extend(parse_go_mod(&content));
        Ok(out)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Block {
    None,
    Require,
    Replace,
    Other,
}

#[derive(Debug, Clone, PartialEq)]
struct Replace {
    old_version: Option<String>,
    new_path: String,
    new_version: Option<String>,
}

/// Requirements of a `go.mod` with replacements applied.
fn parse_go_mod(content: &str) -> Vec<Dependency> {
    let mut requires: Vec<(String, String)> = Vec::new();
    let mut replaces: HashMap<String, Replace> = HashMap::new();
    let mut block = Block::None;

    for raw in content.lines() {
        let line = raw.split("//").next().unwrap_or(raw).trim();
        if line.is_empty() {
            continue;
        }

        if block != Block::None {
            if line == ")" {
                block = Block::None;
                continue;
            }
            match block {
                Block::Require => requires.extend(parse_requirement(line)),
                Block::Replace => {
                    if let Some((old, replace)) = parse_replace(line) {
                        replaces.insert(old, replace);
                    }
                }
                _ => {}
            }
            continue;
        }

        let (directive, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        let opens_block = rest == "(";
        match directive {
            "require" if opens_block => block = Block::Require,
            "replace" if opens_block => block = Block::Replace,
            _ if opens_block => block = Block::Other,
            "require" => requires.extend(parse_requirement(rest)),
            "replace" => {
                if let Some((old, replace)) = parse_replace(rest) {
                    replaces.insert(old, replace);
                }
            }
            _ => {}
        }
    }

    requires
        .into_iter()
        .map(|(path, version)| match replaces.get(&path) {
            Some(r) if r.old_version.as_deref().map_or(true, |v| v == version) => {
                if is_local_path(&r.new_path) {
                    let mut dep = dependency(&path, &version, Language::Go);
                    dep.metadata.mark_local();
                    dep
                } else {
                    let new_version = r.new_version.as_deref().unwrap_or(&version);
                    dependency(&r.new_path, new_version, Language::Go)
                }
            }
            _ => dependency(&path, &version, Language::Go),
        })
        .collect()
}

/// `module/path v1.2.3`
fn parse_requirement(line: &str) -> Option<(String, String)> {
    let mut parts = line.split_whitespace();
    let path = parts.next()?;
    let version = parts.next()?;
    Some((path.to_string(), version.to_string()))
}

/// `old [v1.0.0] => new [v1.2.3]`
fn parse_replace(line: &str) -> Option<(String, Replace)> {
    let (old, new) = line.split_once("=>")?;
    let mut old = old.split_whitespace();
    let mut new = new.split_whitespace();
    let old_path = old.next()?.to_string();
    let replace = Replace {
        old_version: old.next().map(str::to_string),
        new_path: new.next()?.to_string(),
        new_version: new.next().map(str::to_string),
    };
    Some((old_path, replace))
}

fn is_local_path(path: &str) -> bool {
    path.starts_with("./") || path.starts_with("../") || path.starts_with('/')
}
