use std::path::Path;

use anyhow::Result;
use regex::Regex;
use serde_json::Value;

use super::{dependency, AnalyzerOutput};
use crate::license::detect;
use crate::models::{Dependency, Language};

/// Analyzer for Node projects.
///
/// Reads `package-lock.json` and `yarn.lock` for pinned versions and falls
/// back to the ranges declared in `package.json` when neither lock exists.
pub struct NodeAnalyzer;

impl NodeAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl super::Analyzer for NodeAnalyzer {
    fn language(&self) -> Language {
        Language::Node
    }

    fn analyze(&self, path: &Path) -> Result<AnalyzerOutput> {
        let mut out = AnalyzerOutput::default();

        let lock = path.join("package-lock.json");
        if lock.exists() {
            match parse_package_lock_json(&lock, path) {
                Ok(deps) => out.extend(deps),
                Err(e) => out.note(format!("package-lock.json could not be parsed: {e}")),
            }
        }

        let yarn = path.join("yarn.lock");
        if yarn.exists() {
            match parse_yarn_lock(&yarn) {
                Ok(deps) => out.extend(deps),
                Err(e) => out.note(format!("yarn.lock could not be parsed: {e}")),
            }
        }

        // package.json only carries ranges; use it when nothing is pinned
        let pkg = path.join("package.json");
        if pkg.exists() && out.is_empty() {
            out.extend(parse_package_json(&pkg)?);
        }

        Ok(out)
    }
}

/// Parse `package-lock.json` v2/v3 (the `packages` map).
///
/// The license comes from the lock entry, else from the installed
/// `node_modules/<pkg>/package.json`, else from its license file.
fn parse_package_lock_json(lock_path: &Path, project_root: &Path) -> Result<Vec<Dependency>> {
    let content = std::fs::read_to_string(lock_path)?;
    let json: Value = serde_json::from_str(&content)?;
    let mut deps = Vec::new();

    let Some(packages) = json.get("packages").and_then(Value::as_object) else {
        return Ok(deps);
    };

    for (pkg_path, info) in packages {
        // "" is the root project
        if pkg_path.is_empty() {
            continue;
        }

        // "node_modules/a/node_modules/@scope/b" → "@scope/b"
        let name = match pkg_path.rfind("node_modules/") {
            Some(at) => &pkg_path[at + "node_modules/".len()..],
            None => pkg_path.as_str(),
        };
        let version = info.get("version").and_then(Value::as_str).unwrap_or("*");

        let mut dep = dependency(name, version, Language::Node);
        if info.get("link").and_then(Value::as_bool) == Some(true) {
            dep.metadata.mark_local();
        }

        let installed = project_root.join(pkg_path);
        let license = info
            .get("license")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| read_license_from_package_json(&installed.join("package.json")))
            .or_else(|| detect::detect_in_dir(&installed).map(str::to_string));
        if let Some(license) = license {
            dep = dep.with_license(&license);
        }

        deps.push(dep);
    }

    Ok(deps)
}

fn read_license_from_package_json(path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    let json: Value = serde_json::from_str(&content).ok()?;
    match json.get("license")? {
        Value::String(s) => Some(s.clone()),
        // legacy { "type": "MIT", "url": ... }
        Value::Object(obj) => obj.get("type").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

/// Parse `yarn.lock` (v1 line format).
fn parse_yarn_lock(path: &Path) -> Result<Vec<Dependency>> {
    let content = std::fs::read_to_string(path)?;
    let mut deps = Vec::new();
    let mut lines = content.lines().peekable();

    // `foo@^1.0.0:` or `"@scope/foo@^1.0.0", "@scope/foo@^1.1.0":`
    let header_re = Regex::new(r#"^"?(@?[^@"]+)@"#)?;
    let version_re = Regex::new(r#"^\s+version:?\s+"?([^"\s]+)"?"#)?;

    while let Some(line) = lines.next() {
        if line.is_empty() || line.starts_with('#') || line.starts_with(' ') {
            continue;
        }
        let Some(caps) = header_re.captures(line) else {
            continue;
        };
        let name = caps[1].to_string();

        while let Some(next) = lines.peek() {
            if next.is_empty() || !next.starts_with(' ') {
                break;
            }
            if let Some(vcaps) = version_re.captures(next) {
                deps.push(dependency(&name, &vcaps[1], Language::Node));
                lines.next();
                break;
            }
            lines.next();
        }
    }

    Ok(deps)
}

/// Parse `package.json` `dependencies` and `devDependencies`.
///
/// Ranges are reduced to their first concrete version; `file:`, `link:`,
/// `workspace:` and wildcard specs are local.
fn parse_package_json(path: &Path) -> Result<Vec<Dependency>> {
    let content = std::fs::read_to_string(path)?;
    let json: Value = serde_json::from_str(&content)?;
    let mut deps = Vec::new();

    for section in ["dependencies", "devDependencies"] {
        let Some(pkgs) = json.get(section).and_then(Value::as_object) else {
            continue;
        };
        for (name, spec) in pkgs {
            let spec = spec.as_str().unwrap_or("*");
            let local = ["file:", "link:", "workspace:", "git+", "http:", "https:"]
                .iter()
                .any(|p| spec.starts_with(p));
            let version = if local {
                "*"
            } else {
                spec.trim_start_matches(|c: char| !c.is_ascii_digit() && c != '*')
                    .split_whitespace()
                    .next()
                    .unwrap_or("*")
            };
            deps.push(dependency(name, version, Language::Node));
        }
    }

    Ok(deps)
}
