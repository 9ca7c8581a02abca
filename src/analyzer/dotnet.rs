use std::path::Path;

use anyhow::Result;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;

use super::{dependency, AnalyzerOutput};
use crate::models::{Dependency, Language};

/// Analyzer for .NET projects using NuGet or Paket.
///
/// Supports three manifest formats:
/// - SDK-style `*.csproj` / `*.fsproj` (`<PackageReference>` elements)
/// - Legacy `packages.config` (`<package>` elements)
/// - `paket.lock` (NUGET section entries)
///
/// All `.csproj` / `.fsproj` files directly under the project root are scanned.
pub struct DotNetAnalyzer;

impl DotNetAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl super::Analyzer for DotNetAnalyzer {
    fn language(&self) -> Language {
        Language::DotNet
    }

    fn analyze(&self, path: &Path) -> Result<AnalyzerOutput> {
        let mut out = AnalyzerOutput::default();

        let mut projects: Vec<_> = std::fs::read_dir(path)?
            .flatten()
            .map(|entry| entry.path())
            .filter(|p| {
                matches!(
                    p.extension().and_then(|s| s.to_str()),
                    Some("csproj" | "fsproj")
                )
            })
            .collect();
        projects.sort();

        for project in projects {
            match read_xml_packages(&project, "PackageReference", "Include", "Version") {
                Ok(deps) => out.extend(deps),
                Err(e) => out.note(format!("{} could not be parsed: {e}", project.display())),
            }
        }

        let packages_config = path.join("packages.config");
        if packages_config.exists() {
            match read_xml_packages(&packages_config, "package", "id", "version") {
                Ok(deps) => out.extend(deps),
                Err(e) => out.note(format!("packages.config could not be parsed: {e}")),
            }
        }

        let paket_lock = path.join("paket.lock");
        if paket_lock.exists() {
            match parse_paket_lock(&paket_lock) {
                Ok(deps) => out.extend(deps),
                Err(e) => out.note(format!("paket.lock could not be parsed: {e}")),
            }
        }

        Ok(out)
    }
}

/// Exact version out of a NuGet version spec: `1.2.3`, `[1.2.3]`, or the
/// lower bound of `[1.2.3, 2.0)`. Floating versions (`1.*`) are unresolved.
fn nuget_version(spec: &str) -> &str {
    let spec = spec
        .trim()
        .trim_start_matches(['[', '('])
        .split(',')
        .next()
        .unwrap_or("")
        .trim_end_matches([']', ')'])
        .trim();
    if spec.contains('*') {
        "*"
    } else {
        spec
    }
}

fn attribute(e: &BytesStart<'_>, name: &str) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == name.as_bytes())
        .and_then(|attr| attr.unescape_value().ok())
        .map(|v| v.into_owned())
}

/// Collect `<element name_attr=".." version_attr=".."/>` entries.
///
/// The version may also be given as a child element
/// (`<PackageReference Include="x"><Version>1.0.0</Version></PackageReference>`).
/// A reference without any version (central package management) is local.
fn read_xml_packages(
    path: &Path,
    element: &str,
    name_attr: &str,
    version_attr: &str,
) -> Result<Vec<Dependency>> {
    let content = std::fs::read_to_string(path)?;
    let mut reader = Reader::from_str(&content);
    reader.config_mut().trim_text(true);

    let mut deps = Vec::new();
    // (name, version) of a non-empty element still waiting for its end tag
    let mut open: Option<(String, Option<String>)> = None;
    let mut in_version = false;

    loop {
        match reader.read_event()? {
            Event::Empty(e) if e.local_name().as_ref() == element.as_bytes() => {
                if let Some(name) = attribute(&e, name_attr) {
                    let version = attribute(&e, version_attr).unwrap_or_default();
                    deps.push(dependency(&name, nuget_version(&version), Language::DotNet));
                }
            }
            Event::Start(e) if e.local_name().as_ref() == element.as_bytes() => {
                open = attribute(&e, name_attr).map(|name| (name, attribute(&e, version_attr)));
            }
            Event::Start(e) if open.is_some() && e.local_name().as_ref() == version_attr.as_bytes() => {
                in_version = true;
            }
            Event::Text(t) if in_version => {
                if let Some((_, version)) = open.as_mut() {
                    *version = Some(t.unescape()?.into_owned());
                }
            }
            Event::End(e) if e.local_name().as_ref() == version_attr.as_bytes() => {
                in_version = false;
            }
            Event::End(e) if e.local_name().as_ref() == element.as_bytes() => {
                if let Some((name, version)) = open.take() {
                    let version = version.unwrap_or_default();
                    deps.push(dependency(&name, nuget_version(&version), Language::DotNet));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(deps)
}

/// Parse `paket.lock` — NUGET section entries like `    PackageName (1.2.3)`.
fn parse_paket_lock(path: &Path) -> Result<Vec<Dependency>> {
    let content = std::fs::read_to_string(path)?;
    // exactly four spaces: transitive requirements are indented further
    let re = Regex::new(r"^ {4}(\S+)\s+\(([^)]+)\)")?;
    let mut deps = Vec::new();
    let mut in_nuget = false;

    for line in content.lines() {
        if !line.starts_with(' ') && !line.is_empty() {
            in_nuget = line.trim_end() == "NUGET";
            continue;
        }
        if in_nuget {
            if let Some(caps) = re.captures(line) {
                deps.push(dependency(&caps[1], nuget_version(&caps[2]), Language::DotNet));
            }
        }
    }

    Ok(deps)
}
