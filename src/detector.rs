use std::path::Path;

use crate::models::Language;

/// Auto-detect supported languages by scanning for known manifest files.
pub fn detect_languages(path: &Path) -> Vec<Language> {
    let mut languages = Vec::new();
    let has = |file: &str| path.join(file).exists();

    if has("go.mod") {
        languages.push(Language::Go);
    }

    if has("package.json") || has("package-lock.json") || has("yarn.lock") {
        languages.push(Language::Node);
    }

    if has("requirements.txt") || has("pyproject.toml") || has("Pipfile.lock") {
        languages.push(Language::Python);
    }

    if has("Cargo.toml") || has("Cargo.lock") {
        languages.push(Language::Rust);
    }

    if has("packages.config") || has("paket.lock") || has_project_file(path) {
        languages.push(Language::DotNet);
    }

    if has_workflows(path) {
        languages.push(Language::Actions);
    }

    languages
}

fn has_project_file(path: &Path) -> bool {
    std::fs::read_dir(path)
        .map(|entries| {
            entries.flatten().any(|entry| {
                matches!(
                    entry.path().extension().and_then(|e| e.to_str()),
                    Some("csproj" | "fsproj")
                )
            })
        })
        .unwrap_or(false)
}

fn has_workflows(path: &Path) -> bool {
    std::fs::read_dir(path.join(".github").join("workflows"))
        .map(|entries| {
            entries.flatten().any(|entry| {
                matches!(
                    entry.path().extension().and_then(|e| e.to_str()),
                    Some("yml" | "yaml")
                )
            })
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_each_manifest() {
        let root = tempfile::tempdir().unwrap();
        assert!(detect_languages(root.path()).is_empty());

        std::fs::write(root.path().join("go.mod"), "module x\n").unwrap();
        std::fs::write(root.path().join("App.csproj"), "<Project/>").unwrap();
        std::fs::create_dir_all(root.path().join(".github/workflows")).unwrap();
        std::fs::write(root.path().join(".github/workflows/ci.yml"), "jobs: {}").unwrap();

        assert_eq!(
            detect_languages(root.path()),
            vec![Language::Go, Language::DotNet, Language::Actions]
        );
    }

    #[test]
    fn test_empty_workflow_dir_is_not_detected() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join(".github/workflows")).unwrap();
        assert!(detect_languages(root.path()).is_empty());
    }
}
