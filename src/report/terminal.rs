use std::fmt::Write as _;
use std::path::Path;

use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use crate::license::classifier::classify;
use crate::models::{AnalysisResult, Dependency, Issue, IssueType, LicenseRisk, Severity};

/// Print a colored terminal report.
pub fn render(result: &AnalysisResult, path: &Path, verbose: bool, quiet: bool) {
    print!("{}", format_report(result, path, verbose, quiet));
}

pub fn format_report(result: &AnalysisResult, path: &Path, verbose: bool, quiet: bool) -> String {
    let mut out = String::new();
    let status = if result.passed {
        "PASSED".green().bold()
    } else {
        "FAILED".red().bold()
    };

    let license = result.count(IssueType::License);
    let cooling = result.count(IssueType::Cooling);
    let policy = result.count(IssueType::Policy);
    let notes = result.count(IssueType::Configuration);

    if quiet {
        let _ = writeln!(
            out,
            "{}  Dependencies: {}  License: {}  Cooling: {}  Policy: {}",
            status,
            result.dependencies.len(),
            license.to_string().red(),
            cooling.to_string().yellow(),
            policy.to_string().yellow(),
        );
        return out;
    }

    let _ = writeln!(out, "\n {} v{}", "depgate".bold(), env!("CARGO_PKG_VERSION"));
    let _ = writeln!(out, " Scanning: {}\n", path.display());

    let _ = writeln!(out, " ┌────────────────────────────────────────────────────┐");
    let _ = writeln!(out, " │  {:<48} │", "SUMMARY".bold());
    let rows = [
        format!("Dependencies       : {:>4}", result.dependencies.len()),
        format!("License violations : {:>4}", license),
        format!("Cooling violations : {:>4}", cooling),
        format!("Policy denials     : {:>4}", policy),
        format!("Notes              : {:>4}", notes),
        format!("Duration           : {:>4} ms", result.duration.as_millis()),
    ];
    for row in rows {
        let _ = writeln!(out, " │  {:<48} │", row);
    }
    let _ = writeln!(out, " │  {:<48} │", format!("Result             : {}", status));
    let _ = writeln!(out, " └────────────────────────────────────────────────────┘\n");

    if !result.issues.is_empty() {
        let _ = writeln!(out, " {} Issues:\n", "[ISSUES]".bold());
        let _ = writeln!(out, "{}\n", issue_table(&result.issues));
    }

    if verbose && !result.dependencies.is_empty() {
        let _ = writeln!(out, " {} All dependencies:\n", "[DEPS]".bold());
        let _ = writeln!(out, "{}\n", dependency_table(&result.dependencies));
    }

    out
}

fn header(titles: &[&str]) -> Vec<Cell> {
    titles
        .iter()
        .map(|t| Cell::new(t).add_attribute(Attribute::Bold))
        .collect()
}

fn new_table(titles: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header(titles));
    table
}

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Critical => Color::Magenta,
        Severity::High => Color::Red,
        Severity::Medium => Color::Yellow,
        Severity::Low => Color::Cyan,
        Severity::Info => Color::DarkGrey,
    }
}

/// Most severe first; ties keep their evaluation order.
fn issue_table(issues: &[Issue]) -> Table {
    let mut table = new_table(&["Severity", "Type", "Dependency", "Message"]);

    let mut sorted: Vec<&Issue> = issues.iter().collect();
    sorted.sort_by(|a, b| b.severity.cmp(&a.severity));

    for issue in sorted {
        let dependency = issue
            .dependency
            .as_ref()
            .map(Dependency::key)
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(issue.severity.as_str())
                .fg(severity_color(issue.severity))
                .set_alignment(CellAlignment::Center),
            Cell::new(issue.issue_type.to_string()),
            Cell::new(dependency),
            Cell::new(&issue.message),
        ]);
    }
    table
}

fn dependency_table(deps: &[Dependency]) -> Table {
    let mut table = new_table(&["Name", "Version", "Language", "License", "Risk", "Age (days)", "Downloads"]);

    for dep in deps {
        let license = dep.license_type().unwrap_or("unknown");
        let risk = classify(license);
        let risk_color = match risk {
            LicenseRisk::Permissive => Color::Green,
            LicenseRisk::WeakCopyleft => Color::Yellow,
            LicenseRisk::StrongCopyleft => Color::Red,
            LicenseRisk::Proprietary => Color::Magenta,
            LicenseRisk::Unknown => Color::DarkGrey,
        };

        let meta = &dep.metadata;
        let age = if meta.is_local() {
            "local".to_string()
        } else {
            match (meta.age_days(), meta.age_unknown()) {
                (Some(_), true) => "unknown".to_string(),
                (Some(days), false) => days.to_string(),
                (None, _) => "-".to_string(),
            }
        };
        let downloads = meta
            .total_downloads()
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());

        table.add_row(vec![
            Cell::new(dep.name()),
            Cell::new(dep.version()),
            Cell::new(dep.language().to_string()),
            Cell::new(license),
            Cell::new(risk.to_string()).fg(risk_color),
            Cell::new(age).set_alignment(CellAlignment::Right),
            Cell::new(downloads).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DependencyMetadata;
    use crate::testing::aged_dep;
    use std::time::Duration;

    fn result() -> AnalysisResult {
        let young = aged_dep("github.com/new/pkg", 2);
        let mut down = DependencyMetadata::default();
        down.record_registry_failure("connection refused");
        let unknown = aged_dep("github.com/down/pkg", 0).with_metadata(down);
        let issues = vec![
            Issue::configuration("Cargo.toml found without Cargo.lock"),
            Issue::new(IssueType::Cooling, Severity::High, "package is only 2 days old")
                .with_dependency(&young),
        ];
        AnalysisResult::new(vec![young, unknown], issues, Duration::from_millis(7))
    }

    #[test]
    fn test_quiet_is_one_line() {
        let text = format_report(&result(), Path::new("."), false, true);
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("FAILED"));
    }

    #[test]
    fn test_issues_are_listed_most_severe_first() {
        let text = format_report(&result(), Path::new("/app"), false, false);
        assert!(text.contains("/app"));
        let high = text.find("package is only 2 days old").unwrap();
        let info = text.find("Cargo.toml found without Cargo.lock").unwrap();
        assert!(high < info);
        assert!(!text.contains("All dependencies"));
    }

    #[test]
    fn test_verbose_lists_dependencies() {
        let text = format_report(&result(), Path::new("."), true, false);
        assert!(text.contains("All dependencies"));
        assert!(text.contains("github.com/down/pkg"));
        assert!(text.contains("unknown"));
    }
}
