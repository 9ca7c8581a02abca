use std::path::Path;

use chrono::{NaiveDate, Utc};
use serde_json::json;

use super::rules::RuleSet;
use super::PolicyDocument;
use crate::cooling::{self, ViolationKind};
use crate::models::{Dependency, Issue, IssueType, Severity};

/// Evaluates a [`PolicyDocument`] against a dependency inventory.
///
/// Two independent paths run over the same facts: the direct checks
/// (forbidden licenses and the cooling checker) and the compiled rule set.
/// [`PolicyEngine::evaluate`] concatenates both without de-duplication.
pub struct PolicyEngine {
    document: PolicyDocument,
    rules: RuleSet,
    today: NaiveDate,
}

impl PolicyEngine {
    pub fn new(document: PolicyDocument) -> Self {
        let rules = RuleSet::compile(&document);
        tracing::debug!(rules = rules.rules().len(), "compiled policy rules\n{rules}");
        Self {
            document,
            rules,
            today: Utc::now().date_naive(),
        }
    }

    /// Evaluate exception expiry as of `today` instead of the current date.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn document(&self) -> &PolicyDocument {
        &self.document
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn evaluate(&self, dependencies: &[Dependency]) -> Vec<Issue> {
        let mut issues = self.evaluate_direct(dependencies);
        issues.extend(self.evaluate_rules(dependencies));
        issues
    }

    pub fn evaluate_direct(&self, dependencies: &[Dependency]) -> Vec<Issue> {
        let forbidden = &self.document.licenses.forbidden;
        let cooling = &self.document.cooling;
        let mut issues = Vec::new();

        for dep in dependencies {
            if let Some(license_type) = dep.license_type() {
                if forbidden.iter().any(|f| f == license_type) {
                    issues.push(
                        Issue::new(
                            IssueType::License,
                            Severity::Critical,
                            format!(
                                "{}@{} uses forbidden license {}",
                                dep.name(),
                                dep.version(),
                                license_type
                            ),
                        )
                        .with_dependency(dep),
                    );
                }
            }

            if !cooling.enabled || dep.metadata.is_local() {
                continue;
            }

            let result = cooling::check_at(dep, cooling, self.today);
            if let Some(exception) = &result.exception {
                tracing::debug!(
                    package = dep.name(),
                    pattern = %exception.pattern,
                    reason = %exception.reason,
                    "cooling exception applied"
                );
            }

            for violation in result.violations {
                let mut severity = violation.severity;
                if violation.kind == ViolationKind::AgeViolation
                    && cooling.grace_period_days > 0
                    && violation.actual + cooling.grace_period_days >= violation.threshold
                {
                    severity = Severity::Medium;
                }
                if cooling.alert_only {
                    severity = Severity::Low;
                }
                issues.push(
                    Issue::new(
                        IssueType::Cooling,
                        severity,
                        format!("{}@{}: {}", dep.name(), dep.version(), violation.message),
                    )
                    .with_dependency(dep),
                );
            }
        }

        issues
    }

    pub fn evaluate_rules(&self, dependencies: &[Dependency]) -> Vec<Issue> {
        if self.rules.is_empty() {
            return Vec::new();
        }

        let facts = json!({
            "dependencies": serde_json::to_value(dependencies).unwrap_or_default(),
            "policy": serde_json::to_value(&self.document).unwrap_or_default(),
        });

        self.rules
            .evaluate(&facts, self.today)
            .into_iter()
            .map(|denial| {
                let issue = Issue::new(IssueType::Policy, denial.severity, denial.message);
                match dependencies.get(denial.dependency_index) {
                    Some(dep) => issue.with_dependency(dep),
                    None => issue,
                }
            })
            .collect()
    }
}

/// Load the policy at `path` and evaluate it.
///
/// A policy that cannot be read or parsed is never fatal: it yields a
/// single configuration issue and nothing is enforced.
pub fn evaluate_policy_file(path: &Path, dependencies: &[Dependency]) -> Vec<Issue> {
    match PolicyDocument::load(path) {
        Ok((document, mut issues)) => {
            issues.extend(PolicyEngine::new(document).evaluate(dependencies));
            issues
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), %e, "policy not enforced");
            vec![Issue::configuration(format!("policy not enforced: {e}"))]
        }
    }
}
