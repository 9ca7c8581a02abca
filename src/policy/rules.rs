//! Declarative deny-rules compiled from a policy document.
//!
//! Each rule ranges over `dependencies[]` in a facts document
//! (`{ "dependencies": [...], "policy": {...} }`) and denies every dependency
//! for which all of its conditions hold. Operands address the current
//! dependency (`dep.<path>`), the policy (`policy.<path>`) or a literal, so
//! the rules read the same facts the report serializes.

use std::fmt;

use chrono::NaiveDate;
use serde_json::Value;

use super::PolicyDocument;
use crate::cooling::{find_exception, CoolingException};
use crate::models::Severity;

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Dotted path into the current dependency fact.
    Dep(String),
    /// Dotted path into the policy fact.
    Policy(String),
    Literal(Value),
}

impl Operand {
    fn dep(path: &str) -> Self {
        Operand::Dep(path.to_string())
    }

    fn policy(path: &str) -> Self {
        Operand::Policy(path.to_string())
    }

    fn resolve<'a>(&'a self, dep: &'a Value, policy: &'a Value) -> Option<&'a Value> {
        let value = match self {
            Operand::Dep(path) => lookup(dep, path),
            Operand::Policy(path) => lookup(policy, path),
            Operand::Literal(value) => Some(value),
        }?;
        (!value.is_null()).then_some(value)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Dep(path) => write!(f, "dep.{path}"),
            Operand::Policy(path) => write!(f, "input.policy.{path}"),
            Operand::Literal(value) => write!(f, "{value}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// The operand resolves to a non-null value.
    Exists(Operand),
    Eq(Operand, Operand),
    /// Numeric less-than; false unless both sides are numbers.
    Lt(Operand, Operand),
    /// Left value is an element of the right-hand list.
    In(Operand, Operand),
    Not(Box<Condition>),
    /// The name matches a non-expired cooling exception in the list.
    ExceptionMatch { name: Operand, exceptions: Operand },
}

impl Condition {
    fn holds(&self, dep: &Value, policy: &Value, today: NaiveDate) -> bool {
        match self {
            Condition::Exists(op) => op.resolve(dep, policy).is_some(),
            Condition::Eq(a, b) => match (a.resolve(dep, policy), b.resolve(dep, policy)) {
                (Some(a), Some(b)) => values_equal(a, b),
                _ => false,
            },
            Condition::Lt(a, b) => {
                let a = a.resolve(dep, policy).and_then(Value::as_f64);
                let b = b.resolve(dep, policy).and_then(Value::as_f64);
                matches!((a, b), (Some(a), Some(b)) if a < b)
            }
            Condition::In(item, list) => {
                match (item.resolve(dep, policy), list.resolve(dep, policy)) {
                    (Some(item), Some(Value::Array(list))) => {
                        list.iter().any(|candidate| values_equal(item, candidate))
                    }
                    _ => false,
                }
            }
            Condition::Not(inner) => !inner.holds(dep, policy, today),
            Condition::ExceptionMatch { name, exceptions } => {
                let Some(name) = name.resolve(dep, policy).and_then(Value::as_str) else {
                    return false;
                };
                let Some(Value::Array(raw)) = exceptions.resolve(dep, policy) else {
                    return false;
                };
                let exceptions: Vec<CoolingException> = raw
                    .iter()
                    .filter_map(|e| serde_json::from_value(e.clone()).ok())
                    .collect();
                find_exception(name, &exceptions, today).is_some()
            }
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Exists(op) => write!(f, "{op}"),
            Condition::Eq(a, b) => write!(f, "{a} == {b}"),
            Condition::Lt(a, b) => write!(f, "{a} < {b}"),
            Condition::In(a, b) => write!(f, "{a} == {b}[_]"),
            Condition::Not(inner) => write!(f, "not {inner}"),
            Condition::ExceptionMatch { name, exceptions } => {
                write!(f, "exception_match({name}, {exceptions})")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DenyRule {
    pub name: String,
    pub severity: Severity,
    pub conditions: Vec<Condition>,
    /// Message with `{dep.<path>}` / `{policy.<path>}` placeholders.
    pub message: String,
}

/// One denial produced by a rule for one dependency.
#[derive(Debug, Clone, PartialEq)]
pub struct Denial {
    pub rule: String,
    pub severity: Severity,
    pub message: String,
    /// Index into the evaluated `dependencies[]`.
    pub dependency_index: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    rules: Vec<DenyRule>,
}

impl RuleSet {
    /// Compile a policy document: one rule for the forbidden-license check
    /// and one per configured cooling threshold.
    pub fn compile(document: &PolicyDocument) -> Self {
        let mut rules = Vec::new();

        if !document.licenses.forbidden.is_empty() {
            rules.push(DenyRule {
                name: "forbidden_license".to_string(),
                severity: Severity::High,
                conditions: vec![
                    Condition::Exists(Operand::dep("license.type")),
                    Condition::In(
                        Operand::dep("license.type"),
                        Operand::policy("licenses.forbidden"),
                    ),
                ],
                message: "dependency {dep.name}@{dep.version} uses forbidden license {dep.license.type}"
                    .to_string(),
            });
        }

        let cooling = &document.cooling;
        if cooling.enabled {
            let soften = |severity: Severity| {
                if cooling.alert_only {
                    Severity::Low
                } else {
                    severity
                }
            };
            let guards = || {
                vec![
                    Condition::Not(Box::new(Condition::Eq(
                        Operand::dep("metadata.is_local"),
                        Operand::Literal(Value::Bool(true)),
                    ))),
                    Condition::Not(Box::new(Condition::ExceptionMatch {
                        name: Operand::dep("name"),
                        exceptions: Operand::policy("cooling.exceptions"),
                    })),
                ]
            };
            let thresholds = [
                (
                    "min_age_days",
                    cooling.min_age_days,
                    "metadata.age_days",
                    Severity::High,
                    "dependency {dep.name}@{dep.version} is {dep.metadata.age_days} days old, policy requires at least {policy.cooling.min_age_days}",
                ),
                (
                    "min_downloads",
                    cooling.min_downloads,
                    "metadata.total_downloads",
                    Severity::Medium,
                    "dependency {dep.name}@{dep.version} has {dep.metadata.total_downloads} total downloads, policy requires at least {policy.cooling.min_downloads}",
                ),
                (
                    "min_downloads_recent",
                    cooling.min_downloads_recent,
                    "metadata.recent_downloads",
                    Severity::Medium,
                    "dependency {dep.name}@{dep.version} has {dep.metadata.recent_downloads} recent downloads, policy requires at least {policy.cooling.min_downloads_recent}",
                ),
            ];

            for (key, threshold, field, severity, message) in thresholds {
                if threshold <= 0 {
                    continue;
                }
                let mut conditions = guards();
                conditions.push(Condition::Exists(Operand::dep(field)));
                conditions.push(Condition::Lt(
                    Operand::dep(field),
                    Operand::policy(&format!("cooling.{key}")),
                ));
                rules.push(DenyRule {
                    name: key.to_string(),
                    severity: soften(severity),
                    conditions,
                    message: message.to_string(),
                });
            }
        }

        RuleSet { rules }
    }

    pub fn rules(&self) -> &[DenyRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluate every rule against every dependency in `facts`.
    pub fn evaluate(&self, facts: &Value, today: NaiveDate) -> Vec<Denial> {
        let empty = Vec::new();
        let dependencies = facts
            .get("dependencies")
            .and_then(Value::as_array)
            .unwrap_or(&empty);
        let policy = facts.get("policy").unwrap_or(&Value::Null);

        let mut denials = Vec::new();
        for rule in &self.rules {
            for (index, dep) in dependencies.iter().enumerate() {
                if rule.conditions.iter().all(|c| c.holds(dep, policy, today)) {
                    denials.push(Denial {
                        rule: rule.name.clone(),
                        severity: rule.severity,
                        message: render(&rule.message, dep, policy),
                        dependency_index: index,
                    });
                }
            }
        }
        denials
    }
}

impl fmt::Display for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rule in &self.rules {
            writeln!(f, "# {} ({})", rule.name, rule.severity)?;
            writeln!(f, "deny[msg] {{")?;
            writeln!(f, "  dep := input.dependencies[_]")?;
            for condition in &rule.conditions {
                writeln!(f, "  {condition}")?;
            }
            writeln!(f, "  msg := {:?}", rule.message)?;
            writeln!(f, "}}")?;
        }
        Ok(())
    }
}

fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(root, |value, key| value.get(key))
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Substitute `{dep.<path>}` and `{policy.<path>}` placeholders.
/// Unresolvable placeholders render as `?`.
fn render(template: &str, dep: &Value, policy: &Value) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let Some(len) = rest[start..].find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let placeholder = &rest[start + 1..start + len];
        let value = if let Some(path) = placeholder.strip_prefix("dep.") {
            lookup(dep, path)
        } else if let Some(path) = placeholder.strip_prefix("policy.") {
            lookup(policy, path)
        } else {
            None
        };
        match value {
            Some(Value::String(s)) => out.push_str(s),
            Some(Value::Null) | None => out.push('?'),
            Some(other) => out.push_str(&other.to_string()),
        }
        rest = &rest[start + len + 1..];
    }
    out.push_str(rest);
    out
}
