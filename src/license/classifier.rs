use crate::license::spdx::{classify_spdx_id, normalize};
use crate::models::LicenseRisk;

/// Type recorded for licenses that could not be classified.
pub const UNKNOWN: &str = "Unknown";

/// Classify a license string (raw or SPDX) into a risk level.
///
/// Handles:
/// - SPDX identifiers (MIT, Apache-2.0, etc.)
/// - SPDX OR expressions (MIT OR Apache-2.0)  → most permissive wins
/// - SPDX AND expressions (MIT AND GPL-3.0)  → most restrictive wins
/// - Proprietary/commercial strings
/// - Empty / unknown
pub fn classify(license: &str) -> LicenseRisk {
    let trimmed = license.trim();
    if is_blank(trimmed) {
        return LicenseRisk::Unknown;
    }
    if is_proprietary(trimmed) {
        return LicenseRisk::Proprietary;
    }

    let expression = expression(trimmed);
    if expression.contains(" OR ") {
        return expression
            .split(" OR ")
            .map(classify_single)
            .min_by_key(permissive_rank)
            .unwrap_or(LicenseRisk::Unknown);
    }
    if expression.contains(" AND ") {
        return expression
            .split(" AND ")
            .map(classify_single)
            .min_by_key(restrictive_rank)
            .unwrap_or(LicenseRisk::Unknown);
    }
    classify_single(&expression)
}

/// Derive the normalized `License.type` for a raw license string.
///
/// A recognized identifier or expression comes back in canonical SPDX form
/// (`MIT`, `MIT OR Apache-2.0`); anything else is [`UNKNOWN`].
pub fn license_type(raw: &str) -> String {
    let trimmed = raw.trim();
    if is_blank(trimmed) {
        return UNKNOWN.to_string();
    }
    if is_proprietary(trimmed) {
        return "Proprietary".to_string();
    }

    let single = normalize(trimmed);
    if classify_spdx_id(&single) != LicenseRisk::Unknown {
        return single;
    }
    canonical(&expression(trimmed)).unwrap_or_else(|| UNKNOWN.to_string())
}

fn is_blank(s: &str) -> bool {
    s.is_empty() || s.eq_ignore_ascii_case("unknown") || s == "NOASSERTION"
}

fn is_proprietary(s: &str) -> bool {
    let lower = s.to_lowercase();
    lower.contains("proprietary") || lower.contains("commercial") || s == "UNLICENSED"
}

/// `MIT/Apache-2.0` and `MIT or Apache-2.0` are written as SPDX `OR`.
fn expression(s: &str) -> String {
    normalize(s)
        .replace('/', " OR ")
        .replace(" or ", " OR ")
        .replace(" and ", " AND ")
}

fn canonical(expr: &str) -> Option<String> {
    for op in [" OR ", " AND "] {
        if expr.contains(op) {
            let parts = expr
                .split(op)
                .map(canonical)
                .collect::<Option<Vec<_>>>()?;
            return Some(parts.join(op));
        }
    }

    let expr = expr.trim().trim_matches(|c| c == '(' || c == ')').trim();
    let (base, exception) = match expr.split_once(" WITH ") {
        Some((base, exception)) => (base, Some(exception.trim())),
        None => (expr, None),
    };
    let id = normalize(base);
    if classify_spdx_id(&id) == LicenseRisk::Unknown {
        return None;
    }
    Some(match exception {
        Some(exception) => format!("{id} WITH {exception}"),
        None => id,
    })
}

fn classify_single(id: &str) -> LicenseRisk {
    // "GPL-2.0 WITH Classpath-exception-2.0" classifies as its base license
    let id = id.trim().trim_matches(|c| c == '(' || c == ')');
    let base = id.split(" WITH ").next().unwrap_or(id);
    classify_spdx_id(&normalize(base))
}

fn permissive_rank(risk: &LicenseRisk) -> u8 {
    match risk {
        LicenseRisk::Permissive => 0,
        LicenseRisk::WeakCopyleft => 1,
        LicenseRisk::StrongCopyleft => 2,
        LicenseRisk::Proprietary => 3,
        LicenseRisk::Unknown => 4,
    }
}

fn restrictive_rank(risk: &LicenseRisk) -> u8 {
    match risk {
        LicenseRisk::Proprietary => 0,
        LicenseRisk::StrongCopyleft => 1,
        LicenseRisk::WeakCopyleft => 2,
        LicenseRisk::Permissive => 3,
        LicenseRisk::Unknown => 4,
    }
}
