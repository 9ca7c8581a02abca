//! Version-tag conventions.
//!
//! Some registries key releases by `v1.2.3`, others by `1.2.3`. A lookup
//! tries the ecosystem's preferred form first and, on a not-found answer,
//! retries once with the other form.

use std::future::Future;

use super::error::RegistryError;
use super::Metadata;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagStyle {
    /// `v1.2.3` (Go module proxy, GitHub release tags)
    Prefixed,
    /// `1.2.3` (npm, PyPI, crates.io, NuGet)
    Bare,
}

/// Preferred and alternate spellings of `version`.
///
/// The alternate is `None` when the version does not start with a digit
/// after an optional `v` (e.g. `main`, `latest`), since prefixing those is
/// meaningless.
pub fn candidates(version: &str, style: TagStyle) -> (String, Option<String>) {
    let version = version.trim();
    let bare = version
        .strip_prefix('v')
        .or_else(|| version.strip_prefix('V'))
        .filter(|rest| rest.starts_with(|c: char| c.is_ascii_digit()));

    match (bare, style) {
        (Some(bare), TagStyle::Prefixed) => (version.to_string(), Some(bare.to_string())),
        (Some(bare), TagStyle::Bare) => (bare.to_string(), Some(version.to_string())),
        (None, _) if !version.starts_with(|c: char| c.is_ascii_digit()) => {
            (version.to_string(), None)
        }
        (None, TagStyle::Prefixed) => (format!("v{version}"), Some(version.to_string())),
        (None, TagStyle::Bare) => (version.to_string(), Some(format!("v{version}"))),
    }
}

/// Run `fetch` with the preferred spelling, then once with the alternate if
/// the first attempt was not found.
pub async fn with_tag_fallback<F, Fut>(
    version: &str,
    style: TagStyle,
    mut fetch: F,
) -> Result<Metadata, RegistryError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<Metadata, RegistryError>>,
{
    let (primary, alternate) = candidates(version, style);
    match fetch(primary).await {
        Err(RegistryError::NotFound { name, version }) => match alternate {
            Some(alt) => {
                tracing::debug!(%name, %version, %alt, "retrying lookup with alternate tag");
                fetch(alt).await
            }
            None => Err(RegistryError::NotFound { name, version }),
        },
        other => other,
    }
}
