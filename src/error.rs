//! Error types for failures that abort an analysis or a policy load.
//!
//! Registry lookup errors live in [`crate::registry::RegistryError`]; they
//! never abort a run.

use std::path::PathBuf;

use thiserror::Error;

/// Failures that stop an analysis run.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The target has no manifest for any supported ecosystem.
    #[error("no supported project manifests found in {}", .0.display())]
    NoManifest(PathBuf),

    /// A severity outside `critical|high|medium|low|info`.
    #[error("invalid severity value: {0:?}")]
    InvalidSeverity(String),
}

/// Failures loading a policy document.
///
/// The policy engine converts these into a single `configuration` issue.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("cannot read policy file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse policy file {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
}
