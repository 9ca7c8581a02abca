//! Report renderers for analysis results.
//!
//! - [`terminal`] — colored, tabular output with summary box; respects `--verbose` / `--quiet`.
//! - [`json`] — the versioned JSON report consumed by CI tooling.

pub mod json;
pub mod terminal;
