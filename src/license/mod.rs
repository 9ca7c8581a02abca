//! License string normalization and SPDX-based risk classification.
//!
//! - [`spdx`] — maps canonical SPDX identifiers to [`LicenseRisk`](crate::models::LicenseRisk)
//!   and normalizes common non-SPDX strings.
//! - [`classifier`] — entry point for raw license strings including SPDX
//!   OR/AND expressions; derives `License.type`.
//! - [`detect`] — recognizes license file texts.

pub mod classifier;
pub mod detect;
pub mod spdx;
