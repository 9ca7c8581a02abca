//! `depgate` — supply-chain dependency governance.
//!
//! Analyzers extract dependencies from each language's manifests and lock
//! files, [`enrich`] attaches registry cooling metadata, and the
//! [`policy`] engine turns a policy document into [`models::Issue`]s.
//! The binary renders the result with [`report`].

pub mod analyzer;
pub mod cli;
pub mod config;
pub mod cooling;
pub mod detector;
pub mod enrich;
pub mod error;
pub mod license;
pub mod models;
pub mod orchestrator;
pub mod policy;
pub mod registry;
pub mod report;

#[cfg(test)]
mod testing;
