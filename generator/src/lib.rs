//! Flatpak pip generator library.
//!
//! Turns Python requirements into Flatpak module manifests whose sources are
//! pinned by URL and SHA-256. It is used by the `flatpak-pip-generator` CLI
//! binary and can be driven programmatically by injecting a
//! [`fetch::PackageDownloader`] and an [`index::PackageIndex`].
//!
//! # Modules
//!
//! - [`artifact`] - Package names and digests of fetched files
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - Generation options
//! - [`error`] - Error types and the run-abort policy
//! - [`executor`] - External command execution with timeouts
//! - [`fetch`] - Package-manager downloads with the source fallback
//! - [`index`] - Package index metadata lookups
//! - [`logging`] - Stderr diagnostics via `tracing-subscriber`
//! - [`manifest`] - Module records and the output document
//! - [`output`] - Operator-facing messages
//! - [`pipeline`] - Requirement-to-manifest orchestration
//! - [`provenance`] - Source records for fetched artifacts
//! - [`requirement`] - Requirement parsing

pub mod artifact;
pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod fetch;
pub mod index;
pub mod logging;
pub mod manifest;
pub mod output;
pub mod pipeline;
pub mod provenance;
pub mod requirement;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
