//! Fetched artifact inspection.
//!
//! # Sub-modules
//!
//! - [`naming`] - package names and generic-binary detection from filenames.
//! - [`digest`] - streaming SHA-256 digests (`Sha256Digest`).

pub mod digest;
pub mod naming;
