//! Source records for fetched artifacts.
//!
//! Each resolved artifact becomes either a version-control reference (when it
//! is the package a VCS requirement names) or a file reference carrying the
//! index download URL and the artifact's SHA-256 digest.

use crate::artifact::digest::{Sha256Digest, compute_sha256};
use crate::artifact::naming::package_name;
use crate::error::{GeneratorError, Result};
use crate::fetch::FetchedArtifact;
use crate::index::IndexResolver;
use crate::requirement::{Requirement, VcsKind, canonical_name};
use log::{debug, warn};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Packaging tool that is always present in the build environment and never
/// recorded as a source.
pub const BOOTSTRAP_PACKAGE: &str = "setuptools";

/// Where one artifact in a module comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRecord {
    /// A version-control checkout.
    Vcs {
        /// Version-control system.
        kind: VcsKind,
        /// HTTPS URL of the repository.
        url: String,
        /// Pinned commit or revision, if the locator named one.
        revision: Option<String>,
    },
    /// A downloaded file verified by digest.
    File {
        /// Download URL published by the index.
        url: String,
        /// SHA-256 of the fetched file.
        sha256: Sha256Digest,
        /// Package name for external update checkers, when enabled.
        checker: Option<String>,
    },
}

impl Serialize for SourceRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Vcs {
                kind,
                url,
                revision,
            } => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("type", kind.as_str())?;
                map.serialize_entry("url", url)?;
                if let Some(revision) = revision {
                    map.serialize_entry(kind.revision_key(), revision)?;
                }
                map.end()
            }
            Self::File {
                url,
                sha256,
                checker,
            } => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("type", "file")?;
                map.serialize_entry("url", url)?;
                map.serialize_entry("sha256", sha256)?;
                if let Some(name) = checker {
                    map.serialize_entry("x-checker-data", &CheckerData { kind: "pypi", name })?;
                }
                map.end()
            }
        }
    }
}

/// `x-checker-data` block pointing an update checker at the index.
#[derive(serde::Serialize)]
struct CheckerData<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    name: &'a str,
}

/// An artifact that could not be turned into a source record.
#[derive(Debug)]
pub struct ArtifactFailure {
    /// Filename of the skipped artifact.
    pub filename: String,
    /// Why it was skipped.
    pub error: GeneratorError,
}

/// Records and failures for one requirement's artifacts.
#[derive(Debug, Default)]
pub struct Provenance {
    /// Source records in artifact order.
    pub records: Vec<SourceRecord>,
    /// Artifacts skipped with a caught error.
    pub failures: Vec<ArtifactFailure>,
}

/// Turns fetched artifacts into [`SourceRecord`]s.
pub struct ProvenanceBuilder<'r, 'i> {
    resolver: &'r IndexResolver<'i>,
    checker_data: bool,
}

impl<'r, 'i> ProvenanceBuilder<'r, 'i> {
    /// Create a builder that resolves file URLs through `resolver`.
    #[must_use]
    pub fn new(resolver: &'r IndexResolver<'i>, checker_data: bool) -> Self {
        Self {
            resolver,
            checker_data,
        }
    }

    /// Build a record for every artifact, catching per-artifact failures.
    pub fn build<'a>(
        &self,
        requirement: &Requirement,
        artifacts: impl IntoIterator<Item = &'a FetchedArtifact>,
    ) -> Provenance {
        let mut provenance = Provenance::default();
        for artifact in artifacts {
            match self.record(requirement, artifact) {
                Ok(Some(record)) => provenance.records.push(record),
                Ok(None) => {}
                Err(error) => {
                    warn!("skipping {}: {error}", artifact.filename());
                    provenance.failures.push(ArtifactFailure {
                        filename: artifact.filename().to_owned(),
                        error,
                    });
                }
            }
        }
        provenance
    }

    /// Build the record for a single artifact.
    ///
    /// Returns `Ok(None)` for the bootstrap packaging tool.
    ///
    /// # Errors
    ///
    /// Returns [`GeneratorError::UnsupportedArtifactFormat`] for unknown
    /// filenames, [`GeneratorError::Index`] when the index cannot supply the
    /// URL, or [`GeneratorError::Io`] when the file cannot be hashed.
    pub fn record(
        &self,
        requirement: &Requirement,
        artifact: &FetchedArtifact,
    ) -> Result<Option<SourceRecord>> {
        let filename = artifact.filename();
        let name = package_name(filename)?;
        if canonical_name(&name) == BOOTSTRAP_PACKAGE {
            debug!("skipping bootstrap package {filename}");
            return Ok(None);
        }

        // Build dependencies of a VCS requirement arrive as ordinary files.
        if let Some(locator) = requirement.vcs().filter(|_| requirement.matches_name(&name)) {
            return Ok(Some(SourceRecord::Vcs {
                kind: locator.kind(),
                url: locator.https_url(),
                revision: locator.revision().map(str::to_owned),
            }));
        }

        let sha256 = compute_sha256(artifact.path())?;
        let url = self.resolver.resolve_url(&name, filename)?;
        Ok(Some(SourceRecord::File {
            url,
            sha256,
            checker: self.checker_data.then_some(name),
        }))
    }
}

#[cfg(test)]
#[path = "provenance_tests.rs"]
mod tests;
