//! Requirement-to-manifest pipeline.
//!
//! [`Generator`] carries everything one run needs: the options, the
//! downloader that drives the package manager and the index resolver with its
//! per-run metadata cache. Requirements are processed one at a time, each in
//! its own scratch directory, and every recoverable failure is collected into
//! the [`GenerationReport`] instead of aborting the run.

use crate::config::GeneratorOptions;
use crate::error::GeneratorError;
use crate::fetch::{PackageDownloader, fetch_requirement};
use crate::index::{IndexResolver, PackageIndex};
use crate::manifest::{Manifest, ModuleRecord, output_name};
use crate::provenance::ProvenanceBuilder;
use crate::requirement::Requirement;
use log::{info, warn};
use std::fmt;

/// A caught failure attributed to a module and, where relevant, an artifact.
#[derive(Debug)]
pub struct Failure {
    /// Name of the module being generated.
    pub module: String,
    /// Artifact filename, when the failure concerns a single file.
    pub artifact: Option<String>,
    /// What went wrong.
    pub error: GeneratorError,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.artifact {
            Some(artifact) => write!(f, "{}: {artifact}: {}", self.module, self.error),
            None => write!(f, "{}: {}", self.module, self.error),
        }
    }
}

/// Result of a run: the manifest and everything that went wrong on the way.
#[derive(Debug)]
pub struct GenerationReport {
    /// Output name, without the `.json` extension.
    pub output_name: String,
    /// The assembled document, possibly with incomplete modules.
    pub manifest: Manifest,
    /// Caught failures in the order they occurred.
    pub failures: Vec<Failure>,
}

impl GenerationReport {
    /// Return true when every requirement was processed without a failure.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Drives manifest generation for a batch of requirements.
pub struct Generator<'a> {
    options: &'a GeneratorOptions,
    downloader: &'a dyn PackageDownloader,
    resolver: IndexResolver<'a>,
}

impl<'a> Generator<'a> {
    /// Create a generator with injected package-manager and index access.
    #[must_use]
    pub fn new(
        options: &'a GeneratorOptions,
        downloader: &'a dyn PackageDownloader,
        index: &'a dyn PackageIndex,
    ) -> Self {
        Self {
            options,
            downloader,
            resolver: IndexResolver::new(index),
        }
    }

    /// Generate the manifest for `requirements`.
    ///
    /// Requirements named in the ignore list are dropped first. Each
    /// remaining requirement yields exactly one module record, even when its
    /// fetch or some of its artifacts failed.
    pub fn generate(&self, requirements: &[Requirement]) -> GenerationReport {
        let selected: Vec<Requirement> = requirements
            .iter()
            .filter(|requirement| !self.is_ignored(requirement))
            .cloned()
            .collect();

        let mut failures = Vec::new();
        let modules: Vec<ModuleRecord> = selected
            .iter()
            .map(|requirement| self.process(requirement, &mut failures))
            .collect();

        let name = output_name(self.options, &selected);
        GenerationReport {
            manifest: Manifest::assemble(&name, modules),
            output_name: name,
            failures,
        }
    }

    fn is_ignored(&self, requirement: &Requirement) -> bool {
        let ignored = self
            .options
            .ignored_packages
            .iter()
            .any(|name| requirement.matches_name(name));
        if ignored {
            info!("ignoring {}", requirement.name());
        }
        ignored
    }

    /// Fetch one requirement into a scratch directory and build its module.
    fn process(&self, requirement: &Requirement, failures: &mut Vec<Failure>) -> ModuleRecord {
        let module = self.options.python.module_name(requirement.name());
        let mut fail = |artifact: Option<&str>, error: GeneratorError| {
            failures.push(Failure {
                module: module.clone(),
                artifact: artifact.map(str::to_owned),
                error,
            });
        };

        // Removed on drop, whichever way this function returns.
        let scratch = match tempfile::Builder::new()
            .prefix(&format!("pip-generator-{module}-"))
            .tempdir()
        {
            Ok(dir) => dir,
            Err(err) => {
                warn!("cannot create scratch directory for {module}: {err}");
                fail(None, err.into());
                return ModuleRecord::new(requirement, self.options, Vec::new());
            }
        };

        info!("generating {module}");
        let mut outcome = fetch_requirement(requirement, scratch.path(), self.downloader);
        if let Some(err) = outcome.take_failure() {
            fail(None, err);
        }
        for artifact in outcome.failed() {
            fail(
                Some(artifact.filename()),
                GeneratorError::PlatformSpecificArtifact {
                    filename: artifact.filename().to_owned(),
                },
            );
        }

        let provenance = ProvenanceBuilder::new(&self.resolver, self.options.checker_data)
            .build(requirement, outcome.resolved());
        for failure in provenance.failures {
            fail(Some(&failure.filename), failure.error);
        }

        ModuleRecord::new(requirement, self.options, provenance.records)
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
