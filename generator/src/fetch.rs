//! Artifact fetching with a forced-source fallback.
//!
//! A requirement is first downloaded allowing pre-built binaries. Any
//! artifact that is not generic (a `.tar.gz` archive or a
//! platform-independent wheel) is discarded and the requirement is
//! downloaded once more with binaries disabled. Each artifact moves through
//! an explicit [`ArtifactState`] so the policy can be inspected after the
//! fact.

use crate::artifact::naming::{ArtifactKind, artifact_kind, is_generic};
use crate::config::PythonVersion;
use crate::error::{GeneratorError, Result};
use crate::executor::{CommandExecutor, display_command};
use crate::requirement::Requirement;
use log::{debug, info, warn};
use std::fmt;
use std::path::{Path, PathBuf};

/// Which distributions the package manager may select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributionPolicy {
    /// Pre-built binaries are acceptable.
    PreferBinary,
    /// Only source distributions may be downloaded.
    SourceOnly,
}

/// Downloads the artifacts for a specifier into a directory.
#[cfg_attr(test, mockall::automock)]
pub trait PackageDownloader {
    /// Download `specifier` and its dependencies into `dest`.
    ///
    /// # Errors
    ///
    /// Returns [`GeneratorError::ProcessFailure`] when the package manager
    /// reports failure, [`GeneratorError::ProcessTimeout`] when it hangs, or
    /// [`GeneratorError::Io`] when it cannot be started.
    fn download(&self, specifier: &str, dest: &Path, policy: DistributionPolicy) -> Result<()>;
}

/// [`PackageDownloader`] that drives `pip download`.
pub struct PipDownloader<'a> {
    executor: &'a dyn CommandExecutor,
    program: &'static str,
}

impl<'a> PipDownloader<'a> {
    /// Create a downloader for the given runtime's pip.
    #[must_use]
    pub fn new(executor: &'a dyn CommandExecutor, python: PythonVersion) -> Self {
        Self {
            executor,
            program: python.pip_executable(),
        }
    }

    /// Build the argument list for one download invocation.
    ///
    /// # Examples
    ///
    /// ```
    /// use flatpak_pip_generator::fetch::{DistributionPolicy, PipDownloader};
    /// use std::path::Path;
    ///
    /// let args = PipDownloader::download_args(
    ///     "six==1.16.0",
    ///     Path::new("/tmp/scratch"),
    ///     DistributionPolicy::SourceOnly,
    /// );
    /// assert_eq!(
    ///     args,
    ///     [
    ///         "download",
    ///         "--exists-action=i",
    ///         "--dest",
    ///         "/tmp/scratch",
    ///         "--no-binary",
    ///         ":all:",
    ///         "six==1.16.0",
    ///     ]
    /// );
    /// ```
    #[must_use]
    pub fn download_args(specifier: &str, dest: &Path, policy: DistributionPolicy) -> Vec<String> {
        let mut args = vec![
            "download".to_owned(),
            "--exists-action=i".to_owned(),
            "--dest".to_owned(),
            dest.to_string_lossy().into_owned(),
        ];
        if policy == DistributionPolicy::SourceOnly {
            args.push("--no-binary".to_owned());
            args.push(":all:".to_owned());
        }
        args.push(specifier.to_owned());
        args
    }
}

impl PackageDownloader for PipDownloader<'_> {
    fn download(&self, specifier: &str, dest: &Path, policy: DistributionPolicy) -> Result<()> {
        let args = Self::download_args(specifier, dest, policy);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        debug!("running {}", display_command(self.program, &args));
        let output = self.executor.run(self.program, &args)?;
        if output.status.success() {
            return Ok(());
        }
        Err(GeneratorError::ProcessFailure {
            command: display_command(self.program, &args),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        })
    }
}

/// Lifecycle of one fetched file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactState {
    /// Present in the scratch directory, not yet classified.
    Fetched,
    /// A platform-specific binary that must be replaced by a source download.
    NeedsSourceRetry,
    /// Usable as a manifest source.
    Resolved,
    /// Could not be turned into a usable artifact.
    Failed,
}

impl fmt::Display for ArtifactState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fetched => "fetched",
            Self::NeedsSourceRetry => "needs source retry",
            Self::Resolved => "resolved",
            Self::Failed => "failed",
        })
    }
}

/// A file found in the scratch directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedArtifact {
    filename: String,
    path: PathBuf,
    state: ArtifactState,
}

impl FetchedArtifact {
    /// Describe a file in a scratch directory with a known state.
    #[must_use]
    pub fn new(filename: impl Into<String>, path: impl Into<PathBuf>, state: ArtifactState) -> Self {
        Self {
            filename: filename.into(),
            path: path.into(),
            state,
        }
    }

    /// Return the file name.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Return the full path inside the scratch directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the current state.
    #[must_use]
    pub fn state(&self) -> ArtifactState {
        self.state
    }

    /// Classify a freshly fetched artifact.
    fn classify(&mut self) {
        if self.state == ArtifactState::Fetched {
            self.state = if is_generic(&self.filename) {
                ArtifactState::Resolved
            } else {
                ArtifactState::NeedsSourceRetry
            };
        }
    }
}

/// Result of fetching one requirement.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    artifacts: Vec<FetchedArtifact>,
    invocations: usize,
    failure: Option<GeneratorError>,
}

impl FetchOutcome {
    /// Return every artifact with its final state, in filename order.
    #[must_use]
    pub fn artifacts(&self) -> &[FetchedArtifact] {
        &self.artifacts
    }

    /// Iterate over artifacts usable as manifest sources.
    pub fn resolved(&self) -> impl Iterator<Item = &FetchedArtifact> {
        self.artifacts
            .iter()
            .filter(|a| a.state == ArtifactState::Resolved)
    }

    /// Iterate over artifacts that ended in [`ArtifactState::Failed`].
    pub fn failed(&self) -> impl Iterator<Item = &FetchedArtifact> {
        self.artifacts
            .iter()
            .filter(|a| a.state == ArtifactState::Failed)
    }

    /// Return how many times the package manager was invoked.
    #[must_use]
    pub fn invocations(&self) -> usize {
        self.invocations
    }

    /// Return the first failure caught while fetching, if any.
    #[must_use]
    pub fn failure(&self) -> Option<&GeneratorError> {
        self.failure.as_ref()
    }

    /// Take ownership of the caught failure.
    pub fn take_failure(&mut self) -> Option<GeneratorError> {
        self.failure.take()
    }

    fn record_failure(&mut self, err: GeneratorError) {
        if self.failure.is_none() {
            self.failure = Some(err);
        }
    }
}

/// Fetch a requirement's artifacts into `dest`.
///
/// The package manager runs at most twice: once preferring binaries, and
/// once more with binaries disabled if the first pass produced any
/// platform-specific artifact. Failures are caught and reported in the
/// outcome; whatever usable artifacts exist are still returned.
pub fn fetch_requirement(
    requirement: &Requirement,
    dest: &Path,
    downloader: &dyn PackageDownloader,
) -> FetchOutcome {
    let specifier = requirement.specifier();
    let mut outcome = FetchOutcome::default();

    info!("downloading {specifier}");
    outcome.invocations += 1;
    let first_pass = downloader.download(&specifier, dest, DistributionPolicy::PreferBinary);
    let first_pass_ok = first_pass.is_ok();
    if let Err(err) = first_pass {
        warn!("download of {specifier} failed: {err}");
        outcome.record_failure(err);
    }

    match scan_classified(dest) {
        Ok(artifacts) => outcome.artifacts = artifacts,
        Err(err) => {
            outcome.record_failure(err);
            return outcome;
        }
    }

    if !outcome
        .artifacts
        .iter()
        .any(|a| a.state == ArtifactState::NeedsSourceRetry)
    {
        return outcome;
    }

    if !first_pass_ok {
        // A failed run is not retried; its binaries are simply unusable.
        mark_retries_failed(&mut outcome.artifacts);
        return outcome;
    }

    retry_from_source(&specifier, dest, downloader, &mut outcome);
    outcome
}

/// Replace platform-specific binaries with a single source-only download and
/// re-scan the directory.
fn retry_from_source(
    specifier: &str,
    dest: &Path,
    downloader: &dyn PackageDownloader,
    outcome: &mut FetchOutcome,
) {
    for artifact in &mut outcome.artifacts {
        if artifact.state != ArtifactState::NeedsSourceRetry {
            continue;
        }
        debug!("discarding platform-specific {}", artifact.filename);
        if let Err(err) = std::fs::remove_file(&artifact.path) {
            warn!("could not remove {}: {err}", artifact.filename);
            artifact.state = ArtifactState::Failed;
        }
    }

    info!("downloading {specifier} from source");
    outcome.invocations += 1;
    if let Err(err) = downloader.download(specifier, dest, DistributionPolicy::SourceOnly) {
        warn!("source download of {specifier} failed: {err}");
        mark_retries_failed(&mut outcome.artifacts);
        outcome.record_failure(err);
        return;
    }

    match scan_classified(dest) {
        Ok(mut artifacts) => {
            for artifact in &mut artifacts {
                settle_after_source_retry(artifact);
            }
            outcome.artifacts = artifacts;
        }
        Err(err) => outcome.record_failure(err),
    }
}

/// Source archives left by a source-only download are usable whatever their
/// compression; anything else still awaiting a retry has failed.
fn settle_after_source_retry(artifact: &mut FetchedArtifact) {
    if artifact.state != ArtifactState::NeedsSourceRetry {
        return;
    }
    if matches!(
        artifact_kind(&artifact.filename),
        Ok(ArtifactKind::SourceArchive)
    ) {
        artifact.state = ArtifactState::Resolved;
    } else {
        warn!(
            "{} is still platform-specific after a source-only download",
            artifact.filename
        );
        artifact.state = ArtifactState::Failed;
    }
}

fn mark_retries_failed(artifacts: &mut [FetchedArtifact]) {
    for artifact in artifacts {
        if artifact.state == ArtifactState::NeedsSourceRetry {
            artifact.state = ArtifactState::Failed;
        }
    }
}

/// List regular files in `dir`, sorted by name, and classify each one.
fn scan_classified(dir: &Path) -> Result<Vec<FetchedArtifact>> {
    let mut artifacts = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let filename = entry.file_name().to_string_lossy().into_owned();
        artifacts.push(FetchedArtifact::new(
            filename,
            entry.path(),
            ArtifactState::Fetched,
        ));
    }
    artifacts.sort_by(|a, b| a.filename.cmp(&b.filename));
    for artifact in &mut artifacts {
        artifact.classify();
    }
    Ok(artifacts)
}

#[cfg(test)]
#[path = "fetch_tests.rs"]
mod tests;
