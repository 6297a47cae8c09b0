//! Error types for the manifest generator.
//!
//! Only [`GeneratorError::Parse`] aborts a run. Every other variant is caught
//! at the requirement or artifact level, reported to the operator, and the
//! generator carries on with what it has.

use crate::index::IndexError;
use thiserror::Error;

/// Errors that can occur while generating a manifest.
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// A requirement line could not be parsed.
    #[error("invalid requirement \"{input}\": {reason}")]
    Parse {
        /// The offending input text.
        input: String,
        /// Description of the parse failure.
        reason: String,
    },

    /// A requirements file line could not be parsed.
    #[error("{path}:{line}: {source}")]
    ParseAt {
        /// The requirements file being read.
        path: String,
        /// One-based line number.
        line: usize,
        /// The underlying parse failure.
        #[source]
        source: Box<GeneratorError>,
    },

    /// The package manager exited with a non-zero status.
    #[error("{command} failed ({status}): {stderr}")]
    ProcessFailure {
        /// The command line that was run.
        command: String,
        /// Human-readable exit status.
        status: String,
        /// Trimmed standard error output.
        stderr: String,
    },

    /// The package manager did not finish within the configured timeout.
    #[error("{command} timed out after {seconds} seconds")]
    ProcessTimeout {
        /// The command line that was run.
        command: String,
        /// The timeout that elapsed.
        seconds: u64,
    },

    /// A fetched file has an extension the artifact namer does not know.
    #[error("unsupported artifact format: {filename}")]
    UnsupportedArtifactFormat {
        /// The rejected filename.
        filename: String,
    },

    /// A platform-specific binary was not replaced by a source download.
    #[error("no source distribution replaced platform-specific {filename}")]
    PlatformSpecificArtifact {
        /// The binary that could not be replaced.
        filename: String,
    },

    /// The package index could not provide an origin URL.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The manifest could not be serialised.
    #[error("failed to serialise manifest: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The manifest could not be written to its output file.
    #[error("failed to write {path}")]
    WriteFailed {
        /// The output path.
        path: String,
        /// The underlying write error.
        #[source]
        source: std::io::Error,
    },

    /// Test stub received an unexpected or mismatched invocation.
    #[cfg(any(test, feature = "test-support"))]
    #[error("stub mismatch: {message}")]
    StubMismatch {
        /// Description of what was expected versus what was received.
        message: String,
    },
}

impl GeneratorError {
    /// Return true when this error should abort the whole run.
    ///
    /// # Examples
    ///
    /// ```
    /// use flatpak_pip_generator::error::GeneratorError;
    ///
    /// let err = GeneratorError::UnsupportedArtifactFormat {
    ///     filename: "pkg-1.0.egg".to_owned(),
    /// };
    /// assert!(!err.is_fatal());
    /// ```
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Parse { .. } | Self::ParseAt { .. })
    }
}

/// Result type alias using [`GeneratorError`].
pub type Result<T> = std::result::Result<T, GeneratorError>;
