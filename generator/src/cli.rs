//! CLI argument definitions for the manifest generator.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint so the flag-to-options mapping can be tested
//! without running a generation.

use crate::config::{CleanupScope, GeneratorOptions, PythonVersion};
use crate::executor::DEFAULT_PROCESS_TIMEOUT;
use crate::index::{DEFAULT_INDEX_TIMEOUT, DEFAULT_INDEX_URL};
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use std::time::Duration;

/// Generate Flatpak module manifests for Python packages.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "flatpak-pip-generator")]
#[command(version, about)]
#[command(long_about = concat!(
    "Generate Flatpak module manifests for Python packages.\n\n",
    "Each requirement is downloaded with pip into a scratch directory. ",
    "Platform-specific wheels are replaced by source distributions, every ",
    "file is hashed, and its download URL is looked up on the package index. ",
    "The result is a JSON module (or a module of modules) that builds the ",
    "packages offline with pip.\n\n",
    "Failures for individual packages are reported but do not stop the run; ",
    "the written manifest may need manual fixes.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Generate python3-requests.json:\n",
    "    $ flatpak-pip-generator requests\n\n",
    "  Generate python3-requirements.json from a requirements file:\n",
    "    $ flatpak-pip-generator -r requirements.txt\n\n",
    "  Pin a VCS checkout and drop installed scripts:\n",
    "    $ flatpak-pip-generator --cleanup scripts \\\n",
    "        'git+https://github.com/psf/requests.git@v2.31.0#egg=requests'",
))]
pub struct Cli {
    /// Packages to generate modules for.
    #[arg(
        value_name = "PACKAGE",
        required_unless_present = "requirements_file",
        conflicts_with = "requirements_file"
    )]
    pub packages: Vec<String>,

    /// Target Python 2 instead of Python 3.
    #[arg(long)]
    pub python2: bool,

    /// Read requirements from a pip requirements file.
    #[arg(short, long, value_name = "FILE")]
    pub requirements_file: Option<Utf8PathBuf>,

    /// Output file name, without or with the .json extension.
    #[arg(short, long, value_name = "NAME")]
    pub output: Option<String>,

    /// Installed files to remove after each module is built.
    #[arg(long, value_enum, default_value_t = CleanupScope::None)]
    pub cleanup: CleanupScope,

    /// Keep pip's build isolation enabled in the build commands.
    #[arg(long)]
    pub build_isolation: bool,

    /// Add x-checker-data blocks for external update checkers.
    #[arg(long)]
    pub checker_data: bool,

    /// Leave a package out of the manifest (can be repeated).
    #[arg(long, value_name = "NAME")]
    pub ignore_pkg: Vec<String>,

    /// Base URL of the package index JSON API.
    #[arg(long, value_name = "URL", default_value = DEFAULT_INDEX_URL)]
    pub index_url: String,

    /// Seconds to wait for each pip invocation.
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_PROCESS_TIMEOUT.as_secs())]
    pub pip_timeout: u64,

    /// Seconds to wait for each index request.
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_INDEX_TIMEOUT.as_secs())]
    pub index_timeout: u64,

    /// Increase log verbosity (repeatable: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only report errors.
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    /// Return the targeted Python runtime.
    #[must_use]
    pub fn python(&self) -> PythonVersion {
        if self.python2 {
            PythonVersion::Two
        } else {
            PythonVersion::Three
        }
    }

    /// Build the generation options these flags describe.
    ///
    /// # Examples
    ///
    /// ```
    /// use clap::Parser;
    /// use flatpak_pip_generator::cli::Cli;
    ///
    /// let cli = Cli::parse_from(["flatpak-pip-generator", "-r", "deps/requirements.txt"]);
    /// let options = cli.options();
    /// assert_eq!(options.requirements_stem.as_deref(), Some("requirements"));
    /// ```
    #[must_use]
    pub fn options(&self) -> GeneratorOptions {
        GeneratorOptions {
            python: self.python(),
            cleanup: self.cleanup,
            build_isolation: self.build_isolation,
            checker_data: self.checker_data,
            ignored_packages: self.ignore_pkg.clone(),
            output: self.output.clone(),
            requirements_stem: self
                .requirements_file
                .as_deref()
                .and_then(Utf8Path::file_stem)
                .map(str::to_owned),
        }
    }

    /// Return the package-manager timeout.
    #[must_use]
    pub fn pip_timeout(&self) -> Duration {
        Duration::from_secs(self.pip_timeout)
    }

    /// Return the index request timeout.
    #[must_use]
    pub fn index_timeout(&self) -> Duration {
        Duration::from_secs(self.index_timeout)
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
