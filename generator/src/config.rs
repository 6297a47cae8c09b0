//! Generation options.
//!
//! Everything the pipeline needs to know about the run, independent of how
//! it was configured. The CLI builds a [`GeneratorOptions`] from its flags;
//! library callers construct one directly.

use std::fmt;

/// Target Python runtime major version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PythonVersion {
    /// Python 2.
    Two,
    /// Python 3.
    #[default]
    Three,
}

impl PythonVersion {
    /// Return the major version number.
    #[must_use]
    pub fn major(self) -> u8 {
        match self {
            Self::Two => 2,
            Self::Three => 3,
        }
    }

    /// Return the package-manager executable for this runtime.
    #[must_use]
    pub fn pip_executable(self) -> &'static str {
        match self {
            Self::Two => "pip2",
            Self::Three => "pip3",
        }
    }

    /// Prefix a name with `python<major>-`.
    ///
    /// # Examples
    ///
    /// ```
    /// use flatpak_pip_generator::config::PythonVersion;
    ///
    /// assert_eq!(PythonVersion::Three.module_name("requests"), "python3-requests");
    /// ```
    #[must_use]
    pub fn module_name(self, name: &str) -> String {
        format!("python{}-{name}", self.major())
    }
}

/// Which installed files a module's cleanup rule removes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum CleanupScope {
    /// Keep everything.
    #[default]
    None,
    /// Remove installed scripts and their man pages.
    Scripts,
    /// Remove everything the module installs.
    All,
}

impl CleanupScope {
    /// Return the manifest cleanup patterns, or `None` when nothing is removed.
    #[must_use]
    pub fn patterns(self) -> Option<Vec<String>> {
        match self {
            Self::None => None,
            Self::Scripts => Some(vec!["/bin".to_owned(), "/share/man/man1".to_owned()]),
            Self::All => Some(vec!["*".to_owned()]),
        }
    }
}

impl fmt::Display for CleanupScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Scripts => "scripts",
            Self::All => "all",
        })
    }
}

/// Options controlling manifest generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// Target runtime major version.
    pub python: PythonVersion,
    /// Cleanup rule attached to every module.
    pub cleanup: CleanupScope,
    /// Keep pip's build isolation enabled in the generated build commands.
    pub build_isolation: bool,
    /// Attach `x-checker-data` blocks to file sources.
    pub checker_data: bool,
    /// Package names to leave out of the manifest.
    pub ignored_packages: Vec<String>,
    /// Explicit output name; derived from the requirements otherwise.
    pub output: Option<String>,
    /// Stem of the requirements file the requirements came from, if any.
    pub requirements_stem: Option<String>,
}
