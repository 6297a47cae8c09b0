//! Shared test utilities for the generator crate.

use crate::artifact::digest::sha256_bytes;
use crate::error::{GeneratorError, Result};
use crate::executor::{CommandExecutor, display_command};
use crate::fetch::{DistributionPolicy, PackageDownloader};
use crate::index::{IndexError, PackageIndex};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::Path;
use std::process::{ExitStatus, Output};

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code.unsigned_abs())
}

/// Creates a successful command `Output` with empty stdout and stderr.
#[must_use]
pub fn success_output() -> Output {
    Output {
        status: exit_status(0),
        stdout: Vec::new(),
        stderr: Vec::new(),
    }
}

/// Creates a failed command `Output` with the given stderr message.
#[must_use]
pub fn failure_output(stderr: &str) -> Output {
    Output {
        status: exit_status(1),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Represents an expected command invocation for testing.
#[derive(Debug)]
pub struct ExpectedCall {
    /// The command to execute (e.g., "pip3").
    pub cmd: &'static str,
    /// The arguments to pass to the command.
    pub args: Vec<&'static str>,
    /// The result to return when this command is invoked.
    pub result: Result<Output>,
}

/// A stub implementation of `CommandExecutor` for testing.
///
/// Replays predefined results in order and reports a
/// [`GeneratorError::StubMismatch`] for any call it did not expect.
#[derive(Debug)]
pub struct StubExecutor {
    expected: RefCell<VecDeque<ExpectedCall>>,
}

impl StubExecutor {
    /// Creates a new `StubExecutor` with the given expected calls.
    #[must_use]
    pub fn new(expected: Vec<ExpectedCall>) -> Self {
        Self {
            expected: RefCell::new(expected.into()),
        }
    }

    /// Asserts that all expected command invocations have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining expected calls that were not invoked.
    pub fn assert_finished(&self) {
        assert!(
            self.expected.borrow().is_empty(),
            "expected no further command invocations"
        );
    }
}

impl CommandExecutor for StubExecutor {
    fn run(&self, cmd: &str, args: &[&str]) -> Result<Output> {
        let received = display_command(cmd, args);
        let Some(call) = self.expected.borrow_mut().pop_front() else {
            return Err(GeneratorError::StubMismatch {
                message: format!("unexpected command invocation: {received}"),
            });
        };
        if call.cmd != cmd || call.args.as_slice() != args {
            return Err(GeneratorError::StubMismatch {
                message: format!(
                    "expected {}, got {received}",
                    display_command(call.cmd, &call.args)
                ),
            });
        }
        call.result
    }
}

/// What one scripted download leaves behind.
#[derive(Debug, Clone, Default)]
pub struct DownloadStep {
    files: Vec<(String, Vec<u8>)>,
    fails: bool,
}

impl DownloadStep {
    /// A successful download producing `files` (name and text contents).
    #[must_use]
    pub fn files(files: &[(&str, &str)]) -> Self {
        Self {
            files: files
                .iter()
                .map(|(name, contents)| ((*name).to_owned(), contents.as_bytes().to_vec()))
                .collect(),
            fails: false,
        }
    }

    /// A download that exits with status 1 after writing nothing.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            files: Vec::new(),
            fails: true,
        }
    }
}

/// A recorded download invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadCall {
    /// The specifier passed to the downloader.
    pub specifier: String,
    /// The distribution policy requested.
    pub policy: DistributionPolicy,
}

/// A `PackageDownloader` that writes canned files and records every call.
///
/// Steps are consumed in order across all requirements.
#[derive(Debug, Default)]
pub struct ScriptedDownloader {
    steps: RefCell<VecDeque<DownloadStep>>,
    calls: RefCell<Vec<DownloadCall>>,
}

impl ScriptedDownloader {
    /// Creates a downloader that replays `steps` in order.
    #[must_use]
    pub fn new(steps: Vec<DownloadStep>) -> Self {
        Self {
            steps: RefCell::new(steps.into()),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Appends a step to the script.
    pub fn push(&self, step: DownloadStep) {
        self.steps.borrow_mut().push_back(step);
    }

    /// Returns every invocation received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<DownloadCall> {
        self.calls.borrow().clone()
    }

    /// Returns how many invocations named `specifier`.
    #[must_use]
    pub fn calls_for(&self, specifier: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.specifier == specifier)
            .count()
    }
}

impl PackageDownloader for ScriptedDownloader {
    fn download(&self, specifier: &str, dest: &Path, policy: DistributionPolicy) -> Result<()> {
        self.calls.borrow_mut().push(DownloadCall {
            specifier: specifier.to_owned(),
            policy,
        });
        let Some(step) = self.steps.borrow_mut().pop_front() else {
            return Err(GeneratorError::StubMismatch {
                message: format!("unexpected download of {specifier}"),
            });
        };
        for (name, bytes) in &step.files {
            std::fs::write(dest.join(name), bytes)?;
        }
        if step.fails {
            return Err(GeneratorError::ProcessFailure {
                command: format!("pip3 download {specifier}"),
                status: "exit status: 1".to_owned(),
                stderr: "ERROR: No matching distribution found".to_owned(),
            });
        }
        Ok(())
    }
}

/// A `PackageIndex` serving in-memory metadata documents.
#[derive(Debug, Default)]
pub struct StaticIndex {
    documents: HashMap<String, String>,
    requests: RefCell<Vec<String>>,
}

impl StaticIndex {
    /// Creates an empty index; every lookup is a 404.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `json` for package `name`.
    #[must_use]
    pub fn with_document(mut self, name: &str, json: String) -> Self {
        self.documents.insert(name.to_owned(), json);
        self
    }

    /// Returns the package names requested so far.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl PackageIndex for StaticIndex {
    fn fetch_metadata(&self, name: &str) -> std::result::Result<String, IndexError> {
        self.requests.borrow_mut().push(name.to_owned());
        self.documents
            .get(name)
            .cloned()
            .ok_or_else(|| IndexError::PackageNotFound {
                url: format!("https://pypi.test/pypi/{name}/json"),
            })
    }
}

/// Builds an index metadata document with one release holding `files`
/// (filename and URL pairs).
#[must_use]
pub fn index_json(version: &str, files: &[(&str, &str)]) -> String {
    let entries: Vec<serde_json::Value> = files
        .iter()
        .map(|(filename, url)| serde_json::json!({ "filename": filename, "url": url }))
        .collect();
    let releases = BTreeMap::from([(version.to_owned(), entries)]);
    serde_json::json!({ "releases": releases }).to_string()
}

/// Returns the hex SHA-256 of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    sha256_bytes(bytes).as_str().to_owned()
}
