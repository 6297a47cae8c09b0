//! External command execution with a bounded run time.
//!
//! The package manager is driven through [`CommandExecutor`] so the fetch
//! logic can be exercised without spawning processes. The system
//! implementation kills a child that outlives its timeout and reports
//! [`GeneratorError::ProcessTimeout`].

use crate::error::{GeneratorError, Result};
use std::io::Read;
use std::process::{Command, Output, Stdio};
use std::thread::JoinHandle;
use std::time::Duration;
use wait_timeout::ChildExt;

/// Default timeout for a single package-manager invocation (10 minutes).
pub const DEFAULT_PROCESS_TIMEOUT: Duration = Duration::from_secs(600);

/// Abstraction for running external commands.
pub trait CommandExecutor {
    /// Runs a command with arguments and returns the captured output.
    ///
    /// A non-zero exit status is not an error at this level; callers inspect
    /// [`Output::status`].
    ///
    /// # Errors
    ///
    /// Returns [`GeneratorError::Io`] if the command cannot be spawned, or
    /// [`GeneratorError::ProcessTimeout`] if it does not finish in time.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use flatpak_pip_generator::executor::{CommandExecutor, SystemCommandExecutor};
    ///
    /// let executor = SystemCommandExecutor::default();
    /// let output = executor.run("pip3", &["--version"])?;
    /// assert!(output.status.success());
    /// # Ok::<(), flatpak_pip_generator::error::GeneratorError>(())
    /// ```
    fn run(&self, cmd: &str, args: &[&str]) -> Result<Output>;
}

/// Executes commands on the host system.
#[derive(Debug, Clone, Copy)]
pub struct SystemCommandExecutor {
    timeout: Duration,
}

impl SystemCommandExecutor {
    /// Create an executor that kills commands running longer than `timeout`.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for SystemCommandExecutor {
    fn default() -> Self {
        Self::with_timeout(DEFAULT_PROCESS_TIMEOUT)
    }
}

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, cmd: &str, args: &[&str]) -> Result<Output> {
        let mut child = Command::new(cmd)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Drain both pipes while waiting so a chatty child cannot block on a
        // full pipe buffer.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        match child.wait_timeout(self.timeout)? {
            Some(status) => Ok(Output {
                status,
                stdout: collect(stdout)?,
                stderr: collect(stderr)?,
            }),
            None => {
                let _ = child.kill();
                let _ = child.wait();
                Err(GeneratorError::ProcessTimeout {
                    command: display_command(cmd, args),
                    seconds: self.timeout.as_secs(),
                })
            }
        }
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<std::io::Result<Vec<u8>>> {
    std::thread::spawn(move || {
        let mut buffer = Vec::new();
        pipe.read_to_end(&mut buffer)?;
        Ok(buffer)
    })
}

fn collect(handle: Option<JoinHandle<std::io::Result<Vec<u8>>>>) -> Result<Vec<u8>> {
    match handle {
        Some(handle) => handle
            .join()
            .map_err(|_| std::io::Error::other("output reader thread panicked"))?
            .map_err(GeneratorError::from),
        None => Ok(Vec::new()),
    }
}

/// Render a command line for messages.
#[must_use]
pub fn display_command(cmd: &str, args: &[&str]) -> String {
    std::iter::once(cmd)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn captures_output_of_successful_command() {
        let executor = SystemCommandExecutor::default();
        let output = executor
            .run("sh", &["-c", "echo out; echo err >&2"])
            .expect("command runs");
        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "out");
        assert_eq!(String::from_utf8_lossy(&output.stderr).trim(), "err");
    }

    #[test]
    fn non_zero_exit_is_not_an_error() {
        let executor = SystemCommandExecutor::default();
        let output = executor.run("sh", &["-c", "exit 3"]).expect("command runs");
        assert_eq!(output.status.code(), Some(3));
    }

    #[test]
    fn slow_command_times_out() {
        let executor = SystemCommandExecutor::with_timeout(Duration::from_millis(200));
        let err = executor
            .run("sleep", &["5"])
            .expect_err("expected timeout");
        assert!(
            matches!(err, GeneratorError::ProcessTimeout { ref command, .. } if command == "sleep 5"),
            "got {err:?}"
        );
    }

    #[test]
    fn missing_program_is_io_error() {
        let executor = SystemCommandExecutor::default();
        let err = executor
            .run("definitely-not-a-real-program-7c1e", &[])
            .expect_err("expected spawn failure");
        assert!(matches!(err, GeneratorError::Io(_)));
    }

    #[test]
    fn display_command_joins_arguments() {
        assert_eq!(
            display_command("pip3", &["download", "--dest", "/tmp/x", "six"]),
            "pip3 download --dest /tmp/x six"
        );
    }
}
