//! Operator-facing messages.
//!
//! Progress and the end-of-run summary go to stderr through an injected
//! writer so they can be captured in tests.

use crate::pipeline::GenerationReport;
use camino::Utf8Path;
use std::io::Write;

/// Write a line to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort output; ignore write failures.
    }
}

/// Format the message printed once the manifest has been written.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use flatpak_pip_generator::output::success_message;
///
/// assert_eq!(
///     success_message(2, Utf8Path::new("python3-modules.json")),
///     "Generated 2 modules in python3-modules.json"
/// );
/// ```
#[must_use]
pub fn success_message(count: usize, path: &Utf8Path) -> String {
    let plural = if count == 1 { "module" } else { "modules" };
    format!("Generated {count} {plural} in {path}")
}

/// Write the end-of-run summary, listing every caught failure.
pub fn write_summary(stderr: &mut dyn Write, report: &GenerationReport, path: &Utf8Path) {
    write_stderr_line(stderr, success_message(report.manifest.modules().len(), path));
    if report.is_complete() {
        return;
    }
    write_stderr_line(stderr, "");
    write_stderr_line(
        stderr,
        format!(
            "{} problem(s) were encountered; the manifest may need manual fixes:",
            report.failures.len()
        ),
    );
    for failure in &report.failures {
        write_stderr_line(stderr, format!("  - {failure}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeneratorError;
    use crate::manifest::Manifest;
    use crate::pipeline::Failure;
    use rstest::rstest;

    fn report(failures: Vec<Failure>) -> GenerationReport {
        GenerationReport {
            output_name: "python3-modules".to_owned(),
            manifest: Manifest::assemble("python3-modules", Vec::new()),
            failures,
        }
    }

    #[rstest]
    #[case::one(1, "Generated 1 module in out.json")]
    #[case::many(3, "Generated 3 modules in out.json")]
    fn success_message_pluralises(#[case] count: usize, #[case] expected: &str) {
        assert_eq!(success_message(count, Utf8Path::new("out.json")), expected);
    }

    #[test]
    fn complete_run_prints_only_the_success_line() {
        let mut stderr = Vec::new();
        write_summary(&mut stderr, &report(Vec::new()), Utf8Path::new("out.json"));
        let text = String::from_utf8(stderr).expect("stderr was not UTF-8");
        assert_eq!(text, "Generated 0 modules in out.json\n");
    }

    #[test]
    fn failures_are_listed() {
        let failure = Failure {
            module: "python3-numpy".to_owned(),
            artifact: Some("numpy-1.26.0-cp311-cp311-manylinux_x86_64.whl".to_owned()),
            error: GeneratorError::PlatformSpecificArtifact {
                filename: "numpy-1.26.0-cp311-cp311-manylinux_x86_64.whl".to_owned(),
            },
        };
        let mut stderr = Vec::new();
        write_summary(&mut stderr, &report(vec![failure]), Utf8Path::new("out.json"));
        let text = String::from_utf8(stderr).expect("stderr was not UTF-8");
        assert!(text.contains("1 problem(s) were encountered"));
        assert!(text.contains("  - python3-numpy: numpy-1.26.0"));
    }
}
