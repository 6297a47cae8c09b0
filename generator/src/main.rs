//! Flatpak pip generator CLI entrypoint.
//!
//! Reads requirements from the command line or a requirements file, runs the
//! generation pipeline against pip and the package index, and writes the
//! manifest to `<name>.json` in the current directory.

use clap::Parser;
use flatpak_pip_generator::cli::Cli;
use flatpak_pip_generator::error::Result;
use flatpak_pip_generator::executor::SystemCommandExecutor;
use flatpak_pip_generator::fetch::PipDownloader;
use flatpak_pip_generator::index::HttpIndex;
use flatpak_pip_generator::logging;
use flatpak_pip_generator::manifest::{output_path, write_manifest};
use flatpak_pip_generator::output::{write_stderr_line, write_summary};
use flatpak_pip_generator::pipeline::Generator;
use flatpak_pip_generator::requirement::{Requirement, parse_requirements_file};
use std::io::Write;

fn main() {
    let cli = Cli::parse();
    logging::init(logging::level_filter(cli.verbose, cli.quiet));
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(cli: &Cli, stderr: &mut dyn Write) -> Result<()> {
    let requirements = read_requirements(cli)?;
    let options = cli.options();

    let executor = SystemCommandExecutor::with_timeout(cli.pip_timeout());
    let downloader = PipDownloader::new(&executor, options.python);
    let index = HttpIndex::new(&cli.index_url, cli.index_timeout());
    let generator = Generator::new(&options, &downloader, &index);

    let report = generator.generate(&requirements);
    let path = output_path(&report.output_name);
    write_manifest(&report.manifest, &path)?;

    if !cli.quiet || !report.is_complete() {
        write_summary(stderr, &report, &path);
    }
    Ok(())
}

/// Collects requirements from the positional arguments or the requirements
/// file; a malformed entry aborts the run.
fn read_requirements(cli: &Cli) -> Result<Vec<Requirement>> {
    match &cli.requirements_file {
        Some(path) => parse_requirements_file(path),
        None => cli
            .packages
            .iter()
            .map(|package| Requirement::parse(package))
            .collect(),
    }
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format!("error: {err}"));
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flatpak_pip_generator::error::GeneratorError;

    #[test]
    fn exit_code_for_run_result_returns_zero_on_success() {
        let mut stderr = Vec::new();
        let exit_code = exit_code_for_run_result(Ok(()), &mut stderr);
        assert_eq!(exit_code, 0);
        assert!(stderr.is_empty());
    }

    #[test]
    fn exit_code_for_run_result_prints_error_and_returns_one() {
        let err = GeneratorError::Parse {
            input: "requests==".to_owned(),
            reason: "missing version after \"==\"".to_owned(),
        };

        let mut stderr = Vec::new();
        let exit_code = exit_code_for_run_result(Err(err), &mut stderr);
        assert_eq!(exit_code, 1);

        let stderr_text = String::from_utf8(stderr).expect("stderr was not UTF-8");
        assert!(stderr_text.starts_with("error: invalid requirement \"requests==\""));
    }

    #[test]
    fn read_requirements_parses_positional_packages() {
        let cli = Cli::parse_from(["flatpak-pip-generator", "requests==2.31.0", "six"]);
        let requirements = read_requirements(&cli).expect("valid requirements");
        let names: Vec<&str> = requirements.iter().map(Requirement::name).collect();
        assert_eq!(names, vec!["requests", "six"]);
    }

    #[test]
    fn read_requirements_rejects_malformed_package() {
        let cli = Cli::parse_from(["flatpak-pip-generator", "six", "requests=="]);
        let err = read_requirements(&cli).expect_err("expected parse failure");
        assert!(err.is_fatal());
    }

    #[test]
    fn read_requirements_reads_file() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = temp.path().join("requirements.txt");
        std::fs::write(&path, "# pinned\nrequests==2.31.0\n\nsix\n").expect("write requirements");
        let path = path.to_str().expect("utf-8 path");

        let cli = Cli::parse_from(["flatpak-pip-generator", "-r", path]);
        let requirements = read_requirements(&cli).expect("valid requirements");
        assert_eq!(requirements.len(), 2);
    }
}
