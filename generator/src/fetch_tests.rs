//! Unit tests for the fetch strategy.

use super::*;
use crate::test_utils::{ExpectedCall, StubExecutor, failure_output, success_output};
use mockall::Sequence;
use mockall::predicate::{always, eq};
use rstest::rstest;

const NUMPY_WHEEL: &str = "numpy-1.26.0-cp311-cp311-manylinux_x86_64.whl";
const NUMPY_SDIST: &str = "numpy-1.26.0.tar.gz";

fn requirement(text: &str) -> Requirement {
    Requirement::parse(text).expect("valid requirement")
}

fn write_files(dest: &Path, names: &[&str]) {
    for name in names {
        std::fs::write(dest.join(name), name.as_bytes()).expect("write artifact");
    }
}

fn filenames<'a>(artifacts: impl Iterator<Item = &'a FetchedArtifact>) -> Vec<String> {
    artifacts.map(|a| a.filename().to_owned()).collect()
}

fn process_failure() -> GeneratorError {
    GeneratorError::ProcessFailure {
        command: "pip3 download".to_owned(),
        status: "exit status: 1".to_owned(),
        stderr: "No matching distribution found".to_owned(),
    }
}

#[test]
fn generic_artifacts_are_resolved_in_one_pass() {
    let temp = tempfile::tempdir().expect("temp dir");
    let mut downloader = MockPackageDownloader::new();
    downloader
        .expect_download()
        .with(eq("requests==2.31.0"), always(), eq(DistributionPolicy::PreferBinary))
        .times(1)
        .returning(|_, dest, _| {
            write_files(
                dest,
                &["requests-2.31.0.tar.gz", "certifi-2023.7.22-py3-none-any.whl"],
            );
            Ok(())
        });

    let outcome = fetch_requirement(&requirement("requests==2.31.0"), temp.path(), &downloader);

    assert_eq!(outcome.invocations(), 1);
    assert!(outcome.failure().is_none());
    assert_eq!(
        filenames(outcome.resolved()),
        vec!["certifi-2023.7.22-py3-none-any.whl", "requests-2.31.0.tar.gz"]
    );
}

#[test]
fn platform_binary_is_replaced_by_source_archive() {
    let temp = tempfile::tempdir().expect("temp dir");
    let mut seq = Sequence::new();
    let mut downloader = MockPackageDownloader::new();
    downloader
        .expect_download()
        .with(eq("numpy==1.26.0"), always(), eq(DistributionPolicy::PreferBinary))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, dest, _| {
            write_files(dest, &[NUMPY_WHEEL]);
            Ok(())
        });
    downloader
        .expect_download()
        .with(eq("numpy==1.26.0"), always(), eq(DistributionPolicy::SourceOnly))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, dest, _| {
            assert!(
                !dest.join(NUMPY_WHEEL).exists(),
                "binary should be removed before the source download"
            );
            write_files(dest, &[NUMPY_SDIST]);
            Ok(())
        });

    let outcome = fetch_requirement(&requirement("numpy==1.26.0"), temp.path(), &downloader);

    assert_eq!(outcome.invocations(), 2);
    assert!(outcome.failure().is_none());
    assert_eq!(filenames(outcome.resolved()), vec![NUMPY_SDIST]);
    assert!(!temp.path().join(NUMPY_WHEEL).exists());
}

#[test]
fn several_binaries_trigger_a_single_source_retry() {
    let temp = tempfile::tempdir().expect("temp dir");
    let mut seq = Sequence::new();
    let mut downloader = MockPackageDownloader::new();
    downloader
        .expect_download()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, dest, _| {
            write_files(
                dest,
                &[
                    NUMPY_WHEEL,
                    "cffi-1.16.0-cp311-cp311-manylinux_x86_64.whl",
                    "pycparser-2.21-py2.py3-none-any.whl",
                ],
            );
            Ok(())
        });
    downloader
        .expect_download()
        .with(always(), always(), eq(DistributionPolicy::SourceOnly))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, dest, _| {
            write_files(dest, &[NUMPY_SDIST, "cffi-1.16.0.tar.gz"]);
            Ok(())
        });

    let outcome = fetch_requirement(&requirement("numpy"), temp.path(), &downloader);

    assert_eq!(outcome.invocations(), 2);
    assert_eq!(
        filenames(outcome.resolved()),
        vec![
            "cffi-1.16.0.tar.gz",
            NUMPY_SDIST,
            "pycparser-2.21-py2.py3-none-any.whl"
        ]
    );
}

#[test]
fn failed_source_retry_keeps_generic_artifacts() {
    let temp = tempfile::tempdir().expect("temp dir");
    let mut seq = Sequence::new();
    let mut downloader = MockPackageDownloader::new();
    downloader
        .expect_download()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, dest, _| {
            write_files(dest, &[NUMPY_WHEEL, "six-1.16.0-py2.py3-none-any.whl"]);
            Ok(())
        });
    downloader
        .expect_download()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _, _| Err(process_failure()));

    let outcome = fetch_requirement(&requirement("numpy"), temp.path(), &downloader);

    assert_eq!(outcome.invocations(), 2);
    assert!(matches!(
        outcome.failure(),
        Some(GeneratorError::ProcessFailure { .. })
    ));
    assert_eq!(
        filenames(outcome.resolved()),
        vec!["six-1.16.0-py2.py3-none-any.whl"]
    );
    assert_eq!(filenames(outcome.failed()), vec![NUMPY_WHEEL]);
}

#[test]
fn failed_first_pass_is_not_retried() {
    let temp = tempfile::tempdir().expect("temp dir");
    let mut downloader = MockPackageDownloader::new();
    downloader
        .expect_download()
        .times(1)
        .returning(|_, dest, _| {
            write_files(dest, &["six-1.16.0.tar.gz", NUMPY_WHEEL]);
            Err(process_failure())
        });

    let outcome = fetch_requirement(&requirement("numpy"), temp.path(), &downloader);

    assert_eq!(outcome.invocations(), 1);
    assert!(outcome.failure().is_some());
    assert_eq!(filenames(outcome.resolved()), vec!["six-1.16.0.tar.gz"]);
    assert_eq!(filenames(outcome.failed()), vec![NUMPY_WHEEL]);
}

#[test]
fn binary_surviving_source_retry_is_failed() {
    let temp = tempfile::tempdir().expect("temp dir");
    let mut downloader = MockPackageDownloader::new();
    downloader.expect_download().times(2).returning(|_, dest, _| {
        write_files(dest, &[NUMPY_WHEEL]);
        Ok(())
    });

    let outcome = fetch_requirement(&requirement("numpy"), temp.path(), &downloader);

    assert_eq!(outcome.invocations(), 2);
    assert_eq!(outcome.resolved().count(), 0);
    assert_eq!(
        outcome.artifacts().first().map(FetchedArtifact::state),
        Some(ArtifactState::Failed)
    );
}

#[rstest]
#[case::zip("pkg-1.0.zip")]
#[case::bzip2("pkg-1.0.tar.bz2")]
#[case::xz("pkg-1.0.tar.xz")]
fn non_gzip_archive_triggers_source_retry(#[case] archive: &'static str) {
    let temp = tempfile::tempdir().expect("temp dir");
    let mut seq = Sequence::new();
    let mut downloader = MockPackageDownloader::new();
    downloader
        .expect_download()
        .with(eq("pkg==1.0"), always(), eq(DistributionPolicy::PreferBinary))
        .times(1)
        .in_sequence(&mut seq)
        .returning(move |_, dest, _| {
            write_files(dest, &[archive]);
            Ok(())
        });
    downloader
        .expect_download()
        .with(eq("pkg==1.0"), always(), eq(DistributionPolicy::SourceOnly))
        .times(1)
        .in_sequence(&mut seq)
        .returning(move |_, dest, _| {
            assert!(!dest.join(archive).exists(), "archive should be discarded first");
            write_files(dest, &[archive]);
            Ok(())
        });

    let outcome = fetch_requirement(&requirement("pkg==1.0"), temp.path(), &downloader);

    assert_eq!(outcome.invocations(), 2);
    assert!(outcome.failure().is_none());
    assert_eq!(filenames(outcome.resolved()), vec![archive]);
}

#[test]
fn vcs_requirement_downloads_locator_specifier() {
    let locator = "git+https://example.com/pkg.git@abc123#egg=pkg";
    let temp = tempfile::tempdir().expect("temp dir");
    let mut seq = Sequence::new();
    let mut downloader = MockPackageDownloader::new();
    downloader
        .expect_download()
        .with(eq(locator), always(), eq(DistributionPolicy::PreferBinary))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, dest, _| {
            write_files(dest, &["pkg-0.1.zip"]);
            Ok(())
        });
    downloader
        .expect_download()
        .with(eq(locator), always(), eq(DistributionPolicy::SourceOnly))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, dest, _| {
            write_files(dest, &["pkg-0.1.zip"]);
            Ok(())
        });

    let outcome = fetch_requirement(&requirement(locator), temp.path(), &downloader);

    assert_eq!(outcome.invocations(), 2);
    assert_eq!(filenames(outcome.resolved()), vec!["pkg-0.1.zip"]);
}

#[test]
fn pip_downloader_runs_pip_download() {
    let dest = Path::new("/tmp/scratch");
    let executor = StubExecutor::new(vec![ExpectedCall {
        cmd: "pip3",
        args: vec!["download", "--exists-action=i", "--dest", "/tmp/scratch", "six==1.16.0"],
        result: Ok(success_output()),
    }]);
    let downloader = PipDownloader::new(&executor, PythonVersion::Three);

    downloader
        .download("six==1.16.0", dest, DistributionPolicy::PreferBinary)
        .expect("download succeeds");
    executor.assert_finished();
}

#[test]
fn pip_downloader_forces_source_with_python2() {
    let dest = Path::new("/tmp/scratch");
    let executor = StubExecutor::new(vec![ExpectedCall {
        cmd: "pip2",
        args: vec![
            "download",
            "--exists-action=i",
            "--dest",
            "/tmp/scratch",
            "--no-binary",
            ":all:",
            "six==1.16.0",
        ],
        result: Ok(success_output()),
    }]);
    let downloader = PipDownloader::new(&executor, PythonVersion::Two);

    downloader
        .download("six==1.16.0", dest, DistributionPolicy::SourceOnly)
        .expect("download succeeds");
    executor.assert_finished();
}

#[test]
fn pip_downloader_maps_non_zero_exit_to_process_failure() {
    let executor = StubExecutor::new(vec![ExpectedCall {
        cmd: "pip3",
        args: vec!["download", "--exists-action=i", "--dest", "/tmp/scratch", "nonexistent"],
        result: Ok(failure_output("ERROR: No matching distribution found\n")),
    }]);
    let downloader = PipDownloader::new(&executor, PythonVersion::Three);

    let err = downloader
        .download(
            "nonexistent",
            Path::new("/tmp/scratch"),
            DistributionPolicy::PreferBinary,
        )
        .expect_err("expected process failure");
    match err {
        GeneratorError::ProcessFailure {
            command, stderr, ..
        } => {
            assert_eq!(command, "pip3 download --exists-action=i --dest /tmp/scratch nonexistent");
            assert_eq!(stderr, "ERROR: No matching distribution found");
        }
        other => panic!("expected ProcessFailure, got {other:?}"),
    }
    executor.assert_finished();
}
