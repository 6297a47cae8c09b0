//! Package names from artifact filenames.
//!
//! Source archives are named `<name>-<version>.<ext>` and wheels
//! `<name>-<version>-<python tag>-<abi tag>-<platform tag>.whl`. The name is
//! recovered purely from the `-`-separated segments, so the segment-count
//! branches below are what make hyphenated names come out right.

use crate::error::{GeneratorError, Result};

/// Extensions recognised as source archives.
const SOURCE_ARCHIVE_EXTENSIONS: &[&str] = &["bz2", "gz", "xz", "zip"];

/// Extension of pre-built binary artifacts.
const BINARY_EXTENSION: &str = "whl";

/// Segment count of a well-formed wheel filename without a build tag.
const WHEEL_SEGMENTS: usize = 5;

/// Trailing segments of a wheel filename that follow the version.
const WHEEL_TAG_SEGMENTS: usize = 4;

/// Suffixes of artifacts that can be used as-is: gzip source archives and
/// platform-independent wheels.
const GENERIC_SUFFIXES: &[&str] = &[".tar.gz", "any.whl"];

/// Broad artifact categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// A source distribution archive.
    SourceArchive,
    /// A pre-built binary (wheel).
    Binary,
}

/// Classify a filename by its extension.
///
/// # Errors
///
/// Returns [`GeneratorError::UnsupportedArtifactFormat`] for any other
/// extension.
pub fn artifact_kind(filename: &str) -> Result<ArtifactKind> {
    match filename.rsplit_once('.') {
        Some((_, ext)) if SOURCE_ARCHIVE_EXTENSIONS.contains(&ext) => {
            Ok(ArtifactKind::SourceArchive)
        }
        Some((_, ext)) if ext == BINARY_EXTENSION => Ok(ArtifactKind::Binary),
        _ => Err(unsupported(filename)),
    }
}

/// Derive the package name from an artifact filename.
///
/// # Errors
///
/// Returns [`GeneratorError::UnsupportedArtifactFormat`] if the extension is
/// not recognised or no name segment remains.
///
/// # Examples
///
/// ```
/// use flatpak_pip_generator::artifact::naming::package_name;
///
/// assert_eq!(package_name("zope-interface-5.4.0.tar.gz").unwrap(), "zope-interface");
/// assert_eq!(
///     package_name("numpy-1.26.0-cp311-cp311-manylinux_x86_64.whl").unwrap(),
///     "numpy"
/// );
/// ```
pub fn package_name(filename: &str) -> Result<String> {
    let segments: Vec<&str> = filename.split('-').collect();
    let name = match artifact_kind(filename)? {
        ArtifactKind::SourceArchive => match segments.as_slice() {
            [name, _version] => (*name).to_owned(),
            _ => join_leading(&segments, 1),
        },
        ArtifactKind::Binary => {
            if segments.len() == WHEEL_SEGMENTS {
                segments.first().map(|s| (*s).to_owned()).unwrap_or_default()
            } else {
                join_leading(&segments, WHEEL_TAG_SEGMENTS)
            }
        }
    };
    if name.is_empty() {
        return Err(unsupported(filename));
    }
    Ok(name)
}

/// Return true when the artifact is usable without forcing a source download.
///
/// # Examples
///
/// ```
/// use flatpak_pip_generator::artifact::naming::is_generic;
///
/// assert!(is_generic("six-1.16.0-py2.py3-none-any.whl"));
/// assert!(!is_generic("numpy-1.26.0-cp311-cp311-manylinux_x86_64.whl"));
/// ```
#[must_use]
pub fn is_generic(filename: &str) -> bool {
    GENERIC_SUFFIXES
        .iter()
        .any(|suffix| filename.ends_with(suffix))
}

/// Join all but the last `drop` segments with `-`.
fn join_leading(segments: &[&str], drop: usize) -> String {
    let keep = segments.len().saturating_sub(drop);
    segments.get(..keep).unwrap_or_default().join("-")
}

fn unsupported(filename: &str) -> GeneratorError {
    GeneratorError::UnsupportedArtifactFormat {
        filename: filename.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::plain_sdist("requests-2.31.0.tar.gz", "requests")]
    #[case::hyphenated_sdist("zope-interface-5.4.0.tar.gz", "zope-interface")]
    #[case::many_hyphens("backports-zoneinfo-extra-0.2.1.tar.bz2", "backports-zoneinfo-extra")]
    #[case::zip_sdist("pycairo-1.25.0.zip", "pycairo")]
    #[case::xz_sdist("lxml-4.9.3.tar.xz", "lxml")]
    #[case::platform_wheel("numpy-1.26.0-cp311-cp311-manylinux_x86_64.whl", "numpy")]
    #[case::generic_wheel("six-1.16.0-py2.py3-none-any.whl", "six")]
    #[case::build_tag_wheel("pkg-1.0-1-py3-none-any.whl", "pkg-1.0")]
    fn recovers_package_name(#[case] filename: &str, #[case] expected: &str) {
        let name = package_name(filename).expect("supported artifact");
        assert_eq!(name, expected);
    }

    #[rstest]
    #[case::egg("pkg-1.0-py3.8.egg")]
    #[case::exe("pkg-1.0.win32.exe")]
    #[case::no_extension("README")]
    #[case::short_wheel("pkg-1.0.whl")]
    #[case::nameless_sdist("pkg.tar.gz")]
    fn rejects_unsupported_artifacts(#[case] filename: &str) {
        let err = package_name(filename).expect_err("expected unsupported format");
        assert!(
            matches!(err, GeneratorError::UnsupportedArtifactFormat { .. }),
            "got {err:?}"
        );
        assert!(!err.is_fatal());
    }

    #[rstest]
    #[case("requests-2.31.0.tar.gz", true)]
    #[case("pycairo-1.25.0.zip", false)]
    #[case("lxml-4.9.3.tar.xz", false)]
    #[case("backports-zoneinfo-0.2.1.tar.bz2", false)]
    #[case("six-1.16.0-py2.py3-none-any.whl", true)]
    #[case("numpy-1.26.0-cp311-cp311-manylinux_x86_64.whl", false)]
    #[case("cffi-1.16.0-cp311-cp311-macosx_11_0_arm64.whl", false)]
    fn generic_detection(#[case] filename: &str, #[case] expected: bool) {
        assert_eq!(is_generic(filename), expected);
    }

    #[test]
    fn kind_distinguishes_sources_from_binaries() {
        assert_eq!(
            artifact_kind("requests-2.31.0.tar.gz").ok(),
            Some(ArtifactKind::SourceArchive)
        );
        assert_eq!(
            artifact_kind("six-1.16.0-py2.py3-none-any.whl").ok(),
            Some(ArtifactKind::Binary)
        );
    }
}
