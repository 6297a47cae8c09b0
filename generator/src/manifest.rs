//! Manifest documents.
//!
//! A run produces one [`ModuleRecord`] per requirement. A single record is
//! written on its own; several are wrapped in a parent module that has no
//! build commands of its own. Field order follows the serialisation order of
//! the structs below.

use crate::config::{GeneratorOptions, PythonVersion};
use crate::error::{GeneratorError, Result};
use crate::provenance::SourceRecord;
use crate::requirement::Requirement;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use std::io::Write;

/// Build system marker used by every module.
pub const BUILDSYSTEM: &str = "simple";

/// Name used for a multi-module manifest without a more specific name.
const DEFAULT_STEM: &str = "modules";

/// One buildable module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleRecord {
    /// Module name, `python<major>-<package>`.
    pub name: String,
    /// Always [`BUILDSYSTEM`].
    pub buildsystem: &'static str,
    /// Shell commands run to build the module.
    #[serde(rename = "build-commands")]
    pub build_commands: Vec<String>,
    /// Where the module's artifacts come from.
    pub sources: Vec<SourceRecord>,
    /// Installed paths removed after the build.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleanup: Option<Vec<String>>,
}

impl ModuleRecord {
    /// Create a record for `requirement` with the build command and cleanup
    /// rule the options call for.
    #[must_use]
    pub fn new(
        requirement: &Requirement,
        options: &GeneratorOptions,
        sources: Vec<SourceRecord>,
    ) -> Self {
        Self {
            name: options.python.module_name(requirement.name()),
            buildsystem: BUILDSYSTEM,
            build_commands: vec![build_command(
                requirement,
                options.python,
                options.build_isolation,
            )],
            sources,
            cleanup: options.cleanup.patterns(),
        }
    }
}

/// The output document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Manifest {
    /// Exactly one requirement was processed.
    Single(ModuleRecord),
    /// Several requirements wrapped in a parent module.
    Multi {
        /// Parent module name.
        name: String,
        /// Always [`BUILDSYSTEM`].
        buildsystem: &'static str,
        /// Always empty.
        #[serde(rename = "build-commands")]
        build_commands: Vec<String>,
        /// Child modules in requirement order.
        modules: Vec<ModuleRecord>,
    },
}

impl Manifest {
    /// Assemble the document for `modules`.
    ///
    /// A lone module is emitted as-is; otherwise (including zero modules)
    /// the modules are wrapped in a parent named `name`.
    #[must_use]
    pub fn assemble(name: &str, mut modules: Vec<ModuleRecord>) -> Self {
        if modules.len() == 1 {
            if let Some(module) = modules.pop() {
                return Self::Single(module);
            }
        }
        Self::Multi {
            name: name.to_owned(),
            buildsystem: BUILDSYSTEM,
            build_commands: Vec::new(),
            modules,
        }
    }

    /// Return every module record in the document.
    #[must_use]
    pub fn modules(&self) -> &[ModuleRecord] {
        match self {
            Self::Single(module) => std::slice::from_ref(module),
            Self::Multi { modules, .. } => modules,
        }
    }

    /// Serialise with four-space indentation and a trailing newline.
    ///
    /// # Errors
    ///
    /// Returns [`GeneratorError::Serialization`] if serialisation fails.
    pub fn to_json(&self) -> Result<String> {
        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        self.serialize(&mut serializer)?;
        buffer.push(b'\n');
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Synthesise the install command for a module.
///
/// VCS requirements install by bare name because their source is unpacked
/// into the build directory; index requirements install their specifier.
///
/// # Examples
///
/// ```
/// use flatpak_pip_generator::config::PythonVersion;
/// use flatpak_pip_generator::manifest::build_command;
/// use flatpak_pip_generator::requirement::Requirement;
///
/// let req = Requirement::parse("six==1.16.0").expect("valid requirement");
/// assert_eq!(
///     build_command(&req, PythonVersion::Three, true),
///     r#"pip3 install --exists-action=i --no-index --find-links="file://${PWD}" --prefix=${FLATPAK_DEST} "six==1.16.0""#
/// );
/// ```
#[must_use]
pub fn build_command(
    requirement: &Requirement,
    python: PythonVersion,
    build_isolation: bool,
) -> String {
    let target = if requirement.vcs().is_some() {
        requirement.name().to_owned()
    } else {
        requirement.specifier()
    };
    let mut command = format!(
        concat!(
            "{pip} install --exists-action=i --no-index ",
            r#"--find-links="file://${{PWD}}" --prefix=${{FLATPAK_DEST}} "{target}""#
        ),
        pip = python.pip_executable(),
        target = target,
    );
    if !build_isolation {
        command.push_str(" --no-build-isolation");
    }
    command
}

/// Derive the output name (without extension) for a run.
///
/// An explicit override wins, with any `.json` suffix removed. Otherwise the
/// requirements file stem, then a lone requirement's name, then a generic
/// `modules` stem is prefixed with `python<major>-`.
///
/// # Examples
///
/// ```
/// use flatpak_pip_generator::config::GeneratorOptions;
/// use flatpak_pip_generator::manifest::output_name;
/// use flatpak_pip_generator::requirement::Requirement;
///
/// let reqs = vec![Requirement::parse("requests").expect("valid requirement")];
/// assert_eq!(output_name(&GeneratorOptions::default(), &reqs), "python3-requests");
/// ```
#[must_use]
pub fn output_name(options: &GeneratorOptions, requirements: &[Requirement]) -> String {
    if let Some(output) = &options.output {
        return output.strip_suffix(".json").unwrap_or(output).to_owned();
    }
    let stem = match (&options.requirements_stem, requirements) {
        (Some(stem), _) => stem.as_str(),
        (None, [requirement]) => requirement.name(),
        (None, _) => DEFAULT_STEM,
    };
    options.python.module_name(stem)
}

/// Return the manifest file path for an output name.
#[must_use]
pub fn output_path(name: &str) -> Utf8PathBuf {
    Utf8PathBuf::from(format!("{name}.json"))
}

/// Serialise `manifest` into `path`.
///
/// # Errors
///
/// Returns [`GeneratorError::WriteFailed`] if the file cannot be created or
/// written, or [`GeneratorError::Serialization`] if serialisation fails.
pub fn write_manifest(manifest: &Manifest, path: &Utf8Path) -> Result<()> {
    let json = manifest.to_json()?;
    let write_failed = |source| GeneratorError::WriteFailed {
        path: path.to_string(),
        source,
    };
    let mut file = std::fs::File::create(path).map_err(write_failed)?;
    file.write_all(json.as_bytes()).map_err(write_failed)?;
    Ok(())
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
