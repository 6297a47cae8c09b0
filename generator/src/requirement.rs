//! Requirement parsing.
//!
//! Turns a textual requirement (`requests==2.31.0`, `zope.interface>=5,<6`,
//! `git+https://example.com/pkg.git@abc123#egg=pkg`) into a [`Requirement`]
//! that is read-only for the rest of the run. Environment markers are
//! accepted and ignored.

use crate::error::{GeneratorError, Result};
use camino::Utf8Path;
use log::warn;
use std::fmt;

/// Version comparison operators, longest spelling first so prefix matching
/// picks `===` over `==` and `<=` over `<`.
const OPERATORS: &[(&str, Operator)] = &[
    ("===", Operator::ArbitraryEqual),
    ("==", Operator::Equal),
    ("!=", Operator::NotEqual),
    ("~=", Operator::Compatible),
    ("<=", Operator::LessEqual),
    (">=", Operator::GreaterEqual),
    ("<", Operator::Less),
    (">", Operator::Greater),
];

/// A version comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `===`
    ArbitraryEqual,
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `~=`
    Compatible,
    /// `<=`
    LessEqual,
    /// `>=`
    GreaterEqual,
    /// `<`
    Less,
    /// `>`
    Greater,
}

impl Operator {
    /// Return the operator as written in a requirement.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        OPERATORS
            .iter()
            .find(|(_, op)| *op == self)
            .map_or("==", |(text, _)| *text)
    }
}

/// A single `(operator, version)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparator {
    /// The comparison operator.
    pub operator: Operator,
    /// The version operand, verbatim.
    pub version: String,
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.operator.as_str(), self.version)
    }
}

/// Version-control systems understood in requirement locators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VcsKind {
    /// Git.
    Git,
    /// Mercurial.
    Mercurial,
    /// Subversion.
    Subversion,
    /// Bazaar.
    Bazaar,
}

impl VcsKind {
    /// Map a locator prefix (`git`, `hg`, `svn`, `bzr`) to a kind.
    #[must_use]
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "git" => Some(Self::Git),
            "hg" => Some(Self::Mercurial),
            "svn" => Some(Self::Subversion),
            "bzr" => Some(Self::Bazaar),
            _ => None,
        }
    }

    /// Return the source type name used in manifests.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Git => "git",
            Self::Mercurial => "hg",
            Self::Subversion => "svn",
            Self::Bazaar => "bzr",
        }
    }

    /// Return the manifest key that carries the pinned revision.
    ///
    /// Subversion sources use `revision`; every other kind uses `commit`.
    #[must_use]
    pub fn revision_key(self) -> &'static str {
        match self {
            Self::Subversion => "revision",
            Self::Git | Self::Mercurial | Self::Bazaar => "commit",
        }
    }
}

impl fmt::Display for VcsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A version-control locator such as `git+https://host/repo.git@rev`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VcsLocator {
    kind: VcsKind,
    uri: String,
    revision: Option<String>,
}

impl VcsLocator {
    /// Return the version-control system.
    #[must_use]
    pub fn kind(&self) -> VcsKind {
        self.kind
    }

    /// Return the locator URI including its `<kind>+` prefix and without the
    /// revision.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Return the pinned revision, if any.
    #[must_use]
    pub fn revision(&self) -> Option<&str> {
        self.revision.as_deref()
    }

    /// Return the locator as a plain HTTPS URL.
    ///
    /// The `<kind>+` prefix is dropped, `git://`, `ssh://`, `svn://` and
    /// `http://` become `https://`, and any userinfo before the host is removed.
    ///
    /// # Examples
    ///
    /// ```
    /// use flatpak_pip_generator::requirement::Requirement;
    ///
    /// let req = Requirement::parse("git+ssh://git@example.com/pkg.git@v1#egg=pkg")
    ///     .expect("valid requirement");
    /// let vcs = req.vcs().expect("vcs locator");
    /// assert_eq!(vcs.https_url(), "https://example.com/pkg.git");
    /// ```
    #[must_use]
    pub fn https_url(&self) -> String {
        let bare = self
            .uri
            .split_once('+')
            .map_or(self.uri.as_str(), |(_, rest)| rest);
        let Some((scheme, rest)) = bare.split_once("://") else {
            return bare.to_owned();
        };
        let scheme = match scheme {
            "git" | "ssh" | "svn" | "http" => "https",
            other => other,
        };
        let (authority, path) = rest.split_once('/').map_or((rest, ""), |(a, p)| (a, p));
        let host = authority
            .rsplit_once('@')
            .map_or(authority, |(_, host)| host);
        if path.is_empty() {
            format!("{scheme}://{host}")
        } else {
            format!("{scheme}://{host}/{path}")
        }
    }
}

/// Where a requirement's artifact comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequirementSource {
    /// Resolved from the package index, optionally constrained.
    Index {
        /// Ordered version comparators; empty means any version.
        comparators: Vec<Comparator>,
    },
    /// Fetched from a version-control locator.
    Vcs(VcsLocator),
}

/// A parsed dependency specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    name: String,
    extras: Vec<String>,
    source: RequirementSource,
}

impl Requirement {
    /// Parse a single requirement.
    ///
    /// # Errors
    ///
    /// Returns [`GeneratorError::Parse`] if the text is not a supported
    /// requirement.
    ///
    /// # Examples
    ///
    /// ```
    /// use flatpak_pip_generator::requirement::Requirement;
    ///
    /// let req = Requirement::parse("requests>=2.31, <3").expect("valid requirement");
    /// assert_eq!(req.name(), "requests");
    /// assert_eq!(req.specifier(), "requests>=2.31,<3");
    /// ```
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let line = trimmed.strip_prefix("-e").map_or(trimmed, str::trim_start);
        // Environment markers do not affect what gets fetched.
        let line = line
            .split_once(';')
            .map_or(line, |(requirement, _markers)| requirement)
            .trim();
        if is_vcs_locator(line) {
            return parse_vcs(input, line);
        }
        parse_index(input, line)
    }

    /// Return the package name as written.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the requested extras.
    #[must_use]
    pub fn extras(&self) -> &[String] {
        &self.extras
    }

    /// Return where the requirement's artifact comes from.
    #[must_use]
    pub fn source(&self) -> &RequirementSource {
        &self.source
    }

    /// Return the VCS locator, if this is a VCS requirement.
    #[must_use]
    pub fn vcs(&self) -> Option<&VcsLocator> {
        match &self.source {
            RequirementSource::Vcs(locator) => Some(locator),
            RequirementSource::Index { .. } => None,
        }
    }

    /// Return true when `other` names the same package as this requirement.
    #[must_use]
    pub fn matches_name(&self, other: &str) -> bool {
        canonical_name(&self.name) == canonical_name(other)
    }

    /// Return the specifier handed to the package manager's download command.
    #[must_use]
    pub fn specifier(&self) -> String {
        match &self.source {
            RequirementSource::Index { comparators } => {
                let mut spec = self.name.clone();
                if !self.extras.is_empty() {
                    spec.push('[');
                    spec.push_str(&self.extras.join(","));
                    spec.push(']');
                }
                let constraints: Vec<String> =
                    comparators.iter().map(ToString::to_string).collect();
                spec.push_str(&constraints.join(","));
                spec
            }
            RequirementSource::Vcs(locator) => {
                let revision = locator
                    .revision
                    .as_deref()
                    .map(|rev| format!("@{rev}"))
                    .unwrap_or_default();
                format!("{}{revision}#egg={}", locator.uri, self.name)
            }
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.specifier())
    }
}

/// Normalise a package name the way the package index does: lowercase, with
/// runs of `-`, `_` and `.` collapsed to a single `-`.
///
/// # Examples
///
/// ```
/// use flatpak_pip_generator::requirement::canonical_name;
///
/// assert_eq!(canonical_name("Zope.Interface"), "zope-interface");
/// assert_eq!(canonical_name("typing__extensions"), "typing-extensions");
/// ```
#[must_use]
pub fn canonical_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_separator = false;
    for c in name.chars() {
        if matches!(c, '-' | '_' | '.') {
            if !in_separator {
                out.push('-');
            }
            in_separator = true;
        } else {
            out.push(c.to_ascii_lowercase());
            in_separator = false;
        }
    }
    out
}

/// Parse the contents of a requirements file.
///
/// Blank lines and comments are skipped, as are pip option lines other than
/// `-e`. The first malformed requirement aborts parsing.
///
/// # Errors
///
/// Returns [`GeneratorError::ParseAt`] naming the offending line.
pub fn parse_requirements(contents: &str, origin: &str) -> Result<Vec<Requirement>> {
    let mut requirements = Vec::new();
    for (index, raw) in contents.lines().enumerate() {
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with('-') && !line.starts_with("-e") {
            warn!("{origin}:{}: skipping unsupported option line: {line}", index + 1);
            continue;
        }
        let requirement = Requirement::parse(line).map_err(|e| GeneratorError::ParseAt {
            path: origin.to_owned(),
            line: index + 1,
            source: Box::new(e),
        })?;
        requirements.push(requirement);
    }
    Ok(requirements)
}

/// Read and parse a requirements file.
///
/// # Errors
///
/// Returns [`GeneratorError::Io`] if the file cannot be read, or
/// [`GeneratorError::ParseAt`] for the first malformed line.
pub fn parse_requirements_file(path: &Utf8Path) -> Result<Vec<Requirement>> {
    let contents = std::fs::read_to_string(path)?;
    parse_requirements(&contents, path.as_str())
}

/// Drop a `#` comment. A `#` directly attached to a token (as in `#egg=`) is
/// part of the requirement.
fn strip_comment(line: &str) -> &str {
    if line.trim_start().starts_with('#') {
        return "";
    }
    match line.find(" #").or_else(|| line.find("\t#")) {
        Some(idx) => line.get(..idx).unwrap_or(line),
        None => line,
    }
}

fn is_vcs_locator(line: &str) -> bool {
    line.split_once("://")
        .and_then(|(scheme, _)| scheme.split_once('+'))
        .is_some_and(|(prefix, _)| VcsKind::from_prefix(prefix).is_some())
}

fn parse_error(input: &str, reason: impl Into<String>) -> GeneratorError {
    GeneratorError::Parse {
        input: input.trim().to_owned(),
        reason: reason.into(),
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

fn validate_name(input: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(parse_error(input, "missing package name"));
    }
    if !name.chars().all(is_name_char) {
        return Err(parse_error(input, format!("invalid package name \"{name}\"")));
    }
    if !name.starts_with(|c: char| c.is_ascii_alphanumeric()) {
        return Err(parse_error(
            input,
            format!("package name \"{name}\" must start with a letter or digit"),
        ));
    }
    Ok(())
}

fn parse_index(input: &str, spec: &str) -> Result<Requirement> {
    let name_end = spec.find(|c: char| !is_name_char(c)).unwrap_or(spec.len());
    let (name, mut rest) = spec.split_at(name_end);
    validate_name(input, name)?;

    let mut extras = Vec::new();
    if let Some(after) = rest.trim_start().strip_prefix('[') {
        let (inner, tail) = after
            .split_once(']')
            .ok_or_else(|| parse_error(input, "unterminated extras list"))?;
        for extra in inner.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            validate_name(input, extra)?;
            extras.push(extra.to_owned());
        }
        rest = tail;
    }

    let comparators = parse_comparators(input, rest.trim())?;
    Ok(Requirement {
        name: name.to_owned(),
        extras,
        source: RequirementSource::Index { comparators },
    })
}

fn parse_comparators(input: &str, text: &str) -> Result<Vec<Comparator>> {
    if text.is_empty() {
        return Ok(Vec::new());
    }
    text.split(',')
        .map(str::trim)
        .map(|clause| parse_comparator(input, clause))
        .collect()
}

fn parse_comparator(input: &str, clause: &str) -> Result<Comparator> {
    let (text, operator) = OPERATORS
        .iter()
        .find(|(text, _)| clause.starts_with(text))
        .ok_or_else(|| {
            parse_error(
                input,
                format!("expected a version comparator, found \"{clause}\""),
            )
        })?;
    let version = clause.get(text.len()..).unwrap_or_default().trim();
    if version.is_empty() {
        return Err(parse_error(input, format!("missing version after \"{text}\"")));
    }
    let valid = version
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '*' | '+' | '!' | '-' | '_'));
    if !valid {
        return Err(parse_error(input, format!("invalid version \"{version}\"")));
    }
    Ok(Comparator {
        operator: *operator,
        version: version.to_owned(),
    })
}

fn parse_vcs(input: &str, line: &str) -> Result<Requirement> {
    let (locator, fragment) = line
        .split_once('#')
        .ok_or_else(|| parse_error(input, "VCS requirement is missing #egg=<name>"))?;
    let name = fragment
        .split('&')
        .find_map(|part| part.strip_prefix("egg="))
        .map(str::trim)
        .ok_or_else(|| parse_error(input, "VCS requirement is missing #egg=<name>"))?;
    validate_name(input, name)?;

    let (prefix, _) = locator
        .split_once('+')
        .ok_or_else(|| parse_error(input, "missing VCS prefix"))?;
    let kind = VcsKind::from_prefix(prefix)
        .ok_or_else(|| parse_error(input, format!("unknown VCS \"{prefix}\"")))?;

    let (uri, revision) = split_revision(locator);
    if revision.is_some_and(str::is_empty) {
        return Err(parse_error(input, "empty VCS revision"));
    }

    Ok(Requirement {
        name: name.to_owned(),
        extras: Vec::new(),
        source: RequirementSource::Vcs(VcsLocator {
            kind,
            uri: uri.to_owned(),
            revision: revision.map(str::to_owned),
        }),
    })
}

/// Split `scheme://[user@]host/path[@rev]` at the revision separator, which
/// is the last `@` inside the path.
fn split_revision(locator: &str) -> (&str, Option<&str>) {
    let Some(scheme_end) = locator.find("://") else {
        return (locator, None);
    };
    let authority_start = scheme_end + 3;
    let Some(path_offset) = locator.get(authority_start..).and_then(|s| s.find('/')) else {
        return (locator, None);
    };
    let path_start = authority_start + path_offset;
    match locator.get(path_start..).and_then(|path| path.rfind('@')) {
        Some(at) => {
            let (uri, rev) = locator.split_at(path_start + at);
            (uri, rev.get(1..))
        }
        None => (locator, None),
    }
}

#[cfg(test)]
#[path = "requirement_tests.rs"]
mod tests;
