//! Package index lookups.
//!
//! Maps a fetched artifact's filename back to its canonical download URL by
//! reading the index's JSON metadata for the package. The [`PackageIndex`]
//! trait is the network seam so tests can run without HTTP access.

use crate::requirement::canonical_name;
use log::debug;
use serde::Deserialize;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::time::Duration;

/// Default base URL of the package index JSON API.
pub const DEFAULT_INDEX_URL: &str = "https://pypi.org/pypi";

/// Default timeout for a single index request.
pub const DEFAULT_INDEX_TIMEOUT: Duration = Duration::from_secs(30);

/// Largest metadata document accepted from the index.
///
/// Long-lived packages publish many files per release, so their documents
/// easily exceed ureq's 10 MiB default body limit.
pub const MAX_METADATA_BYTES: u64 = 256 * 1024 * 1024;

/// Errors arising from index lookups.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// The HTTP request failed or timed out.
    #[error("index request failed for {url}: {reason}")]
    Network {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The index has no such package (HTTP 404).
    #[error("package not found on index: {url}")]
    PackageNotFound {
        /// The URL that returned 404.
        url: String,
    },

    /// The index response was not the expected JSON document.
    #[error("undecodable index response for {package}: {reason}")]
    Decode {
        /// The package whose metadata was requested.
        package: String,
        /// Description of the decoding failure.
        reason: String,
    },

    /// No release of the package lists the requested filename.
    #[error("no release of {package} provides {filename}")]
    ArtifactNotFound {
        /// The package that was searched.
        package: String,
        /// The filename that was not found.
        filename: String,
    },
}

/// Source of package metadata documents.
#[cfg_attr(test, mockall::automock)]
pub trait PackageIndex {
    /// Fetch the raw JSON metadata document for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Network`] or [`IndexError::PackageNotFound`] when
    /// the document cannot be retrieved.
    fn fetch_metadata(&self, name: &str) -> Result<String, IndexError>;
}

/// HTTP-backed package index using `ureq`.
pub struct HttpIndex {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpIndex {
    /// Create an index client for `base_url` with a global request timeout.
    #[must_use]
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self::with_config(base_url, config)
    }

    fn with_config(base_url: &str, config: ureq::config::Config) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            agent: ureq::Agent::new_with_config(config),
        }
    }

    /// Construct the metadata URL for a package.
    ///
    /// # Examples
    ///
    /// ```
    /// use flatpak_pip_generator::index::{DEFAULT_INDEX_TIMEOUT, HttpIndex};
    ///
    /// let index = HttpIndex::new("https://pypi.org/pypi/", DEFAULT_INDEX_TIMEOUT);
    /// assert_eq!(index.metadata_url("requests"), "https://pypi.org/pypi/requests/json");
    /// ```
    #[must_use]
    pub fn metadata_url(&self, name: &str) -> String {
        format!("{}/{name}/json", self.base_url)
    }
}

impl Default for HttpIndex {
    fn default() -> Self {
        Self::new(DEFAULT_INDEX_URL, DEFAULT_INDEX_TIMEOUT)
    }
}

impl PackageIndex for HttpIndex {
    fn fetch_metadata(&self, name: &str) -> Result<String, IndexError> {
        let url = self.metadata_url(name);
        debug!("GET {url}");
        let response = self
            .agent
            .get(&url)
            .call()
            .map_err(|e| map_ureq_error(&url, &e))?;
        let mut body = response.into_body();
        body.with_config()
            .limit(MAX_METADATA_BYTES)
            .read_to_string()
            .map_err(|e| IndexError::Network {
                url: url.clone(),
                reason: e.to_string(),
            })
    }
}

/// Map a ureq error to an [`IndexError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> IndexError {
    match err {
        ureq::Error::StatusCode(404) => IndexError::PackageNotFound {
            url: url.to_owned(),
        },
        other => IndexError::Network {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}

/// One file entry of a release.
#[derive(Debug, Clone, Deserialize)]
struct ReleaseFile {
    filename: String,
    url: String,
}

/// The subset of the index metadata document this crate reads.
#[derive(Debug, Clone, Deserialize)]
struct IndexDocument {
    #[serde(default)]
    releases: BTreeMap<String, Vec<ReleaseFile>>,
}

impl IndexDocument {
    fn find_url(&self, filename: &str) -> Option<&str> {
        self.releases
            .values()
            .flatten()
            .find(|file| file.filename == filename)
            .map(|file| file.url.as_str())
    }
}

/// Resolves artifact filenames to download URLs, fetching each package's
/// metadata at most once per run.
pub struct IndexResolver<'a> {
    index: &'a dyn PackageIndex,
    cache: RefCell<HashMap<String, Rc<IndexDocument>>>,
}

impl<'a> IndexResolver<'a> {
    /// Wrap an index with a per-run metadata cache.
    #[must_use]
    pub fn new(index: &'a dyn PackageIndex) -> Self {
        Self {
            index,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Return the download URL of `filename` as published for `name`.
    ///
    /// Every release is scanned and the first exact filename match wins.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::ArtifactNotFound`] if no release lists the
    /// filename, or the fetch/decode error for the package's metadata.
    pub fn resolve_url(&self, name: &str, filename: &str) -> Result<String, IndexError> {
        let document = self.document(name)?;
        document
            .find_url(filename)
            .map(str::to_owned)
            .ok_or_else(|| IndexError::ArtifactNotFound {
                package: name.to_owned(),
                filename: filename.to_owned(),
            })
    }

    fn document(&self, name: &str) -> Result<Rc<IndexDocument>, IndexError> {
        let key = canonical_name(name);
        if let Some(document) = self.cache.borrow().get(&key) {
            return Ok(Rc::clone(document));
        }
        let body = self.index.fetch_metadata(name)?;
        let document: IndexDocument =
            serde_json::from_str(&body).map_err(|e| IndexError::Decode {
                package: name.to_owned(),
                reason: e.to_string(),
            })?;
        let document = Rc::new(document);
        self.cache.borrow_mut().insert(key, Rc::clone(&document));
        Ok(document)
    }
}
