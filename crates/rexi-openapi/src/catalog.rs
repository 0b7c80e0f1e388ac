//! The loaded spec and everything derived from it.
//!
//! A [`Catalog`] is built once per load and never mutated. [`CatalogHandle`] owns the current
//! catalog and swaps in a fresh one on reload, so readers always see a consistent
//! document/index/base URL triple.

use crate::document::{LoadedSpec, OpenApiDocument, load_spec};
use crate::error::Result;
use crate::index::EndpointIndex;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Base URL used when the document declares no usable server.
pub const DEFAULT_BASE_URL: &str = "https://api.rexi.sh";

/// `servers[0].url` when present and non-empty, else [`DEFAULT_BASE_URL`].
#[must_use]
pub fn resolve_base_url(document: &OpenApiDocument) -> String {
    document
        .servers
        .first()
        .and_then(|s| s.url.as_deref())
        .filter(|u| !u.is_empty())
        .unwrap_or(DEFAULT_BASE_URL)
        .to_string()
}

#[derive(Debug)]
pub struct Catalog {
    spec_path: PathBuf,
    document: OpenApiDocument,
    index: EndpointIndex,
    base_url: String,
    fingerprint: Option<String>,
}

impl Catalog {
    /// Load the spec at `spec_path` and derive the endpoint index and base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the spec file exists but cannot be read or parsed. A missing file
    /// yields an empty catalog.
    pub fn load(spec_path: impl Into<PathBuf>) -> Result<Self> {
        let spec_path = spec_path.into();
        let loaded = load_spec(&spec_path)?;
        Ok(Self::from_loaded(spec_path, loaded))
    }

    #[must_use]
    pub fn from_loaded(spec_path: PathBuf, loaded: LoadedSpec) -> Self {
        let LoadedSpec {
            document,
            fingerprint,
        } = loaded;
        let index = EndpointIndex::build(&document);
        let base_url = resolve_base_url(&document);

        tracing::info!(
            spec = %spec_path.display(),
            endpoints = index.len(),
            base_url = %base_url,
            title = document.title().as_deref().unwrap_or("-"),
            openapi = document.openapi_version().as_deref().unwrap_or("-"),
            "loaded OpenAPI catalog"
        );

        Self {
            spec_path,
            document,
            index,
            base_url,
            fingerprint,
        }
    }

    #[must_use]
    pub fn spec_path(&self) -> &Path {
        &self.spec_path
    }

    #[must_use]
    pub fn document(&self) -> &OpenApiDocument {
        &self.document
    }

    #[must_use]
    pub fn endpoints(&self) -> &EndpointIndex {
        &self.index
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// The file bytes did not change; the current catalog was kept.
    Unchanged,
    /// A new catalog replaced the previous one.
    Replaced { endpoints: usize },
}

#[derive(Debug)]
pub struct CatalogHandle {
    current: RwLock<Arc<Catalog>>,
}

impl CatalogHandle {
    #[must_use]
    pub fn new(catalog: Catalog) -> Self {
        Self {
            current: RwLock::new(Arc::new(catalog)),
        }
    }

    /// Snapshot of the current catalog. Cheap; never hold the lock across `.await`.
    #[must_use]
    pub fn current(&self) -> Arc<Catalog> {
        Arc::clone(&self.current.read())
    }

    /// Re-read the spec file and swap in a new catalog if its contents changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed; the previous catalog
    /// stays in place.
    pub fn reload(&self) -> Result<ReloadOutcome> {
        let spec_path = self.current().spec_path().to_path_buf();
        let loaded = load_spec(&spec_path)?;

        if loaded.fingerprint.as_deref() == self.current().fingerprint() {
            return Ok(ReloadOutcome::Unchanged);
        }

        let catalog = Catalog::from_loaded(spec_path, loaded);
        let endpoints = catalog.endpoints().len();
        *self.current.write() = Arc::new(catalog);
        Ok(ReloadOutcome::Replaced { endpoints })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn doc(yaml: &str) -> OpenApiDocument {
        OpenApiDocument::parse(yaml, "inline").unwrap()
    }

    #[test]
    fn resolve_uses_first_server_url() {
        let d = doc("servers:\n  - url: https://staging.rexi.sh\n  - url: https://other\n");
        assert_eq!(resolve_base_url(&d), "https://staging.rexi.sh");
    }

    #[test]
    fn resolve_falls_back_to_default() {
        assert_eq!(resolve_base_url(&OpenApiDocument::default()), DEFAULT_BASE_URL);
        assert_eq!(resolve_base_url(&doc("servers: []\n")), DEFAULT_BASE_URL);
        assert_eq!(
            resolve_base_url(&doc("servers:\n  - url: ''\n")),
            DEFAULT_BASE_URL
        );
        assert_eq!(
            resolve_base_url(&doc("servers:\n  - description: no url\n")),
            DEFAULT_BASE_URL
        );
    }

    #[test]
    fn missing_spec_file_yields_empty_catalog() {
        let dir = tempdir().unwrap();
        let catalog = Catalog::load(dir.path().join("openapi.yaml")).unwrap();
        assert!(catalog.endpoints().is_empty());
        assert_eq!(catalog.base_url(), DEFAULT_BASE_URL);
        assert_eq!(catalog.fingerprint(), None);
    }

    #[test]
    fn reload_swaps_only_when_the_file_changes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("openapi.yaml");
        std::fs::write(&path, "paths:\n  /a:\n    get: {}\n").unwrap();

        let handle = CatalogHandle::new(Catalog::load(&path).unwrap());
        let before = handle.current();
        assert_eq!(before.endpoints().len(), 1);

        assert_eq!(handle.reload().unwrap(), ReloadOutcome::Unchanged);
        assert!(Arc::ptr_eq(&before, &handle.current()));

        std::fs::write(&path, "paths:\n  /a:\n    get: {}\n  /b:\n    post: {}\n").unwrap();
        assert_eq!(
            handle.reload().unwrap(),
            ReloadOutcome::Replaced { endpoints: 2 }
        );
        assert_eq!(handle.current().endpoints().len(), 2);

        // Readers holding the old snapshot keep a consistent view.
        assert_eq!(before.endpoints().len(), 1);
    }

    #[test]
    fn failed_reload_keeps_previous_catalog() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("openapi.yaml");
        std::fs::write(&path, "paths:\n  /a:\n    get: {}\n").unwrap();
        let handle = CatalogHandle::new(Catalog::load(&path).unwrap());

        std::fs::write(&path, "paths: [unterminated").unwrap();
        assert!(handle.reload().is_err());
        assert_eq!(handle.current().endpoints().len(), 1);
    }
}
