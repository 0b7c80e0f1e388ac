//! Read-only views over the spec file and the schema directory.
//!
//! Missing files are never errors here: callers get a not-found marker they can hand straight
//! back to the client.

use crate::error::{Result, RexiError};
use crate::index::EndpointIndex;
use std::path::{Component, Path, PathBuf};

/// Text returned in place of the spec when the file does not exist.
pub const SPEC_NOT_FOUND: &str = "OpenAPI spec not found.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceText {
    Found(String),
    /// The resource does not exist; the payload is the marker text to return instead.
    NotFound(String),
}

impl ResourceText {
    #[must_use]
    pub fn into_text(self) -> String {
        match self {
            Self::Found(t) | Self::NotFound(t) => t,
        }
    }

    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

/// Raw spec file contents, unmodified.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read.
pub async fn read_spec_text(path: &Path) -> Result<ResourceText> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(ResourceText::Found(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Ok(ResourceText::NotFound(SPEC_NOT_FOUND.to_string()))
        }
        Err(source) => Err(RexiError::ReadFile {
            path: path.display().to_string(),
            source,
        }),
    }
}

/// The full endpoint index as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn routes_json(index: &EndpointIndex) -> Result<String> {
    Ok(serde_json::to_string_pretty(index.all())?)
}

/// JSON marker returned for a schema name that does not resolve to a file.
#[must_use]
pub fn schema_not_found(name: &str) -> String {
    serde_json::json!({ "error": format!("schema '{name}' not found") }).to_string()
}

/// A directory of schema files, addressed by bare file name.
#[derive(Debug, Clone)]
pub struct SchemaDirectory {
    root: PathBuf,
}

impl SchemaDirectory {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Names of the regular files directly under the directory, sorted. A missing or
    /// unreadable directory lists as empty.
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.root) else {
            return Vec::new();
        };

        let mut names: Vec<String> = entries
            .filter_map(std::result::Result::ok)
            .filter(|e| e.file_type().is_ok_and(|t| t.is_file()))
            .filter_map(|e| e.file_name().into_string().ok())
            .collect();
        names.sort();
        names
    }

    /// [`Self::list`] as a pretty-printed JSON array.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn list_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.list())?)
    }

    /// Contents of schema `name`, or the not-found marker.
    ///
    /// # Errors
    ///
    /// Returns an error if the file resolves but cannot be read.
    pub async fn read(&self, name: &str) -> Result<ResourceText> {
        let Some(path) = self.resolve(name) else {
            tracing::debug!(schema = %name, "schema not found or outside the schema directory");
            return Ok(ResourceText::NotFound(schema_not_found(name)));
        };

        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(ResourceText::Found(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(ResourceText::NotFound(schema_not_found(name)))
            }
            Err(source) => Err(RexiError::ReadFile {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    /// Resolve `name` to a regular file inside the directory.
    ///
    /// `name` must be a single plain path component. The resolved file must still sit under
    /// the directory after symlinks are followed.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        if name.is_empty() || name.contains('\\') {
            return None;
        }
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => {}
            _ => return None,
        }

        let root = self.root.canonicalize().ok()?;
        let path = root.join(name).canonicalize().ok()?;
        (path.starts_with(&root) && path.is_file()).then_some(path)
    }
}
