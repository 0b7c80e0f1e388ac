//! Typed view of the parts of an `OpenAPI` document the index and dispatcher consume.
//!
//! Only `servers`, `paths` and `info` are modeled. Everything else in the file is ignored, and
//! path items stay as ordered YAML mappings so method keys keep their document order.

use crate::error::{Result, RexiError};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use serde_yaml::{Mapping, Value as YamlValue};
use sha2::{Digest, Sha256};
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenApiDocument {
    /// `openapi` version string (`3.1` would otherwise parse as a float).
    #[serde(default)]
    pub openapi: Option<YamlValue>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub info: Option<Info>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub servers: Vec<Server>,

    /// Path template -> path item, in document order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub paths: IndexMap<String, YamlValue>,
}

/// `info` object. Values are kept as raw YAML scalars (`version: 1.0` parses as a float).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Info {
    #[serde(default)]
    pub title: Option<YamlValue>,
    #[serde(default)]
    pub version: Option<YamlValue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Server {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// The operation fields the endpoint index reads.
///
/// Decoding is field-by-field: a field with an unexpected shape is dropped instead of failing
/// the whole operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Operation {
    pub summary: Option<String>,
    pub operation_id: Option<String>,
    pub tags: Vec<String>,
    pub parameters: Vec<YamlValue>,
    pub has_request_body: bool,
}

impl Operation {
    #[must_use]
    pub fn from_mapping(map: &Mapping) -> Self {
        let tags = map
            .get("tags")
            .and_then(YamlValue::as_sequence)
            .map(|seq| {
                seq.iter()
                    .filter_map(YamlValue::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let parameters = map
            .get("parameters")
            .and_then(YamlValue::as_sequence)
            .cloned()
            .unwrap_or_default();

        Self {
            summary: non_empty_str(map.get("summary")),
            operation_id: non_empty_str(map.get("operationId")),
            tags,
            parameters,
            has_request_body: map.get("requestBody").is_some_and(|v| !v.is_null()),
        }
    }
}

impl OpenApiDocument {
    /// Parse a YAML or JSON document.
    ///
    /// Empty (or whitespace-only) input is an empty document.
    ///
    /// # Errors
    ///
    /// Returns [`RexiError::SpecParse`] if the content is not a well-formed document.
    pub fn parse(content: &str, location: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        // JSON is a valid subset of YAML, so serde_yaml alone is enough.
        serde_yaml::from_str(content).map_err(|source| RexiError::SpecParse {
            location: location.to_string(),
            source,
        })
    }

    #[must_use]
    pub fn openapi_version(&self) -> Option<String> {
        self.openapi.as_ref().and_then(scalar_to_string)
    }

    #[must_use]
    pub fn title(&self) -> Option<String> {
        self.info
            .as_ref()
            .and_then(|i| i.title.as_ref())
            .and_then(scalar_to_string)
    }

    #[must_use]
    pub fn version(&self) -> Option<String> {
        self.info
            .as_ref()
            .and_then(|i| i.version.as_ref())
            .and_then(scalar_to_string)
    }
}

/// A loaded spec file: the parsed document plus the fingerprint of the bytes it came from.
#[derive(Debug, Clone, Default)]
pub struct LoadedSpec {
    pub document: OpenApiDocument,
    /// `sha256:<hex>` of the file bytes, `None` when the file does not exist.
    pub fingerprint: Option<String>,
}

impl LoadedSpec {
    #[must_use]
    pub fn found(&self) -> bool {
        self.fingerprint.is_some()
    }
}

/// Load the spec at `path`.
///
/// A missing file is not an error: it yields an empty document without a fingerprint.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_spec(path: &Path) -> Result<LoadedSpec> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "OpenAPI spec not found; using an empty document");
            return Ok(LoadedSpec::default());
        }
        Err(source) => {
            return Err(RexiError::ReadFile {
                path: path.display().to_string(),
                source,
            });
        }
    };

    let document = OpenApiDocument::parse(&content, &path.display().to_string())?;
    Ok(LoadedSpec {
        document,
        fingerprint: Some(fingerprint(content.as_bytes())),
    })
}

#[must_use]
pub fn fingerprint(bytes: &[u8]) -> String {
    format!("sha256:{}", hex::encode(Sha256::digest(bytes)))
}

/// Treat an explicit YAML `null` the same as a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn non_empty_str(value: Option<&YamlValue>) -> Option<String> {
    value
        .and_then(YamlValue::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn scalar_to_string(value: &YamlValue) -> Option<String> {
    match value {
        YamlValue::String(s) => Some(s.clone()),
        YamlValue::Number(n) => Some(n.to_string()),
        YamlValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const PING_SPEC: &str = r#"
openapi: 3.0.3
info:
  title: Rexi API
  version: 1.0
servers:
  - url: https://api.rexi.sh
paths:
  /v1/ping:
    get:
      summary: Ping
      tags: [ops]
"#;

    #[test]
    fn parses_servers_paths_and_info() {
        let doc = OpenApiDocument::parse(PING_SPEC, "inline").unwrap();
        assert_eq!(doc.servers.len(), 1);
        assert_eq!(doc.servers[0].url.as_deref(), Some("https://api.rexi.sh"));
        assert_eq!(doc.paths.len(), 1);
        assert!(doc.paths.contains_key("/v1/ping"));
        assert_eq!(doc.title().as_deref(), Some("Rexi API"));
        assert_eq!(doc.version().as_deref(), Some("1.0"));
        assert_eq!(doc.openapi_version().as_deref(), Some("3.0.3"));
    }

    #[test]
    fn parses_json_documents() {
        let json = r#"{"servers":[{"url":"https://example.com"}],"paths":{"/a":{"post":{}}}}"#;
        let doc = OpenApiDocument::parse(json, "inline.json").unwrap();
        assert_eq!(doc.servers[0].url.as_deref(), Some("https://example.com"));
        assert!(doc.paths.contains_key("/a"));
    }

    #[test]
    fn empty_and_null_sections_are_empty_documents() {
        let doc = OpenApiDocument::parse("   \n", "inline").unwrap();
        assert!(doc.paths.is_empty());
        assert!(doc.servers.is_empty());

        let doc = OpenApiDocument::parse("servers: null\npaths: null\n", "inline").unwrap();
        assert!(doc.paths.is_empty());
        assert!(doc.servers.is_empty());
    }

    #[test]
    fn malformed_documents_fail_to_parse() {
        let err = OpenApiDocument::parse("paths: [1, 2", "broken.yaml").unwrap_err();
        assert_eq!(err.kind(), "spec");
        assert!(err.to_string().contains("broken.yaml"));
    }

    #[test]
    fn operation_fields_with_unexpected_shapes_are_dropped() {
        let yaml = "summary: 42\ntags: ops\noperationId: ping\nrequestBody: null\n";
        let map: Mapping = serde_yaml::from_str(yaml).unwrap();
        let op = Operation::from_mapping(&map);
        assert_eq!(op.summary, None);
        assert!(op.tags.is_empty());
        assert_eq!(op.operation_id.as_deref(), Some("ping"));
        assert!(!op.has_request_body);
    }

    #[test]
    fn missing_file_loads_as_empty_document() {
        let dir = tempdir().unwrap();
        let loaded = load_spec(&dir.path().join("nope.yaml")).unwrap();
        assert!(!loaded.found());
        assert!(loaded.document.paths.is_empty());
    }

    #[test]
    fn loaded_file_carries_a_fingerprint() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("openapi.yaml");
        std::fs::write(&path, PING_SPEC).unwrap();

        let loaded = load_spec(&path).unwrap();
        assert!(loaded.found());
        assert_eq!(
            loaded.fingerprint.as_deref(),
            Some(fingerprint(PING_SPEC.as_bytes()).as_str())
        );
        assert!(
            loaded
                .fingerprint
                .as_deref()
                .is_some_and(|f| f.starts_with("sha256:"))
        );
    }
}
