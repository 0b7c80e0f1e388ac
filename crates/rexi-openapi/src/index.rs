//! Endpoint index: one descriptor per `(path, method)` pair of an `OpenAPI` document.

use crate::document::{OpenApiDocument, Operation};
use serde::Serialize;
use serde_json::Value;
use serde_yaml::Value as YamlValue;

/// Operation keys of an `OpenAPI` path item (lowercase, as written in the spec).
pub const HTTP_METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointDescriptor {
    /// Uppercase HTTP method.
    pub method: String,
    /// Path template, with `{name}` placeholders left in place.
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Value>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub has_request_body: bool,
}

impl EndpointDescriptor {
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Ordered list of endpoint descriptors, in document traversal order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EndpointIndex {
    endpoints: Vec<EndpointDescriptor>,
}

impl EndpointIndex {
    /// Walk `paths` once, emitting a descriptor for every operation.
    ///
    /// Paths keep document key order and methods keep their order within a path. Non-mapping
    /// path items and non-operation keys (`parameters`, `summary`, `x-*`, ...) are skipped.
    /// Repeated pairs are emitted as found.
    #[must_use]
    pub fn build(document: &OpenApiDocument) -> Self {
        let mut endpoints = Vec::new();

        for (path, item) in &document.paths {
            let Some(item) = item.as_mapping() else {
                tracing::debug!(path = %path, "skipping non-mapping path item");
                continue;
            };

            for (key, value) in item {
                let Some(method) = key.as_str().and_then(operation_method) else {
                    continue;
                };

                let operation = match value {
                    YamlValue::Mapping(map) => Operation::from_mapping(map),
                    YamlValue::Null => Operation::default(),
                    _ => {
                        tracing::debug!(path = %path, method = %method, "skipping non-mapping operation");
                        continue;
                    }
                };

                endpoints.push(descriptor(path, method, operation));
            }
        }

        Self { endpoints }
    }

    /// Descriptors carrying `tag` (exact, case-sensitive). `None` or `""` returns everything.
    #[must_use]
    pub fn filter(&self, tag: Option<&str>) -> Vec<EndpointDescriptor> {
        match tag.filter(|t| !t.is_empty()) {
            None => self.endpoints.clone(),
            Some(tag) => self
                .endpoints
                .iter()
                .filter(|e| e.has_tag(tag))
                .cloned()
                .collect(),
        }
    }

    #[must_use]
    pub fn all(&self) -> &[EndpointDescriptor] {
        &self.endpoints
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

fn operation_method(key: &str) -> Option<String> {
    let lower = key.to_ascii_lowercase();
    HTTP_METHODS
        .contains(&lower.as_str())
        .then(|| lower.to_ascii_uppercase())
}

fn descriptor(path: &str, method: String, operation: Operation) -> EndpointDescriptor {
    let parameters = operation
        .parameters
        .iter()
        .filter_map(|p| match serde_json::to_value(p) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::debug!(path = %path, method = %method, error = %e, "dropping parameter");
                None
            }
        })
        .collect();

    EndpointDescriptor {
        method,
        path: path.to_string(),
        summary: operation.summary,
        operation_id: operation.operation_id,
        tags: operation.tags,
        parameters,
        has_request_body: operation.has_request_body,
    }
}
