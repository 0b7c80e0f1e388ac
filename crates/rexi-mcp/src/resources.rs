//! MCP resource URIs and their routing onto [`RexiService`].

use rexi_openapi::{ResourceText, RexiError, RexiService};
use rmcp::model::{Annotated, RawResource, Resource};

pub const OPENAPI_URI: &str = "rexi://openapi";
pub const ROUTES_URI: &str = "rexi://routes";
pub const SCHEMAS_URI: &str = "rexi://schemas";
pub const SCHEMA_URI_PREFIX: &str = "rexi-schemas://";

const JSON_MIME: &str = "application/json";

/// What a resource URI refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceTarget<'a> {
    OpenApi,
    Routes,
    Schemas,
    Schema(&'a str),
}

impl<'a> ResourceTarget<'a> {
    /// # Errors
    ///
    /// Returns [`RexiError::NotFound`] for a URI outside the `rexi://` and `rexi-schemas://`
    /// families.
    pub fn parse(uri: &'a str) -> rexi_openapi::Result<Self> {
        match uri {
            OPENAPI_URI => Ok(Self::OpenApi),
            ROUTES_URI => Ok(Self::Routes),
            SCHEMAS_URI => Ok(Self::Schemas),
            _ => uri
                .strip_prefix(SCHEMA_URI_PREFIX)
                .map(Self::Schema)
                .ok_or_else(|| RexiError::NotFound(format!("unknown resource: {uri}"))),
        }
    }
}

#[must_use]
pub fn list_resources(service: &RexiService) -> Vec<Resource> {
    let spec_mime = if service
        .catalog()
        .spec_path()
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
    {
        JSON_MIME
    } else {
        "application/yaml"
    };

    let mut resources = vec![
        resource(
            OPENAPI_URI,
            "openapi",
            "Raw Rexi API OpenAPI spec",
            spec_mime,
        ),
        resource(
            ROUTES_URI,
            "routes",
            "Index of Rexi API endpoints (method, path, summary, tags)",
            JSON_MIME,
        ),
        resource(
            SCHEMAS_URI,
            "schemas",
            "Names of the available JSON schema files",
            JSON_MIME,
        ),
    ];

    for name in service.schema_names() {
        let mime = if name.to_ascii_lowercase().ends_with(".json") {
            JSON_MIME
        } else {
            "text/plain"
        };
        resources.push(resource(
            &format!("{SCHEMA_URI_PREFIX}{name}"),
            &name,
            "Rexi API schema file",
            mime,
        ));
    }

    resources
}

/// Text for `target`. Missing files come back as their not-found markers.
///
/// # Errors
///
/// Returns an error if a file exists but cannot be read.
pub async fn read_resource(
    service: &RexiService,
    target: &ResourceTarget<'_>,
) -> rexi_openapi::Result<String> {
    let text = match target {
        ResourceTarget::OpenApi => service.openapi_text().await?,
        ResourceTarget::Routes => ResourceText::Found(service.routes_json()?),
        ResourceTarget::Schemas => ResourceText::Found(service.schemas_json()?),
        ResourceTarget::Schema(name) => service.schema(name).await?,
    };
    if !text.is_found() {
        tracing::debug!(?target, "resource not found; returning marker");
    }
    Ok(text.into_text())
}

fn resource(uri: &str, name: &str, description: &str, mime_type: &str) -> Resource {
    let mut raw = RawResource::new(uri.to_string(), name.to_string());
    raw.description = Some(description.to_string());
    raw.mime_type = Some(mime_type.to_string());
    Annotated::new(raw, None)
}
