//! The two MCP tools: `list_endpoints` and `call_rexi`.

use rexi_openapi::{CallRequest, RexiError, RexiService};
use rmcp::model::{CallToolResult, Content, JsonObject, Tool, ToolAnnotations};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

pub const LIST_ENDPOINTS: &str = "list_endpoints";
pub const CALL_REXI: &str = "call_rexi";

#[derive(Debug, Default, Deserialize)]
struct ListEndpointsArgs {
    #[serde(default)]
    tag: Option<String>,
}

#[must_use]
pub fn list_tools() -> Vec<Tool> {
    vec![list_endpoints_tool(), call_rexi_tool()]
}

fn list_endpoints_tool() -> Tool {
    let schema = json!({
        "type": "object",
        "properties": {
            "tag": {
                "type": "string",
                "description": "Only return endpoints carrying this tag (exact match)."
            }
        },
        "additionalProperties": false
    });

    let mut tool = Tool::new(
        LIST_ENDPOINTS,
        "List the Rexi API endpoints from the OpenAPI spec, optionally filtered by tag.",
        Arc::new(into_object(schema)),
    );
    tool.annotations = Some(ToolAnnotations {
        title: Some("List Rexi endpoints".to_string()),
        read_only_hint: Some(true),
        destructive_hint: Some(false),
        idempotent_hint: Some(true),
        open_world_hint: Some(false),
    });
    tool
}

fn call_rexi_tool() -> Tool {
    let schema = json!({
        "type": "object",
        "properties": {
            "method": {
                "type": "string",
                "description": "HTTP method (GET, POST, PUT, PATCH, DELETE, HEAD, OPTIONS, TRACE)."
            },
            "path": {
                "type": "string",
                "description": "Path template as listed by list_endpoints, e.g. /v1/contracts/{contract_address}."
            },
            "path_params": {
                "type": "object",
                "description": "Values for {name} placeholders in the path."
            },
            "query": {
                "type": "object",
                "description": "Query parameters. Arrays repeat the key."
            },
            "body": {
                "description": "JSON request body."
            },
            "extra_headers": {
                "type": "object",
                "additionalProperties": { "type": ["string", "number", "boolean"] },
                "description": "Extra request headers; override the API key header when they collide."
            },
            "timeout_seconds": {
                "type": "number",
                "exclusiveMinimum": 0,
                "default": 30,
                "description": "Request timeout in seconds."
            }
        },
        "required": ["method", "path"],
        "additionalProperties": false
    });

    let mut tool = Tool::new(
        CALL_REXI,
        "Call any Rexi API endpoint and return its status, headers, final URL and body.",
        Arc::new(into_object(schema)),
    );
    // Any upstream operation may be reached through this tool.
    tool.annotations = Some(ToolAnnotations {
        title: Some("Call Rexi API".to_string()),
        read_only_hint: Some(false),
        destructive_hint: None,
        idempotent_hint: None,
        open_world_hint: Some(true),
    });
    tool
}

pub fn call_list_endpoints(service: &RexiService, arguments: Option<JsonObject>) -> CallToolResult {
    let args: ListEndpointsArgs = match decode(arguments) {
        Ok(a) => a,
        Err(e) => return tool_error("validation", &format!("invalid arguments: {e}")),
    };

    let endpoints = service.list_endpoints(args.tag.as_deref());
    tracing::debug!(tag = ?args.tag, count = endpoints.len(), "list_endpoints");

    match serde_json::to_value(&endpoints) {
        Ok(list) => structured_result(json!({ "endpoints": list.clone() }), &list),
        Err(e) => tool_error("json", &e.to_string()),
    }
}

pub async fn call_call_rexi(service: &RexiService, arguments: Option<JsonObject>) -> CallToolResult {
    let request: CallRequest = match decode(arguments) {
        Ok(r) => r,
        Err(e) => return tool_error("validation", &format!("invalid arguments: {e}")),
    };

    match service.call(&request).await {
        Ok(result) => match serde_json::to_value(&result) {
            Ok(value) => structured_result(value.clone(), &value),
            Err(e) => tool_error("json", &e.to_string()),
        },
        Err(e) => {
            tracing::warn!(
                method = %request.method,
                path = %request.path,
                kind = e.kind(),
                error = %e,
                "call_rexi failed"
            );
            rexi_error(&e)
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(arguments: Option<JsonObject>) -> serde_json::Result<T> {
    serde_json::from_value(Value::Object(arguments.unwrap_or_default()))
}

/// `structured` as structured content, `text` serialized as the text block.
fn structured_result(structured: Value, text: &Value) -> CallToolResult {
    let text = serde_json::to_string(text).unwrap_or_else(|_| text.to_string());
    CallToolResult {
        content: vec![Content::text(text)],
        structured_content: Some(structured),
        is_error: Some(false),
        meta: None,
    }
}

fn rexi_error(e: &RexiError) -> CallToolResult {
    tool_error(e.kind(), &e.to_string())
}

/// Tool-level failure: `isError: true` with `{"error": {"kind", "message"}}`.
pub fn tool_error(kind: &str, message: &str) -> CallToolResult {
    let body = json!({ "error": { "kind": kind, "message": message } });
    CallToolResult {
        content: vec![Content::text(body.to_string())],
        structured_content: Some(body),
        is_error: Some(true),
        meta: None,
    }
}

fn into_object(value: Value) -> JsonObject {
    match value {
        Value::Object(map) => map,
        _ => JsonObject::new(),
    }
}
