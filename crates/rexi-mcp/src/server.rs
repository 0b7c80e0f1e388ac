use crate::resources::{self, ResourceTarget};
use crate::tools;
use rexi_openapi::{RexiError, RexiService};
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Implementation, ListResourcesResult, ListToolsResult,
    PaginatedRequestParam, ReadResourceRequestParam, ReadResourceResult, ResourceContents,
    ServerCapabilities, ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData, RoleServer, ServerHandler};

pub const SERVER_NAME: &str = "rexi-mcp";

pub const INSTRUCTIONS: &str = "MCP server wrapping Rexi API. Use 'list_endpoints' to discover routes and 'call_rexi' to call them. OpenAPI spec and JSON schemas are available as resources.";

/// MCP front for a [`RexiService`]. Cheap to clone; one clone per session.
#[derive(Debug, Clone)]
pub struct RexiMcpServer {
    service: RexiService,
}

impl RexiMcpServer {
    #[must_use]
    pub fn new(service: RexiService) -> Self {
        Self { service }
    }
}

impl ServerHandler for RexiMcpServer {
    fn get_info(&self) -> ServerInfo {
        let mut implementation = Implementation::from_build_env();
        implementation.name = SERVER_NAME.to_string();
        implementation.version = env!("CARGO_PKG_VERSION").to_string();

        ServerInfo {
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: implementation,
            instructions: Some(INSTRUCTIONS.to_string()),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult::with_all_items(tools::list_tools()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let CallToolRequestParam {
            name, arguments, ..
        } = request;
        tracing::info!(tool = %name, "tool call");

        match name.as_ref() {
            tools::LIST_ENDPOINTS => Ok(tools::call_list_endpoints(&self.service, arguments)),
            tools::CALL_REXI => Ok(tools::call_call_rexi(&self.service, arguments).await),
            other => Err(ErrorData::invalid_params(
                format!("unknown tool: {other}"),
                None,
            )),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, ErrorData> {
        Ok(ListResourcesResult::with_all_items(resources::list_resources(
            &self.service,
        )))
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, ErrorData> {
        let uri = request.uri;
        let text = match ResourceTarget::parse(&uri) {
            Ok(target) => resources::read_resource(&self.service, &target).await,
            Err(e) => Err(e),
        }
        .map_err(|e| resource_error(&uri, &e))?;

        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(text, uri)],
        })
    }
}

fn resource_error(uri: &str, e: &RexiError) -> ErrorData {
    match e {
        RexiError::NotFound(message) => ErrorData::resource_not_found(message.clone(), None),
        _ => {
            tracing::warn!(uri = %uri, error = %e, "resource read failed");
            ErrorData::internal_error(e.to_string(), None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_info_advertises_tools_and_resources() {
        let dir = tempfile::tempdir().unwrap();
        let service = crate::build_service(
            &dir.path().join("openapi.yaml"),
            &dir.path().join("schema"),
            rexi_openapi::DispatcherConfig::default(),
        )
        .unwrap();
        let info = RexiMcpServer::new(service).get_info();

        assert_eq!(info.server_info.name, SERVER_NAME);
        assert_eq!(info.instructions.as_deref(), Some(INSTRUCTIONS));
        assert!(info.capabilities.tools.is_some());
        assert!(info.capabilities.resources.is_some());
    }
}
