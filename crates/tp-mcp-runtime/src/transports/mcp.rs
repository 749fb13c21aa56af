//! Model Context Protocol (MCP) transport implementation.
//!
//! [`McpService`] implements `rmcp::ServerHandler` over a [`Toolbox`], so the
//! cluster and job operations can be served over stdio or streamable HTTP.
//!
//! Tool results are always text. Failures reported by a tool (missing
//! credential, refused confirmation, nonzero CLI exit) come back as a
//! successful protocol response with `is_error` set, so the agent can read
//! the message. Only calls that never reach a tool (unknown name, arguments
//! that do not deserialize) are protocol errors.

use std::{borrow::Cow, sync::Arc};

use rmcp::{
    ErrorData, RoleServer,
    handler::server::ServerHandler,
    model::{
        CallToolRequestParam, CallToolResult, Content, Implementation, JsonObject,
        ListToolsResult, PaginatedRequestParam, ServerCapabilities, ServerInfo, Tool,
    },
    service::RequestContext,
    transport::streamable_http_server::{
        StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
    },
};
use tp_mcp_core::{ToolInfo, Toolbox, ToolboxError};
use tracing::info;

const SERVER_NAME: &str = "tp-mcp";

const INSTRUCTIONS: &str = "Manage TensorPool GPU clusters and jobs through the `tp` CLI. \
Destructive tools (cluster_destroy, job_cancel) require confirm=true. \
Write a job config with job_write_config before job_push.";

/// MCP server service implementation.
///
/// # Example
///
/// ```ignore
/// use tp_mcp_runtime::McpService;
///
/// let service = McpService::new(toolbox);
/// let http_service = service.streamable_http_service();
/// let router = axum::Router::new().nest_service("/mcp", http_service);
/// ```
#[derive(Clone)]
pub struct McpService {
    toolbox: Toolbox,
    tools: Arc<Vec<Tool>>,
    info: ServerInfo,
}

impl McpService {
    /// Create a new MCP service with default server info.
    #[must_use]
    pub fn new(toolbox: Toolbox) -> Self {
        Self::with_info(toolbox, default_server_info())
    }

    /// Create a new MCP service with custom server info.
    #[must_use]
    pub fn with_info(toolbox: Toolbox, info: ServerInfo) -> Self {
        let tools = Toolbox::tools().iter().map(tool_info_to_mcp).collect();
        Self {
            toolbox,
            tools: Arc::new(tools),
            info,
        }
    }

    /// Returns the toolbox calls are dispatched to.
    #[must_use]
    pub fn toolbox(&self) -> &Toolbox {
        &self.toolbox
    }

    /// Returns the tools advertised by `tools/list`.
    #[must_use]
    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    /// Returns a reference to the server info.
    #[must_use]
    pub fn info(&self) -> &ServerInfo {
        &self.info
    }

    /// Creates a streamable HTTP service with default configuration.
    #[must_use]
    pub fn streamable_http_service(&self) -> StreamableHttpService<Self, LocalSessionManager> {
        self.streamable_http_service_with_config(StreamableHttpServerConfig::default())
    }

    /// Creates a streamable HTTP service with custom configuration.
    ///
    /// Returns an Axum-compatible service that can be mounted in a router.
    #[must_use]
    pub fn streamable_http_service_with_config(
        &self,
        config: StreamableHttpServerConfig,
    ) -> StreamableHttpService<Self, LocalSessionManager> {
        let service = self.clone();
        StreamableHttpService::new(move || Ok(service.clone()), Arc::default(), config)
    }
}

impl ServerHandler for McpService {
    fn get_info(&self) -> ServerInfo {
        self.info.clone()
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, ErrorData>> + Send + '_ {
        let tools = self.tools.as_ref().clone();
        async move { Ok(ListToolsResult::with_all_items(tools)) }
    }

    fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, ErrorData>> + Send + '_ {
        let toolbox = self.toolbox.clone();
        async move {
            info!(tool = %request.name, request_id = %context.id, "MCP tool call");

            let arguments = request.arguments.map(serde_json::Value::Object);
            let output = toolbox
                .call(&request.name, arguments)
                .await
                .map_err(|e| toolbox_error_to_mcp(&e))?;

            let content = vec![Content::text(output.text)];
            Ok(if output.is_error {
                CallToolResult::error(content)
            } else {
                CallToolResult::success(content)
            })
        }
    }
}

/// Creates the default server info with tools capability enabled.
fn default_server_info() -> ServerInfo {
    ServerInfo {
        capabilities: ServerCapabilities::builder().enable_tools().build(),
        server_info: Implementation {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            title: Some("TensorPool MCP".to_string()),
            ..Default::default()
        },
        instructions: Some(INSTRUCTIONS.to_string()),
        ..Default::default()
    }
}

/// Converts a toolbox descriptor to the MCP [`Tool`] format.
fn tool_info_to_mcp(info: &ToolInfo) -> Tool {
    let mut tool = Tool::new(
        Cow::Borrowed(info.name),
        Cow::Borrowed(info.description),
        Arc::new(schema_to_object(&info.input_schema)),
    );
    tool.title = Some(info.title.to_string());
    tool
}

/// Extracts a `JsonObject` from a JSON schema value, or an empty object
/// schema if it is not an object.
fn schema_to_object(value: &serde_json::Value) -> JsonObject {
    match value {
        serde_json::Value::Object(map) => map.clone(),
        _ => {
            let mut map = JsonObject::default();
            map.insert("type".to_string(), serde_json::Value::from("object"));
            map
        }
    }
}

/// Maps toolbox errors to MCP errors:
/// - `UnknownTool` → `resource_not_found`
/// - `InvalidArguments` → `invalid_params`
fn toolbox_error_to_mcp(error: &ToolboxError) -> ErrorData {
    let message = error.to_string();
    match error {
        ToolboxError::UnknownTool(_) => ErrorData::resource_not_found(message, None),
        ToolboxError::InvalidArguments { .. } => ErrorData::invalid_params(message, None),
        _ => ErrorData::internal_error(message, None),
    }
}
