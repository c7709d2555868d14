use crate::app::App;
use crate::errors::{ErrorCode, McpError, ToolError, ToolErrorKind};
use crate::mcp::aliases::canonical_tool_name;
use crate::mcp::catalog::{list_tools, validate_tool_args};
use crate::mcp::protocol::{JsonRpcRequest, JsonRpcResponse};
use crate::mcp::render::{render_failure, render_success};
use crate::services::config::{resolve_config, ConfigOverrides, EnvSnapshot};
use crate::services::logger::Logger;
use crate::services::tool_executor::{Caller, ToolContext};
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};

const PROTOCOL_VERSION: &str = "2025-06-18";
const SERVER_NAME: &str = "ampersand-mcp";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

fn map_tool_error(tool: &str, error: &ToolError) -> McpError {
    let mut lines = vec![
        format!("tool: {}", tool),
        format!("code: {}", error.code),
        format!("message: {}", error.message),
    ];
    if let Some(hint) = &error.hint {
        lines.push(format!("hint: {}", hint));
    }
    let message = lines.join("\n");

    match error.kind {
        ToolErrorKind::InvalidParams => McpError::new(ErrorCode::InvalidParams, message),
        ToolErrorKind::Denied | ToolErrorKind::NotFound => {
            McpError::new(ErrorCode::InvalidRequest, message)
        }
        _ => McpError::new(ErrorCode::InternalError, message),
    }
}

pub struct McpServer {
    app: Arc<App>,
    logger: Logger,
    overrides: ConfigOverrides,
}

impl McpServer {
    /// `overrides` are the server's explicit settings (CLI flags); they win
    /// over the environment on every call.
    pub fn new(app: Arc<App>, overrides: ConfigOverrides) -> Self {
        let logger = app.logger.child("mcp");
        Self {
            app,
            logger,
            overrides,
        }
    }

    async fn handle_initialize(&self) -> Value {
        serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {"tools": {"listChanged": false}},
            "serverInfo": {"name": SERVER_NAME, "version": SERVER_VERSION},
        })
    }

    async fn handle_tools_list(&self) -> Value {
        serde_json::json!({ "tools": list_tools() })
    }

    /// Protocol problems (unknown tool, schema violations) are JSON-RPC
    /// errors; failures of the tool itself come back as `isError` results.
    pub async fn handle_tools_call(&self, name: &str, raw_args: Value) -> Result<Value, McpError> {
        let requested = canonical_tool_name(name.trim());
        let tool = self
            .app
            .tool_executor
            .resolve(requested)
            .map_err(|err| map_tool_error(name, &err))?;
        let args = if raw_args.is_null() {
            Value::Object(Default::default())
        } else {
            raw_args
        };
        validate_tool_args(&tool, &args)?;

        let config = resolve_config(&self.overrides, &EnvSnapshot::capture());
        let ctx = ToolContext::new(config, Caller::Mcp);
        match self
            .app
            .tool_executor
            .dispatch(&tool, args.clone(), &ctx)
            .await
        {
            Ok(output) => Ok(render_success(&tool, &args, &output)),
            Err(err) => {
                self.logger.error(
                    "tool call failed",
                    Some(&serde_json::json!({
                        "tool": tool,
                        "provider": args.get("provider"),
                        "error": err,
                    })),
                );
                Ok(render_failure(&tool, &args, &err))
            }
        }
    }

    /// Handles one parsed request; `None` for notifications.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.method.starts_with("notifications/") && request.is_notification() {
            return None;
        }
        let id = request.id.clone()?;
        let response = match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(id, self.handle_initialize().await),
            "ping" | "notifications/initialized" => {
                JsonRpcResponse::success(id, serde_json::json!({}))
            }
            "tools/list" => JsonRpcResponse::success(id, self.handle_tools_list().await),
            "tools/call" => {
                let name = request.tool_name();
                if name.is_empty() {
                    JsonRpcResponse::from_error(id, McpError::invalid_params("Missing tool name"))
                } else {
                    match self.handle_tools_call(name, request.tool_arguments()).await {
                        Ok(result) => JsonRpcResponse::success(id, result),
                        Err(err) => JsonRpcResponse::from_error(id, err),
                    }
                }
            }
            _ => JsonRpcResponse::from_error(id, McpError::from_code(ErrorCode::MethodNotFound)),
        };
        Some(response)
    }

    /// Line-delimited JSON-RPC loop over any reader/writer pair.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> Result<(), ToolError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        let mut writer = BufWriter::new(writer);

        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|err| ToolError::internal(err.to_string()))?
        {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<Value>(trimmed) {
                Err(_) => Some(JsonRpcResponse::from_error(
                    Value::Null,
                    McpError::from_code(ErrorCode::ParseError),
                )),
                Ok(parsed) => match serde_json::from_value::<JsonRpcRequest>(parsed) {
                    Err(_) => Some(JsonRpcResponse::from_error(
                        Value::Null,
                        McpError::from_code(ErrorCode::InvalidRequest),
                    )),
                    Ok(request) => self.handle_request(request).await,
                },
            };

            if let Some(response) = response {
                let payload = serde_json::to_string(&response).unwrap_or_default();
                writer.write_all(payload.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }

        Ok(())
    }

    pub async fn run_stdio(&self) -> Result<(), ToolError> {
        self.logger.info(
            "server started",
            Some(&serde_json::json!({"transport": "stdio", "version": SERVER_VERSION})),
        );
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }
}

pub async fn run_stdio(overrides: ConfigOverrides) -> Result<(), ToolError> {
    let app = App::initialize()?;
    let server = McpServer::new(Arc::new(app), overrides);
    server.run_stdio().await
}
