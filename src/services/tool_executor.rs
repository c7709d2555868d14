use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::ToolError;
use crate::mcp::catalog::validate_tool_args;
use crate::services::config::PlatformConfig;
use crate::services::logger::Logger;
use crate::utils::tool_errors::unknown_tool_error;

use serde_json::Value;

/// Which adapter layer is driving the call. Only used to tag installations
/// created on the caller's behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    Mcp,
    Sdk,
    Workflow,
}

impl Caller {
    pub fn layer(self) -> &'static str {
        match self {
            Caller::Mcp => "mcp",
            Caller::Sdk => "sdk",
            Caller::Workflow => "workflow",
        }
    }

    pub fn tag(self, operation: &str) -> String {
        format!("{}:{}", self.layer(), operation)
    }
}

/// Per-call state handed to every handler.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub config: PlatformConfig,
    pub caller: Caller,
}

impl ToolContext {
    pub fn new(config: PlatformConfig, caller: Caller) -> Self {
        Self { config, caller }
    }
}

#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// `tool` is the canonical catalog name; one handler may serve several.
    async fn handle(&self, tool: &str, args: Value, ctx: &ToolContext)
        -> Result<Value, ToolError>;
}

#[derive(Clone)]
pub struct ToolExecutor {
    logger: Logger,
    handlers: Arc<HashMap<String, Arc<dyn ToolHandler>>>,
    alias_map: HashMap<String, String>,
}

impl ToolExecutor {
    pub fn new(
        logger: Logger,
        handlers: HashMap<String, Arc<dyn ToolHandler>>,
        alias_map: HashMap<String, String>,
    ) -> Self {
        Self {
            logger: logger.child("executor"),
            handlers: Arc::new(handlers),
            alias_map,
        }
    }

    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Maps a requested name (canonical or alias) to a registered tool.
    pub fn resolve(&self, tool: &str) -> Result<String, ToolError> {
        let trimmed = tool.trim();
        if self.handlers.contains_key(trimmed) {
            return Ok(trimmed.to_string());
        }
        if let Some(mapped) = self.alias_map.get(trimmed) {
            if self.handlers.contains_key(mapped) {
                return Ok(mapped.clone());
            }
        }
        let candidates: Vec<String> = self
            .handlers
            .keys()
            .cloned()
            .chain(self.alias_map.keys().cloned())
            .collect();
        Err(unknown_tool_error(trimmed, &candidates))
    }

    /// Runs an already resolved and validated tool.
    pub async fn dispatch(
        &self,
        tool: &str,
        args: Value,
        ctx: &ToolContext,
    ) -> Result<Value, ToolError> {
        let handler = self
            .handlers
            .get(tool)
            .ok_or_else(|| unknown_tool_error(tool, &self.tool_names()))?;
        let started_at = chrono::Utc::now().timestamp_millis();
        self.logger.debug(
            "tool call",
            Some(&serde_json::json!({
                "tool": tool,
                "caller": ctx.caller.layer(),
                "args": args,
            })),
        );
        let result = handler.handle(tool, args, ctx).await;
        let duration_ms = chrono::Utc::now().timestamp_millis() - started_at;
        match &result {
            Ok(_) => self.logger.debug(
                "tool call finished",
                Some(&serde_json::json!({"tool": tool, "duration_ms": duration_ms})),
            ),
            Err(err) => self.logger.warn(
                "tool call failed",
                Some(&serde_json::json!({
                    "tool": tool,
                    "code": err.code,
                    "message": err.message,
                    "duration_ms": duration_ms,
                })),
            ),
        }
        result
    }

    /// Resolve, validate against the catalog schema, then dispatch.
    pub async fn execute(
        &self,
        tool: &str,
        args: Value,
        ctx: &ToolContext,
    ) -> Result<Value, ToolError> {
        let resolved = self.resolve(tool)?;
        let args = if args.is_null() {
            Value::Object(Default::default())
        } else {
            args
        };
        validate_tool_args(&resolved, &args)
            .map_err(|err| ToolError::invalid_params(err.message))?;
        self.dispatch(&resolved, args, ctx).await
    }
}
