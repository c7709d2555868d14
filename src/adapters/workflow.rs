use crate::app::App;
use crate::errors::ToolError;
use crate::mcp::catalog::{list_tools, validate_tool_args, validate_tool_output};
use crate::services::config::{resolve_config, ConfigOverrides, EnvSnapshot};
use crate::services::tool_executor::{Caller, ToolContext, ToolExecutor};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Per-run values supplied by the workflow engine, keyed by the same names
/// as the environment variables (`AMPERSAND_API_KEY`, ...).
pub type RuntimeContext = HashMap<String, String>;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowTool {
    pub id: String,
    pub description: String,
    pub input_schema: Value,
    pub output_schema: Value,
}

#[derive(Clone)]
pub struct WorkflowToolset {
    executor: Arc<ToolExecutor>,
    defaults: ConfigOverrides,
}

impl WorkflowToolset {
    pub fn new(app: &App) -> Self {
        Self {
            executor: app.tool_executor.clone(),
            defaults: ConfigOverrides::default(),
        }
    }

    /// Values used when the runtime context leaves a field unset.
    pub fn with_defaults(mut self, defaults: ConfigOverrides) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn tools(&self) -> Vec<WorkflowTool> {
        list_tools()
            .into_iter()
            .map(|tool| WorkflowTool {
                id: tool.name,
                description: tool.description,
                input_schema: tool.input_schema,
                output_schema: tool.output_schema.unwrap_or(Value::Null),
            })
            .collect()
    }

    /// Validates `input`, runs the tool with configuration taken from
    /// `runtime`, then the toolset defaults, then the environment, and checks
    /// the result against the declared output schema.
    pub async fn execute(
        &self,
        id: &str,
        input: Value,
        runtime: &RuntimeContext,
    ) -> Result<Value, ToolError> {
        let tool = self.executor.resolve(id)?;
        let input = if input.is_null() {
            Value::Object(Default::default())
        } else {
            input
        };
        validate_tool_args(&tool, &input).map_err(|err| ToolError::invalid_params(err.message))?;

        let overrides = self.defaults.merged_with(&ConfigOverrides::from_map(runtime));
        let config = resolve_config(&overrides, &EnvSnapshot::capture());
        let ctx = ToolContext::new(config, Caller::Workflow);
        let output = self.executor.dispatch(&tool, input, &ctx).await?;
        validate_tool_output(&tool, &output).map_err(|err| ToolError::internal(err.message))?;
        Ok(output)
    }
}
