//! Function-calling binding: the catalog rendered as `{"type": "function"}`
//! definitions under camelCase names, and a single `execute` entry point
//! that accepts either the argument object or its JSON text.

use crate::app::App;
use crate::errors::ToolError;
use crate::mcp::aliases::binding_name;
use crate::mcp::catalog::list_tools;
use crate::services::config::{resolve_config, ConfigOverrides, EnvSnapshot, PlatformConfig};
use crate::services::tool_executor::{Caller, ToolContext, ToolExecutor};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl FunctionDefinition {
    pub fn to_tool(&self) -> Value {
        serde_json::json!({ "type": "function", "function": self })
    }
}

#[derive(Clone)]
pub struct ToolCallingToolkit {
    executor: Arc<ToolExecutor>,
    config: PlatformConfig,
}

impl ToolCallingToolkit {
    /// Configuration is resolved once here: `overrides`, then the current
    /// environment.
    pub fn new(app: &App, overrides: &ConfigOverrides) -> Self {
        Self {
            executor: app.tool_executor.clone(),
            config: resolve_config(overrides, &EnvSnapshot::capture()),
        }
    }

    pub fn from_env(overrides: &ConfigOverrides) -> Result<Self, ToolError> {
        let app = App::initialize()?;
        Ok(Self::new(&app, overrides))
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    pub fn definitions(&self) -> Vec<FunctionDefinition> {
        list_tools()
            .into_iter()
            .map(|tool| FunctionDefinition {
                name: binding_name(&tool.name)
                    .map(|s| s.to_string())
                    .unwrap_or(tool.name),
                description: tool.description,
                parameters: tool.input_schema,
            })
            .collect()
    }

    pub async fn execute(&self, name: &str, arguments: Value) -> Result<Value, ToolError> {
        let args = match arguments {
            Value::String(text) if text.trim().is_empty() => Value::Object(Default::default()),
            Value::String(text) => serde_json::from_str(&text).map_err(|err| {
                ToolError::invalid_params(format!("arguments for {} are not valid JSON: {}", name, err))
            })?,
            other => other,
        };
        let ctx = ToolContext::new(self.config.clone(), Caller::Sdk);
        self.executor.execute(name, args, &ctx).await
    }
}
