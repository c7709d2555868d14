use crate::constants::{operations, tools};
use crate::errors::ToolError;
use crate::services::connection::find_connection;
use crate::services::installation::{
    create_installation, find_installation, CreateInstallationRequest,
};
use crate::services::logger::Logger;
use crate::services::platform_client::PlatformClient;
use crate::services::tool_executor::{ToolContext, ToolHandler};
use crate::services::validation::Validation;
use crate::utils::tool_errors::unknown_tool_error;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

const CONNECTION_TOOLS: &[&str] = &[
    tools::CHECK_CONNECTION,
    tools::CHECK_INSTALLATION,
    tools::CREATE_INSTALLATION,
];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckConnectionOutput {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInstallationOutput {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInstallationOutput {
    pub created: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Serves the connection and installation inspection tools.
#[derive(Clone)]
pub struct ConnectionManager {
    logger: Logger,
    validation: Validation,
    client: Arc<dyn PlatformClient>,
}

impl ConnectionManager {
    pub fn new(logger: Logger, validation: Validation, client: Arc<dyn PlatformClient>) -> Self {
        Self {
            logger: logger.child("connection"),
            validation,
            client,
        }
    }

    async fn check_connection(
        &self,
        args: &Value,
        ctx: &ToolContext,
    ) -> Result<CheckConnectionOutput, ToolError> {
        let provider = self.validation.require_string(args, "provider")?;
        let lookup =
            find_connection(self.client.as_ref(), &self.logger, &provider, &ctx.config).await?;
        Ok(CheckConnectionOutput {
            found: lookup.found,
            connection_id: lookup.connection_id,
            group_ref: lookup.group_ref,
            data: lookup.raw,
        })
    }

    /// Provider-only match; the resolver applies the stricter scope.
    async fn check_installation(
        &self,
        args: &Value,
        ctx: &ToolContext,
    ) -> Result<CheckInstallationOutput, ToolError> {
        let provider = self.validation.require_string(args, "provider")?;
        let lookup = find_installation(
            self.client.as_ref(),
            &self.logger,
            &provider,
            None,
            &ctx.config,
        )
        .await?;
        Ok(CheckInstallationOutput {
            found: lookup.found,
            installation_id: lookup.installation_id,
            data: lookup.raw,
        })
    }

    async fn create_installation(
        &self,
        args: &Value,
        ctx: &ToolContext,
    ) -> Result<CreateInstallationOutput, ToolError> {
        let provider = self.validation.require_string(args, "provider")?;
        let connection_id = self.validation.require_string(args, "connectionId")?;
        let group_ref = self.validation.optional_string(args, "groupRef")?;
        let created = create_installation(
            self.client.as_ref(),
            &self.logger,
            &CreateInstallationRequest {
                provider,
                connection_id,
                group_ref: ctx.config.group_ref_or(group_ref.as_deref()),
            },
            &ctx.caller.tag(operations::CREATE_INSTALLATION),
            &ctx.config,
        )
        .await?;
        Ok(CreateInstallationOutput {
            created: created.created,
            installation_id: created.installation_id,
            data: Some(created.raw),
        })
    }
}

fn to_value<T: Serialize>(output: T) -> Result<Value, ToolError> {
    serde_json::to_value(output).map_err(|err| ToolError::internal(err.to_string()))
}

#[async_trait::async_trait]
impl ToolHandler for ConnectionManager {
    async fn handle(&self, tool: &str, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        match tool {
            tools::CHECK_CONNECTION => to_value(self.check_connection(&args, ctx).await?),
            tools::CHECK_INSTALLATION => to_value(self.check_installation(&args, ctx).await?),
            tools::CREATE_INSTALLATION => to_value(self.create_installation(&args, ctx).await?),
            other => {
                let known: Vec<String> = CONNECTION_TOOLS.iter().map(|s| s.to_string()).collect();
                Err(unknown_tool_error(other, &known))
            }
        }
    }
}
