use crate::errors::ToolError;
use crate::services::logger::Logger;
use crate::services::oauth::{start_oauth, OAuthRequest};
use crate::services::platform_client::PlatformClient;
use crate::services::tool_executor::{ToolContext, ToolHandler};
use crate::services::validation::Validation;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct OAuthOutput {
    pub url: String,
}

#[derive(Clone)]
pub struct OAuthManager {
    logger: Logger,
    validation: Validation,
    client: Arc<dyn PlatformClient>,
}

impl OAuthManager {
    pub fn new(logger: Logger, validation: Validation, client: Arc<dyn PlatformClient>) -> Self {
        Self {
            logger: logger.child("oauth"),
            validation,
            client,
        }
    }
}

#[async_trait::async_trait]
impl ToolHandler for OAuthManager {
    async fn handle(&self, _tool: &str, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let request = OAuthRequest {
            provider: self.validation.require_string(&args, "provider")?,
            group_ref: self.validation.optional_string(&args, "groupRef")?,
            consumer_ref: self.validation.optional_string(&args, "consumerRef")?,
        };
        let url = start_oauth(self.client.as_ref(), &self.logger, &request, &ctx.config).await?;
        serde_json::to_value(OAuthOutput { url }).map_err(|err| ToolError::internal(err.to_string()))
    }
}
