use crate::constants::{operations, tools};
use crate::errors::ToolError;
use crate::services::logger::Logger;
use crate::services::platform_client::PlatformClient;
use crate::services::proxy::{call_proxy, ProxyRequest};
use crate::services::tool_executor::{ToolContext, ToolHandler};
use crate::services::validation::Validation;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct ProxyOutput {
    pub status: u16,
    pub response: Value,
}

/// Serves `send-request` and its GET-only sibling `send-read-request`.
#[derive(Clone)]
pub struct ProxyManager {
    logger: Logger,
    validation: Validation,
    client: Arc<dyn PlatformClient>,
    proxy_base: String,
}

impl ProxyManager {
    pub fn new(
        logger: Logger,
        validation: Validation,
        client: Arc<dyn PlatformClient>,
        proxy_base: impl Into<String>,
    ) -> Self {
        Self {
            logger: logger.child("proxy"),
            validation,
            client,
            proxy_base: proxy_base.into(),
        }
    }

    pub fn parse_request(&self, tool: &str, args: &Value) -> Result<ProxyRequest, ToolError> {
        let read_only = tool == tools::SEND_READ_REQUEST;
        Ok(ProxyRequest {
            provider: self.validation.require_string(args, "provider")?,
            endpoint: self.validation.require_string(args, "endpoint")?,
            method: if read_only {
                Some("GET".to_string())
            } else {
                self.validation.optional_string(args, "method")?
            },
            headers: self.validation.ensure_headers(args.get("headers"))?,
            body: if read_only {
                None
            } else {
                args.get("body").cloned()
            },
            installation_id: self.validation.optional_string(args, "installationId")?,
        })
    }
}

#[async_trait::async_trait]
impl ToolHandler for ProxyManager {
    async fn handle(&self, tool: &str, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let request = self.parse_request(tool, &args)?;
        let response = call_proxy(
            self.client.as_ref(),
            &self.logger,
            &self.proxy_base,
            &request,
            &ctx.caller.tag(operations::ENSURE_INSTALLATION),
            &ctx.config,
        )
        .await?;
        serde_json::to_value(ProxyOutput {
            status: response.status,
            response: response.body,
        })
        .map_err(|err| ToolError::internal(err.to_string()))
    }
}
