use crate::constants::tools;
use crate::errors::ToolError;
use crate::services::logger::Logger;
use crate::services::platform_client::PlatformClient;
use crate::services::tool_executor::{ToolContext, ToolHandler};
use crate::services::validation::Validation;
use crate::services::write::{execute_write, WriteRequest, WriteType};
use crate::utils::tool_errors::unknown_tool_error;
use serde_json::Value;
use std::sync::Arc;

/// Serves `create-record` and `update-record`.
#[derive(Clone)]
pub struct WriteManager {
    logger: Logger,
    validation: Validation,
    client: Arc<dyn PlatformClient>,
}

impl WriteManager {
    pub fn new(logger: Logger, validation: Validation, client: Arc<dyn PlatformClient>) -> Self {
        Self {
            logger: logger.child("write"),
            validation,
            client,
        }
    }

    pub fn parse_request(
        &self,
        write_type: WriteType,
        args: &Value,
        ctx: &ToolContext,
    ) -> Result<WriteRequest, ToolError> {
        let object_name = self.validation.require_string(args, "objectName")?;
        let record = self.validation.ensure_object(
            args.get("record").unwrap_or(&Value::Null),
            "record",
        )?;
        let group_ref = self.validation.optional_string(args, "groupRef")?;
        Ok(WriteRequest {
            object_name,
            write_type,
            record,
            group_ref: ctx.config.group_ref_or(group_ref.as_deref()),
            associations: self.validation.optional_array(args, "associations")?,
        })
    }
}

#[async_trait::async_trait]
impl ToolHandler for WriteManager {
    async fn handle(&self, tool: &str, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let write_type = match tool {
            tools::CREATE_RECORD => WriteType::Create,
            tools::UPDATE_RECORD => WriteType::Update,
            other => {
                return Err(unknown_tool_error(
                    other,
                    &[tools::CREATE_RECORD.to_string(), tools::UPDATE_RECORD.to_string()],
                ))
            }
        };
        let request = self.parse_request(write_type, &args, ctx)?;
        let outcome = execute_write(self.client.as_ref(), &self.logger, &request, &ctx.config).await;
        serde_json::to_value(outcome).map_err(|err| ToolError::internal(err.to_string()))
    }
}
