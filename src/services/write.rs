use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::PlatformError;
use crate::services::config::PlatformConfig;
use crate::services::logger::Logger;
use crate::services::platform_client::PlatformClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteType {
    Create,
    Update,
}

impl WriteType {
    pub fn as_str(self) -> &'static str {
        match self {
            WriteType::Create => "create",
            WriteType::Update => "update",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WriteRequest {
    pub object_name: String,
    pub write_type: WriteType,
    pub record: Map<String, Value>,
    pub group_ref: String,
    /// Forwarded untouched, order included.
    pub associations: Option<Vec<Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteOutcome {
    pub success: bool,
    pub status: String,
    pub record_id: String,
    pub response: Value,
}

pub fn build_write_body(request: &WriteRequest) -> Value {
    let mut body = serde_json::json!({
        "groupRef": request.group_ref,
        "type": request.write_type.as_str(),
        "record": Value::Object(request.record.clone()),
    });
    if let (Some(associations), Value::Object(map)) = (&request.associations, &mut body) {
        map.insert(
            "associations".to_string(),
            Value::Array(associations.clone()),
        );
    }
    body
}

fn record_id_of(response: &Value) -> String {
    response
        .get("result")
        .and_then(|r| r.get("recordId"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

/// Performs one create/update call.
///
/// Never fails: every error becomes `success: false` with the error
/// rendered into `response`.
pub async fn execute_write(
    client: &dyn PlatformClient,
    logger: &Logger,
    request: &WriteRequest,
    config: &PlatformConfig,
) -> WriteOutcome {
    match try_write(client, logger, request, config).await {
        Ok(response) => WriteOutcome {
            success: true,
            status: "success".to_string(),
            record_id: record_id_of(&response),
            response,
        },
        Err(err) => {
            logger.error(
                "write operation failed",
                Some(&serde_json::json!({
                    "objectName": request.object_name,
                    "type": request.write_type.as_str(),
                    "error": err.to_value(),
                })),
            );
            WriteOutcome {
                success: false,
                status: "error".to_string(),
                record_id: String::new(),
                response: err.to_value(),
            }
        }
    }
}

async fn try_write(
    client: &dyn PlatformClient,
    logger: &Logger,
    request: &WriteRequest,
    config: &PlatformConfig,
) -> Result<Value, PlatformError> {
    if request.object_name.trim().is_empty() {
        return Err(PlatformError::InvalidInput(
            "objectName must be a non-empty string".to_string(),
        ));
    }
    let body = build_write_body(request);
    logger.debug(
        "write request",
        Some(&serde_json::json!({
            "objectName": request.object_name,
            "type": request.write_type.as_str(),
        })),
    );
    client
        .write_record(config, request.object_name.trim(), &body)
        .await
}
