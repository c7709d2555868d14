use serde_json::Value;

use crate::errors::PlatformError;
use crate::services::config::PlatformConfig;
use crate::services::logger::Logger;
use crate::services::platform_client::PlatformClient;

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionLookup {
    pub found: bool,
    pub connection_id: Option<String>,
    pub group_ref: Option<String>,
    pub raw: Option<Value>,
}

impl ConnectionLookup {
    fn missing() -> Self {
        Self {
            found: false,
            connection_id: None,
            group_ref: None,
            raw: None,
        }
    }
}

/// First connection the platform lists for `provider`.
///
/// The platform documents no ordering, so "first" is whatever it returns
/// first. Transport and decode errors propagate.
pub async fn find_connection(
    client: &dyn PlatformClient,
    logger: &Logger,
    provider: &str,
    config: &PlatformConfig,
) -> Result<ConnectionLookup, PlatformError> {
    let provider = provider.trim();
    if provider.is_empty() {
        return Err(PlatformError::InvalidInput(
            "provider must be a non-empty string".to_string(),
        ));
    }
    let connections = client.list_connections(config, provider).await?;
    let Some(first) = connections.into_iter().next() else {
        logger.debug(
            "no connection found",
            Some(&serde_json::json!({ "provider": provider })),
        );
        return Ok(ConnectionLookup::missing());
    };
    logger.debug(
        "connection found",
        Some(&serde_json::json!({
            "provider": provider,
            "connectionId": first.id,
            "groupRef": first.group_ref,
        })),
    );
    Ok(ConnectionLookup {
        found: true,
        connection_id: Some(first.id).filter(|id| !id.is_empty()),
        group_ref: first.group_ref,
        raw: Some(first.raw),
    })
}
