use crate::errors::PlatformError;
use crate::services::config::{non_empty, PlatformConfig};
use crate::services::logger::Logger;
use crate::services::platform_client::{OAuthConnect, PlatformClient};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OAuthRequest {
    pub provider: String,
    pub group_ref: Option<String>,
    pub consumer_ref: Option<String>,
}

/// Asks the platform for a provider OAuth URL. `consumerRef` defaults to a
/// fresh UUID so every flow is distinguishable on the platform side.
pub async fn start_oauth(
    client: &dyn PlatformClient,
    logger: &Logger,
    request: &OAuthRequest,
    config: &PlatformConfig,
) -> Result<String, PlatformError> {
    let provider = request.provider.trim();
    if provider.is_empty() {
        return Err(PlatformError::InvalidInput(
            "provider must be a non-empty string".to_string(),
        ));
    }
    let group_ref = config.group_ref_or(request.group_ref.as_deref());
    let body = OAuthConnect {
        provider: provider.to_string(),
        consumer_ref: non_empty(request.consumer_ref.as_deref())
            .map(|s| s.to_string())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        group_ref: Some(group_ref).filter(|g| !g.is_empty()),
        project_id: config.project_id.clone(),
    };
    let url = client.oauth_connect(config, &body).await?;
    logger.info(
        "oauth url generated",
        Some(&serde_json::json!({ "provider": provider, "consumerRef": body.consumer_ref })),
    );
    Ok(url)
}
