//! Installation lookup, creation and the ensure-installation resolver.
//!
//! The resolver is the only multi-step protocol in the crate:
//! connection lookup, then installation lookup, then (only when nothing
//! matches) a single create call. Steps run strictly in that order and
//! nothing is retried.

use serde_json::Value;

use crate::errors::{NotConnectedReason, PlatformError};
use crate::services::config::PlatformConfig;
use crate::services::connection::find_connection;
use crate::services::logger::Logger;
use crate::services::platform_client::{Installation, NewInstallation, PlatformClient};

/// Extra constraints applied on top of the provider match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallationScope {
    pub connection_id: Option<String>,
    pub group_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstallationLookup {
    pub found: bool,
    pub installation_id: Option<String>,
    pub raw: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstallationCreation {
    pub created: bool,
    pub installation_id: Option<String>,
    pub raw: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateInstallationRequest {
    pub provider: String,
    pub connection_id: String,
    pub group_ref: String,
}

fn matches(installation: &Installation, provider: &str, scope: Option<&InstallationScope>) -> bool {
    let provider_matches = installation
        .provider
        .as_deref()
        .map(|p| p.trim().to_lowercase() == provider)
        .unwrap_or(false);
    if !provider_matches {
        return false;
    }
    let Some(scope) = scope else {
        return true;
    };
    if let Some(group_ref) = scope.group_ref.as_deref() {
        if installation.group_ref.as_deref() != Some(group_ref) {
            return false;
        }
    }
    if let Some(connection_id) = scope.connection_id.as_deref() {
        if installation.connection_id.as_deref() != Some(connection_id) {
            return false;
        }
    }
    true
}

/// First installation of the configured integration whose connection
/// provider equals `provider` (compared lower-cased), optionally narrowed
/// to one connection and group.
pub async fn find_installation(
    client: &dyn PlatformClient,
    logger: &Logger,
    provider: &str,
    scope: Option<&InstallationScope>,
    config: &PlatformConfig,
) -> Result<InstallationLookup, PlatformError> {
    let provider = provider.trim().to_lowercase();
    let installations = client.list_installations(config).await?;
    let total = installations.len();
    let hit = installations
        .into_iter()
        .find(|inst| matches(inst, &provider, scope));
    logger.debug(
        "installation lookup",
        Some(&serde_json::json!({
            "provider": provider,
            "listed": total,
            "found": hit.is_some(),
        })),
    );
    Ok(match hit {
        Some(inst) => InstallationLookup {
            found: true,
            installation_id: Some(inst.id),
            raw: Some(inst.raw),
        },
        None => InstallationLookup {
            found: false,
            installation_id: None,
            raw: None,
        },
    })
}

/// Creates an installation with proxying enabled.
///
/// A response without a resolvable id yields `created == false`; callers
/// decide how to report that.
pub async fn create_installation(
    client: &dyn PlatformClient,
    logger: &Logger,
    request: &CreateInstallationRequest,
    created_by: &str,
    config: &PlatformConfig,
) -> Result<InstallationCreation, PlatformError> {
    if request.connection_id.trim().is_empty() || request.group_ref.trim().is_empty() {
        return Err(PlatformError::InvalidInput(
            "connectionId and groupRef are required to create an installation".to_string(),
        ));
    }
    let created = client
        .create_installation(
            config,
            &NewInstallation {
                provider: request.provider.clone(),
                connection_id: request.connection_id.clone(),
                group_ref: request.group_ref.clone(),
                created_by: created_by.to_string(),
            },
        )
        .await?;
    logger.debug(
        "installation create response",
        Some(&serde_json::json!({
            "provider": request.provider,
            "installationId": created.installation_id,
        })),
    );
    Ok(InstallationCreation {
        created: created.installation_id.is_some(),
        installation_id: created.installation_id,
        raw: created.raw,
    })
}

/// Returns an installation id for `provider`, creating the installation
/// when the connection has none yet.
pub async fn ensure_installation(
    client: &dyn PlatformClient,
    logger: &Logger,
    provider: &str,
    created_by: &str,
    config: &PlatformConfig,
) -> Result<String, PlatformError> {
    let connection = find_connection(client, logger, provider, config).await?;
    let connection_id = match (connection.found, connection.connection_id) {
        (true, Some(id)) => id,
        _ => {
            return Err(PlatformError::not_connected(
                provider,
                NotConnectedReason::NoConnection,
            ))
        }
    };
    let Some(group_ref) = connection.group_ref else {
        return Err(PlatformError::not_connected(
            provider,
            NotConnectedReason::MissingGroupRef { connection_id },
        ));
    };

    let scope = InstallationScope {
        connection_id: Some(connection_id.clone()),
        group_ref: Some(group_ref.clone()),
    };
    let existing = find_installation(client, logger, provider, Some(&scope), config).await?;
    if let (true, Some(id)) = (existing.found, existing.installation_id) {
        logger.info(
            "using existing installation",
            Some(&serde_json::json!({ "provider": provider, "installationId": id })),
        );
        return Ok(id);
    }

    logger.info(
        "no installation found, creating one",
        Some(&serde_json::json!({
            "provider": provider,
            "connectionId": connection_id,
            "groupRef": group_ref,
        })),
    );
    let created = create_installation(
        client,
        logger,
        &CreateInstallationRequest {
            provider: provider.trim().to_string(),
            connection_id,
            group_ref,
        },
        created_by,
        config,
    )
    .await?;
    match created.installation_id {
        Some(id) if created.created => {
            logger.info(
                "installation created",
                Some(&serde_json::json!({ "provider": provider, "installationId": id })),
            );
            Ok(id)
        }
        _ => Err(PlatformError::InstallationCreation {
            provider: provider.to_string(),
            details: created.raw,
        }),
    }
}
