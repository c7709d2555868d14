use crate::constants::tools;
use crate::errors::ToolError;
use crate::managers;
use crate::mcp::catalog::tool_catalog;
use crate::services::config::Endpoints;
use crate::services::logger::Logger;
use crate::services::platform_client::{HttpPlatformClient, PlatformClient};
use crate::services::tool_executor::{ToolExecutor, ToolHandler};
use crate::services::validation::Validation;
use std::collections::HashMap;
use std::sync::Arc;

pub struct App {
    pub logger: Logger,
    pub tool_executor: Arc<ToolExecutor>,
}

impl App {
    fn validate_tool_wiring(
        handlers: &HashMap<String, Arc<dyn ToolHandler>>,
        alias_map: &HashMap<String, String>,
    ) -> Result<(), ToolError> {
        let mut missing = Vec::new();
        for tool in tool_catalog().iter() {
            if handlers.contains_key(&tool.name) {
                continue;
            }
            if alias_map.contains_key(&tool.name) {
                continue;
            }
            missing.push(tool.name.clone());
        }
        if missing.is_empty() {
            return Ok(());
        }
        missing.sort();
        Err(ToolError::internal("Tool wiring is incomplete").with_hint(
            "Every tool in tool_catalog.json must have a handler or an alias_map entry."
                .to_string(),
        )
        .with_details(serde_json::json!({ "missing_tools": missing })))
    }

    /// Production wiring: HTTP client against the configured endpoints.
    pub fn initialize() -> Result<Self, ToolError> {
        let logger = Logger::new("ampersand");
        let endpoints = Endpoints::from_env();
        let client = Arc::new(HttpPlatformClient::new(logger.clone(), endpoints.clone())?);
        Self::with_client(logger, client, &endpoints)
    }

    pub fn with_client(
        logger: Logger,
        client: Arc<dyn PlatformClient>,
        endpoints: &Endpoints,
    ) -> Result<Self, ToolError> {
        let validation = Validation::new();

        let write_manager = Arc::new(managers::write::WriteManager::new(
            logger.clone(),
            validation.clone(),
            client.clone(),
        ));
        let connection_manager = Arc::new(managers::connection::ConnectionManager::new(
            logger.clone(),
            validation.clone(),
            client.clone(),
        ));
        let oauth_manager = Arc::new(managers::oauth::OAuthManager::new(
            logger.clone(),
            validation.clone(),
            client.clone(),
        ));
        let proxy_manager = Arc::new(managers::proxy::ProxyManager::new(
            logger.clone(),
            validation.clone(),
            client,
            endpoints.proxy_base.clone(),
        ));

        let mut handlers: HashMap<String, Arc<dyn ToolHandler>> = HashMap::new();
        handlers.insert(tools::CREATE_RECORD.to_string(), write_manager.clone());
        handlers.insert(tools::UPDATE_RECORD.to_string(), write_manager);
        handlers.insert(tools::CHECK_CONNECTION.to_string(), connection_manager.clone());
        handlers.insert(tools::CHECK_INSTALLATION.to_string(), connection_manager.clone());
        handlers.insert(tools::CREATE_INSTALLATION.to_string(), connection_manager);
        handlers.insert(tools::START_OAUTH.to_string(), oauth_manager);
        handlers.insert(tools::SEND_REQUEST.to_string(), proxy_manager.clone());
        handlers.insert(tools::SEND_READ_REQUEST.to_string(), proxy_manager);

        let alias_map = crate::mcp::aliases::builtin_tool_alias_map_owned();

        Self::validate_tool_wiring(&handlers, &alias_map)?;

        let tool_executor = Arc::new(ToolExecutor::new(logger.clone(), handlers, alias_map));

        Ok(Self {
            logger,
            tool_executor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_handler_fails_wiring_check() {
        let handlers: HashMap<String, Arc<dyn ToolHandler>> = HashMap::new();
        let err = App::validate_tool_wiring(&handlers, &HashMap::new())
            .expect_err("empty wiring must be rejected");
        let missing = err.details.expect("details")["missing_tools"].clone();
        assert_eq!(missing.as_array().map(|a| a.len()), Some(tool_catalog().len()));
    }
}
