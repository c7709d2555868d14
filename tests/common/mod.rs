#![allow(dead_code)]

use ampersand_tools::app::App;
use ampersand_tools::errors::PlatformError;
use ampersand_tools::services::config::{Endpoints, PlatformConfig};
use ampersand_tools::services::logger::Logger;
use ampersand_tools::services::platform_client::{
    Connection, CreatedInstallation, Installation, NewInstallation, OAuthConnect, PlatformClient,
    ProxyCall, ProxyResponse,
};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

pub static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

pub fn restore_env(key: &str, previous: Option<String>) {
    match previous {
        Some(value) => std::env::set_var(key, value),
        None => std::env::remove_var(key),
    }
}

pub fn config() -> PlatformConfig {
    PlatformConfig {
        api_key: "test-key".to_string(),
        project_id: "proj-1".to_string(),
        integration_name: "crm-sync".to_string(),
        group_ref: "default-group".to_string(),
    }
}

pub fn logger() -> Logger {
    Logger::new("test")
}

pub fn connection(id: &str, provider: &str, group_ref: Option<&str>) -> Connection {
    Connection {
        id: id.to_string(),
        provider: provider.to_string(),
        group_ref: group_ref.map(|g| g.to_string()),
        raw: serde_json::json!({"id": id, "provider": provider, "group": {"groupRef": group_ref}}),
    }
}

pub fn installation(id: &str, provider: &str, connection_id: &str, group_ref: &str) -> Installation {
    Installation {
        id: id.to_string(),
        provider: Some(provider.to_string()),
        connection_id: Some(connection_id.to_string()),
        group_ref: Some(group_ref.to_string()),
        raw: serde_json::json!({"id": id}),
    }
}

#[derive(Default)]
struct FakeState {
    connections: Vec<Connection>,
    installations: Vec<Installation>,
    create_response: Option<CreatedInstallation>,
    create_error: Option<PlatformError>,
    list_error: Option<PlatformError>,
    oauth_url: String,
    write_result: Option<Result<Value, PlatformError>>,
    proxy_response: Option<ProxyResponse>,

    connection_queries: Vec<String>,
    creates: Vec<NewInstallation>,
    oauth_calls: Vec<OAuthConnect>,
    writes: Vec<(String, Value)>,
    proxied: Vec<ProxyCall>,
}

/// In-memory platform that records every call it receives.
///
/// Unless a fixed create response is configured, a created installation is
/// appended to the listing so later lookups see it.
#[derive(Clone, Default)]
pub struct FakePlatform {
    state: Arc<std::sync::Mutex<FakeState>>,
}

impl FakePlatform {
    pub fn new() -> Self {
        let fake = Self::default();
        fake.lock().oauth_url = "https://auth.example.com/oauth?state=abc".to_string();
        fake
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake platform lock")
    }

    pub fn with_connection(self, connection: Connection) -> Self {
        self.lock().connections.push(connection);
        self
    }

    pub fn with_installation(self, installation: Installation) -> Self {
        self.lock().installations.push(installation);
        self
    }

    pub fn with_create_response(self, raw: Value) -> Self {
        let created = ampersand_tools::services::platform_client::normalize_created_installation(raw);
        self.lock().create_response = Some(created);
        self
    }

    pub fn with_create_error(self, error: PlatformError) -> Self {
        self.lock().create_error = Some(error);
        self
    }

    pub fn with_list_error(self, error: PlatformError) -> Self {
        self.lock().list_error = Some(error);
        self
    }

    pub fn with_write_result(self, result: Result<Value, PlatformError>) -> Self {
        self.lock().write_result = Some(result);
        self
    }

    pub fn with_proxy_response(self, status: u16, body: Value) -> Self {
        self.lock().proxy_response = Some(ProxyResponse { status, body });
        self
    }

    pub fn connection_queries(&self) -> Vec<String> {
        self.lock().connection_queries.clone()
    }

    pub fn creates(&self) -> Vec<NewInstallation> {
        self.lock().creates.clone()
    }

    pub fn oauth_calls(&self) -> Vec<OAuthConnect> {
        self.lock().oauth_calls.clone()
    }

    pub fn writes(&self) -> Vec<(String, Value)> {
        self.lock().writes.clone()
    }

    pub fn proxied(&self) -> Vec<ProxyCall> {
        self.lock().proxied.clone()
    }

    pub fn app(&self) -> App {
        let endpoints = Endpoints {
            api_base: "https://api.test".to_string(),
            proxy_base: "https://proxy.test".to_string(),
            write_base: "https://write.test".to_string(),
        };
        App::with_client(logger(), Arc::new(self.clone()), &endpoints).expect("app wiring")
    }
}

#[async_trait]
impl PlatformClient for FakePlatform {
    async fn list_connections(
        &self,
        _config: &PlatformConfig,
        provider: &str,
    ) -> Result<Vec<Connection>, PlatformError> {
        let mut state = self.lock();
        state.connection_queries.push(provider.to_string());
        if let Some(err) = state.list_error.clone() {
            return Err(err);
        }
        Ok(state
            .connections
            .iter()
            .filter(|c| c.provider.eq_ignore_ascii_case(provider))
            .cloned()
            .collect())
    }

    async fn list_installations(
        &self,
        _config: &PlatformConfig,
    ) -> Result<Vec<Installation>, PlatformError> {
        let state = self.lock();
        if let Some(err) = state.list_error.clone() {
            return Err(err);
        }
        Ok(state.installations.clone())
    }

    async fn create_installation(
        &self,
        _config: &PlatformConfig,
        request: &NewInstallation,
    ) -> Result<CreatedInstallation, PlatformError> {
        let mut state = self.lock();
        state.creates.push(request.clone());
        if let Some(err) = state.create_error.clone() {
            return Err(err);
        }
        if let Some(fixed) = state.create_response.clone() {
            return Ok(fixed);
        }
        let id = format!("inst-{}", state.creates.len());
        let created = installation(&id, &request.provider, &request.connection_id, &request.group_ref);
        state.installations.push(created);
        Ok(CreatedInstallation {
            installation_id: Some(id.clone()),
            raw: serde_json::json!({"id": id}),
        })
    }

    async fn oauth_connect(
        &self,
        _config: &PlatformConfig,
        request: &OAuthConnect,
    ) -> Result<String, PlatformError> {
        let mut state = self.lock();
        state.oauth_calls.push(request.clone());
        Ok(state.oauth_url.clone())
    }

    async fn write_record(
        &self,
        _config: &PlatformConfig,
        object_name: &str,
        body: &Value,
    ) -> Result<Value, PlatformError> {
        let mut state = self.lock();
        state.writes.push((object_name.to_string(), body.clone()));
        state
            .write_result
            .clone()
            .unwrap_or_else(|| Ok(serde_json::json!({"result": {"recordId": "rec-1"}})))
    }

    async fn send_proxy(&self, call: &ProxyCall) -> Result<ProxyResponse, PlatformError> {
        let mut state = self.lock();
        state.proxied.push(call.clone());
        Ok(state.proxy_response.clone().unwrap_or(ProxyResponse {
            status: 200,
            body: serde_json::json!({"ok": true}),
        }))
    }
}
