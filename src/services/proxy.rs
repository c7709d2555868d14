use serde_json::Value;
use std::collections::BTreeMap;

use crate::constants::headers;
use crate::errors::PlatformError;
use crate::services::config::PlatformConfig;
use crate::services::installation::ensure_installation;
use crate::services::logger::Logger;
use crate::services::platform_client::{PlatformClient, ProxyCall, ProxyResponse};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProxyRequest {
    pub provider: String,
    pub endpoint: String,
    /// Defaults to GET.
    pub method: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
    pub installation_id: Option<String>,
}

/// Only strings, arrays and objects with content count as a body; scalars
/// carry no keys and are dropped.
fn is_empty_body(body: &Value) -> bool {
    match body {
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Null | Value::Bool(_) | Value::Number(_) => true,
    }
}

pub fn join_endpoint(base: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        endpoint.trim().trim_start_matches('/')
    )
}

/// Builds the outbound request without performing it.
///
/// Caller headers are applied first (names lower-cased) so the platform
/// headers always win. GET never carries a body.
pub fn build_proxy_call(
    request: &ProxyRequest,
    installation_id: &str,
    config: &PlatformConfig,
    proxy_base: &str,
) -> ProxyCall {
    let method = request
        .method
        .as_deref()
        .map(|m| m.trim().to_uppercase())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| "GET".to_string());

    let mut out: BTreeMap<String, String> = request
        .headers
        .iter()
        .filter(|(name, _)| !name.trim().is_empty())
        .map(|(name, value)| (name.trim().to_lowercase(), value.clone()))
        .collect();
    out.insert(
        "content-type".to_string(),
        headers::CONTENT_TYPE_JSON.to_string(),
    );
    out.insert(headers::PROJECT_ID.to_string(), config.project_id.clone());
    out.insert(headers::API_KEY.to_string(), config.api_key.clone());
    out.insert(
        headers::PROXY_VERSION.to_string(),
        headers::PROXY_VERSION_VALUE.to_string(),
    );
    out.insert(
        headers::INSTALLATION_ID.to_string(),
        installation_id.to_string(),
    );

    let body = match &request.body {
        _ if method == "GET" => None,
        Some(body) if !is_empty_body(body) => Some(body.to_string()),
        _ => None,
    };

    ProxyCall {
        url: join_endpoint(proxy_base, &request.endpoint),
        method,
        headers: out,
        body,
    }
}

/// Sends `request` through the platform proxy, resolving an installation
/// first when the caller did not supply one.
///
/// The remote status and body come back as-is; a 4xx from the provider is
/// a successful call here.
pub async fn call_proxy(
    client: &dyn PlatformClient,
    logger: &Logger,
    proxy_base: &str,
    request: &ProxyRequest,
    created_by: &str,
    config: &PlatformConfig,
) -> Result<ProxyResponse, PlatformError> {
    if request.endpoint.trim().is_empty() {
        return Err(PlatformError::InvalidInput(
            "endpoint must be a non-empty string".to_string(),
        ));
    }
    let supplied = request
        .installation_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty());
    let installation_id = match supplied {
        Some(id) => id.to_string(),
        None => ensure_installation(client, logger, &request.provider, created_by, config).await?,
    };
    let call = build_proxy_call(request, &installation_id, config, proxy_base);
    logger.debug(
        "proxy call",
        Some(&serde_json::json!({
            "provider": request.provider,
            "method": call.method,
            "url": call.url,
            "installationId": installation_id,
        })),
    );
    client.send_proxy(&call).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PlatformConfig {
        PlatformConfig {
            api_key: "key".to_string(),
            project_id: "proj".to_string(),
            integration_name: "int".to_string(),
            group_ref: "g".to_string(),
        }
    }

    fn request(method: Option<&str>, body: Option<Value>) -> ProxyRequest {
        ProxyRequest {
            provider: "acme".to_string(),
            endpoint: "/v1/foo".to_string(),
            method: method.map(|m| m.to_string()),
            body,
            ..Default::default()
        }
    }

    #[test]
    fn get_drops_body() {
        let call = build_proxy_call(
            &request(Some("get"), Some(serde_json::json!({"a": 1}))),
            "i1",
            &config(),
            "https://proxy.example",
        );
        assert_eq!(call.method, "GET");
        assert_eq!(call.body, None);
        assert_eq!(call.url, "https://proxy.example/v1/foo");
    }

    #[test]
    fn non_get_sends_only_non_empty_bodies() {
        let with_body = build_proxy_call(
            &request(Some("POST"), Some(serde_json::json!({"a": 1}))),
            "i1",
            &config(),
            "https://proxy.example/",
        );
        assert_eq!(with_body.body.as_deref(), Some("{\"a\":1}"));

        let empty = build_proxy_call(
            &request(Some("PATCH"), Some(serde_json::json!({}))),
            "i1",
            &config(),
            "https://proxy.example",
        );
        assert_eq!(empty.body, None);

        let absent = build_proxy_call(&request(Some("DELETE"), None), "i1", &config(), "https://proxy.example");
        assert_eq!(absent.body, None);
    }

    #[test]
    fn string_body_is_sent_as_json_and_scalars_are_dropped() {
        let body_of = |body: Value| {
            build_proxy_call(&request(Some("POST"), Some(body)), "i1", &config(), "https://proxy.example")
                .body
        };
        assert_eq!(body_of(serde_json::json!("hello")).as_deref(), Some("\"hello\""));
        assert_eq!(body_of(serde_json::json!("")), None);
        assert_eq!(body_of(serde_json::json!(5)), None);
        assert_eq!(body_of(serde_json::json!(true)), None);
        assert_eq!(body_of(serde_json::json!([1])).as_deref(), Some("[1]"));
    }

    #[test]
    fn method_defaults_to_get() {
        let call = build_proxy_call(&request(None, None), "i1", &config(), "https://proxy.example");
        assert_eq!(call.method, "GET");
    }

    #[test]
    fn platform_headers_override_caller_headers() {
        let mut req = request(Some("GET"), None);
        req.headers
            .insert("X-Api-Key".to_string(), "spoofed".to_string());
        req.headers.insert("Accept".to_string(), "text/csv".to_string());
        let call = build_proxy_call(&req, "i1", &config(), "https://proxy.example");
        assert_eq!(call.headers["x-api-key"], "key");
        assert_eq!(call.headers["accept"], "text/csv");
        assert_eq!(call.headers["x-amp-project-id"], "proj");
        assert_eq!(call.headers["x-amp-proxy-version"], "1");
        assert_eq!(call.headers["x-amp-installation-id"], "i1");
        assert_eq!(call.headers["content-type"], "application/json");
    }
}
