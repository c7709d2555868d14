//! Boundary to the remote platform.
//!
//! Everything the platform returns is normalised here into the canonical
//! types below, so the lookup and resolver code never inspects raw JSON
//! shapes that drift between API versions.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, RequestBuilder};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use url::Url;

use crate::constants::{endpoints, headers};
use crate::errors::{PlatformError, ToolError};
use crate::services::config::{Endpoints, PlatformConfig};
use crate::services::logger::Logger;

#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub id: String,
    pub provider: String,
    pub group_ref: Option<String>,
    pub raw: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Installation {
    pub id: String,
    pub provider: Option<String>,
    pub connection_id: Option<String>,
    pub group_ref: Option<String>,
    pub raw: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreatedInstallation {
    pub installation_id: Option<String>,
    pub raw: Value,
}

/// Body of an installation-create call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInstallation {
    pub provider: String,
    pub connection_id: String,
    pub group_ref: String,
    pub created_by: String,
}

impl NewInstallation {
    pub fn to_body(&self) -> Value {
        serde_json::json!({
            "connectionId": self.connection_id,
            "groupRef": self.group_ref,
            "config": {
                "createdBy": self.created_by,
                "content": {
                    "provider": self.provider,
                    "proxy": { "enabled": true },
                },
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthConnect {
    pub provider: String,
    pub consumer_ref: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_ref: Option<String>,
    pub project_id: String,
}

/// Fully prepared proxy request; the client sends it without touching it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyCall {
    pub url: String,
    pub method: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProxyResponse {
    pub status: u16,
    pub body: Value,
}

#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Connections for `provider` in platform order.
    async fn list_connections(
        &self,
        config: &PlatformConfig,
        provider: &str,
    ) -> Result<Vec<Connection>, PlatformError>;

    /// Every installation of the configured integration, in platform order.
    async fn list_installations(
        &self,
        config: &PlatformConfig,
    ) -> Result<Vec<Installation>, PlatformError>;

    async fn create_installation(
        &self,
        config: &PlatformConfig,
        request: &NewInstallation,
    ) -> Result<CreatedInstallation, PlatformError>;

    /// Returns the OAuth URL the platform answers with.
    async fn oauth_connect(
        &self,
        config: &PlatformConfig,
        request: &OAuthConnect,
    ) -> Result<String, PlatformError>;

    /// Non-2xx responses are errors here, unlike the proxy.
    async fn write_record(
        &self,
        config: &PlatformConfig,
        object_name: &str,
        body: &Value,
    ) -> Result<Value, PlatformError>;

    async fn send_proxy(&self, call: &ProxyCall) -> Result<ProxyResponse, PlatformError>;
}

pub fn normalize_connection(raw: &Value) -> Option<Connection> {
    let obj = raw.as_object()?;
    Some(Connection {
        id: string_at(raw, &["id"]).unwrap_or_default(),
        provider: obj
            .get("provider")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string(),
        group_ref: string_at(raw, &["group", "groupRef"])
            .or_else(|| string_at(raw, &["groupRef"])),
        raw: raw.clone(),
    })
}

pub fn normalize_installation(raw: &Value) -> Option<Installation> {
    let id = string_at(raw, &["id"])?;
    Some(Installation {
        id,
        provider: string_at(raw, &["connection", "provider"])
            .or_else(|| string_at(raw, &["config", "content", "provider"])),
        connection_id: string_at(raw, &["connection", "id"]),
        group_ref: string_at(raw, &["group", "groupRef"]),
        raw: raw.clone(),
    })
}

/// The id sits under `installation.id` in current responses and at the top
/// level in older ones.
pub fn normalize_created_installation(raw: Value) -> CreatedInstallation {
    let installation_id =
        string_at(&raw, &["installation", "id"]).or_else(|| string_at(&raw, &["id"]));
    CreatedInstallation {
        installation_id,
        raw,
    }
}

/// Accepts a bare array or an object wrapping one under `key` or `results`.
pub fn extract_items(url: &str, raw: Value, key: &str) -> Result<Vec<Value>, PlatformError> {
    match raw {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => {
            for candidate in [key, "results"] {
                match map.remove(candidate) {
                    Some(Value::Array(items)) => return Ok(items),
                    Some(Value::Null) => return Ok(Vec::new()),
                    _ => {}
                }
            }
            Err(PlatformError::Decode {
                url: url.to_string(),
                message: format!("expected a list of {}", key),
            })
        }
        other => Err(PlatformError::Decode {
            url: url.to_string(),
            message: format!("expected a list of {}, got {}", key, json_type(&other)),
        }),
    }
}

fn string_at(value: &Value, path: &[&str]) -> Option<String> {
    let mut current = value;
    for segment in path {
        current = current.get(*segment)?;
    }
    current
        .as_str()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// JSON when the body parses, the raw text otherwise, `null` when empty.
pub fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// `reqwest`-backed client for the platform REST API, write API and proxy.
#[derive(Clone)]
pub struct HttpPlatformClient {
    logger: Logger,
    endpoints: Endpoints,
    client: Client,
}

impl HttpPlatformClient {
    pub fn new(logger: Logger, endpoints: Endpoints) -> Result<Self, ToolError> {
        let client = Client::builder()
            .user_agent(headers::USER_AGENT)
            .build()
            .map_err(|err| ToolError::internal(format!("Failed to build HTTP client: {}", err)))?;
        Ok(Self {
            logger: logger.child("platform"),
            endpoints,
            client,
        })
    }

    fn url_with_segments(base: &str, segments: &[&str]) -> Result<Url, PlatformError> {
        let mut url = Url::parse(base).map_err(|err| {
            PlatformError::InvalidInput(format!("invalid base url {}: {}", base, err))
        })?;
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                PlatformError::InvalidInput(format!("base url {} cannot carry a path", base))
            })?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }

    fn installations_url(&self, config: &PlatformConfig) -> Result<Url, PlatformError> {
        Self::url_with_segments(
            &self.endpoints.api_base,
            &[
                "v1",
                "projects",
                &config.project_id,
                "integrations",
                &config.integration_name,
                "installations",
            ],
        )
    }

    fn authed(&self, builder: RequestBuilder, config: &PlatformConfig) -> RequestBuilder {
        builder.header("X-Api-Key", config.api_key.as_str())
    }

    /// Sends and decodes a JSON call, turning non-2xx into `Status`.
    async fn send_json(&self, builder: RequestBuilder, url: &str) -> Result<Value, PlatformError> {
        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(PlatformError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body: parse_body(&text),
            });
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|err| PlatformError::Decode {
            url: url.to_string(),
            message: err.to_string(),
        })
    }
}

#[async_trait]
impl PlatformClient for HttpPlatformClient {
    async fn list_connections(
        &self,
        config: &PlatformConfig,
        provider: &str,
    ) -> Result<Vec<Connection>, PlatformError> {
        let mut url = Self::url_with_segments(
            &self.endpoints.api_base,
            &["v1", "projects", &config.project_id, "connections"],
        )?;
        url.query_pairs_mut().append_pair("provider", provider);
        self.logger.debug(
            "listConnections request",
            Some(&serde_json::json!({"url": url.as_str(), "provider": provider})),
        );
        let raw = self
            .send_json(self.authed(self.client.get(url.clone()), config), url.as_str())
            .await?;
        let items = extract_items(url.as_str(), raw, "connections")?;
        self.logger.debug(
            "listConnections response",
            Some(&serde_json::json!({"count": items.len()})),
        );
        Ok(items.iter().filter_map(normalize_connection).collect())
    }

    async fn list_installations(
        &self,
        config: &PlatformConfig,
    ) -> Result<Vec<Installation>, PlatformError> {
        let url = self.installations_url(config)?;
        self.logger.debug(
            "listInstallations request",
            Some(&serde_json::json!({"url": url.as_str()})),
        );
        let raw = self
            .send_json(self.authed(self.client.get(url.clone()), config), url.as_str())
            .await?;
        let items = extract_items(url.as_str(), raw, "installations")?;
        self.logger.debug(
            "listInstallations response",
            Some(&serde_json::json!({"count": items.len()})),
        );
        Ok(items.iter().filter_map(normalize_installation).collect())
    }

    async fn create_installation(
        &self,
        config: &PlatformConfig,
        request: &NewInstallation,
    ) -> Result<CreatedInstallation, PlatformError> {
        let url = self.installations_url(config)?;
        let body = request.to_body();
        self.logger.debug(
            "createInstallation request",
            Some(&serde_json::json!({"url": url.as_str(), "body": body})),
        );
        let raw = self
            .send_json(
                self.authed(self.client.post(url.clone()), config).json(&body),
                url.as_str(),
            )
            .await?;
        self.logger.debug("createInstallation response", Some(&raw));
        Ok(normalize_created_installation(raw))
    }

    async fn oauth_connect(
        &self,
        config: &PlatformConfig,
        request: &OAuthConnect,
    ) -> Result<String, PlatformError> {
        let url = Self::url_with_segments(
            &self.endpoints.api_base,
            &endpoints::OAUTH_CONNECT_PATH.split('/').collect::<Vec<_>>(),
        )?;
        self.logger.debug(
            "oauthConnect request",
            Some(&serde_json::json!({"url": url.as_str(), "provider": request.provider})),
        );
        let response = self
            .authed(self.client.post(url.clone()), config)
            .json(request)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(PlatformError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body: parse_body(&text),
            });
        }
        Ok(text.trim().to_string())
    }

    async fn write_record(
        &self,
        config: &PlatformConfig,
        object_name: &str,
        body: &Value,
    ) -> Result<Value, PlatformError> {
        let url = Self::url_with_segments(
            &self.endpoints.write_base,
            &[
                "v1",
                "projects",
                &config.project_id,
                "integrations",
                &config.integration_name,
                "objects",
                object_name,
            ],
        )?;
        self.logger.debug(
            "writeRecords request",
            Some(&serde_json::json!({"url": url.as_str(), "objectName": object_name})),
        );
        self.send_json(
            self.authed(self.client.post(url.clone()), config).json(body),
            url.as_str(),
        )
        .await
    }

    async fn send_proxy(&self, call: &ProxyCall) -> Result<ProxyResponse, PlatformError> {
        let method = Method::from_bytes(call.method.as_bytes()).map_err(|_| {
            PlatformError::InvalidInput(format!("invalid HTTP method: {}", call.method))
        })?;
        let url = Url::parse(&call.url).map_err(|err| {
            PlatformError::InvalidInput(format!("invalid proxy url {}: {}", call.url, err))
        })?;
        let mut header_map = HeaderMap::new();
        for (name, value) in &call.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| PlatformError::InvalidInput(format!("invalid header name: {}", name)))?;
            let value = HeaderValue::from_str(value).map_err(|_| {
                PlatformError::InvalidInput(format!("invalid value for header {}", name))
            })?;
            header_map.insert(name, value);
        }

        let mut builder = self.client.request(method, url).headers(header_map);
        if let Some(body) = &call.body {
            builder = builder.body(body.clone());
        }
        self.logger.debug(
            "proxy request",
            Some(&serde_json::json!({
                "url": call.url,
                "method": call.method,
                "headers": call.headers,
                "has_body": call.body.is_some(),
            })),
        );
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        self.logger.debug(
            "proxy response",
            Some(&serde_json::json!({"url": call.url, "status": status})),
        );
        Ok(ProxyResponse {
            status,
            body: parse_body(&text),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_group_ref_comes_from_nested_group() {
        let raw = serde_json::json!({
            "id": "c1",
            "provider": "salesforce",
            "group": {"groupRef": "g1"},
        });
        let conn = normalize_connection(&raw).expect("connection");
        assert_eq!(conn.id, "c1");
        assert_eq!(conn.group_ref.as_deref(), Some("g1"));
    }

    #[test]
    fn connection_without_group_has_no_group_ref() {
        let raw = serde_json::json!({"id": "c1", "provider": "salesforce", "group": {}});
        let conn = normalize_connection(&raw).expect("connection");
        assert_eq!(conn.group_ref, None);
    }

    #[test]
    fn installation_without_id_is_dropped() {
        let raw = serde_json::json!({"connection": {"provider": "acme"}});
        assert!(normalize_installation(&raw).is_none());
    }

    #[test]
    fn installation_fields_are_extracted() {
        let raw = serde_json::json!({
            "id": "i1",
            "connection": {"id": "c1", "provider": "acme"},
            "group": {"groupRef": "g1"},
            "config": {"content": {"provider": "acme", "proxy": {"enabled": true}}},
        });
        let inst = normalize_installation(&raw).expect("installation");
        assert_eq!(inst.id, "i1");
        assert_eq!(inst.provider.as_deref(), Some("acme"));
        assert_eq!(inst.connection_id.as_deref(), Some("c1"));
        assert_eq!(inst.group_ref.as_deref(), Some("g1"));
    }

    #[test]
    fn created_installation_id_is_found_at_either_level() {
        let nested = normalize_created_installation(serde_json::json!({"installation": {"id": "i2"}}));
        assert_eq!(nested.installation_id.as_deref(), Some("i2"));

        let flat = normalize_created_installation(serde_json::json!({"id": "i1"}));
        assert_eq!(flat.installation_id.as_deref(), Some("i1"));

        let missing = normalize_created_installation(serde_json::json!({"status": "queued"}));
        assert_eq!(missing.installation_id, None);
        assert_eq!(missing.raw["status"], "queued");
    }

    #[test]
    fn list_payloads_are_unwrapped() {
        let items = extract_items("u", serde_json::json!([{"id": "a"}]), "connections").unwrap();
        assert_eq!(items.len(), 1);
        let items = extract_items(
            "u",
            serde_json::json!({"connections": [{"id": "a"}, {"id": "b"}]}),
            "connections",
        )
        .unwrap();
        assert_eq!(items.len(), 2);
        assert!(extract_items("u", Value::Null, "connections").unwrap().is_empty());
        assert!(extract_items("u", serde_json::json!("nope"), "connections").is_err());
    }

    #[test]
    fn new_installation_body_has_fixed_shape() {
        let body = NewInstallation {
            provider: "acme".to_string(),
            connection_id: "c1".to_string(),
            group_ref: "g1".to_string(),
            created_by: "mcp:ensure-installation".to_string(),
        }
        .to_body();
        assert_eq!(
            body,
            serde_json::json!({
                "connectionId": "c1",
                "groupRef": "g1",
                "config": {
                    "createdBy": "mcp:ensure-installation",
                    "content": {"provider": "acme", "proxy": {"enabled": true}},
                },
            })
        );
    }

    #[test]
    fn segment_urls_escape_identifiers() {
        let url = HttpPlatformClient::url_with_segments(
            "https://api.withampersand.com/",
            &["v1", "projects", "my project", "connections"],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.withampersand.com/v1/projects/my%20project/connections"
        );
    }

    #[test]
    fn body_parsing_falls_back_to_text() {
        assert_eq!(parse_body(""), Value::Null);
        assert_eq!(parse_body("{\"a\":1}"), serde_json::json!({"a": 1}));
        assert_eq!(parse_body("plain"), Value::String("plain".to_string()));
    }

    mod wire {
        use super::super::*;
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;
        use tokio::task::JoinHandle;

        fn config() -> PlatformConfig {
            PlatformConfig {
                api_key: "key-1".to_string(),
                project_id: "proj".to_string(),
                integration_name: "crm-sync".to_string(),
                group_ref: "g1".to_string(),
            }
        }

        fn client(base: &str) -> HttpPlatformClient {
            HttpPlatformClient::new(
                Logger::new("test"),
                Endpoints {
                    api_base: base.to_string(),
                    proxy_base: base.to_string(),
                    write_base: base.to_string(),
                },
            )
            .expect("client")
        }

        fn request_complete(raw: &[u8]) -> bool {
            let text = String::from_utf8_lossy(raw);
            let Some(end) = text.find("\r\n\r\n") else {
                return false;
            };
            let length = text[..end]
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            raw.len() >= end + 4 + length
        }

        /// Answers a single request with `status` and `body`, and yields the
        /// raw request text it received.
        async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
            let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
            let base = format!("http://{}", listener.local_addr().expect("addr"));
            let handle = tokio::spawn(async move {
                let (mut socket, _) = listener.accept().await.expect("accept");
                let mut raw = Vec::new();
                let mut chunk = [0u8; 4096];
                while !request_complete(&raw) {
                    let read = socket.read(&mut chunk).await.expect("read");
                    if read == 0 {
                        break;
                    }
                    raw.extend_from_slice(&chunk[..read]);
                }
                let response = format!(
                    "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                socket.write_all(response.as_bytes()).await.expect("write");
                let _ = socket.shutdown().await;
                String::from_utf8_lossy(&raw).into_owned()
            });
            (base, handle)
        }

        fn body_of(request: &str) -> &str {
            request.split_once("\r\n\r\n").map(|(_, body)| body).unwrap_or("")
        }

        #[tokio::test]
        async fn list_connections_scopes_by_project_and_provider() {
            let (base, server) =
                serve_once("200 OK", r#"{"connections":[{"id":"c1","provider":"acme","group":{"groupRef":"g1"}}]}"#)
                    .await;

            let connections = client(&base)
                .list_connections(&config(), "acme")
                .await
                .expect("connections");
            let request = server.await.expect("server");

            assert!(request.starts_with("GET /v1/projects/proj/connections?provider=acme HTTP/1.1\r\n"));
            assert!(request.to_ascii_lowercase().contains("\r\nx-api-key: key-1\r\n"));
            assert_eq!(connections.len(), 1);
            assert_eq!(connections[0].group_ref.as_deref(), Some("g1"));
        }

        #[tokio::test]
        async fn oauth_connect_posts_json_and_trims_the_plain_text_url() {
            let (base, server) = serve_once("200 OK", "  https://auth.example/start?s=1\n").await;
            let request = OAuthConnect {
                provider: "acme".to_string(),
                consumer_ref: "consumer-1".to_string(),
                group_ref: Some("g1".to_string()),
                project_id: "proj".to_string(),
            };

            let url = client(&base)
                .oauth_connect(&config(), &request)
                .await
                .expect("url");
            let raw = server.await.expect("server");

            assert_eq!(url, "https://auth.example/start?s=1");
            assert!(raw.starts_with("POST /v1/oauth-connect HTTP/1.1\r\n"));
            let sent: Value = serde_json::from_str(body_of(&raw)).expect("json body");
            assert_eq!(
                sent,
                serde_json::json!({
                    "provider": "acme",
                    "consumerRef": "consumer-1",
                    "groupRef": "g1",
                    "projectId": "proj",
                })
            );
        }

        #[tokio::test]
        async fn write_record_posts_the_body_unchanged_to_the_object_path() {
            let (base, server) = serve_once("200 OK", r#"{"result":{"recordId":"r1"}}"#).await;
            let body: Value = serde_json::from_str(
                r#"{"groupRef":"g1","type":"create","record":{"zeta":1,"alpha":2}}"#,
            )
            .expect("body");

            let out = client(&base)
                .write_record(&config(), "contacts", &body)
                .await
                .expect("write");
            let raw = server.await.expect("server");

            assert!(raw.starts_with(
                "POST /v1/projects/proj/integrations/crm-sync/objects/contacts HTTP/1.1\r\n"
            ));
            assert_eq!(
                body_of(&raw),
                r#"{"groupRef":"g1","type":"create","record":{"zeta":1,"alpha":2}}"#
            );
            assert_eq!(out["result"]["recordId"], "r1");
        }

        #[tokio::test]
        async fn rejected_installation_create_is_a_status_error() {
            let (base, server) =
                serve_once("422 Unprocessable Entity", r#"{"message":"duplicate"}"#).await;
            let request = NewInstallation {
                provider: "acme".to_string(),
                connection_id: "c1".to_string(),
                group_ref: "g1".to_string(),
                created_by: "sdk:ensure-installation".to_string(),
            };

            let err = client(&base)
                .create_installation(&config(), &request)
                .await
                .expect_err("422");
            let raw = server.await.expect("server");

            assert!(raw.starts_with(
                "POST /v1/projects/proj/integrations/crm-sync/installations HTTP/1.1\r\n"
            ));
            match err {
                PlatformError::Status { status, body, .. } => {
                    assert_eq!(status, 422);
                    assert_eq!(body["message"], "duplicate");
                }
                other => panic!("unexpected error: {:?}", other),
            }
        }

        #[tokio::test]
        async fn proxy_sends_headers_and_body_and_passes_error_statuses_through() {
            let (base, server) = serve_once("404 Not Found", r#"{"error":"missing"}"#).await;
            let mut headers = BTreeMap::new();
            headers.insert("x-amp-installation-id".to_string(), "i1".to_string());
            headers.insert("content-type".to_string(), "application/json".to_string());
            let call = ProxyCall {
                url: format!("{}/v1/foo", base),
                method: "POST".to_string(),
                headers,
                body: Some(r#""raw text""#.to_string()),
            };

            let response = client(&base).send_proxy(&call).await.expect("response");
            let raw = server.await.expect("server");

            assert_eq!(response.status, 404);
            assert_eq!(response.body["error"], "missing");
            assert!(raw.starts_with("POST /v1/foo HTTP/1.1\r\n"));
            assert!(raw.to_ascii_lowercase().contains("\r\nx-amp-installation-id: i1\r\n"));
            assert_eq!(body_of(&raw), r#""raw text""#);
        }
    }
}
