use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Why a provider cannot be used for installation resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotConnectedReason {
    NoConnection,
    MissingGroupRef { connection_id: String },
}

impl fmt::Display for NotConnectedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotConnectedReason::NoConnection => write!(f, "no existing connections found"),
            NotConnectedReason::MissingGroupRef { connection_id } => {
                write!(f, "connection {} does not have a groupRef", connection_id)
            }
        }
    }
}

/// Failures raised by the core operations that talk to the platform.
///
/// Lookups and the installation resolver propagate these unchanged; only the
/// write executor and the tool adapters turn them into structured results.
#[derive(Debug, Clone, Error)]
pub enum PlatformError {
    #[error("No usable connection for {provider} ({reason}). Please connect using OAuth.")]
    NotConnected {
        provider: String,
        reason: NotConnectedReason,
    },

    #[error("Failed to create installation for {provider}.")]
    InstallationCreation { provider: String, details: Value },

    #[error("{0}")]
    InvalidInput(String),

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("{url} responded with HTTP {status}")]
    Status { url: String, status: u16, body: Value },

    #[error("could not decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl PlatformError {
    pub fn not_connected(provider: &str, reason: NotConnectedReason) -> Self {
        PlatformError::NotConnected {
            provider: provider.to_string(),
            reason,
        }
    }

    pub fn is_not_connected(&self) -> bool {
        matches!(self, PlatformError::NotConnected { .. })
    }

    /// JSON rendering used wherever a failure must travel inside a payload.
    pub fn to_value(&self) -> Value {
        let mut out = serde_json::json!({ "message": self.to_string() });
        if let Value::Object(map) = &mut out {
            match self {
                PlatformError::NotConnected { provider, .. } => {
                    map.insert("error".to_string(), Value::from("not_connected"));
                    map.insert("provider".to_string(), Value::from(provider.as_str()));
                }
                PlatformError::InstallationCreation { provider, details } => {
                    map.insert("error".to_string(), Value::from("installation_creation"));
                    map.insert("provider".to_string(), Value::from(provider.as_str()));
                    map.insert("details".to_string(), details.clone());
                }
                PlatformError::InvalidInput(_) => {
                    map.insert("error".to_string(), Value::from("invalid_input"));
                }
                PlatformError::Transport { url, .. } => {
                    map.insert("error".to_string(), Value::from("transport"));
                    map.insert("url".to_string(), Value::from(url.as_str()));
                }
                PlatformError::Status { url, status, body } => {
                    map.insert("error".to_string(), Value::from("status"));
                    map.insert("url".to_string(), Value::from(url.as_str()));
                    map.insert("status".to_string(), Value::from(*status));
                    map.insert("body".to_string(), body.clone());
                }
                PlatformError::Decode { url, .. } => {
                    map.insert("error".to_string(), Value::from("decode"));
                    map.insert("url".to_string(), Value::from(url.as_str()));
                }
            }
        }
        out
    }
}

impl From<reqwest::Error> for PlatformError {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        if err.is_decode() {
            return PlatformError::Decode {
                url,
                message: err.to_string(),
            };
        }
        PlatformError::Transport {
            url,
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_connected_message_names_provider_and_oauth() {
        let err = PlatformError::not_connected("acme", NotConnectedReason::NoConnection);
        let text = err.to_string();
        assert!(text.contains("acme"));
        assert!(text.contains("no existing connections"));
        assert!(text.contains("OAuth"));
    }

    #[test]
    fn missing_group_ref_message_names_connection() {
        let err = PlatformError::not_connected(
            "acme",
            NotConnectedReason::MissingGroupRef {
                connection_id: "c1".to_string(),
            },
        );
        assert!(err.is_not_connected());
        assert!(err.to_string().contains("connection c1 does not have a groupRef"));
    }

    #[test]
    fn installation_creation_value_carries_details() {
        let err = PlatformError::InstallationCreation {
            provider: "acme".to_string(),
            details: serde_json::json!({"unexpected": true}),
        };
        let value = err.to_value();
        assert_eq!(value["error"], "installation_creation");
        assert_eq!(value["details"]["unexpected"], true);
    }
}
