use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::fmt;

use super::platform_error::PlatformError;
use crate::constants::tools;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    InvalidParams,
    Denied,
    NotFound,
    Retryable,
    Internal,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolError {
    pub kind: ToolErrorKind,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    pub retryable: bool,
}

impl ToolError {
    pub fn new(kind: ToolErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
            hint: None,
            details: None,
            retryable: matches!(kind, ToolErrorKind::Retryable),
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::InvalidParams, "INVALID_PARAMS", message)
    }

    pub fn denied(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Denied, "DENIED", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::NotFound, "NOT_FOUND", message)
    }

    pub fn retryable(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Retryable, "RETRYABLE", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Internal, "INTERNAL", message)
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for ToolError {}

impl From<std::io::Error> for ToolError {
    fn from(err: std::io::Error) -> Self {
        ToolError::internal(err.to_string())
    }
}

impl From<PlatformError> for ToolError {
    fn from(err: PlatformError) -> Self {
        let message = err.to_string();
        match &err {
            PlatformError::NotConnected { provider, .. } => {
                ToolError::new(ToolErrorKind::NotFound, "NOT_CONNECTED", message)
                    .with_hint(format!(
                        "Run {} for provider '{}' and complete the OAuth flow first.",
                        tools::START_OAUTH,
                        provider
                    ))
            }
            PlatformError::InstallationCreation { details, .. } => ToolError::new(
                ToolErrorKind::Internal,
                "INSTALLATION_CREATION_FAILED",
                message,
            )
            .with_details(details.clone()),
            PlatformError::InvalidInput(_) => ToolError::invalid_params(message),
            PlatformError::Transport { .. } => ToolError::retryable(message),
            PlatformError::Status { status, body, .. } => {
                let base = match *status {
                    401 | 403 => ToolError::denied(message),
                    404 => ToolError::not_found(message),
                    429 | 500..=599 => ToolError::retryable(message),
                    _ => ToolError::internal(message),
                };
                base.with_details(serde_json::json!({ "status": status, "body": body }))
            }
            PlatformError::Decode { .. } => ToolError::internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::NotConnectedReason;

    #[test]
    fn not_connected_maps_to_not_found_with_oauth_hint() {
        let err: ToolError =
            PlatformError::not_connected("acme", NotConnectedReason::NoConnection).into();
        assert_eq!(err.kind, ToolErrorKind::NotFound);
        assert_eq!(err.code, "NOT_CONNECTED");
        assert!(err.hint.as_deref().unwrap_or("").contains("start-oauth"));
        assert!(!err.retryable);
    }

    #[test]
    fn status_codes_map_to_kinds() {
        let status = |code: u16| -> ToolError {
            PlatformError::Status {
                url: "https://api.example/v1".to_string(),
                status: code,
                body: Value::Null,
            }
            .into()
        };
        assert_eq!(status(401).kind, ToolErrorKind::Denied);
        assert_eq!(status(404).kind, ToolErrorKind::NotFound);
        assert_eq!(status(503).kind, ToolErrorKind::Retryable);
        assert!(status(503).retryable);
        assert_eq!(status(422).kind, ToolErrorKind::Internal);
    }
}
