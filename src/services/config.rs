use crate::constants::{endpoints, env};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Credentials and identifiers for one tool invocation.
///
/// Empty strings mean "missing"; they are sent as-is and the platform rejects
/// the call, nothing checks them up front.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformConfig {
    pub api_key: String,
    pub project_id: String,
    pub integration_name: String,
    pub group_ref: String,
}

impl PlatformConfig {
    /// Per-call group reference wins over the configured one.
    pub fn group_ref_or(&self, explicit: Option<&str>) -> String {
        non_empty(explicit)
            .unwrap_or(self.group_ref.as_str())
            .to_string()
    }
}

/// Explicit values supplied by the calling layer (CLI flags, runtime context, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigOverrides {
    pub api_key: Option<String>,
    pub project_id: Option<String>,
    pub integration_name: Option<String>,
    pub group_ref: Option<String>,
}

impl ConfigOverrides {
    /// Reads overrides from a string map keyed by the environment variable names.
    pub fn from_map(map: &HashMap<String, String>) -> Self {
        Self {
            api_key: map.get(env::API_KEY).cloned(),
            project_id: map.get(env::PROJECT_ID).cloned(),
            integration_name: map.get(env::INTEGRATION_NAME).cloned(),
            group_ref: map.get(env::GROUP_REF).cloned(),
        }
    }

    /// Fields set in `other` replace fields set here.
    pub fn merged_with(&self, other: &ConfigOverrides) -> ConfigOverrides {
        fn pick(primary: &Option<String>, fallback: &Option<String>) -> Option<String> {
            non_empty(primary.as_deref())
                .or_else(|| non_empty(fallback.as_deref()))
                .map(|s| s.to_string())
        }
        ConfigOverrides {
            api_key: pick(&other.api_key, &self.api_key),
            project_id: pick(&other.project_id, &self.project_id),
            integration_name: pick(&other.integration_name, &self.integration_name),
            group_ref: pick(&other.group_ref, &self.group_ref),
        }
    }
}

/// Point-in-time copy of the process environment values the resolver consults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    pub api_key: Option<String>,
    pub project_id: Option<String>,
    pub integration_name: Option<String>,
    pub group_ref: Option<String>,
}

impl EnvSnapshot {
    pub fn capture() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let integration_name = read(env::INTEGRATION_NAME).or_else(|| {
            env::INTEGRATION_NAME_FALLBACKS
                .iter()
                .find_map(|key| read(*key))
        });
        Self {
            api_key: read(env::API_KEY),
            project_id: read(env::PROJECT_ID),
            integration_name,
            group_ref: read(env::GROUP_REF),
        }
    }
}

/// Explicit argument, then environment, then empty string. Never fails.
pub fn resolve_config(overrides: &ConfigOverrides, env: &EnvSnapshot) -> PlatformConfig {
    fn pick(explicit: &Option<String>, ambient: &Option<String>) -> String {
        non_empty(explicit.as_deref())
            .or_else(|| non_empty(ambient.as_deref()))
            .unwrap_or("")
            .to_string()
    }
    PlatformConfig {
        api_key: pick(&overrides.api_key, &env.api_key),
        project_id: pick(&overrides.project_id, &env.project_id),
        integration_name: pick(&overrides.integration_name, &env.integration_name),
        group_ref: pick(&overrides.group_ref, &env.group_ref),
    }
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Base URLs for the three remote hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub api_base: String,
    pub proxy_base: String,
    pub write_base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            api_base: endpoints::API_BASE_URL.to_string(),
            proxy_base: endpoints::PROXY_BASE_URL.to_string(),
            write_base: endpoints::WRITE_BASE_URL.to_string(),
        }
    }
}

impl Endpoints {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let read = |key: &str, fallback: String| {
            std::env::var(key)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(|v| v.trim().to_string())
                .unwrap_or(fallback)
        };
        Self {
            api_base: read(endpoints::API_URL_ENV, defaults.api_base),
            proxy_base: read(endpoints::PROXY_URL_ENV, defaults.proxy_base),
            write_base: read(endpoints::WRITE_URL_ENV, defaults.write_base),
        }
    }
}
