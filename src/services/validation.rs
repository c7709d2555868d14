use crate::errors::ToolError;
use serde_json::Value;
use std::collections::BTreeMap;

/// Argument extraction shared by the tool handlers. The catalog schema has
/// already run by the time these are called; these checks cover what JSON
/// Schema cannot express (blank strings, header value rendering).
#[derive(Clone)]
pub struct Validation;

impl Validation {
    pub fn new() -> Self {
        Self
    }

    pub fn ensure_string(
        &self,
        value: &Value,
        label: &str,
        trim: bool,
    ) -> Result<String, ToolError> {
        let text = value.as_str().ok_or_else(|| {
            ToolError::invalid_params(format!("{} must be a non-empty string", label))
        })?;
        let normalized = text.trim();
        if normalized.is_empty() {
            return Err(ToolError::invalid_params(format!(
                "{} must be a non-empty string",
                label
            )));
        }
        Ok(if trim {
            normalized.to_string()
        } else {
            text.to_string()
        })
    }

    pub fn require_string(&self, args: &Value, key: &str) -> Result<String, ToolError> {
        let value = args
            .get(key)
            .ok_or_else(|| ToolError::invalid_params(format!("{} is required", key)))?;
        self.ensure_string(value, key, true)
    }

    /// Absent, null and blank all read as `None`.
    pub fn optional_string(&self, args: &Value, key: &str) -> Result<Option<String>, ToolError> {
        match args.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(val) => self.ensure_string(val, key, true).map(Some),
        }
    }

    pub fn ensure_headers(
        &self,
        value: Option<&Value>,
    ) -> Result<BTreeMap<String, String>, ToolError> {
        let Some(value) = value else {
            return Ok(BTreeMap::new());
        };
        if value.is_null() {
            return Ok(BTreeMap::new());
        }
        let obj = value
            .as_object()
            .ok_or_else(|| ToolError::invalid_params("headers must be an object"))?;
        let mut out = BTreeMap::new();
        for (key, val) in obj.iter() {
            if key.trim().is_empty() || val.is_null() {
                continue;
            }
            let rendered = val
                .as_str()
                .map(|s| s.to_string())
                .unwrap_or_else(|| val.to_string());
            out.insert(key.trim().to_string(), rendered);
        }
        Ok(out)
    }

    pub fn ensure_object(
        &self,
        value: &Value,
        label: &str,
    ) -> Result<serde_json::Map<String, Value>, ToolError> {
        value
            .as_object()
            .cloned()
            .ok_or_else(|| ToolError::invalid_params(format!("{} must be an object", label)))
    }

    pub fn optional_array(&self, args: &Value, key: &str) -> Result<Option<Vec<Value>>, ToolError> {
        match args.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Array(items)) => Ok(Some(items.clone())),
            Some(_) => Err(ToolError::invalid_params(format!(
                "{} must be an array",
                key
            ))),
        }
    }
}

impl Default for Validation {
    fn default() -> Self {
        Self::new()
    }
}
