use crate::errors::{ErrorCode, McpError};
use crate::utils::suggest::suggest;
use jsonschema::error::{TypeKind, ValidationErrorKind};
use jsonschema::{JSONSchema, ValidationError};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

const MAX_REPORTED_VIOLATIONS: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDef {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
    #[serde(rename = "outputSchema", default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
}

/// The embedded tool list with both schemas of every tool compiled up front.
struct Catalog {
    tools: Vec<ToolDef>,
    inputs: HashMap<String, JSONSchema>,
    outputs: HashMap<String, JSONSchema>,
}

impl Catalog {
    fn load() -> Self {
        let raw = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/tool_catalog.json"));
        let tools: Vec<ToolDef> =
            serde_json::from_str(raw).expect("tool_catalog.json must be valid JSON");
        let inputs = tools
            .iter()
            .filter_map(|tool| compile(&tool.input_schema).map(|v| (tool.name.clone(), v)))
            .collect();
        let outputs = tools
            .iter()
            .filter_map(|tool| {
                let schema = tool.output_schema.as_ref()?;
                compile(schema).map(|v| (tool.name.clone(), v))
            })
            .collect();
        Self {
            tools,
            inputs,
            outputs,
        }
    }

    fn tool(&self, name: &str) -> Option<&ToolDef> {
        self.tools.iter().find(|tool| tool.name == name)
    }
}

fn compile(schema: &Value) -> Option<JSONSchema> {
    JSONSchema::compile(schema).ok()
}

static CATALOG: Lazy<Catalog> = Lazy::new(Catalog::load);

pub fn tool_catalog() -> &'static Vec<ToolDef> {
    &CATALOG.tools
}

pub fn tool_by_name(name: &str) -> Option<&'static ToolDef> {
    CATALOG.tool(name)
}

pub fn validate_tool_args(tool_name: &str, args: &Value) -> Result<(), McpError> {
    let Some(tool) = CATALOG.tool(tool_name) else {
        return Ok(());
    };
    check(&CATALOG.inputs, tool_name, args, &tool.input_schema).map_err(|report| {
        McpError::new(
            ErrorCode::InvalidParams,
            format!("Invalid arguments for {}\n{}", tool_name, report),
        )
    })
}

/// Checks a handler result against the tool's declared output shape.
pub fn validate_tool_output(tool_name: &str, output: &Value) -> Result<(), McpError> {
    let Some(schema) = CATALOG.tool(tool_name).and_then(|t| t.output_schema.as_ref()) else {
        return Ok(());
    };
    check(&CATALOG.outputs, tool_name, output, schema).map_err(|report| {
        McpError::new(
            ErrorCode::InternalError,
            format!("Invalid output from {}\n{}", tool_name, report),
        )
    })
}

fn check(
    validators: &HashMap<String, JSONSchema>,
    tool_name: &str,
    instance: &Value,
    schema: &Value,
) -> Result<(), String> {
    let Some(validator) = validators.get(tool_name) else {
        return Ok(());
    };
    validator
        .validate(instance)
        .map_err(|violations| report(violations, instance, schema))
}

/// One `- <pointer>: <problem>` line per violation, then a single
/// `Did you mean:` line when any unknown value has a close match.
fn report<'a>(
    violations: impl Iterator<Item = ValidationError<'a>>,
    instance: &Value,
    schema: &Value,
) -> String {
    let mut lines = Vec::new();
    let mut hints = Vec::new();
    for violation in violations.take(MAX_REPORTED_VIOLATIONS) {
        let pointer = violation.instance_path.to_string();
        let location = if pointer.is_empty() { "(root)" } else { pointer.as_str() };
        let (problem, hint) = describe(&violation, &pointer, instance, schema);
        lines.push(format!("- {}: {}", location, problem));
        if let Some(hint) = hint {
            hints.push(format!("{}{}", hint_prefix(&violation.kind, location), hint));
        }
    }
    if !hints.is_empty() {
        hints.truncate(3);
        lines.push(format!("Did you mean: {}", hints.join(" | ")));
    }
    lines.join("\n")
}

fn hint_prefix(kind: &ValidationErrorKind, location: &str) -> String {
    match kind {
        ValidationErrorKind::AdditionalProperties { .. } => String::new(),
        _ => format!("{}: ", location),
    }
}

fn describe(
    violation: &ValidationError,
    pointer: &str,
    instance: &Value,
    schema: &Value,
) -> (String, Option<String>) {
    match &violation.kind {
        ValidationErrorKind::AdditionalProperties { unexpected } => {
            let known = property_names(schema, pointer);
            let fields: Vec<String> = unexpected.iter().map(|f| format!("'{}'", f)).collect();
            let hints: Vec<String> = unexpected
                .iter()
                .filter_map(|field| {
                    let close = suggest(field, &known, 3);
                    (!close.is_empty())
                        .then(|| format!("field '{}': {}", field, close.join(", ")))
                })
                .collect();
            (
                format!("unknown field {}", fields.join(", ")),
                (!hints.is_empty()).then(|| hints.join(" | ")),
            )
        }
        ValidationErrorKind::Enum { options } => {
            let allowed: Vec<String> = options
                .as_array()
                .into_iter()
                .flatten()
                .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                .collect();
            let received = instance.pointer(pointer).and_then(Value::as_str).unwrap_or("");
            let close = suggest(received, &allowed, 3);
            (
                format!("expected one of {}", allowed.join(", ")),
                (!close.is_empty()).then(|| close.join(", ")),
            )
        }
        ValidationErrorKind::Required { property } => {
            let name = property.as_str().map(str::to_string).unwrap_or_else(|| property.to_string());
            (format!("missing required field '{}'", name), None)
        }
        ValidationErrorKind::Type { kind } => (format!("expected {}", type_names(kind)), None),
        _ => (violation.to_string(), None),
    }
}

fn type_names(kind: &TypeKind) -> String {
    match kind {
        TypeKind::Single(primitive) => primitive.to_string(),
        TypeKind::Multiple(types) => (*types)
            .into_iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(" | "),
    }
}

/// Declared property names of the object found at `pointer` in an instance
/// shaped by `schema`.
fn property_names(schema: &Value, pointer: &str) -> Vec<String> {
    let mut node = schema;
    for segment in pointer.split('/').filter(|s| !s.is_empty()) {
        let next = node
            .get("properties")
            .and_then(|props| props.get(segment))
            .or_else(|| node.get("items"));
        match next {
            Some(child) => node = child,
            None => return Vec::new(),
        }
    }
    node.get("properties")
        .and_then(Value::as_object)
        .map(|props| props.keys().cloned().collect())
        .unwrap_or_default()
}

/// Rewrites constructs function-calling APIs reject (type unions, arrays
/// without `items`) into equivalent `anyOf` forms.
pub fn normalize_json_schema_for_openai(schema: &Value) -> Value {
    let Value::Object(map) = schema else {
        return schema.clone();
    };
    let mut out: Map<String, Value> = map
        .iter()
        .map(|(key, value)| {
            let normalized = match (key.as_str(), value) {
                ("properties", Value::Object(props)) => Value::Object(
                    props
                        .iter()
                        .map(|(name, prop)| (name.clone(), normalize_json_schema_for_openai(prop)))
                        .collect(),
                ),
                ("anyOf" | "oneOf" | "allOf", Value::Array(variants)) => {
                    Value::Array(variants.iter().map(normalize_json_schema_for_openai).collect())
                }
                ("items" | "additionalProperties", Value::Object(_)) => {
                    normalize_json_schema_for_openai(value)
                }
                _ => value.clone(),
            };
            (key.clone(), normalized)
        })
        .collect();

    match out.get("type").cloned() {
        Some(Value::Array(types)) => {
            out.remove("type");
            let items = out
                .remove("items")
                .unwrap_or_else(|| Value::Object(Map::new()));
            let variants = types
                .iter()
                .filter_map(Value::as_str)
                .map(|t| match t {
                    "array" => serde_json::json!({"type": "array", "items": items.clone()}),
                    _ => serde_json::json!({"type": t}),
                })
                .collect();
            out.insert("anyOf".to_string(), Value::Array(variants));
        }
        Some(Value::String(t)) if t == "array" => {
            out.entry("items")
                .or_insert_with(|| Value::Object(Map::new()));
        }
        _ => {}
    }
    Value::Object(out)
}

/// Catalog entries with schemas normalised for function-calling clients.
pub fn list_tools() -> Vec<ToolDef> {
    CATALOG
        .tools
        .iter()
        .map(|tool| ToolDef {
            input_schema: normalize_json_schema_for_openai(&tool.input_schema),
            ..tool.clone()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_field_gets_a_suggestion() {
        let err = validate_tool_args(
            "check-connection",
            &serde_json::json!({"provider": "acme", "provder": "x"}),
        )
        .expect_err("unknown field must be rejected");
        assert_eq!(err.code, ErrorCode::InvalidParams);
        assert!(err.message.contains("unknown field 'provder'"));
        assert!(err.message.contains("Did you mean: field 'provder': provider"));
    }

    #[test]
    fn missing_required_field_is_reported() {
        let err = validate_tool_args("send-request", &serde_json::json!({"provider": "acme"}))
            .expect_err("endpoint is required");
        assert!(err.message.contains("missing required field 'endpoint'"));
    }

    #[test]
    fn misspelled_method_lists_allowed_values_and_a_close_match() {
        let err = validate_tool_args(
            "send-request",
            &serde_json::json!({"provider": "acme", "endpoint": "v1/foo", "method": "DELTE"}),
        )
        .expect_err("method must be one of the listed verbs");
        assert!(err.message.contains("- /method: expected one of GET, POST"));
        let hint = err
            .message
            .lines()
            .find(|line| line.starts_with("Did you mean: /method: "))
            .expect("hint line");
        assert!(hint.contains("DELETE"));
    }

    #[test]
    fn property_names_follow_the_instance_path() {
        let schema = &tool_by_name("create-record").expect("tool").input_schema;
        assert_eq!(property_names(schema, "/associations/0/to"), vec!["id".to_string()]);
        assert!(property_names(schema, "/record/nested").is_empty());
        assert!(property_names(schema, "").contains(&"objectName".to_string()));
    }

    #[test]
    fn type_unions_become_any_of() {
        let schema = serde_json::json!({"type": ["string", "number"]});
        let normalized = normalize_json_schema_for_openai(&schema);
        assert!(normalized.get("type").is_none());
        assert_eq!(normalized["anyOf"].as_array().map(|a| a.len()), Some(2));
    }

    #[test]
    fn header_values_and_bare_arrays_are_normalised() {
        let schema = &tool_by_name("send-request").expect("tool").input_schema;
        let normalized = normalize_json_schema_for_openai(schema);
        let headers = &normalized["properties"]["headers"]["additionalProperties"];
        assert!(headers.get("type").is_none());
        assert_eq!(headers["anyOf"][0], serde_json::json!({"type": "string"}));

        let bare = normalize_json_schema_for_openai(&serde_json::json!({"type": "array"}));
        assert_eq!(bare["items"], serde_json::json!({}));
    }

    #[test]
    fn output_validation_rejects_wrong_shape() {
        assert!(validate_tool_output("start-oauth", &serde_json::json!({"url": "https://x"})).is_ok());
        assert!(validate_tool_output("start-oauth", &serde_json::json!({"link": 1})).is_err());
    }
}
