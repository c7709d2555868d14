//! Turns tool outputs into MCP `tools/call` results: human-readable text
//! blocks plus the structured output, or an `isError` result naming the
//! provider.

use crate::constants::tools;
use crate::errors::ToolError;
use serde_json::Value;

fn text_block(text: String) -> Value {
    serde_json::json!({ "type": "text", "text": text })
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(|v| v.as_str()).filter(|s| !s.is_empty())
}

fn provider_of(args: &Value) -> &str {
    str_field(args, "provider").unwrap_or("unknown provider")
}

fn error_result(text: String) -> Value {
    serde_json::json!({
        "content": [text_block(text)],
        "isError": true,
    })
}

pub fn render_success(tool: &str, args: &Value, output: &Value) -> Value {
    let provider = provider_of(args);
    let lines: Vec<String> = match tool {
        tools::CREATE_RECORD | tools::UPDATE_RECORD => {
            if output.get("success").and_then(|v| v.as_bool()) != Some(true) {
                return error_result(format!(
                    "Error performing write operation for {}: {}",
                    provider,
                    output.get("response").cloned().unwrap_or(Value::Null)
                ));
            }
            let write_type = if tool == tools::CREATE_RECORD {
                "create"
            } else {
                "update"
            };
            vec![
                format!(
                    "Successfully performed {} operation on {}",
                    write_type,
                    str_field(args, "objectName").unwrap_or("")
                ),
                format!(
                    "Record ID: {}",
                    str_field(output, "recordId").unwrap_or("N/A")
                ),
                format!(
                    "Response: {}",
                    output.get("response").cloned().unwrap_or(Value::Null)
                ),
            ]
        }
        tools::CHECK_CONNECTION => {
            if output.get("found").and_then(|v| v.as_bool()) == Some(true) {
                vec![format!(
                    "Connection found for {} connectionId: {}, groupRef: {}",
                    provider,
                    str_field(output, "connectionId").unwrap_or("N/A"),
                    str_field(output, "groupRef").unwrap_or("N/A")
                )]
            } else {
                vec![format!("No existing connections found for {}", provider)]
            }
        }
        tools::CHECK_INSTALLATION => {
            if output.get("found").and_then(|v| v.as_bool()) == Some(true) {
                vec![format!(
                    "Installation found for {} ID: {}",
                    provider,
                    str_field(output, "installationId").unwrap_or("N/A")
                )]
            } else {
                vec![format!("No installation found for {}", provider)]
            }
        }
        tools::CREATE_INSTALLATION => {
            let created = output.get("created").and_then(|v| v.as_bool()) == Some(true);
            vec![format!(
                "Installation {} for {}. ID: {}",
                if created { "created" } else { "not created" },
                provider,
                str_field(output, "installationId").unwrap_or("N/A")
            )]
        }
        tools::START_OAUTH => vec![format!(
            "OAuth URL generated for {}: {}",
            provider,
            str_field(output, "url").unwrap_or("")
        )],
        tools::SEND_REQUEST | tools::SEND_READ_REQUEST => vec![
            format!(
                "API call successful. Status: {}",
                output.get("status").cloned().unwrap_or(Value::Null)
            ),
            format!(
                "Response: {}",
                output.get("response").cloned().unwrap_or(Value::Null)
            ),
        ],
        _ => vec![output.to_string()],
    };
    serde_json::json!({
        "content": lines.into_iter().map(text_block).collect::<Vec<_>>(),
        "structuredContent": output,
    })
}

pub fn render_failure(tool: &str, args: &Value, error: &ToolError) -> Value {
    let provider = provider_of(args);
    let action = match tool {
        tools::CREATE_RECORD | tools::UPDATE_RECORD => "performing write operation for",
        tools::CHECK_CONNECTION => "checking connection for",
        tools::CHECK_INSTALLATION => "checking installation for",
        tools::CREATE_INSTALLATION => "creating installation for",
        tools::START_OAUTH => "generating OAuth URL for",
        tools::SEND_REQUEST | tools::SEND_READ_REQUEST => "making API call to",
        _ => "calling tool for",
    };
    let mut text = format!("Error {} {}: {}", action, provider, error.message);
    if let Some(hint) = &error.hint {
        text.push_str(&format!("\nHint: {}", hint));
    }
    error_result(text)
}
