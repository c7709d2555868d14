use crate::errors::ToolError;
use crate::utils::suggest::suggest;

pub fn unknown_tool_error(tool: &str, known_tools: &[String]) -> ToolError {
    let mut known: Vec<String> = known_tools.to_vec();
    known.sort();
    known.dedup();
    let suggestions = if !tool.is_empty() {
        suggest(tool, &known, 5)
    } else {
        Vec::new()
    };
    let list_hint = if !known.is_empty() {
        format!("Use one of: {}.", known.join(", "))
    } else {
        String::new()
    };
    let did_you_mean = if !suggestions.is_empty() {
        format!("Did you mean: {}?", suggestions.join(", "))
    } else {
        String::new()
    };
    let hint = [did_you_mean, list_hint]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    let mut err = ToolError::invalid_params(format!("Unknown tool: {}", tool));
    if !hint.is_empty() {
        err = err.with_hint(hint);
    }
    if !known.is_empty() {
        err = err.with_details(serde_json::json!({
            "known_tools": known,
            "did_you_mean": suggestions,
        }));
    }
    err
}
