use once_cell::sync::Lazy;
use std::collections::HashMap;

/// camelCase names used by the function-calling and workflow bindings, plus
/// the short names earlier server releases exposed.
pub const BUILTIN_TOOL_ALIASES: &[(&str, &str)] = &[
    ("createRecord", "create-record"),
    ("updateRecord", "update-record"),
    ("checkConnection", "check-connection"),
    ("createInstallation", "create-installation"),
    ("checkInstallation", "check-installation"),
    ("startOAuth", "start-oauth"),
    ("sendRequest", "send-request"),
    ("sendReadRequest", "send-read-request"),
    ("oauth", "start-oauth"),
    ("proxy", "send-request"),
];

static BUILTIN_TOOL_ALIAS_MAP: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for (alias, target) in BUILTIN_TOOL_ALIASES {
        map.insert(*alias, *target);
    }
    map
});

pub fn builtin_tool_aliases() -> &'static [(&'static str, &'static str)] {
    BUILTIN_TOOL_ALIASES
}

pub fn builtin_tool_alias_map() -> &'static HashMap<&'static str, &'static str> {
    &BUILTIN_TOOL_ALIAS_MAP
}

pub fn canonical_tool_name(tool: &str) -> &str {
    builtin_tool_alias_map().get(tool).copied().unwrap_or(tool)
}

/// The camelCase binding name of a canonical tool (first alias listed).
pub fn binding_name(tool: &str) -> Option<&'static str> {
    BUILTIN_TOOL_ALIASES
        .iter()
        .find(|(alias, target)| *target == tool && alias.chars().any(|c| c.is_ascii_uppercase()))
        .map(|(alias, _)| *alias)
}

pub fn builtin_tool_alias_map_owned() -> HashMap<String, String> {
    BUILTIN_TOOL_ALIASES
        .iter()
        .map(|(alias, target)| (alias.to_string(), target.to_string()))
        .collect()
}
