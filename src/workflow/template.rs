use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;

use crate::{Result, ToolflowError, common::Vars};

/// Regex pattern for context variables
/// Format: `{{name}}`, `{{ name }}` or `{{user.name}}`
const VARIABLE_TEMPLATE_PATTERN: &str = r"\{\{\s*([A-Za-z0-9_\-]+(?:\.[A-Za-z0-9_\-]+)*)\s*\}\}";

static VARIABLE_TEMPLATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(VARIABLE_TEMPLATE_PATTERN).expect("valid variable template pattern"));

/// Render a context value the way it appears inside a string.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        // For objects/arrays, use JSON string
        v => v.to_string(),
    }
}

/// Resolve template variables in the format `{{name}}` against `vars`.
/// Placeholders that cannot be resolved are left untouched.
pub fn resolve_template(
    template: &str,
    vars: &Vars,
) -> String {
    VARIABLE_TEMPLATE
        .replace_all(template, |caps: &Captures| match vars.lookup(&caps[1]) {
            Some(value) => render(value),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Resolve template variables in the format `{{name}}` against `vars`.
/// Returns error if any template variable cannot be resolved
pub fn resolve_template_strict(
    template: &str,
    vars: &Vars,
) -> Result<String> {
    let missing = unresolved(template, vars);
    if !missing.is_empty() {
        let names: Vec<String> = missing.iter().map(|name| format!("variable '{}' not found", name)).collect();
        return Err(ToolflowError::Config(names.join(", ")));
    }

    Ok(resolve_template(template, vars))
}

/// Names of the placeholders in `template` that `vars` cannot resolve, in order of first appearance.
pub fn unresolved(
    template: &str,
    vars: &Vars,
) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in VARIABLE_TEMPLATE.captures_iter(template) {
        let name = &caps[1];
        if vars.lookup(name).is_none() && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Resolve a configuration value. Strings are resolved, every other value passes through.
pub fn resolve_value(
    value: &Value,
    vars: &Vars,
) -> Value {
    match value {
        Value::String(s) => Value::String(resolve_template(s, vars)),
        _ => value.clone(),
    }
}
