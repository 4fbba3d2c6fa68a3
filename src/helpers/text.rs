//! Text and sequence helpers: case transforms, pluralize, contains, length, default, join

use crate::template::Value;

/// Upper-case the first character, leave the rest alone
pub fn capitalize(value: &Value) -> Value {
    let s = value.to_output_string();
    let mut chars = s.chars();
    let out = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    Value::String(out)
}

pub fn uppercase(value: &Value) -> Value {
    Value::String(value.to_output_string().to_uppercase())
}

pub fn lowercase(value: &Value) -> Value {
    Value::String(value.to_output_string().to_lowercase())
}

/// Pick the singular form for a count of exactly 1
///
/// Without an explicit plural the singular gets an `s`.
pub fn pluralize(count: &Value, singular: &Value, plural: Option<&Value>) -> Value {
    let singular = singular.to_output_string();
    if count.as_number() == 1.0 {
        return Value::String(singular);
    }
    match plural {
        Some(p) if !p.is_undefined() => Value::String(p.to_output_string()),
        _ => Value::String(format!("{}s", singular)),
    }
}

/// Case-insensitive member test on sequences, substring test on text
pub fn contains(haystack: &Value, needle: &Value) -> Value {
    let needle = needle.to_output_string().to_lowercase();
    let found = match haystack {
        Value::Array(items) => items
            .iter()
            .any(|item| item.to_output_string().to_lowercase() == needle),
        Value::String(s) => s.to_lowercase().contains(&needle),
        _ => false,
    };
    Value::Bool(found)
}

pub fn length(value: &Value) -> Value {
    Value::Number(value.len() as f64)
}

/// First truthy of the two
pub fn default_value(value: &Value, fallback: &Value) -> Value {
    if value.is_truthy() {
        value.clone()
    } else {
        fallback.clone()
    }
}

/// Join a sequence with a separator, skipping empty entries
pub fn join(value: &Value, separator: Option<&Value>) -> Value {
    let separator = separator
        .filter(|s| !s.is_undefined())
        .map(Value::to_output_string)
        .unwrap_or_else(|| ", ".to_string());
    let out = match value {
        Value::Array(items) => items
            .iter()
            .map(Value::to_output_string)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(&separator),
        other => other.to_output_string(),
    };
    Value::String(out)
}
