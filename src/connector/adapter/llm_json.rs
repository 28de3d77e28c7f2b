use serde_json::Value;

/// Parses the first `{...}` block of a model answer, ignoring any prose or
/// code fences around it.
pub(crate) fn first_object(text: &str) -> Option<serde_json::Map<String, Value>> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// A non-empty string, accepting numbers too. `null`, `""` and the literal
/// string "null" count as absent.
pub(crate) fn text_field(map: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty() && !s.eq_ignore_ascii_case("null")).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// An integer given either as a JSON number or as digits in a string
/// (`"#256"` reads as 256).
pub(crate) fn int_field(map: &serde_json::Map<String, Value>, key: &str) -> Option<i64> {
    int_value(map.get(key)?)
}

pub(crate) fn int_list(map: &serde_json::Map<String, Value>, key: &str) -> Vec<i64> {
    match map.get(key) {
        Some(Value::Array(items)) => items.iter().filter_map(int_value).collect(),
        Some(other) => int_value(other).into_iter().collect(),
        None => Vec::new(),
    }
}

pub(crate) fn bool_field(map: &serde_json::Map<String, Value>, key: &str) -> bool {
    match map.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("yes"),
        _ => false,
    }
}

fn int_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => {
            let digits: String = s.chars().filter(char::is_ascii_digit).collect();
            digits.parse().ok()
        }
        _ => None,
    }
}
