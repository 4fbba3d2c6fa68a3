//! Runtime values seen by templates and helpers

use indexmap::IndexMap;

/// A value in the data context or produced by a helper
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    /// Missing field, broken path, or a helper with nothing to say
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(IndexMap<String, Value>),
}

impl Value {
    /// Convert to string for output
    pub fn to_output_string(&self) -> String {
        match self {
            Value::Undefined | Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.clone(),
            Value::Array(arr) => arr
                .iter()
                .map(|v| v.to_output_string())
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) => "[object Object]".to_string(),
        }
    }

    /// Check if the value is truthy
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Array(arr) => !arr.is_empty(),
            Value::Object(_) => true,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Numeric coercion: numbers pass through, numeric strings parse,
    /// booleans become 0/1, everything else is 0
    pub fn as_number(&self) -> f64 {
        self.to_number().unwrap_or(0.0)
    }

    /// Numeric view of the value, if it has one
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) if n.is_finite() => Some(*n),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::String(s) => {
                let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
                cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
            }
            _ => None,
        }
    }

    /// Get a property from an object, or an index from an array
    pub fn get_property(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(obj) => obj.get(key),
            Value::Array(arr) => key.parse::<usize>().ok().and_then(|idx| arr.get(idx)),
            _ => None,
        }
    }

    /// Follow a dotted path; any missing segment yields `Undefined`
    pub fn lookup(&self, path: &str) -> Value {
        let mut current = self;
        for part in path.split('.').filter(|p| !p.is_empty()) {
            if part == "length" {
                if let Value::Array(_) | Value::String(_) = current {
                    return Value::Number(current.len() as f64);
                }
            }
            match current.get_property(part) {
                Some(next) => current = next,
                None => return Value::Undefined,
            }
        }
        current.clone()
    }

    /// Get length of a sequence, string (in characters) or object
    pub fn len(&self) -> usize {
        match self {
            Value::Array(arr) => arr.len(),
            Value::String(s) => s.chars().count(),
            Value::Object(obj) => obj.len(),
            _ => 0,
        }
    }

    /// Check if value is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Convert from serde_json::Value
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(0.0)),
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(arr) => Value::Array(arr.iter().map(Value::from_json).collect()),
            serde_json::Value::Object(obj) => {
                let mut map = IndexMap::new();
                for (k, v) in obj {
                    map.insert(k.clone(), Value::from_json(v));
                }
                Value::Object(map)
            }
        }
    }

    /// Loose equality: numbers compare numerically, anything else by its output text
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => (a - b).abs() < f64::EPSILON,
            (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
                match (self.to_number(), other.to_number()) {
                    (Some(a), Some(b)) => (a - b).abs() < f64::EPSILON,
                    _ => false,
                }
            }
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
            }
            (Value::Object(_), _) | (_, Value::Object(_)) => false,
            _ => self.to_output_string() == other.to_output_string(),
        }
    }
}

/// Integers print without a fractional part
fn format_number(n: f64) -> String {
    if n.is_nan() || n.is_infinite() {
        return String::new();
    }
    if n.fract() == 0.0 && n.abs() < 1e15 {
        (n as i64).to_string()
    } else {
        n.to_string()
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<&serde_json::Value> for Value {
    fn from(json: &serde_json::Value) -> Self {
        Value::from_json(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_missing_segments() {
        let value = Value::from_json(&json!({"case": {"number": "24-CV-001"}}));
        assert_eq!(value.lookup("case.number"), Value::from("24-CV-001"));
        assert_eq!(value.lookup("case.court.name"), Value::Undefined);
        assert_eq!(value.lookup("nothing.here"), Value::Undefined);
    }

    #[test]
    fn test_lookup_array_index_and_length() {
        let value = Value::from_json(&json!({"attempts": [{"status": "served"}]}));
        assert_eq!(value.lookup("attempts.0.status"), Value::from("served"));
        assert_eq!(value.lookup("attempts.length"), Value::Number(1.0));
    }

    #[test]
    fn test_number_output() {
        assert_eq!(Value::Number(3.0).to_output_string(), "3");
        assert_eq!(Value::Number(2.5).to_output_string(), "2.5");
        assert_eq!(Value::Undefined.to_output_string(), "");
    }

    #[test]
    fn test_coercion() {
        assert_eq!(Value::from("1,234.5").as_number(), 1234.5);
        assert_eq!(Value::from("abc").as_number(), 0.0);
        assert_eq!(Value::Undefined.as_number(), 0.0);
        assert_eq!(Value::Bool(true).as_number(), 1.0);
    }

    #[test]
    fn test_loose_eq() {
        assert!(Value::from("5").loose_eq(&Value::Number(5.0)));
        assert!(Value::from("served").loose_eq(&Value::from("served")));
        assert!(!Value::from("served").loose_eq(&Value::from("not_served")));
        assert!(Value::Undefined.loose_eq(&Value::from("")));
    }
}
