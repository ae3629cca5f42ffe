//! Type predicates over JSON values

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The kind of a JSON value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Null,
    Boolean,
    Number,
    String,
    Array,
    Object,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Boolean => "boolean",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
        }
    }

    /// Whether values of this kind can hold children
    pub fn is_container(&self) -> bool {
        matches!(self, ValueKind::Array | ValueKind::Object)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a value
pub fn kind_of(value: &Value) -> ValueKind {
    match value {
        Value::Null => ValueKind::Null,
        Value::Bool(_) => ValueKind::Boolean,
        Value::Number(_) => ValueKind::Number,
        Value::String(_) => ValueKind::String,
        Value::Array(_) => ValueKind::Array,
        Value::Object(_) => ValueKind::Object,
    }
}

pub fn is_string(value: &Value) -> bool {
    value.is_string()
}

pub fn is_number(value: &Value) -> bool {
    value.is_number()
}

/// A number with no fractional part (`1.0` counts)
pub fn is_integer(value: &Value) -> bool {
    match value {
        Value::Number(n) => {
            n.is_i64() || n.is_u64() || n.as_f64().map(|f| f.fract() == 0.0).unwrap_or(false)
        }
        _ => false,
    }
}

pub fn is_unsigned(value: &Value) -> bool {
    value.as_f64().map(|f| f >= 0.0).unwrap_or(false)
}

pub fn is_boolean(value: &Value) -> bool {
    value.is_boolean()
}

pub fn is_null(value: &Value) -> bool {
    value.is_null()
}

pub fn is_array(value: &Value) -> bool {
    value.is_array()
}

pub fn is_object(value: &Value) -> bool {
    value.is_object()
}

/// A mapping or a sequence
pub fn is_container(value: &Value) -> bool {
    kind_of(value).is_container()
}

/// Anything that is not a container
pub fn is_flat(value: &Value) -> bool {
    !is_container(value)
}

/// `null`, `""`, `[]` and `{}`
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

/// Loose truthiness: `null`, `false`, `0` and `""` are falsy, everything
/// else (including empty containers) is truthy.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Deep equality that treats numbers by value, so `1` equals `1.0`
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x == y || x.as_f64() == y.as_f64(),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| loose_eq(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter().all(|(key, a)| y.get(key).map(|b| loose_eq(a, b)).unwrap_or(false))
        }
        _ => a == b,
    }
}

/// A string holding a finite decimal number
pub fn is_numeric_str(s: &str) -> bool {
    let s = s.trim();
    !s.is_empty()
        && s.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
        && s.parse::<f64>().map(|f| f.is_finite()).unwrap_or(false)
}

/// A string holding a whole number, optionally signed
pub fn is_integer_str(s: &str) -> bool {
    let digits = s.trim().strip_prefix(['-', '+']).unwrap_or(s.trim());
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

/// A string that parses as JSON
pub fn is_json_str(s: &str) -> bool {
    serde_json::from_str::<Value>(s).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_of() {
        assert_eq!(kind_of(&json!(null)), ValueKind::Null);
        assert_eq!(kind_of(&json!([1])), ValueKind::Array);
        assert_eq!(kind_of(&json!({"a": 1})), ValueKind::Object);
        assert_eq!(ValueKind::Boolean.to_string(), "boolean");
    }

    #[test]
    fn test_integer_detection() {
        assert!(is_integer(&json!(3)));
        assert!(is_integer(&json!(3.0)));
        assert!(!is_integer(&json!(3.5)));
        assert!(!is_integer(&json!("3")));
    }

    #[test]
    fn test_truthiness() {
        assert!(!truthy(&json!(0)));
        assert!(!truthy(&json!("")));
        assert!(!truthy(&json!(null)));
        assert!(truthy(&json!([])));
        assert!(truthy(&json!("0")));
    }

    #[test]
    fn test_string_predicates() {
        assert!(is_numeric_str(" 1.5e3 "));
        assert!(!is_numeric_str("1.5x"));
        assert!(!is_numeric_str("inf"));
        assert!(is_integer_str("-42"));
        assert!(!is_integer_str("4.2"));
        assert!(!is_integer_str("-"));
        assert!(is_json_str(r#"{"a": [1]}"#));
        assert!(!is_json_str("{a}"));
    }

    #[test]
    fn test_loose_equality() {
        assert!(loose_eq(&json!(1), &json!(1.0)));
        assert!(loose_eq(&json!([1, {"a": 2.0}]), &json!([1.0, {"a": 2}])));
        assert!(!loose_eq(&json!({"a": 1}), &json!({"a": 1, "b": 1})));
        assert!(!loose_eq(&json!(1), &json!("1")));
        assert!(!loose_eq(&json!(1), &json!(1.5)));
    }

    #[test]
    fn test_emptiness() {
        assert!(is_empty(&json!({})));
        assert!(is_empty(&json!("")));
        assert!(!is_empty(&json!(0)));
    }
}
