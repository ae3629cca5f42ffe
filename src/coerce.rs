//! Value coercion
//!
//! Pure transforms that turn a loosely-typed value into a canonical form.
//! Each transform is addressable by name through [`Filter`], which is how
//! [`crate::Registry::get_with`] pipes resolved values.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{Number, Value};

use crate::error::{Error, Result};
use crate::is;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?[a-zA-Z!][^>]*>").unwrap());
static SCRIPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").unwrap());
static STYLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").unwrap());
static ELEMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<(/?)([a-zA-Z][a-zA-Z0-9]*)([^>]*)>").unwrap());
static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([a-zA-Z_:][a-zA-Z0-9_:.-]*)\s*=\s*("[^"]*"|'[^']*'|[^\s>]+)"#).unwrap()
});
static PATH_UNSAFE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9/._-]").unwrap());

const SAFE_TAGS: &[&str] = &[
    "a", "b", "strong", "i", "em", "u", "p", "br", "ul", "ol", "li", "span", "blockquote",
    "code", "pre", "h1", "h2", "h3", "h4", "h5", "h6",
];
const SAFE_ATTRS: &[&str] = &["href", "title", "target", "rel"];

// =============================================================================
// Transforms
// =============================================================================

/// Render a value as a string; `null` becomes `""`, containers become JSON.
pub fn to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

pub fn to_boolean(value: &Value) -> bool {
    if let Value::String(s) = value {
        match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => return true,
            "false" | "0" | "no" | "off" | "" => return false,
            _ => {}
        }
    }
    is::truthy(value)
}

/// Convert to a number, or `null` when the value has no numeric reading.
pub fn to_number(value: &Value) -> Value {
    match value {
        Value::Number(_) => value.clone(),
        Value::Bool(b) => Value::from(u8::from(*b)),
        Value::String(s) if is::is_integer_str(s) => match s.trim().parse::<i64>() {
            Ok(i) => Value::from(i),
            Err(_) => float_value(s.trim().parse::<f64>().ok()),
        },
        Value::String(s) if is::is_numeric_str(s) => float_value(s.trim().parse::<f64>().ok()),
        _ => Value::Null,
    }
}

/// Convert to a whole number, truncating toward zero.
pub fn to_int(value: &Value) -> Value {
    match to_number(value) {
        Value::Number(n) if n.is_i64() || n.is_u64() => Value::Number(n),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.trunc() >= i64::MIN as f64 && f.trunc() <= i64::MAX as f64 => {
                Value::from(f.trunc() as i64)
            }
            _ => Value::Null,
        },
        _ => Value::Null,
    }
}

/// Produce a string safe to use as a relative file path.
pub fn to_path(value: &Value) -> String {
    let raw = to_string(value).replace('\\', "/");
    let cleaned = PATH_UNSAFE_RE.replace_all(&raw, "");
    cleaned
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
        .collect::<Vec<_>>()
        .join("/")
}

/// Remove every markup tag.
pub fn to_strip_tags(input: &str) -> String {
    let without_blocks = STYLE_RE.replace_all(&SCRIPT_RE.replace_all(input, ""), "").into_owned();
    TAG_RE.replace_all(&without_blocks, "").into_owned()
}

/// Keep a fixed set of harmless tags and attributes, drop everything else.
pub fn to_safe_html(input: &str) -> String {
    let without_blocks = STYLE_RE.replace_all(&SCRIPT_RE.replace_all(input, ""), "").into_owned();
    let kept = ELEMENT_RE.replace_all(&without_blocks, |caps: &Captures| {
        let closing = &caps[1];
        let tag = caps[2].to_ascii_lowercase();
        if !SAFE_TAGS.contains(&tag.as_str()) {
            return String::new();
        }
        if !closing.is_empty() {
            return format!("</{}>", tag);
        }
        let mut out = format!("<{}", tag);
        for attr in ATTR_RE.captures_iter(&caps[3]) {
            let name = attr[1].to_ascii_lowercase();
            if !SAFE_ATTRS.contains(&name.as_str()) {
                continue;
            }
            let raw = attr[2].trim_matches(|c| c == '"' || c == '\'');
            if name == "href" && raw.trim().to_ascii_lowercase().starts_with("javascript:") {
                continue;
            }
            out.push_str(&format!(" {}=\"{}\"", name, raw.replace('"', "&quot;")));
        }
        out.push('>');
        out
    });
    // Anything tag-like that survived (comments, doctype) goes too
    static LEFTOVER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<![^>]*>").unwrap());
    LEFTOVER_RE.replace_all(&kept, "").into_owned()
}

/// Parse a JSON string; non-strings and unparsable strings pass through.
pub fn to_json(value: &Value) -> Value {
    match value {
        Value::String(s) => serde_json::from_str(s).unwrap_or_else(|_| value.clone()),
        other => other.clone(),
    }
}

pub fn to_trim(value: &Value) -> Value {
    map_str(value, |s| s.trim().to_string())
}

pub fn to_lower(value: &Value) -> Value {
    map_str(value, str::to_lowercase)
}

pub fn to_upper(value: &Value) -> Value {
    map_str(value, str::to_uppercase)
}

/// Wrap a non-array in a one-element array; `null` becomes `[]`.
pub fn to_array(value: &Value) -> Value {
    match value {
        Value::Array(_) => value.clone(),
        Value::Null => Value::Array(Vec::new()),
        other => Value::Array(vec![other.clone()]),
    }
}

fn float_value(f: Option<f64>) -> Value {
    f.and_then(Number::from_f64).map(Value::Number).unwrap_or(Value::Null)
}

fn map_str(value: &Value, f: impl FnOnce(&str) -> String) -> Value {
    match value {
        Value::String(s) => Value::String(f(s)),
        other => other.clone(),
    }
}

// =============================================================================
// Named filters
// =============================================================================

/// A named transform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Filter {
    ToString,
    ToBoolean,
    ToNumber,
    ToInt,
    ToPath,
    ToSafeHtml,
    ToStripTags,
    ToTrim,
    ToLower,
    ToUpper,
    ToJson,
    ToArray,
}

impl Filter {
    pub const ALL: [Filter; 12] = [
        Filter::ToString,
        Filter::ToBoolean,
        Filter::ToNumber,
        Filter::ToInt,
        Filter::ToPath,
        Filter::ToSafeHtml,
        Filter::ToStripTags,
        Filter::ToTrim,
        Filter::ToLower,
        Filter::ToUpper,
        Filter::ToJson,
        Filter::ToArray,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Filter::ToString => "toString",
            Filter::ToBoolean => "toBoolean",
            Filter::ToNumber => "toNumber",
            Filter::ToInt => "toInt",
            Filter::ToPath => "toPath",
            Filter::ToSafeHtml => "toSafeHtml",
            Filter::ToStripTags => "toStripTags",
            Filter::ToTrim => "toTrim",
            Filter::ToLower => "toLower",
            Filter::ToUpper => "toUpper",
            Filter::ToJson => "toJson",
            Filter::ToArray => "toArray",
        }
    }

    /// Parse a `|`- or `,`-separated list of filter names
    pub fn parse_list(names: &str) -> Result<Vec<Filter>> {
        names
            .split(['|', ','])
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::parse)
            .collect()
    }

    pub fn apply(&self, value: &Value) -> Value {
        match self {
            Filter::ToString => Value::String(to_string(value)),
            Filter::ToBoolean => Value::Bool(to_boolean(value)),
            Filter::ToNumber => to_number(value),
            Filter::ToInt => to_int(value),
            Filter::ToPath => Value::String(to_path(value)),
            Filter::ToSafeHtml => map_str(value, to_safe_html),
            Filter::ToStripTags => map_str(value, to_strip_tags),
            Filter::ToTrim => to_trim(value),
            Filter::ToLower => to_lower(value),
            Filter::ToUpper => to_upper(value),
            Filter::ToJson => to_json(value),
            Filter::ToArray => to_array(value),
        }
    }
}

impl FromStr for Filter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Filter::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| Error::UnknownFilter(s.to_string()))
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Pipe a value through each filter in order
pub fn apply(filters: &[Filter], value: Value) -> Value {
    filters.iter().fold(value, |acc, filter| filter.apply(&acc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_number() {
        assert_eq!(to_number(&json!("42")), json!(42));
        assert_eq!(to_number(&json!(" 1.5 ")), json!(1.5));
        assert_eq!(to_number(&json!(true)), json!(1));
        assert_eq!(to_number(&json!("abc")), Value::Null);
        assert_eq!(to_number(&json!([1])), Value::Null);
    }

    #[test]
    fn test_to_int_truncates() {
        assert_eq!(to_int(&json!("7.9")), json!(7));
        assert_eq!(to_int(&json!(-2.5)), json!(-2));
        assert_eq!(to_int(&json!("x")), Value::Null);
    }

    #[test]
    fn test_to_boolean() {
        assert!(to_boolean(&json!("Yes")));
        assert!(!to_boolean(&json!("off")));
        assert!(!to_boolean(&json!(0)));
        assert!(to_boolean(&json!({})));
    }

    #[test]
    fn test_to_path() {
        assert_eq!(to_path(&json!("../etc\\pass wd")), "etc/passwd");
        assert_eq!(to_path(&json!("a//b/./c")), "a/b/c");
    }

    #[test]
    fn test_strip_tags() {
        assert_eq!(to_strip_tags("<p>Hi <b>there</b></p>"), "Hi there");
        assert_eq!(to_strip_tags("a<script>alert(1)</script>b"), "ab");
    }

    #[test]
    fn test_safe_html() {
        let html = r#"<p onclick="x()">Hi <a href="javascript:alert(1)" title='t'>x</a><img src=y></p>"#;
        assert_eq!(to_safe_html(html), r#"<p>Hi <a title="t">x</a></p>"#);
        assert_eq!(to_safe_html("<style>p{}</style><em>ok</em>"), "<em>ok</em>");
    }

    #[test]
    fn test_filter_names() {
        let filters = Filter::parse_list("toTrim|toInt").unwrap();
        assert_eq!(filters, vec![Filter::ToTrim, Filter::ToInt]);
        assert_eq!(apply(&filters, json!(" 12 ")), json!(12));
        assert!(matches!("toNothing".parse::<Filter>(), Err(Error::UnknownFilter(_))));
    }
}
