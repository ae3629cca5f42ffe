//! Declarative Schemas
//!
//! A [`Schema`] is a tree of nodes, one per expected shape. Nodes are built
//! once with the fluent builder and reused across many checks:
//!
//! ```
//! use datakit::Schema;
//! use serde_json::json;
//!
//! let schema = Schema::object([
//!     ("name", Schema::string().min_length(1)),
//!     ("age", Schema::string().format_named("unsignedInteger").unwrap()),
//! ]);
//!
//! let mut user = json!({"name": "Ada", "age": "36"});
//! assert!(schema.check(&mut user).is_valid());
//! assert_eq!(user["age"], json!(36));
//! ```
//!
//! ## In-place contract
//!
//! [`Schema::check`] takes `&mut Value` and writes three things back into
//! it on the way through: coerced primitives (only when that node passed),
//! defaults for absent properties, and the removal of unknown properties in
//! whitelist mode. [`Schema::validate`] is the owned alternative that hands
//! the processed value back instead.

pub mod definition;
pub mod errors;
pub mod format;
pub mod model;
pub mod project;

pub use errors::{ErrorCode, ErrorTree, Issue, Report};
pub use format::{Format, HtmlMode, PasswordPolicy};
pub use model::{Fields, Model, ModelRegistry};

use serde_json::{json, Value};
use tracing::{trace, warn};

use crate::error::Result;
use crate::is;
use crate::path::Step;

// =============================================================================
// Node types
// =============================================================================

/// Settings shared by every node kind
#[derive(Debug, Clone)]
pub struct Meta {
    pub optional: bool,
    pub nullable: bool,
    /// Values accepted without any further check
    pub allow: Vec<Value>,
    pub description: Option<String>,
    pub example: Option<Value>,
    /// Inserted when the property is absent from its parent object
    pub default: Option<Value>,
    /// When false the node accepts anything; it still projects
    pub enabled: bool,
}

impl Default for Meta {
    fn default() -> Self {
        Self {
            optional: false,
            nullable: false,
            allow: Vec::new(),
            description: None,
            example: None,
            default: None,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StringRules {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub format: Option<Format>,
    pub html: HtmlMode,
    pub password: Option<PasswordPolicy>,
}

#[derive(Debug, Clone, Default)]
pub struct NumberRules {
    pub integer: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct ObjectRules {
    pub properties: Vec<(String, Schema)>,
    /// Strip unknown properties instead of reporting them
    pub whitelist: bool,
}

impl ObjectRules {
    pub fn property(&self, name: &str) -> Option<&Schema> {
        self.properties
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, schema)| schema)
    }
}

/// What array elements are checked against
#[derive(Debug, Clone, Default)]
pub enum Items {
    #[default]
    Any,
    Each(Box<Schema>),
    Tuple(Vec<Schema>),
}

#[derive(Debug, Clone, Default)]
pub struct ArrayRules {
    pub items: Items,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub unique: bool,
    /// Drop elements past the end of a tuple instead of reporting them
    pub whitelist: bool,
}

/// The closed set of node kinds
#[derive(Debug, Clone)]
pub enum SchemaKind {
    String(StringRules),
    Number(NumberRules),
    Boolean,
    Enum(Vec<Value>),
    Object(ObjectRules),
    Array(ArrayRules),
    /// An object whose properties come from a registered model
    Model { name: String, object: ObjectRules },
}

impl SchemaKind {
    pub fn name(&self) -> &'static str {
        match self {
            SchemaKind::String(_) => "string",
            SchemaKind::Number(_) => "number",
            SchemaKind::Boolean => "boolean",
            SchemaKind::Enum(_) => "enum",
            SchemaKind::Object(_) => "object",
            SchemaKind::Array(_) => "array",
            SchemaKind::Model { .. } => "model",
        }
    }
}

/// One node of a schema tree
#[derive(Debug, Clone)]
pub struct Schema {
    meta: Meta,
    kind: SchemaKind,
}

// =============================================================================
// Builders
// =============================================================================

impl Schema {
    pub fn new(kind: SchemaKind) -> Self {
        Self {
            meta: Meta::default(),
            kind,
        }
    }

    pub fn string() -> Self {
        Self::new(SchemaKind::String(StringRules::default()))
    }

    pub fn number() -> Self {
        Self::new(SchemaKind::Number(NumberRules::default()))
    }

    pub fn boolean() -> Self {
        Self::new(SchemaKind::Boolean)
    }

    pub fn enumeration<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::new(SchemaKind::Enum(values.into_iter().map(Into::into).collect()))
    }

    pub fn object<I, K>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, Schema)>,
        K: Into<String>,
    {
        Self::new(SchemaKind::Object(ObjectRules {
            properties: properties.into_iter().map(|(k, s)| (k.into(), s)).collect(),
            whitelist: false,
        }))
    }

    /// An array whose every element matches `item`
    pub fn array(item: Schema) -> Self {
        Self::new(SchemaKind::Array(ArrayRules {
            items: Items::Each(Box::new(item)),
            ..ArrayRules::default()
        }))
    }

    /// A fixed-length array checked position by position
    pub fn tuple(items: impl IntoIterator<Item = Schema>) -> Self {
        Self::new(SchemaKind::Array(ArrayRules {
            items: Items::Tuple(items.into_iter().collect()),
            ..ArrayRules::default()
        }))
    }

    /// An array with unchecked elements
    pub fn any_array() -> Self {
        Self::new(SchemaKind::Array(ArrayRules::default()))
    }

    /// An object shaped by the model `M`
    pub fn model<M: Model>() -> Self {
        Self::new(SchemaKind::Model {
            name: M::NAME.to_string(),
            object: ObjectRules {
                properties: model::fields_of::<M>().into_vec(),
                whitelist: false,
            },
        })
    }

    /// An object shaped by a model registered at runtime
    pub fn class_ref(models: &ModelRegistry, name: &str) -> Result<Self> {
        models.schema(name)
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn kind(&self) -> &SchemaKind {
        &self.kind
    }

    // -------------------------------------------------------------------------
    // Common settings
    // -------------------------------------------------------------------------

    pub fn optional(mut self) -> Self {
        self.meta.optional = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.meta.optional = false;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.meta.nullable = true;
        self
    }

    /// Accept these values unconditionally
    pub fn allow<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.meta.allow.extend(values.into_iter().map(Into::into));
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.meta.description = Some(text.into());
        self
    }

    pub fn example(mut self, value: impl Into<Value>) -> Self {
        self.meta.example = Some(value.into());
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.meta.default = Some(value.into());
        self
    }

    /// Turn checking on or off for this node
    pub fn validate_enabled(mut self, enabled: bool) -> Self {
        self.meta.enabled = enabled;
        self
    }

    // -------------------------------------------------------------------------
    // Kind-specific settings
    // -------------------------------------------------------------------------

    pub fn min_length(mut self, n: usize) -> Self {
        match &mut self.kind {
            SchemaKind::String(rules) => rules.min_length = Some(n),
            SchemaKind::Array(rules) => rules.min_length = Some(n),
            other => ignored("min_length", other),
        }
        self
    }

    pub fn max_length(mut self, n: usize) -> Self {
        match &mut self.kind {
            SchemaKind::String(rules) => rules.max_length = Some(n),
            SchemaKind::Array(rules) => rules.max_length = Some(n),
            other => ignored("max_length", other),
        }
        self
    }

    pub fn format(mut self, format: Format) -> Self {
        match &mut self.kind {
            SchemaKind::String(rules) => rules.format = Some(format),
            other => ignored("format", other),
        }
        self
    }

    /// Set a format by name, e.g. `"email"` or `"unsignedInteger"`
    pub fn format_named(self, name: &str) -> Result<Self> {
        Ok(self.format(name.parse()?))
    }

    /// Require a match against a custom regular expression
    pub fn pattern(self, pattern: &str) -> Result<Self> {
        Ok(self.format(Format::pattern(pattern)?))
    }

    pub fn html(mut self, mode: HtmlMode) -> Self {
        match &mut self.kind {
            SchemaKind::String(rules) => rules.html = mode,
            other => ignored("html", other),
        }
        self
    }

    pub fn strong_password(self) -> Self {
        self.password_policy(PasswordPolicy::default())
    }

    pub fn password_policy(mut self, policy: PasswordPolicy) -> Self {
        match &mut self.kind {
            SchemaKind::String(rules) => rules.password = Some(policy),
            other => ignored("password_policy", other),
        }
        self
    }

    pub fn integer(mut self) -> Self {
        match &mut self.kind {
            SchemaKind::Number(rules) => rules.integer = true,
            other => ignored("integer", other),
        }
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        match &mut self.kind {
            SchemaKind::Number(rules) => rules.min = Some(min),
            other => ignored("min", other),
        }
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        match &mut self.kind {
            SchemaKind::Number(rules) => rules.max = Some(max),
            other => ignored("max", other),
        }
        self
    }

    pub fn unique(mut self) -> Self {
        match &mut self.kind {
            SchemaKind::Array(rules) => rules.unique = true,
            other => ignored("unique", other),
        }
        self
    }

    /// Strip unknown object properties (or surplus tuple elements) instead
    /// of reporting them
    pub fn white_list(mut self) -> Self {
        match &mut self.kind {
            SchemaKind::Object(rules) | SchemaKind::Model { object: rules, .. } => {
                rules.whitelist = true
            }
            SchemaKind::Array(rules) => rules.whitelist = true,
            other => ignored("white_list", other),
        }
        self
    }
}

fn ignored(setting: &str, kind: &SchemaKind) {
    warn!(setting, kind = kind.name(), "schema setting does not apply to this kind");
}

// =============================================================================
// Checking
// =============================================================================

impl Schema {
    /// Check `value` in place. See the module docs for what gets written back.
    pub fn check(&self, value: &mut Value) -> Report {
        let mut errors = ErrorTree::default();
        self.check_value(value, &mut errors);
        trace!(kind = self.kind.name(), valid = errors.is_empty(), "schema check");
        Report::new(errors)
    }

    /// Check an absent value
    pub fn check_missing(&self) -> Report {
        let mut errors = ErrorTree::default();
        if self.meta.enabled && !self.meta.optional && self.meta.default.is_none() {
            errors.push(Issue::new(ErrorCode::Required));
        }
        Report::new(errors)
    }

    /// Owned check: the processed value on success, the report on failure
    pub fn validate(&self, mut value: Value) -> std::result::Result<Value, Report> {
        let report = self.check(&mut value);
        if report.is_valid() {
            Ok(value)
        } else {
            Err(report)
        }
    }

    pub fn is_valid(&self, value: &Value) -> bool {
        self.validate(value.clone()).is_ok()
    }

    fn check_value(&self, value: &mut Value, errors: &mut ErrorTree) {
        if !self.meta.enabled {
            return;
        }
        if value.is_null() && self.meta.nullable {
            return;
        }
        if self.meta.allow.iter().any(|allowed| is::loose_eq(allowed, value)) {
            return;
        }

        match &self.kind {
            SchemaKind::String(rules) => {
                let mut issues = Vec::new();
                let coerced = rules.check(value, &mut issues);
                if issues.is_empty() {
                    if let Some(coerced) = coerced {
                        *value = coerced;
                    }
                }
                errors.extend(issues);
            }
            SchemaKind::Number(rules) => errors.extend(rules.check(value)),
            SchemaKind::Boolean => {
                if !value.is_boolean() {
                    errors.push(Issue::new(ErrorCode::NotABoolean));
                }
            }
            SchemaKind::Enum(allowed) => {
                if !allowed.iter().any(|candidate| is::loose_eq(candidate, value)) {
                    errors.push(Issue::with_meta(
                        ErrorCode::NotInEnum,
                        json!({ "allowed": allowed }),
                    ));
                }
            }
            SchemaKind::Object(rules) | SchemaKind::Model { object: rules, .. } => {
                rules.check(value, errors)
            }
            SchemaKind::Array(rules) => rules.check(value, errors),
        }
    }
}

impl StringRules {
    /// Returns the replacement value when the string was transformed
    fn check(&self, value: &Value, issues: &mut Vec<Issue>) -> Option<Value> {
        let Value::String(raw) = value else {
            // A coercing format accepts its own output on a re-check
            let native = self.format.as_ref().map(|f| f.accepts_native(value)).unwrap_or(false);
            if !native {
                issues.push(Issue::new(ErrorCode::NotAString));
            }
            return None;
        };

        let mut text = raw.clone();
        match &self.format {
            Some(format) => {
                if !format.matches(&text) {
                    issues.push(Issue::with_meta(
                        ErrorCode::InvalidFormat,
                        json!({ "format": format.to_string() }),
                    ));
                }
                if matches!(format, Format::Trim) {
                    text = text.trim().to_string();
                }
            }
            None if self.password.is_none() => text = self.html.apply(&text),
            None => {}
        }

        if let Some(policy) = &self.password {
            if !policy.accepts(&text) {
                issues.push(Issue::with_meta(ErrorCode::WeakPassword, policy.meta()));
            }
        }

        let length = text.chars().count();
        if let Some(min) = self.min_length {
            if length < min {
                issues.push(Issue::with_meta(ErrorCode::MinLength, json!({ "min": min })));
            }
        }
        if let Some(max) = self.max_length {
            if length > max {
                issues.push(Issue::with_meta(ErrorCode::MaxLength, json!({ "max": max })));
            }
        }

        if !issues.is_empty() {
            return None;
        }
        if let Some(coerced) = self.format.as_ref().and_then(|f| f.coerce(&text)) {
            return Some(coerced);
        }
        (text != *raw).then_some(Value::String(text))
    }
}

impl NumberRules {
    fn check(&self, value: &Value) -> Vec<Issue> {
        let Some(n) = value.as_f64() else {
            return vec![Issue::new(ErrorCode::NotANumber)];
        };

        let mut issues = Vec::new();
        if self.integer && !is::is_integer(value) {
            issues.push(Issue::new(ErrorCode::NotAnInteger));
        }
        if let Some(min) = self.min {
            if n < min {
                issues.push(Issue::with_meta(ErrorCode::Min, json!({ "min": min })));
            }
        }
        if let Some(max) = self.max {
            if n > max {
                issues.push(Issue::with_meta(ErrorCode::Max, json!({ "max": max })));
            }
        }
        issues
    }
}

impl ObjectRules {
    fn check(&self, value: &mut Value, errors: &mut ErrorTree) {
        let Value::Object(map) = value else {
            errors.push(Issue::new(ErrorCode::NotAnObject));
            return;
        };

        let unknown: Vec<String> = map
            .keys()
            .filter(|key| self.property(key).is_none())
            .cloned()
            .collect();
        for key in unknown {
            if self.whitelist {
                map.remove(&key);
            } else {
                errors.push_at(Step::Key(key), Issue::new(ErrorCode::NotAllowed));
            }
        }

        for (key, schema) in &self.properties {
            match map.get_mut(key) {
                Some(child) => {
                    let mut child_errors = ErrorTree::default();
                    schema.check_value(child, &mut child_errors);
                    errors.attach(Step::Key(key.clone()), child_errors);
                }
                None => match &schema.meta.default {
                    Some(default) => {
                        map.insert(key.clone(), default.clone());
                    }
                    None => errors.attach(Step::Key(key.clone()), schema.check_missing().tree().clone()),
                },
            }
        }
    }
}

impl ArrayRules {
    fn check(&self, value: &mut Value, errors: &mut ErrorTree) {
        let Value::Array(items) = value else {
            errors.push(Issue::new(ErrorCode::NotAnArray));
            return;
        };

        if let Items::Tuple(schemas) = &self.items {
            if self.whitelist && items.len() > schemas.len() {
                items.truncate(schemas.len());
            }
        }

        if self.unique {
            let duplicates: Vec<usize> = (1..items.len())
                .filter(|&j| items[..j].iter().any(|earlier| is::loose_eq(earlier, &items[j])))
                .collect();
            if !duplicates.is_empty() {
                errors.push(Issue::with_meta(
                    ErrorCode::NotUnique,
                    json!({ "duplicates": duplicates }),
                ));
            }
        }
        if let Some(min) = self.min_length {
            if items.len() < min {
                errors.push(Issue::with_meta(ErrorCode::MinLength, json!({ "min": min })));
            }
        }
        if let Some(max) = self.max_length {
            if items.len() > max {
                errors.push(Issue::with_meta(ErrorCode::MaxLength, json!({ "max": max })));
            }
        }

        match &self.items {
            Items::Any => {}
            Items::Each(schema) => {
                for (i, item) in items.iter_mut().enumerate() {
                    let mut child_errors = ErrorTree::default();
                    schema.check_value(item, &mut child_errors);
                    errors.attach(Step::Index(i), child_errors);
                }
            }
            Items::Tuple(schemas) => {
                if items.len() != schemas.len() {
                    errors.push(Issue::with_meta(
                        ErrorCode::InvalidTupleLength,
                        json!({ "expected": schemas.len(), "actual": items.len() }),
                    ));
                }
                for (i, (item, schema)) in items.iter_mut().zip(schemas).enumerate() {
                    let mut child_errors = ErrorTree::default();
                    schema.check_value(item, &mut child_errors);
                    errors.attach(Step::Index(i), child_errors);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_constraints_are_independent() {
        let schema = Schema::number().integer().min(3.0);
        let report = schema.check(&mut json!(2));
        assert!(!report.is_valid());
        assert_eq!(report.codes_at(""), vec![ErrorCode::Min]);

        let report = schema.check(&mut json!(2.5));
        assert_eq!(report.codes_at(""), vec![ErrorCode::NotAnInteger, ErrorCode::Min]);

        let report = schema.check(&mut json!("2"));
        assert_eq!(report.codes_at(""), vec![ErrorCode::NotANumber]);
    }

    #[test]
    fn test_object_reports_every_property() {
        let schema = Schema::object([("a", Schema::number()), ("b", Schema::string())]);
        let report = schema.check(&mut json!({"a": "x", "b": 1}));
        assert_eq!(report.len(), 2);
        assert!(report.has("a", ErrorCode::NotANumber));
        assert!(report.has("b", ErrorCode::NotAString));
    }

    #[test]
    fn test_unknown_and_missing_properties() {
        let schema = Schema::object([("foo", Schema::number()), ("opt", Schema::string().optional())]);
        let report = schema.check(&mut json!({"bar": 2}));
        assert!(report.has("bar", ErrorCode::NotAllowed));
        assert!(report.has("foo", ErrorCode::Required));
        assert!(report.codes_at("opt").is_empty());
    }

    #[test]
    fn test_whitelist_strips_unknown_properties() {
        let schema = Schema::object([("foo", Schema::number())]).white_list();
        let mut value = json!({"foo": 1, "bar": 2});
        assert!(schema.check(&mut value).is_valid());
        assert_eq!(value, json!({"foo": 1}));
    }

    #[test]
    fn test_defaults_fill_absent_properties() {
        let schema = Schema::object([("role", Schema::string().default_value("member"))]);
        let mut value = json!({});
        assert!(schema.check(&mut value).is_valid());
        assert_eq!(value, json!({"role": "member"}));
    }

    #[test]
    fn test_allow_list_bypasses_type() {
        let schema = Schema::string().allow([Value::Null]);
        assert!(schema.check(&mut Value::Null).is_valid());
        assert!(!Schema::string().check(&mut Value::Null).is_valid());
        assert!(Schema::number().allow(["n/a"]).is_valid(&json!("n/a")));
    }

    #[test]
    fn test_nullable_is_independent_of_optional() {
        let optional = Schema::string().optional();
        assert!(!optional.is_valid(&Value::Null));
        assert!(optional.check_missing().is_valid());

        let nullable = Schema::string().nullable();
        assert!(nullable.is_valid(&Value::Null));
        assert!(!nullable.check_missing().is_valid());
    }

    #[test]
    fn test_disabled_validation_accepts_anything() {
        let schema = Schema::number().min(10.0).validate_enabled(false);
        let mut value = json!("text");
        assert!(schema.check(&mut value).is_valid());
        assert_eq!(value, json!("text"));
    }

    #[test]
    fn test_string_format_coerces_on_success() {
        let schema = Schema::string().format(Format::Boolean);
        let mut value = json!("true");
        assert!(schema.check(&mut value).is_valid());
        assert_eq!(value, json!(true));
        assert_eq!(schema.validate(json!("0")), Ok(json!(false)));
    }

    #[test]
    fn test_failed_string_is_not_coerced() {
        let schema = Schema::string().format(Format::Integer).max_length(2);
        let mut value = json!("1234");
        let report = schema.check(&mut value);
        assert!(report.has("", ErrorCode::MaxLength));
        assert_eq!(value, json!("1234"));
    }

    #[test]
    fn test_html_and_trim_transforms() {
        let stripped = Schema::string().html(HtmlMode::Strip).max_length(5);
        assert_eq!(stripped.validate(json!("<b>hello</b>")), Ok(json!("hello")));

        let trimmed = Schema::string().format(Format::Trim).min_length(2);
        assert_eq!(trimmed.validate(json!("  ab  ")), Ok(json!("ab")));
        assert!(!trimmed.is_valid(&json!("  a ")));
    }

    #[test]
    fn test_strong_password_reports_thresholds() {
        let schema = Schema::string().strong_password();
        let report = schema.check(&mut json!("password"));
        let issues = report.errors();
        let issue = &issues[""][0];
        assert_eq!(issue.code, ErrorCode::WeakPassword);
        assert_eq!(issue.meta.as_ref().unwrap()["minLength"], json!(8));
        assert!(schema.is_valid(&json!("Corr3ct-Horse")));
    }

    #[test]
    fn test_enum_membership() {
        let schema = Schema::enumeration(["a", "b"]);
        assert!(schema.is_valid(&json!("a")));
        let report = schema.check(&mut json!("c"));
        assert!(report.has("", ErrorCode::NotInEnum));
    }

    #[test]
    fn test_array_unique_and_lengths() {
        let schema = Schema::array(Schema::number()).unique().min_length(4);
        let report = schema.check(&mut json!([1, 1, 2]));
        assert_eq!(report.codes_at(""), vec![ErrorCode::NotUnique, ErrorCode::MinLength]);
        assert!(!Schema::array(Schema::number()).is_valid(&json!({"0": 1})));
    }

    #[test]
    fn test_array_elements_coerce_in_place() {
        let schema = Schema::array(Schema::string().format(Format::Integer));
        let mut value = json!(["1", "x", "3"]);
        let report = schema.check(&mut value);
        assert!(report.has("[1]", ErrorCode::InvalidFormat));
        assert_eq!(value, json!([1, "x", 3]));
    }

    #[test]
    fn test_tuple_positions() {
        let schema = Schema::tuple([Schema::string(), Schema::number()]);
        assert!(schema.is_valid(&json!(["a", 1])));

        let report = schema.check(&mut json!([1, 1, true]));
        assert!(report.has("", ErrorCode::InvalidTupleLength));
        assert!(report.has("[0]", ErrorCode::NotAString));

        let mut value = json!(["a", 1, "extra"]);
        assert!(schema.clone().white_list().check(&mut value).is_valid());
        assert_eq!(value, json!(["a", 1]));
    }

    #[test]
    fn test_nested_error_paths() {
        let schema = Schema::object([(
            "bar",
            Schema::object([(
                "arrayObject",
                Schema::array(Schema::object([(
                    "object",
                    Schema::object([("array", Schema::array(Schema::array(Schema::number().integer())))]),
                )])),
            )]),
        )]);
        let mut value = json!({"bar": {"arrayObject": [{"object": {"array": [[1], [1.5]]}}]}});
        let report = schema.check(&mut value);
        assert_eq!(
            report.codes_at("bar.arrayObject[0].object.array[1][0]"),
            vec![ErrorCode::NotAnInteger]
        );
        assert_eq!(report.len(), 1);
    }

    #[test]
    fn test_check_is_idempotent_after_coercion() {
        let schema = Schema::object([
            ("n", Schema::string().format(Format::Number)),
            ("count", Schema::string().format(Format::UnsignedInteger)),
            ("flag", Schema::string().format(Format::Boolean)),
        ]);
        let mut value = json!({"n": "4.5", "count": "12", "flag": "1"});
        assert!(schema.check(&mut value).is_valid());
        assert_eq!(value, json!({"n": 4.5, "count": 12, "flag": true}));

        let snapshot = value.clone();
        assert!(schema.check(&mut value).is_valid());
        assert_eq!(value, snapshot);
    }

    #[test]
    fn test_native_values_must_fit_the_format() {
        let unsigned = Schema::string().format(Format::UnsignedInteger);
        assert!(unsigned.is_valid(&json!(3)));
        assert!(unsigned.check(&mut json!(-3)).has("", ErrorCode::NotAString));
        assert!(unsigned.check(&mut json!(3.5)).has("", ErrorCode::NotAString));
        assert!(!Schema::string().format(Format::Boolean).is_valid(&json!(1)));
        assert!(!Schema::string().format(Format::Email).is_valid(&json!(1)));
        assert!(!Schema::string().is_valid(&json!(1)));
    }

    #[test]
    fn test_numbers_compare_by_value() {
        assert!(Schema::enumeration([1]).is_valid(&json!(1.0)));
        assert!(Schema::string().allow([2]).is_valid(&json!(2.0)));

        let report = Schema::array(Schema::number()).unique().check(&mut json!([1, 1.0]));
        assert!(report.has("", ErrorCode::NotUnique));
        let nested = Schema::any_array().unique().check(&mut json!([{"a": [1]}, {"a": [1.0]}]));
        assert!(nested.has("", ErrorCode::NotUnique));
    }
}
