//! Schema projection
//!
//! Pure descriptions of a schema tree: [`Schema::build_schema`] emits a
//! JSON Schema (draft-07) document and [`Schema::build_swagger`] an
//! OpenAPI 3.0 schema object. Checking semantics that have no counterpart
//! in either vocabulary (coercion, HTML handling) are not represented.

use serde_json::{json, Map, Value};

use super::format::{MD5_PATTERN, MONGO_ID_PATTERN, SHA1_PATTERN, SHA256_PATTERN};
use super::{ArrayRules, Format, Items, NumberRules, ObjectRules, Schema, SchemaKind, StringRules};

pub const DRAFT_07: &str = "http://json-schema.org/draft-07/schema#";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dialect {
    JsonSchema,
    OpenApi,
}

impl Schema {
    /// JSON Schema (draft-07) for this node and its children
    pub fn build_schema(&self) -> Value {
        let mut root = Map::new();
        root.insert("$schema".into(), json!(DRAFT_07));
        if let Value::Object(node) = self.project(Dialect::JsonSchema) {
            root.extend(node);
        }
        Value::Object(root)
    }

    /// OpenAPI 3.0 schema object for this node and its children
    pub fn build_swagger(&self) -> Value {
        self.project(Dialect::OpenApi)
    }

    fn project(&self, dialect: Dialect) -> Value {
        let mut node = match &self.kind {
            SchemaKind::String(rules) => rules.project(dialect),
            SchemaKind::Number(rules) => rules.project(),
            SchemaKind::Boolean => obj(json!({"type": "boolean"})),
            SchemaKind::Enum(values) => {
                let mut node = Map::new();
                if let Some(kind) = common_type(values) {
                    node.insert("type".into(), json!(kind));
                }
                node.insert("enum".into(), json!(values));
                node
            }
            SchemaKind::Object(rules) => rules.project(dialect),
            SchemaKind::Model { name, object } => {
                let mut node = object.project(dialect);
                node.insert("title".into(), json!(name));
                node
            }
            SchemaKind::Array(rules) => rules.project(dialect),
        };

        let meta = &self.meta;
        if let Some(description) = &meta.description {
            node.insert("description".into(), json!(description));
        }
        if let Some(example) = &meta.example {
            match dialect {
                Dialect::JsonSchema => node.insert("examples".into(), json!([example])),
                Dialect::OpenApi => node.insert("example".into(), example.clone()),
            };
        }
        if let Some(default) = &meta.default {
            node.insert("default".into(), default.clone());
        }
        if meta.nullable {
            match dialect {
                Dialect::JsonSchema => allow_null(&mut node),
                Dialect::OpenApi => {
                    node.insert("nullable".into(), json!(true));
                }
            }
        }

        if meta.allow.is_empty() {
            Value::Object(node)
        } else {
            json!({ "anyOf": [Value::Object(node), { "enum": meta.allow }] })
        }
    }
}

impl StringRules {
    fn project(&self, dialect: Dialect) -> Map<String, Value> {
        let mut node = obj(json!({"type": "string"}));
        let min = match (&self.password, self.min_length) {
            (Some(policy), Some(min)) => Some(min.max(policy.min_length)),
            (Some(policy), None) => Some(policy.min_length),
            (None, min) => min,
        };
        if let Some(min) = min {
            node.insert("minLength".into(), json!(min));
        }
        if let Some(max) = self.max_length {
            node.insert("maxLength".into(), json!(max));
        }
        if let Some(format) = &self.format {
            project_format(format, dialect, &mut node);
        }
        if self.password.is_some() && dialect == Dialect::OpenApi {
            node.insert("format".into(), json!("password"));
        }
        node
    }
}

fn project_format(format: &Format, dialect: Dialect, node: &mut Map<String, Value>) {
    let pattern = match format {
        Format::Pattern(re) => Some(re.as_str()),
        Format::MongoId => Some(MONGO_ID_PATTERN),
        Format::Md5 => Some(MD5_PATTERN),
        Format::Sha1 => Some(SHA1_PATTERN),
        Format::Sha256 => Some(SHA256_PATTERN),
        _ => None,
    };
    if let Some(pattern) = pattern {
        node.insert("pattern".into(), json!(pattern));
    }

    let name = match (format, dialect) {
        (Format::Pattern(_), _) => None,
        (Format::Email | Format::DateTime | Format::Uri | Format::Uuid, Dialect::JsonSchema) => {
            Some(format.name())
        }
        (_, Dialect::JsonSchema) => None,
        (_, Dialect::OpenApi) => Some(format.name()),
    };
    if let Some(name) = name {
        node.insert("format".into(), json!(name));
    }
}

impl NumberRules {
    fn project(&self) -> Map<String, Value> {
        let kind = if self.integer { "integer" } else { "number" };
        let mut node = obj(json!({ "type": kind }));
        if let Some(min) = self.min {
            node.insert("minimum".into(), json!(min));
        }
        if let Some(max) = self.max {
            node.insert("maximum".into(), json!(max));
        }
        node
    }
}

impl ObjectRules {
    fn project(&self, dialect: Dialect) -> Map<String, Value> {
        let properties: Map<String, Value> = self
            .properties
            .iter()
            .map(|(key, schema)| (key.clone(), schema.project(dialect)))
            .collect();
        let required: Vec<&str> = self
            .properties
            .iter()
            .filter(|(_, schema)| !schema.meta.optional && schema.meta.default.is_none())
            .map(|(key, _)| key.as_str())
            .collect();

        let mut node = obj(json!({"type": "object", "properties": properties}));
        if !required.is_empty() {
            node.insert("required".into(), json!(required));
        }
        if !self.whitelist {
            node.insert("additionalProperties".into(), json!(false));
        }
        node
    }
}

impl ArrayRules {
    fn project(&self, dialect: Dialect) -> Map<String, Value> {
        let mut node = obj(json!({"type": "array"}));
        let (mut min, mut max) = (self.min_length, self.max_length);

        match (&self.items, dialect) {
            (Items::Any, Dialect::JsonSchema) => {}
            (Items::Any, Dialect::OpenApi) => {
                node.insert("items".into(), json!({}));
            }
            (Items::Each(item), _) => {
                node.insert("items".into(), item.project(dialect));
            }
            (Items::Tuple(schemas), Dialect::JsonSchema) => {
                let items: Vec<Value> = schemas.iter().map(|s| s.project(dialect)).collect();
                node.insert("items".into(), json!(items));
                if !self.whitelist {
                    node.insert("additionalItems".into(), json!(false));
                }
                min = Some(schemas.len());
            }
            (Items::Tuple(schemas), Dialect::OpenApi) => {
                let items: Vec<Value> = schemas.iter().map(|s| s.project(dialect)).collect();
                node.insert("items".into(), json!({ "oneOf": items }));
                min = Some(schemas.len());
                max = Some(schemas.len());
            }
        }

        if let Some(min) = min {
            node.insert("minItems".into(), json!(min));
        }
        if let Some(max) = max {
            node.insert("maxItems".into(), json!(max));
        }
        if self.unique {
            node.insert("uniqueItems".into(), json!(true));
        }
        node
    }
}

fn obj(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn common_type(values: &[Value]) -> Option<&'static str> {
    let first = values.first()?;
    let kind = match first {
        Value::String(_) => "string",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        _ => return None,
    };
    let same = values.iter().all(|v| match kind {
        "string" => v.is_string(),
        "boolean" => v.is_boolean(),
        _ => v.is_number(),
    });
    same.then_some(kind)
}

fn allow_null(node: &mut Map<String, Value>) {
    if let Some(Value::String(kind)) = node.get("type").cloned() {
        node.insert("type".into(), json!([kind, "null"]));
    }
    if let Some(Value::Array(values)) = node.get_mut("enum") {
        if !values.contains(&Value::Null) {
            values.push(Value::Null);
        }
    }
}
