//! Schema definitions
//!
//! Schemas can be described as JSON and built at runtime:
//!
//! ```json
//! {
//!   "type": "object",
//!   "properties": {
//!     "email": { "type": "string", "format": "email" },
//!     "tags":  { "type": "array", "items": { "type": "string" }, "unique": true },
//!     "owner": { "type": "model", "name": "User", "optional": true }
//!   }
//! }
//! ```
//!
//! Every node takes `type` plus the shared settings `optional`, `nullable`,
//! `allow`, `description`, `example`, `default` and `validate`. Model
//! references are resolved against a [`ModelRegistry`] at build time.
//! Keys the node's kind does not read are an error.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Fields, HtmlMode, ModelRegistry, PasswordPolicy, Schema};
use crate::config::SchemaConfig;
use crate::error::{Error, Result};

/// One node of a JSON schema description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Definition {
    #[serde(flatten)]
    pub kind: KindDef,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allow: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default = "default_true")]
    pub validate: bool,
}

fn default_true() -> bool {
    true
}

const SHARED_KEYS: &[&str] = &[
    "type",
    "optional",
    "nullable",
    "allow",
    "description",
    "example",
    "default",
    "validate",
];

/// Kind-specific part of a [`Definition`], tagged by `type`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum KindDef {
    #[serde(rename_all = "camelCase")]
    String {
        min_length: Option<usize>,
        max_length: Option<usize>,
        format: Option<String>,
        pattern: Option<String>,
        html: Option<HtmlMode>,
        #[serde(default)]
        strong_password: bool,
        password: Option<PasswordPolicy>,
    },
    Number {
        #[serde(default)]
        integer: bool,
        min: Option<f64>,
        max: Option<f64>,
    },
    Boolean,
    Enum {
        values: Vec<Value>,
    },
    #[serde(rename_all = "camelCase")]
    Object {
        #[serde(default)]
        properties: Map<String, Value>,
        #[serde(default)]
        white_list: bool,
    },
    /// `items` is a single definition, or a list of them for a tuple
    #[serde(rename_all = "camelCase")]
    Array {
        items: Option<Value>,
        min_length: Option<usize>,
        max_length: Option<usize>,
        #[serde(default)]
        unique: bool,
        #[serde(default)]
        white_list: bool,
    },
    #[serde(rename_all = "camelCase", alias = "classRef")]
    Model {
        name: String,
        #[serde(default)]
        white_list: bool,
    },
}

impl KindDef {
    /// Keys this kind reads besides the shared ones
    fn keys(&self) -> &'static [&'static str] {
        match self {
            KindDef::String { .. } => &[
                "minLength",
                "maxLength",
                "format",
                "pattern",
                "html",
                "strongPassword",
                "password",
            ],
            KindDef::Number { .. } => &["integer", "min", "max"],
            KindDef::Boolean => &[],
            KindDef::Enum { .. } => &["values"],
            KindDef::Object { .. } => &["properties", "whiteList"],
            KindDef::Array { .. } => &["items", "minLength", "maxLength", "unique", "whiteList"],
            KindDef::Model { .. } => &["name", "whiteList"],
        }
    }
}

impl Definition {
    /// Parse one node. Keys the node's kind does not read are rejected.
    pub fn parse(value: &Value) -> Result<Self> {
        let definition =
            Definition::deserialize(value).map_err(|e| Error::InvalidDefinition(e.to_string()))?;
        if let Value::Object(map) = value {
            let known = definition.kind.keys();
            if let Some(key) = map
                .keys()
                .find(|key| !SHARED_KEYS.contains(&key.as_str()) && !known.contains(&key.as_str()))
            {
                return Err(Error::InvalidDefinition(format!(
                    "unknown key '{}' in a {} definition",
                    key,
                    map.get("type").and_then(Value::as_str).unwrap_or("schema")
                )));
            }
        }
        Ok(definition)
    }

    /// Build the schema tree this definition describes
    pub fn build(&self, models: &ModelRegistry, config: &SchemaConfig) -> Result<Schema> {
        let mut schema = match &self.kind {
            KindDef::String {
                min_length,
                max_length,
                format,
                pattern,
                html,
                strong_password,
                password,
            } => {
                let mut schema = Schema::string().html(html.unwrap_or(config.html));
                if let Some(n) = min_length {
                    schema = schema.min_length(*n);
                }
                if let Some(n) = max_length {
                    schema = schema.max_length(*n);
                }
                if let Some(name) = format {
                    schema = schema.format_named(name)?;
                }
                if let Some(pattern) = pattern {
                    schema = schema.pattern(pattern)?;
                }
                match password {
                    Some(policy) => schema = schema.password_policy(policy.clone()),
                    None if *strong_password => {
                        schema = schema.password_policy(config.password.clone())
                    }
                    None => {}
                }
                schema
            }
            KindDef::Number { integer, min, max } => {
                let mut schema = Schema::number();
                if *integer {
                    schema = schema.integer();
                }
                if let Some(min) = min {
                    schema = schema.min(*min);
                }
                if let Some(max) = max {
                    schema = schema.max(*max);
                }
                schema
            }
            KindDef::Boolean => Schema::boolean(),
            KindDef::Enum { values } => Schema::enumeration(values.iter().cloned()),
            KindDef::Object {
                properties,
                white_list,
            } => {
                let fields = build_fields(properties, models, config)?;
                let schema = Schema::object(fields.into_vec());
                if *white_list {
                    schema.white_list()
                } else {
                    schema
                }
            }
            KindDef::Array {
                items,
                min_length,
                max_length,
                unique,
                white_list,
            } => {
                let mut schema = match items {
                    None => Schema::any_array(),
                    Some(Value::Array(positions)) => Schema::tuple(
                        positions
                            .iter()
                            .map(|item| Definition::parse(item)?.build(models, config))
                            .collect::<Result<Vec<_>>>()?,
                    ),
                    Some(item) => Schema::array(Definition::parse(item)?.build(models, config)?),
                };
                if let Some(n) = min_length {
                    schema = schema.min_length(*n);
                }
                if let Some(n) = max_length {
                    schema = schema.max_length(*n);
                }
                if *unique {
                    schema = schema.unique();
                }
                if *white_list {
                    schema = schema.white_list();
                }
                schema
            }
            KindDef::Model { name, white_list } => {
                let schema = Schema::class_ref(models, name)?;
                if *white_list {
                    schema.white_list()
                } else {
                    schema
                }
            }
        };

        if self.optional {
            schema = schema.optional();
        }
        if self.nullable {
            schema = schema.nullable();
        }
        if !self.allow.is_empty() {
            schema = schema.allow(self.allow.iter().cloned());
        }
        if let Some(text) = &self.description {
            schema = schema.description(text.clone());
        }
        if let Some(example) = &self.example {
            schema = schema.example(example.clone());
        }
        if let Some(default) = &self.default {
            schema = schema.default_value(default.clone());
        }
        Ok(schema.validate_enabled(self.validate))
    }
}

fn build_fields(properties: &Map<String, Value>, models: &ModelRegistry, config: &SchemaConfig) -> Result<Fields> {
    properties
        .iter()
        .map(|(key, raw)| Ok((key.clone(), Definition::parse(raw)?.build(models, config)?)))
        .collect::<Result<Vec<(String, Schema)>>>()
        .map(|fields| fields.into_iter().collect())
}

impl Schema {
    /// Build a schema from its JSON description with default settings
    pub fn from_definition(definition: &Value, models: &ModelRegistry) -> Result<Self> {
        Self::from_definition_with(definition, models, &SchemaConfig::default())
    }

    /// Build a schema from its JSON description. `config` supplies the HTML
    /// mode for strings that don't set one and the policy behind
    /// `"strongPassword": true`.
    pub fn from_definition_with(definition: &Value, models: &ModelRegistry, config: &SchemaConfig) -> Result<Self> {
        Definition::parse(definition)?.build(models, config)
    }
}

/// A named model in a definitions document
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ModelDef {
    #[serde(default)]
    extends: Option<String>,
    #[serde(default)]
    properties: Map<String, Value>,
}

impl ModelRegistry {
    /// Registry from a `{ "Name": { "extends": ..., "properties": ... } }`
    /// document
    pub fn from_definitions(definitions: &Value) -> Result<Self> {
        let mut models = ModelRegistry::new();
        models.load_definitions(definitions, &SchemaConfig::default())?;
        Ok(models)
    }

    /// Register every model in a definitions document. Properties may
    /// reference models registered earlier, including ones earlier in the
    /// same document.
    pub fn load_definitions(&mut self, definitions: &Value, config: &SchemaConfig) -> Result<()> {
        let Value::Object(entries) = definitions else {
            return Err(Error::InvalidDefinition(
                "model definitions must be an object keyed by model name".to_string(),
            ));
        };
        for (name, raw) in entries {
            let def = ModelDef::deserialize(raw)
                .map_err(|e| Error::InvalidDefinition(format!("{}: {}", name, e)))?;
            let fields = build_fields(&def.properties, self, config)?;
            self.register(name.clone(), def.extends.as_deref(), fields);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ErrorCode;
    use serde_json::json;

    #[test]
    fn test_object_definition() {
        let schema = Schema::from_definition(
            &json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string", "minLength": 2},
                    "age": {"type": "string", "format": "unsignedInteger"},
                    "role": {"type": "enum", "values": ["admin", "member"], "default": "member"},
                    "tags": {"type": "array", "items": {"type": "string"}, "unique": true, "optional": true}
                }
            }),
            &ModelRegistry::new(),
        )
        .unwrap();

        assert_eq!(
            schema.validate(json!({"name": "Ada", "age": "36"})),
            Ok(json!({"name": "Ada", "age": 36, "role": "member"}))
        );
        let report = schema.check(&mut json!({"name": "A", "age": "x", "tags": ["a", "a"]}));
        assert!(report.has("name", ErrorCode::MinLength));
        assert!(report.has("age", ErrorCode::InvalidFormat));
        assert!(report.has("tags", ErrorCode::NotUnique));
    }

    #[test]
    fn test_tuple_and_number_definitions() {
        let schema = Schema::from_definition(
            &json!({
                "type": "array",
                "items": [{"type": "number", "integer": true, "min": 0}, {"type": "boolean"}],
                "whiteList": true
            }),
            &ModelRegistry::new(),
        )
        .unwrap();
        assert_eq!(schema.validate(json!([1, true, "extra"])), Ok(json!([1, true])));
        assert!(!schema.is_valid(&json!([-1, true])));
    }

    #[test]
    fn test_config_supplies_string_defaults() {
        let config = SchemaConfig {
            html: HtmlMode::Strip,
            ..SchemaConfig::default()
        };
        let models = ModelRegistry::new();
        let plain = Schema::from_definition_with(&json!({"type": "string"}), &models, &config).unwrap();
        assert_eq!(plain.validate(json!("<i>hi</i>")), Ok(json!("hi")));

        let password =
            Schema::from_definition_with(&json!({"type": "string", "strongPassword": true}), &models, &config)
                .unwrap();
        assert!(password.check(&mut json!("weak")).has("", ErrorCode::WeakPassword));
    }

    #[test]
    fn test_model_definitions() {
        let models = ModelRegistry::from_definitions(&json!({
            "Entity": {"properties": {"id": {"type": "string", "format": "uuid"}}},
            "User": {"extends": "Entity", "properties": {"email": {"type": "string", "format": "email"}}},
            "Post": {"extends": "Entity", "properties": {"author": {"type": "model", "name": "User"}}}
        }))
        .unwrap();

        let post = Schema::from_definition(&json!({"type": "classRef", "name": "Post"}), &models).unwrap();
        let report = post.check(&mut json!({
            "id": "67e55044-10b1-426f-9247-bb680e5fe0c8",
            "author": {"id": "nope", "email": "ada@example.com"}
        }));
        assert_eq!(report.len(), 1);
        assert!(report.has("author.id", ErrorCode::InvalidFormat));
    }

    #[test]
    fn test_invalid_definitions() {
        let models = ModelRegistry::new();
        assert!(matches!(
            Schema::from_definition(&json!({"type": "date"}), &models),
            Err(Error::InvalidDefinition(_))
        ));
        assert!(matches!(
            Schema::from_definition(&json!({"type": "string", "format": "zip"}), &models),
            Err(Error::UnknownFormat(_))
        ));
        assert!(matches!(
            Schema::from_definition(&json!({"type": "model", "name": "Ghost"}), &models),
            Err(Error::UnknownModel(_))
        ));
        assert!(ModelRegistry::from_definitions(&json!([1])).is_err());
    }

    #[test]
    fn test_misspelled_keys_are_rejected() {
        let models = ModelRegistry::new();
        let err = Schema::from_definition(&json!({"type": "string", "minLenght": 2}), &models).unwrap_err();
        assert!(matches!(&err, Error::InvalidDefinition(msg) if msg.contains("minLenght")));

        // A key valid for another kind is still unknown here
        assert!(matches!(
            Schema::from_definition(&json!({"type": "number", "unique": true}), &models),
            Err(Error::InvalidDefinition(_))
        ));
        assert!(matches!(
            Schema::from_definition(
                &json!({"type": "object", "properties": {"tags": {"type": "array", "uniq": true}}}),
                &models
            ),
            Err(Error::InvalidDefinition(_))
        ));
        assert!(matches!(
            ModelRegistry::from_definitions(&json!({"User": {"extend": "Entity"}})),
            Err(Error::InvalidDefinition(_))
        ));
        assert!(Schema::from_definition(&json!({"type": "boolean", "validate": false}), &models).is_ok());
    }
}
