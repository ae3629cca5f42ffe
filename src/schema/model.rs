//! Model Schemas
//!
//! A model is a named object shape. Compile-time models implement
//! [`Model`]; models only known at runtime (e.g. loaded from JSON
//! definitions) go into a [`ModelRegistry`]. Both support inheritance:
//! the parent's fields come first and a child's field with the same name
//! replaces the inherited one in place.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::{ObjectRules, Schema, SchemaKind};
use crate::error::{Error, Result};

/// Ordered field list of a model
#[derive(Debug, Clone, Default)]
pub struct Fields {
    fields: Vec<(String, Schema)>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field, replacing an inherited field of the same name
    pub fn field(&mut self, name: impl Into<String>, schema: Schema) -> &mut Self {
        let name = name.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = schema,
            None => self.fields.push((name, schema)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, schema)| schema)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Overlay `other` onto these fields
    pub fn merge(&mut self, other: Fields) {
        for (name, schema) in other.fields {
            self.field(name, schema);
        }
    }

    pub fn into_vec(self) -> Vec<(String, Schema)> {
        self.fields
    }
}

impl<K: Into<String>> FromIterator<(K, Schema)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, Schema)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (name, schema) in iter {
            fields.field(name, schema);
        }
        fields
    }
}

/// A compile-time model.
///
/// ```
/// use datakit::schema::{Fields, Model};
/// use datakit::Schema;
///
/// struct Animal;
/// impl Model for Animal {
///     const NAME: &'static str = "Animal";
///     fn declare(fields: &mut Fields) {
///         fields.field("name", Schema::string());
///     }
/// }
///
/// struct Dog;
/// impl Model for Dog {
///     const NAME: &'static str = "Dog";
///     fn declare(fields: &mut Fields) {
///         Animal::declare(fields);
///         fields.field("good", Schema::boolean());
///     }
/// }
/// ```
pub trait Model {
    const NAME: &'static str;

    fn declare(fields: &mut Fields);
}

pub(crate) fn fields_of<M: Model>() -> Fields {
    let mut fields = Fields::new();
    M::declare(&mut fields);
    fields
}

#[derive(Debug, Clone)]
struct Entry {
    parent: Option<String>,
    fields: Fields,
}

/// Models registered at runtime by name
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: HashMap<String, Entry>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a model. The parent does not need to exist
    /// yet; it is looked up when the model is resolved.
    pub fn register(&mut self, name: impl Into<String>, parent: Option<&str>, fields: Fields) -> &mut Self {
        let name = name.into();
        debug!(model = %name, parent = ?parent, fields = fields.len(), "registering model");
        self.models.insert(
            name,
            Entry {
                parent: parent.map(str::to_string),
                fields,
            },
        );
        self
    }

    /// Register a compile-time model under its `NAME`
    pub fn register_model<M: Model>(&mut self) -> &mut Self {
        self.register(M::NAME, None, fields_of::<M>())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.models.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Fields of `name` merged over its whole parent chain
    pub fn resolve(&self, name: &str) -> Result<Fields> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(name);

        while let Some(model) = current {
            if !seen.insert(model) {
                return Err(Error::ModelCycle(model.to_string()));
            }
            let entry = self
                .models
                .get(model)
                .ok_or_else(|| Error::UnknownModel(model.to_string()))?;
            chain.push(entry);
            current = entry.parent.as_deref();
        }

        let mut fields = Fields::new();
        for entry in chain.into_iter().rev() {
            fields.merge(entry.fields.clone());
        }
        Ok(fields)
    }

    /// An object schema for the model `name`
    pub fn schema(&self, name: &str) -> Result<Schema> {
        let fields = self.resolve(name)?;
        Ok(Schema::new(SchemaKind::Model {
            name: name.to_string(),
            object: ObjectRules {
                properties: fields.into_vec(),
                whitelist: false,
            },
        }))
    }
}
