//! Path Registry
//!
//! Wraps one nested mapping or sequence and addresses it through dotted or
//! bracketed paths (`a.b[0].c`). Reads are memoized per canonical path,
//! writes auto-create missing containers, and watchers are notified when a
//! path's value changes.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::coerce::{self, Filter};
use crate::config::RegistryConfig;
use crate::error::{Error, Result, Violation};
use crate::events::{EventNotifier, HandlerId};
use crate::is::{self, kind_of, ValueKind};
use crate::path::{self, Path};

/// Construction options for a [`Registry`]
#[derive(Debug, Clone)]
pub struct RegistryOptions {
    /// Reject every mutation with [`Error::Consistency`]
    pub consistent: bool,
    /// Memoize `get` results per canonical path
    pub cache: bool,
    /// Structural rules checked on construction and by `set_validated`
    pub rules: Option<DataRules>,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            consistent: false,
            cache: true,
            rules: None,
        }
    }
}

impl RegistryOptions {
    /// Read-only registry options
    pub fn consistent() -> Self {
        Self {
            consistent: true,
            ..Self::default()
        }
    }

    pub fn with_rules(mut self, rules: DataRules) -> Self {
        self.rules = Some(rules);
        self
    }
}

impl From<&RegistryConfig> for RegistryOptions {
    fn from(config: &RegistryConfig) -> Self {
        Self {
            consistent: config.consistent,
            cache: config.cache,
            rules: None,
        }
    }
}

/// Payload delivered to watchers
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    /// Canonical path that changed
    pub path: String,
    /// New value, `None` when the path was removed
    pub value: Option<Value>,
    /// Value before the change, `None` when the path did not exist
    pub previous: Option<Value>,
}

// =============================================================================
// Registry
// =============================================================================

/// Path-addressed container over a JSON mapping or sequence
pub struct Registry {
    data: Value,
    cache: RefCell<HashMap<Path, Value>>,
    options: RegistryOptions,
    watchers: EventNotifier<Change>,
}

impl Registry {
    /// An empty mapping
    pub fn new() -> Self {
        Self {
            data: Value::Object(Map::new()),
            cache: RefCell::new(HashMap::new()),
            options: RegistryOptions::default(),
            watchers: EventNotifier::new(),
        }
    }

    /// Take ownership of a mapping or sequence
    pub fn from_value(data: Value) -> Result<Self> {
        Self::with_options(data, RegistryOptions::default())
    }

    pub fn with_options(data: Value, options: RegistryOptions) -> Result<Self> {
        ensure_container(&data)?;
        if let Some(rules) = &options.rules {
            rules.validate(&data)?;
        }
        Ok(Self {
            data,
            cache: RefCell::new(HashMap::new()),
            options,
            watchers: EventNotifier::new(),
        })
    }

    /// Parse a JSON object or array string
    pub fn from_json(raw: &str) -> Result<Self> {
        Self::from_value(parse_json(raw)?)
    }

    /// Serialize arbitrary data into a registry. Data whose serialized form
    /// is not JSON-shaped (e.g. maps keyed by non-strings) is rejected.
    pub fn from_serialize<T: Serialize + ?Sized>(data: &T) -> Result<Self> {
        let value = serde_json::to_value(data).map_err(|e| Error::Validation {
            path: String::new(),
            violation: Violation::NotJsonShape(e.to_string()),
        })?;
        Self::from_value(value)
    }

    /// Replace the wrapped data and reset the cache
    pub fn parse(&mut self, data: Value) -> Result<&mut Self> {
        self.ensure_writable(&Path::root())?;
        ensure_container(&data)?;
        if let Some(rules) = &self.options.rules {
            rules.validate(&data)?;
        }
        self.data = data;
        self.cache.borrow_mut().clear();
        Ok(self)
    }

    pub fn options(&self) -> &RegistryOptions {
        &self.options
    }

    pub fn is_consistent(&self) -> bool {
        self.options.consistent
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Resolve a path. The empty path resolves to the root.
    pub fn get(&self, path: &str) -> Option<Value> {
        let path = Path::parse(path);
        let use_cache = self.options.cache && !path.is_root();

        if use_cache {
            if let Some(hit) = self.cache.borrow().get(&path) {
                return Some(hit.clone());
            }
        }

        let found = resolve(&self.data, &path)?.clone();
        if use_cache {
            self.cache.borrow_mut().insert(path, found.clone());
        }
        Some(found)
    }

    pub fn get_or(&self, path: &str, default: impl Into<Value>) -> Value {
        self.get(path).unwrap_or_else(|| default.into())
    }

    /// Resolve and pipe through `filters`. The default is returned as-is.
    pub fn get_with(&self, path: &str, default: Option<Value>, filters: &[Filter]) -> Option<Value> {
        match self.get(path) {
            Some(found) => Some(coerce::apply(filters, found)),
            None => default,
        }
    }

    /// Borrowing lookup that bypasses the cache
    pub fn pointer(&self, path: &str) -> Option<&Value> {
        resolve(&self.data, &Path::parse(path))
    }

    pub fn has(&self, path: &str) -> bool {
        self.pointer(path).is_some()
    }

    /// Truthiness of the resolved value
    pub fn is(&self, path: &str) -> bool {
        self.pointer(path).map(is::truthy).unwrap_or(false)
    }

    /// Equality with the resolved value; numbers compare by value
    pub fn is_eq(&self, path: &str, expected: &Value) -> bool {
        self.pointer(path).map(|value| is::loose_eq(value, expected)).unwrap_or(false)
    }

    pub fn is_path_array(&self, path: &str) -> bool {
        self.pointer(path).map(Value::is_array).unwrap_or(false)
    }

    pub fn is_path_object(&self, path: &str) -> bool {
        self.pointer(path).map(Value::is_object).unwrap_or(false)
    }

    pub fn is_path_flat(&self, path: &str) -> bool {
        self.pointer(path).map(is::is_flat).unwrap_or(false)
    }

    pub fn is_cached(&self, path: &str) -> bool {
        self.cache.borrow().contains_key(&Path::parse(path))
    }

    pub fn cache_len(&self) -> usize {
        self.cache.borrow().len()
    }

    /// The wrapped data
    pub fn value(&self) -> &Value {
        &self.data
    }

    pub fn into_value(self) -> Value {
        self.data
    }

    pub fn is_empty(&self) -> bool {
        is::is_empty(&self.data)
    }

    /// Number of top-level entries
    pub fn len(&self) -> usize {
        match &self.data {
            Value::Object(map) => map.len(),
            Value::Array(items) => items.len(),
            _ => 0,
        }
    }

    // -------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------

    /// Write `value` at `path`, creating missing containers along the way
    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> Result<&mut Self> {
        self.assign(&Path::parse(path), Some(value.into()))?;
        Ok(self)
    }

    /// Remove the value at `path`. Sequence elements shift down.
    pub fn remove(&mut self, path: &str) -> Result<&mut Self> {
        self.assign(&Path::parse(path), None)?;
        Ok(self)
    }

    /// Like [`Registry::set`], but the resulting data must pass
    /// [`Registry::validate_data`] or nothing is written.
    pub fn set_validated(&mut self, path: &str, value: impl Into<Value>) -> Result<&mut Self> {
        let path = Path::parse(path);
        let value = value.into();
        self.ensure_writable(&path)?;

        let mut scratch = self.data.clone();
        if path.is_root() {
            scratch = value.clone();
            ensure_container(&scratch)?;
        } else {
            write(&mut scratch, &path, Some(value.clone()))?;
        }
        self.validate_data(&scratch)?;

        self.assign(&path, Some(value))?;
        Ok(self)
    }

    /// Recursively merge `data` into this registry; siblings are preserved.
    pub fn extend(&mut self, data: Value) -> Result<&mut Self> {
        self.ensure_writable(&Path::root())?;
        self.merge_at(&Path::root(), data)?;
        Ok(self)
    }

    /// Merge another registry's data into this one
    pub fn merge(&mut self, other: &Registry) -> Result<&mut Self> {
        self.extend(other.data.clone())
    }

    fn merge_at(&mut self, at: &Path, incoming: Value) -> Result<()> {
        match incoming {
            Value::Object(map) => {
                if !resolve(&self.data, at).map(Value::is_object).unwrap_or(false) {
                    self.assign(at, Some(Value::Object(Map::new())))?;
                }
                for (key, child) in map {
                    self.merge_at(&at.child(key), child)?;
                }
            }
            Value::Array(items) => {
                if !resolve(&self.data, at).map(Value::is_array).unwrap_or(false) {
                    self.assign(at, Some(Value::Array(Vec::new())))?;
                }
                for (i, child) in items.into_iter().enumerate() {
                    self.merge_at(&at.child(i.to_string()), child)?;
                }
            }
            leaf => self.assign(at, Some(leaf))?,
        }
        Ok(())
    }

    fn assign(&mut self, path: &Path, value: Option<Value>) -> Result<()> {
        self.ensure_writable(path)?;
        // Removing a sequence element shifts its later siblings
        match path.parent() {
            Some(parent) if value.is_none() && self.is_sequence(&parent) => self.invalidate(&parent),
            _ => self.invalidate(path),
        }

        let previous = if path.is_root() {
            let replacement = match &value {
                Some(v) => {
                    ensure_container(v)?;
                    v.clone()
                }
                None => empty_like(&self.data),
            };
            Some(std::mem::replace(&mut self.data, replacement))
        } else {
            write(&mut self.data, path, value.clone())?
        };

        let key = path.canonical();
        let changed = match (&previous, &value) {
            (Some(old), Some(new)) => !is::loose_eq(old, new),
            (old, new) => old.is_some() != new.is_some(),
        };
        if changed && self.watchers.has(&key) {
            self.watchers.emit(
                &key,
                &Change {
                    path: key.clone(),
                    value: value.clone(),
                    previous,
                },
            );
        }
        if value.is_none() {
            let dropped = self.watchers.remove(&key);
            if dropped > 0 {
                debug!(path = %key, dropped, "watchers removed with their path");
            }
        }
        Ok(())
    }

    fn is_sequence(&self, path: &Path) -> bool {
        resolve(&self.data, path).map(Value::is_array).unwrap_or(false)
    }

    fn ensure_writable(&self, path: &Path) -> Result<()> {
        if self.options.consistent {
            return Err(Error::Consistency {
                path: path.canonical(),
            });
        }
        Ok(())
    }

    /// Drop cached reads for `path`, its descendants and its ancestors
    fn invalidate(&self, path: &Path) {
        let mut cache = self.cache.borrow_mut();
        let before = cache.len();
        cache.retain(|key, _| !(key.starts_with(path) || path.starts_with(key)));
        let invalidated = before - cache.len();
        if invalidated > 0 {
            debug!(path = %path, invalidated, "cache invalidated");
        }
    }

    // -------------------------------------------------------------------------
    // Derived registries
    // -------------------------------------------------------------------------

    /// A new registry holding only `paths`, rebuilt along those paths
    pub fn pick(&self, paths: &[&str]) -> Result<Registry> {
        let mut picked = Registry::with_options(empty_like(&self.data), self.writable_options())?;
        for raw in paths {
            let path = Path::parse(raw);
            if let Some(found) = resolve(&self.data, &path) {
                picked.assign(&path, Some(found.clone()))?;
            }
        }
        picked.options.consistent = self.options.consistent;
        Ok(picked)
    }

    /// A copy without `paths`
    pub fn omit(&self, paths: &[&str]) -> Result<Registry> {
        let mut omitted = Registry::with_options(self.data.clone(), self.writable_options())?;
        for raw in paths {
            omitted.assign(&Path::parse(raw), None)?;
        }
        omitted.options.consistent = self.options.consistent;
        Ok(omitted)
    }

    fn writable_options(&self) -> RegistryOptions {
        RegistryOptions {
            consistent: false,
            cache: self.options.cache,
            rules: None,
        }
    }

    // -------------------------------------------------------------------------
    // Watchers
    // -------------------------------------------------------------------------

    /// Call `handler` whenever one of `paths` changes value
    pub fn watch<F>(&mut self, paths: &[&str], handler: F) -> Vec<HandlerId>
    where
        F: FnMut(&Change) + 'static,
    {
        let shared = Rc::new(RefCell::new(handler));
        paths
            .iter()
            .map(|raw| {
                let handler = Rc::clone(&shared);
                self.watchers
                    .on(&Path::parse(raw).canonical(), 0, move |change| {
                        (*handler.borrow_mut())(change)
                    })
            })
            .collect()
    }

    pub fn unwatch(&mut self, id: HandlerId) -> bool {
        self.watchers.off(id)
    }

    // -------------------------------------------------------------------------
    // Structural validation
    // -------------------------------------------------------------------------

    /// Validate the wrapped data
    pub fn validate(&self) -> Result<()> {
        self.validate_data(&self.data)
    }

    /// Validate `data` against this registry's rules, or strictly (root must
    /// be a mapping or sequence) when none are configured
    pub fn validate_data(&self, data: &Value) -> Result<()> {
        match &self.options.rules {
            Some(rules) => rules.validate(data),
            None => {
                let found = kind_of(data);
                if found.is_container() {
                    Ok(())
                } else {
                    Err(Error::Validation {
                        path: String::new(),
                        violation: Violation::WrongShape {
                            expected: ValueKind::Object,
                            found,
                        },
                    })
                }
            }
        }
    }

    pub fn is_valid_data(&self, data: &Value) -> bool {
        self.validate_data(data).is_ok()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Copies data, options and the read-only flag. The cache starts empty and
/// watchers stay with the original.
impl Clone for Registry {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            cache: RefCell::new(HashMap::new()),
            options: self.options.clone(),
            watchers: EventNotifier::new(),
        }
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("data", &self.data)
            .field("options", &self.options)
            .field("cached", &self.cache.borrow().len())
            .field("watchers", &self.watchers)
            .finish()
    }
}

// =============================================================================
// Structural rules
// =============================================================================

/// Per-path kind rules. A `*` segment matches any key or index.
#[derive(Debug, Clone, Default)]
pub struct DataRules {
    rules: Vec<(Path, ValueKind)>,
    allow_extra: bool,
}

impl DataRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow `kind` at `path`. Repeat to allow several kinds.
    pub fn rule(mut self, path: &str, kind: ValueKind) -> Self {
        self.rules.push((Path::parse(path), kind));
        self
    }

    /// Skip properties no rule covers instead of rejecting them
    pub fn allow_extra(mut self, allow: bool) -> Self {
        self.allow_extra = allow;
        self
    }

    fn kinds_for(&self, path: &Path) -> Vec<ValueKind> {
        self.rules
            .iter()
            .filter(|(pattern, _)| {
                pattern.len() == path.len()
                    && pattern
                        .segments()
                        .iter()
                        .zip(path.segments())
                        .all(|(p, s)| p == "*" || p == s)
            })
            .map(|(_, kind)| *kind)
            .collect()
    }

    pub fn validate(&self, data: &Value) -> Result<()> {
        let root_kinds = self.kinds_for(&Path::root());
        let found = kind_of(data);
        if !found.is_container() || (!root_kinds.is_empty() && !root_kinds.contains(&found)) {
            return Err(Error::Validation {
                path: String::new(),
                violation: Violation::WrongShape {
                    expected: root_kinds.first().copied().unwrap_or(ValueKind::Object),
                    found,
                },
            });
        }
        self.walk(&Path::root(), data)
    }

    fn walk(&self, at: &Path, value: &Value) -> Result<()> {
        let children: Vec<(String, &Value)> = match value {
            Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
            Value::Array(items) => items.iter().enumerate().map(|(i, v)| (i.to_string(), v)).collect(),
            _ => return Ok(()),
        };

        for (segment, child) in children {
            let child_path = at.child(segment);
            let kinds = self.kinds_for(&child_path);
            if kinds.is_empty() {
                if self.allow_extra {
                    continue;
                }
                return Err(Error::Validation {
                    path: child_path.canonical(),
                    violation: Violation::ExtraProperty,
                });
            }

            let found = kind_of(child);
            if !kinds.contains(&found) {
                let expected = kinds[0];
                let violation = if expected.is_container() || found.is_container() {
                    Violation::WrongShape { expected, found }
                } else {
                    Violation::WrongType { expected, found }
                };
                return Err(Error::Validation {
                    path: child_path.canonical(),
                    violation,
                });
            }
            self.walk(&child_path, child)?;
        }
        Ok(())
    }
}

// =============================================================================
// Traversal
// =============================================================================

/// Walk `path` from `root`. Hitting a primitive before the last segment
/// means not found.
pub fn resolve<'a>(root: &'a Value, path: &Path) -> Option<&'a Value> {
    let mut current = root;
    for segment in path.segments() {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(path::index(segment)?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Write or remove at a non-root path, returning the previous value.
fn write(root: &mut Value, path: &Path, value: Option<Value>) -> Result<Option<Value>> {
    let segments = path.segments();
    let Some((last, parents)) = segments.split_last() else {
        return Ok(None);
    };
    let removing = value.is_none();
    if !removing {
        ensure_reachable(root, segments)?;
    }

    let mut current = root;
    for (depth, segment) in parents.iter().enumerate() {
        let next_is_index = path::index(&segments[depth + 1]).is_some();
        let slot = match current {
            Value::Object(map) => {
                if removing && !map.contains_key(segment) {
                    return Ok(None);
                }
                map.entry(segment.clone())
                    .or_insert_with(|| empty_container(next_is_index))
            }
            Value::Array(items) => {
                let Some(i) = path::index(segment) else {
                    return Err(conflict(segments, depth, ValueKind::Array));
                };
                if i >= items.len() {
                    if removing {
                        return Ok(None);
                    }
                    items.resize(i, Value::Null);
                    items.push(empty_container(next_is_index));
                }
                &mut items[i]
            }
            other => return Err(conflict(segments, depth, kind_of(other))),
        };

        if slot.is_null() {
            if removing {
                return Ok(None);
            }
            *slot = empty_container(next_is_index);
        }
        current = slot;
    }

    match current {
        Value::Object(map) => Ok(match value {
            Some(v) => map.insert(last.clone(), v),
            None => map.remove(last),
        }),
        Value::Array(items) => {
            let Some(i) = path::index(last) else {
                return Err(conflict(segments, segments.len() - 1, ValueKind::Array));
            };
            match value {
                Some(v) if i < items.len() => Ok(Some(std::mem::replace(&mut items[i], v))),
                Some(v) => {
                    items.resize(i, Value::Null);
                    items.push(v);
                    Ok(None)
                }
                None if i < items.len() => Ok(Some(items.remove(i))),
                None => Ok(None),
            }
        }
        other => Err(conflict(segments, segments.len() - 1, kind_of(other))),
    }
}

/// How many `null`s a write past the end of a sequence may insert
const MAX_GAP: usize = 1024;

/// Reject a write that would pad a sequence by more than [`MAX_GAP`],
/// before anything is modified
fn ensure_reachable(root: &Value, segments: &[String]) -> Result<()> {
    let mut current = Some(root);
    for (depth, segment) in segments.iter().enumerate() {
        let len = match current {
            Some(Value::Object(_)) => None,
            Some(Value::Array(items)) => Some(items.len()),
            // Missing or null, vivified as a sequence when indexed
            _ => Some(0),
        };
        if let (Some(len), Some(i)) = (len, path::index(segment)) {
            if i > len.saturating_add(MAX_GAP) {
                return Err(Error::IndexOutOfRange {
                    path: segments[..=depth].join("."),
                    index: i,
                    len,
                });
            }
        }
        current = current.and_then(|value| match value {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => items.get(path::index(segment)?),
            _ => None,
        });
    }
    Ok(())
}

fn conflict(segments: &[String], depth: usize, found: ValueKind) -> Error {
    Error::PathConflict {
        path: segments[..=depth].join("."),
        found,
    }
}

fn empty_container(sequence: bool) -> Value {
    if sequence {
        Value::Array(Vec::new())
    } else {
        Value::Object(Map::new())
    }
}

fn empty_like(value: &Value) -> Value {
    empty_container(value.is_array())
}

fn ensure_container(value: &Value) -> Result<()> {
    if is::is_container(value) {
        Ok(())
    } else {
        Err(Error::InvalidShape(format!(
            "registry data must be an object or an array, got {}",
            kind_of(value)
        )))
    }
}

fn parse_json(raw: &str) -> Result<Value> {
    let trimmed = raw.trim_start();
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return Err(Error::InvalidShape(
            "expected a JSON object or array string".to_string(),
        ));
    }
    Ok(serde_json::from_str(trimmed)?)
}
