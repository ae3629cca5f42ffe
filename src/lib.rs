//! datakit
//!
//! Path-addressed access to nested JSON data, plus declarative schemas that
//! check, coerce and describe it.
//!
//! ## Features
//!
//! - **Path Registry**: `get`/`set`/`remove` through dotted or bracketed
//!   paths (`users[0].name`), memoized reads, auto-created containers,
//!   change watchers and a read-only mode
//! - **Schemas**: string/number/boolean/enum/object/array/model nodes that
//!   report every violation in one pass, keyed by path
//! - **Coercion**: `"42"` → `42`, `"true"` → `true` on successful checks
//! - **Projection**: JSON Schema (draft-07) and OpenAPI 3.0 output
//!
//! ## Example
//!
//! ```
//! use datakit::{Registry, Schema};
//! use serde_json::json;
//!
//! let mut registry = Registry::from_value(json!({"a": 1})).unwrap();
//! registry.set("b.c", 5).unwrap();
//! assert_eq!(registry.get("b"), Some(json!({"c": 5})));
//!
//! let schema = Schema::object([("a", Schema::number()), ("b", Schema::any_array())]);
//! let report = schema.check(&mut registry.value().clone());
//! assert!(report.has("b", datakit::ErrorCode::NotAnArray));
//! ```

pub mod coerce;
pub mod config;
pub mod error;
pub mod events;
pub mod is;
pub mod path;
pub mod registry;
pub mod schema;

pub use coerce::Filter;
pub use config::KitConfig;
pub use error::{Error, Result, Violation};
pub use events::{EventNotifier, HandlerId};
pub use is::ValueKind;
pub use path::Path;
pub use registry::{Change, DataRules, Registry, RegistryOptions};
pub use schema::{ErrorCode, Format, Issue, Model, ModelRegistry, Report, Schema};
