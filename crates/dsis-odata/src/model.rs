//! Typed model capability.
//!
//! The client never knows the concrete DSIS schemas. Typed results go
//! through [`DsisModel`], which any `serde` type can implement by naming
//! its OData entity and fields:
//!
//! ```rust,ignore
//! #[derive(Debug, Deserialize)]
//! struct Well {
//!     well_name: String,
//!     well_uwi: Option<String>,
//! }
//!
//! impl DsisModel for Well {
//!     const MODEL_NAME: &'static str = "Well";
//!     const FIELD_NAMES: &'static [&'static str] = &["well_name", "well_uwi"];
//! }
//! ```
//!
//! Name-based lookups (table validation, field discovery) go through an
//! optional [`ModelRegistry`] injected into the client.

use std::any::TypeId;
use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{Error, ErrorKind, Result};

/// A row type of a DSIS OData entity set.
pub trait DsisModel: DeserializeOwned + 'static {
    /// Bare entity name used as the schema path segment.
    const MODEL_NAME: &'static str;

    /// Declared field names.
    const FIELD_NAMES: &'static [&'static str];

    /// Build an instance from one item mapping.
    fn from_item(item: &Map<String, Value>) -> serde_json::Result<Self> {
        serde_json::from_value(Value::Object(item.clone()))
    }
}

/// Runtime handle for a [`DsisModel`] type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelInfo {
    name: &'static str,
    fields: &'static [&'static str],
    type_id: TypeId,
}

impl ModelInfo {
    /// Capture the handle for `T`.
    pub fn of<T: DsisModel>() -> Self {
        Self {
            name: T::MODEL_NAME,
            fields: T::FIELD_NAMES,
            type_id: TypeId::of::<T>(),
        }
    }

    /// Entity name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Declared field names.
    pub fn field_names(&self) -> &'static [&'static str] {
        self.fields
    }

    /// Returns true if this handle describes `T`.
    pub fn is<T: DsisModel>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

/// Convert item mappings into `T`, in order.
///
/// Stops at the first item that does not deserialize; nothing is returned
/// for the items before it.
pub fn cast_items<T: DsisModel>(items: &[Map<String, Value>]) -> Result<Vec<T>> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            T::from_item(item).map_err(|e| {
                Error::with_source(
                    ErrorKind::Validation {
                        model: T::MODEL_NAME.to_string(),
                        index,
                        message: e.to_string(),
                    },
                    e,
                )
            })
        })
        .collect()
}

/// Name-based catalogue of known models.
pub trait ModelRegistry: Send + Sync {
    /// Returns true if `name` is a known model.
    fn contains(&self, name: &str) -> bool;

    /// Declared field names of `name`, if known.
    fn field_names(&self, name: &str) -> Option<Vec<String>>;

    /// Names of every known model.
    fn model_names(&self) -> Vec<String>;
}

/// In-memory [`ModelRegistry`].
#[derive(Debug, Clone, Default)]
pub struct StaticModelRegistry {
    models: HashMap<String, Vec<String>>,
}

impl StaticModelRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a typed model.
    pub fn register<T: DsisModel>(mut self) -> Self {
        self.models.insert(
            T::MODEL_NAME.to_string(),
            T::FIELD_NAMES.iter().map(|f| f.to_string()).collect(),
        );
        self
    }

    /// Register a model by name.
    pub fn with_model<I, S>(mut self, name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.models
            .insert(name.into(), fields.into_iter().map(Into::into).collect());
        self
    }

    /// Number of registered models.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl ModelRegistry for StaticModelRegistry {
    fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    fn field_names(&self, name: &str) -> Option<Vec<String>> {
        self.models.get(name).cloned()
    }

    fn model_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.models.keys().cloned().collect();
        names.sort();
        names
    }
}
