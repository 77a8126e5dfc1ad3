//! Fluent OData query builder.
//!
//! A [`QueryBuilder`] carries everything needed to address one DSIS entity
//! set: the location (district and field), the schema, and the `$select`,
//! `$expand`, `$filter` and `$format` options. It can also be narrowed to a
//! single record's bulk data field with [`QueryBuilder::entity`].
//!
//! # Example
//!
//! ```rust,ignore
//! use dsis_odata::QueryBuilder;
//!
//! let query = QueryBuilder::new("OpenWorks_OW_SV4TSTA_SingleSource-OW_SV4TSTA", "SNORRE")
//!     .schema("Well")
//!     .select("well_name,well_uwi")
//!     .filter("depth gt 1000");
//!
//! assert_eq!(
//!     query.get_query_string()?,
//!     "Well?%24format=json&%24select=well_name%2Cwell_uwi&%24filter=depth+gt+1000"
//! );
//! ```

use std::fmt;

use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{DsisModel, ModelInfo};

/// Default response format.
pub const DEFAULT_FORMAT: &str = "json";

/// Default bulk data field of an entity.
pub const DEFAULT_DATA_FIELD: &str = "data";

/// The schema a query targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaRef {
    /// Schema known only by name.
    Named(String),
    /// Schema backed by a [`DsisModel`] type, so results can be cast.
    Typed(ModelInfo),
}

impl SchemaRef {
    /// Entity name used in the URL.
    pub fn name(&self) -> &str {
        match self {
            SchemaRef::Named(name) => name,
            SchemaRef::Typed(info) => info.name(),
        }
    }

    /// Model handle, if the schema is typed.
    pub fn model(&self) -> Option<&ModelInfo> {
        match self {
            SchemaRef::Named(_) => None,
            SchemaRef::Typed(info) => Some(info),
        }
    }
}

/// Things that can be passed to [`QueryBuilder::select`] and
/// [`QueryBuilder::expand`].
///
/// Each element may itself be a comma-separated list.
pub trait FieldSpecs {
    /// The raw, unsplit specs.
    fn into_specs(self) -> Vec<String>;
}

impl FieldSpecs for &str {
    fn into_specs(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl FieldSpecs for String {
    fn into_specs(self) -> Vec<String> {
        vec![self]
    }
}

impl<S: AsRef<str>> FieldSpecs for &[S] {
    fn into_specs(self) -> Vec<String> {
        self.iter().map(|s| s.as_ref().to_string()).collect()
    }
}

impl<S: AsRef<str>, const N: usize> FieldSpecs for [S; N] {
    fn into_specs(self) -> Vec<String> {
        self.iter().map(|s| s.as_ref().to_string()).collect()
    }
}

impl<S: AsRef<str>> FieldSpecs for Vec<S> {
    fn into_specs(self) -> Vec<String> {
        self.iter().map(|s| s.as_ref().to_string()).collect()
    }
}

fn split_specs(specs: impl FieldSpecs) -> impl Iterator<Item = String> {
    specs.into_specs().into_iter().flat_map(|spec| {
        spec.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>()
    })
}

/// Fluent builder for DSIS OData queries.
///
/// District and field are fixed at construction and survive [`reset`].
///
/// [`reset`]: QueryBuilder::reset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryBuilder {
    district_id: Option<String>,
    field: Option<String>,
    schema: Option<SchemaRef>,
    select: Vec<String>,
    expand: Vec<String>,
    filter: Option<String>,
    format: String,
    native_uid: Option<String>,
    data_field: String,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self {
            district_id: None,
            field: None,
            schema: None,
            select: Vec::new(),
            expand: Vec::new(),
            filter: None,
            format: DEFAULT_FORMAT.to_string(),
            native_uid: None,
            data_field: DEFAULT_DATA_FIELD.to_string(),
        }
    }
}

impl QueryBuilder {
    /// Create a builder for a district and field.
    pub fn new(district_id: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            district_id: Some(district_id.into()),
            field: Some(field.into()),
            ..Self::default()
        }
    }

    /// Create a builder whose endpoint has no district or field segments.
    pub fn unscoped() -> Self {
        Self::default()
    }

    /// Create a builder with only a district segment.
    pub fn for_district(district_id: impl Into<String>) -> Self {
        Self {
            district_id: Some(district_id.into()),
            ..Self::default()
        }
    }

    /// Set the schema by name, e.g. `"Well"`.
    pub fn schema(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        debug!(schema = %name, "Set schema");
        self.schema = Some(SchemaRef::Named(name));
        self
    }

    /// Set the schema from a model type, enabling typed results.
    pub fn schema_model<T: DsisModel>(mut self) -> Self {
        debug!(schema = T::MODEL_NAME, "Set typed schema");
        self.schema = Some(SchemaRef::Typed(ModelInfo::of::<T>()));
        self
    }

    /// Append fields to `$select`.
    ///
    /// `select("a,b")`, `select(["a", "b"])` and `.select("a").select("b")`
    /// are equivalent. Repeated names are kept.
    pub fn select(mut self, fields: impl FieldSpecs) -> Self {
        self.select.extend(split_specs(fields));
        self
    }

    /// Append relations to `$expand`, with the same splitting as [`select`].
    ///
    /// [`select`]: QueryBuilder::select
    pub fn expand(mut self, relations: impl FieldSpecs) -> Self {
        self.expand.extend(split_specs(relations));
        self
    }

    /// Set `$filter`, replacing any previous expression.
    pub fn filter(mut self, expr: impl Into<String>) -> Self {
        self.filter = Some(expr.into());
        self
    }

    /// Set `$format`.
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    /// Target one record's bulk data field.
    pub fn entity(mut self, native_uid: impl Into<String>, data_field: impl Into<String>) -> Result<Self> {
        let native_uid = native_uid.into();
        if native_uid.trim().is_empty() {
            return Err(Error::invalid_query("native_uid must be a non-empty string"));
        }
        self.native_uid = Some(native_uid);
        self.data_field = data_field.into();
        Ok(self)
    }

    /// Target one record's default `data` field.
    pub fn entity_uid(self, native_uid: impl Into<String>) -> Result<Self> {
        self.entity(native_uid, DEFAULT_DATA_FIELD)
    }

    /// Clear schema, options and entity target. District and field stay.
    pub fn reset(&mut self) {
        *self = Self {
            district_id: self.district_id.take(),
            field: self.field.take(),
            ..Self::default()
        };
        debug!("Reset query builder");
    }

    /// Ordered OData parameters: `$format` always, then `$select`,
    /// `$expand` and `$filter` when set.
    pub fn build_query_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("$format".to_string(), self.format.clone())];

        if !self.select.is_empty() {
            params.push(("$select".to_string(), self.select.join(",")));
        }
        if !self.expand.is_empty() {
            params.push(("$expand".to_string(), self.expand.join(",")));
        }
        if let Some(filter) = self.filter.as_deref().filter(|f| !f.is_empty()) {
            params.push(("$filter".to_string(), filter.to_string()));
        }

        params
    }

    /// Form-encoded parameters without the schema, e.g. `%24format=json`.
    pub fn get_query_params_string(&self) -> Result<String> {
        Ok(serde_urlencoded::to_string(self.build_query_params())?)
    }

    /// `<schema>?<encoded params>`.
    pub fn get_query_string(&self) -> Result<String> {
        let schema = self.require_schema()?;
        Ok(format!("{}?{}", schema, self.get_query_params_string()?))
    }

    /// Endpoint path relative to the data endpoint:
    /// `<model>/<version>[/<district>][/<field>]/<schema>`, with the last
    /// segment replaced by `<schema>('<uid>')/<data_field>` when an entity
    /// is targeted.
    pub fn build_endpoint(&self, model_name: &str, model_version: &str) -> Result<String> {
        let schema = self.require_schema()?;

        let mut segments = vec![model_name.to_string(), model_version.to_string()];
        if let Some(district) = &self.district_id {
            segments.push(district.clone());
        }
        if let Some(field) = &self.field {
            segments.push(field.clone());
        }
        match &self.native_uid {
            Some(uid) => segments.push(format!("{}('{}')/{}", schema, uid, self.data_field)),
            None => segments.push(schema.to_string()),
        }

        Ok(segments.join("/"))
    }

    fn require_schema(&self) -> Result<&str> {
        self.schema_name()
            .ok_or_else(|| Error::invalid_query("schema must be set before getting query string"))
    }

    /// District segment.
    pub fn district_id(&self) -> Option<&str> {
        self.district_id.as_deref()
    }

    /// Field segment.
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// The schema reference, if set.
    pub fn schema_ref(&self) -> Option<&SchemaRef> {
        self.schema.as_ref()
    }

    /// Schema name, if set and non-empty.
    pub fn schema_name(&self) -> Option<&str> {
        self.schema
            .as_ref()
            .map(SchemaRef::name)
            .filter(|name| !name.is_empty())
    }

    /// Model handle, if the schema is typed.
    pub fn model(&self) -> Option<&ModelInfo> {
        self.schema.as_ref().and_then(SchemaRef::model)
    }

    /// Targeted record key.
    pub fn native_uid(&self) -> Option<&str> {
        self.native_uid.as_deref()
    }

    /// Targeted bulk data field.
    pub fn data_field(&self) -> &str {
        &self.data_field
    }

    /// Returns true if a record's bulk data is targeted.
    pub fn has_entity(&self) -> bool {
        self.native_uid.is_some()
    }

    pub fn select_fields(&self) -> &[String] {
        &self.select
    }

    pub fn expand_relations(&self) -> &[String] {
        &self.expand
    }

    pub fn filter_expr(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    pub fn format_tag(&self) -> &str {
        &self.format
    }
}

impl fmt::Display for QueryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get_query_string() {
            Ok(query) => f.write_str(&query),
            Err(_) => write!(
                f,
                "QueryBuilder(district_id={}, field={}, schema=None)",
                self.district_id.as_deref().unwrap_or("None"),
                self.field.as_deref().unwrap_or("None"),
            ),
        }
    }
}
