//! # dsis-odata
//!
//! OData client for the DSIS data gateway.
//!
//! ## Features
//!
//! - **Query building** - District/field scoping, `$select`, `$expand`,
//!   `$filter` and `$format`
//! - **Pagination** - Follows `odata.nextLink` with an optional page bound,
//!   eagerly or as a lazy stream
//! - **Typed results** - Cast items to any [`DsisModel`]
//! - **Bulk data** - Binary entity payloads, whole or in bounded chunks
//! - **Raw OData** - Arbitrary GETs against the configured model
//!
//! ## Example
//!
//! ```rust,ignore
//! use dsis_auth::DsisConfig;
//! use dsis_odata::{DsisClient, PageBound, QueryBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), dsis_odata::Error> {
//!     let mut client = DsisClient::new(DsisConfig::from_env()?)?;
//!
//!     let query = QueryBuilder::new("OpenWorks_OW_SV4TSTA_SingleSource-OW_SV4TSTA", "SNORRE")
//!         .schema("Well")
//!         .select("well_name,well_uwi")
//!         .filter("well_name eq '34/7-A-1'");
//!
//!     let result = client.execute_query(&query, PageBound::Unbounded).await?;
//!     for item in &result.items {
//!         println!("{}", item["well_name"]);
//!     }
//!
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod gateway;
mod model;
mod pagination;
mod query_builder;

pub use client::{DsisClient, ODataRequest, CONNECTION_TEST_TIMEOUT};
pub use error::{Error, ErrorKind, Result};
pub use gateway::{
    BulkDataStream, RequestGateway, ACCEPT_JSON, ACCEPT_OCTET_STREAM, DEFAULT_CHUNK_SIZE,
};
pub use model::{cast_items, DsisModel, ModelInfo, ModelRegistry, StaticModelRegistry};
pub use pagination::{follow_up_endpoint, Item, Page, PageBound, PageStream, QueryResult};
pub use query_builder::{FieldSpecs, QueryBuilder, SchemaRef, DEFAULT_DATA_FIELD, DEFAULT_FORMAT};
