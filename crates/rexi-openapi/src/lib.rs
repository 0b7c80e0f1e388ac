//! `OpenAPI` endpoint index and dynamic request dispatcher for the Rexi API.
//!
//! This crate is used by `rexi-mcp`, which exposes it over MCP. It holds no transport or
//! protocol logic of its own:
//! - [`catalog`] loads a spec file into an immutable, reloadable [`catalog::Catalog`]
//! - [`dispatcher`] forwards one generic call to the upstream API
//! - [`resources`] serves the raw spec, the routes summary and schema files

pub mod catalog;
pub mod dispatcher;
pub mod document;
pub mod error;
pub mod index;
pub mod resources;
pub mod service;

pub use catalog::{Catalog, CatalogHandle, ReloadOutcome};
pub use dispatcher::{CallRequest, CallResult, Dispatcher, DispatcherConfig};
pub use error::{Result, RexiError};
pub use index::{EndpointDescriptor, EndpointIndex};
pub use resources::{ResourceText, SchemaDirectory};
pub use service::RexiService;
