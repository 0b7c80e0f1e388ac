//! One object exposing every Rexi operation to a host.

use crate::catalog::{Catalog, CatalogHandle};
use crate::dispatcher::{CallRequest, CallResult, Dispatcher};
use crate::error::Result;
use crate::index::EndpointDescriptor;
use crate::resources::{self, ResourceText, SchemaDirectory};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct RexiService {
    catalog: Arc<CatalogHandle>,
    schemas: SchemaDirectory,
    dispatcher: Dispatcher,
}

impl RexiService {
    #[must_use]
    pub fn new(catalog: Arc<CatalogHandle>, schemas: SchemaDirectory, dispatcher: Dispatcher) -> Self {
        Self {
            catalog,
            schemas,
            dispatcher,
        }
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<Catalog> {
        self.catalog.current()
    }

    #[must_use]
    pub fn catalog_handle(&self) -> &Arc<CatalogHandle> {
        &self.catalog
    }

    #[must_use]
    pub fn schemas(&self) -> &SchemaDirectory {
        &self.schemas
    }

    #[must_use]
    pub fn list_endpoints(&self, tag: Option<&str>) -> Vec<EndpointDescriptor> {
        self.catalog.current().endpoints().filter(tag)
    }

    /// Dispatch one call against the current catalog's base URL (or the configured override).
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::call`].
    pub async fn call(&self, request: &CallRequest) -> Result<CallResult> {
        let catalog = self.catalog.current();
        self.dispatcher.call(catalog.base_url(), request).await
    }

    /// # Errors
    ///
    /// Returns an error if the spec file exists but cannot be read.
    pub async fn openapi_text(&self) -> Result<ResourceText> {
        let catalog = self.catalog.current();
        resources::read_spec_text(catalog.spec_path()).await
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn routes_json(&self) -> Result<String> {
        resources::routes_json(self.catalog.current().endpoints())
    }

    #[must_use]
    pub fn schema_names(&self) -> Vec<String> {
        self.schemas.list()
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn schemas_json(&self) -> Result<String> {
        self.schemas.list_json()
    }

    /// # Errors
    ///
    /// Returns an error if the schema file resolves but cannot be read.
    pub async fn schema(&self, name: &str) -> Result<ResourceText> {
        self.schemas.read(name).await
    }
}
