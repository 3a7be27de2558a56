//! Transport-neutral request handling over a frozen registry.
//!
//! [`Service::handle`] takes a resource path and a raw query string and
//! returns status, content type and body. Binding it to an HTTP server is
//! left to the embedding application.

use crate::core::error::{ODataError, Result};
use crate::core::metadata::{generate, MetadataDocument};
use crate::core::parser::QueryOptions;
use crate::core::pipeline::{apply_collection, apply_single};
use crate::core::registry::Registry;
use crate::core::response::{CollectionEnvelope, EntityEnvelope};
use log::debug;
use std::sync::Arc;

pub const ODATA_VERSION: &str = "4.0";
pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_XML: &str = "application/xml";
pub const CONTENT_TYPE_TEXT: &str = "text/plain; charset=utf-8";

/// Path prefix stripped before route resolution.
const BASE_PATH: &str = "odata/v4/";

// ============================================================================
// Routes
// ============================================================================

/// A resolved resource path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route<'a> {
    Metadata,
    Collection(&'a str),
    Entity(&'a str, &'a str),
}

/// Resolve `$metadata`, `Set`, `Set(id)`, `Set('id')` and `Set/id`.
pub fn resolve(path: &str) -> Option<Route<'_>> {
    let path = path.trim().trim_matches('/');
    let path = path.strip_prefix(BASE_PATH).unwrap_or(path);
    if path.is_empty() {
        return None;
    }
    if path == "$metadata" {
        return Some(Route::Metadata);
    }

    if let Some(open) = path.find('(') {
        let set = &path[..open];
        let id = path[open + 1..].strip_suffix(')')?;
        return entity_route(set, id);
    }
    match path.split_once('/') {
        Some((set, id)) => entity_route(set, id),
        None => Some(Route::Collection(path)),
    }
}

fn entity_route<'a>(set: &'a str, id: &'a str) -> Option<Route<'a>> {
    let id = id.trim();
    let id = id
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .unwrap_or(id);
    if set.is_empty() || id.is_empty() || id.contains('/') {
        return None;
    }
    Some(Route::Entity(set, id))
}

// ============================================================================
// Service
// ============================================================================

/// Status, content type and body of one answered request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
    /// Response headers beyond the content type
    pub headers: Vec<(&'static str, String)>,
}

impl ServiceResponse {
    fn new(status: u16, content_type: &'static str, body: String) -> Self {
        Self {
            status,
            content_type,
            body,
            headers: vec![("OData-Version", ODATA_VERSION.to_string())],
        }
    }

    fn error(err: &ODataError) -> Self {
        Self::new(err.status_code(), CONTENT_TYPE_TEXT, err.to_string())
    }

    fn not_found(path: &str) -> Self {
        Self::new(404, CONTENT_TYPE_TEXT, format!("no resource at {}", path))
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// OData service over a frozen registry. Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct Service {
    registry: Arc<Registry>,
    metadata: Arc<MetadataDocument>,
}

impl Service {
    pub fn new(registry: Registry) -> Self {
        Self::from_shared(Arc::new(registry))
    }

    pub fn from_shared(registry: Arc<Registry>) -> Self {
        let metadata = Arc::new(generate(&registry));
        Self { registry, metadata }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn metadata(&self) -> &MetadataDocument {
        &self.metadata
    }

    /// Collection request: page, expand, project.
    pub fn get_collection(&self, entity_set: &str, raw_query: &str) -> Result<CollectionEnvelope> {
        let handler = self.registry.handler(entity_set)?;
        let fetch = handler
            .collection
            .as_ref()
            .ok_or_else(|| ODataError::CapabilityNotImplemented {
                entity_set: entity_set.to_string(),
                capability: "collection fetch",
            })?;
        let options = QueryOptions::parse(raw_query);
        let records = fetch();
        debug!("{}: {} records before paging", entity_set, records.len());
        let value = apply_collection(&self.registry, &records, &options);
        Ok(CollectionEnvelope::new(entity_set, value))
    }

    /// Single-entity request: expand, project.
    pub fn get_entity(&self, entity_set: &str, id: &str, raw_query: &str) -> Result<EntityEnvelope> {
        let handler = self.registry.handler(entity_set)?;
        let fetch = handler
            .by_id
            .as_ref()
            .ok_or_else(|| ODataError::CapabilityNotImplemented {
                entity_set: entity_set.to_string(),
                capability: "by-id fetch",
            })?;
        let record = fetch(id).ok_or_else(|| ODataError::RecordNotFound {
            entity_set: entity_set.to_string(),
            id: id.to_string(),
        })?;
        let options = QueryOptions::parse(raw_query);
        let entity = apply_single(&self.registry, record.as_ref(), &options);
        Ok(EntityEnvelope::new(entity_set, entity))
    }

    /// Answer a request for `path` with query string `raw_query`.
    pub fn handle(&self, path: &str, raw_query: &str) -> ServiceResponse {
        let Some(route) = resolve(path) else {
            return ServiceResponse::not_found(path);
        };
        debug!("{} -> {:?}", path, route);

        match route {
            Route::Metadata => {
                let mut response =
                    ServiceResponse::new(200, CONTENT_TYPE_XML, self.metadata.xml.clone());
                response.headers.push(("ETag", self.metadata.etag.clone()));
                response
            }
            Route::Collection(set) => match self.get_collection(set, raw_query) {
                Ok(envelope) => json_response(envelope.to_json()),
                Err(e) => ServiceResponse::error(&e),
            },
            Route::Entity(set, id) => match self.get_entity(set, id, raw_query) {
                Ok(envelope) => json_response(envelope.to_json()),
                Err(e) => ServiceResponse::error(&e),
            },
        }
    }
}

fn json_response(body: std::result::Result<String, serde_json::Error>) -> ServiceResponse {
    match body {
        Ok(body) => ServiceResponse::new(200, CONTENT_TYPE_JSON, body),
        Err(e) => ServiceResponse::new(500, CONTENT_TYPE_TEXT, format!("serialization error: {}", e)),
    }
}
