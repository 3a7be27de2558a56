//! Core OData logic: field model, query options, registry, expansion,
//! projection, envelopes, and metadata.

pub mod error;
pub mod expand;
pub mod fields;
pub mod introspect;
pub mod metadata;
pub mod parser;
pub mod pipeline;
pub mod registry;
pub mod response;
pub mod select;
pub mod types;

#[cfg(test)]
pub(crate) mod fixtures;

pub use error::{ODataError, Result};
pub use fields::{FieldList, Scalar, Value};
pub use parser::{ExpandItem, QueryOptions};
pub use registry::{EntityHandler, ExpandCapability, NoExpand, Registry, RegistryBuilder, Related};
pub use types::{Cardinality, EntityType, FieldDescriptor, FieldType, Record, ScalarKind};
