//! Error taxonomy for registry lookups and request handling.
//!
//! Malformed query options never surface from the request pipeline; they
//! degrade to defaults. The variant exists for strict parsing only.

use thiserror::Error;

/// Errors surfaced by the core to the HTTP layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ODataError {
    #[error("entity set not found: {0}")]
    EntitySetNotFound(String),

    #[error("{capability} not implemented for entity set {entity_set}")]
    CapabilityNotImplemented {
        entity_set: String,
        capability: &'static str,
    },

    #[error("no {entity_set} record with id {id}")]
    RecordNotFound { entity_set: String, id: String },

    #[error("malformed query option {option}: {value:?}")]
    MalformedQueryOption { option: String, value: String },
}

impl ODataError {
    /// HTTP status the transport should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::EntitySetNotFound(_) | Self::RecordNotFound { .. } => 404,
            Self::CapabilityNotImplemented { .. } => 501,
            Self::MalformedQueryOption { .. } => 400,
        }
    }
}

pub type Result<T> = std::result::Result<T, ODataError>;
