//! odata4rs: OData v4 query options and CSDL metadata for in-memory entity sets.
//!
//! Records keep their declared field order end to end. `$skip`, `$top`,
//! nested `$expand` and path-aware `$select` run against a registry that is
//! frozen before the first request and shared without locks.

pub mod catalog;
pub mod cli;
pub mod core;
pub mod service;
