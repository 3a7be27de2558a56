//! YAML-defined services backed by in-memory records.

pub mod definition;
pub mod store;

pub use definition::{
    parse_definition, parse_definition_file, validate_definition, ServiceDefinition,
    ValidationError,
};
pub use store::{build_registry, Dataset, DynamicRecord, ForeignKeyExpand};

/// Service definition written by `odata4rs init`.
pub const DEMO_DEFINITION: &str = r#"# odata4rs service definition
version: "1.0"
namespace: CatalogService
description: Demo product catalog

entity_sets:
  Products:
    fields:
      - { name: ID, type: string, key: true }
      - { name: Name, type: string, max_length: 30 }
      - { name: Description, type: string }
      - { name: Price, type: decimal, precision: 9, scale: 2 }
      - { name: Category_ID, type: string, ref: Categories }
      - { name: Category, type: navigation }
      - { name: Supplier_ID, type: string, ref: Suppliers }
      - { name: Supplier, type: navigation }
    records:
      - { ID: "1", Name: "Product A", Description: "Description A", Price: 100.0, Category_ID: "1", Supplier_ID: "1" }
      - { ID: "2", Name: "Product B", Description: "Description B", Price: 200.0, Category_ID: "1", Supplier_ID: "2" }
      - { ID: "3", Name: "Product C", Description: "Description C", Price: 300.0, Category_ID: "2", Supplier_ID: "1" }

  Categories:
    fields:
      - { name: ID, type: string, key: true }
      - { name: Name, type: string, max_length: 111 }
      - { name: Products, type: navigation }
    records:
      - { ID: "1", Name: "Electronics" }
      - { ID: "2", Name: "Books" }

  Suppliers:
    fields:
      - { name: ID, type: string, key: true }
      - { name: Name, type: string }
      - { name: Country, type: string }
      - { name: Products, type: navigation }
    capabilities:
      by_id: false
    records:
      - { ID: "1", Name: "Supplier A", Country: "USA" }
      - { ID: "2", Name: "Supplier B", Country: "Canada" }

  Customers:
    fields:
      - { name: ID, type: string, key: true }
      - { name: Name, type: string, not_null: true }
    capabilities:
      collection: false
      by_id: false

relationships:
  - { from: Products, name: Category, target: Categories, cardinality: one-to-one }
  - { from: Products, name: Supplier, target: Suppliers, cardinality: one-to-one }
  - { from: Categories, name: Products, target: Products, cardinality: one-to-many }
  - { from: Suppliers, name: Products, target: Products, cardinality: one-to-many }
"#;
