//! Products / Categories / Suppliers catalog shared by the core tests.

use super::fields::{FieldList, Value};
use super::registry::{EntityHandler, ExpandCapability, Registry, Related};
use super::types::{Cardinality, EntityType, FieldDescriptor, Record};
use std::sync::LazyLock;

static PRODUCT_TYPE: LazyLock<EntityType> = LazyLock::new(|| {
    EntityType::new("Products")
        .field(FieldDescriptor::string("ID").key())
        .field(FieldDescriptor::string("Name"))
        .field(FieldDescriptor::string("Description"))
        .field(FieldDescriptor::decimal("Price"))
        .field(FieldDescriptor::string("Category_ID").reference("Categories"))
        .field(FieldDescriptor::navigation("Category"))
        .field(FieldDescriptor::string("Supplier_ID").reference("Suppliers"))
        .field(FieldDescriptor::navigation("Supplier"))
        .relationship("Category", "Categories")
        .relationship("Supplier", "Suppliers")
});

static CATEGORY_TYPE: LazyLock<EntityType> = LazyLock::new(|| {
    EntityType::new("Categories")
        .field(FieldDescriptor::string("ID").key())
        .field(FieldDescriptor::string("Name"))
        .field(FieldDescriptor::navigation("Products"))
        .relationship("Products", "Products")
});

static SUPPLIER_TYPE: LazyLock<EntityType> = LazyLock::new(|| {
    EntityType::new("Suppliers")
        .field(FieldDescriptor::string("ID").key())
        .field(FieldDescriptor::string("Name"))
        .field(FieldDescriptor::string("Country"))
        .field(FieldDescriptor::navigation("Products"))
        .relationship("Products", "Products")
});

#[derive(Debug, Clone)]
pub(crate) struct Product {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub price: f64,
    pub category_id: &'static str,
    pub supplier_id: &'static str,
}

impl Record for Product {
    fn entity_type(&self) -> &EntityType {
        &PRODUCT_TYPE
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "ID" => Some(self.id.into()),
            "Name" => Some(self.name.into()),
            "Description" => Some(self.description.into()),
            "Price" => Some(self.price.into()),
            "Category_ID" => Some(self.category_id.into()),
            "Supplier_ID" => Some(self.supplier_id.into()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Category {
    pub id: &'static str,
    pub name: &'static str,
}

impl Record for Category {
    fn entity_type(&self) -> &EntityType {
        &CATEGORY_TYPE
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "ID" => Some(self.id.into()),
            "Name" => Some(self.name.into()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Supplier {
    pub id: &'static str,
    pub name: &'static str,
    pub country: &'static str,
}

impl Record for Supplier {
    fn entity_type(&self) -> &EntityType {
        &SUPPLIER_TYPE
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "ID" => Some(self.id.into()),
            "Name" => Some(self.name.into()),
            "Country" => Some(self.country.into()),
            _ => None,
        }
    }
}

pub(crate) fn products() -> Vec<Product> {
    vec![
        Product {
            id: "1",
            name: "Product A",
            description: "Description A",
            price: 100.0,
            category_id: "1",
            supplier_id: "1",
        },
        Product {
            id: "2",
            name: "Product B",
            description: "Description B",
            price: 200.0,
            category_id: "1",
            supplier_id: "2",
        },
        Product {
            id: "3",
            name: "Product C",
            description: "Description C",
            price: 300.0,
            category_id: "2",
            supplier_id: "1",
        },
    ]
}

pub(crate) fn categories() -> Vec<Category> {
    vec![
        Category { id: "1", name: "Electronics" },
        Category { id: "2", name: "Books" },
    ]
}

pub(crate) fn suppliers() -> Vec<Supplier> {
    vec![
        Supplier { id: "1", name: "Supplier A", country: "USA" },
        Supplier { id: "2", name: "Supplier B", country: "Canada" },
    ]
}

fn key_of(record: &FieldList, field: &str) -> Option<String> {
    record.get(field).and_then(Value::as_key)
}

struct ProductExpand;

impl ExpandCapability for ProductExpand {
    fn expand(&self, record: &FieldList, relationship: &str, _sub_query: &str) -> Option<Related> {
        match relationship {
            "Category" => {
                let id = key_of(record, "Category_ID")?;
                categories().into_iter().find(|c| c.id == id).map(Related::one)
            }
            "Supplier" => {
                let id = key_of(record, "Supplier_ID")?;
                suppliers().into_iter().find(|s| s.id == id).map(Related::one)
            }
            _ => None,
        }
    }
}

struct CategoryExpand;

impl ExpandCapability for CategoryExpand {
    fn expand(&self, record: &FieldList, relationship: &str, _sub_query: &str) -> Option<Related> {
        if relationship != "Products" {
            return None;
        }
        let id = key_of(record, "ID")?;
        Some(Related::many(
            products().into_iter().filter(|p| p.category_id == id),
        ))
    }
}

struct SupplierExpand;

impl ExpandCapability for SupplierExpand {
    fn expand(&self, record: &FieldList, relationship: &str, _sub_query: &str) -> Option<Related> {
        if relationship != "Products" {
            return None;
        }
        let id = key_of(record, "ID")?;
        Some(Related::many(
            products().into_iter().filter(|p| p.supplier_id == id),
        ))
    }
}

fn boxed<R: Record + 'static>(record: R) -> Box<dyn Record> {
    Box::new(record)
}

pub(crate) fn registry() -> Registry {
    let mut b = Registry::builder("CatalogService");
    b.register_entity(
        PRODUCT_TYPE.clone(),
        EntityHandler::new()
            .with_collection(|| products().into_iter().map(boxed).collect())
            .with_by_id(|id| products().into_iter().find(|p| p.id == id).map(boxed))
            .with_expand(ProductExpand),
    );
    b.register_entity(
        CATEGORY_TYPE.clone(),
        EntityHandler::new()
            .with_collection(|| categories().into_iter().map(boxed).collect())
            .with_by_id(|id| categories().into_iter().find(|c| c.id == id).map(boxed))
            .with_expand(CategoryExpand),
    );
    b.register_entity(
        SUPPLIER_TYPE.clone(),
        EntityHandler::new()
            .with_collection(|| suppliers().into_iter().map(boxed).collect())
            .with_expand(SupplierExpand),
    );
    b.register_relationship("Products", "Category", "Categories", Cardinality::OneToOne)
        .register_relationship("Products", "Supplier", "Suppliers", Cardinality::OneToOne)
        .register_relationship("Categories", "Products", "Products", Cardinality::OneToMany)
        .register_relationship("Suppliers", "Products", "Products", Cardinality::OneToMany);
    b.build()
}
