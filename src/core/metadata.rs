//! CSDL (EDMX 4.0) metadata document generation.
//!
//! The document is a pure function of the frozen registry: entity sets and
//! entity types in registration order, navigation bindings in relationship
//! registration order.

use super::registry::Registry;
use super::types::{Cardinality, EntityType, FieldDescriptor, FieldType, ScalarKind};
use log::{debug, warn};

const EDMX_NS: &str = "http://docs.oasis-open.org/odata/ns/edmx";
const EDM_NS: &str = "http://docs.oasis-open.org/odata/ns/edm";

const VOCABULARIES: [(&str, &str, &str); 2] = [
    (
        "https://sap.github.io/odata-vocabularies/vocabularies/Common.xml",
        "Common",
        "com.sap.vocabularies.Common.v1",
    ),
    (
        "https://oasis-tcs.github.io/odata-vocabularies/vocabularies/Org.OData.Core.V1.xml",
        "Core",
        "Org.OData.Core.V1",
    ),
];

/// Generated document and its weak ETag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataDocument {
    pub xml: String,
    pub etag: String,
}

impl MetadataDocument {
    pub fn new(xml: String) -> Self {
        let etag = etag_of(&xml);
        Self { xml, etag }
    }
}

/// Weak ETag from the first 16 hex digits of the BLAKE3 hash.
pub fn etag_of(xml: &str) -> String {
    let hash = blake3::hash(xml.as_bytes());
    let hex = hash.to_hex();
    let short: String = hex.as_str().chars().take(16).collect();
    format!("W/\"{}\"", short)
}

/// Build the metadata document for every registered entity set.
pub fn generate(registry: &Registry) -> MetadataDocument {
    let ns = registry.namespace();
    let mut out = String::new();

    out.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    out.push_str(&format!("<edmx:Edmx Version=\"4.0\" xmlns:edmx=\"{}\">\n", EDMX_NS));
    for (uri, alias, namespace) in VOCABULARIES {
        out.push_str(&format!("  <edmx:Reference Uri=\"{}\">\n", uri));
        out.push_str(&format!(
            "    <edmx:Include Alias=\"{}\" Namespace=\"{}\"/>\n",
            alias, namespace
        ));
        out.push_str("  </edmx:Reference>\n");
    }
    out.push_str("  <edmx:DataServices>\n");
    out.push_str(&format!(
        "    <Schema xmlns=\"{}\" Namespace=\"{}\">\n",
        EDM_NS,
        escape(ns)
    ));

    out.push_str("      <EntityContainer Name=\"EntityContainer\">\n");
    for entity_type in registry.entity_types() {
        out.push_str(&entity_set_xml(registry, entity_type));
    }
    out.push_str("      </EntityContainer>\n");

    for entity_type in registry.entity_types() {
        out.push_str(&entity_type_xml(registry, entity_type));
    }

    out.push_str("    </Schema>\n");
    out.push_str("  </edmx:DataServices>\n");
    out.push_str("</edmx:Edmx>\n");

    MetadataDocument::new(out)
}

fn entity_set_xml(registry: &Registry, entity_type: &EntityType) -> String {
    let name = escape(&entity_type.name);
    let open = format!(
        "        <EntitySet Name=\"{}\" EntityType=\"{}.{}\"",
        name,
        escape(registry.namespace()),
        name
    );
    let bindings = match registry.relationships(&entity_type.name) {
        Some(rels) if !rels.is_empty() => rels,
        _ => return format!("{}/>\n", open),
    };

    let mut xml = format!("{}>\n", open);
    for (path, rel) in bindings {
        xml.push_str(&format!(
            "          <NavigationPropertyBinding Path=\"{}\" Target=\"{}\"/>\n",
            escape(path),
            escape(&rel.target)
        ));
    }
    xml.push_str("        </EntitySet>\n");
    xml
}

fn entity_type_xml(registry: &Registry, entity_type: &EntityType) -> String {
    let mut xml = format!("      <EntityType Name=\"{}\">\n", escape(&entity_type.name));

    xml.push_str("        <Key>\n");
    for field in entity_type.key_fields() {
        xml.push_str(&format!(
            "          <PropertyRef Name=\"{}\"/>\n",
            escape(field.wire_name())
        ));
    }
    xml.push_str("        </Key>\n");

    for field in &entity_type.fields {
        match &field.field_type {
            FieldType::Scalar(kind) => xml.push_str(&property_xml(entity_type, field, kind)),
            FieldType::Navigation => xml.push_str(&navigation_xml(registry, entity_type, field)),
        }
    }

    xml.push_str("      </EntityType>\n");
    xml
}

fn property_xml(entity_type: &EntityType, field: &FieldDescriptor, kind: &ScalarKind) -> String {
    if let ScalarKind::Other(declared) = kind {
        warn!(
            "{}.{}: unknown scalar kind {:?}, emitting Edm.String",
            entity_type.name, field.name, declared
        );
    }

    let mut xml = format!(
        "        <Property Name=\"{}\" Type=\"Edm.{}\"",
        escape(field.wire_name()),
        kind.edm_name()
    );
    if field.key || field.not_null {
        xml.push_str(" Nullable=\"false\"");
    }
    if let Some(n) = field.max_length {
        xml.push_str(&format!(" MaxLength=\"{}\"", n));
    }
    if let Some(p) = field.precision {
        xml.push_str(&format!(" Precision=\"{}\"", p));
    }
    if let Some(s) = field.scale {
        xml.push_str(&format!(" Scale=\"{}\"", s));
    }
    xml.push_str("/>\n");
    xml
}

fn navigation_xml(registry: &Registry, entity_type: &EntityType, field: &FieldDescriptor) -> String {
    let rel_name = field.relationship_name().unwrap_or(&field.name);
    let Some(rel) = registry.relationship(&entity_type.name, rel_name) else {
        debug!(
            "{}.{}: no registered relationship {}, skipping navigation property",
            entity_type.name, field.name, rel_name
        );
        return String::new();
    };

    let target = format!("{}.{}", escape(registry.namespace()), escape(&rel.target));
    let type_name = match rel.cardinality {
        Cardinality::OneToMany => format!("Collection({})", target),
        Cardinality::OneToOne => target,
    };

    let mut xml = format!(
        "        <NavigationProperty Name=\"{}\" Type=\"{}\"",
        escape(field.wire_name()),
        type_name
    );
    if let Some(partner) = partner_of(registry, &entity_type.name, &rel.target) {
        xml.push_str(&format!(" Partner=\"{}\"", escape(partner)));
    }

    let fk_name = format!("{}_ID", rel_name);
    match entity_type.find_field(&fk_name) {
        Some(fk) => {
            let referenced = registry
                .entity_type(&rel.target)
                .and_then(|t| t.key_fields().next())
                .map_or("ID", |k| k.wire_name());
            xml.push_str(">\n");
            xml.push_str(&format!(
                "          <ReferentialConstraint Property=\"{}\" ReferencedProperty=\"{}\"/>\n",
                escape(fk.wire_name()),
                escape(referenced)
            ));
            xml.push_str("        </NavigationProperty>\n");
        }
        None => xml.push_str("/>\n"),
    }
    xml
}

/// First relationship on `target` pointing back at `entity_set`.
fn partner_of<'r>(registry: &'r Registry, entity_set: &str, target: &str) -> Option<&'r str> {
    registry
        .relationships(target)?
        .iter()
        .find(|(_, rel)| rel.target == entity_set)
        .map(|(name, _)| name.as_str())
}

/// Escape text for use inside a double-quoted XML attribute.
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixtures;
    use crate::core::registry::EntityHandler;
    use crate::core::types::FieldDescriptor;

    fn doc() -> String {
        generate(&fixtures::registry()).xml
    }

    fn position(xml: &str, needle: &str) -> usize {
        xml.find(needle)
            .unwrap_or_else(|| panic!("{} not found in\n{}", needle, xml))
    }

    #[test]
    fn test_header_and_vocabularies() {
        let xml = doc();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(xml.contains("<edmx:Include Alias=\"Common\" Namespace=\"com.sap.vocabularies.Common.v1\"/>"));
        assert!(xml.contains("<edmx:Include Alias=\"Core\" Namespace=\"Org.OData.Core.V1\"/>"));
        assert!(xml.contains("Namespace=\"CatalogService\">"));
        assert!(xml.trim_end().ends_with("</edmx:Edmx>"));
    }

    #[test]
    fn test_entity_sets_in_registration_order() {
        let xml = doc();
        let p = position(&xml, "<EntitySet Name=\"Products\" EntityType=\"CatalogService.Products\">");
        let c = position(&xml, "<EntitySet Name=\"Categories\" EntityType=\"CatalogService.Categories\">");
        let s = position(&xml, "<EntitySet Name=\"Suppliers\"");
        assert!(p < c && c < s);
    }

    #[test]
    fn test_navigation_bindings() {
        let xml = doc();
        let cat = position(&xml, "<NavigationPropertyBinding Path=\"Category\" Target=\"Categories\"/>");
        let sup = position(&xml, "<NavigationPropertyBinding Path=\"Supplier\" Target=\"Suppliers\"/>");
        assert!(cat < sup);
        assert!(xml.contains("<NavigationPropertyBinding Path=\"Products\" Target=\"Products\"/>"));
    }

    #[test]
    fn test_properties() {
        let xml = doc();
        assert!(xml.contains("<PropertyRef Name=\"ID\"/>"));
        assert!(xml.contains("<Property Name=\"ID\" Type=\"Edm.String\" Nullable=\"false\"/>"));
        assert!(xml.contains("<Property Name=\"Name\" Type=\"Edm.String\"/>"));
        assert!(xml.contains("<Property Name=\"Price\" Type=\"Edm.Decimal\"/>"));
        assert!(!xml.contains("<Property Name=\"Category\""));
    }

    #[test]
    fn test_one_to_one_navigation_with_partner_and_constraint() {
        let xml = doc();
        assert!(xml.contains(
            "<NavigationProperty Name=\"Category\" Type=\"CatalogService.Categories\" Partner=\"Products\">"
        ));
        assert!(xml.contains(
            "<ReferentialConstraint Property=\"Category_ID\" ReferencedProperty=\"ID\"/>"
        ));
    }

    #[test]
    fn test_one_to_many_navigation() {
        let xml = doc();
        assert!(xml.contains(
            "<NavigationProperty Name=\"Products\" Type=\"Collection(CatalogService.Products)\" Partner=\"Category\"/>"
        ));
        assert!(xml.contains(
            "<NavigationProperty Name=\"Products\" Type=\"Collection(CatalogService.Products)\" Partner=\"Supplier\"/>"
        ));
    }

    #[test]
    fn test_annotations_and_escaping() {
        let mut b = Registry::builder("Shop");
        b.register_entity(
            EntityType::new("Items")
                .field(FieldDescriptor::int("Code").key())
                .field(FieldDescriptor::string("Label").not_null().max_length(30))
                .field(FieldDescriptor::decimal("Cost").precision(9, 2))
                .field(FieldDescriptor::scalar("Where", ScalarKind::Other("geo".into())))
                .field(FieldDescriptor::string("Q").display_name("a\"b<c")),
            EntityHandler::new(),
        );
        let xml = generate(&b.build()).xml;
        assert!(xml.contains("<EntitySet Name=\"Items\" EntityType=\"Shop.Items\"/>"));
        assert!(xml.contains("<Property Name=\"Code\" Type=\"Edm.Int32\" Nullable=\"false\"/>"));
        assert!(xml.contains(
            "<Property Name=\"Label\" Type=\"Edm.String\" Nullable=\"false\" MaxLength=\"30\"/>"
        ));
        assert!(xml.contains("<Property Name=\"Cost\" Type=\"Edm.Decimal\" Precision=\"9\" Scale=\"2\"/>"));
        assert!(xml.contains("<Property Name=\"Where\" Type=\"Edm.String\"/>"));
        assert!(xml.contains("Name=\"a&quot;b&lt;c\""));
    }

    #[test]
    fn test_unregistered_navigation_emits_nothing() {
        let mut b = Registry::builder("NS");
        b.register_entity(
            EntityType::new("Orders")
                .field(FieldDescriptor::string("ID").key())
                .field(FieldDescriptor::navigation("Customer")),
            EntityHandler::new(),
        );
        let xml = generate(&b.build()).xml;
        assert!(!xml.contains("NavigationProperty"));
    }

    #[test]
    fn test_referenced_property_is_target_key() {
        let mut b = Registry::builder("NS");
        b.register_entity(
            EntityType::new("Orders")
                .field(FieldDescriptor::string("ID").key())
                .field(FieldDescriptor::string("Customer_ID"))
                .field(FieldDescriptor::navigation("Customer")),
            EntityHandler::new(),
        );
        b.register_entity(
            EntityType::new("Customers").field(FieldDescriptor::string("CustomerNo").key()),
            EntityHandler::new(),
        );
        b.register_relationship("Orders", "Customer", "Customers", Cardinality::OneToOne);
        let xml = generate(&b.build()).xml;
        assert!(xml.contains(
            "<NavigationProperty Name=\"Customer\" Type=\"NS.Customers\">"
        ));
        assert!(xml.contains(
            "<ReferentialConstraint Property=\"Customer_ID\" ReferencedProperty=\"CustomerNo\"/>"
        ));
    }

    #[test]
    fn test_deterministic_etag() {
        let a = generate(&fixtures::registry());
        let b = generate(&fixtures::registry());
        assert_eq!(a, b);
        assert!(a.etag.starts_with("W/\""));
        assert_eq!(a.etag.len(), 2 + 1 + 16 + 1);
        assert_ne!(a.etag, etag_of("other"));
    }

    #[test]
    fn test_empty_registry() {
        let xml = generate(&Registry::builder("Empty").build()).xml;
        assert!(xml.contains("<EntityContainer Name=\"EntityContainer\">\n      </EntityContainer>"));
        assert!(!xml.contains("<EntityType"));
    }
}
