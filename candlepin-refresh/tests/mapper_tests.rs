mod common;

use candlepin_model::{Content, ContentInfo, Product};
use candlepin_refresh::{ContentMapper, ProductMapper, RefreshError};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

fn make_content(id: &str, name: &str) -> Content {
    Content::new(id, name, "yum", format!("{id}-label"), "Acme")
}

#[test]
fn remapping_an_equal_entity_is_not_dirty() {
    let mut mapper = ContentMapper::new();

    assert!(mapper.add_existing_entity(make_content("c1", "Base")).unwrap());
    assert!(!mapper.add_existing_entity(make_content("c1", "Base")).unwrap());
    assert!(!mapper.is_dirty());
    assert!(mapper.has_entity("c1"));
}

#[test]
fn remapping_a_different_entity_marks_the_id_dirty() {
    let mut mapper = ContentMapper::new();
    mapper.add_existing_entity(make_content("c1", "Base")).unwrap();
    mapper.add_existing_entity(make_content("c2", "Extras")).unwrap();

    assert!(mapper.add_existing_entity(make_content("c1", "Base v2")).unwrap());

    assert!(mapper.is_dirty());
    assert!(mapper.is_dirty_id("c1"));
    assert!(!mapper.is_dirty_id("c2"));
    assert_eq!(mapper.existing_entity("c1").unwrap().name, "Base v2");
}

#[test]
fn imported_and_existing_maps_are_independent() {
    let mut mapper = ContentMapper::new();
    mapper.add_existing_entity(make_content("c1", "Base")).unwrap();
    mapper
        .add_imported_entity(ContentInfo {
            name: Some("Renamed".into()),
            ..ContentInfo::new("c1")
        })
        .unwrap();
    mapper.add_imported_entity(ContentInfo::new("c9")).unwrap();

    assert!(!mapper.is_dirty());
    assert_eq!(mapper.entity_ids(), BTreeSet::from(["c1", "c9"]));
    assert!(mapper.existing_entity("c9").is_none());
    assert!(mapper.imported_entity("c9").is_some());
}

#[test]
fn products_with_matching_uuids_compare_equal() {
    let mut mapper = ProductMapper::new();
    let mut product = Product::new("sku", "Server");
    product.uuid = Some("uuid-1".into());
    mapper.add_existing_entity(product.clone()).unwrap();

    product.name = Some("Server (stale copy)".into());
    assert!(!mapper.add_existing_entity(product.clone()).unwrap());

    product.uuid = Some("uuid-2".into());
    assert!(mapper.add_existing_entity(product).unwrap());
    assert!(mapper.is_dirty_id("sku"));
}

#[test]
fn existing_entity_without_id_is_rejected() {
    let mut mapper = ProductMapper::new();
    let err = mapper.add_existing_entity(Product::new("", "Nameless")).unwrap_err();
    assert!(matches!(err, RefreshError::InvalidArgument(_)));
}

#[test]
fn validating_scope_dirties_foreign_ids() {
    let mut mapper = ContentMapper::new();
    mapper
        .add_existing_entities([make_content("c1", "Base"), make_content("c2", "Extras")])
        .unwrap();

    assert!(mapper.contains_only_existing_entities(["c1", "c2", "c3"]));
    assert!(!mapper.contains_only_existing_entities(["c1"]));
    assert!(!mapper.is_dirty());

    assert!(!mapper.validate_existing_entities(["c1", "c2"]));
    assert!(mapper.validate_existing_entities(["c1"]));
    assert_eq!(mapper.dirty_ids().collect::<Vec<_>>(), vec!["c2"]);
}

#[test]
fn clear_drops_mappings_and_dirty_marks() {
    let mut mapper = ContentMapper::new();
    mapper.add_existing_entity(make_content("c1", "Base")).unwrap();
    mapper.add_existing_entity(make_content("c1", "Other")).unwrap();
    mapper.add_imported_entity(ContentInfo::new("c1")).unwrap();

    mapper.clear_existing_entities();
    assert!(mapper.existing_entity("c1").is_none());
    assert!(mapper.has_entity("c1"));
    assert!(mapper.is_dirty());

    mapper.clear();
    assert!(!mapper.has_entity("c1"));
    assert!(!mapper.is_dirty());
}

proptest! {
    #[test]
    fn dirty_ids_are_exactly_those_mapped_to_differing_values(
        adds in prop::collection::vec((0u8..4, 0u8..3), 0..24),
    ) {
        let mut mapper = ContentMapper::new();
        let mut seen: BTreeMap<String, BTreeSet<u8>> = BTreeMap::new();
        for (id, name) in &adds {
            let id = format!("c{id}");
            mapper.add_existing_entity(make_content(&id, &format!("n{name}"))).unwrap();
            seen.entry(id).or_default().insert(*name);
        }

        let expected: Vec<&str> = seen
            .iter()
            .filter(|(_, names)| names.len() > 1)
            .map(|(id, _)| id.as_str())
            .collect();
        prop_assert_eq!(mapper.dirty_ids().collect::<Vec<_>>(), expected);
        prop_assert_eq!(mapper.entity_ids().len(), seen.len());
    }
}
