//! Tests for #[derive(EntityId)] macro

use composable_aggregate_core::entity_id::{AnyEntityId, EntityId, EntityType, TypedEntityId};
use composable_aggregate_macros::EntityId;
use uuid::Uuid;

#[derive(EntityId, Clone, Debug, PartialEq)]
#[entity_type = "Vendor"]
struct VendorId(Uuid);

#[derive(EntityId, Clone, Debug, PartialEq)]
struct LineId(u32);

#[derive(EntityId, Clone, Debug, PartialEq)]
struct Sku(String);

#[test]
fn test_explicit_entity_type() {
    assert_eq!(VendorId::ENTITY_TYPE, EntityType::new("Vendor"));

    let uuid = Uuid::nil();
    assert_eq!(VendorId(uuid).entity_type().as_str(), "Vendor");
}

#[test]
fn test_default_entity_type_strips_id_suffix() {
    assert_eq!(LineId::ENTITY_TYPE.as_str(), "Line");
    assert_eq!(Sku::ENTITY_TYPE.as_str(), "Sku");
}

#[test]
fn test_renders_type_and_raw_value() {
    let id = VendorId(Uuid::nil());

    assert_eq!(id.raw_id(), "00000000-0000-0000-0000-000000000000");
    assert_eq!(
        id.as_string(),
        "Vendor 00000000-0000-0000-0000-000000000000"
    );
    assert_eq!(LineId(12).as_string(), "Line 12");
}

#[test]
fn test_from_raw_parses_field() {
    assert_eq!(LineId::from_raw("12"), Some(LineId(12)));
    assert_eq!(LineId::from_raw("twelve"), None);
    assert_eq!(Sku::from_raw("ABC-1"), Some(Sku("ABC-1".to_string())));

    let uuid = Uuid::new_v4();
    assert_eq!(VendorId::from_raw(&uuid.to_string()), Some(VendorId(uuid)));
}

#[test]
fn test_erased_identifiers_compare_by_type_and_value() {
    let line = AnyEntityId::new(LineId(1));

    assert_eq!(line, AnyEntityId::new(LineId(1)));
    assert_ne!(line, AnyEntityId::new(Sku("1".to_string())));
    assert_eq!(line.downcast_ref::<LineId>(), Some(&LineId(1)));
}
