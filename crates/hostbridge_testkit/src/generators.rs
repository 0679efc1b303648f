//! Property-based test generators using proptest.

use hostbridge_protocol::{DomainObject, PushType, Value};
use proptest::prelude::*;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Strategy for non-nil stable identities.
pub fn guid_strategy() -> impl Strategy<Value = Uuid> {
    (1u128..=u128::MAX).prop_map(Uuid::from_u128)
}

/// Strategy for element type names.
pub fn type_name_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Wall".to_string()),
        Just("Beam".to_string()),
        Just("Column".to_string()),
        Just("Slab".to_string()),
    ]
}

/// Strategy for display names.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][A-Za-z0-9-]{0,11}").expect("Invalid regex")
}

/// Strategy for property values.
pub fn property_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        (-1.0e6f64..1.0e6).prop_map(Value::Float),
        "[a-z ]{0,16}".prop_map(Value::Text),
    ]
}

/// Strategy for property maps.
pub fn properties_strategy() -> impl Strategy<Value = BTreeMap<String, Value>> {
    prop::collection::btree_map("[a-z]{1,8}", property_value_strategy(), 0..5)
}

/// Strategy for plain (non-container) domain objects.
pub fn domain_object_strategy() -> impl Strategy<Value = DomainObject> {
    (
        guid_strategy(),
        type_name_strategy(),
        name_strategy(),
        properties_strategy(),
    )
        .prop_map(|(guid, type_name, name, properties)| {
            let mut object = DomainObject::new(type_name, name).with_guid(guid);
            object.properties = properties;
            object
        })
}

/// Strategy for containers holding one to four plain members.
pub fn container_strategy() -> impl Strategy<Value = DomainObject> {
    (
        guid_strategy(),
        name_strategy(),
        prop::collection::vec(domain_object_strategy(), 1..5),
    )
        .prop_map(|(guid, name, members)| {
            DomainObject::container("Assembly", name, members).with_guid(guid)
        })
}

/// Strategy for batches of plain objects with distinct identities.
pub fn batch_strategy(max: usize) -> impl Strategy<Value = Vec<DomainObject>> {
    prop::collection::vec(domain_object_strategy(), 1..=max.max(1)).prop_map(|objects| {
        let mut seen = std::collections::HashSet::new();
        objects.into_iter().filter(|o| seen.insert(o.guid)).collect()
    })
}

/// Strategy for push types the host executes.
pub fn push_type_strategy() -> impl Strategy<Value = PushType> {
    prop::sample::select(
        PushType::ALL
            .iter()
            .copied()
            .filter(|t| *t != PushType::FullPush)
            .collect::<Vec<_>>(),
    )
}
