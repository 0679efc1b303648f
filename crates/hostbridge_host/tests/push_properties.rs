//! Property tests for the push engine against the in-memory workspace.

use hostbridge_host::{
    AdapterRegistry, CallContext, JournalEntry, MemoryWorkspace, PushEngine, Workspace,
};
use hostbridge_protocol::{DomainObject, PushConfig, PushType};
use proptest::prelude::*;
use uuid::Uuid;

fn push(
    ws: &MemoryWorkspace,
    objects: Vec<DomainObject>,
    push_type: PushType,
) -> Vec<DomainObject> {
    let adapters = AdapterRegistry::generic();
    let mut ctx = CallContext::for_push(PushConfig::default(), "");
    PushEngine::new(ws, &adapters).push(&mut ctx, objects, push_type)
}

fn push_types() -> impl Strategy<Value = Vec<PushType>> {
    let executable = prop::sample::select(vec![
        PushType::AdapterDefault,
        PushType::CreateOnly,
        PushType::CreateNonExisting,
        PushType::UpdateOnly,
        PushType::DeleteThenCreate,
        PushType::UpdateOrCreateOnly,
    ]);
    prop::collection::vec(executable, 1..4)
}

fn batch() -> impl Strategy<Value = Vec<DomainObject>> {
    prop::collection::btree_set(1u128..1_000_000, 1..6).prop_map(|ids| {
        ids.into_iter()
            .map(|id| {
                DomainObject::new("Wall", format!("W{id}"))
                    .with_guid(Uuid::from_u128(id))
                    .with_property("height", (id % 7) as i64)
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn transactions_always_close(objects in batch(), types in push_types()) {
        let ws = MemoryWorkspace::new();
        for push_type in types {
            push(&ws, objects.clone(), push_type);
            prop_assert!(!ws.in_transaction());
        }

        let mut depth = 0i32;
        for entry in ws.journal() {
            match entry {
                JournalEntry::Begin(_) => depth += 1,
                JournalEntry::Commit(_) | JournalEntry::Rollback(_) => depth -= 1,
                _ => prop_assert_eq!(depth, 1),
            }
            prop_assert!((0..=1).contains(&depth));
        }
        prop_assert_eq!(depth, 0);
    }

    #[test]
    fn one_entity_per_identity(objects in batch(), types in push_types()) {
        let ws = MemoryWorkspace::new();
        push(&ws, objects.clone(), PushType::CreateOnly);
        for push_type in types {
            push(&ws, objects.clone(), push_type);
        }
        prop_assert_eq!(ws.len(), objects.len());
        for object in &objects {
            prop_assert!(ws.find_by_guid(object.guid).is_some());
        }
    }

    #[test]
    fn update_only_on_empty_document_writes_nothing(objects in batch()) {
        let ws = MemoryWorkspace::new();
        let applied = push(&ws, objects, PushType::UpdateOnly);
        prop_assert!(applied.is_empty());
        prop_assert!(ws.is_empty());
    }

    #[test]
    fn native_ids_only_grow(objects in batch(), rounds in 1usize..4) {
        let ws = MemoryWorkspace::new();
        let mut last = 0;
        for _ in 0..rounds {
            for object in push(&ws, objects.clone(), PushType::DeleteThenCreate) {
                let id = object.host_id.unwrap();
                prop_assert!(id > last);
                last = id;
            }
        }
    }
}
