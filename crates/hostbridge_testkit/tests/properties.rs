//! Property tests over whole push/pull sessions.

use hostbridge_testkit::prelude::*;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn pushed_batches_pull_back(batch in batch_strategy(8)) {
        let bridge = TestBridge::local();
        let applied = bridge
            .adapter
            .push(&batch, PushType::UpdateOrCreateOnly, "", None);
        prop_assert_eq!(guids(&applied), guids(&batch));

        let pulled = bridge.adapter.pull(&FilterQuery::all());
        prop_assert_eq!(guids(&pulled), guids(&batch));
        for object in &pulled {
            let original = batch.iter().find(|o| o.guid == object.guid).unwrap();
            prop_assert_eq!(&object.name, &original.name);
            prop_assert_eq!(&object.properties, &original.properties);
        }
    }

    #[test]
    fn create_only_twice_changes_nothing(batch in batch_strategy(6)) {
        let bridge = TestBridge::local();
        bridge.adapter.push(&batch, PushType::CreateOnly, "", None);
        let before = bridge.workspace.entities();

        let again = bridge.adapter.push(&batch, PushType::CreateOnly, "", None);
        prop_assert!(again.is_empty());
        prop_assert_eq!(bridge.workspace.entities(), before);
    }

    #[test]
    fn entity_count_matches_batch(batch in batch_strategy(6), push_type in push_type_strategy()) {
        let bridge = TestBridge::local();
        bridge.adapter.push(&batch, PushType::CreateOnly, "", None);
        bridge.adapter.push(&batch, push_type, "", None);
        prop_assert_eq!(bridge.workspace.len(), batch.len());
        prop_assert_eq!(bridge.sink.count(Severity::Error), 0);
    }

    #[test]
    fn containers_keep_their_members(container in container_strategy()) {
        let bridge = TestBridge::local();
        let applied = bridge
            .adapter
            .push(&[container.clone()], PushType::CreateOnly, "", None);
        prop_assert_eq!(applied.len(), 1);

        let id = applied[0].host_id.unwrap();
        let entity = bridge.workspace.get(id).unwrap();
        prop_assert_eq!(entity.members.len(), container.members.len());
        prop_assert_eq!(bridge.workspace.len(), container.members.len() + 1);
    }
}
