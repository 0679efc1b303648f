//! Push reconciliation.
//!
//! For every pushed object the engine looks up the live entity with the
//! same identity and, depending on the push intent, creates, updates,
//! replaces or skips it. Containers need their members on the host before
//! they can be built, so a push runs in ordered phases, each inside its own
//! transaction:
//!
//! 1. plain objects,
//! 2. members of every container, flattened,
//! 3. containers: a create pass that builds empty shells, then an update
//!    pass that fills them in.
//!
//! A phase with nothing to do opens no transaction. One object failing
//! never aborts the rest of the batch.

use crate::adapter::{AdapterRegistry, ElementAdapter};
use crate::cache::{CacheKey, CacheValue, RefCache};
use crate::context::CallContext;
use crate::error::HostResult;
use crate::workspace::{ensure_ready, FailureSuppression, TransactionScope, Workspace};
use hostbridge_protocol::{DomainObject, ExternalId, NativeId, PushIntent, PushType};
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

/// Error event for an empty batch.
pub const INVALID_INPUT: &str = "Input objects were invalid.";

/// What happened to one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A new entity was created.
    Created(NativeId),
    /// The existing entity was updated in place.
    Updated(NativeId),
    /// The existing entity was deleted and a new one created.
    Replaced(NativeId),
    /// An entity produced earlier in the same call was reused.
    Reused(NativeId),
    /// Nothing to do under this intent.
    Skipped,
    /// The object could not be applied; an event says why.
    Failed,
}

impl Outcome {
    /// Native id of the entity now representing the object.
    pub fn native_id(self) -> Option<NativeId> {
        match self {
            Outcome::Created(id)
            | Outcome::Updated(id)
            | Outcome::Replaced(id)
            | Outcome::Reused(id) => Some(id),
            Outcome::Skipped | Outcome::Failed => None,
        }
    }
}

/// Runs pushes against a workspace.
pub struct PushEngine<'a> {
    workspace: &'a dyn Workspace,
    adapters: &'a AdapterRegistry,
}

impl<'a> PushEngine<'a> {
    /// Creates an engine.
    pub fn new(workspace: &'a dyn Workspace, adapters: &'a AdapterRegistry) -> Self {
        Self {
            workspace,
            adapters,
        }
    }

    /// Pushes `objects` and returns the ones applied, with host ids set.
    ///
    /// Problems are recorded in `ctx.events`. A call that cannot start at
    /// all (unsupported intent, document not ready, empty batch) records one
    /// error and returns nothing.
    pub fn push(
        &self,
        ctx: &mut CallContext,
        objects: Vec<DomainObject>,
        push_type: PushType,
    ) -> Vec<DomainObject> {
        let intent = match push_type.resolve() {
            Ok(intent) => intent,
            Err(e) => {
                ctx.events.error(e.to_string());
                return Vec::new();
            }
        };
        if push_type == PushType::AdapterDefault {
            ctx.events.note(format!("push type {push_type} resolved to {intent}"));
        }

        if let Err(e) = ensure_ready(self.workspace, true) {
            ctx.events.error(e.to_string());
            return Vec::new();
        }

        if objects.is_empty() {
            ctx.events.error(INVALID_INPUT);
            return Vec::new();
        }

        let objects = self.prepare(ctx, objects);

        let _suppression = ctx
            .config
            .suppress_failure_messages
            .then(|| FailureSuppression::enable(self.workspace));

        let mut applied = Vec::new();
        if let Err(e) = self.run(ctx, objects, intent, &mut applied) {
            // Phases committed before the failure stay applied.
            ctx.events.error(format!("push aborted: {e}"));
        }
        for object in &mut applied {
            stamp_host_ids(object, &ctx.cache);
        }
        tracing::info!(applied = applied.len(), "push finished");
        applied
    }

    /// Tags objects and gives nil identities a guid. Anonymous objects
    /// sharing a type and name within the call share one guid.
    fn prepare(&self, ctx: &mut CallContext, objects: Vec<DomainObject>) -> Vec<DomainObject> {
        fn visit(ctx: &mut CallContext, object: &mut DomainObject) {
            if object.guid.is_nil() {
                let key = CacheKey::named(&object.type_name, &object.name);
                match ctx.cache.get(&key).and_then(CacheValue::as_domain) {
                    Some(seen) => object.guid = seen.guid,
                    None => {
                        object.guid = Uuid::new_v4();
                        ctx.events.note(format!(
                            "{} '{}' had no identity, assigned {}",
                            object.type_name, object.name, object.guid
                        ));
                        ctx.cache.put(key, CacheValue::Domain(object.clone()));
                    }
                }
            }
            if !ctx.tag.is_empty() {
                object.tags.insert(ctx.tag.clone());
            }
            for member in &mut object.members {
                visit(ctx, member);
            }
        }

        objects
            .into_iter()
            .map(|mut object| {
                visit(ctx, &mut object);
                object
            })
            .collect()
    }

    /// Runs the phases in order, appending applied objects to `applied` as
    /// each phase commits.
    fn run(
        &self,
        ctx: &mut CallContext,
        objects: Vec<DomainObject>,
        intent: PushIntent,
        applied: &mut Vec<DomainObject>,
    ) -> HostResult<()> {
        let (plain, containers): (Vec<_>, Vec<_>) =
            objects.into_iter().partition(|o| !o.is_container());

        let mut members = Vec::new();
        let mut nested = Vec::new();
        for container in &containers {
            flatten(container, &mut members, &mut nested);
        }
        let members = unique(members);
        // Inner containers before the ones holding them.
        let all_containers =
            unique(nested.into_iter().chain(containers.iter().cloned()).collect());

        tracing::info!(
            %intent,
            plain = plain.len(),
            members = members.len(),
            containers = all_containers.len(),
            "push started"
        );

        applied.extend(self.phase(ctx, "Push objects", plain, intent)?);
        self.phase(ctx, "Push members", members, intent)?;

        // UpdateOrCreateOnly keeps its recreate fallback here: an existing
        // container that cannot take the shell is replaced by a new one.
        let shell_intent = match intent {
            PushIntent::UpdateOnly => None,
            PushIntent::CreateOnly | PushIntent::CreateNonExisting => {
                Some(PushIntent::CreateNonExisting)
            }
            PushIntent::DeleteThenCreate | PushIntent::UpdateOrCreateOnly => Some(intent),
        };
        let created: HashSet<Uuid> = match shell_intent {
            Some(shell_intent) => {
                let shells = all_containers
                    .iter()
                    .map(|c| DomainObject {
                        members: Vec::new(),
                        ..c.clone()
                    })
                    .collect();
                // Empty shells always trip host validation; never prompt.
                let _suppression = FailureSuppression::enable(self.workspace);
                self.phase(ctx, "Create containers", shells, shell_intent)?
                    .iter()
                    .map(|o| o.guid)
                    .collect()
            }
            None => HashSet::new(),
        };

        let to_update: Vec<DomainObject> = match intent {
            PushIntent::UpdateOnly | PushIntent::UpdateOrCreateOnly => all_containers,
            PushIntent::CreateOnly
            | PushIntent::CreateNonExisting
            | PushIntent::DeleteThenCreate => all_containers
                .into_iter()
                .filter(|c| created.contains(&c.guid))
                .collect(),
        };
        let updated = self.phase(ctx, "Update containers", to_update, PushIntent::UpdateOnly)?;
        self.warn_collisions(ctx, &updated);

        let top_level: HashSet<Uuid> = containers.iter().map(|c| c.guid).collect();
        applied.extend(updated.into_iter().filter(|c| top_level.contains(&c.guid)));
        Ok(())
    }

    /// Reconciles `objects` inside one transaction and returns the applied
    /// ones. A rejected commit records an error and applies nothing.
    fn phase(
        &self,
        ctx: &mut CallContext,
        name: &str,
        objects: Vec<DomainObject>,
        intent: PushIntent,
    ) -> HostResult<Vec<DomainObject>> {
        if objects.is_empty() {
            return Ok(Vec::new());
        }

        let scope = TransactionScope::begin(self.workspace, name)?;
        let mut applied = Vec::with_capacity(objects.len());
        let mut produced = Vec::new();

        for mut object in objects {
            let outcome = self.reconcile(ctx, &object, intent);
            tracing::debug!(phase = name, guid = %object.guid, ?outcome, "reconciled");
            if let Some(id) = outcome.native_id() {
                object.host_id = Some(id);
                if ctx.cache.host_ids(object.guid).is_none() {
                    ctx.cache
                        .put(CacheKey::Guid(object.guid), CacheValue::Host(vec![id]));
                    produced.push(object.guid);
                }
                applied.push(object);
            }
        }

        match scope.commit() {
            Ok(()) => Ok(applied),
            Err(e) => {
                ctx.events.error(format!("{name}: {e}"));
                for guid in produced {
                    ctx.cache.remove(&CacheKey::Guid(guid));
                }
                Ok(Vec::new())
            }
        }
    }

    /// Applies the decision table to one object.
    fn reconcile(
        &self,
        ctx: &mut CallContext,
        object: &DomainObject,
        intent: PushIntent,
    ) -> Outcome {
        let adapter = match self.adapters.for_type(&object.type_name) {
            Ok(adapter) => adapter,
            Err(e) => {
                ctx.events.error(format!("{}: {e}", describe(object)));
                return Outcome::Failed;
            }
        };

        let existing = adapter.lookup(self.workspace, &object.identity());
        match (intent, existing) {
            (PushIntent::CreateOnly | PushIntent::CreateNonExisting, Some(_)) => Outcome::Skipped,
            (PushIntent::UpdateOnly, None) => Outcome::Skipped,
            (PushIntent::UpdateOnly, Some(entity)) => {
                if adapter.update(self.workspace, ctx, &entity, object) {
                    Outcome::Updated(entity.native_id)
                } else {
                    ctx.events.error(format!("{}: update failed", describe(object)));
                    Outcome::Failed
                }
            }
            (PushIntent::DeleteThenCreate, Some(entity)) => {
                self.recreate(adapter, ctx, object, entity.native_id)
            }
            (PushIntent::UpdateOrCreateOnly, Some(entity)) => {
                if adapter.update(self.workspace, ctx, &entity, object) {
                    Outcome::Updated(entity.native_id)
                } else {
                    ctx.events.note(format!(
                        "{}: update failed, deleting and recreating",
                        describe(object)
                    ));
                    self.recreate(adapter, ctx, object, entity.native_id)
                }
            }
            (
                PushIntent::CreateOnly
                | PushIntent::CreateNonExisting
                | PushIntent::DeleteThenCreate
                | PushIntent::UpdateOrCreateOnly,
                None,
            ) => self.create(adapter, ctx, object),
        }
    }

    fn recreate(
        &self,
        adapter: &dyn ElementAdapter,
        ctx: &mut CallContext,
        object: &DomainObject,
        native_id: NativeId,
    ) -> Outcome {
        if let Some(id) = cached(&ctx.cache, object.guid) {
            return Outcome::Reused(id);
        }
        let identity = ExternalId {
            guid: object.guid,
            host_id: Some(native_id),
        };
        match adapter.delete(self.workspace, &identity) {
            Ok(0) => {
                ctx.events.error(format!(
                    "{}: existing entity could not be deleted",
                    describe(object)
                ));
                Outcome::Failed
            }
            Ok(_) => match self.create(adapter, ctx, object) {
                Outcome::Created(id) => Outcome::Replaced(id),
                other => other,
            },
            Err(e) => {
                ctx.events.error(format!("{}: delete failed: {e}", describe(object)));
                Outcome::Failed
            }
        }
    }

    fn create(
        &self,
        adapter: &dyn ElementAdapter,
        ctx: &mut CallContext,
        object: &DomainObject,
    ) -> Outcome {
        if let Some(id) = cached(&ctx.cache, object.guid) {
            return Outcome::Reused(id);
        }
        match adapter.create(self.workspace, ctx, object) {
            Ok(id) => Outcome::Created(id),
            Err(e) => {
                ctx.events.error(format!("{}: create failed: {e}", describe(object)));
                Outcome::Failed
            }
        }
    }

    /// Warns once per group of distinct containers that ended up under the
    /// same grouping name on the host.
    fn warn_collisions(&self, ctx: &mut CallContext, containers: &[DomainObject]) {
        let mut groups: BTreeMap<(String, String), Vec<NativeId>> = BTreeMap::new();
        for container in containers {
            let Some(entity) = container.host_id.and_then(|id| self.workspace.get(id)) else {
                continue;
            };
            let Ok(adapter) = self.adapters.for_type(&entity.type_name) else {
                continue;
            };
            let ids = groups
                .entry((entity.type_name.clone(), adapter.grouping_name(&entity)))
                .or_default();
            if !ids.contains(&entity.native_id) {
                ids.push(entity.native_id);
            }
        }

        for ((type_name, name), ids) in groups {
            if ids.len() > 1 {
                ctx.events.warning(format!(
                    "{} {type_name} containers share the name '{name}'",
                    ids.len()
                ));
            }
        }
    }
}

fn describe(object: &DomainObject) -> String {
    format!("{} '{}'", object.type_name, object.name)
}

fn cached(cache: &RefCache, guid: Uuid) -> Option<NativeId> {
    cache.host_ids(guid).and_then(|ids| ids.first().copied())
}

/// Collects the non-container descendants of `container` into `members` and
/// its nested containers, innermost first, into `nested`.
fn flatten(
    container: &DomainObject,
    members: &mut Vec<DomainObject>,
    nested: &mut Vec<DomainObject>,
) {
    for member in &container.members {
        if member.is_container() {
            flatten(member, members, nested);
            nested.push(member.clone());
        } else {
            members.push(member.clone());
        }
    }
}

/// Drops repeated identities, keeping the first occurrence.
fn unique(objects: Vec<DomainObject>) -> Vec<DomainObject> {
    let mut seen = HashSet::new();
    objects.into_iter().filter(|o| seen.insert(o.guid)).collect()
}

fn stamp_host_ids(object: &mut DomainObject, cache: &RefCache) {
    if let Some(id) = cached(cache, object.guid) {
        object.host_id = Some(id);
    }
    for member in &mut object.members {
        stamp_host_ids(member, cache);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::HostEntity;
    use crate::memory::{JournalEntry, MemoryWorkspace};
    use hostbridge_protocol::{PushConfig, Severity};

    struct Fixture {
        ws: MemoryWorkspace,
        adapters: AdapterRegistry,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                ws: MemoryWorkspace::new(),
                adapters: AdapterRegistry::generic(),
            }
        }

        fn push(
            &self,
            objects: Vec<DomainObject>,
            push_type: PushType,
        ) -> (Vec<DomainObject>, CallContext) {
            let mut ctx = CallContext::for_push(PushConfig::default(), "");
            let applied =
                PushEngine::new(&self.ws, &self.adapters).push(&mut ctx, objects, push_type);
            (applied, ctx)
        }

        fn begins(&self) -> usize {
            self.ws
                .journal()
                .iter()
                .filter(|e| matches!(e, JournalEntry::Begin(_)))
                .count()
        }
    }

    #[test]
    fn creates_when_absent() {
        let fx = Fixture::new();
        for push_type in [
            PushType::CreateOnly,
            PushType::CreateNonExisting,
            PushType::DeleteThenCreate,
            PushType::UpdateOrCreateOnly,
            PushType::AdapterDefault,
        ] {
            let wall = DomainObject::new("Wall", push_type.as_str());
            let (applied, _) = fx.push(vec![wall.clone()], push_type);
            assert_eq!(applied.len(), 1, "{push_type}");
            let id = applied[0].host_id.unwrap();
            assert_eq!(fx.ws.get(id).unwrap().guid, Some(wall.guid));
        }
        assert_eq!(fx.ws.len(), 5);
    }

    #[test]
    fn create_only_skips_existing() {
        let fx = Fixture::new();
        let wall = DomainObject::new("Wall", "W1").with_property("height", 3);
        fx.push(vec![wall.clone()], PushType::CreateOnly);
        let before = fx.ws.entities();
        fx.ws.clear_journal();

        let changed = wall.clone().with_property("height", 4);
        let (applied, _) = fx.push(vec![changed], PushType::CreateOnly);
        assert!(applied.is_empty());
        assert_eq!(fx.ws.entities(), before);
        assert!(!fx
            .ws
            .journal()
            .iter()
            .any(|e| matches!(e, JournalEntry::Insert(_) | JournalEntry::Replace(_))));
    }

    #[test]
    fn update_only_never_creates() {
        let fx = Fixture::new();
        let (applied, ctx) = fx.push(vec![DomainObject::new("Wall", "W1")], PushType::UpdateOnly);
        assert!(applied.is_empty());
        assert!(fx.ws.is_empty());
        assert_eq!(ctx.events.count(Severity::Error), 0);
    }

    #[test]
    fn update_only_reports_failed_update() {
        let fx = Fixture::new();
        let guid = Uuid::new_v4();
        fx.ws.seed(HostEntity::new("Beam", "X").with_guid(guid));

        let (applied, ctx) = fx.push(
            vec![DomainObject::new("Wall", "X").with_guid(guid)],
            PushType::UpdateOnly,
        );
        assert!(applied.is_empty());
        assert_eq!(ctx.events.count(Severity::Error), 1);
    }

    #[test]
    fn delete_then_create_keeps_guid_changes_native_id() {
        let fx = Fixture::new();
        let wall = DomainObject::new("Wall", "W1");
        let (first, _) = fx.push(vec![wall.clone()], PushType::CreateOnly);
        let (second, _) = fx.push(vec![wall.clone()], PushType::DeleteThenCreate);

        assert_eq!(second.len(), 1);
        assert_eq!(second[0].guid, wall.guid);
        assert_ne!(second[0].host_id, first[0].host_id);
        assert!(fx.ws.get(first[0].host_id.unwrap()).is_none());
        assert_eq!(fx.ws.len(), 1);
    }

    #[test]
    fn update_or_create_falls_back_to_recreate() {
        let fx = Fixture::new();
        let guid = Uuid::new_v4();
        let old = fx.ws.seed(HostEntity::new("Beam", "X").with_guid(guid));

        let (applied, ctx) = fx.push(
            vec![DomainObject::new("Wall", "X").with_guid(guid)],
            PushType::UpdateOrCreateOnly,
        );
        assert_eq!(applied.len(), 1);
        let new = applied[0].host_id.unwrap();
        assert_ne!(new, old);
        assert_eq!(fx.ws.get(new).unwrap().type_name, "Wall");
        assert_eq!(ctx.events.count(Severity::Note), 1);
    }

    #[test]
    fn full_push_rejected_before_touching_the_document() {
        let fx = Fixture::new();
        let (applied, ctx) = fx.push(vec![DomainObject::new("Wall", "W1")], PushType::FullPush);
        assert!(applied.is_empty());
        assert_eq!(ctx.events.count(Severity::Error), 1);
        assert!(fx.ws.journal().is_empty());
    }

    #[test]
    fn read_only_document_opens_no_transaction() {
        let fx = Fixture::new();
        fx.ws.set_read_only(true);
        let (applied, ctx) = fx.push(vec![DomainObject::new("Wall", "W1")], PushType::CreateOnly);
        assert!(applied.is_empty());
        assert_eq!(ctx.events.events().len(), 1);
        assert_eq!(ctx.events.count(Severity::Error), 1);
        assert_eq!(fx.begins(), 0);
    }

    #[test]
    fn empty_batch_is_invalid() {
        let fx = Fixture::new();
        let (applied, ctx) = fx.push(Vec::new(), PushType::CreateOnly);
        assert!(applied.is_empty());
        assert_eq!(ctx.events.events()[0].message, INVALID_INPUT);
    }

    #[test]
    fn composite_runs_in_three_transactions() {
        let fx = Fixture::new();
        let b1 = DomainObject::new("Beam", "B1");
        let b2 = DomainObject::new("Beam", "B2");
        let assembly = DomainObject::container("Assembly", "A1", vec![b1.clone(), b2.clone()]);

        let (applied, _) = fx.push(vec![assembly.clone()], PushType::CreateOnly);
        assert_eq!(applied.len(), 1);
        let container = applied[0].host_id.unwrap();
        let member_ids: Vec<_> = applied[0].members.iter().map(|m| m.host_id.unwrap()).collect();

        assert_eq!(
            fx.ws.journal(),
            vec![
                JournalEntry::Begin("Push members".into()),
                JournalEntry::Insert(member_ids[0]),
                JournalEntry::Insert(member_ids[1]),
                JournalEntry::Commit("Push members".into()),
                JournalEntry::Begin("Create containers".into()),
                JournalEntry::Insert(container),
                JournalEntry::Commit("Create containers".into()),
                JournalEntry::Begin("Update containers".into()),
                JournalEntry::Replace(container),
                JournalEntry::Commit("Update containers".into()),
            ]
        );
        assert_eq!(fx.ws.get(container).unwrap().members, member_ids);
        // The empty shell's validation failure was dismissed, not prompted.
        assert_eq!(fx.ws.dismissed_failures(), 1);
        assert!(fx.ws.prompts().is_empty());
        assert!(!fx.ws.failure_suppression());
    }

    fn assembly() -> DomainObject {
        DomainObject::container(
            "Assembly",
            "A1",
            vec![DomainObject::new("Beam", "B1"), DomainObject::new("Beam", "B2")],
        )
    }

    fn transaction_names(ws: &MemoryWorkspace) -> Vec<String> {
        ws.journal()
            .into_iter()
            .filter_map(|e| match e {
                JournalEntry::Begin(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn update_or_create_recreates_container_of_another_kind() {
        let fx = Fixture::new();
        let guid = Uuid::new_v4();
        let old = fx.ws.seed(HostEntity::new("Beam", "A1").with_guid(guid));
        let container = DomainObject::container(
            "Assembly",
            "A1",
            vec![DomainObject::new("Beam", "B1")],
        )
        .with_guid(guid);

        let (applied, ctx) = fx.push(vec![container], PushType::UpdateOrCreateOnly);
        assert_eq!(applied.len(), 1);
        assert_eq!(ctx.events.count(Severity::Error), 0);
        let new = applied[0].host_id.unwrap();
        assert_ne!(new, old);
        assert!(fx.ws.get(old).is_none());
        let entity = fx.ws.get(new).unwrap();
        assert_eq!(entity.type_name, "Assembly");
        assert_eq!(entity.guid, Some(guid));
        assert_eq!(entity.members, vec![applied[0].members[0].host_id.unwrap()]);
    }

    #[test]
    fn update_or_create_updates_existing_container_in_place() {
        let fx = Fixture::new();
        let (first, _) = fx.push(vec![assembly()], PushType::CreateOnly);
        let id = first[0].host_id.unwrap();

        let changed = first[0].clone().with_property("mark", "A-1");
        let (applied, ctx) = fx.push(vec![changed], PushType::UpdateOrCreateOnly);
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].host_id, Some(id));
        assert_eq!(ctx.events.count(Severity::Error), 0);
        let entity = fx.ws.get(id).unwrap();
        assert_eq!(entity.members.len(), 2);
        assert!(entity.properties.contains_key("mark"));
        assert_eq!(fx.ws.len(), 3);
    }

    #[test]
    fn update_only_fills_existing_container_without_shells() {
        let fx = Fixture::new();
        let (first, _) = fx.push(vec![assembly()], PushType::CreateOnly);
        let id = first[0].host_id.unwrap();
        fx.ws.clear_journal();

        let mut changed = first[0].clone().with_property("mark", "A-1");
        changed.members.truncate(1);
        let (applied, _) = fx.push(vec![changed], PushType::UpdateOnly);
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].host_id, Some(id));
        assert_eq!(
            transaction_names(&fx.ws),
            vec!["Push members".to_string(), "Update containers".to_string()]
        );
        let entity = fx.ws.get(id).unwrap();
        assert_eq!(entity.members, vec![first[0].members[0].host_id.unwrap()]);
        assert!(entity.properties.contains_key("mark"));
    }

    #[test]
    fn update_only_leaves_absent_container_alone() {
        let fx = Fixture::new();
        let (applied, ctx) = fx.push(vec![assembly()], PushType::UpdateOnly);
        assert!(applied.is_empty());
        assert!(fx.ws.is_empty());
        assert_eq!(ctx.events.count(Severity::Error), 0);
    }

    #[test]
    fn delete_then_create_replaces_container_and_members() {
        let fx = Fixture::new();
        let (first, _) = fx.push(vec![assembly()], PushType::CreateOnly);
        let old = first[0].host_id.unwrap();

        let (applied, _) = fx.push(vec![assembly_like(&first[0])], PushType::DeleteThenCreate);
        assert_eq!(applied.len(), 1);
        let new = applied[0].host_id.unwrap();
        assert_ne!(new, old);
        assert!(fx.ws.get(old).is_none());
        assert_eq!(fx.ws.len(), 3);

        let member_ids: Vec<_> = applied[0].members.iter().map(|m| m.host_id.unwrap()).collect();
        for (before, after) in first[0].members.iter().zip(&member_ids) {
            assert_ne!(before.host_id, Some(*after));
        }
        assert_eq!(fx.ws.get(new).unwrap().members, member_ids);
    }

    /// Same identities as `pushed`, without host ids.
    fn assembly_like(pushed: &DomainObject) -> DomainObject {
        let mut object = pushed.clone();
        object.host_id = None;
        for member in &mut object.members {
            member.host_id = None;
        }
        object
    }

    #[test]
    fn closed_document_keeps_earlier_phases() {
        let fx = Fixture::new();
        let wall = DomainObject::new("Wall", "W1");
        fx.ws.close_after_next_commit();

        let (applied, ctx) = fx.push(vec![wall.clone(), assembly()], PushType::CreateOnly);
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].guid, wall.guid);
        assert!(applied[0].host_id.is_some());
        assert_eq!(ctx.events.count(Severity::Error), 1);
        assert!(ctx.events.events()[0].message.starts_with("push aborted"));
        assert_eq!(fx.ws.len(), 1);
    }

    #[test]
    fn anonymous_objects_with_one_name_share_an_identity() {
        let fx = Fixture::new();
        let anonymous = || DomainObject::new("Wall", "W1").with_guid(Uuid::nil());
        let (applied, ctx) = fx.push(vec![anonymous(), anonymous()], PushType::CreateOnly);
        assert_eq!(applied.len(), 1);
        assert_eq!(fx.ws.len(), 1);
        assert_eq!(ctx.events.count(Severity::Note), 1);
    }

    #[test]
    fn shared_member_created_once() {
        let fx = Fixture::new();
        let shared = DomainObject::new("Beam", "shared");
        let a1 = DomainObject::container("Assembly", "A1", vec![shared.clone()]);
        let a2 = DomainObject::container("Assembly", "A2", vec![shared.clone()]);

        let (applied, _) = fx.push(vec![a1, a2], PushType::CreateOnly);
        assert_eq!(applied.len(), 2);
        let beams = fx.ws.select(&hostbridge_protocol::FilterQuery::of_type("Beam"));
        assert_eq!(beams.len(), 1);
        assert_eq!(applied[0].members[0].host_id, applied[1].members[0].host_id);
    }

    #[test]
    fn nested_containers_built_inside_out() {
        let fx = Fixture::new();
        let inner =
            DomainObject::container("Assembly", "inner", vec![DomainObject::new("Beam", "B")]);
        let outer = DomainObject::container("Assembly", "outer", vec![inner.clone()]);

        let (applied, _) = fx.push(vec![outer], PushType::UpdateOrCreateOnly);
        assert_eq!(applied.len(), 1);
        let outer_entity = fx.ws.get(applied[0].host_id.unwrap()).unwrap();
        let inner_entity = fx.ws.find_by_guid(inner.guid).unwrap();
        assert_eq!(outer_entity.members, vec![inner_entity.native_id]);
        assert_eq!(inner_entity.members.len(), 1);
    }

    #[test]
    fn naming_collisions_warned_per_group() {
        let fx = Fixture::new();
        let beam = || DomainObject::new("Beam", "B");
        let named = |name: &str| {
            DomainObject::container("Assembly", name, vec![beam()]).with_property("group_name", "G")
        };
        let (applied, ctx) = fx.push(
            vec![named("A1"), named("A2"), named("A3")],
            PushType::CreateOnly,
        );
        assert_eq!(applied.len(), 3);
        assert_eq!(ctx.events.count(Severity::Warning), 1);
        assert!(ctx.events.events()[0].message.contains("share the name 'G'"));
    }

    #[test]
    fn rejected_commit_discards_the_phase() {
        let fx = Fixture::new();
        fx.ws.reject_next_commit("locked");
        let (applied, ctx) = fx.push(vec![DomainObject::new("Wall", "W1")], PushType::CreateOnly);
        assert!(applied.is_empty());
        assert!(fx.ws.is_empty());
        assert_eq!(ctx.events.count(Severity::Error), 1);
        assert!(ctx.cache.is_empty());
    }

    #[test]
    fn tag_and_nil_guid() {
        let fx = Fixture::new();
        let mut ctx = CallContext::for_push(PushConfig::default(), "batch-7");
        let anonymous = DomainObject::new("Wall", "W1").with_guid(Uuid::nil());
        let applied = PushEngine::new(&fx.ws, &fx.adapters).push(
            &mut ctx,
            vec![anonymous],
            PushType::CreateOnly,
        );

        assert_eq!(applied.len(), 1);
        assert!(!applied[0].guid.is_nil());
        assert!(applied[0].tags.contains("batch-7"));
        assert_eq!(ctx.events.count(Severity::Note), 1);
    }

    #[test]
    fn suppression_scoped_to_the_run() {
        let fx = Fixture::new();
        let mut ctx = CallContext::for_push(
            PushConfig::default().with_suppress_failure_messages(false),
            "",
        );
        let empty = DomainObject::container("Assembly", "A1", Vec::new());
        PushEngine::new(&fx.ws, &fx.adapters).push(&mut ctx, vec![empty], PushType::CreateOnly);
        // Shells are always suppressed, so nothing is prompted.
        assert!(fx.ws.prompts().is_empty());
        assert!(!fx.ws.failure_suppression());
    }
}
