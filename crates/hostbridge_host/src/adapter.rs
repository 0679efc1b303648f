//! Per-type conversion between domain objects and host entities.

use crate::cache::{CacheKey, CacheValue};
use crate::context::CallContext;
use crate::entity::HostEntity;
use crate::error::{HostError, HostResult};
use crate::workspace::Workspace;
use hostbridge_protocol::{DomainObject, ExternalId, NativeId, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use uuid::Uuid;

/// Property prefix under which custom data lands on host entities.
pub const CUSTOM_PREFIX: &str = "custom.";

/// Property naming the group a container belongs to on the host.
pub const GROUP_NAME_PROPERTY: &str = "group_name";

/// Builds, updates and reads host entities for one kind of domain object.
///
/// The push engine decides what to do with an object; the adapter knows
/// how. Adapters should consult `ctx.cache` before converting anything that
/// may already have been converted during the call.
pub trait ElementAdapter: Send + Sync {
    /// Finds the live entity for `identity`.
    fn lookup(&self, workspace: &dyn Workspace, identity: &ExternalId) -> Option<HostEntity> {
        workspace.lookup(identity)
    }

    /// Creates an entity for `object` and returns its native id.
    fn create(
        &self,
        workspace: &dyn Workspace,
        ctx: &mut CallContext,
        object: &DomainObject,
    ) -> HostResult<NativeId>;

    /// Applies `object` to an existing entity. Returns false if the entity
    /// cannot take the change.
    fn update(
        &self,
        workspace: &dyn Workspace,
        ctx: &mut CallContext,
        entity: &HostEntity,
        object: &DomainObject,
    ) -> bool;

    /// Removes the entity for `identity`; returns how many were removed.
    fn delete(&self, workspace: &dyn Workspace, identity: &ExternalId) -> HostResult<usize> {
        match self.lookup(workspace, identity) {
            Some(entity) => workspace.remove(entity.native_id),
            None => Ok(0),
        }
    }

    /// Converts an entity back into a domain object.
    fn to_domain(
        &self,
        workspace: &dyn Workspace,
        ctx: &mut CallContext,
        entity: &HostEntity,
    ) -> HostResult<DomainObject>;

    /// Name under which the host groups a container.
    fn grouping_name(&self, entity: &HostEntity) -> String {
        entity.name.clone()
    }
}

/// Element adapters by type name.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn ElementAdapter>>,
    fallback: Option<Arc<dyn ElementAdapter>>,
}

impl AdapterRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry that handles every type with
    /// [`GenericElementAdapter`].
    pub fn generic() -> Self {
        Self::new().with_fallback(Arc::new(GenericElementAdapter))
    }

    /// Registers `adapter` for `type_name`.
    pub fn with_adapter(
        mut self,
        type_name: impl Into<String>,
        adapter: Arc<dyn ElementAdapter>,
    ) -> Self {
        self.adapters.insert(type_name.into(), adapter);
        self
    }

    /// Uses `adapter` for types without a registered adapter.
    pub fn with_fallback(mut self, adapter: Arc<dyn ElementAdapter>) -> Self {
        self.fallback = Some(adapter);
        self
    }

    /// Returns the adapter for `type_name`.
    pub fn for_type(&self, type_name: &str) -> HostResult<&dyn ElementAdapter> {
        self.adapters
            .get(type_name)
            .or(self.fallback.as_ref())
            .map(|a| a.as_ref())
            .ok_or_else(|| HostError::NoAdapter {
                type_name: type_name.to_string(),
            })
    }
}

/// Maps domain objects onto host entities field by field.
///
/// Properties carry over as they are. Custom data is stored as
/// `custom.<key>` properties when the push asks for it. A container's
/// members are resolved through the call's cache first, then the document.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericElementAdapter;

impl GenericElementAdapter {
    fn properties(ctx: &CallContext, object: &DomainObject) -> BTreeMap<String, Value> {
        let mut properties = object.properties.clone();
        if ctx.config.copy_custom_data {
            for (key, value) in &object.custom_data {
                properties.insert(format!("{CUSTOM_PREFIX}{key}"), value.clone());
            }
        }
        properties
    }

    fn members(
        workspace: &dyn Workspace,
        ctx: &mut CallContext,
        object: &DomainObject,
    ) -> Vec<NativeId> {
        let mut ids = Vec::with_capacity(object.members.len());
        for member in &object.members {
            if let Some(cached) = ctx.cache.host_ids(member.guid) {
                ids.extend_from_slice(cached);
            } else if let Some(entity) = workspace.lookup(&member.identity()) {
                ids.push(entity.native_id);
            } else {
                ctx.events.warning(format!(
                    "{} '{}': member {} '{}' not found on host, left out",
                    object.type_name, object.name, member.type_name, member.name
                ));
            }
        }
        ids
    }

    fn describe(object: &DomainObject) -> String {
        format!("{} '{}'", object.type_name, object.name)
    }
}

impl ElementAdapter for GenericElementAdapter {
    fn create(
        &self,
        workspace: &dyn Workspace,
        ctx: &mut CallContext,
        object: &DomainObject,
    ) -> HostResult<NativeId> {
        let mut entity = HostEntity::new(&object.type_name, &object.name).with_guid(object.guid);
        entity.tags = object.tags.clone();
        entity.properties = Self::properties(ctx, object);
        entity.container = object.container;
        if object.container {
            entity.members = Self::members(workspace, ctx, object);
            if entity.members.is_empty() {
                workspace.raise_failure(&format!("{} created empty", Self::describe(object)));
            }
        }
        workspace.insert(entity)
    }

    fn update(
        &self,
        workspace: &dyn Workspace,
        ctx: &mut CallContext,
        entity: &HostEntity,
        object: &DomainObject,
    ) -> bool {
        if entity.type_name != object.type_name || entity.container != object.container {
            tracing::debug!(
                native_id = entity.native_id,
                host_type = %entity.type_name,
                wanted = %object.type_name,
                "entity cannot take this object"
            );
            return false;
        }

        let mut updated = entity.clone();
        updated.guid = Some(object.guid);
        updated.name = object.name.clone();
        updated.tags = object.tags.clone();
        updated.properties = Self::properties(ctx, object);
        if object.container {
            updated.members = Self::members(workspace, ctx, object);
        }

        match workspace.replace(updated) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(native_id = entity.native_id, error = %e, "replace failed");
                false
            }
        }
    }

    fn to_domain(
        &self,
        workspace: &dyn Workspace,
        ctx: &mut CallContext,
        entity: &HostEntity,
    ) -> HostResult<DomainObject> {
        if let Some(object) = ctx.cache.domain(entity.native_id) {
            return Ok(object.clone());
        }

        let mut object = DomainObject::new(&entity.type_name, &entity.name)
            .with_guid(entity.guid.unwrap_or_else(|| derived_guid(entity.native_id)));
        object.host_id = Some(entity.native_id);
        object.tags = entity.tags.clone();
        object.container = entity.container;
        for (key, value) in &entity.properties {
            match key.strip_prefix(CUSTOM_PREFIX) {
                Some(custom) => object.custom_data.insert(custom.to_string(), value.clone()),
                None => object.properties.insert(key.clone(), value.clone()),
            };
        }

        for id in &entity.members {
            match workspace.get(*id) {
                Some(member) => object.members.push(self.to_domain(workspace, ctx, &member)?),
                None => ctx.events.warning(format!(
                    "{} '{}': member #{id} no longer exists",
                    entity.type_name, entity.name
                )),
            }
        }

        ctx.cache.put(
            CacheKey::Native(entity.native_id),
            CacheValue::Domain(object.clone()),
        );
        Ok(object)
    }

    fn grouping_name(&self, entity: &HostEntity) -> String {
        entity
            .properties
            .get(GROUP_NAME_PROPERTY)
            .and_then(Value::as_text)
            .map_or_else(|| entity.name.clone(), str::to_string)
    }
}

/// Stable guid for entities that were not created from a domain object.
fn derived_guid(native_id: NativeId) -> Uuid {
    // "hostbrid" in ASCII.
    Uuid::from_u64_pair(0x686f_7374_6272_6964, native_id as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryWorkspace;
    use hostbridge_protocol::{PushConfig, Severity};

    fn ctx(copy_custom_data: bool) -> CallContext {
        CallContext::for_push(
            PushConfig::default().with_copy_custom_data(copy_custom_data),
            "",
        )
    }

    #[test]
    fn registry_falls_back() {
        let registry = AdapterRegistry::new();
        assert!(matches!(
            registry.for_type("Wall"),
            Err(HostError::NoAdapter { .. })
        ));
        assert!(AdapterRegistry::generic().for_type("Wall").is_ok());
    }

    #[test]
    fn custom_data_copied_only_when_asked() {
        let ws = MemoryWorkspace::new();
        let wall = DomainObject::new("Wall", "W1")
            .with_property("height", 3.0)
            .with_custom("phase", "new");

        ws.begin_transaction("t").unwrap();
        let with = GenericElementAdapter.create(&ws, &mut ctx(true), &wall).unwrap();
        let without = GenericElementAdapter.create(&ws, &mut ctx(false), &wall).unwrap();
        ws.commit().unwrap();

        let with = ws.get(with).unwrap();
        assert_eq!(with.properties.get("custom.phase"), Some(&Value::from("new")));
        assert_eq!(with.guid, Some(wall.guid));
        assert!(!ws.get(without).unwrap().properties.contains_key("custom.phase"));

        let back = GenericElementAdapter.to_domain(&ws, &mut ctx(true), &with).unwrap();
        assert_eq!(back.custom_data, wall.custom_data);
        assert_eq!(back.properties, wall.properties);
        assert_eq!(back.host_id, Some(with.native_id));
    }

    #[test]
    fn update_refuses_other_types() {
        let ws = MemoryWorkspace::new();
        let id = ws.seed(HostEntity::new("Beam", "B1"));
        let entity = ws.get(id).unwrap();

        ws.begin_transaction("t").unwrap();
        let wall = DomainObject::new("Wall", "B1");
        assert!(!GenericElementAdapter.update(&ws, &mut ctx(true), &entity, &wall));
        let beam = DomainObject::new("Beam", "B1").with_property("length", 2);
        assert!(GenericElementAdapter.update(&ws, &mut ctx(true), &entity, &beam));
        ws.commit().unwrap();
        assert_eq!(ws.get(id).unwrap().guid, Some(beam.guid));
    }

    #[test]
    fn container_members_resolved_through_cache() {
        let ws = MemoryWorkspace::new();
        let beam = DomainObject::new("Beam", "B1");
        let lost = DomainObject::new("Beam", "B2");
        let assembly = DomainObject::container("Assembly", "A1", vec![beam.clone(), lost]);

        let mut ctx = ctx(true);
        ctx.cache.put(CacheKey::Guid(beam.guid), CacheValue::Host(vec![41]));

        ws.begin_transaction("t").unwrap();
        let id = GenericElementAdapter.create(&ws, &mut ctx, &assembly).unwrap();
        assert_eq!(ws.get(id).unwrap().members, vec![41]);
        assert_eq!(ctx.events.count(Severity::Warning), 1);
    }

    #[test]
    fn empty_container_raises_host_failure() {
        let ws = MemoryWorkspace::new();
        ws.begin_transaction("t").unwrap();
        GenericElementAdapter
            .create(&ws, &mut ctx(true), &DomainObject::container("Assembly", "A1", vec![]))
            .unwrap();
        assert_eq!(ws.prompts(), vec!["Assembly 'A1' created empty".to_string()]);
    }

    #[test]
    fn unmanaged_entities_get_a_stable_guid() {
        let ws = MemoryWorkspace::new();
        let id = ws.seed(HostEntity::new("Wall", "legacy"));
        let entity = ws.get(id).unwrap();
        let first = GenericElementAdapter.to_domain(&ws, &mut ctx(true), &entity).unwrap();
        let second = GenericElementAdapter.to_domain(&ws, &mut ctx(true), &entity).unwrap();
        assert_eq!(first.guid, second.guid);
        assert!(!first.guid.is_nil());
    }

    #[test]
    fn grouping_name_prefers_property() {
        let plain = HostEntity::new("Assembly", "A1");
        assert_eq!(GenericElementAdapter.grouping_name(&plain), "A1");
        let grouped = plain.with_property(GROUP_NAME_PROPERTY, "G");
        assert_eq!(GenericElementAdapter.grouping_name(&grouped), "G");
    }
}
