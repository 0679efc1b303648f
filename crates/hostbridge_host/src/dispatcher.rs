//! Command dispatcher.
//!
//! Decodes a command's arguments, checks the document can run it and hands
//! it to the matching handler. Every command is answered with a result
//! package carrying its correlation id and whatever events it raised, even
//! when it fails.

use crate::adapter::AdapterRegistry;
use crate::context::CallContext;
use crate::error::HostResult;
use crate::reconcile::PushEngine;
use crate::workspace::{ensure_ready, TransactionScope, Workspace};
use hostbridge_link::LocalHost;
use hostbridge_protocol::{
    CommandArgs, CommandEnvelope, CommandKind, DomainObject, FilterQuery, PushConfig, PushType,
    ResultPackage, Value,
};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Note recorded when a push carries no configuration.
pub const DEFAULT_CONFIG_NOTE: &str = "no push configuration given, using defaults";

/// Routes commands to their handlers.
pub struct Dispatcher {
    workspace: Arc<dyn Workspace>,
    adapters: AdapterRegistry,
    exec: Mutex<()>,
}

impl Dispatcher {
    /// Creates a dispatcher using [`AdapterRegistry::generic`].
    pub fn new(workspace: Arc<dyn Workspace>) -> Self {
        Self {
            workspace,
            adapters: AdapterRegistry::generic(),
            exec: Mutex::new(()),
        }
    }

    /// Replaces the element adapters.
    pub fn with_adapters(mut self, adapters: AdapterRegistry) -> Self {
        self.adapters = adapters;
        self
    }

    /// The document commands run against.
    pub fn workspace(&self) -> &Arc<dyn Workspace> {
        &self.workspace
    }

    /// Executes one command. Commands run one at a time.
    pub fn execute(&self, envelope: CommandEnvelope) -> ResultPackage {
        let _exec = self.exec.lock();
        let correlation_id = envelope.correlation_id;
        let kind = envelope.kind();

        let args = match envelope.args() {
            Ok(args) => args,
            Err(e) => {
                tracing::warn!(id = correlation_id, %kind, error = %e, "rejecting command");
                return ResultPackage::rejection(correlation_id, e.to_string());
            }
        };

        let mut ctx = CallContext::new();
        let data = match self.handle(&mut ctx, &envelope, args) {
            Ok(data) => data,
            Err(e) => {
                ctx.events.error(e.to_string());
                Vec::new()
            }
        };

        let package = ResultPackage {
            correlation_id,
            data,
            events: ctx.events.drain(),
        };
        tracing::debug!(
            id = correlation_id,
            %kind,
            data = package.data.len(),
            events = package.events.len(),
            "command executed"
        );
        package
    }

    fn handle(
        &self,
        ctx: &mut CallContext,
        envelope: &CommandEnvelope,
        args: CommandArgs,
    ) -> HostResult<Vec<Value>> {
        let kind = envelope.kind();
        if kind != CommandKind::ConnectionCheck {
            ensure_ready(self.workspace.as_ref(), kind.is_mutating())?;
        }

        match args {
            CommandArgs::ConnectionCheck => Ok(vec![Value::Bool(true)]),
            CommandArgs::Push { objects, push_type } => {
                self.push(ctx, &envelope.config, &envelope.tag, objects, push_type)
            }
            CommandArgs::Pull { filter } => Ok(self.pull(ctx, &filter)),
            CommandArgs::Delete { filter } => self.delete(&filter).map(count),
            CommandArgs::UpdateProperty {
                filter,
                property,
                value,
            } => self.update_property(&filter, &property, value).map(count),
        }
    }

    fn push(
        &self,
        ctx: &mut CallContext,
        config: &BTreeMap<String, Value>,
        tag: &str,
        objects: Vec<DomainObject>,
        push_type: PushType,
    ) -> HostResult<Vec<Value>> {
        ctx.config = match PushConfig::from_config(config)? {
            Some(config) => config,
            None => {
                ctx.events.note(DEFAULT_CONFIG_NOTE);
                PushConfig::default()
            }
        };
        ctx.tag = tag.to_string();

        let engine = PushEngine::new(self.workspace.as_ref(), &self.adapters);
        Ok(engine
            .push(ctx, objects, push_type)
            .iter()
            .map(DomainObject::to_value)
            .collect())
    }

    fn pull(&self, ctx: &mut CallContext, filter: &FilterQuery) -> Vec<Value> {
        let workspace = self.workspace.as_ref();
        let mut data = Vec::new();
        for entity in workspace.select(filter) {
            let converted = self
                .adapters
                .for_type(&entity.type_name)
                .and_then(|adapter| adapter.to_domain(workspace, ctx, &entity));
            match converted {
                Ok(object) => data.push(object.to_value()),
                Err(e) => ctx.events.error(format!(
                    "{} '{}' (#{}): {e}",
                    entity.type_name, entity.name, entity.native_id
                )),
            }
        }
        data
    }

    fn delete(&self, filter: &FilterQuery) -> HostResult<usize> {
        let workspace = self.workspace.as_ref();
        let scope = TransactionScope::begin(workspace, "Delete")?;
        let mut removed = 0;
        for entity in workspace.select(filter) {
            removed += workspace.remove(entity.native_id)?;
        }
        scope.commit()?;
        Ok(removed)
    }

    fn update_property(
        &self,
        filter: &FilterQuery,
        property: &str,
        value: Value,
    ) -> HostResult<usize> {
        let workspace = self.workspace.as_ref();
        let scope = TransactionScope::begin(workspace, "Update property")?;
        let mut changed = 0;
        for mut entity in workspace.select(filter) {
            let previous = if value.is_null() {
                entity.properties.remove(property)
            } else {
                entity.properties.insert(property.to_string(), value.clone())
            };
            let unchanged = if value.is_null() {
                previous.is_none()
            } else {
                previous.as_ref() == Some(&value)
            };
            if unchanged {
                continue;
            }
            workspace.replace(entity)?;
            changed += 1;
        }
        scope.commit()?;
        Ok(changed)
    }
}

impl LocalHost for Dispatcher {
    fn execute(&self, envelope: CommandEnvelope) -> ResultPackage {
        Dispatcher::execute(self, envelope)
    }
}

fn count(n: usize) -> Vec<Value> {
    vec![Value::Integer(i64::try_from(n).unwrap_or(i64::MAX))]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::HostEntity;
    use crate::memory::{JournalEntry, MemoryWorkspace};
    use hostbridge_protocol::{Event, Severity};

    fn dispatcher() -> (Arc<MemoryWorkspace>, Dispatcher) {
        let ws = Arc::new(MemoryWorkspace::new());
        let dispatcher = Dispatcher::new(ws.clone());
        (ws, dispatcher)
    }

    fn objects(package: &ResultPackage) -> Vec<DomainObject> {
        package
            .data
            .iter()
            .map(|v| DomainObject::from_value(v).unwrap())
            .collect()
    }

    #[test]
    fn connection_check_answers_without_a_document() {
        let (ws, dispatcher) = dispatcher();
        ws.set_open(false);
        let envelope = CommandEnvelope::connection_check().with_correlation_id(5);
        let package = dispatcher.execute(envelope);
        assert_eq!(package.correlation_id, 5);
        assert_eq!(package.data, vec![Value::Bool(true)]);
        assert!(package.events.is_empty());
    }

    #[test]
    fn push_without_config_notes_the_default() {
        let (ws, dispatcher) = dispatcher();
        let wall = DomainObject::new("Wall", "W1");
        let envelope = CommandEnvelope::push(&[wall.clone()], PushType::CreateOnly, "t", None);
        let package = dispatcher.execute(envelope);

        assert_eq!(package.events, vec![Event::note(DEFAULT_CONFIG_NOTE)]);
        let applied = objects(&package);
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].guid, wall.guid);
        assert!(applied[0].tags.contains("t"));
        assert_eq!(ws.len(), 1);
    }

    #[test]
    fn push_with_config_is_silent() {
        let (_ws, dispatcher) = dispatcher();
        let envelope = CommandEnvelope::push(
            &[DomainObject::new("Wall", "W1")],
            PushType::CreateOnly,
            "",
            Some(PushConfig::default()),
        );
        assert!(dispatcher.execute(envelope).events.is_empty());
    }

    #[test]
    fn read_only_push_reports_one_precondition_error() {
        let (ws, dispatcher) = dispatcher();
        ws.set_read_only(true);
        let envelope = CommandEnvelope::push(
            &[DomainObject::new("Wall", "W1")],
            PushType::CreateOnly,
            "",
            None,
        );
        let package = dispatcher.execute(envelope);
        assert!(package.data.is_empty());
        assert_eq!(package.events.len(), 1);
        assert_eq!(package.events[0].severity, Severity::Error);
        assert!(ws.journal().is_empty());
    }

    #[test]
    fn pull_needs_an_open_document_only() {
        let (ws, dispatcher) = dispatcher();
        ws.seed(HostEntity::new("Wall", "W1"));
        ws.set_read_only(true);
        let package = dispatcher.execute(CommandEnvelope::pull(&FilterQuery::of_type("Wall")));
        assert_eq!(objects(&package).len(), 1);

        ws.set_open(false);
        let package = dispatcher.execute(CommandEnvelope::pull(&FilterQuery::all()));
        assert!(package.has_errors());
    }

    #[test]
    fn pull_rebuilds_containers() {
        let (ws, dispatcher) = dispatcher();
        let beam = ws.seed(HostEntity::new("Beam", "B1"));
        let mut assembly = HostEntity::new("Assembly", "A1");
        assembly.container = true;
        assembly.members = vec![beam];
        ws.seed(assembly);

        let package = dispatcher.execute(CommandEnvelope::pull(&FilterQuery::of_type("Assembly")));
        let pulled = objects(&package);
        assert_eq!(pulled.len(), 1);
        assert!(pulled[0].is_container());
        assert_eq!(pulled[0].members[0].host_id, Some(beam));
    }

    #[test]
    fn delete_counts_removed_entities() {
        let (ws, dispatcher) = dispatcher();
        ws.seed(HostEntity::new("Wall", "W1"));
        ws.seed(HostEntity::new("Wall", "W2"));
        ws.seed(HostEntity::new("Beam", "B1"));

        let package = dispatcher.execute(CommandEnvelope::delete(&FilterQuery::of_type("Wall")));
        assert_eq!(package.data, vec![Value::Integer(2)]);
        assert_eq!(ws.len(), 1);
    }

    #[test]
    fn update_property_counts_changes() {
        let (ws, dispatcher) = dispatcher();
        ws.seed(HostEntity::new("Wall", "W1").with_property("height", 3));
        ws.seed(HostEntity::new("Wall", "W2").with_property("height", 4));

        let filter = FilterQuery::of_type("Wall");
        let package = dispatcher.execute(CommandEnvelope::update_property(&filter, "height", 4));
        assert_eq!(package.data, vec![Value::Integer(1)]);

        let package =
            dispatcher.execute(CommandEnvelope::update_property(&filter, "height", Value::Null));
        assert_eq!(package.data, vec![Value::Integer(2)]);
        assert!(ws.entities().iter().all(|e| e.properties.is_empty()));
    }

    #[test]
    fn mutating_commands_refused_mid_transaction() {
        let (ws, dispatcher) = dispatcher();
        ws.begin_transaction("someone else").unwrap();
        let package = dispatcher.execute(CommandEnvelope::delete(&FilterQuery::all()));
        assert!(package.has_errors());
        assert_eq!(ws.journal(), vec![JournalEntry::Begin("someone else".into())]);
    }

    #[test]
    fn malformed_arguments_rejected() {
        let (_ws, dispatcher) = dispatcher();
        let mut envelope = CommandEnvelope::pull(&FilterQuery::all()).with_correlation_id(9);
        envelope.payload.clear();
        let package = dispatcher.execute(envelope);
        assert_eq!(package.correlation_id, 9);
        assert!(package.has_errors());
    }
}
