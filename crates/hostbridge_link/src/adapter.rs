//! Client-facing adapter over the call gate or an in-process host.

use crate::config::ConnectionSettings;
use crate::error::{BridgeError, BridgeResult};
use crate::gate::CallGate;
use crate::link::Link;
use crate::replay::{replay, EventSink, TracingSink};
use crate::tcp::TcpLink;
use hostbridge_protocol::{
    CommandEnvelope, DomainObject, Event, FilterQuery, PushConfig, PushType, ResultPackage, Value,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A host reachable by direct call, bypassing links and deadlines.
pub trait LocalHost: Send + Sync {
    /// Executes one command and returns its result package.
    fn execute(&self, envelope: CommandEnvelope) -> ResultPackage;
}

enum Route {
    Remote(CallGate),
    Local {
        host: Arc<dyn LocalHost>,
        next_id: AtomicU64,
    },
}

/// Issues commands to a host and replays the host's events locally.
///
/// Failures never propagate: a connectivity or timeout failure is recorded
/// as one error event in the sink and the call returns an empty result.
pub struct HostAdapter {
    route: Route,
    sink: Arc<dyn EventSink>,
}

impl HostAdapter {
    /// Creates an adapter over an existing gate.
    pub fn remote(gate: CallGate) -> Self {
        Self {
            route: Route::Remote(gate),
            sink: Arc::new(TracingSink),
        }
    }

    /// Connects to a host over TCP on both channels.
    pub fn connect(settings: ConnectionSettings) -> BridgeResult<Self> {
        let commands: Arc<dyn Link> = Arc::new(TcpLink::connect_timeout(
            &settings.push_addr(),
            settings.probe_timeout,
        )?);
        let responses: Arc<dyn Link> = Arc::new(TcpLink::connect_timeout(
            &settings.pull_addr(),
            settings.probe_timeout,
        )?);
        Ok(Self::remote(CallGate::new(commands, responses, settings)?))
    }

    /// Creates an adapter calling `host` directly.
    pub fn local(host: Arc<dyn LocalHost>) -> Self {
        Self {
            route: Route::Local {
                host,
                next_id: AtomicU64::new(1),
            },
            sink: Arc::new(TracingSink),
        }
    }

    /// Replays host events into `sink` instead of `tracing`.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Returns true when commands bypass the links.
    pub fn is_local(&self) -> bool {
        matches!(self.route, Route::Local { .. })
    }

    /// Probes the host and replays whatever events the probe raised.
    pub fn check_connection(&self) -> bool {
        self.call(CommandEnvelope::connection_check()).is_some()
    }

    /// Pushes `objects`; returns the objects the host applied, with their
    /// host ids filled in.
    pub fn push(
        &self,
        objects: &[DomainObject],
        push_type: PushType,
        tag: &str,
        config: Option<PushConfig>,
    ) -> Vec<DomainObject> {
        let envelope = CommandEnvelope::push(objects, push_type, tag, config);
        self.call(envelope)
            .map(|data| self.decode_objects(&data))
            .unwrap_or_default()
    }

    /// Reads every object matching `filter`.
    pub fn pull(&self, filter: &FilterQuery) -> Vec<DomainObject> {
        self.call(CommandEnvelope::pull(filter))
            .map(|data| self.decode_objects(&data))
            .unwrap_or_default()
    }

    /// Deletes every object matching `filter`; returns how many were removed.
    pub fn delete(&self, filter: &FilterQuery) -> usize {
        self.call(CommandEnvelope::delete(filter))
            .map(|data| self.decode_count(&data))
            .unwrap_or(0)
    }

    /// Sets `property` on every object matching `filter`; returns how many
    /// changed.
    pub fn update_property(
        &self,
        filter: &FilterQuery,
        property: &str,
        value: impl Into<Value>,
    ) -> usize {
        self.call(CommandEnvelope::update_property(filter, property, value))
            .map(|data| self.decode_count(&data))
            .unwrap_or(0)
    }

    /// Sends one command, replays its events and returns its data.
    fn call(&self, envelope: CommandEnvelope) -> Option<Vec<Value>> {
        let kind = envelope.kind();
        let result: BridgeResult<ResultPackage> = match &self.route {
            Route::Remote(gate) => gate.call(envelope),
            Route::Local { host, next_id } => {
                let id = next_id.fetch_add(1, Ordering::Relaxed);
                Ok(host.execute(envelope.with_correlation_id(id)))
            }
        };

        match result {
            Ok(package) => {
                replay(&package.events, self.sink.as_ref());
                Some(package.data)
            }
            Err(e) => {
                tracing::debug!(%kind, error = %e, "call failed");
                self.sink.emit(&Event::error(e.to_string()));
                None
            }
        }
    }

    fn decode_objects(&self, data: &[Value]) -> Vec<DomainObject> {
        data.iter()
            .filter_map(|value| match DomainObject::from_value(value) {
                Ok(object) => Some(object),
                Err(e) => {
                    self.report(&BridgeError::from(e));
                    None
                }
            })
            .collect()
    }

    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    fn decode_count(&self, data: &[Value]) -> usize {
        match data.first().and_then(Value::as_integer) {
            Some(n) if n >= 0 => n as usize,
            _ => {
                self.report(&BridgeError::UnexpectedResponse(
                    "expected a non-negative count".into(),
                ));
                0
            }
        }
    }

    fn report(&self, error: &BridgeError) {
        self.sink.emit(&Event::error(error.to_string()));
    }
}
