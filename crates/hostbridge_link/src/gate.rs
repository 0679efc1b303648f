//! Synchronous call gate.
//!
//! Every call gets a fresh correlation id and its own completion channel.
//! The response handler routes each result package to the caller waiting
//! on that id, so several calls may be in flight on one gate at once.
//! Packages nobody is waiting for (late answers to timed-out calls) are
//! dropped.
//!
//! A host may send every result to every connected client. Each gate
//! therefore numbers its calls under its own random prefix and ignores
//! ids it never issued.

use crate::config::ConnectionSettings;
use crate::error::{BridgeError, BridgeResult};
use crate::link::Link;
use hostbridge_protocol::{CommandEnvelope, CommandKind, ResultPackage, WireMessage};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

type Pending = Mutex<HashMap<u64, Sender<ResultPackage>>>;

/// Client side of the bridge: sends commands and blocks for their results.
pub struct CallGate {
    commands: Arc<dyn Link>,
    responses: Arc<dyn Link>,
    pending: Arc<Pending>,
    next_id: AtomicU64,
    settings: ConnectionSettings,
}

impl CallGate {
    /// Creates a gate sending on `commands` and receiving on `responses`.
    ///
    /// Registers the gate's handler on `responses`.
    pub fn new(
        commands: Arc<dyn Link>,
        responses: Arc<dyn Link>,
        settings: ConnectionSettings,
    ) -> BridgeResult<Self> {
        let pending: Arc<Pending> = Arc::new(Mutex::new(HashMap::new()));
        let routes = Arc::clone(&pending);
        responses.on_receive(Box::new(move |body| route(&routes, &body)))?;
        Ok(Self {
            commands,
            responses,
            pending,
            next_id: AtomicU64::new(session_base()),
            settings,
        })
    }

    /// Settings the gate was created with.
    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    /// Number of calls currently waiting for a result.
    pub fn in_flight(&self) -> usize {
        self.pending.lock().len()
    }

    /// Sends a connection probe and waits up to the probe timeout. Returns
    /// the probe's package so its events can be replayed.
    pub fn check_connection(&self) -> BridgeResult<ResultPackage> {
        let waited = self.settings.probe_timeout;
        self.exchange(CommandEnvelope::connection_check(), waited)?
            .ok_or(BridgeError::Connectivity { waited })
    }

    /// Probes the host, then sends `envelope` and waits for its result.
    /// Events raised by the probe come first in the returned package.
    ///
    /// # Errors
    ///
    /// [`BridgeError::Connectivity`] if the probe goes unanswered, in which
    /// case `envelope` is never sent; [`BridgeError::Timeout`] if the
    /// command itself goes unanswered.
    pub fn call(&self, envelope: CommandEnvelope) -> BridgeResult<ResultPackage> {
        let kind = envelope.kind();
        let probe = self.check_connection()?;
        if kind == CommandKind::ConnectionCheck {
            return Ok(probe);
        }

        let waited = self.settings.command_timeout();
        let mut package = self
            .exchange(envelope, waited)?
            .ok_or(BridgeError::Timeout { kind, waited })?;
        let mut events = probe.events;
        events.append(&mut package.events);
        package.events = events;
        Ok(package)
    }

    /// Sends one envelope and waits for the package carrying its id.
    /// `None` means the deadline passed.
    fn exchange(
        &self,
        envelope: CommandEnvelope,
        timeout: Duration,
    ) -> BridgeResult<Option<ResultPackage>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let envelope = envelope.with_correlation_id(id);
        let kind = envelope.kind();
        let body = WireMessage::Command(envelope).encode()?;

        let (tx, rx) = mpsc::channel();
        let _registration = Registration::new(&self.pending, id, tx);

        let started = Instant::now();
        self.commands.send(&body)?;
        tracing::debug!(id, %kind, "command sent");

        match rx.recv_timeout(timeout) {
            Ok(package) => {
                tracing::debug!(
                    id,
                    %kind,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    events = package.events.len(),
                    "result received"
                );
                Ok(Some(package))
            }
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => {
                tracing::warn!(id, %kind, ?timeout, "no result before deadline");
                Ok(None)
            }
        }
    }
}

impl Drop for CallGate {
    fn drop(&mut self) {
        let _ = self.commands.close();
        let _ = self.responses.close();
    }
}

/// Removes a pending entry when the waiting call returns, however it returns.
struct Registration<'a> {
    pending: &'a Pending,
    id: u64,
}

impl<'a> Registration<'a> {
    fn new(pending: &'a Pending, id: u64, tx: Sender<ResultPackage>) -> Self {
        pending.lock().insert(id, tx);
        Self { pending, id }
    }
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.pending.lock().remove(&self.id);
    }
}

/// First correlation id of a gate: 31 random bits above a 32-bit counter,
/// so ids stay positive on the wire.
fn session_base() -> u64 {
    let (random, _) = Uuid::new_v4().as_u64_pair();
    ((random >> 33) << 32) | 1
}

fn route(pending: &Pending, body: &[u8]) {
    let package = match WireMessage::decode(body) {
        Ok(WireMessage::Result(package)) => package,
        Ok(WireMessage::Command(envelope)) => {
            tracing::warn!(id = envelope.correlation_id, "ignoring command on response channel");
            return;
        }
        Err(e) => {
            tracing::warn!(error = %e, "dropping undecodable response");
            return;
        }
    };

    let id = package.correlation_id;
    match pending.lock().remove(&id) {
        Some(waiter) => {
            // The waiter may have timed out between lookup and send.
            let _ = waiter.send(package);
        }
        None => tracing::debug!(
            id,
            events = package.events.len(),
            "discarding result nobody is waiting for"
        ),
    }
}
