//! Wired host and client pairs.
//!
//! Each [`TestBridge`] owns an in-memory host document, a dispatcher
//! serving it and a [`HostAdapter`] reaching it, plus a [`MemorySink`] that
//! collects every event replayed on the client.

use hostbridge_host::{Dispatcher, HostServer, MemoryWorkspace};
use hostbridge_link::{
    CallGate, ConnectionSettings, HostAdapter, Link, MemoryLink, MemorySink, TcpLink,
};
use hostbridge_protocol::{CommandKind, ResultPackage, WireMessage};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Settings with short deadlines, for tests that wait on purpose.
pub fn fast_settings() -> ConnectionSettings {
    ConnectionSettings::new()
        .with_probe_timeout(Duration::from_millis(250))
        .with_max_minutes_to_wait(0.005)
}

/// Settings generous enough for tests that expect answers.
pub fn patient_settings() -> ConnectionSettings {
    ConnectionSettings::new()
        .with_probe_timeout(Duration::from_secs(5))
        .with_max_minutes_to_wait(0.5)
}

/// A client wired to an in-memory host.
pub struct TestBridge {
    /// The host document.
    pub workspace: Arc<MemoryWorkspace>,
    /// The host dispatcher.
    pub dispatcher: Arc<Dispatcher>,
    /// Events replayed on the client.
    pub sink: Arc<MemorySink>,
    /// The client.
    pub adapter: HostAdapter,
    server: Option<HostServer>,
    listeners: Option<Listeners>,
    _idle: Vec<MemoryLink>,
}

/// The host's TCP endpoints and the settings that reach them.
struct Listeners {
    commands: Arc<TcpLink>,
    responses: Arc<TcpLink>,
    settings: ConnectionSettings,
}

impl Listeners {
    /// Waits until both endpoints have accepted `peers` clients.
    fn wait_for(&self, peers: usize) {
        // Results are only delivered once the response stream is accepted.
        let deadline = Instant::now() + Duration::from_secs(5);
        while self.commands.peer_count() < peers || self.responses.peer_count() < peers {
            assert!(Instant::now() < deadline, "host never accepted the client");
            thread::sleep(Duration::from_millis(5));
        }
    }
}

impl TestBridge {
    /// Client and host over in-memory links.
    pub fn memory() -> Self {
        Self::memory_with(patient_settings())
    }

    /// Client and host over in-memory links, with custom settings.
    pub fn memory_with(settings: ConnectionSettings) -> Self {
        let (workspace, dispatcher) = host();
        let (client_cmd, host_cmd) = MemoryLink::named_pair("commands");
        let (host_resp, client_resp) = MemoryLink::named_pair("results");
        let server = HostServer::start(
            Arc::clone(&dispatcher),
            Arc::new(host_cmd),
            Arc::new(host_resp),
        )
        .expect("failed to start host server");
        let gate = CallGate::new(Arc::new(client_cmd), Arc::new(client_resp), settings)
            .expect("failed to create call gate");
        Self::assemble(workspace, dispatcher, HostAdapter::remote(gate), Some(server))
    }

    /// Client calling the dispatcher in-process.
    pub fn local() -> Self {
        let (workspace, dispatcher) = host();
        let adapter = HostAdapter::local(dispatcher.clone());
        Self::assemble(workspace, dispatcher, adapter, None)
    }

    /// Client and host over loopback TCP on free ports.
    pub fn tcp() -> Self {
        let (workspace, dispatcher) = host();
        let commands = Arc::new(TcpLink::bind("127.0.0.1:0").expect("failed to bind"));
        let responses = Arc::new(TcpLink::bind("127.0.0.1:0").expect("failed to bind"));
        let settings = patient_settings()
            .with_push_port(commands.address().port())
            .with_pull_port(responses.address().port());

        let server = HostServer::start(
            Arc::clone(&dispatcher),
            commands.clone(),
            responses.clone(),
        )
        .expect("failed to start host server");
        let adapter = HostAdapter::connect(settings.clone()).expect("failed to connect");

        let listeners = Listeners {
            commands,
            responses,
            settings,
        };
        listeners.wait_for(1);
        let mut bridge = Self::assemble(workspace, dispatcher, adapter, Some(server));
        bridge.listeners = Some(listeners);
        bridge
    }

    /// Connects one more client to a TCP bridge's host, with its own sink.
    /// Returns `None` for bridges not built with [`TestBridge::tcp`].
    pub fn connect_client(&self) -> Option<(HostAdapter, Arc<MemorySink>)> {
        let listeners = self.listeners.as_ref()?;
        let peers = listeners.commands.peer_count();
        let adapter =
            HostAdapter::connect(listeners.settings.clone()).expect("failed to connect");
        listeners.wait_for(peers + 1);
        let sink = Arc::new(MemorySink::new());
        Some((adapter.with_sink(sink.clone()), sink))
    }

    /// Client whose host never answers anything.
    pub fn silent(settings: ConnectionSettings) -> Self {
        let (workspace, dispatcher) = host();
        let (client_cmd, host_cmd) = MemoryLink::pair();
        let (host_resp, client_resp) = MemoryLink::pair();
        let gate = CallGate::new(Arc::new(client_cmd), Arc::new(client_resp), settings)
            .expect("failed to create call gate");
        let mut bridge = Self::assemble(workspace, dispatcher, HostAdapter::remote(gate), None);
        bridge._idle = vec![host_cmd, host_resp];
        bridge
    }

    /// Client whose host answers connection checks but never finishes a
    /// command.
    pub fn stalled(settings: ConnectionSettings) -> Self {
        let (workspace, dispatcher) = host();
        let (client_cmd, host_cmd) = MemoryLink::pair();
        let (host_resp, client_resp) = MemoryLink::pair();
        host_cmd
            .on_receive(Box::new(move |body| {
                let Ok(WireMessage::Command(envelope)) = WireMessage::decode(&body) else {
                    return;
                };
                if envelope.kind() == CommandKind::ConnectionCheck {
                    let reply = WireMessage::Result(ResultPackage::new(envelope.correlation_id));
                    let _ = host_resp.send(&reply.encode().expect("encode"));
                }
            }))
            .expect("failed to attach host handler");
        let gate = CallGate::new(Arc::new(client_cmd), Arc::new(client_resp), settings)
            .expect("failed to create call gate");
        let mut bridge = Self::assemble(workspace, dispatcher, HostAdapter::remote(gate), None);
        bridge._idle = vec![host_cmd];
        bridge
    }

    /// Stops the host server, if one is running.
    pub fn stop_host(&mut self) {
        if let Some(server) = self.server.take() {
            server.shutdown();
        }
    }

    fn assemble(
        workspace: Arc<MemoryWorkspace>,
        dispatcher: Arc<Dispatcher>,
        adapter: HostAdapter,
        server: Option<HostServer>,
    ) -> Self {
        let sink = Arc::new(MemorySink::new());
        Self {
            workspace,
            dispatcher,
            adapter: adapter.with_sink(sink.clone()),
            sink,
            server,
            listeners: None,
            _idle: Vec::new(),
        }
    }
}

fn host() -> (Arc<MemoryWorkspace>, Arc<Dispatcher>) {
    let workspace = Arc::new(MemoryWorkspace::new());
    let dispatcher = Arc::new(Dispatcher::new(workspace.clone()));
    (workspace, dispatcher)
}
