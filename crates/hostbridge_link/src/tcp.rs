//! Links over TCP sockets.
//!
//! The host binds one listener per channel and accepts any number of
//! clients; a send reaches every connected peer. Clients connect to a
//! single host. Each accepted or connected stream gets its own reader
//! thread that reassembles frames and hands them to the link's inbox.

use crate::error::{LinkError, LinkResult};
use crate::link::{FrameHandler, Inbox, Link};
use hostbridge_protocol::{encode_frame, FrameDecoder};
use parking_lot::Mutex;
use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const ACCEPT_POLL: Duration = Duration::from_millis(20);
const READ_CHUNK: usize = 16 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Listener,
    Client,
}

struct Shared {
    name: String,
    role: Role,
    address: SocketAddr,
    inbox: Inbox,
    peers: Mutex<Vec<(u64, TcpStream)>>,
    next_peer: AtomicU64,
    open: AtomicBool,
}

/// A link over one or more TCP streams.
pub struct TcpLink {
    shared: Arc<Shared>,
}

impl TcpLink {
    /// Binds a listening link. Use port 0 to pick a free port.
    pub fn bind(addr: impl ToSocketAddrs) -> LinkResult<Self> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        let address = listener.local_addr()?;

        let shared = Arc::new(Shared::new(
            format!("tcp-{}", address.port()),
            Role::Listener,
            address,
        ));
        let accept_shared = Arc::clone(&shared);
        thread::Builder::new()
            .name(format!("{}-accept", shared.name))
            .spawn(move || accept_loop(&listener, &accept_shared))?;

        tracing::info!(%address, "link listening");
        Ok(Self { shared })
    }

    /// Connects to a listening link.
    pub fn connect(addr: impl ToSocketAddrs) -> LinkResult<Self> {
        let stream = TcpStream::connect(addr)?;
        let address = stream.peer_addr()?;
        let shared = Arc::new(Shared::new(
            format!("tcp-{}", address.port()),
            Role::Client,
            address,
        ));
        Shared::add_peer(&shared, stream)?;
        tracing::debug!(%address, "link connected");
        Ok(Self { shared })
    }

    /// Connects with a bounded wait for the host to accept.
    pub fn connect_timeout(addr: &SocketAddr, timeout: Duration) -> LinkResult<Self> {
        let stream = TcpStream::connect_timeout(addr, timeout)?;
        let shared = Arc::new(Shared::new(format!("tcp-{}", addr.port()), Role::Client, *addr));
        Shared::add_peer(&shared, stream)?;
        Ok(Self { shared })
    }

    /// Listening address for bound links, remote address for connected ones.
    pub fn address(&self) -> SocketAddr {
        self.shared.address
    }

    /// Number of currently connected peers.
    pub fn peer_count(&self) -> usize {
        self.shared.peers.lock().len()
    }
}

impl Shared {
    fn new(name: String, role: Role, address: SocketAddr) -> Self {
        Self {
            name,
            role,
            address,
            inbox: Inbox::new(),
            peers: Mutex::new(Vec::new()),
            next_peer: AtomicU64::new(1),
            open: AtomicBool::new(true),
        }
    }

    fn add_peer(shared: &Arc<Self>, stream: TcpStream) -> LinkResult<()> {
        stream.set_nonblocking(false)?;
        stream.set_nodelay(true)?;
        let reader = stream.try_clone()?;
        let id = shared.next_peer.fetch_add(1, Ordering::Relaxed);
        let sender = shared.inbox.sender();
        let reader_shared = Arc::clone(shared);

        shared.peers.lock().push((id, stream));
        thread::Builder::new()
            .name(format!("{}-read-{id}", shared.name))
            .spawn(move || {
                read_loop(reader, &sender);
                reader_shared.peers.lock().retain(|(peer, _)| *peer != id);
                tracing::debug!(link = %reader_shared.name, peer = id, "peer disconnected");
            })?;
        Ok(())
    }
}

fn accept_loop(listener: &TcpListener, shared: &Arc<Shared>) {
    while shared.open.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, peer)) => {
                tracing::debug!(link = %shared.name, %peer, "peer accepted");
                if let Err(e) = Shared::add_peer(shared, stream) {
                    tracing::warn!(link = %shared.name, %peer, error = %e, "failed to attach peer");
                }
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => {
                tracing::error!(link = %shared.name, error = %e, "accept failed");
                break;
            }
        }
    }
}

fn read_loop(mut stream: TcpStream, sender: &Sender<Vec<u8>>) {
    let mut decoder = FrameDecoder::new();
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        let n = match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::debug!(error = %e, "read failed");
                return;
            }
        };
        decoder.push(&chunk[..n]);
        loop {
            match decoder.next_frame() {
                Ok(Some(body)) => {
                    if sender.send(body).is_err() {
                        return;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "dropping stream with malformed frame");
                    return;
                }
            }
        }
    }
    if let Err(e) = decoder.finish() {
        tracing::warn!(error = %e, "stream closed mid-frame");
    }
}

impl Link for TcpLink {
    fn send(&self, body: &[u8]) -> LinkResult<()> {
        if !self.shared.open.load(Ordering::SeqCst) {
            return Err(LinkError::Closed);
        }
        let frame = encode_frame(body)?;
        let mut peers = self.shared.peers.lock();
        if peers.is_empty() {
            return Err(LinkError::NoPeer);
        }
        peers.retain_mut(|(id, stream)| match stream.write_all(&frame) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(link = %self.shared.name, peer = *id, error = %e, "dropping peer");
                let _ = stream.shutdown(Shutdown::Both);
                false
            }
        });
        if peers.is_empty() {
            return Err(LinkError::NoPeer);
        }
        Ok(())
    }

    fn on_receive(&self, handler: FrameHandler) -> LinkResult<()> {
        self.shared.inbox.attach(&self.shared.name, handler)
    }

    fn is_connected(&self) -> bool {
        self.shared.open.load(Ordering::SeqCst)
            && (self.shared.role == Role::Listener || !self.shared.peers.lock().is_empty())
    }

    fn close(&self) -> LinkResult<()> {
        if self.shared.open.swap(false, Ordering::SeqCst) {
            for (_, stream) in self.shared.peers.lock().drain(..) {
                let _ = stream.shutdown(Shutdown::Both);
            }
            tracing::debug!(link = %self.shared.name, "link closed");
        }
        Ok(())
    }
}

impl Drop for TcpLink {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
