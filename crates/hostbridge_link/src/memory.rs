//! In-process links.

use crate::error::{LinkError, LinkResult};
use crate::link::{FrameHandler, Inbox, Link};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;

/// One end of an in-process link pair.
///
/// Frames sent on one end are received on the other. Closing either end
/// closes both.
pub struct MemoryLink {
    name: String,
    inbox: Inbox,
    peer: Mutex<Option<Sender<Vec<u8>>>>,
    open: Arc<AtomicBool>,
}

impl MemoryLink {
    /// Creates two connected endpoints.
    pub fn pair() -> (MemoryLink, MemoryLink) {
        Self::named_pair("memory")
    }

    /// Creates two connected endpoints whose dispatch threads carry `name`.
    pub fn named_pair(name: &str) -> (MemoryLink, MemoryLink) {
        let open = Arc::new(AtomicBool::new(true));
        let left_inbox = Inbox::new();
        let right_inbox = Inbox::new();
        let left_peer = right_inbox.sender();
        let right_peer = left_inbox.sender();

        let left = MemoryLink {
            name: format!("{name}-a"),
            inbox: left_inbox,
            peer: Mutex::new(Some(left_peer)),
            open: Arc::clone(&open),
        };
        let right = MemoryLink {
            name: format!("{name}-b"),
            inbox: right_inbox,
            peer: Mutex::new(Some(right_peer)),
            open,
        };
        (left, right)
    }
}

impl Link for MemoryLink {
    fn send(&self, body: &[u8]) -> LinkResult<()> {
        if !self.is_connected() {
            return Err(LinkError::Closed);
        }
        let peer = self.peer.lock();
        let peer = peer.as_ref().ok_or(LinkError::Closed)?;
        peer.send(body.to_vec()).map_err(|_| LinkError::Closed)
    }

    fn on_receive(&self, handler: FrameHandler) -> LinkResult<()> {
        self.inbox.attach(&self.name, handler)
    }

    fn is_connected(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn close(&self) -> LinkResult<()> {
        self.open.store(false, Ordering::SeqCst);
        self.peer.lock().take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn frames_cross_in_both_directions() {
        let (a, b) = MemoryLink::pair();
        let (a_tx, a_rx) = mpsc::channel();
        let (b_tx, b_rx) = mpsc::channel();
        a.on_receive(Box::new(move |f| a_tx.send(f).unwrap())).unwrap();
        b.on_receive(Box::new(move |f| b_tx.send(f).unwrap())).unwrap();

        a.send(b"ping").unwrap();
        b.send(b"pong").unwrap();

        assert_eq!(b_rx.recv_timeout(Duration::from_secs(1)).unwrap(), b"ping");
        assert_eq!(a_rx.recv_timeout(Duration::from_secs(1)).unwrap(), b"pong");
    }

    #[test]
    fn handler_runs_off_the_sending_thread() {
        let (a, b) = MemoryLink::pair();
        let (tx, rx) = mpsc::channel();
        b.on_receive(Box::new(move |_| {
            tx.send(std::thread::current().id()).unwrap();
        }))
        .unwrap();
        a.send(b"x").unwrap();
        let handler_thread = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_ne!(handler_thread, std::thread::current().id());
    }

    #[test]
    fn close_is_shared() {
        let (a, b) = MemoryLink::pair();
        b.close().unwrap();
        assert!(!a.is_connected());
        assert!(matches!(a.send(b"late"), Err(LinkError::Closed)));
    }
}
