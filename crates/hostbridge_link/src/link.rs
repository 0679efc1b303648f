//! The link abstraction shared by every transport.

use crate::error::{LinkError, LinkResult};
use parking_lot::Mutex;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

/// Callback invoked once per inbound frame.
pub type FrameHandler = Box<dyn FnMut(Vec<u8>) + Send + 'static>;

/// One direction-agnostic endpoint of a byte-frame channel.
///
/// Frames are delivered whole and in send order. The receive handler runs
/// on a link-owned thread, never on the sender's thread.
pub trait Link: Send + Sync {
    /// Sends one frame body.
    fn send(&self, body: &[u8]) -> LinkResult<()>;

    /// Registers the receive handler. Frames that arrived earlier are
    /// delivered to it first.
    fn on_receive(&self, handler: FrameHandler) -> LinkResult<()>;

    /// Checks whether the link is still usable.
    fn is_connected(&self) -> bool;

    /// Closes the link.
    fn close(&self) -> LinkResult<()>;
}

/// Inbound queue feeding a single dispatch thread.
///
/// Producers push frames as they arrive; nothing is delivered until a
/// handler is attached, and then everything is delivered in arrival order.
pub(crate) struct Inbox {
    sender: Sender<Vec<u8>>,
    receiver: Mutex<Option<Receiver<Vec<u8>>>>,
}

impl Inbox {
    pub(crate) fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender,
            receiver: Mutex::new(Some(receiver)),
        }
    }

    /// A producer handle for reader threads.
    pub(crate) fn sender(&self) -> Sender<Vec<u8>> {
        self.sender.clone()
    }

    pub(crate) fn attach(&self, name: &str, mut handler: FrameHandler) -> LinkResult<()> {
        let receiver = self
            .receiver
            .lock()
            .take()
            .ok_or(LinkError::HandlerAlreadySet)?;
        // The dispatch thread ends once every producer has hung up.
        thread::Builder::new()
            .name(format!("{name}-dispatch"))
            .spawn(move || {
                for frame in receiver {
                    handler(frame);
                }
            })?;
        Ok(())
    }
}
