//! Host server loop.
//!
//! Frames arriving on the command link are decoded on the link's own
//! thread and queued to a single worker, which executes them one after the
//! other and sends each result package on the response link.

use crate::dispatcher::Dispatcher;
use crate::error::HostResult;
use hostbridge_link::{ConnectionSettings, Link, LinkError, TcpLink};
use hostbridge_protocol::{CommandEnvelope, ProtocolError, ResultPackage, WireMessage};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

enum Job {
    Execute(CommandEnvelope),
    Reject {
        correlation_id: u64,
        message: String,
    },
    Stop,
}

/// Serves commands from a pair of links.
pub struct HostServer {
    jobs: Sender<Job>,
    worker: Option<JoinHandle<()>>,
    commands: Arc<dyn Link>,
    responses: Arc<dyn Link>,
}

impl HostServer {
    /// Starts serving `commands`, answering on `responses`.
    pub fn start(
        dispatcher: Arc<Dispatcher>,
        commands: Arc<dyn Link>,
        responses: Arc<dyn Link>,
    ) -> HostResult<Self> {
        let (jobs, queue) = mpsc::channel();

        let intake = jobs.clone();
        commands.on_receive(Box::new(move |body| {
            if let Some(job) = decode(&body) {
                // The worker is gone once the server stops.
                let _ = intake.send(job);
            }
        }))?;

        let out = Arc::clone(&responses);
        let worker = thread::Builder::new()
            .name("hostbridge-worker".into())
            .spawn(move || work(&dispatcher, &queue, out.as_ref()))
            .map_err(LinkError::from)?;

        tracing::info!("host server started");
        Ok(Self {
            jobs,
            worker: Some(worker),
            commands,
            responses,
        })
    }

    /// Binds both channels over TCP and starts serving.
    pub fn bind(dispatcher: Arc<Dispatcher>, settings: &ConnectionSettings) -> HostResult<Self> {
        let commands = TcpLink::bind(settings.push_addr())?;
        let responses = TcpLink::bind(settings.pull_addr())?;
        tracing::info!(
            push = %commands.address(),
            pull = %responses.address(),
            "host listening"
        );
        Self::start(dispatcher, Arc::new(commands), Arc::new(responses))
    }

    /// Stops the worker after the commands already queued and closes both
    /// links.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.jobs.send(Job::Stop);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("host worker panicked");
            }
        }
        let _ = self.commands.close();
        let _ = self.responses.close();
    }
}

impl Drop for HostServer {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.stop();
        }
    }
}

fn decode(body: &[u8]) -> Option<Job> {
    match WireMessage::decode(body) {
        Ok(WireMessage::Command(envelope)) => Some(Job::Execute(envelope)),
        Ok(WireMessage::Result(package)) => {
            tracing::warn!(id = package.correlation_id, "ignoring result on command channel");
            None
        }
        Err(e @ ProtocolError::UnknownKind { correlation_id, .. }) => Some(Job::Reject {
            correlation_id,
            message: e.to_string(),
        }),
        Err(e) => {
            tracing::warn!(error = %e, "dropping undecodable command");
            None
        }
    }
}

fn work(dispatcher: &Dispatcher, queue: &Receiver<Job>, responses: &dyn Link) {
    while let Ok(job) = queue.recv() {
        let package = match job {
            Job::Execute(envelope) => dispatcher.execute(envelope),
            Job::Reject {
                correlation_id,
                message,
            } => {
                tracing::warn!(id = correlation_id, %message, "rejecting command");
                ResultPackage::rejection(correlation_id, message)
            }
            Job::Stop => break,
        };

        let id = package.correlation_id;
        let sent = WireMessage::Result(package)
            .encode()
            .map_err(LinkError::from)
            .and_then(|body| responses.send(&body));
        if let Err(e) = sent {
            tracing::warn!(id, error = %e, "could not send result");
        }
    }
    tracing::debug!("host worker stopped");
}
