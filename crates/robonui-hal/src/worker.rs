//! Dedicated thread owning a [`ServoTransport`].
//!
//! Serial exchanges can block for up to the read timeout, so they never run
//! on the thread that produced the angles. Callers hold a cloneable
//! [`TransportHandle`] and talk to the worker over a bounded
//! `tokio::sync::mpsc` queue:
//!
//! - [`submit`][TransportHandle::submit] is fire-and-forget and never blocks;
//!   when the queue is full the command is dropped.
//! - [`request`][TransportHandle::request] waits on a `oneshot` for the
//!   response.
//!
//! [`TransportWorker::shutdown`] lets queued jobs drain, then drops the
//! transport (which centres the channels and closes the port) and joins the
//! thread.

use std::thread::{self, JoinHandle};

use robonui_types::RoboNuiError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::protocol::{ServoCommandGroup, ServoProtocol};
use crate::transport::ServoTransport;

pub const DEFAULT_QUEUE_DEPTH: usize = 32;

enum Job {
    Submit(Box<dyn ServoCommandGroup>),
    Request(Box<dyn ServoCommandGroup>, oneshot::Sender<Option<Vec<u8>>>),
    Shutdown,
}

#[derive(Clone)]
pub struct TransportHandle {
    port: String,
    protocol: ServoProtocol,
    hardware: bool,
    jobs: mpsc::Sender<Job>,
}

impl TransportHandle {
    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn protocol(&self) -> ServoProtocol {
        self.protocol
    }

    /// Whether the underlying transport reached the hardware.
    pub fn is_connected(&self) -> bool {
        self.hardware
    }

    /// Queue `group` without waiting. Dropped if the queue is full or the
    /// worker has stopped.
    pub fn submit(&self, group: Box<dyn ServoCommandGroup>) {
        match self.jobs.try_send(Job::Submit(group)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!(port = %self.port, "transport queue full; command dropped");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(port = %self.port, "transport worker stopped; command dropped");
            }
        }
    }

    /// Send `group` and block until the worker answers.
    ///
    /// `None` when no response arrived in time or the worker has stopped.
    /// Must not be called from inside an async runtime.
    pub fn request(&self, group: Box<dyn ServoCommandGroup>) -> Option<Vec<u8>> {
        let (reply, response) = oneshot::channel();
        if self.jobs.blocking_send(Job::Request(group, reply)).is_err() {
            warn!(port = %self.port, "transport worker stopped; request abandoned");
            return None;
        }
        response.blocking_recv().ok().flatten()
    }
}

pub struct TransportWorker {
    handle: TransportHandle,
    thread: Option<JoinHandle<()>>,
}

impl TransportWorker {
    pub fn spawn(transport: ServoTransport, queue_depth: usize) -> Result<Self, RoboNuiError> {
        let (jobs, mut queue) = mpsc::channel::<Job>(queue_depth.max(1));
        let handle = TransportHandle {
            port: transport.port().to_string(),
            protocol: transport.protocol(),
            hardware: transport.is_active(),
            jobs,
        };

        let thread = thread::Builder::new()
            .name(format!("servo-{}", transport.port()))
            .spawn(move || {
                let mut transport = transport;
                while let Some(job) = queue.blocking_recv() {
                    match job {
                        Job::Submit(group) => {
                            transport.send_command(group.as_ref());
                        }
                        Job::Request(group, reply) => {
                            let response = transport.send_command(group.as_ref());
                            if reply.send(response).is_err() {
                                debug!(port = %transport.port(), "requester went away");
                            }
                        }
                        Job::Shutdown => break,
                    }
                }
                // Dropping the transport centres the channels and closes the port.
                drop(transport);
            })
            .map_err(|e| RoboNuiError::Transport {
                port: handle.port.clone(),
                details: format!("failed to spawn worker: {e}"),
            })?;

        Ok(Self {
            handle,
            thread: Some(thread),
        })
    }

    pub fn handle(&self) -> TransportHandle {
        self.handle.clone()
    }

    /// Drain queued jobs, release the transport and join the thread.
    /// Idempotent.
    pub fn shutdown(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        // The worker may already be gone; either way the join below is final.
        let _ = self.handle.jobs.blocking_send(Job::Shutdown);
        if thread.join().is_err() {
            warn!(port = %self.handle.port, "transport worker panicked");
        }
        info!(port = %self.handle.port, "transport worker stopped");
    }
}

impl Drop for TransportWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
