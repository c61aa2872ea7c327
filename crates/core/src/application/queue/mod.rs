//! Per-identity command queue
//!
//! Commands for the same identity run strictly one at a time, in submission
//! order, on a dedicated worker task. Different identities progress
//! independently. Callers may wait for a command's outcome (bounded by a
//! timeout) or fire and forget.

pub mod completion;
pub mod constants;
mod panic_guard;
pub mod runner;
mod worker;

pub use completion::{completion_channel, CommandOutcome, Completion, CompletionHandle};
pub use panic_guard::{execute_guarded, PanicGuardResult};
pub use runner::CommandRunner;

use crate::config::QueueConfig;
use crate::domain::{Command, Identity};
use crate::error::CommandError;
use crate::port::{Reauthenticator, RemoteCallClient};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn, Instrument};
use worker::{QueueEntry, SharedReceiver, Worker};

struct WorkerSlot {
    sender: UnboundedSender<QueueEntry>,
    receiver: SharedReceiver,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Registry {
    stopped: bool,
    workers: HashMap<Identity, WorkerSlot>,
}

/// Serialized command queue, one FIFO and one worker per identity
pub struct CommandQueue {
    runner: Arc<CommandRunner>,
    config: QueueConfig,
    registry: Mutex<Registry>,
}

impl CommandQueue {
    pub fn new(
        client: Arc<dyn RemoteCallClient>,
        reauth: Option<Arc<dyn Reauthenticator>>,
        config: QueueConfig,
    ) -> Self {
        let runner = CommandRunner::new(client, reauth, config.retry_policy());
        Self {
            runner: Arc::new(runner),
            config,
            registry: Mutex::new(Registry::default()),
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Make sure a live worker exists for `identity`
    ///
    /// Idempotent. A worker whose task has finished is respawned on the same
    /// queue, so pending commands are not lost.
    ///
    /// # Panics
    /// Must be called from within a Tokio runtime.
    pub fn ensure_worker(&self, identity: &str) -> Result<(), CommandError> {
        let mut registry = self.registry();
        if registry.stopped {
            return Err(CommandError::QueueStopped);
        }
        self.ensure_slot(&mut registry, identity);
        Ok(())
    }

    /// Submit a command to its identity's queue
    ///
    /// With `wait`, resolves to the command's outcome or
    /// `CommandError::Timeout` once the effective timeout elapses (the
    /// command itself stays queued). Without `wait`, resolves to
    /// `Value::Null` as soon as the command is queued.
    pub async fn submit(
        &self,
        command: Command,
        wait: bool,
        timeout: Option<Duration>,
    ) -> Result<Value, CommandError> {
        if command.operation.is_stop() {
            return Err(CommandError::ReservedOperation(
                command.operation.kind().to_string(),
            ));
        }

        let effective_timeout = command
            .timeout
            .or(timeout)
            .unwrap_or(self.config.default_wait_timeout);

        let (completion, handle) = if wait {
            let (completion, handle) = completion_channel();
            (Some(completion), Some(handle))
        } else {
            (None, None)
        };

        debug!(
            identity = %command.identity,
            command_id = %command.id,
            label = %command.tag(),
            operation = %command.operation,
            wait = %wait,
            "Command queued"
        );
        self.push(QueueEntry {
            command,
            completion,
        })?;

        match handle {
            Some(handle) => handle.wait(effective_timeout).await,
            None => Ok(Value::Null),
        }
    }

    /// Submit and wait with the default timeout
    pub async fn execute(&self, command: Command) -> Result<Value, CommandError> {
        self.submit(command, true, None).await
    }

    /// Submit without waiting
    pub async fn enqueue(&self, command: Command) -> Result<(), CommandError> {
        self.submit(command, false, None).await.map(|_| ())
    }

    /// Stop every worker after it drains its queue
    ///
    /// New submissions are rejected from here on. Every command queued
    /// before the call still runs. When `drain_timeout` is set, workers
    /// still busy at the deadline are cancelled. Calling `stop` again is a
    /// no-op.
    pub async fn stop(&self) {
        let slots: Vec<(Identity, WorkerSlot)> = {
            let mut registry = self.registry();
            if registry.stopped {
                debug!("Command queue already stopped");
                return;
            }
            registry.stopped = true;
            registry.workers.drain().collect()
        };

        info!(workers = %slots.len(), "Stopping command queue");
        let deadline = self.config.drain_timeout.map(|t| Instant::now() + t);

        let mut handles = Vec::with_capacity(slots.len());
        for (identity, slot) in slots {
            let sentinel = QueueEntry {
                command: Command::stop(identity.clone()),
                completion: None,
            };
            if slot.sender.send(sentinel).is_err() {
                debug!(identity = %identity, "Worker queue already closed");
            }
            handles.push((identity, slot.handle));
        }

        for (identity, mut handle) in handles {
            let joined = match deadline {
                Some(deadline) => timeout_at(deadline, &mut handle).await,
                None => Ok((&mut handle).await),
            };
            match joined {
                Ok(Ok(())) => debug!(identity = %identity, "Worker drained"),
                Ok(Err(e)) => warn!(identity = %identity, error = %e, "Worker failed during drain"),
                Err(_) => {
                    warn!(identity = %identity, "Drain timeout reached, cancelling worker");
                    handle.abort();
                    if let Err(e) = handle.await {
                        if !e.is_cancelled() {
                            warn!(identity = %identity, error = %e, "Worker failed during cancellation");
                        }
                    }
                }
            }
        }

        info!("Command queue stopped");
    }

    /// Identities that currently have a worker, sorted
    pub fn active_identities(&self) -> Vec<Identity> {
        let mut identities: Vec<Identity> = self.registry().workers.keys().cloned().collect();
        identities.sort();
        identities
    }

    pub fn is_stopped(&self) -> bool {
        self.registry().stopped
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append under the registry lock so concurrent submitters are totally ordered
    fn push(&self, entry: QueueEntry) -> Result<(), CommandError> {
        let mut registry = self.registry();
        if registry.stopped {
            return Err(CommandError::QueueStopped);
        }
        let slot = self.ensure_slot(&mut registry, &entry.command.identity);
        slot.sender
            .send(entry)
            .map_err(|_| CommandError::QueueStopped)
    }

    fn ensure_slot<'a>(&self, registry: &'a mut Registry, identity: &str) -> &'a mut WorkerSlot {
        let slot = registry
            .workers
            .entry(identity.to_string())
            .or_insert_with(|| {
                let (sender, receiver) = unbounded_channel();
                let receiver: SharedReceiver = Arc::new(AsyncMutex::new(receiver));
                let handle = self.spawn_worker(identity, Arc::clone(&receiver));
                WorkerSlot {
                    sender,
                    receiver,
                    handle,
                }
            });

        if slot.handle.is_finished() {
            warn!(identity = %identity, "Worker exited unexpectedly, respawning");
            slot.handle = self.spawn_worker(identity, Arc::clone(&slot.receiver));
        }
        slot
    }

    fn spawn_worker(&self, identity: &str, receiver: SharedReceiver) -> JoinHandle<()> {
        let worker = Worker::new(
            identity.to_string(),
            receiver,
            Arc::clone(&self.runner),
            self.config.pacing,
        );
        let span = tracing::info_span!("worker", identity = %identity);
        tokio::spawn(worker.run().instrument(span))
    }
}
