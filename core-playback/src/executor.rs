//! # Engine Command Executor
//!
//! A dedicated OS thread that owns the playback engine and runs submitted
//! closures against it one at a time, in submission order.
//!
//! The engine is built on the thread by the `init` closure passed to
//! [`CommandExecutor::spawn`] and is dropped there too, so engine types need
//! not be `Send`. Everything else in the process reaches the engine only
//! through a [`CommandSender`].
//!
//! ```ignore
//! let (executor, ()) = CommandExecutor::spawn("playback-engine", |_| {
//!     Ok((factory.create(&options)?, ()))
//! })
//! .await?;
//!
//! let sender = executor.sender();
//! sender.submit(|engine| engine.play())?;
//! let playing = sender.submit_and_wait(|engine| engine.is_playing()).await?;
//!
//! executor.shutdown(|engine| engine.release()).await?;
//! ```

use crate::error::{PlaybackError, Result};

use bridge_traits::playback::PlaybackEngine;
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, trace, warn};

/// Unit of work run on the engine thread.
pub type Command = Box<dyn FnOnce(&mut dyn PlaybackEngine) + Send + 'static>;

enum Message {
    Run(Command),
    /// Last message the thread ever handles.
    Finalize(Command, oneshot::Sender<()>),
}

type SenderSlot = Arc<RwLock<Option<mpsc::UnboundedSender<Message>>>>;

/// Cloneable handle for submitting commands to the engine thread.
///
/// All clones share one slot; once the executor shuts down every clone
/// rejects new work with [`PlaybackError::ExecutorShutDown`].
#[derive(Clone)]
pub struct CommandSender {
    slot: SenderSlot,
}

impl CommandSender {
    /// Enqueue `command` without waiting for it to run.
    pub fn submit<F>(&self, command: F) -> Result<()>
    where
        F: FnOnce(&mut dyn PlaybackEngine) + Send + 'static,
    {
        let slot = self.slot.read();
        let Some(tx) = slot.as_ref() else {
            return Err(PlaybackError::ExecutorShutDown);
        };
        tx.send(Message::Run(Box::new(command)))
            .map_err(|_| PlaybackError::ExecutorShutDown)
    }

    /// Enqueue `command` and resolve with its return value once it has run.
    ///
    /// Resolves to [`PlaybackError::CommandDropped`] if the command panicked.
    pub async fn submit_and_wait<F, R>(&self, command: F) -> Result<R>
    where
        F: FnOnce(&mut dyn PlaybackEngine) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.submit(move |engine| {
            let _ = tx.send(command(engine));
        })?;
        rx.await.map_err(|_| PlaybackError::CommandDropped)
    }

    pub fn is_shut_down(&self) -> bool {
        self.slot.read().is_none()
    }
}

impl fmt::Debug for CommandSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSender")
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

/// Owner of the engine thread.
pub struct CommandExecutor {
    sender: CommandSender,
    thread: Mutex<Option<JoinHandle<()>>>,
    thread_id: ThreadId,
    thread_name: String,
}

impl CommandExecutor {
    /// Start the engine thread.
    ///
    /// `init` runs first on the new thread. It receives a sender (so
    /// listeners can re-dispatch work) and returns the engine plus any value
    /// the caller needs back. Commands submitted while `init` runs are queued
    /// and executed after it.
    pub async fn spawn<I, T>(thread_name: &str, init: I) -> Result<(Self, T)>
    where
        I: FnOnce(&CommandSender) -> Result<(Box<dyn PlaybackEngine>, T)> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let sender = CommandSender {
            slot: Arc::new(RwLock::new(Some(tx))),
        };
        let (ready_tx, ready_rx) = oneshot::channel::<Result<T>>();

        let thread_sender = sender.clone();
        let handle = thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || {
                let mut engine = match init(&thread_sender) {
                    Ok((engine, value)) => {
                        if ready_tx.send(Ok(value)).is_err() {
                            warn!("Executor owner went away during startup");
                            let mut engine = engine;
                            engine.release();
                            return;
                        }
                        engine
                    }
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                drop(thread_sender);
                run(engine.as_mut(), rx);
                trace!("Dropping engine on executor thread");
                drop(engine);
            })
            .map_err(PlaybackError::ThreadSpawn)?;

        let thread_id = handle.thread().id();
        info!(thread = thread_name, "Playback executor started");

        match ready_rx.await {
            Ok(Ok(value)) => Ok((
                Self {
                    sender,
                    thread: Mutex::new(Some(handle)),
                    thread_id,
                    thread_name: thread_name.to_string(),
                },
                value,
            )),
            Ok(Err(err)) => {
                sender.slot.write().take();
                join_thread(handle).await;
                Err(err)
            }
            Err(_) => {
                sender.slot.write().take();
                let reason = join_thread(handle)
                    .await
                    .unwrap_or_else(|| "executor thread exited during startup".to_string());
                Err(PlaybackError::ThreadPanicked(reason))
            }
        }
    }

    pub fn sender(&self) -> CommandSender {
        self.sender.clone()
    }

    /// See [`CommandSender::submit`].
    pub fn submit<F>(&self, command: F) -> Result<()>
    where
        F: FnOnce(&mut dyn PlaybackEngine) + Send + 'static,
    {
        self.sender.submit(command)
    }

    /// See [`CommandSender::submit_and_wait`].
    pub async fn submit_and_wait<F, R>(&self, command: F) -> Result<R>
    where
        F: FnOnce(&mut dyn PlaybackEngine) -> R + Send + 'static,
        R: Send + 'static,
    {
        self.sender.submit_and_wait(command).await
    }

    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }

    pub fn is_shut_down(&self) -> bool {
        self.sender.is_shut_down()
    }

    /// Stop accepting work, run `finalizer` after every queued command, drop
    /// the engine on its thread and join the thread.
    ///
    /// Returns `Ok(false)` if the executor was already shut down.
    pub async fn shutdown<F>(&self, finalizer: F) -> Result<bool>
    where
        F: FnOnce(&mut dyn PlaybackEngine) + Send + 'static,
    {
        let taken = self.sender.slot.write().take();
        let Some(tx) = taken else {
            debug!("Playback executor already shut down");
            return Ok(false);
        };

        let (done_tx, done_rx) = oneshot::channel();
        let queued = tx.send(Message::Finalize(Box::new(finalizer), done_tx)).is_ok();
        drop(tx);

        if queued && done_rx.await.is_err() {
            warn!("Executor thread exited before running the finalizer");
        }

        let handle = self.thread.lock().take();
        if let Some(handle) = handle {
            if let Some(reason) = join_thread(handle).await {
                return Err(PlaybackError::ThreadPanicked(reason));
            }
        }

        info!(thread = %self.thread_name, "Playback executor stopped");
        Ok(true)
    }
}

impl Drop for CommandExecutor {
    fn drop(&mut self) {
        // Closing the channel lets the thread drain and exit on its own.
        if self.sender.slot.write().take().is_some() {
            warn!(thread = %self.thread_name, "Playback executor dropped without shutdown");
        }
    }
}

impl fmt::Debug for CommandExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandExecutor")
            .field("thread_name", &self.thread_name)
            .field("thread_id", &self.thread_id)
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

fn run(engine: &mut dyn PlaybackEngine, mut rx: mpsc::UnboundedReceiver<Message>) {
    let mut executed: u64 = 0;

    while let Some(message) = rx.blocking_recv() {
        match message {
            Message::Run(command) => {
                run_command(engine, command);
                executed += 1;
            }
            Message::Finalize(finalizer, done) => {
                run_command(engine, finalizer);
                debug!(executed, "Executor finalized");
                let _ = done.send(());
                return;
            }
        }
    }

    debug!(executed, "Command channel closed without finalizer");
    engine.release();
}

fn run_command(engine: &mut dyn PlaybackEngine, command: Command) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| command(engine))) {
        error!(
            panic = %panic_message(payload.as_ref()),
            "Playback command panicked; continuing with next command"
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Join off the async runtime. Returns the panic message if the thread
/// panicked.
async fn join_thread(handle: JoinHandle<()>) -> Option<String> {
    match tokio::task::spawn_blocking(move || handle.join()).await {
        Ok(Ok(())) => None,
        Ok(Err(payload)) => {
            let reason = panic_message(payload.as_ref());
            error!(panic = %reason, "Playback executor thread panicked");
            Some(reason)
        }
        Err(err) => {
            error!(error = %err, "Failed to join playback executor thread");
            Some(err.to_string())
        }
    }
}
