use std::any::Any;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};

/// A unit of work executed on the render thread with exclusive access to the
/// thread's context.
pub type Task<C> = Box<dyn FnOnce(&mut C) + Send + 'static>;

enum Message<C> {
    Run(Task<C>),
    Shutdown,
}

#[derive(Debug, thiserror::Error)]
pub enum RenderThreadError {
    #[error("render thread is not running")]
    Stopped,

    #[error("render thread cannot stop itself")]
    SelfJoin,

    #[error("failed to spawn render thread `{name}`")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("render thread `{name}` panicked: {message}")]
    Panicked { name: String, message: String },
}

/// Outcome of [`RenderThread::start`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Started {
    Spawned,
    AlreadyRunning,
}

/// Cloneable, non-blocking submission handle.
///
/// Held by code that needs to enqueue follow-up work from either thread
/// (a finished frame enqueues the next one from the render thread itself).
pub struct TaskSender<C> {
    tx: Sender<Message<C>>,
}

impl<C> Clone for TaskSender<C> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

impl<C> std::fmt::Debug for TaskSender<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskSender")
            .field("queued", &self.tx.len())
            .finish()
    }
}

impl<C> TaskSender<C> {
    /// Enqueues `task` behind everything submitted before it.
    pub fn submit<F>(&self, task: F) -> Result<(), RenderThreadError>
    where
        F: FnOnce(&mut C) + Send + 'static,
    {
        self.tx
            .send(Message::Run(Box::new(task)))
            .map_err(|_| RenderThreadError::Stopped)
    }
}

struct Worker<C> {
    tx: Sender<Message<C>>,
    handle: JoinHandle<C>,
}

/// A single named worker thread with a FIFO task queue.
pub struct RenderThread<C> {
    name: String,
    worker: Option<Worker<C>>,
}

impl<C> RenderThread<C>
where
    C: Send + 'static,
{
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            worker: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true while a worker thread exists and has not exited.
    pub fn is_alive(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|w| !w.handle.is_finished())
    }

    /// Returns true when called from this manager's worker thread.
    pub fn is_current(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|w| w.handle.thread().id() == thread::current().id())
    }

    /// Spawns the worker unless one is already alive.
    ///
    /// `context` is only invoked when a new thread is created.
    pub fn start<F>(&mut self, context: F) -> Result<Started, RenderThreadError>
    where
        F: FnOnce() -> C,
    {
        if self.is_alive() {
            return Ok(Started::AlreadyRunning);
        }

        // A worker that exited on its own (panic) is reaped before respawning.
        if let Some(dead) = self.worker.take() {
            if let Err(payload) = dead.handle.join() {
                log::error!(
                    "render thread `{}` had exited: {}",
                    self.name,
                    panic_message(payload.as_ref())
                );
            }
        }

        let (tx, rx) = unbounded();
        let context = context();
        let name = self.name.clone();

        let handle = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || worker_loop(name, context, rx))
            .map_err(|source| RenderThreadError::Spawn {
                name: self.name.clone(),
                source,
            })?;

        log::debug!("render thread `{}` started", self.name);
        self.worker = Some(Worker { tx, handle });
        Ok(Started::Spawned)
    }

    /// Returns a submission handle for the live worker.
    pub fn sender(&self) -> Option<TaskSender<C>> {
        self.worker.as_ref().map(|w| TaskSender { tx: w.tx.clone() })
    }

    /// Enqueues `task` on the live worker.
    pub fn submit<F>(&self, task: F) -> Result<(), RenderThreadError>
    where
        F: FnOnce(&mut C) + Send + 'static,
    {
        let worker = self.worker.as_ref().ok_or(RenderThreadError::Stopped)?;
        worker
            .tx
            .send(Message::Run(Box::new(task)))
            .map_err(|_| RenderThreadError::Stopped)
    }

    /// Stops the worker and blocks until it has been joined.
    ///
    /// Tasks submitted before this call still run, in order. Anything
    /// submitted after the shutdown marker is discarded. Returns the worker's
    /// context, or `None` if no worker was running.
    pub fn stop(&mut self) -> Result<Option<C>, RenderThreadError> {
        if self.is_current() {
            return Err(RenderThreadError::SelfJoin);
        }

        let Some(worker) = self.worker.take() else {
            return Ok(None);
        };

        // The worker may already be gone; the join below reports why.
        let _ = worker.tx.send(Message::Shutdown);
        drop(worker.tx);

        match worker.handle.join() {
            Ok(context) => {
                log::debug!("render thread `{}` joined", self.name);
                Ok(Some(context))
            }
            Err(payload) => Err(RenderThreadError::Panicked {
                name: self.name.clone(),
                message: panic_message(payload.as_ref()),
            }),
        }
    }
}

impl<C> Drop for RenderThread<C> {
    fn drop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        if worker.handle.thread().id() == thread::current().id() {
            log::error!("render thread `{}` dropped from itself; detaching", self.name);
            return;
        }

        let _ = worker.tx.send(Message::Shutdown);
        drop(worker.tx);
        if worker.handle.join().is_err() {
            log::error!("render thread `{}` panicked during shutdown", self.name);
        }
    }
}

fn worker_loop<C>(name: String, mut context: C, rx: Receiver<Message<C>>) -> C {
    while let Ok(message) = rx.recv() {
        match message {
            Message::Run(task) => task(&mut context),
            Message::Shutdown => break,
        }
    }

    let discarded = rx.try_iter().count();
    if discarded > 0 {
        log::debug!("render thread `{name}` discarded {discarded} task(s) queued after shutdown");
    }

    context
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
