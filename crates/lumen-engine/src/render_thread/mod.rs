//! Render thread manager.
//!
//! Owns exactly one worker thread with a strictly serial (FIFO) task queue.
//! The worker owns a context value (the native engine) for its whole
//! lifetime and hands it back when joined, so the same engine can serve the
//! next session.
//!
//! - `start` is idempotent while the worker is alive
//! - `submit` never blocks (unbounded queue)
//! - `stop` drains the queue up to the shutdown marker, joins, and returns
//!   the context; calling it from the worker itself fails fast

mod worker;

pub(crate) use worker::panic_message;
pub use worker::{RenderThread, RenderThreadError, Started, Task, TaskSender};
