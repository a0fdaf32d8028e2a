//! Render-surface session lifecycle.
//!
//! A session spans one drawable surface: from the platform creating it to
//! the engine being terminated and its render thread joined. The
//! [`Coordinator`] turns host surface callbacks into a strictly serialized
//! sequence of [`NativeEngine`] calls on a dedicated render thread:
//!
//! ```text
//! bind_surface → [inject_image]* → init → (render_frame | inject_image | surface_resized | input_event)* → terminate → unbind_surface
//! ```
//!
//! The state machine itself lives in [`lifecycle`] and is free of threads
//! and locks.

mod args;
mod config;
mod coordinator;
mod error;
mod input;
pub mod lifecycle;
mod native;
mod status;

#[cfg(test)]
mod testing;

pub use args::{
    assemble_arguments, ArgumentList, LaunchCommand, LaunchRequest, BENCHMARK_FLAG,
    DEFAULT_COMMAND, HEADLESS_FLAG,
};
pub use config::{AssetContext, SessionConfig};
pub use coordinator::{Coordinator, SessionHandle};
pub use error::{FailureKind, SessionError};
pub use input::{InputEvent, PointerButton, TouchPhase};
pub use lifecycle::{Effect, Lifecycle, LifecycleEvent, LifecycleState};
pub use native::{NativeEngine, SurfaceSize};
pub use status::{ChannelReporter, LogReporter, Phase, StatusReporter, StatusUpdate};
