use crate::render_thread::RenderThreadError;

/// Classification of failures reported to the user.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum FailureKind {
    /// `init` failed. Fatal for the session.
    Initialization,
    /// `render_frame` failed. Fatal for the session.
    Render,
    /// The selected image could not be decoded. The session is unaffected.
    Decode,
    /// A native call was about to reach an unbound surface. The lifecycle
    /// rules out this case; seeing it means a logic error.
    SurfaceRace,
}

impl FailureKind {
    pub fn is_fatal(self) -> bool {
        !matches!(self, FailureKind::Decode)
    }
}

/// Errors returned to the host from coordinator operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    RenderThread(#[from] RenderThreadError),

    /// The engine was lost when a previous render thread panicked.
    #[error("native engine is unavailable; a previous render thread did not return it")]
    EngineUnavailable,
}
