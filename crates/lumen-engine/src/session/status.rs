use std::fmt;

use crossbeam_channel::{Receiver, Sender};

use super::error::FailureKind;

/// Human-readable lifecycle phase shown to the user.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Phase {
    SurfaceCreated,
    SurfaceReady,
    WaitingForInput,
    Initializing,
    Running,
    ImageLoaded,
    DecodeFailed,
    InitializationFailed,
    RenderFailed,
    WorkerFailed,
    Stopping,
    Terminated,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Phase::SurfaceCreated => "surface created",
            Phase::SurfaceReady => "surface ready",
            Phase::WaitingForInput => "waiting for input",
            Phase::Initializing => "initializing",
            Phase::Running => "running",
            Phase::ImageLoaded => "image loaded",
            Phase::DecodeFailed => "decode failed",
            Phase::InitializationFailed => "initialization failed",
            Phase::RenderFailed => "render failed",
            Phase::WorkerFailed => "render thread failed",
            Phase::Stopping => "stopping",
            Phase::Terminated => "terminated",
        }
    }

    pub fn failure(self) -> Option<FailureKind> {
        match self {
            Phase::DecodeFailed => Some(FailureKind::Decode),
            Phase::InitializationFailed => Some(FailureKind::Initialization),
            Phase::RenderFailed | Phase::WorkerFailed => Some(FailureKind::Render),
            _ => None,
        }
    }

    /// Fatal phases end the session; the host shows them once and leaves.
    pub fn is_fatal(self) -> bool {
        self.failure().is_some_and(FailureKind::is_fatal)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One status notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    /// Session that produced the update; increases with every new surface.
    pub session: u64,
    pub phase: Phase,
    pub detail: Option<String>,
}

impl fmt::Display for StatusUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}: {}", self.phase, detail),
            None => write!(f, "{}", self.phase),
        }
    }
}

/// Passive sink for lifecycle status.
///
/// Called from the UI thread, the render thread and the image decode helper,
/// with the session lock held. Implementations must return quickly, must not
/// call back into the coordinator, and marshal to the UI thread themselves.
pub trait StatusReporter: Send + Sync {
    fn report(&self, update: &StatusUpdate);
}

impl<F> StatusReporter for F
where
    F: Fn(&StatusUpdate) + Send + Sync,
{
    fn report(&self, update: &StatusUpdate) {
        self(update)
    }
}

/// Writes status to the log only.
#[derive(Debug, Default, Copy, Clone)]
pub struct LogReporter;

impl StatusReporter for LogReporter {
    fn report(&self, update: &StatusUpdate) {
        if update.phase.is_fatal() {
            log::error!("session {}: {update}", update.session);
        } else {
            log::info!("session {}: {update}", update.session);
        }
    }
}

/// Forwards status into a channel; the receiving side decides which thread
/// handles it.
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    tx: Sender<StatusUpdate>,
}

impl ChannelReporter {
    pub fn new() -> (Self, Receiver<StatusUpdate>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self { tx }, rx)
    }
}

impl StatusReporter for ChannelReporter {
    fn report(&self, update: &StatusUpdate) {
        // A dropped receiver just means nobody is watching anymore.
        let _ = self.tx.send(update.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_phases() {
        assert!(Phase::InitializationFailed.is_fatal());
        assert!(Phase::RenderFailed.is_fatal());
        assert!(Phase::WorkerFailed.is_fatal());
        assert!(!Phase::DecodeFailed.is_fatal());
        assert!(!Phase::Terminated.is_fatal());
    }

    #[test]
    fn display_includes_detail() {
        let update = StatusUpdate {
            session: 3,
            phase: Phase::SurfaceReady,
            detail: Some("640x480".into()),
        };
        assert_eq!(update.to_string(), "surface ready: 640x480");
    }

    #[test]
    fn closures_are_reporters() {
        let seen = std::sync::Mutex::new(Vec::new());
        let reporter = |u: &StatusUpdate| seen.lock().unwrap().push(u.phase);
        reporter.report(&StatusUpdate {
            session: 1,
            phase: Phase::Running,
            detail: None,
        });
        assert_eq!(*seen.lock().unwrap(), vec![Phase::Running]);
    }
}
