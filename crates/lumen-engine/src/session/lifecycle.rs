use super::input::InputEvent;
use super::native::SurfaceSize;
use super::status::Phase;

/// Where a session is in its life.
///
/// Owned by exactly one [`Lifecycle`]; only [`Lifecycle::handle`] changes it.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum LifecycleState {
    Idle,
    SurfaceBound,
    Starting,
    Running { initialized: bool },
    Stopping,
    Terminated,
}

impl LifecycleState {
    /// Stopping or terminated; no new native work may be scheduled.
    pub fn is_winding_down(self) -> bool {
        matches!(self, LifecycleState::Stopping | LifecycleState::Terminated)
    }
}

/// Inputs to the state machine, from the UI thread, the render thread and
/// the image pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    SurfaceCreated,
    SurfaceChanged(SurfaceSize),
    SurfaceDestroyed,
    StopRequested,
    /// A decoded image was stored in the session's slot.
    ImageArrived,
    /// An inject task took the image out of the slot.
    ImageTaken,
    /// The engine finished `inject_image`.
    ImageInjected,
    InitSucceeded,
    InitFailed(String),
    FrameRendered,
    FrameFailed(String),
    /// User input from the host.
    Input(InputEvent),
    /// A native call panicked outside init and frame.
    EngineFault(String),
    /// No render thread could be started for the session.
    WorkerFailed(String),
    /// The render thread has been joined.
    WorkerJoined,
}

/// Work the owner of the lifecycle must carry out, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Report { phase: Phase, detail: Option<String> },
    SpawnWorker,
    BindSurface(SurfaceSize),
    EnqueueInit,
    EnqueueFrame,
    EnqueueInjectImage,
    ForwardResize(SurfaceSize),
    ForwardInput(InputEvent),
    /// Final task of the session: terminate, then unbind.
    EnqueueTerminate,
    /// Join the render thread, then feed back [`LifecycleEvent::WorkerJoined`].
    JoinWorker,
}

impl Effect {
    fn report(phase: Phase) -> Self {
        Effect::Report {
            phase,
            detail: None,
        }
    }

    fn report_with(phase: Phase, detail: impl Into<String>) -> Self {
        Effect::Report {
            phase,
            detail: Some(detail.into()),
        }
    }

    /// Effects that spawn or join threads can only run on the host's UI thread.
    pub fn needs_host(&self) -> bool {
        matches!(
            self,
            Effect::SpawnWorker | Effect::BindSurface(_) | Effect::JoinWorker
        )
    }
}

/// Render-thread task kinds, used to re-check admission when a task starts.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TaskKind {
    Bind,
    Init,
    Frame,
    InjectImage,
    Resize,
    Input,
}

/// Finite-state machine for one session.
///
/// Pure: no threads, no engine, no locks. The coordinator feeds it events
/// and executes the returned effects.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    state: LifecycleState,
    requires_input: bool,
    size: Option<SurfaceSize>,
    image_pending: bool,
    inject_queued: bool,
    init_attempted: bool,
    worker_spawned: bool,
    terminate_queued: bool,
    frames_rendered: u64,
}

impl Lifecycle {
    pub fn new(requires_input: bool) -> Self {
        Self {
            state: LifecycleState::Idle,
            requires_input,
            size: None,
            image_pending: false,
            inject_queued: false,
            init_attempted: false,
            worker_spawned: false,
            terminate_queued: false,
            frames_rendered: 0,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn init_attempted(&self) -> bool {
        self.init_attempted
    }

    pub fn worker_spawned(&self) -> bool {
        self.worker_spawned
    }

    /// Frames that completed while the session was running.
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn surface_size(&self) -> Option<SurfaceSize> {
        self.size
    }

    /// Whether a task of `kind` may still make its native call.
    pub fn admits(&self, kind: TaskKind) -> bool {
        use LifecycleState::*;
        match kind {
            TaskKind::Bind | TaskKind::InjectImage | TaskKind::Resize => {
                matches!(self.state, Starting | Running { .. })
            }
            TaskKind::Init => self.state == Running { initialized: false },
            TaskKind::Frame | TaskKind::Input => self.state == Running { initialized: true },
        }
    }

    /// Applies `event` and returns the effects to execute, in order.
    pub fn handle(&mut self, event: LifecycleEvent) -> Vec<Effect> {
        use LifecycleEvent as Ev;
        use LifecycleState::*;

        let mut fx = Vec::new();

        match (self.state, event) {
            (Terminated, event) => {
                log::debug!("session terminated; ignoring {event:?}");
            }

            (_, Ev::SurfaceDestroyed | Ev::StopRequested) => self.begin_stop(&mut fx),

            (Idle, Ev::SurfaceCreated) => {
                self.enter(SurfaceBound);
                fx.push(Effect::report(Phase::SurfaceCreated));
            }

            (SurfaceBound, Ev::SurfaceChanged(size)) => {
                if size.is_empty() {
                    log::debug!("surface changed to {size}; waiting for a usable size");
                } else {
                    self.size = Some(size);
                    self.enter(Starting);
                    self.worker_spawned = true;
                    fx.push(Effect::report_with(Phase::SurfaceReady, size.to_string()));
                    fx.push(Effect::SpawnWorker);
                    fx.push(Effect::BindSurface(size));
                    self.after_worker_started(&mut fx);
                }
            }

            (Starting | Running { .. }, Ev::SurfaceChanged(size)) => {
                if !size.is_empty() && self.size != Some(size) {
                    self.size = Some(size);
                    fx.push(Effect::ForwardResize(size));
                }
            }

            (_, Ev::ImageArrived) => {
                self.image_pending = true;
                if self.accepts_injection() {
                    self.queue_inject(&mut fx);
                }
            }

            (_, Ev::ImageTaken) => {
                self.image_pending = false;
                self.inject_queued = false;
            }

            (Starting, Ev::ImageInjected) => {
                fx.push(Effect::report(Phase::ImageLoaded));
                self.begin_init(&mut fx);
            }

            (Running { .. }, Ev::ImageInjected) => {
                fx.push(Effect::report(Phase::ImageLoaded));
            }

            (Running { initialized: false }, Ev::InitSucceeded) => {
                self.enter(Running { initialized: true });
                fx.push(Effect::report(Phase::Running));
                if self.image_pending && !self.inject_queued {
                    self.queue_inject(&mut fx);
                }
                fx.push(Effect::EnqueueFrame);
            }

            (Running { initialized: false }, Ev::InitFailed(reason)) => {
                self.fail(Phase::InitializationFailed, reason, &mut fx);
            }

            (Running { initialized: true }, Ev::FrameRendered) => {
                self.frames_rendered += 1;
                fx.push(Effect::EnqueueFrame);
            }

            (Running { initialized: true }, Ev::FrameFailed(reason)) => {
                self.fail(Phase::RenderFailed, reason, &mut fx);
            }

            (Running { initialized: true }, Ev::Input(input)) => {
                fx.push(Effect::ForwardInput(input));
            }

            (Starting | Running { .. }, Ev::EngineFault(reason)) => {
                self.fail(Phase::RenderFailed, reason, &mut fx);
            }

            // Nothing runs on a render thread, so there is nothing to
            // terminate; the join only settles the state.
            (_, Ev::WorkerFailed(reason)) => {
                self.worker_spawned = false;
                self.enter(Stopping);
                fx.push(Effect::report_with(Phase::WorkerFailed, reason));
                fx.push(Effect::JoinWorker);
            }

            (Stopping, Ev::WorkerJoined) => {
                self.enter(Terminated);
                fx.push(Effect::report(Phase::Terminated));
            }

            (_, Ev::Input(_)) => {}

            (state, event) => {
                log::debug!("{event:?} has no effect in {state:?}");
            }
        }

        fx
    }

    fn enter(&mut self, next: LifecycleState) {
        if self.state != next {
            log::debug!("lifecycle: {:?} -> {:?}", self.state, next);
        }
        self.state = next;
    }

    /// Images go to the engine only while it waits for input or renders.
    fn accepts_injection(&self) -> bool {
        matches!(
            self.state,
            LifecycleState::Starting | LifecycleState::Running { initialized: true }
        ) && !self.inject_queued
    }

    fn queue_inject(&mut self, fx: &mut Vec<Effect>) {
        self.inject_queued = true;
        fx.push(Effect::EnqueueInjectImage);
    }

    fn after_worker_started(&mut self, fx: &mut Vec<Effect>) {
        if !self.requires_input {
            self.begin_init(fx);
        } else if self.image_pending {
            self.queue_inject(fx);
        } else {
            fx.push(Effect::report(Phase::WaitingForInput));
        }
    }

    fn begin_init(&mut self, fx: &mut Vec<Effect>) {
        self.enter(LifecycleState::Running { initialized: false });
        self.init_attempted = true;
        fx.push(Effect::report(Phase::Initializing));
        fx.push(Effect::EnqueueInit);
    }

    /// Fatal failure on the render thread: stop scheduling work and queue the
    /// final task. The join happens when the host stops the session.
    fn fail(&mut self, phase: Phase, reason: String, fx: &mut Vec<Effect>) {
        self.enter(LifecycleState::Stopping);
        fx.push(Effect::report_with(phase, reason));
        self.queue_terminate(fx);
    }

    fn queue_terminate(&mut self, fx: &mut Vec<Effect>) {
        if self.worker_spawned && !self.terminate_queued {
            self.terminate_queued = true;
            fx.push(Effect::EnqueueTerminate);
        }
    }

    fn begin_stop(&mut self, fx: &mut Vec<Effect>) {
        if self.state != LifecycleState::Stopping {
            self.enter(LifecycleState::Stopping);
            fx.push(Effect::report(Phase::Stopping));
        }
        self.queue_terminate(fx);
        fx.push(Effect::JoinWorker);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LifecycleEvent as Ev;
    use LifecycleState::*;

    const VGA: SurfaceSize = SurfaceSize::new(640, 480);

    fn phases(fx: &[Effect]) -> Vec<Phase> {
        fx.iter()
            .filter_map(|e| match e {
                Effect::Report { phase, .. } => Some(*phase),
                _ => None,
            })
            .collect()
    }

    fn work(fx: &[Effect]) -> Vec<Effect> {
        fx.iter()
            .filter(|e| !matches!(e, Effect::Report { .. }))
            .cloned()
            .collect()
    }

    fn running(requires_input: bool) -> Lifecycle {
        let mut lc = Lifecycle::new(requires_input);
        lc.handle(Ev::SurfaceCreated);
        lc.handle(Ev::SurfaceChanged(VGA));
        if requires_input {
            lc.handle(Ev::ImageArrived);
            lc.handle(Ev::ImageTaken);
            lc.handle(Ev::ImageInjected);
        }
        lc.handle(Ev::InitSucceeded);
        lc
    }

    // ── startup ───────────────────────────────────────────────────────────

    #[test]
    fn created_binds_without_native_work() {
        let mut lc = Lifecycle::new(false);
        let fx = lc.handle(Ev::SurfaceCreated);
        assert_eq!(lc.state(), SurfaceBound);
        assert_eq!(work(&fx), vec![]);
    }

    #[test]
    fn changed_spawns_binds_and_inits_in_order() {
        let mut lc = Lifecycle::new(false);
        lc.handle(Ev::SurfaceCreated);
        let fx = lc.handle(Ev::SurfaceChanged(VGA));
        assert_eq!(lc.state(), Running { initialized: false });
        assert_eq!(
            work(&fx),
            vec![Effect::SpawnWorker, Effect::BindSurface(VGA), Effect::EnqueueInit]
        );
        assert_eq!(phases(&fx), vec![Phase::SurfaceReady, Phase::Initializing]);
        assert!(lc.init_attempted());
    }

    #[test]
    fn zero_area_surface_keeps_waiting() {
        let mut lc = Lifecycle::new(false);
        lc.handle(Ev::SurfaceCreated);
        let fx = lc.handle(Ev::SurfaceChanged(SurfaceSize::new(0, 480)));
        assert_eq!(lc.state(), SurfaceBound);
        assert!(fx.is_empty());
    }

    #[test]
    fn input_dependent_session_waits_in_starting() {
        let mut lc = Lifecycle::new(true);
        lc.handle(Ev::SurfaceCreated);
        let fx = lc.handle(Ev::SurfaceChanged(VGA));
        assert_eq!(lc.state(), Starting);
        assert_eq!(work(&fx), vec![Effect::SpawnWorker, Effect::BindSurface(VGA)]);
        assert_eq!(phases(&fx), vec![Phase::SurfaceReady, Phase::WaitingForInput]);
        assert!(!lc.init_attempted());
    }

    #[test]
    fn injected_image_releases_waiting_session() {
        let mut lc = Lifecycle::new(true);
        lc.handle(Ev::SurfaceCreated);
        lc.handle(Ev::SurfaceChanged(VGA));

        assert_eq!(work(&lc.handle(Ev::ImageArrived)), vec![Effect::EnqueueInjectImage]);
        lc.handle(Ev::ImageTaken);
        let fx = lc.handle(Ev::ImageInjected);
        assert_eq!(lc.state(), Running { initialized: false });
        assert_eq!(work(&fx), vec![Effect::EnqueueInit]);
        assert_eq!(phases(&fx), vec![Phase::ImageLoaded, Phase::Initializing]);
    }

    #[test]
    fn image_before_surface_is_injected_when_worker_starts() {
        let mut lc = Lifecycle::new(true);
        lc.handle(Ev::SurfaceCreated);
        assert_eq!(lc.handle(Ev::ImageArrived), vec![]);
        let fx = lc.handle(Ev::SurfaceChanged(VGA));
        assert_eq!(
            work(&fx),
            vec![
                Effect::SpawnWorker,
                Effect::BindSurface(VGA),
                Effect::EnqueueInjectImage
            ]
        );
        assert_eq!(lc.state(), Starting);
    }

    #[test]
    fn repeated_images_queue_one_injection() {
        let mut lc = Lifecycle::new(true);
        lc.handle(Ev::SurfaceCreated);
        lc.handle(Ev::SurfaceChanged(VGA));
        assert_eq!(work(&lc.handle(Ev::ImageArrived)), vec![Effect::EnqueueInjectImage]);
        assert_eq!(lc.handle(Ev::ImageArrived), vec![]);
        lc.handle(Ev::ImageTaken);
        // Arrived after the task took the slot: needs its own injection.
        assert_eq!(work(&lc.handle(Ev::ImageArrived)), vec![Effect::EnqueueInjectImage]);
    }

    // ── steady state ──────────────────────────────────────────────────────

    #[test]
    fn init_success_starts_frame_loop() {
        let mut lc = Lifecycle::new(false);
        lc.handle(Ev::SurfaceCreated);
        lc.handle(Ev::SurfaceChanged(VGA));
        let fx = lc.handle(Ev::InitSucceeded);
        assert_eq!(lc.state(), Running { initialized: true });
        assert_eq!(work(&fx), vec![Effect::EnqueueFrame]);
        assert_eq!(phases(&fx), vec![Phase::Running]);
    }

    #[test]
    fn no_frame_before_initialized() {
        let mut lc = Lifecycle::new(false);
        lc.handle(Ev::SurfaceCreated);
        lc.handle(Ev::SurfaceChanged(VGA));
        assert!(!lc.admits(TaskKind::Frame));
        assert_eq!(lc.handle(Ev::FrameRendered), vec![]);
        assert!(lc.admits(TaskKind::Init));
    }

    #[test]
    fn each_frame_schedules_exactly_one_more() {
        let mut lc = running(false);
        for _ in 0..10 {
            assert_eq!(lc.handle(Ev::FrameRendered), vec![Effect::EnqueueFrame]);
        }
        assert_eq!(lc.frames_rendered(), 10);
        assert_eq!(lc.state(), Running { initialized: true });
    }

    #[test]
    fn resize_while_running_is_a_hint_not_a_restart() {
        let mut lc = running(false);
        let big = SurfaceSize::new(1280, 720);
        assert_eq!(lc.handle(Ev::SurfaceChanged(big)), vec![Effect::ForwardResize(big)]);
        assert_eq!(lc.handle(Ev::SurfaceChanged(big)), vec![]);
        assert_eq!(lc.state(), Running { initialized: true });
        assert_eq!(lc.surface_size(), Some(big));
    }

    #[test]
    fn image_while_running_is_injected() {
        let mut lc = running(false);
        let fx = lc.handle(Ev::ImageArrived);
        assert_eq!(fx, vec![Effect::EnqueueInjectImage]);
        lc.handle(Ev::ImageTaken);
        assert_eq!(phases(&lc.handle(Ev::ImageInjected)), vec![Phase::ImageLoaded]);
        assert_eq!(lc.state(), Running { initialized: true });
    }

    #[test]
    fn image_during_init_waits_for_running() {
        let mut lc = Lifecycle::new(false);
        lc.handle(Ev::SurfaceCreated);
        lc.handle(Ev::SurfaceChanged(VGA));
        assert_eq!(lc.handle(Ev::ImageArrived), vec![]);
        let fx = lc.handle(Ev::InitSucceeded);
        assert_eq!(work(&fx), vec![Effect::EnqueueInjectImage, Effect::EnqueueFrame]);
    }

    // ── failures ──────────────────────────────────────────────────────────

    #[test]
    fn init_failure_stops_and_queues_terminate() {
        let mut lc = Lifecycle::new(false);
        lc.handle(Ev::SurfaceCreated);
        lc.handle(Ev::SurfaceChanged(VGA));
        let fx = lc.handle(Ev::InitFailed("no device".into()));
        assert_eq!(lc.state(), Stopping);
        assert_eq!(work(&fx), vec![Effect::EnqueueTerminate]);
        assert_eq!(
            fx[0],
            Effect::Report {
                phase: Phase::InitializationFailed,
                detail: Some("no device".into())
            }
        );

        // The host's stop joins without queuing a second terminate.
        let fx = lc.handle(Ev::SurfaceDestroyed);
        assert_eq!(fx, vec![Effect::JoinWorker]);
        assert_eq!(phases(&lc.handle(Ev::WorkerJoined)), vec![Phase::Terminated]);
    }

    #[test]
    fn frame_failure_stops_the_loop() {
        let mut lc = running(false);
        let fx = lc.handle(Ev::FrameFailed("device lost".into()));
        assert_eq!(lc.state(), Stopping);
        assert_eq!(phases(&fx), vec![Phase::RenderFailed]);
        assert_eq!(work(&fx), vec![Effect::EnqueueTerminate]);
        assert_eq!(lc.handle(Ev::FrameRendered), vec![]);
    }

    // ── teardown ──────────────────────────────────────────────────────────

    #[test]
    fn destroy_before_starting_never_terminates() {
        for created in [false, true] {
            let mut lc = Lifecycle::new(false);
            if created {
                lc.handle(Ev::SurfaceCreated);
            }
            let fx = lc.handle(Ev::SurfaceDestroyed);
            assert_eq!(work(&fx), vec![Effect::JoinWorker]);
            lc.handle(Ev::WorkerJoined);
            assert_eq!(lc.state(), Terminated);
        }
    }

    #[test]
    fn destroy_while_waiting_terminates_once() {
        let mut lc = Lifecycle::new(true);
        lc.handle(Ev::SurfaceCreated);
        lc.handle(Ev::SurfaceChanged(VGA));
        let fx = lc.handle(Ev::SurfaceDestroyed);
        assert_eq!(work(&fx), vec![Effect::EnqueueTerminate, Effect::JoinWorker]);
    }

    #[test]
    fn frame_in_flight_during_destroy_schedules_nothing() {
        let mut lc = running(false);
        let fx = lc.handle(Ev::SurfaceDestroyed);
        assert_eq!(phases(&fx), vec![Phase::Stopping]);
        assert_eq!(work(&fx), vec![Effect::EnqueueTerminate, Effect::JoinWorker]);
        assert_eq!(lc.handle(Ev::FrameRendered), vec![]);
        assert_eq!(lc.frames_rendered(), 0);
    }

    #[test]
    fn no_new_work_once_stopping() {
        let mut lc = running(false);
        lc.handle(Ev::StopRequested);
        assert_eq!(lc.handle(Ev::ImageArrived), vec![]);
        assert_eq!(lc.handle(Ev::SurfaceChanged(SurfaceSize::new(10, 10))), vec![]);
        for kind in [
            TaskKind::Bind,
            TaskKind::Init,
            TaskKind::Frame,
            TaskKind::InjectImage,
            TaskKind::Resize,
        ] {
            assert!(!lc.admits(kind), "{kind:?} admitted while stopping");
        }
    }

    #[test]
    fn terminated_is_absorbing() {
        let mut lc = running(false);
        lc.handle(Ev::SurfaceDestroyed);
        lc.handle(Ev::WorkerJoined);
        for event in [
            Ev::SurfaceDestroyed,
            Ev::SurfaceCreated,
            Ev::SurfaceChanged(VGA),
            Ev::StopRequested,
            Ev::InitSucceeded,
            Ev::ImageArrived,
        ] {
            assert_eq!(lc.handle(event), vec![]);
            assert_eq!(lc.state(), Terminated);
        }
    }

    #[test]
    fn input_reaches_only_a_rendering_engine() {
        let tap = InputEvent::PointerMoved { x: 4.0, y: 2.0 };

        let mut lc = Lifecycle::new(true);
        lc.handle(Ev::SurfaceCreated);
        assert_eq!(lc.handle(Ev::Input(tap)), vec![]);
        lc.handle(Ev::SurfaceChanged(VGA));
        assert_eq!(lc.handle(Ev::Input(tap)), vec![]);
        assert!(!lc.admits(TaskKind::Input));

        let mut lc = running(false);
        assert_eq!(lc.handle(Ev::Input(tap)), vec![Effect::ForwardInput(tap)]);
        assert!(lc.admits(TaskKind::Input));

        lc.handle(Ev::SurfaceDestroyed);
        assert_eq!(lc.handle(Ev::Input(tap)), vec![]);
        assert!(!lc.admits(TaskKind::Input));
    }

    #[test]
    fn engine_fault_while_waiting_stops_and_terminates() {
        let mut lc = Lifecycle::new(true);
        lc.handle(Ev::SurfaceCreated);
        lc.handle(Ev::SurfaceChanged(VGA));
        let fx = lc.handle(Ev::EngineFault("bind panicked".into()));
        assert_eq!(lc.state(), Stopping);
        assert_eq!(phases(&fx), vec![Phase::RenderFailed]);
        assert_eq!(work(&fx), vec![Effect::EnqueueTerminate]);
    }

    #[test]
    fn worker_failure_settles_without_terminate() {
        let mut lc = Lifecycle::new(false);
        lc.handle(Ev::SurfaceCreated);
        lc.handle(Ev::SurfaceChanged(VGA));
        let fx = lc.handle(Ev::WorkerFailed("no engine".into()));
        assert_eq!(lc.state(), Stopping);
        assert!(!lc.worker_spawned());
        assert_eq!(phases(&fx), vec![Phase::WorkerFailed]);
        assert_eq!(work(&fx), vec![Effect::JoinWorker]);

        // A later stop must not queue terminate for the missing thread.
        let fx = lc.handle(Ev::SurfaceDestroyed);
        assert_eq!(work(&fx), vec![Effect::JoinWorker]);
        lc.handle(Ev::WorkerJoined);
        assert_eq!(lc.state(), Terminated);
    }

    #[test]
    fn host_effects_are_flagged() {
        assert!(Effect::SpawnWorker.needs_host());
        assert!(Effect::JoinWorker.needs_host());
        assert!(!Effect::EnqueueFrame.needs_host());
        assert!(!Effect::EnqueueTerminate.needs_host());
    }
}
