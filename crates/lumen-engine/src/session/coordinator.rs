use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::imaging::{DecodeError, ImageSink, PendingImage};
use crate::render_thread::{panic_message, RenderThread, RenderThreadError, TaskSender};

use super::config::SessionConfig;
use super::error::{FailureKind, SessionError};
use super::input::InputEvent;
use super::lifecycle::{Effect, Lifecycle, LifecycleEvent, LifecycleState, TaskKind};
use super::native::{NativeEngine, SurfaceSize};
use super::status::{Phase, StatusReporter, StatusUpdate};

/// Mutable session data guarded by one lock.
///
/// The render thread takes the lock to check admission and to apply results,
/// never across a native call.
pub(crate) struct SessionState<E> {
    session_id: u64,
    lifecycle: Lifecycle,
    /// Latest decoded image not yet taken by an inject task.
    pending_image: Option<PendingImage>,
    /// Newest decode ticket; survives session resets.
    image_ticket: u64,
    surface_bound: bool,
    tasks: Option<TaskSender<E>>,
}

type HostFn<'a, E> = dyn FnMut(&mut SessionState<E>, Effect) -> Result<(), SessionError> + 'a;

/// Runs one native call. A panic becomes an error message so the render
/// thread survives to terminate the engine.
fn guarded<T>(call: &'static str, f: impl FnOnce() -> T) -> Result<T, String> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        let message = format!("engine panicked in {call}: {}", panic_message(payload.as_ref()));
        log::error!("{message}");
        message
    })
}

struct Shared<E> {
    state: Mutex<SessionState<E>>,
    reporter: Arc<dyn StatusReporter>,
    config: SessionConfig,
}

impl<E: NativeEngine> Shared<E> {
    fn lock(&self) -> MutexGuard<'_, SessionState<E>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Feeds `event` to the lifecycle and executes its effects.
    fn apply(
        self: &Arc<Self>,
        event: LifecycleEvent,
        host: &mut HostFn<'_, E>,
    ) -> Result<(), SessionError> {
        let mut st = self.lock();
        self.apply_locked(&mut st, event, host)
    }

    /// Applies an event outside the UI thread, where host effects cannot run.
    fn apply_inline(self: &Arc<Self>, st: &mut SessionState<E>, event: LifecycleEvent) {
        let applied = self.apply_locked(st, event, &mut |_, effect| {
            log::error!("{effect:?} needs the host thread; dropped");
            Ok(())
        });
        debug_assert!(applied.is_ok());
    }

    fn apply_from_worker(self: &Arc<Self>, event: LifecycleEvent) {
        let mut st = self.lock();
        self.apply_inline(&mut st, event);
    }

    /// Status is reported with the lock held so updates from the UI thread
    /// and the render thread reach the reporter in transition order.
    ///
    /// A failed host effect abandons the rest of the batch, which assumed a
    /// live render thread, and winds the session down.
    fn apply_locked(
        self: &Arc<Self>,
        st: &mut SessionState<E>,
        event: LifecycleEvent,
        host: &mut HostFn<'_, E>,
    ) -> Result<(), SessionError> {
        for effect in st.lifecycle.handle(event) {
            match effect {
                Effect::Report { phase, detail } => self.reporter.report(&StatusUpdate {
                    session: st.session_id,
                    phase,
                    detail,
                }),
                Effect::EnqueueInit => self.submit(st, "init", |shared, engine| {
                    shared.run_init(engine)
                }),
                Effect::EnqueueFrame => self.submit(st, "frame", |shared, engine| {
                    shared.run_frame(engine)
                }),
                Effect::EnqueueInjectImage => self.submit(st, "inject", |shared, engine| {
                    shared.run_inject(engine)
                }),
                Effect::ForwardResize(size) => self.submit(st, "resize", move |shared, engine| {
                    shared.run_resize(engine, size)
                }),
                Effect::ForwardInput(input) => self.submit(st, "input", move |shared, engine| {
                    shared.run_input(engine, input)
                }),
                Effect::EnqueueTerminate => self.submit(st, "terminate", |shared, engine| {
                    shared.run_terminate(engine)
                }),
                other => {
                    if let Err(e) = host(st, other) {
                        let reason = e.to_string();
                        let _ = self.apply_locked(st, LifecycleEvent::WorkerFailed(reason), host);
                        return Err(e);
                    }
                }
            }
        }
        Ok(())
    }

    fn submit<F>(self: &Arc<Self>, st: &SessionState<E>, what: &'static str, task: F)
    where
        F: FnOnce(&Arc<Self>, &mut E) + Send + 'static,
    {
        let Some(tasks) = &st.tasks else {
            log::error!(
                "{:?}: no render thread for {what} task in session {}",
                FailureKind::SurfaceRace,
                st.session_id
            );
            return;
        };

        let shared = Arc::clone(self);
        if let Err(e) = tasks.submit(move |engine: &mut E| task(&shared, engine)) {
            log::error!("{:?}: {what} task not queued: {e}", FailureKind::SurfaceRace);
        }
    }

    /// Re-checks at task start whether `kind` may still run.
    fn admits(&self, kind: TaskKind) -> bool {
        let st = self.lock();
        if !st.lifecycle.admits(kind) {
            log::debug!("{kind:?} skipped in {:?}", st.lifecycle.state());
            return false;
        }
        if kind != TaskKind::Bind && !st.surface_bound {
            log::error!(
                "{:?}: {kind:?} would reach an unbound surface",
                FailureKind::SurfaceRace
            );
            return false;
        }
        true
    }

    // ── render-thread tasks ───────────────────────────────────────────────

    fn run_bind(self: &Arc<Self>, engine: &mut E, surface: E::Surface, size: SurfaceSize) {
        if !self.admits(TaskKind::Bind) {
            return;
        }
        match guarded("bind_surface", || engine.bind_surface(surface, size)) {
            Ok(()) => {
                self.lock().surface_bound = true;
                log::debug!("surface bound at {size}");
            }
            Err(fault) => self.apply_from_worker(LifecycleEvent::EngineFault(fault)),
        }
    }

    fn run_init(self: &Arc<Self>, engine: &mut E) {
        if !self.admits(TaskKind::Init) {
            return;
        }

        log::info!("initializing with `{}`", self.config.args);
        let outcome = guarded("init", || engine.init(&self.config.assets, &self.config.args));
        let event = match outcome {
            Ok(Ok(())) => LifecycleEvent::InitSucceeded,
            Ok(Err(e)) => {
                log::error!("engine init failed: {e:#}");
                LifecycleEvent::InitFailed(format!("{e:#}"))
            }
            Err(fault) => LifecycleEvent::InitFailed(fault),
        };
        self.apply_from_worker(event);
    }

    fn run_frame(self: &Arc<Self>, engine: &mut E) {
        if !self.admits(TaskKind::Frame) {
            return;
        }

        let event = match guarded("render_frame", || engine.render_frame()) {
            Ok(Ok(())) => LifecycleEvent::FrameRendered,
            Ok(Err(e)) => {
                log::error!("frame failed: {e:#}");
                LifecycleEvent::FrameFailed(format!("{e:#}"))
            }
            Err(fault) => LifecycleEvent::FrameFailed(fault),
        };
        self.apply_from_worker(event);
    }

    fn run_inject(self: &Arc<Self>, engine: &mut E) {
        // Taking the image and clearing the queued flag must be atomic with
        // respect to new arrivals.
        let image = {
            let mut st = self.lock();
            if !st.lifecycle.admits(TaskKind::InjectImage) || !st.surface_bound {
                log::debug!("inject skipped in {:?}", st.lifecycle.state());
                return;
            }
            let image = st.pending_image.take();
            self.apply_inline(&mut st, LifecycleEvent::ImageTaken);
            image
        };

        let Some(image) = image else {
            log::warn!("inject task found no pending image");
            return;
        };

        log::info!("injecting {}x{} image", image.width(), image.height());
        let event = match guarded("inject_image", || engine.inject_image(image)) {
            Ok(()) => LifecycleEvent::ImageInjected,
            Err(fault) => LifecycleEvent::EngineFault(fault),
        };
        self.apply_from_worker(event);
    }

    fn run_resize(self: &Arc<Self>, engine: &mut E, size: SurfaceSize) {
        if !self.admits(TaskKind::Resize) {
            return;
        }
        if let Err(fault) = guarded("surface_resized", || engine.surface_resized(size)) {
            self.apply_from_worker(LifecycleEvent::EngineFault(fault));
        }
    }

    fn run_input(self: &Arc<Self>, engine: &mut E, input: InputEvent) {
        if !self.admits(TaskKind::Input) {
            return;
        }
        log::trace!("input {input:?}");
        if let Err(fault) = guarded("input_event", || engine.input_event(input)) {
            self.apply_from_worker(LifecycleEvent::EngineFault(fault));
        }
    }

    fn run_terminate(&self, engine: &mut E) {
        log::info!("terminating engine");
        // Faults are logged by `guarded`; the session is ending either way.
        let _ = guarded("terminate", || engine.terminate());

        let was_bound = std::mem::replace(&mut self.lock().surface_bound, false);
        if was_bound {
            let _ = guarded("unbind_surface", || engine.unbind_surface());
        }
    }
}


/// Host-side entry point for one render surface.
///
/// All methods are called from the host's UI thread. Native calls happen on
/// a dedicated render thread that exists from the first usable surface size
/// until the surface is destroyed or the session is stopped. A new surface
/// after termination starts a new session on the same engine.
pub struct Coordinator<E: NativeEngine> {
    shared: Arc<Shared<E>>,
    render: RenderThread<E>,
    /// Engine while no render thread owns it.
    engine: Option<E>,
    /// Surface waiting for the render thread to bind it.
    surface: Option<E::Surface>,
}

impl<E: NativeEngine> Coordinator<E> {
    pub fn new(engine: E, config: SessionConfig, reporter: Arc<dyn StatusReporter>) -> Self {
        let state = SessionState {
            session_id: 1,
            lifecycle: Lifecycle::new(config.requires_input),
            pending_image: None,
            image_ticket: 0,
            surface_bound: false,
            tasks: None,
        };

        Self {
            render: RenderThread::new(config.thread_name.clone()),
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                reporter,
                config,
            }),
            engine: Some(engine),
            surface: None,
        }
    }

    /// Cloneable handle for image delivery and state queries off the UI thread.
    pub fn handle(&self) -> SessionHandle<E> {
        SessionHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    pub fn state(&self) -> LifecycleState {
        self.shared.lock().lifecycle.state()
    }

    pub fn session_id(&self) -> u64 {
        self.shared.lock().session_id
    }

    pub fn frames_rendered(&self) -> u64 {
        self.shared.lock().lifecycle.frames_rendered()
    }

    /// The platform created a drawable surface.
    ///
    /// A session that is still stopping is joined first; a terminated one is
    /// replaced by a fresh session.
    pub fn surface_created(&mut self, surface: E::Surface) -> Result<(), SessionError> {
        if self.state().is_winding_down() {
            // Completes a session that is still stopping; no-op once terminated.
            self.dispatch(LifecycleEvent::StopRequested)?;
            self.reset();
        }

        self.surface = Some(surface);
        self.dispatch(LifecycleEvent::SurfaceCreated)
    }

    /// The surface has a (new) size. The first non-empty size starts the
    /// session; later ones are forwarded as resize hints.
    pub fn surface_changed(&mut self, size: SurfaceSize) -> Result<(), SessionError> {
        self.dispatch(LifecycleEvent::SurfaceChanged(size))
    }

    /// The surface is going away. Returns after the engine has terminated and
    /// the render thread has been joined.
    pub fn surface_destroyed(&mut self) -> Result<(), SessionError> {
        self.surface = None;
        self.dispatch(LifecycleEvent::SurfaceDestroyed)
    }

    /// Stops the session without a surface event. Synchronous like
    /// [`Coordinator::surface_destroyed`].
    pub fn stop(&mut self) -> Result<(), SessionError> {
        self.dispatch(LifecycleEvent::StopRequested)
    }

    /// Forwards user input. Dropped unless the engine is rendering.
    pub fn input_event(&mut self, input: InputEvent) -> Result<(), SessionError> {
        self.dispatch(LifecycleEvent::Input(input))
    }

    /// Hands an already decoded image to the session.
    pub fn offer_image(&self, image: PendingImage) {
        let handle = self.handle();
        let ticket = handle.begin_request();
        handle.deliver(ticket, Ok(image));
    }

    /// Stops any live session and returns the engine.
    pub fn shutdown(mut self) -> Result<Option<E>, SessionError> {
        if self.state() != LifecycleState::Terminated {
            self.stop()?;
        }
        Ok(self.engine.take())
    }

    fn dispatch(&mut self, event: LifecycleEvent) -> Result<(), SessionError> {
        let shared = Arc::clone(&self.shared);
        let render = &mut self.render;
        let engine = &mut self.engine;
        let surface = &mut self.surface;

        let mut join = false;

        let applied = shared.apply(event, &mut |st, effect| {
            match effect {
                Effect::SpawnWorker => {
                    if render.is_alive() {
                        log::warn!("render thread `{}` is already running", render.name());
                    } else {
                        let engine = engine.take().ok_or(SessionError::EngineUnavailable)?;
                        render.start(move || engine)?;
                    }
                    st.tasks = render.sender();
                }
                Effect::BindSurface(size) => match surface.take() {
                    Some(surface) => shared.submit(st, "bind", move |shared, engine| {
                        shared.run_bind(engine, surface, size)
                    }),
                    None => log::error!(
                        "{:?}: no surface to bind at {size}",
                        FailureKind::SurfaceRace
                    ),
                },
                Effect::JoinWorker => join = true,
                other => log::error!("unexpected host effect {other:?}"),
            }
            Ok(())
        });

        let joined = if join { self.join_worker() } else { Ok(()) };
        applied.and(joined)
    }

    /// Joins the render thread outside the lock, then completes the stop.
    fn join_worker(&mut self) -> Result<(), SessionError> {
        let joined = match self.render.stop() {
            Err(e @ RenderThreadError::SelfJoin) => return Err(e.into()),
            Ok(engine) => {
                if let Some(engine) = engine {
                    self.engine = Some(engine);
                }
                Ok(())
            }
            // The engine went down with the thread; the session still ends.
            Err(e) => Err(e.into()),
        };

        let mut st = self.shared.lock();
        st.tasks = None;
        self.shared.apply_inline(&mut st, LifecycleEvent::WorkerJoined);
        drop(st);

        joined
    }

    fn reset(&mut self) {
        let mut st = self.shared.lock();
        st.session_id += 1;
        st.lifecycle = Lifecycle::new(self.shared.config.requires_input);
        st.surface_bound = false;
        st.tasks = None;

        // An image picked while no session was live carries over. In Idle this
        // only marks it pending; no effects are produced.
        if st.pending_image.is_some() {
            let effects = st.lifecycle.handle(LifecycleEvent::ImageArrived);
            debug_assert!(effects.is_empty());
        }

        log::info!("starting session {}", st.session_id);
    }
}

impl<E: NativeEngine> Drop for Coordinator<E> {
    fn drop(&mut self) {
        if self.state() == LifecycleState::Terminated {
            return;
        }
        if let Err(e) = self.stop() {
            log::error!("session did not stop cleanly: {e}");
        }
    }
}

/// Shared, cloneable view of a coordinator's session.
///
/// Receives decode results from the image pipeline: only the newest
/// requested image is kept, and it replaces any image still waiting.
pub struct SessionHandle<E> {
    shared: Arc<Shared<E>>,
}

impl<E> Clone for SessionHandle<E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<E: NativeEngine> SessionHandle<E> {
    pub fn state(&self) -> LifecycleState {
        self.shared.lock().lifecycle.state()
    }

    pub fn session_id(&self) -> u64 {
        self.shared.lock().session_id
    }

    pub fn frames_rendered(&self) -> u64 {
        self.shared.lock().lifecycle.frames_rendered()
    }
}

impl<E: NativeEngine> ImageSink for SessionHandle<E> {
    fn begin_request(&self) -> u64 {
        let mut st = self.shared.lock();
        st.image_ticket += 1;
        st.image_ticket
    }

    fn deliver(&self, ticket: u64, result: Result<PendingImage, DecodeError>) {
        let mut st = self.shared.lock();
        if ticket != st.image_ticket {
            log::debug!("dropping image #{ticket}; #{} is newer", st.image_ticket);
            return;
        }

        match result {
            Ok(image) => {
                if st.pending_image.replace(image).is_some() {
                    log::debug!("image #{ticket} replaces an uninjected image");
                }
                self.shared.apply_inline(&mut st, LifecycleEvent::ImageArrived);
            }
            Err(e) => self.shared.reporter.report(&StatusUpdate {
                session: st.session_id,
                phase: Phase::DecodeFailed,
                detail: Some(e.to_string()),
            }),
        }
    }
}
