use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{anyhow, Context, Result};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy};
use winit::window::{Window, WindowId};

use crate::device::WindowSurface;
use crate::imaging::{ImagePipeline, ImageSource};
use crate::session::{
    Coordinator, LogReporter, NativeEngine, SessionConfig, SessionError, StatusReporter,
    StatusUpdate, SurfaceSize,
};

use super::input::InputTranslator;

/// Window configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    /// Hidden windows still get a surface; used for headless runs.
    pub visible: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "lumen".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
            visible: true,
        }
    }
}

/// Events marshalled onto the UI thread.
#[derive(Debug, Clone)]
pub enum HostEvent {
    Status(StatusUpdate),
}

/// Logs each update, then forwards it to the event loop.
struct ProxyReporter {
    proxy: Mutex<EventLoopProxy<HostEvent>>,
}

impl StatusReporter for ProxyReporter {
    fn report(&self, update: &StatusUpdate) {
        LogReporter.report(update);
        let proxy = self.proxy.lock().unwrap_or_else(PoisonError::into_inner);
        // Closed loop: the host is already shutting down.
        let _ = proxy.send_event(HostEvent::Status(update.clone()));
    }
}

pub(crate) fn title_for(base: &str, update: &StatusUpdate) -> String {
    format!("{base} [{update}]")
}

/// Entry point: runs one window whose surface drives a session.
pub struct Runtime;

impl Runtime {
    /// Blocks until the window closes. Returns an error when the session
    /// failed fatally or a coordinator operation failed.
    pub fn run<E>(
        config: RuntimeConfig,
        engine: E,
        session: SessionConfig,
        startup_image: Option<ImageSource>,
    ) -> Result<()>
    where
        E: NativeEngine<Surface = WindowSurface>,
    {
        let event_loop = EventLoop::<HostEvent>::with_user_event()
            .build()
            .context("failed to create winit EventLoop")?;
        event_loop.set_control_flow(ControlFlow::Wait);

        let reporter = Arc::new(ProxyReporter {
            proxy: Mutex::new(event_loop.create_proxy()),
        });
        let coordinator = Coordinator::new(engine, session, reporter);
        let pipeline = ImagePipeline::new(Arc::new(coordinator.handle()));

        let mut host = Host {
            config,
            coordinator,
            pipeline,
            input: InputTranslator::new(),
            window: None,
            startup_image,
            failure: None,
        };

        event_loop
            .run_app(&mut host)
            .context("winit event loop terminated with error")?;

        match host.failure.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

struct Host<E: NativeEngine<Surface = WindowSurface>> {
    config: RuntimeConfig,
    coordinator: Coordinator<E>,
    pipeline: ImagePipeline,
    input: InputTranslator,
    window: Option<Arc<Window>>,
    startup_image: Option<ImageSource>,
    failure: Option<anyhow::Error>,
}

impl<E: NativeEngine<Surface = WindowSurface>> Host<E> {
    fn open_window(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size)
            .with_visible(self.config.visible);

        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("failed to create window")?,
        );
        let surface = WindowSurface::new(Arc::clone(&window))?;
        let size = window.inner_size();

        self.window = Some(window);
        self.coordinator.surface_created(surface)?;
        self.coordinator
            .surface_changed(SurfaceSize::new(size.width, size.height))?;
        Ok(())
    }

    fn close_window(&mut self) {
        if self.window.take().is_none() {
            return;
        }
        if let Err(e) = self.coordinator.surface_destroyed() {
            self.fail(e.into());
        }
    }

    fn fail(&mut self, error: anyhow::Error) {
        log::error!("{error:#}");
        self.failure.get_or_insert(error);
    }

    fn check(&mut self, event_loop: &ActiveEventLoop, result: Result<(), SessionError>) {
        if let Err(e) = result {
            self.fail(e.into());
            self.close_window();
            event_loop.exit();
        }
    }
}

impl<E: NativeEngine<Surface = WindowSurface>> ApplicationHandler<HostEvent> for Host<E> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        if let Err(e) = self.open_window(event_loop) {
            self.fail(e.context("failed to start session"));
            self.close_window();
            event_loop.exit();
            return;
        }

        if let Some(source) = self.startup_image.take() {
            self.pipeline.request(source);
        }
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        self.close_window();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(window) = self.window.clone() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                self.close_window();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                let result = self
                    .coordinator
                    .surface_changed(SurfaceSize::new(size.width, size.height));
                self.check(event_loop, result);
            }
            WindowEvent::ScaleFactorChanged { .. } => {
                let size = window.inner_size();
                let result = self
                    .coordinator
                    .surface_changed(SurfaceSize::new(size.width, size.height));
                self.check(event_loop, result);
            }
            WindowEvent::DroppedFile(path) => {
                self.pipeline.request(ImageSource::Path(path));
            }
            other => {
                if let Some(input) = self.input.translate(&other) {
                    let result = self.coordinator.input_event(input);
                    self.check(event_loop, result);
                }
            }
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: HostEvent) {
        match event {
            HostEvent::Status(update) => {
                if update.session != self.coordinator.session_id() {
                    return;
                }
                if let Some(window) = &self.window {
                    window.set_title(&title_for(&self.config.title, &update));
                }
                if update.phase.is_fatal() {
                    // Already logged by the reporter.
                    self.failure
                        .get_or_insert_with(|| anyhow!("session {}: {update}", update.session));
                    self.close_window();
                    event_loop.exit();
                }
            }
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.close_window();
        self.pipeline.wait_idle();
        if let Err(e) = self.coordinator.stop() {
            self.fail(e.into());
        }
    }
}
