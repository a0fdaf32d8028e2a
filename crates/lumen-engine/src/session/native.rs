use crate::imaging::PendingImage;

use super::args::ArgumentList;
use super::config::AssetContext;
use super::input::InputEvent;

/// Drawable size in physical pixels.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A zero-area surface cannot be bound or rendered to.
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl std::fmt::Display for SurfaceSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Capability interface over the native rendering engine.
///
/// The coordinator calls these only from the session's render thread, one
/// at a time, in the order the lifecycle allows. Implementations never see
/// two calls concurrently and never see a call after `terminate` for the
/// same session (only `unbind_surface` follows it).
pub trait NativeEngine: Send + 'static {
    /// Platform handle for the drawable surface.
    type Surface: Send + 'static;

    /// Attaches the drawable surface. Always the first call of a session.
    fn bind_surface(&mut self, surface: Self::Surface, size: SurfaceSize);

    /// Detaches the surface. Always the last call of a session that bound one.
    fn unbind_surface(&mut self);

    /// Initializes the engine for the session's arguments. Called at most once
    /// per session; an error is fatal for the session and is not retried.
    fn init(&mut self, assets: &AssetContext, args: &ArgumentList) -> anyhow::Result<()>;

    /// Renders one frame. An error is fatal for the session.
    fn render_frame(&mut self) -> anyhow::Result<()>;

    /// Non-blocking resize hint for an already bound surface.
    fn surface_resized(&mut self, size: SurfaceSize) {
        let _ = size;
    }

    /// User input, delivered only while the engine is rendering.
    fn input_event(&mut self, event: InputEvent) {
        let _ = event;
    }

    /// Hands the most recently selected image to the engine.
    fn inject_image(&mut self, image: PendingImage);

    /// Releases everything `init` created. Called exactly once per session
    /// that started a render thread, whether or not `init` succeeded.
    fn terminate(&mut self);
}
