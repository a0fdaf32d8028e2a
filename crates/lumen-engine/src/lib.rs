//! Lumen engine crate.
//!
//! Coordinates a native rendering engine with a platform render surface:
//! session lifecycle, the dedicated render thread, image decoding and the
//! winit/wgpu host that ties them together.

pub mod device;
pub mod imaging;
pub mod logging;
pub mod render_thread;
pub mod session;
pub mod time;
pub mod window;
