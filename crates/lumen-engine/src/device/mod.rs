//! wgpu device and surface management.
//!
//! - `WindowSurface` is created on the UI thread and bound on the render thread
//! - `Gpu` owns the adapter, device, queue and surface configuration
//! - `ClearEngine` is the stock `NativeEngine` built on top of them

mod clear_engine;
mod gpu;
mod init;
mod surface;

pub use clear_engine::{palette_for, ClearEngine};
pub use gpu::{Gpu, GpuFrame};
pub use init::GpuInit;
pub use surface::{SurfaceErrorAction, WindowSurface};
