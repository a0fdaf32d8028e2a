//! Time subsystem.
//!
//! Frame timing for engines running on the render thread:
//! - one `FrameClock` per engine, reset on every successful init
//! - `FrameStats` for the once-per-second benchmark log line

mod frame_clock;

pub use frame_clock::{FrameClock, FrameStats, FrameTime};
