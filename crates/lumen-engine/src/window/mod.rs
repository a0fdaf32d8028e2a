//! winit host.
//!
//! Maps window lifecycle callbacks onto the session coordinator, forwards
//! pointer, touch and key input, and shows session status in the window title.

mod input;
mod runtime;

pub use input::InputTranslator;
pub use runtime::{HostEvent, Runtime, RuntimeConfig};
