use winit::dpi::PhysicalPosition;
use winit::event::{MouseButton, TouchPhase as WinitTouchPhase, WindowEvent};
use winit::keyboard::PhysicalKey;

use crate::session::{InputEvent, PointerButton, TouchPhase};

/// Translates winit window events into engine input.
///
/// winit 0.30 reports mouse buttons without a position, so the last cursor
/// position is tracked here.
#[derive(Debug, Default)]
pub struct InputTranslator {
    pointer: Option<(f32, f32)>,
}

impl InputTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `None` for events the engine does not receive.
    pub fn translate(&mut self, event: &WindowEvent) -> Option<InputEvent> {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                let (x, y) = to_f32(*position);
                self.pointer = Some((x, y));
                Some(InputEvent::PointerMoved { x, y })
            }

            WindowEvent::CursorLeft { .. } => {
                self.pointer = None;
                None
            }

            WindowEvent::MouseInput { state, button, .. } => {
                let (x, y) = self.pointer.unwrap_or((0.0, 0.0));
                Some(InputEvent::PointerButton {
                    button: map_button(*button),
                    pressed: state.is_pressed(),
                    x,
                    y,
                })
            }

            WindowEvent::Touch(touch) => Some(touch_event(touch.id, touch.phase, touch.location)),

            // Synthetic presses replay held keys on focus; the engine only
            // wants real transitions.
            WindowEvent::KeyboardInput {
                event,
                is_synthetic: false,
                ..
            } => match event.physical_key {
                PhysicalKey::Code(code) => Some(InputEvent::Key {
                    code: code as u32,
                    pressed: event.state.is_pressed(),
                    repeat: event.repeat,
                }),
                PhysicalKey::Unidentified(_) => None,
            },

            _ => None,
        }
    }
}

fn to_f32(pos: PhysicalPosition<f64>) -> (f32, f32) {
    (pos.x as f32, pos.y as f32)
}

fn map_button(button: MouseButton) -> PointerButton {
    match button {
        MouseButton::Left => PointerButton::Primary,
        MouseButton::Right => PointerButton::Secondary,
        MouseButton::Middle => PointerButton::Middle,
        MouseButton::Back => PointerButton::Other(3),
        MouseButton::Forward => PointerButton::Other(4),
        MouseButton::Other(v) => PointerButton::Other(v),
    }
}

fn touch_event(id: u64, phase: WinitTouchPhase, location: PhysicalPosition<f64>) -> InputEvent {
    let (x, y) = to_f32(location);
    let phase = match phase {
        WinitTouchPhase::Started => TouchPhase::Started,
        WinitTouchPhase::Moved => TouchPhase::Moved,
        WinitTouchPhase::Ended => TouchPhase::Ended,
        WinitTouchPhase::Cancelled => TouchPhase::Cancelled,
    };
    InputEvent::Touch { id, phase, x, y }
}

#[cfg(test)]
mod tests {
    use winit::event::{DeviceId, ElementState};

    use super::*;

    fn device() -> DeviceId {
        // SAFETY: only compared, never handed to the platform.
        unsafe { DeviceId::dummy() }
    }

    #[test]
    fn button_carries_last_cursor_position() {
        let mut input = InputTranslator::new();
        let moved = input.translate(&WindowEvent::CursorMoved {
            device_id: device(),
            position: PhysicalPosition::new(12.0, 34.5),
        });
        assert_eq!(moved, Some(InputEvent::PointerMoved { x: 12.0, y: 34.5 }));

        let click = WindowEvent::MouseInput {
            device_id: device(),
            state: ElementState::Pressed,
            button: MouseButton::Left,
        };
        assert_eq!(
            input.translate(&click),
            Some(InputEvent::PointerButton {
                button: PointerButton::Primary,
                pressed: true,
                x: 12.0,
                y: 34.5,
            })
        );

        input.translate(&WindowEvent::CursorLeft {
            device_id: device(),
        });
        assert_eq!(
            input.translate(&click),
            Some(InputEvent::PointerButton {
                button: PointerButton::Primary,
                pressed: true,
                x: 0.0,
                y: 0.0,
            })
        );
    }

    #[test]
    fn touch_phases_map_one_to_one() {
        let at = PhysicalPosition::new(5.0, 6.0);
        assert_eq!(
            touch_event(9, WinitTouchPhase::Cancelled, at),
            InputEvent::Touch {
                id: 9,
                phase: TouchPhase::Cancelled,
                x: 5.0,
                y: 6.0,
            }
        );
        assert!(touch_event(1, WinitTouchPhase::Started, at).is_press());
    }

    #[test]
    fn buttons_map_to_pointer_buttons() {
        assert_eq!(map_button(MouseButton::Right), PointerButton::Secondary);
        assert_eq!(map_button(MouseButton::Other(7)), PointerButton::Other(7));
    }

    #[test]
    fn unrelated_events_are_ignored() {
        let mut input = InputTranslator::new();
        assert_eq!(input.translate(&WindowEvent::Focused(true)), None);
    }
}
