/// Pointer button identifier.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
    Other(u16),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TouchPhase {
    Started,
    Moved,
    Ended,
    Cancelled,
}

/// User input forwarded to the engine while it renders.
///
/// Positions are in physical pixels of the bound surface, origin top-left.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum InputEvent {
    PointerMoved {
        x: f32,
        y: f32,
    },
    PointerButton {
        button: PointerButton,
        pressed: bool,
        x: f32,
        y: f32,
    },
    Touch {
        id: u64,
        phase: TouchPhase,
        x: f32,
        y: f32,
    },
    /// `code` is the platform's stable physical key code.
    Key {
        code: u32,
        pressed: bool,
        repeat: bool,
    },
}

impl InputEvent {
    /// True for a press that starts a gesture: a primary button or a new touch.
    pub fn is_press(&self) -> bool {
        matches!(
            self,
            InputEvent::PointerButton {
                button: PointerButton::Primary,
                pressed: true,
                ..
            } | InputEvent::Touch {
                phase: TouchPhase::Started,
                ..
            }
        )
    }

    /// True for the event that ends a gesture started by [`is_press`](Self::is_press).
    pub fn is_release(&self) -> bool {
        matches!(
            self,
            InputEvent::PointerButton {
                button: PointerButton::Primary,
                pressed: false,
                ..
            } | InputEvent::Touch {
                phase: TouchPhase::Ended | TouchPhase::Cancelled,
                ..
            }
        )
    }
}
