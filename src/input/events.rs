use serde::{Deserialize, Serialize};

/// Gestures delivered by the platform, in screen pixels.
///
/// Recognition (what counts as a fling or a double tap) happens upstream;
/// the controller only reacts to the classified events.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GestureEvent {
    /// A finger touched down; stops any running fling or animation
    Down { x: f64, y: f64 },
    /// Direct manipulation: the content follows the finger
    Pan { dx: f64, dy: f64 },
    /// Last finger lifted without a fling
    Release,
    /// Fast release, velocity in pixels per second
    Fling { vx: f64, vy: f64 },
    /// Two-finger pinch step. `scale` above 1 spreads the fingers (zoom in).
    Pinch {
        focus_x: f64,
        focus_y: f64,
        delta_focus_x: f64,
        delta_focus_y: f64,
        scale: f64,
    },
    /// Pinch finished
    PinchEnd,
    /// Single tap
    Tap { x: f64, y: f64 },
    /// Double tap: zoom in one step around the tapped point
    DoubleTap { x: f64, y: f64 },
    LongPress { x: f64, y: f64 },
    /// Two-finger tap: zoom out one step
    TwoFingerTap { x: f64, y: f64 },
}

impl GestureEvent {
    /// Screen position the event happened at, if it has one
    pub fn position(&self) -> Option<(f64, f64)> {
        match *self {
            GestureEvent::Down { x, y }
            | GestureEvent::Tap { x, y }
            | GestureEvent::DoubleTap { x, y }
            | GestureEvent::LongPress { x, y }
            | GestureEvent::TwoFingerTap { x, y } => Some((x, y)),
            GestureEvent::Pinch { focus_x, focus_y, .. } => Some((focus_x, focus_y)),
            _ => None,
        }
    }
}
