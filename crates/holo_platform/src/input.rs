//! Input event types for pointer, touch, keyboard, wheel and orientation

/// Input events delivered to a single card surface
#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    /// Pointer (mouse or pen) event
    Pointer(PointerEvent),
    /// Touch event (mobile/touchscreen)
    Touch(TouchEvent),
    /// Keyboard event while the card has focus
    Keyboard(KeyboardEvent),
    /// Wheel event
    Wheel {
        /// Horizontal wheel delta
        delta_x: f32,
        /// Vertical wheel delta
        delta_y: f32,
    },
    /// Primary activation (click or tap)
    Click,
}

// ============================================================================
// Positions
// ============================================================================

/// A position in surface-local percentage coordinates
///
/// Both axes run from 0 (left/top edge) to 100 (right/bottom edge).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerPosition {
    pub x: f32,
    pub y: f32,
}

impl PointerPosition {
    /// The surface center
    pub const CENTER: Self = Self { x: 50.0, y: 50.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Clamp both axes into `[0, 100]`
    pub fn clamped(self) -> Self {
        Self {
            x: self.x.clamp(0.0, 100.0),
            y: self.y.clamp(0.0, 100.0),
        }
    }
}

impl Default for PointerPosition {
    fn default() -> Self {
        Self::CENTER
    }
}

/// Bounding box of a card surface in client coordinates
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl SurfaceRect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Convert a client-space point into a clamped surface percentage
    ///
    /// A degenerate (zero-sized) rect maps every point to the center.
    pub fn relative_position(&self, client_x: f32, client_y: f32) -> PointerPosition {
        if self.width <= 0.0 || self.height <= 0.0 {
            return PointerPosition::CENTER;
        }
        PointerPosition {
            x: (client_x - self.left) / self.width * 100.0,
            y: (client_y - self.top) / self.height * 100.0,
        }
        .clamped()
    }
}

// ============================================================================
// Pointer Events
// ============================================================================

/// Pointer events
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerEvent {
    /// Pointer entered the surface
    Entered(PointerPosition),
    /// Pointer moved over the surface
    Moved(PointerPosition),
    /// Pointer button released over the surface
    Released,
    /// Pointer left the surface
    Left,
    /// The host cancelled the pointer stream
    Cancelled,
}

// ============================================================================
// Touch Events
// ============================================================================

/// Touch events carry every active touch point
#[derive(Clone, Debug, PartialEq)]
pub enum TouchEvent {
    /// One or more fingers touched down
    Started(Vec<PointerPosition>),
    /// Touch points moved
    Moved(Vec<PointerPosition>),
    /// All fingers lifted
    Ended,
    /// The host cancelled the touch sequence
    Cancelled,
}

// ============================================================================
// Keyboard Events
// ============================================================================

/// Keyboard event
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyboardEvent {
    /// The key that was pressed or released
    pub key: Key,
    /// Whether the key was pressed or released
    pub state: KeyState,
}

impl KeyboardEvent {
    /// A key press
    pub fn pressed(key: Key) -> Self {
        Self {
            key,
            state: KeyState::Pressed,
        }
    }
}

/// Key press/release state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyState {
    /// Key was pressed
    Pressed,
    /// Key was released
    Released,
}

/// Keys the card cares about
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    Enter,
    Space,
    Escape,
    Tab,
    /// Any other key, by its logical name
    Other(String),
}

impl Key {
    /// Keys that activate a focused card
    pub fn is_activation(&self) -> bool {
        matches!(self, Key::Enter | Key::Space)
    }
}

// ============================================================================
// Orientation
// ============================================================================

/// One raw device-orientation reading in degrees
///
/// Axes the sensor did not report are `None` and read as zero.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OrientationSample {
    /// Rotation around the z axis (compass heading)
    pub alpha: Option<f32>,
    /// Front-to-back tilt
    pub beta: Option<f32>,
    /// Left-to-right tilt
    pub gamma: Option<f32>,
}

impl OrientationSample {
    pub fn new(alpha: f32, beta: f32, gamma: f32) -> Self {
        Self {
            alpha: Some(alpha),
            beta: Some(beta),
            gamma: Some(gamma),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_position_clamps() {
        let rect = SurfaceRect::new(100.0, 50.0, 200.0, 100.0);

        assert_eq!(
            rect.relative_position(200.0, 100.0),
            PointerPosition::new(50.0, 50.0)
        );
        assert_eq!(
            rect.relative_position(0.0, 500.0),
            PointerPosition::new(0.0, 100.0)
        );
    }

    #[test]
    fn test_degenerate_rect_maps_to_center() {
        let rect = SurfaceRect::new(0.0, 0.0, 0.0, 10.0);
        assert_eq!(rect.relative_position(5.0, 5.0), PointerPosition::CENTER);
    }

    #[test]
    fn test_activation_keys() {
        assert!(Key::Enter.is_activation());
        assert!(Key::Space.is_activation());
        assert!(!Key::Escape.is_activation());
        assert!(!Key::Other("a".into()).is_activation());
    }
}
