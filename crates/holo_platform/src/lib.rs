//! Holo Platform Abstraction
//!
//! Host-facing types for the holo card engine: input events, visibility
//! and preference signals, and the two seams a host implements.
//!
//! - [`FrameHost`] - monotonic clock and one-shot frame requests
//! - [`OrientationSensor`] - raw device-orientation source
//!
//! [`ManualHost`] and [`ManualSensor`] are deterministic implementations
//! for tests and headless simulation.

mod error;
mod event;
mod host;
mod input;

pub use error::{PlatformError, Result};
pub use event::{Event, PreferenceEvent, SurfaceId, VisibilityEvent};
pub use host::{FrameHost, ManualHost, ManualSensor, OrientationSensor};
pub use input::{
    InputEvent, Key, KeyState, KeyboardEvent, OrientationSample, PointerEvent, PointerPosition,
    SurfaceRect, TouchEvent,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{PlatformError, Result};
    pub use crate::event::{Event, PreferenceEvent, SurfaceId, VisibilityEvent};
    pub use crate::host::{FrameHost, OrientationSensor};
    pub use crate::input::{
        InputEvent, Key, KeyState, KeyboardEvent, OrientationSample, PointerEvent,
        PointerPosition, SurfaceRect, TouchEvent,
    };
}
