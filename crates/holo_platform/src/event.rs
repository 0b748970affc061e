//! Host events and surface identity

use crate::input::{InputEvent, OrientationSample};

/// Identity of one rendering surface (one card element)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u64);

/// Events a host forwards into the card runtime
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Input targeted at one surface
    Input {
        surface: SurfaceId,
        event: InputEvent,
    },
    /// A device-orientation reading (sensor cadence, not frame cadence)
    Orientation(OrientationSample),
    /// Visibility change
    Visibility(VisibilityEvent),
    /// User preference change
    Preference(PreferenceEvent),
    /// Frame tick - the frame requested through `FrameHost::request_frame` is due
    Frame,
}

/// Visibility signals
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VisibilityEvent {
    /// The whole document became visible or hidden
    Document { visible: bool },
    /// One surface started or stopped intersecting the viewport
    Surface {
        surface: SurfaceId,
        intersecting: bool,
    },
}

/// Live user preferences
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreferenceEvent {
    /// `prefers-reduced-motion` changed
    ReducedMotion(bool),
}
