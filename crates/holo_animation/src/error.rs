//! Animation error types

use thiserror::Error;

/// Errors raised by channel and scheduler operations
///
/// Every rejected operation leaves the channel's state untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnimationError {
    /// A value's shape differs from the shape the channel was created with
    #[error("Shape mismatch on channel '{channel}': expected {expected}, got {found}")]
    ShapeMismatch {
        channel: String,
        expected: String,
        found: String,
    },

    /// Output bindings do not cover the channel's fields exactly once
    #[error("Binding mismatch on channel '{channel}': {reason}")]
    BindingMismatch { channel: String, reason: String },

    /// A vector value was declared without any fields
    #[error("Vector channel '{0}' declares no fields")]
    EmptyShape(String),

    /// The channel's render surface is not attached
    #[error("Render surface for channel '{0}' is not attached")]
    SurfaceDetached(String),

    /// The scheduler behind a handle has been dropped
    #[error("Animation scheduler is no longer available")]
    SchedulerUnavailable,

    /// The channel id is not (or no longer) known to the scheduler
    #[error("Channel not found")]
    ChannelNotFound,
}

/// Result type for animation operations
pub type Result<T> = std::result::Result<T, AnimationError>;
