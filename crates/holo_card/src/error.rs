//! Card error types

use holo_animation::AnimationError;
use thiserror::Error;

/// A fault raised by an orientation subscriber
///
/// Reported back to the publisher, which logs it and keeps delivering.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct SubscriberError(pub String);

impl SubscriberError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Errors from card operations
#[derive(Error, Debug)]
pub enum CardError {
    /// A channel operation was rejected
    #[error(transparent)]
    Animation(#[from] AnimationError),

    /// Configuration failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration could not be parsed
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration could not be serialised
    #[error("Failed to serialise configuration: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// An orientation subscriber failed
    #[error("Orientation subscriber failed: {0}")]
    Subscriber(#[from] SubscriberError),

    /// The controller has been unmounted
    #[error("Card is not mounted")]
    NotMounted,
}

/// Result type for card operations
pub type Result<T> = std::result::Result<T, CardError>;
