//! Holo Card Engine
//!
//! Interactive tilting cards: each mounted card is driven by exactly one
//! source at a time and animates through the shared spring scheduler.
//!
//! # Features
//!
//! - **Arbitration**: pointer beats orientation, orientation beats the showcase
//! - **Orientation Hysteresis**: engage above a tilt threshold, release after sustained stillness
//! - **Inertial Release**: a fling along the last velocity, then a soft snap back to rest
//! - **Showcase**: a one-off scripted cycle for idle, visible cards
//! - **Visibility**: hidden documents and off-screen cards stop consuming frames
//! - **Configuration**: every tunable in one TOML-loadable [`CardConfig`]
//!
//! # Example
//!
//! ```ignore
//! use holo_card::prelude::*;
//!
//! let runtime = CardRuntime::new(CardConfig::default(), host, sensor);
//! let card = CardController::mount(&runtime, SurfaceId(1), sink, CardOptions::new().showcase(true))?;
//!
//! // Host event loop
//! if let Some(navigation) = runtime.dispatch(&event) {
//!     navigation.perform(&mut navigator);
//! }
//! ```

pub mod channels;
pub mod config;
pub mod controller;
pub mod error;
pub mod math;
pub mod navigation;
pub mod orientation;
pub mod runtime;
pub mod scroll_flip;
pub mod seed;
pub mod snapshot;
pub mod state;
pub mod targets;

pub use channels::{CardChannels, PointerOutputs};
pub use config::{
    CardConfig, MotionConfig, MotionProfile, OrientationConfig, ReleaseConfig, ScrollFlipConfig,
    ShowcaseConfig, SpringPresets, TransitionConfig,
};
pub use controller::{CardController, CardOptions, Presentation};
pub use error::{CardError, Result, SubscriberError};
pub use navigation::{Navigation, Navigator};
pub use orientation::{
    OrientationAngles, OrientationSource, OrientationState, OrientationSubscription,
};
pub use runtime::CardRuntime;
pub use scroll_flip::{FlipReading, ScrollFlip};
pub use seed::CardSeed;
pub use snapshot::{CardFrame, OutputSnapshot, Vec2};
pub use state::{ControlEvent, ControllerState, OrientationStep, OrientationTracker};
pub use targets::{CardTargets, ReleaseVelocity, Target};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::CardConfig;
    pub use crate::controller::{CardController, CardOptions};
    pub use crate::navigation::{Navigation, Navigator};
    pub use crate::runtime::CardRuntime;
    pub use crate::state::ControllerState;
    pub use holo_animation::{StyleSink, SurfaceStyle};
    pub use holo_platform::{
        Event, FrameHost, InputEvent, OrientationSample, OrientationSensor, PointerEvent,
        PointerPosition, SurfaceId, TouchEvent, VisibilityEvent,
    };
}
