//! Holo Animation System
//!
//! Frame-normalised spring channels driven by one shared frame scheduler.
//!
//! # Features
//!
//! - **Spring Physics**: per-frame springs with stiffness, damping and a settle precision
//! - **Channels**: scalar or named-field values bound to surface style properties
//! - **Soft Transitions**: temporarily softened springs that keep the damping ratio
//! - **Shared Scheduler**: a single outstanding frame request for any number of channels
//! - **Visibility Gating**: off-screen surfaces and hidden documents suspend stepping
//! - **Delayed Tasks**: cancellable one-shot timers on the host clock

pub mod channel;
pub mod error;
pub mod scheduler;
pub mod spring;
pub mod surface;
pub mod tasks;
pub mod values;
pub mod visibility;

pub use channel::{Channel, ChannelBuilder, OutputBinding, Transition};
pub use error::{AnimationError, Result};
pub use scheduler::{
    AnimatedChannel, AnimationScheduler, ChannelId, SchedulerHandle, TickCallback, TickCallbackId,
};
pub use spring::{frame_dt, integrate, Spring, SpringConfig, SpringStep};
pub use surface::{StyleSink, StyleValue, SurfaceStyle, Unit};
pub use tasks::{DelayedTask, TaskId, TaskQueue};
pub use values::{ChannelShape, ChannelValue, FieldValues};
pub use visibility::{VisibilityGate, VisibilityObserver, VisibilitySubscription};
