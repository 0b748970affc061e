//! Spring physics
//!
//! A frame-normalised spring-damper integrator. Velocity is derived from
//! the last two positions rather than carried as separate state, so a
//! channel can be paused by snapshotting `previous = current` without
//! leaving a velocity spike behind.
//!
//! Time is expressed in "frames": one unit of `dt` equals 1/60 s.

use serde::{Deserialize, Serialize};

/// Duration of one nominal frame in milliseconds (60 updates per second)
pub const NOMINAL_FRAME_MS: f64 = 1000.0 / 60.0;

/// Longest elapsed time a single step may integrate (30 updates per second)
pub const MAX_FRAME_MS: f64 = 1000.0 / 30.0;

/// Floor for the velocity divisor
const MIN_DT: f32 = 1.0 / 60.0;

/// Configuration for a spring animation
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpringConfig {
    pub stiffness: f32,
    pub damping: f32,
    /// Settle tolerance for both the per-step displacement and the distance to target
    pub precision: f32,
}

impl SpringConfig {
    /// Create a new spring configuration
    pub fn new(stiffness: f32, damping: f32, precision: f32) -> Self {
        Self {
            stiffness,
            damping,
            precision,
        }
    }

    /// Responsive spring used for directly driven quantities (tilt, glare, parallax)
    pub fn interactive() -> Self {
        Self {
            stiffness: 0.066,
            damping: 0.25,
            precision: 0.001,
        }
    }

    /// Slower spring for lift and scale (good for pop-over effects)
    pub fn popover() -> Self {
        Self {
            stiffness: 0.033,
            damping: 0.45,
            precision: 0.001,
        }
    }

    /// Derive a gentler spring for a soft transition
    ///
    /// Stiffness scales by `factor` and damping by `sqrt(factor)`, which keeps
    /// the damping ratio `damping / (2 * sqrt(stiffness))` unchanged.
    /// Factors outside `(0, 1]` are clamped into that range.
    pub fn softened(&self, factor: f32) -> Self {
        let factor = if factor.is_finite() {
            factor.clamp(f32::EPSILON, 1.0)
        } else {
            1.0
        };
        Self {
            stiffness: self.stiffness * factor,
            damping: self.damping * factor.sqrt(),
            precision: self.precision,
        }
    }

    /// Damping ratio of the equivalent continuous spring
    pub fn damping_ratio(&self) -> f32 {
        self.damping / (2.0 * self.stiffness.sqrt())
    }

    /// All parameters are finite and strictly positive
    pub fn is_valid(&self) -> bool {
        [self.stiffness, self.damping, self.precision]
            .iter()
            .all(|v| v.is_finite() && *v > 0.0)
    }
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self {
            stiffness: 0.15,
            damping: 0.8,
            precision: 0.01,
        }
    }
}

/// Convert elapsed wall time into a frame-normalised step
///
/// `None` means the elapsed time is unknown (first step after a target was
/// set, or after a resume) and yields exactly one nominal frame.
pub fn frame_dt(elapsed_ms: Option<f64>) -> f32 {
    let elapsed = match elapsed_ms {
        Some(ms) if ms.is_finite() => ms.clamp(0.0, MAX_FRAME_MS),
        _ => NOMINAL_FRAME_MS,
    };
    (elapsed * 60.0 / 1000.0) as f32
}

/// Result of one integration step for a single scalar
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpringStep {
    pub next: f32,
    pub velocity: f32,
    pub settled: bool,
}

/// Advance one scalar toward `target`
pub fn integrate(
    current: f32,
    previous: f32,
    target: f32,
    config: &SpringConfig,
    dt: f32,
) -> SpringStep {
    let velocity = (current - previous) / dt.max(MIN_DT);
    let delta = target - current;
    let acceleration = config.stiffness * delta - config.damping * velocity;
    let displacement = (velocity + acceleration) * dt;

    let settled = displacement.abs() < config.precision && delta.abs() < config.precision;
    let next = if settled {
        target
    } else {
        current + displacement
    };

    SpringStep {
        next,
        velocity,
        settled,
    }
}

/// One spring-animated scalar
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Spring {
    value: f32,
    previous: f32,
    target: f32,
    velocity: f32,
}

impl Spring {
    pub fn new(initial: f32) -> Self {
        Self {
            value: initial,
            previous: initial,
            target: initial,
            velocity: 0.0,
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn previous(&self) -> f32 {
        self.previous
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    /// Last measured velocity, in units per nominal frame
    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Place the spring at rest on `value`
    pub fn jump(&mut self, value: f32) {
        self.value = value;
        self.previous = value;
        self.target = value;
        self.velocity = 0.0;
    }

    /// Forget the motion history (`previous = value`)
    ///
    /// Used when pausing so the first step after a resume does not see the
    /// whole paused interval as velocity.
    pub fn snapshot(&mut self) {
        self.previous = self.value;
    }

    /// Step the spring; returns `true` once settled on the target
    pub fn step(&mut self, config: &SpringConfig, dt: f32) -> bool {
        let step = integrate(self.value, self.previous, self.target, config, dt);
        self.previous = self.value;
        self.value = step.next;
        self.velocity = step.velocity;
        step.settled
    }
}
