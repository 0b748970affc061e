//! Controller state machine
//!
//! Which source is allowed to drive a card, and the orientation
//! engagement hysteresis. Both are plain values; the controller feeds them
//! events and acts on the outcome.
//!
//! ```text
//!            pointer                     pointer
//!   Idle ─────────────▶ Pointer ◀──────────────── Orientation / Showcase
//!    │ ▲                   │ release
//!    │ └───────────────────┘
//!    │ orientation applied            showcase started
//!    ├──────────────────▶ Orientation   Idle ──────────▶ Showcase
//! ```

use crate::config::OrientationConfig;
use serde::Serialize;

/// Source currently driving the card
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ControllerState {
    #[default]
    Idle,
    Pointer,
    Orientation,
    Showcase,
}

/// Inputs to [`ControllerState::on_event`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlEvent {
    /// Pointer enter/move or single touch
    PointerEngaged,
    /// An engaged, ready orientation sample is about to drive targets
    OrientationApplied,
    /// The showcase cycle begins
    ShowcaseStarted,
    /// Release back to rest (pointer up/leave, orientation idle, showcase end, page hidden)
    Released,
}

impl ControllerState {
    /// Handle an event and return the new state, or None if no transition
    pub fn on_event(&self, event: ControlEvent) -> Option<Self> {
        use ControlEvent::*;
        use ControllerState::*;

        match (self, event) {
            // Pointer preempts everything
            (Pointer, PointerEngaged) => None,
            (_, PointerEngaged) => Some(Pointer),

            // Orientation only drives from Idle or while already driving
            (Idle, OrientationApplied) => Some(Orientation),

            // Showcase only starts from Idle
            (Idle, ShowcaseStarted) => Some(Showcase),

            (Pointer | Orientation | Showcase, Released) => Some(Idle),

            _ => None,
        }
    }

    /// Returns true if some source is driving the card
    pub fn is_active(&self) -> bool {
        !matches!(self, ControllerState::Idle)
    }

    /// Orientation samples are ignored while these sources drive
    pub fn blocks_orientation(&self) -> bool {
        matches!(self, ControllerState::Pointer | ControllerState::Showcase)
    }

    /// Whether a showcase attempt may start now
    pub fn allows_showcase(&self) -> bool {
        matches!(self, ControllerState::Idle | ControllerState::Showcase)
    }
}

/// What the controller should do with one orientation sample
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrientationStep {
    /// Below the engage threshold; nothing happens
    Ignore,
    /// Threshold crossed: rebase the zero orientation
    Engage,
    /// First sample after rebasing; consumed to avoid a jump
    Ready,
    /// Drive targets from this sample
    Apply,
    /// Idle for too long: release to rest
    Release,
}

/// Engagement/release hysteresis for device orientation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OrientationTracker {
    engaged: bool,
    ready: bool,
    idle_frames: u32,
}

impl OrientationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_engaged(&self) -> bool {
        self.engaged
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Consecutive below-threshold samples while engaged
    pub fn idle_frames(&self) -> u32 {
        self.idle_frames
    }

    /// Forget any engagement
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Advance with the tilt magnitude `|gamma| + |beta|` of one sample
    pub fn on_sample(&mut self, magnitude: f32, config: &OrientationConfig) -> OrientationStep {
        if !self.engaged {
            if magnitude < config.engage_threshold {
                return OrientationStep::Ignore;
            }
            self.engaged = true;
            self.ready = false;
            self.idle_frames = 0;
            return OrientationStep::Engage;
        }

        if !self.ready {
            self.ready = true;
            self.idle_frames = 0;
            return OrientationStep::Ready;
        }

        if magnitude < config.release_threshold {
            self.idle_frames += 1;
        } else {
            self.idle_frames = 0;
        }

        if self.idle_frames > config.release_frames {
            self.reset();
            return OrientationStep::Release;
        }
        OrientationStep::Apply
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointer_preempts_every_state() {
        for state in [
            ControllerState::Idle,
            ControllerState::Orientation,
            ControllerState::Showcase,
        ] {
            assert_eq!(
                state.on_event(ControlEvent::PointerEngaged),
                Some(ControllerState::Pointer)
            );
        }
        assert_eq!(
            ControllerState::Pointer.on_event(ControlEvent::PointerEngaged),
            None
        );
    }

    #[test]
    fn test_orientation_and_showcase_need_idle() {
        assert_eq!(
            ControllerState::Pointer.on_event(ControlEvent::OrientationApplied),
            None
        );
        assert_eq!(
            ControllerState::Showcase.on_event(ControlEvent::OrientationApplied),
            None
        );
        assert_eq!(
            ControllerState::Orientation.on_event(ControlEvent::ShowcaseStarted),
            None
        );
        assert_eq!(
            ControllerState::Idle.on_event(ControlEvent::ShowcaseStarted),
            Some(ControllerState::Showcase)
        );
    }

    #[test]
    fn test_release_returns_to_idle() {
        assert_eq!(
            ControllerState::Showcase.on_event(ControlEvent::Released),
            Some(ControllerState::Idle)
        );
        assert_eq!(ControllerState::Idle.on_event(ControlEvent::Released), None);
    }

    #[test]
    fn test_engage_then_ready_then_apply() {
        let config = OrientationConfig::default();
        let mut tracker = OrientationTracker::new();

        assert_eq!(tracker.on_sample(1.9, &config), OrientationStep::Ignore);
        assert_eq!(tracker.on_sample(2.0, &config), OrientationStep::Engage);
        assert_eq!(tracker.on_sample(9.0, &config), OrientationStep::Ready);
        assert_eq!(tracker.on_sample(3.0, &config), OrientationStep::Apply);
    }

    #[test]
    fn test_release_after_idle_frames() {
        let config = OrientationConfig::default();
        let mut tracker = OrientationTracker::new();
        tracker.on_sample(5.0, &config);
        tracker.on_sample(0.0, &config);

        for _ in 0..20 {
            assert_eq!(tracker.on_sample(0.1, &config), OrientationStep::Apply);
        }
        assert_eq!(tracker.idle_frames(), 20);
        assert_eq!(tracker.on_sample(0.1, &config), OrientationStep::Release);
        assert!(!tracker.is_engaged());
    }

    #[test]
    fn test_active_sample_resets_idle_counter() {
        let config = OrientationConfig::default();
        let mut tracker = OrientationTracker::new();
        tracker.on_sample(5.0, &config);
        tracker.on_sample(0.0, &config);

        for _ in 0..15 {
            tracker.on_sample(0.2, &config);
        }
        tracker.on_sample(1.0, &config);
        assert_eq!(tracker.idle_frames(), 0);
    }
}
