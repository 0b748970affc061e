//! Wheel-driven card flip
//!
//! Wheel input accumulates into a virtual scroll position instead of
//! scrolling the page. The position maps to a 0-180 degree flip that the
//! controller feeds into the rotate-delta channel. Readings are
//! recomputed at most once per frame.

use crate::config::ScrollFlipConfig;
use serde::Serialize;

/// Rotation changes at or below this are treated as noise
const FLIP_NOISE_DEG: f32 = 0.1;
/// Upper bound of the reported flip velocity (degrees per frame)
const MAX_FLIP_VELOCITY: f32 = 10.0;

/// Derived flip state
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct FlipReading {
    /// 0-100
    pub progress: f32,
    /// 0-180 degrees
    pub rotation: f32,
    /// Absolute rotation change of the last recompute, capped at 10
    pub velocity: f32,
    /// The rotation changed recently
    pub is_flipping: bool,
}

#[derive(Clone, Debug)]
pub struct ScrollFlip {
    config: ScrollFlipConfig,
    virtual_scroll: f32,
    dirty: bool,
    last_rotation: f32,
    settle_at_ms: Option<f64>,
    reading: FlipReading,
}

impl ScrollFlip {
    pub fn new(config: ScrollFlipConfig) -> Self {
        Self {
            config,
            virtual_scroll: 0.0,
            dirty: false,
            last_rotation: 0.0,
            settle_at_ms: None,
            reading: FlipReading::default(),
        }
    }

    /// Accumulate one wheel event
    pub fn on_wheel(&mut self, delta_y: f32) {
        self.virtual_scroll = (self.virtual_scroll + delta_y * self.config.wheel_sensitivity)
            .clamp(0.0, self.config.virtual_scroll_max);
        self.dirty = true;
    }

    /// Recompute on a frame; returns `true` if the reading changed
    pub fn on_frame(&mut self, now_ms: f64) -> bool {
        let before = self.reading;

        if std::mem::take(&mut self.dirty) {
            let progress = self.virtual_scroll / self.config.virtual_scroll_max * 100.0;
            let rotation = (progress * 1.8).min(180.0);
            let delta = (rotation - self.last_rotation).abs();
            self.last_rotation = rotation;

            self.reading.progress = progress;
            self.reading.rotation = rotation;
            self.reading.velocity = delta.min(MAX_FLIP_VELOCITY);

            if delta > FLIP_NOISE_DEG {
                self.reading.is_flipping = true;
                self.settle_at_ms = Some(now_ms + self.config.settle_ms);
            }
        }

        if self.settle_at_ms.is_some_and(|at| now_ms >= at) {
            self.settle_at_ms = None;
            self.reading.is_flipping = false;
            self.reading.velocity = 0.0;
        }

        self.reading != before
    }

    /// Whether frames are still needed (pending input or a pending settle)
    pub fn needs_frames(&self) -> bool {
        self.dirty || self.settle_at_ms.is_some()
    }

    pub fn reading(&self) -> FlipReading {
        self.reading
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wheel_accumulates_once_per_frame() {
        let mut flip = ScrollFlip::new(ScrollFlipConfig::default());
        flip.on_wheel(100.0);
        flip.on_wheel(100.0);

        assert!(flip.on_frame(0.0));
        let reading = flip.reading();
        assert_eq!(reading.progress, 10.0);
        assert_eq!(reading.rotation, 18.0);
        assert_eq!(reading.velocity, 10.0);
        assert!(reading.is_flipping);
    }

    #[test]
    fn test_virtual_scroll_is_clamped() {
        let mut flip = ScrollFlip::new(ScrollFlipConfig::default());
        flip.on_wheel(-500.0);
        flip.on_frame(0.0);
        assert_eq!(flip.reading().rotation, 0.0);
        assert!(!flip.reading().is_flipping);

        flip.on_wheel(10_000.0);
        flip.on_frame(16.0);
        assert_eq!(flip.reading().progress, 100.0);
        assert_eq!(flip.reading().rotation, 180.0);
    }

    #[test]
    fn test_flipping_clears_after_settle() {
        let mut flip = ScrollFlip::new(ScrollFlipConfig::default());
        flip.on_wheel(20.0);
        flip.on_frame(0.0);
        assert!(flip.reading().is_flipping);
        assert!(flip.needs_frames());

        assert!(!flip.on_frame(149.0));
        assert!(flip.on_frame(150.0));
        assert!(!flip.reading().is_flipping);
        assert_eq!(flip.reading().velocity, 0.0);
        assert!(!flip.needs_frames());
        assert_eq!(flip.reading().rotation, 1.8);
    }

    #[test]
    fn test_new_input_extends_settle() {
        let mut flip = ScrollFlip::new(ScrollFlipConfig::default());
        flip.on_wheel(20.0);
        flip.on_frame(0.0);
        flip.on_wheel(20.0);
        flip.on_frame(100.0);

        flip.on_frame(200.0);
        assert!(flip.reading().is_flipping);
        flip.on_frame(250.0);
        assert!(!flip.reading().is_flipping);
    }
}
