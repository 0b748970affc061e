//! Card configuration
//!
//! Every tunable of the card engine lives here. Each section carries
//! `#[serde(default)]`, so a `holo.toml` only needs the values it changes:
//!
//! ```toml
//! [orientation]
//! release_frames = 30
//!
//! [motion.reduced]
//! intensity = 0.5
//! ```

use crate::error::{CardError, Result};
use holo_animation::SpringConfig;
use serde::{Deserialize, Serialize};

// =============================================================================
// Sections
// =============================================================================

/// Spring presets used by the six card channels
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpringPresets {
    /// Rotate, glare and background
    pub interactive: SpringConfig,
    /// Rotate-delta, scale and translate
    pub popover: SpringConfig,
}

impl Default for SpringPresets {
    fn default() -> Self {
        Self {
            interactive: SpringConfig::interactive(),
            popover: SpringConfig::popover(),
        }
    }
}

/// Soft factors applied while a source is driving the card
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
    /// Scale and translate while the pointer drives
    pub pointer_lift_soft: f32,
    /// Rotate-delta while the pointer drives
    pub pointer_rotate_delta_soft: f32,
    /// Every channel while orientation drives
    pub orientation_soft: f32,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            pointer_lift_soft: 0.35,
            pointer_rotate_delta_soft: 0.4,
            orientation_soft: 0.2,
        }
    }
}

/// Device-orientation engagement hysteresis
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrientationConfig {
    /// `|gamma| + |beta|` needed to start responding
    pub engage_threshold: f32,
    /// Below this magnitude a sample counts as idle
    pub release_threshold: f32,
    /// Release once the idle counter exceeds this
    pub release_frames: u32,
}

impl Default for OrientationConfig {
    fn default() -> Self {
        Self {
            engage_threshold: 2.0,
            release_threshold: 0.75,
            release_frames: 20,
        }
    }
}

/// Scripted autoplay timing
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShowcaseConfig {
    pub initial_delay_ms: f64,
    /// Backoff while another source holds the card
    pub retry_delay_ms: f64,
    /// Length of the one full cycle
    pub cycle_ms: f64,
}

impl Default for ShowcaseConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 2000.0,
            retry_delay_ms: 1000.0,
            cycle_ms: 4000.0,
        }
    }
}

/// Inertial release and snap-back
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseConfig {
    /// Delay between the fling and the snap-back
    pub snap_back_delay_ms: f64,
    /// Fling rotation is clamped to `[-limit, limit]` degrees
    pub rotate_limit: f32,
    pub rotate_soft: f32,
    /// Soft factor for the glare and background fling
    pub glare_soft: f32,
    /// Background fling is kept inside `[50 - range, 50 + range]`
    pub background_range: f32,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            snap_back_delay_ms: 120.0,
            rotate_limit: 20.0,
            rotate_soft: 0.5,
            glare_soft: 0.45,
            background_range: 20.0,
        }
    }
}

/// Wheel-driven flip
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollFlipConfig {
    /// Multiplier applied to wheel `delta_y`
    pub wheel_sensitivity: f32,
    /// Virtual scroll units for a full 180 degree flip
    pub virtual_scroll_max: f32,
    /// `is_flipping` clears this long after the last change
    pub settle_ms: f64,
}

impl Default for ScrollFlipConfig {
    fn default() -> Self {
        Self {
            wheel_sensitivity: 0.5,
            virtual_scroll_max: 1000.0,
            settle_ms: 150.0,
        }
    }
}

/// Amplitudes for one motion preference
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionProfile {
    /// Uniform multiplier on rotation and parallax
    pub intensity: f32,
    pub active_scale: f32,
    pub active_translate_y: f32,
    pub glare_active_opacity: f32,
    /// Soft factor of the snap-back to rest
    pub snap_soft_factor: f32,
    pub inertia_rotate_scale: f32,
    pub inertia_glare_scale: f32,
    /// Orientation clamp for gamma (left/right)
    pub limit_gamma: f32,
    /// Orientation clamp for beta (front/back)
    pub limit_beta: f32,
    pub showcase_rotate_x: f32,
    pub showcase_rotate_y: f32,
    pub showcase_glare_amplitude: f32,
    pub showcase_background_amplitude: f32,
    pub showcase_glare_opacity: f32,
    pub showcase_scale: f32,
    pub showcase_translate_y: f32,
}

impl MotionProfile {
    pub fn normal() -> Self {
        Self {
            intensity: 1.0,
            active_scale: 1.06,
            active_translate_y: -6.0,
            glare_active_opacity: 1.0,
            snap_soft_factor: 0.16,
            inertia_rotate_scale: 10.0,
            inertia_glare_scale: 8.0,
            limit_gamma: 16.0,
            limit_beta: 18.0,
            showcase_rotate_x: 10.0,
            showcase_rotate_y: 6.5,
            showcase_glare_amplitude: 45.0,
            showcase_background_amplitude: 12.0,
            showcase_glare_opacity: 0.9,
            showcase_scale: 1.02,
            showcase_translate_y: -3.0,
        }
    }

    pub fn reduced() -> Self {
        Self {
            intensity: 0.6,
            active_scale: 1.015,
            active_translate_y: -2.0,
            glare_active_opacity: 0.65,
            snap_soft_factor: 0.28,
            inertia_rotate_scale: 4.0,
            inertia_glare_scale: 3.0,
            limit_gamma: 10.0,
            limit_beta: 12.0,
            showcase_rotate_x: 8.0,
            showcase_rotate_y: 5.0,
            showcase_glare_amplitude: 30.0,
            showcase_background_amplitude: 8.0,
            showcase_glare_opacity: 0.6,
            showcase_scale: 1.005,
            showcase_translate_y: -1.5,
        }
    }
}

impl Default for MotionProfile {
    fn default() -> Self {
        Self::normal()
    }
}

/// Motion profiles keyed by the reduced-motion preference
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    pub normal: MotionProfile,
    pub reduced: MotionProfile,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            normal: MotionProfile::normal(),
            reduced: MotionProfile::reduced(),
        }
    }
}

impl MotionConfig {
    /// Profile for the given preference
    pub fn profile(&self, reduced_motion: bool) -> &MotionProfile {
        if reduced_motion {
            &self.reduced
        } else {
            &self.normal
        }
    }
}

// =============================================================================
// CardConfig
// =============================================================================

/// Complete card engine configuration
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardConfig {
    pub springs: SpringPresets,
    pub transitions: TransitionConfig,
    pub orientation: OrientationConfig,
    pub showcase: ShowcaseConfig,
    pub release: ReleaseConfig,
    pub scroll_flip: ScrollFlipConfig,
    pub motion: MotionConfig,
}

impl CardConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: CardConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(CardError::InvalidConfig(msg));

        for (name, spring) in [
            ("springs.interactive", &self.springs.interactive),
            ("springs.popover", &self.springs.popover),
        ] {
            if !spring.is_valid() {
                return invalid(format!(
                    "{} needs positive stiffness, damping and precision",
                    name
                ));
            }
        }

        for (name, soft) in [
            ("transitions.pointer_lift_soft", self.transitions.pointer_lift_soft),
            (
                "transitions.pointer_rotate_delta_soft",
                self.transitions.pointer_rotate_delta_soft,
            ),
            ("transitions.orientation_soft", self.transitions.orientation_soft),
            ("release.rotate_soft", self.release.rotate_soft),
            ("release.glare_soft", self.release.glare_soft),
            ("motion.normal.snap_soft_factor", self.motion.normal.snap_soft_factor),
            ("motion.reduced.snap_soft_factor", self.motion.reduced.snap_soft_factor),
        ] {
            if !(soft > 0.0 && soft <= 1.0) {
                return invalid(format!("{} must be in (0, 1], got {}", name, soft));
            }
        }

        let orientation = &self.orientation;
        if !(orientation.release_threshold >= 0.0) {
            return invalid("orientation.release_threshold must not be negative".into());
        }
        if orientation.release_threshold >= orientation.engage_threshold {
            return invalid(format!(
                "orientation.release_threshold ({}) must be below engage_threshold ({})",
                orientation.release_threshold, orientation.engage_threshold
            ));
        }

        for (name, ms) in [
            ("showcase.initial_delay_ms", self.showcase.initial_delay_ms),
            ("showcase.retry_delay_ms", self.showcase.retry_delay_ms),
            ("showcase.cycle_ms", self.showcase.cycle_ms),
            ("scroll_flip.settle_ms", self.scroll_flip.settle_ms),
        ] {
            if !(ms > 0.0) {
                return invalid(format!("{} must be positive, got {}", name, ms));
            }
        }
        if !(self.release.snap_back_delay_ms >= 0.0) {
            return invalid("release.snap_back_delay_ms must not be negative".into());
        }
        if !(self.scroll_flip.virtual_scroll_max > 0.0) {
            return invalid("scroll_flip.virtual_scroll_max must be positive".into());
        }

        for (name, profile) in [("normal", &self.motion.normal), ("reduced", &self.motion.reduced)]
        {
            if !(profile.limit_gamma > 0.0 && profile.limit_beta > 0.0) {
                return invalid(format!("motion.{} orientation limits must be positive", name));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(CardConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = CardConfig::from_toml_str(
            r#"
            [orientation]
            release_frames = 30

            [motion.reduced]
            intensity = 0.5
            "#,
        )
        .unwrap();

        assert_eq!(config.orientation.release_frames, 30);
        assert_eq!(config.orientation.engage_threshold, 2.0);
        assert_eq!(config.motion.reduced.intensity, 0.5);
        assert_eq!(config.motion.reduced.active_scale, 1.015);
        assert_eq!(config.springs.interactive, SpringConfig::interactive());
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let err = CardConfig::from_toml_str(
            r#"
            [orientation]
            engage_threshold = 0.5
            release_threshold = 0.75
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, CardError::InvalidConfig(_)));
    }

    #[test]
    fn test_non_positive_spring_rejected() {
        let mut config = CardConfig::default();
        config.springs.popover.damping = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_cycle_rejected() {
        let mut config = CardConfig::default();
        config.showcase.cycle_ms = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = CardConfig::default();
        let text = config.to_toml_string().unwrap();
        assert!(text.contains("[orientation]"));
        assert_eq!(CardConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_profile_selection() {
        let motion = MotionConfig::default();
        assert_eq!(motion.profile(false).intensity, 1.0);
        assert_eq!(motion.profile(true).intensity, 0.6);
    }
}
