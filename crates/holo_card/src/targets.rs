//! Target mappings
//!
//! Pure functions from a driving source's reading to the targets of the
//! six card channels. Nothing here touches a channel; the controller
//! applies the resulting [`CardTargets`].

use crate::config::{MotionProfile, ReleaseConfig, TransitionConfig};
use crate::math::{adjust, clamp, round};
use crate::orientation::OrientationAngles;
use holo_animation::{ChannelValue, Transition};
use holo_platform::PointerPosition;
use std::f32::consts::{FRAC_PI_4, TAU};

/// One channel target and how to approach it
#[derive(Clone, Debug, PartialEq)]
pub struct Target {
    pub value: ChannelValue,
    pub transition: Transition,
}

impl Target {
    pub fn hard(value: ChannelValue) -> Self {
        Self {
            value,
            transition: Transition::Hard,
        }
    }

    pub fn soft(value: ChannelValue, factor: f32) -> Self {
        Self {
            value,
            transition: Transition::Soft(factor),
        }
    }
}

/// Targets for any subset of the card channels
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CardTargets {
    pub rotate: Option<Target>,
    pub rotate_delta: Option<Target>,
    pub glare: Option<Target>,
    pub background: Option<Target>,
    pub scale: Option<Target>,
    pub translate: Option<Target>,
    /// Direct pointer output (not animated)
    pub pointer: Option<PointerPosition>,
}

/// Last measured velocities of the channels that fling on release
#[derive(Clone, Debug, PartialEq)]
pub struct ReleaseVelocity {
    pub rotate: ChannelValue,
    pub glare: ChannelValue,
    pub background: ChannelValue,
}

pub fn glare_value(x: f32, y: f32, opacity: f32) -> ChannelValue {
    ChannelValue::vector([("x", x), ("y", y), ("o", opacity)])
}

/// Background parallax for a point in `[from_x] x [from_y]`
fn background_value(
    x: f32,
    from_x: (f32, f32),
    y: f32,
    from_y: (f32, f32),
    intensity: f32,
) -> ChannelValue {
    ChannelValue::xy(
        (adjust(x, from_x.0, from_x.1, 37.0, 63.0) - 50.0) * intensity + 50.0,
        (adjust(y, from_y.0, from_y.1, 33.0, 67.0) - 50.0) * intensity + 50.0,
    )
}

/// Targets while the pointer drives
///
/// Horizontal displacement tilts around the vertical axis with inverted
/// sign; the glare follows the pointer directly.
pub fn pointer_targets(
    position: PointerPosition,
    profile: &MotionProfile,
    transitions: &TransitionConfig,
) -> CardTargets {
    let PointerPosition { x, y } = position;
    let intensity = profile.intensity;
    let center_x = x - 50.0;
    let center_y = y - 50.0;

    CardTargets {
        rotate: Some(Target::hard(ChannelValue::xy(
            round(-(center_x / 3.5) * intensity),
            round((center_y / 2.0) * intensity),
        ))),
        glare: Some(Target::hard(glare_value(x, y, profile.glare_active_opacity))),
        background: Some(Target::hard(background_value(
            x,
            (0.0, 100.0),
            y,
            (0.0, 100.0),
            intensity,
        ))),
        scale: Some(Target::soft(
            ChannelValue::scalar(profile.active_scale),
            transitions.pointer_lift_soft,
        )),
        translate: Some(Target::soft(
            ChannelValue::xy(0.0, profile.active_translate_y),
            transitions.pointer_lift_soft,
        )),
        rotate_delta: Some(Target::soft(
            ChannelValue::xy(0.0, 0.0),
            transitions.pointer_rotate_delta_soft,
        )),
        pointer: Some(position),
    }
}

/// Targets while device orientation drives
///
/// Angles are clamped to the profile's limits first; every channel uses
/// the orientation soft factor.
pub fn orientation_targets(
    relative: &OrientationAngles,
    profile: &MotionProfile,
    transitions: &TransitionConfig,
) -> CardTargets {
    let limit_x = profile.limit_gamma;
    let limit_y = profile.limit_beta;
    let gamma = clamp(relative.gamma, -limit_x, limit_x);
    let beta = clamp(relative.beta, -limit_y, limit_y);
    let intensity = profile.intensity;
    let soft = transitions.orientation_soft;

    let glare_x = adjust(gamma, -limit_x, limit_x, 0.0, 100.0);
    let glare_y = adjust(beta, -limit_y, limit_y, 0.0, 100.0);

    CardTargets {
        rotate: Some(Target::soft(
            ChannelValue::xy(round(-gamma * intensity), round(beta * intensity)),
            soft,
        )),
        glare: Some(Target::soft(
            glare_value(glare_x, glare_y, profile.glare_active_opacity),
            soft,
        )),
        background: Some(Target::soft(
            background_value(gamma, (-limit_x, limit_x), beta, (-limit_y, limit_y), intensity),
            soft,
        )),
        scale: Some(Target::soft(ChannelValue::scalar(profile.active_scale), soft)),
        translate: Some(Target::soft(
            ChannelValue::xy(0.0, profile.active_translate_y),
            soft,
        )),
        rotate_delta: Some(Target::soft(ChannelValue::xy(0.0, 0.0), soft)),
        pointer: Some(PointerPosition::new(glare_x, glare_y)),
    }
}

/// Targets for one point of the showcase cycle, `progress` in `[0, 1]`
pub fn showcase_targets(progress: f32, profile: &MotionProfile) -> CardTargets {
    let r = progress.clamp(0.0, 1.0) * TAU;
    let intensity = profile.intensity;

    let glare_x = 50.0 + (r + FRAC_PI_4).sin() * profile.showcase_glare_amplitude;
    let glare_y = 50.0 + (r + FRAC_PI_4).cos() * profile.showcase_glare_amplitude;
    let background_x = -r.sin() * profile.showcase_background_amplitude;
    let background_y = -r.cos() * profile.showcase_background_amplitude;

    CardTargets {
        rotate: Some(Target::hard(ChannelValue::xy(
            r.sin() * profile.showcase_rotate_x * intensity,
            r.cos() * profile.showcase_rotate_y * intensity,
        ))),
        glare: Some(Target::hard(glare_value(
            glare_x,
            glare_y,
            profile.showcase_glare_opacity,
        ))),
        background: Some(Target::hard(ChannelValue::xy(
            50.0 + background_x * intensity,
            50.0 + background_y * intensity,
        ))),
        scale: Some(Target::hard(ChannelValue::scalar(profile.showcase_scale))),
        translate: Some(Target::hard(ChannelValue::xy(
            0.0,
            profile.showcase_translate_y,
        ))),
        rotate_delta: None,
        pointer: Some(PointerPosition::new(glare_x, glare_y)),
    }
}

/// The fling extrapolated from the last measured velocities
pub fn inertia_targets(
    velocity: &ReleaseVelocity,
    profile: &MotionProfile,
    release: &ReleaseConfig,
) -> CardTargets {
    let field = |value: &ChannelValue, name: &str| value.get(name).unwrap_or(0.0);
    let rotate_scale = profile.inertia_rotate_scale;
    let glare_scale = profile.inertia_glare_scale;
    let limit = release.rotate_limit;
    let low = 50.0 - release.background_range;
    let high = 50.0 + release.background_range;

    CardTargets {
        rotate: Some(Target::soft(
            ChannelValue::xy(
                clamp(field(&velocity.rotate, "x") * rotate_scale, -limit, limit),
                clamp(field(&velocity.rotate, "y") * rotate_scale, -limit, limit),
            ),
            release.rotate_soft,
        )),
        glare: Some(Target::soft(
            glare_value(
                clamp(50.0 + field(&velocity.glare, "x") * glare_scale, 0.0, 100.0),
                clamp(50.0 + field(&velocity.glare, "y") * glare_scale, 0.0, 100.0),
                clamp(field(&velocity.glare, "o") * 0.35 + 0.35, 0.0, 1.0),
            ),
            release.glare_soft,
        )),
        background: Some(Target::soft(
            ChannelValue::xy(
                clamp(
                    50.0 + field(&velocity.background, "x") * glare_scale * 0.35,
                    low,
                    high,
                ),
                clamp(
                    50.0 + field(&velocity.background, "y") * glare_scale * 0.35,
                    low,
                    high,
                ),
            ),
            release.glare_soft,
        )),
        ..Default::default()
    }
}

/// Every channel back to rest with a soft snap
///
/// `flip_rotation` is the rest of the rotate-delta x field, so a flipped
/// card stays flipped.
pub fn rest_targets(soft: f32, flip_rotation: f32) -> CardTargets {
    CardTargets {
        rotate: Some(Target::soft(ChannelValue::xy(0.0, 0.0), soft)),
        rotate_delta: Some(Target::soft(ChannelValue::xy(flip_rotation, 0.0), soft)),
        glare: Some(Target::soft(glare_value(50.0, 50.0, 0.0), soft)),
        background: Some(Target::soft(ChannelValue::xy(50.0, 50.0), soft)),
        scale: Some(Target::soft(ChannelValue::scalar(1.0), soft)),
        translate: Some(Target::soft(ChannelValue::xy(0.0, 0.0), soft)),
        pointer: Some(PointerPosition::CENTER),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(target: &Option<Target>) -> &ChannelValue {
        &target.as_ref().unwrap().value
    }

    #[test]
    fn test_pointer_mapping() {
        let targets = pointer_targets(
            PointerPosition::new(85.0, 20.0),
            &MotionProfile::normal(),
            &TransitionConfig::default(),
        );

        assert_eq!(value(&targets.rotate), &ChannelValue::xy(-10.0, -15.0));
        assert_eq!(value(&targets.glare), &glare_value(85.0, 20.0, 1.0));
        // adjust(85, 0, 100, 37, 63) = 59.1, adjust(20, 0, 100, 33, 67) = 39.8
        let background = value(&targets.background);
        assert!((background.get("x").unwrap() - 59.1).abs() < 1e-4);
        assert!((background.get("y").unwrap() - 39.8).abs() < 1e-4);
        assert_eq!(targets.rotate.as_ref().unwrap().transition, Transition::Hard);
        assert_eq!(
            targets.scale.as_ref().unwrap().transition,
            Transition::Soft(0.35)
        );
        assert_eq!(
            targets.rotate_delta.as_ref().unwrap().transition,
            Transition::Soft(0.4)
        );
    }

    #[test]
    fn test_pointer_rotation_is_rounded() {
        let targets = pointer_targets(
            PointerPosition::new(60.0, 50.0),
            &MotionProfile::normal(),
            &TransitionConfig::default(),
        );
        // -(10 / 3.5) = -2.857142...
        assert_eq!(value(&targets.rotate).get("x"), Some(-2.857));
    }

    #[test]
    fn test_reduced_motion_scales_pointer() {
        let targets = pointer_targets(
            PointerPosition::new(100.0, 100.0),
            &MotionProfile::reduced(),
            &TransitionConfig::default(),
        );
        assert_eq!(value(&targets.rotate).get("y"), Some(15.0));
        assert_eq!(value(&targets.scale), &ChannelValue::scalar(1.015));
        assert_eq!(value(&targets.glare).get("o"), Some(0.65));
    }

    #[test]
    fn test_orientation_clamps_to_limits() {
        let targets = orientation_targets(
            &OrientationAngles::new(0.0, 40.0, -30.0),
            &MotionProfile::normal(),
            &TransitionConfig::default(),
        );

        assert_eq!(value(&targets.rotate), &ChannelValue::xy(16.0, 18.0));
        assert_eq!(value(&targets.glare), &glare_value(0.0, 100.0, 1.0));
        assert_eq!(targets.pointer, Some(PointerPosition::new(0.0, 100.0)));
        assert_eq!(
            targets.glare.as_ref().unwrap().transition,
            Transition::Soft(0.2)
        );
    }

    #[test]
    fn test_showcase_start_point() {
        let targets = showcase_targets(0.0, &MotionProfile::normal());
        let rotate = value(&targets.rotate);
        assert!(rotate.get("x").unwrap().abs() < 1e-5);
        assert!((rotate.get("y").unwrap() - 6.5).abs() < 1e-5);

        let background = value(&targets.background);
        assert!((background.get("y").unwrap() - 38.0).abs() < 1e-4);
        assert!(targets.rotate_delta.is_none());
    }

    #[test]
    fn test_inertia_is_clamped() {
        let velocity = ReleaseVelocity {
            rotate: ChannelValue::xy(5.0, -0.5),
            glare: glare_value(20.0, -1.0, -0.2),
            background: ChannelValue::xy(100.0, 0.0),
        };
        let targets =
            inertia_targets(&velocity, &MotionProfile::normal(), &ReleaseConfig::default());

        assert_eq!(value(&targets.rotate), &ChannelValue::xy(20.0, -5.0));
        let glare = value(&targets.glare);
        assert_eq!(glare.get("x"), Some(100.0));
        assert_eq!(glare.get("y"), Some(42.0));
        assert!((glare.get("o").unwrap() - 0.28).abs() < 1e-6);
        assert_eq!(value(&targets.background), &ChannelValue::xy(70.0, 50.0));
        assert!(targets.scale.is_none());
    }

    #[test]
    fn test_rest_targets() {
        let targets = rest_targets(0.16, 0.0);
        assert_eq!(value(&targets.glare), &glare_value(50.0, 50.0, 0.0));
        assert_eq!(value(&targets.scale), &ChannelValue::scalar(1.0));
        assert_eq!(targets.pointer, Some(PointerPosition::CENTER));
        assert_eq!(
            targets.translate.as_ref().unwrap().transition,
            Transition::Soft(0.16)
        );
    }
}
