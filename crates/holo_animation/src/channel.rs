//! Spring channels
//!
//! A [`Channel`] owns one animated quantity: its shape, one [`Spring`] per
//! field, the spring parameters in effect, and the binding of each field to
//! an output property on a render surface.

use crate::error::{AnimationError, Result};
use crate::spring::{frame_dt, Spring, SpringConfig};
use crate::surface::{StyleSink, StyleValue, Unit};
use crate::values::{ChannelShape, ChannelValue};
use crate::visibility::VisibilityGate;
use smallvec::SmallVec;
use std::fmt;
use std::rc::Rc;

/// How a new target should be approached
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Transition {
    /// Use the channel's base spring
    #[default]
    Hard,
    /// Use a softened spring until the channel settles (factor in `(0, 1]`)
    Soft(f32),
}

/// One field's output property
#[derive(Clone, Debug, PartialEq)]
pub struct OutputBinding {
    pub property: String,
    pub unit: Unit,
}

/// Builder for [`Channel`]
pub struct ChannelBuilder {
    name: String,
    initial: ChannelValue,
    config: SpringConfig,
    bindings: Vec<(Option<String>, OutputBinding)>,
    gate: Option<VisibilityGate>,
}

impl ChannelBuilder {
    /// Bind a vector field to an output property
    pub fn bind(mut self, field: &str, property: &str, unit: Unit) -> Self {
        self.bindings.push((
            Some(field.to_string()),
            OutputBinding {
                property: property.to_string(),
                unit,
            },
        ));
        self
    }

    /// Bind a scalar channel to its output property
    pub fn bind_scalar(mut self, property: &str, unit: Unit) -> Self {
        self.bindings.push((
            None,
            OutputBinding {
                property: property.to_string(),
                unit,
            },
        ));
        self
    }

    /// Suspend stepping while this gate reports the surface hidden
    pub fn gate(mut self, gate: VisibilityGate) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Validate the bindings and create the channel
    ///
    /// Every field must be bound exactly once; the output order follows the
    /// field order of the initial value.
    pub fn build(self, sink: Rc<dyn StyleSink>) -> Result<Channel> {
        let shape = self.initial.shape();
        let mismatch = |reason: String| AnimationError::BindingMismatch {
            channel: self.name.clone(),
            reason,
        };

        if let ChannelShape::Vector(fields) = &shape {
            if fields.is_empty() {
                return Err(AnimationError::EmptyShape(self.name.clone()));
            }
        }
        if self.bindings.len() != shape.len() {
            return Err(mismatch(format!(
                "{} bindings for {} fields",
                self.bindings.len(),
                shape.len()
            )));
        }

        let mut outputs: Vec<Option<OutputBinding>> = vec![None; shape.len()];
        for (field, binding) in &self.bindings {
            let index = match (&shape, field) {
                (ChannelShape::Scalar, None) => 0,
                (ChannelShape::Vector(_), Some(field)) => shape
                    .index_of(field)
                    .ok_or_else(|| mismatch(format!("unknown field '{}'", field)))?,
                (ChannelShape::Scalar, Some(field)) => {
                    return Err(mismatch(format!("scalar channel bound to field '{}'", field)))
                }
                (ChannelShape::Vector(_), None) => {
                    return Err(mismatch("vector channel needs named bindings".to_string()))
                }
            };
            if outputs[index].replace(binding.clone()).is_some() {
                return Err(mismatch(format!("field #{} bound twice", index)));
            }
        }

        let springs = shape
            .align(&self.name, &self.initial)?
            .into_iter()
            .map(Spring::new)
            .collect();

        Ok(Channel {
            name: self.name,
            shape,
            springs,
            outputs: outputs.into_iter().flatten().collect(),
            base: self.config,
            active: self.config,
            sink,
            gate: self.gate,
            pending: false,
            last_frame_ms: None,
        })
    }
}

/// One independently spring-animated quantity
pub struct Channel {
    name: String,
    shape: ChannelShape,
    springs: SmallVec<[Spring; 4]>,
    outputs: SmallVec<[OutputBinding; 4]>,
    base: SpringConfig,
    active: SpringConfig,
    sink: Rc<dyn StyleSink>,
    gate: Option<VisibilityGate>,
    pending: bool,
    last_frame_ms: Option<f64>,
}

impl Channel {
    pub fn builder(name: &str, initial: ChannelValue, config: SpringConfig) -> ChannelBuilder {
        ChannelBuilder {
            name: name.to_string(),
            initial,
            config,
            bindings: Vec::new(),
            gate: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> &ChannelShape {
        &self.shape
    }

    pub fn current(&self) -> ChannelValue {
        self.shape.compose(self.springs.iter().map(|s| s.value()))
    }

    pub fn previous(&self) -> ChannelValue {
        self.shape.compose(self.springs.iter().map(|s| s.previous()))
    }

    pub fn target(&self) -> ChannelValue {
        self.shape.compose(self.springs.iter().map(|s| s.target()))
    }

    /// Last measured velocity per field, in units per nominal frame
    pub fn velocity(&self) -> ChannelValue {
        self.shape.compose(self.springs.iter().map(|s| s.velocity()))
    }

    pub fn base_config(&self) -> SpringConfig {
        self.base
    }

    /// Parameters in effect (softened during a soft transition)
    pub fn active_config(&self) -> SpringConfig {
        self.active
    }

    /// Whether the channel still has motion to perform
    pub fn has_pending_work(&self) -> bool {
        self.pending
    }

    /// Whether the channel's visibility gate says stepping is suspended
    pub fn is_gated(&self) -> bool {
        self.gate.as_ref().is_some_and(|g| g.is_paused())
    }

    /// Retarget the channel
    ///
    /// Rejected without side effects when the value's shape differs or the
    /// surface is detached.
    pub fn set_target(&mut self, value: &ChannelValue, transition: Transition) -> Result<()> {
        let targets = self.shape.align(&self.name, value)?;
        if !self.sink.is_attached() {
            return Err(AnimationError::SurfaceDetached(self.name.clone()));
        }

        for (spring, target) in self.springs.iter_mut().zip(targets) {
            spring.set_target(target);
        }
        self.active = match transition {
            Transition::Hard => self.base,
            Transition::Soft(factor) => self.base.softened(factor),
        };
        if !self.pending {
            self.pending = true;
            self.last_frame_ms = None;
        }
        Ok(())
    }

    /// Place the channel at rest on `value` and write it out immediately
    pub fn jump(&mut self, value: &ChannelValue) -> Result<()> {
        let values = self.shape.align(&self.name, value)?;
        for (spring, value) in self.springs.iter_mut().zip(values) {
            spring.jump(value);
        }
        self.active = self.base;
        self.pending = false;
        self.last_frame_ms = None;
        self.write_output();
        Ok(())
    }

    /// Drop pending work; current and target are kept
    pub fn stop(&mut self) {
        self.pending = false;
    }

    /// Pause hook: forget motion history so a resume does not spike velocity
    pub fn pause(&mut self) {
        for spring in self.springs.iter_mut() {
            spring.snapshot();
        }
        self.last_frame_ms = None;
    }

    /// Resume hook: the next step integrates one nominal frame
    pub fn resume(&mut self) {
        self.last_frame_ms = None;
    }

    /// Integrate one frame at `now_ms`; returns `true` when settled
    pub fn step(&mut self, now_ms: f64) -> bool {
        let dt = frame_dt(self.last_frame_ms.map(|last| now_ms - last));
        self.last_frame_ms = Some(now_ms);

        let mut settled = true;
        for spring in self.springs.iter_mut() {
            settled &= spring.step(&self.active, dt);
        }
        self.write_output();

        if settled {
            self.pending = false;
            self.active = self.base;
            tracing::trace!(channel = %self.name, "channel settled");
        }
        settled
    }

    /// Write every field to its bound property
    pub fn write_output(&self) {
        if !self.sink.is_attached() {
            return;
        }
        for (spring, output) in self.springs.iter().zip(&self.outputs) {
            self.sink.set_property(
                &output.property,
                StyleValue::number(spring.value(), output.unit),
            );
        }
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("name", &self.name)
            .field("shape", &self.shape)
            .field("springs", &self.springs)
            .field("pending", &self.pending)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::SurfaceStyle;

    fn glare(surface: &SurfaceStyle) -> Channel {
        Channel::builder(
            "glare",
            ChannelValue::vector([("x", 50.0), ("y", 50.0), ("o", 0.0)]),
            SpringConfig::interactive(),
        )
        .bind("x", "--glare-x", Unit::Percent)
        .bind("y", "--glare-y", Unit::Percent)
        .bind("o", "--card-opacity", Unit::None)
        .build(Rc::new(surface.clone()))
        .unwrap()
    }

    fn run_to_rest(channel: &mut Channel) -> usize {
        let mut now = 0.0;
        for frame in 1..=5000 {
            now += 16.0;
            if channel.step(now) {
                return frame;
            }
        }
        panic!("channel never settled");
    }

    #[test]
    fn test_jump_is_synchronous() {
        let surface = SurfaceStyle::new();
        let mut channel = glare(&surface);
        let value = ChannelValue::vector([("x", 10.0), ("y", 20.0), ("o", 1.0)]);

        channel.jump(&value).unwrap();
        channel.jump(&value).unwrap();

        assert_eq!(channel.current(), value);
        assert_eq!(channel.previous(), value);
        assert_eq!(channel.target(), value);
        assert!(!channel.has_pending_work());
        assert_eq!(surface.number("--glare-x"), Some(10.0));
        assert_eq!(surface.number("--card-opacity"), Some(1.0));
    }

    #[test]
    fn test_incompatible_target_leaves_state() {
        let surface = SurfaceStyle::new();
        let mut channel = glare(&surface);
        let before = (channel.current(), channel.previous(), channel.target());

        let err = channel
            .set_target(&ChannelValue::xy(1.0, 2.0), Transition::Hard)
            .unwrap_err();
        assert!(matches!(err, AnimationError::ShapeMismatch { .. }));
        assert!(channel.jump(&ChannelValue::scalar(3.0)).is_err());

        assert_eq!(before, (channel.current(), channel.previous(), channel.target()));
        assert!(!channel.has_pending_work());
    }

    #[test]
    fn test_detached_surface_rejects_target() {
        let surface = SurfaceStyle::detached();
        let mut channel = glare(&surface);

        let err = channel
            .set_target(
                &ChannelValue::vector([("x", 0.0), ("y", 0.0), ("o", 1.0)]),
                Transition::Hard,
            )
            .unwrap_err();
        assert_eq!(err, AnimationError::SurfaceDetached("glare".into()));
        assert!(!channel.has_pending_work());
    }

    #[test]
    fn test_steps_until_settled() {
        let surface = SurfaceStyle::new();
        let mut channel = glare(&surface);
        let target = ChannelValue::vector([("y", 80.0), ("o", 1.0), ("x", 20.0)]);

        channel.set_target(&target, Transition::Hard).unwrap();
        assert!(channel.has_pending_work());
        run_to_rest(&mut channel);

        assert_eq!(channel.current(), channel.target());
        assert_eq!(surface.number("--glare-x"), Some(20.0));
        assert_eq!(surface.number("--glare-y"), Some(80.0));
        assert!(!channel.has_pending_work());
    }

    #[test]
    fn test_soft_transition_restored_on_settle() {
        let surface = SurfaceStyle::new();
        let mut channel = glare(&surface);

        channel
            .set_target(
                &ChannelValue::vector([("x", 60.0), ("y", 40.0), ("o", 0.5)]),
                Transition::Soft(0.2),
            )
            .unwrap();
        assert!(channel.active_config().stiffness < channel.base_config().stiffness);

        run_to_rest(&mut channel);
        assert_eq!(channel.active_config(), channel.base_config());
    }

    #[test]
    fn test_soft_transition_is_slower() {
        let target = ChannelValue::vector([("x", 100.0), ("y", 100.0), ("o", 1.0)]);

        let hard_surface = SurfaceStyle::new();
        let mut hard = glare(&hard_surface);
        hard.set_target(&target, Transition::Hard).unwrap();

        let soft_surface = SurfaceStyle::new();
        let mut soft = glare(&soft_surface);
        soft.set_target(&target, Transition::Soft(0.2)).unwrap();

        assert!(run_to_rest(&mut soft) > run_to_rest(&mut hard));
    }

    #[test]
    fn test_hard_target_restores_base_params() {
        let surface = SurfaceStyle::new();
        let mut channel = glare(&surface);
        let target = ChannelValue::vector([("x", 60.0), ("y", 40.0), ("o", 0.5)]);

        channel.set_target(&target, Transition::Soft(0.3)).unwrap();
        channel.set_target(&target, Transition::Hard).unwrap();
        assert_eq!(channel.active_config(), channel.base_config());
    }

    #[test]
    fn test_bindings_must_cover_fields() {
        let surface: Rc<dyn StyleSink> = Rc::new(SurfaceStyle::new());

        let missing = Channel::builder("rotate", ChannelValue::xy(0.0, 0.0), SpringConfig::default())
            .bind("x", "--rotate-x", Unit::Deg)
            .build(Rc::clone(&surface));
        assert!(matches!(missing, Err(AnimationError::BindingMismatch { .. })));

        let unknown = Channel::builder("rotate", ChannelValue::xy(0.0, 0.0), SpringConfig::default())
            .bind("x", "--rotate-x", Unit::Deg)
            .bind("z", "--rotate-z", Unit::Deg)
            .build(Rc::clone(&surface));
        assert!(matches!(unknown, Err(AnimationError::BindingMismatch { .. })));

        let twice = Channel::builder("rotate", ChannelValue::xy(0.0, 0.0), SpringConfig::default())
            .bind("x", "--rotate-x", Unit::Deg)
            .bind("x", "--rotate-y", Unit::Deg)
            .build(Rc::clone(&surface));
        assert!(matches!(twice, Err(AnimationError::BindingMismatch { .. })));

        let empty = Channel::builder(
            "none",
            ChannelValue::vector(Vec::<(String, f32)>::new()),
            SpringConfig::default(),
        )
        .build(surface);
        assert!(matches!(empty, Err(AnimationError::EmptyShape(_))));
    }

    #[test]
    fn test_output_follows_declared_binding_not_insertion() {
        let surface = SurfaceStyle::new();
        // bindings declared in a different order than the fields
        let mut channel = Channel::builder("bg", ChannelValue::xy(0.0, 0.0), SpringConfig::default())
            .bind("y", "--background-y", Unit::Percent)
            .bind("x", "--background-x", Unit::Percent)
            .build(Rc::new(surface.clone()))
            .unwrap();

        channel.jump(&ChannelValue::xy(30.0, 70.0)).unwrap();
        assert_eq!(surface.number("--background-x"), Some(30.0));
        assert_eq!(surface.number("--background-y"), Some(70.0));
    }

    #[test]
    fn test_scalar_channel() {
        let surface = SurfaceStyle::new();
        let mut scale = Channel::builder("scale", ChannelValue::scalar(1.0), SpringConfig::popover())
            .bind_scalar("--card-scale", Unit::None)
            .build(Rc::new(surface.clone()))
            .unwrap();

        scale.set_target(&ChannelValue::scalar(1.06), Transition::Soft(0.35)).unwrap();
        run_to_rest(&mut scale);
        assert_eq!(surface.number("--card-scale"), Some(1.06));
    }

    #[test]
    fn test_pause_snapshots_previous() {
        let surface = SurfaceStyle::new();
        let mut channel = glare(&surface);
        channel
            .set_target(
                &ChannelValue::vector([("x", 90.0), ("y", 90.0), ("o", 1.0)]),
                Transition::Hard,
            )
            .unwrap();
        channel.step(16.0);
        channel.step(32.0);

        let current = channel.current();
        channel.pause();
        assert_eq!(channel.previous(), current);
        assert_eq!(channel.current(), current);
    }

    #[test]
    fn test_stop_keeps_values() {
        let surface = SurfaceStyle::new();
        let mut channel = glare(&surface);
        let target = ChannelValue::vector([("x", 90.0), ("y", 90.0), ("o", 1.0)]);
        channel.set_target(&target, Transition::Hard).unwrap();
        channel.step(16.0);

        let current = channel.current();
        channel.stop();
        assert!(!channel.has_pending_work());
        assert_eq!(channel.current(), current);
        assert_eq!(channel.target(), target);
    }
}
