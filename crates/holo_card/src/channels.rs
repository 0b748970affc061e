//! The card's channel set
//!
//! Six spring channels and the directly written pointer properties:
//!
//! | channel | fields | spring | outputs |
//! |---|---|---|---|
//! | rotate | x, y | interactive | `--rotate-x/y` (deg) |
//! | rotate_delta | x, y | popover | `--rotate-delta-x/y` (deg) |
//! | glare | x, y, o | interactive | `--glare-x/y` (%), `--card-opacity` |
//! | background | x, y | interactive | `--background-x/y` (%) |
//! | scale | scalar | popover | `--card-scale` |
//! | translate | x, y | popover | `--translate-x/y` (px) |

use crate::config::SpringPresets;
use crate::error::Result;
use crate::math::clamp;
use crate::targets::{glare_value, CardTargets, ReleaseVelocity, Target};
use holo_animation::{
    AnimatedChannel, Channel, ChannelValue, SchedulerHandle, StyleSink, StyleValue, Unit,
    VisibilityGate,
};
use holo_platform::PointerPosition;
use std::rc::Rc;

pub const POINTER_X: &str = "--pointer-x";
pub const POINTER_Y: &str = "--pointer-y";
pub const POINTER_FROM_CENTER: &str = "--pointer-from-center";
pub const POINTER_FROM_TOP: &str = "--pointer-from-top";
pub const POINTER_FROM_LEFT: &str = "--pointer-from-left";

/// Pointer-relative outputs derived from one position
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerOutputs {
    pub x: f32,
    pub y: f32,
    /// Distance from the center, 0 at the center and 1 at an edge midpoint
    pub from_center: f32,
    pub from_top: f32,
    pub from_left: f32,
}

impl PointerOutputs {
    pub fn from_position(position: PointerPosition) -> Self {
        let PointerPosition { x, y } = position;
        let dx = (x - 50.0) / 50.0;
        let dy = (y - 50.0) / 50.0;
        Self {
            x,
            y,
            from_center: clamp((dx * dx + dy * dy).sqrt(), 0.0, 1.0),
            from_top: y / 100.0,
            from_left: x / 100.0,
        }
    }

    fn write(&self, sink: &dyn StyleSink) {
        sink.set_property(POINTER_X, StyleValue::number(self.x, Unit::Percent));
        sink.set_property(POINTER_Y, StyleValue::number(self.y, Unit::Percent));
        sink.set_property(
            POINTER_FROM_CENTER,
            StyleValue::number(self.from_center, Unit::None),
        );
        sink.set_property(POINTER_FROM_TOP, StyleValue::number(self.from_top, Unit::None));
        sink.set_property(POINTER_FROM_LEFT, StyleValue::number(self.from_left, Unit::None));
    }
}

/// All animated channels of one card
pub struct CardChannels {
    pub rotate: AnimatedChannel,
    pub rotate_delta: AnimatedChannel,
    pub glare: AnimatedChannel,
    pub background: AnimatedChannel,
    pub scale: AnimatedChannel,
    pub translate: AnimatedChannel,
    sink: Rc<dyn StyleSink>,
}

impl CardChannels {
    /// Build and register the six channels
    ///
    /// Every channel is gated on the card's surface visibility.
    pub fn new(
        handle: &SchedulerHandle,
        sink: Rc<dyn StyleSink>,
        springs: &SpringPresets,
        gate: &VisibilityGate,
    ) -> Result<Self> {
        let add = |channel: Channel| AnimatedChannel::new(handle.clone(), channel);

        let rotate = add(
            Channel::builder("rotate", ChannelValue::xy(0.0, 0.0), springs.interactive)
                .bind("x", "--rotate-x", Unit::Deg)
                .bind("y", "--rotate-y", Unit::Deg)
                .gate(gate.clone())
                .build(Rc::clone(&sink))?,
        )?;
        let rotate_delta = add(
            Channel::builder("rotate_delta", ChannelValue::xy(0.0, 0.0), springs.popover)
                .bind("x", "--rotate-delta-x", Unit::Deg)
                .bind("y", "--rotate-delta-y", Unit::Deg)
                .gate(gate.clone())
                .build(Rc::clone(&sink))?,
        )?;
        let glare = add(
            Channel::builder("glare", glare_value(50.0, 50.0, 0.0), springs.interactive)
                .bind("x", "--glare-x", Unit::Percent)
                .bind("y", "--glare-y", Unit::Percent)
                .bind("o", "--card-opacity", Unit::None)
                .gate(gate.clone())
                .build(Rc::clone(&sink))?,
        )?;
        let background = add(
            Channel::builder("background", ChannelValue::xy(50.0, 50.0), springs.interactive)
                .bind("x", "--background-x", Unit::Percent)
                .bind("y", "--background-y", Unit::Percent)
                .gate(gate.clone())
                .build(Rc::clone(&sink))?,
        )?;
        let scale = add(
            Channel::builder("scale", ChannelValue::scalar(1.0), springs.popover)
                .bind_scalar("--card-scale", Unit::None)
                .gate(gate.clone())
                .build(Rc::clone(&sink))?,
        )?;
        let translate = add(
            Channel::builder("translate", ChannelValue::xy(0.0, 0.0), springs.popover)
                .bind("x", "--translate-x", Unit::Px)
                .bind("y", "--translate-y", Unit::Px)
                .gate(gate.clone())
                .build(Rc::clone(&sink))?,
        )?;

        Ok(Self {
            rotate,
            rotate_delta,
            glare,
            background,
            scale,
            translate,
            sink,
        })
    }

    fn each(&self) -> [(&AnimatedChannel, &'static str); 6] {
        [
            (&self.rotate, "rotate"),
            (&self.rotate_delta, "rotate_delta"),
            (&self.glare, "glare"),
            (&self.background, "background"),
            (&self.scale, "scale"),
            (&self.translate, "translate"),
        ]
    }

    /// Retarget every channel named in `targets`
    ///
    /// A rejected target (detached surface, shape mismatch) is logged and
    /// skipped; the remaining channels are still retargeted. Returns
    /// whether every target was accepted.
    pub fn apply(&self, targets: &CardTargets) -> bool {
        let slots: [(&AnimatedChannel, &Option<Target>); 6] = [
            (&self.rotate, &targets.rotate),
            (&self.rotate_delta, &targets.rotate_delta),
            (&self.glare, &targets.glare),
            (&self.background, &targets.background),
            (&self.scale, &targets.scale),
            (&self.translate, &targets.translate),
        ];

        let mut accepted = true;
        for (channel, target) in slots {
            let Some(target) = target else {
                continue;
            };
            if let Err(err) = channel.set_target(&target.value, target.transition) {
                tracing::warn!(error = %err, "target rejected");
                accepted = false;
            }
        }

        if let Some(position) = targets.pointer {
            self.write_pointer(position);
        }
        accepted
    }

    /// Write the pointer position and its derived outputs
    pub fn write_pointer(&self, position: PointerPosition) {
        if !self.sink.is_attached() {
            return;
        }
        PointerOutputs::from_position(position).write(self.sink.as_ref());
    }

    /// Initial output values written on mount
    pub fn write_initial(&self) {
        if !self.sink.is_attached() {
            return;
        }
        self.write_pointer(PointerPosition::CENTER);
        self.sink
            .set_property("--card-opacity", StyleValue::number(0.0, Unit::None));
    }

    /// Last measured velocities of rotate, glare and background
    pub fn release_velocity(&self) -> ReleaseVelocity {
        let read = |channel: &AnimatedChannel, rest: ChannelValue| {
            channel.velocity().unwrap_or(rest)
        };
        ReleaseVelocity {
            rotate: read(&self.rotate, ChannelValue::xy(0.0, 0.0)),
            glare: read(&self.glare, glare_value(0.0, 0.0, 0.0)),
            background: read(&self.background, ChannelValue::xy(0.0, 0.0)),
        }
    }

    /// Whether any channel is still moving
    pub fn is_animating(&self) -> bool {
        self.each().iter().any(|(channel, _)| channel.is_animating())
    }

    /// Stop every channel where it is
    pub fn stop_all(&self) {
        for (channel, name) in self.each() {
            channel.stop();
            tracing::trace!(channel = name, "channel stopped");
        }
    }

    pub fn sink(&self) -> &Rc<dyn StyleSink> {
        &self.sink
    }
}
