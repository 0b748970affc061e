//! Output snapshot
//!
//! A read-back of every output a card produces, taken from its render
//! surface. Missing properties read as their rest values.

use crate::state::ControllerState;
use holo_animation::StyleSink;
use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

/// Every output channel of one card at one instant
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OutputSnapshot {
    pub rotate: Vec2,
    pub rotate_delta: Vec2,
    pub glare: Vec2,
    pub glare_opacity: f32,
    pub background: Vec2,
    pub pointer: Vec2,
    pub pointer_from_center: f32,
    pub scale: f32,
    pub translate: Vec2,
}

impl OutputSnapshot {
    pub fn read(sink: &dyn StyleSink) -> Self {
        let num = |name: &str, rest: f32| {
            sink.property(name)
                .and_then(|v| v.as_number())
                .unwrap_or(rest)
        };
        let pair = |x: &str, y: &str, rest: f32| Vec2 {
            x: num(x, rest),
            y: num(y, rest),
        };

        Self {
            rotate: pair("--rotate-x", "--rotate-y", 0.0),
            rotate_delta: pair("--rotate-delta-x", "--rotate-delta-y", 0.0),
            glare: pair("--glare-x", "--glare-y", 50.0),
            glare_opacity: num("--card-opacity", 0.0),
            background: pair("--background-x", "--background-y", 50.0),
            pointer: pair("--pointer-x", "--pointer-y", 50.0),
            pointer_from_center: num("--pointer-from-center", 0.0),
            scale: num("--card-scale", 1.0),
            translate: pair("--translate-x", "--translate-y", 0.0),
        }
    }

    /// Every output is at its rest value (within `tolerance`)
    pub fn is_at_rest(&self, tolerance: f32) -> bool {
        let near = |value: f32, rest: f32| (value - rest).abs() <= tolerance;
        near(self.rotate.x, 0.0)
            && near(self.rotate.y, 0.0)
            && near(self.glare.x, 50.0)
            && near(self.glare.y, 50.0)
            && near(self.glare_opacity, 0.0)
            && near(self.background.x, 50.0)
            && near(self.background.y, 50.0)
            && near(self.scale, 1.0)
            && near(self.translate.x, 0.0)
            && near(self.translate.y, 0.0)
    }
}

/// One simulator output line: a card's state and outputs at a frame
#[derive(Clone, Debug, Serialize)]
pub struct CardFrame {
    pub card: String,
    pub time_ms: f64,
    pub state: ControllerState,
    pub classes: Vec<&'static str>,
    pub outputs: OutputSnapshot,
}
