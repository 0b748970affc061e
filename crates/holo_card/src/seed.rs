//! Per-card random seed
//!
//! Each card gets a seed in `[0, 1)^2` that offsets its texture layers so
//! that cards sharing artwork still look different.

use holo_animation::{StyleSink, StyleValue, Unit};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Width of the cosmos texture tile in pixels
const COSMOS_WIDTH: f32 = 734.0;
/// Height of the cosmos texture tile in pixels
const COSMOS_HEIGHT: f32 = 1280.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CardSeed {
    pub x: f32,
    pub y: f32,
}

impl CardSeed {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Draw a seed from the thread-local generator
    pub fn random() -> Self {
        Self::from_rng(&mut rand::rng())
    }

    pub fn from_rng<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            x: rng.random::<f32>(),
            y: rng.random::<f32>(),
        }
    }

    /// Background offset of the cosmos layer, e.g. `"367px 640px"`
    pub fn cosmos_background(&self) -> String {
        format!(
            "{}px {}px",
            (self.x * COSMOS_WIDTH).floor(),
            (self.y * COSMOS_HEIGHT).floor()
        )
    }

    /// Write `--seedx`, `--seedy` and `--cosmosbg`
    pub fn write(&self, sink: &dyn StyleSink) {
        if !sink.is_attached() {
            return;
        }
        sink.set_property("--seedx", StyleValue::number(self.x, Unit::None));
        sink.set_property("--seedy", StyleValue::number(self.y, Unit::None));
        sink.set_property("--cosmosbg", StyleValue::Text(self.cosmos_background()));
    }
}
