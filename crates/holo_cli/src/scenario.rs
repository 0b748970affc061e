//! Scenario files
//!
//! A scenario declares the cards on a page and a timeline of host events.
//!
//! ```toml
//! duration_ms = 8000
//!
//! [[cards]]
//! id = "hero"
//! showcase = true
//! page_url = "#hero"
//!
//! [[events]]
//! at_ms = 2500
//! kind = "pointer_enter"
//! card = "hero"
//! x = 80
//! y = 20
//! ```

use anyhow::{Context, Result};
use holo_card::CardSeed;
use holo_platform::{
    InputEvent, Key, KeyboardEvent, OrientationSample, PointerEvent, PointerPosition, TouchEvent,
};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

fn default_duration_ms() -> f64 {
    8000.0
}

fn default_true() -> bool {
    true
}

/// A complete scenario file
#[derive(Debug, Deserialize)]
pub struct Scenario {
    /// Simulated time span
    #[serde(default = "default_duration_ms")]
    pub duration_ms: f64,
    /// Whether the simulated device has an orientation sensor
    #[serde(default = "default_true")]
    pub sensor: bool,
    /// Initial reduced-motion preference
    #[serde(default)]
    pub reduced_motion: bool,
    pub cards: Vec<CardSpec>,
    #[serde(default)]
    pub events: Vec<ScenarioEvent>,
}

/// One card on the simulated page
#[derive(Debug, Deserialize)]
pub struct CardSpec {
    pub id: String,
    #[serde(default)]
    pub showcase: bool,
    #[serde(default)]
    pub page_url: Option<String>,
    #[serde(default)]
    pub scroll_flip: bool,
    /// Fixed `[x, y]` texture seed
    #[serde(default)]
    pub seed: Option<[f32; 2]>,
}

impl CardSpec {
    pub fn options(&self) -> holo_card::CardOptions {
        let mut options = holo_card::CardOptions::new()
            .showcase(self.showcase)
            .scroll_flip(self.scroll_flip);
        if let Some(url) = &self.page_url {
            options = options.page_url(url.clone());
        }
        if let Some([x, y]) = self.seed {
            options = options.seed(CardSeed::new(x, y));
        }
        options
    }
}

/// A timeline entry
#[derive(Debug, Deserialize)]
pub struct ScenarioEvent {
    pub at_ms: f64,
    #[serde(flatten)]
    pub action: Action,
}

/// What happens at a timeline entry
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    PointerEnter { card: String, x: f32, y: f32 },
    PointerMove { card: String, x: f32, y: f32 },
    PointerUp { card: String },
    PointerLeave { card: String },
    TouchStart { card: String, points: Vec<[f32; 2]> },
    TouchMove { card: String, points: Vec<[f32; 2]> },
    TouchEnd { card: String },
    Key { card: String, key: String },
    Click { card: String },
    Wheel { card: String, delta_y: f32 },
    Tilt {
        #[serde(default)]
        alpha: f32,
        beta: f32,
        gamma: f32,
    },
    DocumentVisible { visible: bool },
    SurfaceVisible { card: String, visible: bool },
    ReducedMotion { enabled: bool },
}

impl Action {
    /// The card this action targets, if any
    pub fn card(&self) -> Option<&str> {
        match self {
            Action::PointerEnter { card, .. }
            | Action::PointerMove { card, .. }
            | Action::PointerUp { card }
            | Action::PointerLeave { card }
            | Action::TouchStart { card, .. }
            | Action::TouchMove { card, .. }
            | Action::TouchEnd { card }
            | Action::Key { card, .. }
            | Action::Click { card }
            | Action::Wheel { card, .. }
            | Action::SurfaceVisible { card, .. } => Some(card),
            Action::Tilt { .. } | Action::DocumentVisible { .. } | Action::ReducedMotion { .. } => {
                None
            }
        }
    }

    /// The input event for card-targeted input actions
    pub fn input(&self) -> Option<InputEvent> {
        let points = |points: &[[f32; 2]]| {
            points
                .iter()
                .map(|[x, y]| PointerPosition::new(*x, *y))
                .collect::<Vec<_>>()
        };

        let event = match self {
            Action::PointerEnter { x, y, .. } => {
                InputEvent::Pointer(PointerEvent::Entered(PointerPosition::new(*x, *y)))
            }
            Action::PointerMove { x, y, .. } => {
                InputEvent::Pointer(PointerEvent::Moved(PointerPosition::new(*x, *y)))
            }
            Action::PointerUp { .. } => InputEvent::Pointer(PointerEvent::Released),
            Action::PointerLeave { .. } => InputEvent::Pointer(PointerEvent::Left),
            Action::TouchStart { points: p, .. } => InputEvent::Touch(TouchEvent::Started(points(p))),
            Action::TouchMove { points: p, .. } => InputEvent::Touch(TouchEvent::Moved(points(p))),
            Action::TouchEnd { .. } => InputEvent::Touch(TouchEvent::Ended),
            Action::Key { key, .. } => InputEvent::Keyboard(KeyboardEvent::pressed(parse_key(key))),
            Action::Click { .. } => InputEvent::Click,
            Action::Wheel { delta_y, .. } => InputEvent::Wheel {
                delta_x: 0.0,
                delta_y: *delta_y,
            },
            _ => return None,
        };
        Some(event)
    }

    pub fn orientation_sample(&self) -> Option<OrientationSample> {
        match self {
            Action::Tilt { alpha, beta, gamma } => {
                Some(OrientationSample::new(*alpha, *beta, *gamma))
            }
            _ => None,
        }
    }
}

fn parse_key(key: &str) -> Key {
    match key {
        "Enter" => Key::Enter,
        " " | "Space" => Key::Space,
        "Escape" => Key::Escape,
        "Tab" => Key::Tab,
        other => Key::Other(other.to_string()),
    }
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to load {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut scenario: Scenario = toml::from_str(content).context("Invalid scenario TOML")?;
        scenario.validate()?;
        // Stable: same-time events keep file order
        scenario
            .events
            .sort_by(|a, b| a.at_ms.total_cmp(&b.at_ms));
        Ok(scenario)
    }

    /// Check references and ranges
    pub fn validate(&self) -> Result<()> {
        if !(self.duration_ms > 0.0) {
            anyhow::bail!("duration_ms must be positive, got {}", self.duration_ms);
        }
        if self.cards.is_empty() {
            anyhow::bail!("scenario declares no cards");
        }

        let mut ids = HashSet::new();
        for card in &self.cards {
            if !ids.insert(card.id.as_str()) {
                anyhow::bail!("duplicate card id '{}'", card.id);
            }
        }

        for (index, event) in self.events.iter().enumerate() {
            if !(event.at_ms >= 0.0) {
                anyhow::bail!("event #{} has a negative time {}", index, event.at_ms);
            }
            if let Some(card) = event.action.card() {
                if !ids.contains(card) {
                    anyhow::bail!("event #{} targets unknown card '{}'", index, card);
                }
            }
        }
        Ok(())
    }
}
