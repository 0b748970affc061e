//! Headless simulation
//!
//! Mounts the scenario's cards on a manual host, replays the timeline on a
//! fixed frame clock and writes one JSON line per card per sampled frame.

use crate::scenario::{Action, Scenario};
use anyhow::{Context, Result};
use holo_animation::SurfaceStyle;
use holo_card::{CardConfig, CardController, CardFrame, CardRuntime, Navigation, Navigator};
use holo_platform::{Event, ManualHost, ManualSensor, PreferenceEvent, SurfaceId, VisibilityEvent};
use std::collections::HashSet;
use std::io::Write;
use std::rc::Rc;
use tracing::{debug, info};

/// Frame clock settings
#[derive(Clone, Copy, Debug)]
pub struct Settings {
    pub frame_ms: f64,
    /// Emit every n-th frame
    pub every: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            frame_ms: 1000.0 / 60.0,
            every: 1,
        }
    }
}

/// Run statistics
#[derive(Debug, Default)]
pub struct Summary {
    /// Frames the scheduler actually serviced
    pub frames: u64,
    /// Frame requests the host received
    pub frame_requests: u64,
    /// JSON lines written
    pub lines: u64,
    /// Navigations performed, as `(time_ms, card, navigation)`
    pub navigations: Vec<(f64, String, Navigation)>,
}

struct MountedCard {
    id: String,
    surface: SurfaceId,
    controller: Rc<CardController>,
}

/// In-page anchors are the card ids
struct PageNavigator<'a> {
    anchors: &'a HashSet<String>,
}

impl Navigator for PageNavigator<'_> {
    fn scroll_into_view(&mut self, id: &str) -> bool {
        let found = self.anchors.contains(id);
        info!(anchor = id, found, "scroll into view");
        found
    }

    fn set_hash(&mut self, hash: &str) {
        info!(hash, "set location hash");
    }

    fn assign(&mut self, url: &str) {
        info!(url, "navigate");
    }
}

/// Replay `scenario` and write frames to `out`
pub fn run<W: Write>(
    scenario: &Scenario,
    config: CardConfig,
    settings: Settings,
    out: &mut W,
) -> Result<Summary> {
    if !(settings.frame_ms > 0.0) {
        anyhow::bail!("frame interval must be positive, got {}", settings.frame_ms);
    }
    let every = settings.every.max(1);

    let host = Rc::new(ManualHost::new());
    let sensor = Rc::new(ManualSensor::new(scenario.sensor));
    let runtime = CardRuntime::new(config, host.clone(), sensor);
    runtime.set_reduced_motion(scenario.reduced_motion);

    let mut cards = Vec::with_capacity(scenario.cards.len());
    for (index, spec) in scenario.cards.iter().enumerate() {
        let surface = SurfaceId(index as u64 + 1);
        let controller =
            CardController::mount(&runtime, surface, Rc::new(SurfaceStyle::new()), spec.options())
                .with_context(|| format!("Failed to mount card '{}'", spec.id))?;
        cards.push(MountedCard {
            id: spec.id.clone(),
            surface,
            controller,
        });
    }
    let anchors: HashSet<String> = cards.iter().map(|card| card.id.clone()).collect();
    let mut navigator = PageNavigator { anchors: &anchors };

    let mut summary = Summary::default();
    let mut events = scenario.events.iter().peekable();
    let mut now_ms = 0.0;
    let mut frame_index = 0u64;

    loop {
        while let Some(event) = events.next_if(|event| event.at_ms <= now_ms) {
            debug!(at_ms = event.at_ms, action = ?event.action, "scenario event");
            if let Some((card, navigation)) = apply(&runtime, &cards, &event.action) {
                navigation.perform(&mut navigator);
                summary.navigations.push((now_ms, card, navigation));
            }
        }

        runtime.run_due_tasks();
        if host.take_frame_request() {
            runtime.dispatch(&Event::Frame);
            summary.frames += 1;
        }

        if frame_index % every == 0 {
            for card in &cards {
                let frame = CardFrame {
                    card: card.id.clone(),
                    time_ms: now_ms,
                    state: card.controller.state(),
                    classes: card.controller.class_list(),
                    outputs: card.controller.snapshot(),
                };
                serde_json::to_writer(&mut *out, &frame).context("Failed to write frame")?;
                writeln!(out).context("Failed to write frame")?;
                summary.lines += 1;
            }
        }

        if now_ms >= scenario.duration_ms {
            break;
        }
        frame_index += 1;
        now_ms = (frame_index as f64 * settings.frame_ms).min(scenario.duration_ms);
        host.set_now(now_ms);
    }

    summary.frame_requests = host.frame_request_count();
    Ok(summary)
}

/// Forward one scenario action to the runtime
fn apply(
    runtime: &CardRuntime,
    cards: &[MountedCard],
    action: &Action,
) -> Option<(String, Navigation)> {
    let surface_of = |id: &str| cards.iter().find(|card| card.id == id).map(|c| c.surface);

    if let Some(input) = action.input() {
        let id = action.card()?;
        let navigation = runtime.dispatch(&Event::Input {
            surface: surface_of(id)?,
            event: input,
        })?;
        return Some((id.to_string(), navigation));
    }

    let event = match action {
        Action::Tilt { .. } => Event::Orientation(action.orientation_sample()?),
        Action::DocumentVisible { visible } => {
            Event::Visibility(VisibilityEvent::Document { visible: *visible })
        }
        Action::SurfaceVisible { card, visible } => Event::Visibility(VisibilityEvent::Surface {
            surface: surface_of(card)?,
            intersecting: *visible,
        }),
        Action::ReducedMotion { enabled } => {
            Event::Preference(PreferenceEvent::ReducedMotion(*enabled))
        }
        _ => return None,
    };
    runtime.dispatch(&event);
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn lines(output: &[u8]) -> Vec<Value> {
        String::from_utf8(output.to_vec())
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    fn settings() -> Settings {
        Settings {
            frame_ms: 16.0,
            every: 1,
        }
    }

    #[test]
    fn test_pointer_session() {
        let scenario = Scenario::parse(
            r##"
            duration_ms = 400

            [[cards]]
            id = "hero"
            page_url = "#hero"

            [[events]]
            at_ms = 32
            kind = "pointer_enter"
            card = "hero"
            x = 90
            y = 10

            [[events]]
            at_ms = 320
            kind = "click"
            card = "hero"
            "##,
        )
        .unwrap();

        let mut out = Vec::new();
        let summary = run(&scenario, CardConfig::default(), settings(), &mut out).unwrap();
        let frames = lines(&out);

        assert_eq!(frames.len() as u64, summary.lines);
        assert_eq!(frames[0]["state"], "idle");
        assert_eq!(frames.last().unwrap()["state"], "pointer");
        assert_eq!(frames.last().unwrap()["outputs"]["pointer"]["x"], 90.0);
        assert!(summary.frames > 0);
        assert_eq!(
            summary.navigations,
            vec![(320.0, "hero".to_string(), Navigation::Anchor("hero".into()))]
        );
    }

    #[test]
    fn test_sampling_interval() {
        let scenario = Scenario::parse(
            r#"
            duration_ms = 160

            [[cards]]
            id = "a"

            [[cards]]
            id = "b"
            "#,
        )
        .unwrap();

        let mut out = Vec::new();
        let summary = run(
            &scenario,
            CardConfig::default(),
            Settings {
                frame_ms: 16.0,
                every: 5,
            },
            &mut out,
        )
        .unwrap();

        // Frames 0, 5 and 10 for both cards
        assert_eq!(summary.lines, 6);
        assert_eq!(summary.frames, 0);
    }

    #[test]
    fn test_showcase_scenario_ends_idle() {
        let scenario = Scenario::parse(
            r#"
            duration_ms = 9000

            [[cards]]
            id = "hero"
            showcase = true
            "#,
        )
        .unwrap();

        let mut out = Vec::new();
        run(&scenario, CardConfig::default(), settings(), &mut out).unwrap();
        let frames = lines(&out);

        assert!(frames.iter().any(|f| f["state"] == "showcase"));
        let last = frames.last().unwrap();
        assert_eq!(last["state"], "idle");
        assert_eq!(last["time_ms"], 9000.0);
    }

    #[test]
    fn test_rejects_zero_frame_interval() {
        let scenario = Scenario::parse("[[cards]]\nid = \"a\"\n").unwrap();
        let err = run(
            &scenario,
            CardConfig::default(),
            Settings {
                frame_ms: 0.0,
                every: 1,
            },
            &mut Vec::new(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("frame interval"));
    }
}
