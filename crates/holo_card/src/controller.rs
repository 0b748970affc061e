//! Card controller
//!
//! One controller per mounted card. It owns the card's channels and
//! decides, event by event, which source may write their targets:
//!
//! - **Pointer** (highest priority): pointer enter/move and single touch
//!   always take over; release flings the card and snaps it back to rest.
//! - **Orientation**: device tilt drives the card only while nothing else
//!   does, behind engage/release hysteresis.
//! - **Showcase**: a one-off scripted cycle that starts after a delay when
//!   the card is idle, visible and reduced motion is off.
//!
//! All timers are [`DelayedTask`]s owned by the controller and the
//! showcase runs as a scheduler tick callback, so unmounting cancels
//! everything the controller started.

use crate::channels::CardChannels;
use crate::config::{CardConfig, MotionProfile};
use crate::error::{Result, SubscriberError};
use crate::navigation::Navigation;
use crate::orientation::{OrientationState, OrientationSource, OrientationSubscription};
use crate::runtime::CardRuntime;
use crate::scroll_flip::{FlipReading, ScrollFlip};
use crate::seed::CardSeed;
use crate::snapshot::OutputSnapshot;
use crate::state::{ControlEvent, ControllerState, OrientationStep, OrientationTracker};
use crate::targets::{
    inertia_targets, orientation_targets, pointer_targets, rest_targets, showcase_targets,
    CardTargets,
};
use holo_animation::{
    ChannelValue, DelayedTask, SchedulerHandle, StyleSink, TaskQueue, TickCallbackId,
    Transition, VisibilitySubscription,
};
use holo_platform::{
    InputEvent, KeyState, KeyboardEvent, PointerEvent, PointerPosition, SurfaceId, TouchEvent,
};
use serde::Serialize;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Per-card options
#[derive(Clone, Debug, Default)]
pub struct CardOptions {
    /// Opt in to the scripted showcase cycle
    pub showcase: bool,
    /// Activation target (`#anchor`, `#`, or a URL)
    pub page_url: Option<String>,
    /// Route wheel input into the rotate-delta flip
    pub scroll_flip: bool,
    /// Fixed texture seed (random when `None`)
    pub seed: Option<CardSeed>,
}

impl CardOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn showcase(mut self, showcase: bool) -> Self {
        self.showcase = showcase;
        self
    }

    pub fn page_url(mut self, url: impl Into<String>) -> Self {
        self.page_url = Some(url.into());
        self
    }

    pub fn scroll_flip(mut self, enabled: bool) -> Self {
        self.scroll_flip = enabled;
        self
    }

    pub fn seed(mut self, seed: CardSeed) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Flags the presentation layer styles the card with
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Presentation {
    pub active: bool,
    pub interacting: bool,
    pub showcase_active: bool,
}

/// Showcase lifecycle for one mount
enum ShowcasePhase {
    /// Not armed
    Idle,
    /// Waiting for the start attempt
    Waiting(DelayedTask),
    /// Cycle in progress
    Running {
        started_ms: f64,
        callback: TickCallbackId,
    },
}

struct ControllerInner {
    config: CardConfig,
    options: CardOptions,
    state: ControllerState,
    tracker: OrientationTracker,
    presentation: Presentation,
    reduced_motion: bool,
    document_visible: bool,
    mounted: bool,
    release_task: Option<DelayedTask>,
    showcase: ShowcasePhase,
    showcase_has_run: bool,
    flip: ScrollFlip,
    flip_callback: Option<TickCallbackId>,
}

impl ControllerInner {
    fn profile(&self) -> &MotionProfile {
        self.config.motion.profile(self.reduced_motion)
    }

    fn transition(&mut self, event: ControlEvent) {
        if let Some(next) = self.state.on_event(event) {
            tracing::debug!(from = ?self.state, to = ?next, ?event, "card state transition");
            self.state = next;
        }
    }

    fn showcase_eligible(&self) -> bool {
        self.options.showcase
            && self.mounted
            && self.document_visible
            && !self.reduced_motion
            && !self.showcase_has_run
    }
}

#[derive(Default)]
struct Subscriptions {
    orientation: Option<OrientationSubscription>,
    document: Option<VisibilitySubscription>,
    surface: Option<VisibilitySubscription>,
}

/// The arbitration state machine of one card
pub struct CardController {
    surface: SurfaceId,
    channels: CardChannels,
    scheduler: SchedulerHandle,
    tasks: TaskQueue,
    orientation: OrientationSource,
    inner: RefCell<ControllerInner>,
    subscriptions: RefCell<Subscriptions>,
    weak_self: Weak<CardController>,
}

impl CardController {
    /// Mount a card on `sink`
    ///
    /// Writes the initial outputs and the seed, subscribes to orientation
    /// and visibility, and arms the showcase if the card opted in.
    pub fn mount(
        runtime: &CardRuntime,
        surface: SurfaceId,
        sink: Rc<dyn StyleSink>,
        options: CardOptions,
    ) -> Result<Rc<Self>> {
        let config = *runtime.config();
        let (gate, gate_subscription) = runtime.visibility().gate(surface);
        let channels = CardChannels::new(
            &runtime.scheduler_handle(),
            Rc::clone(&sink),
            &config.springs,
            &gate,
        )?;
        channels.write_initial();
        options
            .seed
            .unwrap_or_else(CardSeed::random)
            .write(sink.as_ref());

        let inner = ControllerInner {
            config,
            flip: ScrollFlip::new(config.scroll_flip),
            options,
            state: ControllerState::Idle,
            tracker: OrientationTracker::new(),
            presentation: Presentation::default(),
            reduced_motion: runtime.reduced_motion(),
            document_visible: runtime.visibility().is_document_visible(),
            mounted: true,
            release_task: None,
            showcase: ShowcasePhase::Idle,
            showcase_has_run: false,
            flip_callback: None,
        };

        let controller = Rc::new_cyclic(|weak_self| CardController {
            surface,
            channels,
            scheduler: runtime.scheduler_handle(),
            tasks: runtime.tasks().clone(),
            orientation: runtime.orientation().clone(),
            inner: RefCell::new(inner),
            subscriptions: RefCell::new(Subscriptions::default()),
            weak_self: weak_self.clone(),
        });

        let weak = Rc::downgrade(&controller);
        let orientation = runtime.orientation().subscribe(move |state| match weak.upgrade() {
            Some(controller) => controller.on_orientation(state),
            None => Ok(()),
        });

        let weak = Rc::downgrade(&controller);
        let document = runtime.visibility().observe_document(move |visible| {
            if let Some(controller) = weak.upgrade() {
                controller.on_document_visibility(visible);
            }
        });

        *controller.subscriptions.borrow_mut() = Subscriptions {
            orientation: Some(orientation),
            document: Some(document),
            surface: Some(gate_subscription),
        };
        runtime.register(surface, &controller);

        let delay = config.showcase.initial_delay_ms;
        controller.arm_showcase(delay);
        tracing::debug!(?surface, "card mounted");
        Ok(controller)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn surface(&self) -> SurfaceId {
        self.surface
    }

    pub fn state(&self) -> ControllerState {
        self.inner.borrow().state
    }

    pub fn presentation(&self) -> Presentation {
        self.inner.borrow().presentation
    }

    pub fn orientation_tracker(&self) -> OrientationTracker {
        self.inner.borrow().tracker
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.borrow().mounted
    }

    pub fn showcase_has_run(&self) -> bool {
        self.inner.borrow().showcase_has_run
    }

    pub fn is_showcase_running(&self) -> bool {
        matches!(self.inner.borrow().showcase, ShowcasePhase::Running { .. })
    }

    /// Whether a snap-back to rest is scheduled
    pub fn is_release_pending(&self) -> bool {
        self.inner
            .borrow()
            .release_task
            .as_ref()
            .is_some_and(|task| task.is_pending())
    }

    pub fn flip_reading(&self) -> FlipReading {
        self.inner.borrow().flip.reading()
    }

    pub fn channels(&self) -> &CardChannels {
        &self.channels
    }

    /// Read back every output from the render surface
    pub fn snapshot(&self) -> OutputSnapshot {
        OutputSnapshot::read(self.channels.sink().as_ref())
    }

    /// Class names for the card element
    pub fn class_list(&self) -> Vec<&'static str> {
        let inner = self.inner.borrow();
        let p = inner.presentation;
        let mut classes = vec!["interactive"];
        if p.active && !p.showcase_active {
            classes.push("active");
        }
        if p.showcase_active {
            classes.push("showcase-active");
        }
        if p.interacting {
            classes.push("interacting");
        }
        if inner.options.showcase {
            classes.push("showcase");
        }
        classes
    }

    // =========================================================================
    // Input
    // =========================================================================

    /// Handle one input event targeted at this card
    ///
    /// Returns the navigation to perform when the input activated the card.
    pub fn handle_input(&self, event: &InputEvent) -> Option<Navigation> {
        if !self.is_mounted() {
            return None;
        }

        match event {
            InputEvent::Pointer(PointerEvent::Entered(position))
            | InputEvent::Pointer(PointerEvent::Moved(position)) => {
                self.engage_pointer(*position);
            }
            InputEvent::Pointer(
                PointerEvent::Released | PointerEvent::Left | PointerEvent::Cancelled,
            ) => self.release_pointer(),

            InputEvent::Touch(TouchEvent::Started(points)) => {
                if let [point] = points.as_slice() {
                    self.engage_pointer(*point);
                }
            }
            InputEvent::Touch(TouchEvent::Moved(points)) => {
                if let [point] = points.as_slice() {
                    if self.presentation().active {
                        self.engage_pointer(*point);
                    }
                }
            }
            InputEvent::Touch(TouchEvent::Ended | TouchEvent::Cancelled) => self.release_pointer(),

            InputEvent::Keyboard(KeyboardEvent {
                key,
                state: KeyState::Pressed,
            }) if key.is_activation() => return self.activate(),
            InputEvent::Keyboard(_) => {}

            InputEvent::Click => return self.activate(),

            InputEvent::Wheel { delta_y, .. } => self.on_wheel(*delta_y),
        }
        None
    }

    fn activate(&self) -> Option<Navigation> {
        let inner = self.inner.borrow();
        let navigation = Navigation::resolve(inner.options.page_url.as_deref()?)?;
        tracing::debug!(surface = ?self.surface, ?navigation, "card activated");
        Some(navigation)
    }

    fn engage_pointer(&self, position: PointerPosition) {
        let position = position.clamped();
        let (targets, pending_release) = {
            let mut inner = self.inner.borrow_mut();
            inner.transition(ControlEvent::PointerEngaged);
            inner.tracker.reset();
            inner.presentation = Presentation {
                active: true,
                interacting: true,
                showcase_active: false,
            };
            let flip = inner.flip.reading().rotation;
            let targets = pointer_targets(position, inner.profile(), &inner.config.transitions);
            (with_flip(targets, flip), inner.release_task.take())
        };
        drop(pending_release);

        self.channels.apply(&targets);
    }

    fn release_pointer(&self) {
        if self.state() == ControllerState::Pointer {
            self.release_to_idle(true);
        }
    }

    // =========================================================================
    // Release
    // =========================================================================

    /// Return to `Idle`
    ///
    /// With inertia the card first flings along its last measured velocity
    /// and snaps back after a delay; without inertia it snaps back now.
    pub fn release_to_idle(&self, with_inertia: bool) {
        let (inertia, delay, pending_release) = {
            let mut inner = self.inner.borrow_mut();
            inner.tracker.reset();
            inner.transition(ControlEvent::Released);
            inner.presentation = Presentation::default();

            let inertia = with_inertia.then(|| {
                inertia_targets(
                    &self.channels.release_velocity(),
                    inner.profile(),
                    &inner.config.release,
                )
            });
            (
                inertia,
                inner.config.release.snap_back_delay_ms,
                inner.release_task.take(),
            )
        };
        drop(pending_release);

        match inertia {
            Some(targets) => {
                self.channels.apply(&targets);
                let weak = self.weak_self.clone();
                let task = self.tasks.schedule(delay, move || {
                    if let Some(controller) = weak.upgrade() {
                        controller.snap_back();
                    }
                });
                self.inner.borrow_mut().release_task = Some(task);
            }
            None => self.snap_back(),
        }
    }

    /// Softly return every channel to rest
    fn snap_back(&self) {
        let (targets, finished_task) = {
            let mut inner = self.inner.borrow_mut();
            let soft = inner.profile().snap_soft_factor;
            let flip = inner.flip.reading().rotation;
            (rest_targets(soft, flip), inner.release_task.take())
        };
        drop(finished_task);

        tracing::trace!(surface = ?self.surface, "snap back to rest");
        self.channels.apply(&targets);
    }

    // =========================================================================
    // Orientation
    // =========================================================================

    fn on_orientation(&self, state: &OrientationState) -> std::result::Result<(), SubscriberError> {
        if !state.supported {
            return Ok(());
        }

        let step = {
            let mut inner = self.inner.borrow_mut();
            if !inner.mounted || inner.state.blocks_orientation() {
                return Ok(());
            }
            let config = inner.config.orientation;
            inner
                .tracker
                .on_sample(state.relative.tilt_magnitude(), &config)
        };

        match step {
            OrientationStep::Ignore | OrientationStep::Ready => {}
            OrientationStep::Engage => {
                tracing::debug!(surface = ?self.surface, "orientation engaged");
                self.orientation.reset_base_orientation();
            }
            OrientationStep::Release => {
                tracing::debug!(surface = ?self.surface, "orientation released");
                self.release_to_idle(true);
            }
            OrientationStep::Apply => {
                let targets = {
                    let mut inner = self.inner.borrow_mut();
                    inner.transition(ControlEvent::OrientationApplied);
                    inner.presentation.active = true;
                    inner.presentation.interacting = true;
                    let flip = inner.flip.reading().rotation;
                    with_flip(
                        orientation_targets(
                            &state.relative,
                            inner.profile(),
                            &inner.config.transitions,
                        ),
                        flip,
                    )
                };
                if !self.channels.apply(&targets) {
                    return Err(SubscriberError::new("orientation targets rejected"));
                }
            }
        }
        Ok(())
    }

    // =========================================================================
    // Showcase
    // =========================================================================

    /// Schedule a showcase attempt if the card is eligible and none is pending
    fn arm_showcase(&self, delay_ms: f64) {
        {
            let inner = self.inner.borrow();
            if !inner.showcase_eligible() || !matches!(inner.showcase, ShowcasePhase::Idle) {
                return;
            }
        }

        let weak = self.weak_self.clone();
        let task = self.tasks.schedule(delay_ms, move || {
            if let Some(controller) = weak.upgrade() {
                controller.try_start_showcase();
            }
        });
        self.inner.borrow_mut().showcase = ShowcasePhase::Waiting(task);
        tracing::trace!(surface = ?self.surface, delay_ms, "showcase armed");
    }

    fn try_start_showcase(&self) {
        let retry = {
            let mut inner = self.inner.borrow_mut();
            let waiting = std::mem::replace(&mut inner.showcase, ShowcasePhase::Idle);
            drop(waiting);

            if !inner.showcase_eligible() {
                return;
            }
            if !inner.state.allows_showcase() {
                Some(inner.config.showcase.retry_delay_ms)
            } else {
                None
            }
        };

        if let Some(delay) = retry {
            tracing::trace!(surface = ?self.surface, "showcase deferred");
            self.arm_showcase(delay);
            return;
        }

        let weak = self.weak_self.clone();
        let callback = self.scheduler.add_tick_callback(move |now_ms| {
            weak.upgrade()
                .is_some_and(|controller| controller.showcase_frame(now_ms))
        });
        let callback = match callback {
            Ok(id) => id,
            Err(err) => {
                tracing::warn!(error = %err, "showcase could not start");
                return;
            }
        };

        let mut inner = self.inner.borrow_mut();
        inner.transition(ControlEvent::ShowcaseStarted);
        inner.tracker.reset();
        inner.presentation = Presentation {
            active: true,
            interacting: true,
            showcase_active: true,
        };
        inner.showcase_has_run = true;
        inner.showcase = ShowcasePhase::Running {
            started_ms: self.tasks.now_ms(),
            callback,
        };
        tracing::debug!(surface = ?self.surface, "showcase started");
    }

    /// One showcase frame; returns `false` once the cycle is over
    fn showcase_frame(&self, now_ms: f64) -> bool {
        let (targets, complete) = {
            let mut inner = self.inner.borrow_mut();
            let ShowcasePhase::Running { started_ms, .. } = inner.showcase else {
                return false;
            };

            if inner.state != ControllerState::Showcase {
                // Preempted by pointer or orientation: no reset
                inner.showcase = ShowcasePhase::Idle;
                inner.presentation.showcase_active = false;
                tracing::debug!(surface = ?self.surface, "showcase preempted");
                return false;
            }

            let cycle_ms = inner.config.showcase.cycle_ms;
            let progress = ((now_ms - started_ms) / cycle_ms).clamp(0.0, 1.0) as f32;
            let targets = showcase_targets(progress, inner.profile());
            (targets, progress >= 1.0)
        };

        self.channels.apply(&targets);

        if complete {
            self.inner.borrow_mut().showcase = ShowcasePhase::Idle;
            tracing::debug!(surface = ?self.surface, "showcase complete");
            self.release_to_idle(false);
            return false;
        }
        true
    }

    /// Cancel a pending or running showcase
    ///
    /// A running cycle counts as run and the card is reset to rest.
    fn teardown_showcase(&self) {
        let phase = std::mem::replace(&mut self.inner.borrow_mut().showcase, ShowcasePhase::Idle);
        match phase {
            ShowcasePhase::Idle => {}
            ShowcasePhase::Waiting(task) => task.cancel(),
            ShowcasePhase::Running { callback, .. } => {
                self.scheduler.remove_tick_callback(callback);
                let in_showcase = {
                    let mut inner = self.inner.borrow_mut();
                    inner.presentation.showcase_active = false;
                    inner.state == ControllerState::Showcase
                };
                if in_showcase {
                    self.release_to_idle(false);
                }
            }
        }
    }

    // =========================================================================
    // Visibility and preferences
    // =========================================================================

    fn on_document_visibility(&self, visible: bool) {
        self.inner.borrow_mut().document_visible = visible;
        if visible {
            let delay = self.inner.borrow().config.showcase.initial_delay_ms;
            self.arm_showcase(delay);
        } else {
            self.teardown_showcase();
            self.release_to_idle(false);
        }
    }

    /// Follow the reduced-motion preference
    ///
    /// Turning it on cancels the showcase; turning it off re-arms it if it
    /// never ran.
    pub fn set_reduced_motion(&self, reduced: bool) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.reduced_motion == reduced {
                return;
            }
            inner.reduced_motion = reduced;
        }

        if reduced {
            self.teardown_showcase();
        } else {
            let delay = self.inner.borrow().config.showcase.initial_delay_ms;
            self.arm_showcase(delay);
        }
    }

    // =========================================================================
    // Scroll flip
    // =========================================================================

    fn on_wheel(&self, delta_y: f32) {
        let needs_callback = {
            let mut inner = self.inner.borrow_mut();
            if !inner.options.scroll_flip {
                return;
            }
            inner.flip.on_wheel(delta_y);
            inner.flip_callback.is_none()
        };
        if !needs_callback {
            return;
        }

        let weak = self.weak_self.clone();
        match self.scheduler.add_tick_callback(move |now_ms| {
            weak.upgrade()
                .is_some_and(|controller| controller.flip_frame(now_ms))
        }) {
            Ok(id) => self.inner.borrow_mut().flip_callback = Some(id),
            Err(err) => tracing::warn!(error = %err, "scroll flip unavailable"),
        }
    }

    fn flip_frame(&self, now_ms: f64) -> bool {
        let (changed, reading, soft, keep) = {
            let mut inner = self.inner.borrow_mut();
            let before = inner.flip.reading().rotation;
            inner.flip.on_frame(now_ms);
            let reading = inner.flip.reading();
            let keep = inner.flip.needs_frames();
            if !keep {
                inner.flip_callback = None;
            }
            (
                reading.rotation != before,
                reading,
                inner.config.transitions.pointer_rotate_delta_soft,
                keep,
            )
        };

        if changed {
            if let Err(err) = self.channels.rotate_delta.set_target(
                &ChannelValue::xy(reading.rotation, 0.0),
                Transition::Soft(soft),
            ) {
                tracing::warn!(error = %err, "flip target rejected");
            }
        }
        keep
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    /// Unmount the card
    ///
    /// Cancels timers, the showcase and the flip callback, unsubscribes from
    /// orientation and visibility, and stops every channel.
    pub fn unmount(&self) {
        let (release_task, showcase, flip_callback) = {
            let mut inner = self.inner.borrow_mut();
            if !inner.mounted {
                return;
            }
            inner.mounted = false;
            inner.state = ControllerState::Idle;
            inner.presentation = Presentation::default();
            (
                inner.release_task.take(),
                std::mem::replace(&mut inner.showcase, ShowcasePhase::Idle),
                inner.flip_callback.take(),
            )
        };

        drop(release_task);
        match showcase {
            ShowcasePhase::Running { callback, .. } => self.scheduler.remove_tick_callback(callback),
            ShowcasePhase::Waiting(task) => task.cancel(),
            ShowcasePhase::Idle => {}
        }
        if let Some(callback) = flip_callback {
            self.scheduler.remove_tick_callback(callback);
        }

        let subscriptions = std::mem::take(&mut *self.subscriptions.borrow_mut());
        drop(subscriptions);

        self.channels.stop_all();
        tracing::debug!(surface = ?self.surface, "card unmounted");
    }

    /// Unmount and stop routing events to this card
    pub fn unmount_from(&self, runtime: &CardRuntime) {
        self.unmount();
        runtime.unregister(self.surface);
    }
}

impl Drop for CardController {
    fn drop(&mut self) {
        self.unmount();
    }
}

/// Keep the rotate-delta x field on the flip rotation
fn with_flip(mut targets: CardTargets, flip_rotation: f32) -> CardTargets {
    if let Some(target) = targets.rotate_delta.as_mut() {
        target.value = ChannelValue::xy(flip_rotation, 0.0);
    }
    targets
}

impl std::fmt::Debug for CardController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardController")
            .field("surface", &self.surface)
            .field("state", &self.state())
            .field("presentation", &self.presentation())
            .finish()
    }
}
