//! Animation scheduler
//!
//! One shared frame callback services every registered channel. Channels
//! are owned by the scheduler and addressed through [`ChannelId`]; the
//! usual entry point is the [`AnimatedChannel`] wrapper, which registers on
//! creation and deregisters on drop.
//!
//! The scheduler never runs on its own: it asks the [`FrameHost`] for a
//! frame whenever there is work and the page is visible, and the host
//! calls [`AnimationScheduler::tick`] when that frame is due. At most one
//! frame request is outstanding at any time, however many channels animate.
//!
//! Per tick:
//! - page hidden: pause every running channel and do not reschedule
//! - channel without pending work: pause and deregister
//! - channel gated invisible: pause and skip (state is kept)
//! - otherwise resume if paused, step, and deregister once settled

use crate::channel::{Channel, Transition};
use crate::error::{AnimationError, Result};
use crate::values::ChannelValue;
use holo_platform::FrameHost;
use indexmap::IndexMap;
use slotmap::{new_key_type, SlotMap};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

new_key_type! {
    /// Handle to a channel owned by the scheduler
    pub struct ChannelId;
    /// Handle to a registered tick callback
    pub struct TickCallbackId;
}

/// Per-frame callback; receives the frame time and returns `false` to unregister
pub type TickCallback = Rc<dyn Fn(f64) -> bool>;

/// Registration of one channel with pending work
#[derive(Clone, Copy, Debug, Default)]
struct SchedulerEntry {
    paused: bool,
}

/// Internal state of the animation scheduler
struct SchedulerInner {
    channels: SlotMap<ChannelId, Channel>,
    /// Channels with work, in registration order
    active: IndexMap<ChannelId, SchedulerEntry>,
    tick_callbacks: SlotMap<TickCallbackId, TickCallback>,
    page_visible: bool,
    frame_pending: bool,
    frames: u64,
    host: Rc<dyn FrameHost>,
}

impl SchedulerInner {
    fn has_work(&self) -> bool {
        !self.active.is_empty() || !self.tick_callbacks.is_empty()
    }

    /// Claim the single frame slot if a frame is needed
    ///
    /// Returns the host to call once the borrow is released.
    fn claim_frame(&mut self) -> Option<Rc<dyn FrameHost>> {
        if self.frame_pending || !self.page_visible || !self.has_work() {
            return None;
        }
        self.frame_pending = true;
        Some(Rc::clone(&self.host))
    }

    /// Give the frame slot back when nothing is left to do
    fn release_frame_if_idle(&mut self) -> Option<Rc<dyn FrameHost>> {
        if self.frame_pending && !self.has_work() {
            self.frame_pending = false;
            return Some(Rc::clone(&self.host));
        }
        None
    }

    fn pause_all(&mut self) {
        let SchedulerInner {
            channels, active, ..
        } = self;
        for (id, entry) in active.iter_mut() {
            if entry.paused {
                continue;
            }
            if let Some(channel) = channels.get_mut(*id) {
                channel.pause();
            }
            entry.paused = true;
        }
    }

    fn step_channels(&mut self, now_ms: f64) {
        let ids: Vec<ChannelId> = self.active.keys().copied().collect();
        let SchedulerInner {
            channels, active, ..
        } = self;

        for id in ids {
            let Some(channel) = channels.get_mut(id) else {
                active.shift_remove(&id);
                continue;
            };
            let Some(entry) = active.get_mut(&id) else {
                continue;
            };

            if !channel.has_pending_work() {
                channel.pause();
                active.shift_remove(&id);
                continue;
            }

            if channel.is_gated() {
                if !entry.paused {
                    channel.pause();
                    entry.paused = true;
                    tracing::trace!(channel = channel.name(), "channel gated, pausing");
                }
                continue;
            }

            if entry.paused {
                channel.resume();
                entry.paused = false;
            }

            if channel.step(now_ms) {
                active.shift_remove(&id);
            }
        }
    }
}

/// The animation scheduler that steps all active channels
///
/// Construct one per application and hand out [`SchedulerHandle`]s.
pub struct AnimationScheduler {
    inner: Rc<RefCell<SchedulerInner>>,
}

impl AnimationScheduler {
    pub fn new(host: Rc<dyn FrameHost>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(SchedulerInner {
                channels: SlotMap::with_key(),
                active: IndexMap::new(),
                tick_callbacks: SlotMap::with_key(),
                page_visible: true,
                frame_pending: false,
                frames: 0,
                host,
            })),
        }
    }

    /// Get a handle to this scheduler for passing to components
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// The shared frame callback
    ///
    /// Runs tick callbacks, then steps channels in registration order.
    /// Returns `true` if another frame was requested.
    pub fn tick(&self) -> bool {
        let (now_ms, callbacks) = {
            let mut inner = self.inner.borrow_mut();
            inner.frame_pending = false;
            let now_ms = inner.host.now_ms();

            if !inner.page_visible {
                inner.pause_all();
                return false;
            }
            inner.frames += 1;

            let callbacks: Vec<(TickCallbackId, TickCallback)> = inner
                .tick_callbacks
                .iter()
                .map(|(id, cb)| (id, Rc::clone(cb)))
                .collect();
            (now_ms, callbacks)
        };

        // Callbacks may retarget channels, so the borrow is released here
        let finished: Vec<TickCallbackId> = callbacks
            .into_iter()
            .filter_map(|(id, callback)| (!callback(now_ms)).then_some(id))
            .collect();

        let host = {
            let mut inner = self.inner.borrow_mut();
            for id in finished {
                inner.tick_callbacks.remove(id);
            }
            inner.step_channels(now_ms);
            tracing::trace!(
                active = inner.active.len(),
                callbacks = inner.tick_callbacks.len(),
                "scheduler tick"
            );
            inner.claim_frame()
        };

        match host {
            Some(host) => {
                host.request_frame();
                true
            }
            None => self.inner.borrow().frame_pending,
        }
    }

    /// Follow document visibility
    ///
    /// Hiding pauses every running channel and withdraws the frame request;
    /// showing requests a frame if any work remains.
    pub fn set_page_visible(&self, visible: bool) {
        let (claim, cancel) = {
            let mut inner = self.inner.borrow_mut();
            if inner.page_visible == visible {
                return;
            }
            inner.page_visible = visible;
            if visible {
                (inner.claim_frame(), None)
            } else {
                inner.pause_all();
                let cancel = inner.frame_pending.then(|| Rc::clone(&inner.host));
                inner.frame_pending = false;
                (None, cancel)
            }
        };

        tracing::debug!(visible, "scheduler page visibility");
        if let Some(host) = claim {
            host.request_frame();
        }
        if let Some(host) = cancel {
            host.cancel_frame();
        }
    }

    pub fn is_page_visible(&self) -> bool {
        self.inner.borrow().page_visible
    }

    /// Whether a frame request is outstanding
    pub fn is_frame_pending(&self) -> bool {
        self.inner.borrow().frame_pending
    }

    /// Check if any channel or callback still needs frames
    pub fn has_active_animations(&self) -> bool {
        self.inner.borrow().has_work()
    }

    /// Number of channels owned by the scheduler
    pub fn channel_count(&self) -> usize {
        self.inner.borrow().channels.len()
    }

    /// Number of channels currently registered for stepping
    pub fn active_count(&self) -> usize {
        self.inner.borrow().active.len()
    }

    /// Number of registered tick callbacks
    pub fn tick_callback_count(&self) -> usize {
        self.inner.borrow().tick_callbacks.len()
    }

    /// Number of frames serviced while visible
    pub fn frame_count(&self) -> u64 {
        self.inner.borrow().frames
    }
}

/// A weak handle to the animation scheduler
///
/// This is passed to components that own channels. It won't keep the
/// scheduler alive; operations after the scheduler is gone fail with
/// [`AnimationError::SchedulerUnavailable`].
#[derive(Clone)]
pub struct SchedulerHandle {
    inner: Weak<RefCell<SchedulerInner>>,
}

impl SchedulerHandle {
    fn upgrade(&self) -> Result<Rc<RefCell<SchedulerInner>>> {
        self.inner
            .upgrade()
            .ok_or(AnimationError::SchedulerUnavailable)
    }

    /// Check whether the scheduler is still alive
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    // =========================================================================
    // Channel Operations
    // =========================================================================

    /// Hand a channel to the scheduler (not yet registered for stepping)
    pub fn add_channel(&self, channel: Channel) -> Result<ChannelId> {
        let inner = self.upgrade()?;
        let id = inner.borrow_mut().channels.insert(channel);
        Ok(id)
    }

    /// Drop a channel entirely
    pub fn remove_channel(&self, id: ChannelId) -> Option<Channel> {
        let inner = self.inner.upgrade()?;
        let (channel, release) = {
            let mut inner = inner.borrow_mut();
            inner.active.shift_remove(&id);
            let channel = inner.channels.remove(id);
            (channel, inner.release_frame_if_idle())
        };
        if let Some(host) = release {
            host.cancel_frame();
        }
        channel
    }

    /// Read a channel
    pub fn with_channel<F, R>(&self, id: ChannelId, f: F) -> Result<R>
    where
        F: FnOnce(&Channel) -> R,
    {
        let inner = self.upgrade()?;
        let inner = inner.borrow();
        inner
            .channels
            .get(id)
            .map(f)
            .ok_or(AnimationError::ChannelNotFound)
    }

    /// Register a channel for stepping and make sure a frame is coming
    pub fn ensure(&self, id: ChannelId) -> Result<()> {
        let inner = self.upgrade()?;
        let host = {
            let mut inner = inner.borrow_mut();
            if !inner.channels.contains_key(id) {
                return Err(AnimationError::ChannelNotFound);
            }
            inner.active.entry(id).or_default();
            inner.claim_frame()
        };
        if let Some(host) = host {
            host.request_frame();
        }
        Ok(())
    }

    /// Deregister a channel from stepping; its values are kept
    pub fn remove(&self, id: ChannelId) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        let release = {
            let mut inner = inner.borrow_mut();
            inner.active.shift_remove(&id);
            inner.release_frame_if_idle()
        };
        if let Some(host) = release {
            host.cancel_frame();
        }
    }

    /// Whether a channel is registered for stepping
    pub fn is_registered(&self, id: ChannelId) -> bool {
        self.inner
            .upgrade()
            .is_some_and(|inner| inner.borrow().active.contains_key(&id))
    }

    /// Retarget a channel and register it for stepping
    pub fn set_target(
        &self,
        id: ChannelId,
        value: &ChannelValue,
        transition: Transition,
    ) -> Result<()> {
        {
            let inner = self.upgrade()?;
            let mut inner = inner.borrow_mut();
            let channel = inner
                .channels
                .get_mut(id)
                .ok_or(AnimationError::ChannelNotFound)?;
            channel.set_target(value, transition)?;
        }
        self.ensure(id)
    }

    /// Place a channel at rest on `value`, bypassing the frame loop
    pub fn jump(&self, id: ChannelId, value: &ChannelValue) -> Result<()> {
        {
            let inner = self.upgrade()?;
            let mut inner = inner.borrow_mut();
            let channel = inner
                .channels
                .get_mut(id)
                .ok_or(AnimationError::ChannelNotFound)?;
            channel.jump(value)?;
        }
        self.remove(id);
        Ok(())
    }

    /// Stop a channel where it is and deregister it
    pub fn stop(&self, id: ChannelId) {
        if let Some(inner) = self.inner.upgrade() {
            if let Some(channel) = inner.borrow_mut().channels.get_mut(id) {
                channel.stop();
            }
        }
        self.remove(id);
    }

    // =========================================================================
    // Tick Callbacks
    // =========================================================================

    /// Run `callback` on every frame until it returns `false`
    pub fn add_tick_callback<F>(&self, callback: F) -> Result<TickCallbackId>
    where
        F: Fn(f64) -> bool + 'static,
    {
        let inner = self.upgrade()?;
        let (id, host) = {
            let mut inner = inner.borrow_mut();
            let id = inner.tick_callbacks.insert(Rc::new(callback));
            (id, inner.claim_frame())
        };
        if let Some(host) = host {
            host.request_frame();
        }
        Ok(id)
    }

    pub fn remove_tick_callback(&self, id: TickCallbackId) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        let release = {
            let mut inner = inner.borrow_mut();
            inner.tick_callbacks.remove(id);
            inner.release_frame_if_idle()
        };
        if let Some(host) = release {
            host.cancel_frame();
        }
    }

    /// Current time on the host clock
    pub fn now_ms(&self) -> Option<f64> {
        self.inner.upgrade().map(|inner| inner.borrow().host.now_ms())
    }
}

// ============================================================================
// AnimatedChannel - channel wrapper with automatic registration
// ============================================================================

/// A channel registered with the scheduler
///
/// Dropping the wrapper removes the channel from the scheduler.
///
/// ```ignore
/// let rotate = AnimatedChannel::new(
///     handle,
///     Channel::builder("rotate", ChannelValue::xy(0.0, 0.0), SpringConfig::interactive())
///         .bind("x", "--rotate-x", Unit::Deg)
///         .bind("y", "--rotate-y", Unit::Deg)
///         .build(sink)?,
/// )?;
/// rotate.set_target(&ChannelValue::xy(12.0, -4.0), Transition::Hard)?;
/// ```
pub struct AnimatedChannel {
    handle: SchedulerHandle,
    id: ChannelId,
}

impl AnimatedChannel {
    pub fn new(handle: SchedulerHandle, channel: Channel) -> Result<Self> {
        let id = handle.add_channel(channel)?;
        Ok(Self { handle, id })
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn set_target(&self, value: &ChannelValue, transition: Transition) -> Result<()> {
        self.handle.set_target(self.id, value, transition)
    }

    pub fn jump(&self, value: &ChannelValue) -> Result<()> {
        self.handle.jump(self.id, value)
    }

    pub fn stop(&self) {
        self.handle.stop(self.id);
    }

    pub fn current(&self) -> Result<ChannelValue> {
        self.handle.with_channel(self.id, |c| c.current())
    }

    pub fn target(&self) -> Result<ChannelValue> {
        self.handle.with_channel(self.id, |c| c.target())
    }

    pub fn velocity(&self) -> Result<ChannelValue> {
        self.handle.with_channel(self.id, |c| c.velocity())
    }

    /// Whether the channel is registered and still moving
    pub fn is_animating(&self) -> bool {
        self.handle.is_registered(self.id)
    }
}

impl Drop for AnimatedChannel {
    fn drop(&mut self) {
        self.handle.remove_channel(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spring::SpringConfig;
    use crate::surface::{StyleSink, SurfaceStyle, Unit};
    use crate::visibility::VisibilityGate;
    use holo_platform::ManualHost;
    use std::cell::Cell;

    fn setup() -> (Rc<ManualHost>, AnimationScheduler) {
        let host = Rc::new(ManualHost::new());
        let scheduler = AnimationScheduler::new(host.clone());
        (host, scheduler)
    }

    fn rotate(handle: &SchedulerHandle, surface: &SurfaceStyle) -> AnimatedChannel {
        let sink: Rc<dyn StyleSink> = Rc::new(surface.clone());
        let channel =
            Channel::builder("rotate", ChannelValue::xy(0.0, 0.0), SpringConfig::interactive())
                .bind("x", "--rotate-x", Unit::Deg)
                .bind("y", "--rotate-y", Unit::Deg)
                .build(sink)
                .unwrap();
        AnimatedChannel::new(handle.clone(), channel).unwrap()
    }

    /// Deliver frames until the host stops asking, up to `limit`
    fn pump(host: &ManualHost, scheduler: &AnimationScheduler, limit: usize) -> usize {
        let mut frames = 0;
        while frames < limit && host.take_frame_request() {
            host.advance(16.0);
            scheduler.tick();
            frames += 1;
        }
        frames
    }

    #[test]
    fn test_channel_settles_and_is_removed() {
        let (host, scheduler) = setup();
        let surface = SurfaceStyle::new();
        let channel = rotate(&scheduler.handle(), &surface);

        channel
            .set_target(&ChannelValue::xy(10.0, -5.0), Transition::Hard)
            .unwrap();
        assert!(channel.is_animating());
        assert!(scheduler.is_frame_pending());

        let frames = pump(&host, &scheduler, 10_000);
        assert!(frames > 1);
        assert!(!channel.is_animating());
        assert!(!scheduler.is_frame_pending());
        assert_eq!(channel.current().unwrap(), ChannelValue::xy(10.0, -5.0));
        assert_eq!(surface.number("--rotate-x"), Some(10.0));
    }

    #[test]
    fn test_single_frame_request_for_many_channels() {
        let (host, scheduler) = setup();
        let surface = SurfaceStyle::new();
        let handle = scheduler.handle();
        let channels: Vec<_> = (0..8).map(|_| rotate(&handle, &surface)).collect();

        for channel in &channels {
            channel
                .set_target(&ChannelValue::xy(5.0, 5.0), Transition::Hard)
                .unwrap();
        }

        assert_eq!(host.frame_request_count(), 1);
        assert_eq!(scheduler.active_count(), 8);

        host.take_frame_request();
        host.advance(16.0);
        scheduler.tick();
        assert_eq!(host.frame_request_count(), 2);
    }

    #[test]
    fn test_jump_bypasses_scheduler() {
        let (host, scheduler) = setup();
        let surface = SurfaceStyle::new();
        let channel = rotate(&scheduler.handle(), &surface);

        channel
            .set_target(&ChannelValue::xy(30.0, 30.0), Transition::Hard)
            .unwrap();
        channel.jump(&ChannelValue::xy(3.0, 4.0)).unwrap();

        assert!(!channel.is_animating());
        assert_eq!(surface.number("--rotate-x"), Some(3.0));
        assert_eq!(surface.number("--rotate-y"), Some(4.0));
        assert!(!scheduler.is_frame_pending());

        // A stale frame does nothing
        host.advance(16.0);
        assert!(!scheduler.tick());
        assert_eq!(channel.current().unwrap(), ChannelValue::xy(3.0, 4.0));
    }

    #[test]
    fn test_stop_keeps_current_and_target() {
        let (host, scheduler) = setup();
        let surface = SurfaceStyle::new();
        let channel = rotate(&scheduler.handle(), &surface);

        channel
            .set_target(&ChannelValue::xy(20.0, 0.0), Transition::Hard)
            .unwrap();
        pump(&host, &scheduler, 3);
        let current = channel.current().unwrap();

        channel.stop();
        assert!(!channel.is_animating());
        assert_eq!(channel.current().unwrap(), current);
        assert_eq!(channel.target().unwrap(), ChannelValue::xy(20.0, 0.0));
    }

    #[test]
    fn test_hidden_page_pauses_and_resumes() {
        let (host, scheduler) = setup();
        let surface = SurfaceStyle::new();
        let channel = rotate(&scheduler.handle(), &surface);

        channel
            .set_target(&ChannelValue::xy(40.0, 40.0), Transition::Hard)
            .unwrap();
        pump(&host, &scheduler, 5);
        let before = channel.current().unwrap();

        scheduler.set_page_visible(false);
        assert!(!scheduler.is_frame_pending());
        assert!(!host.frame_pending());

        // Time passes while hidden; a stray frame does not step
        host.advance(5_000.0);
        assert!(!scheduler.tick());
        assert_eq!(channel.current().unwrap(), before);
        assert!(channel.is_animating());

        scheduler.set_page_visible(true);
        assert!(host.frame_pending());
        pump(&host, &scheduler, 10_000);
        assert_eq!(channel.current().unwrap(), ChannelValue::xy(40.0, 40.0));
    }

    #[test]
    fn test_resume_does_not_spike() {
        let (host, scheduler) = setup();
        let surface = SurfaceStyle::new();
        let channel = rotate(&scheduler.handle(), &surface);

        channel
            .set_target(&ChannelValue::xy(40.0, 0.0), Transition::Hard)
            .unwrap();
        pump(&host, &scheduler, 4);
        let before = channel.current().unwrap().get("x").unwrap();

        scheduler.set_page_visible(false);
        host.advance(60_000.0);
        scheduler.set_page_visible(true);
        host.take_frame_request();
        host.advance(16.0);
        scheduler.tick();

        // history was reset on pause: one step from rest moves k * delta
        let after = channel.current().unwrap().get("x").unwrap();
        let expected = before + SpringConfig::interactive().stiffness * (40.0 - before);
        assert!((after - expected).abs() < 1e-3);
    }

    #[test]
    fn test_gated_channel_keeps_state() {
        let (host, scheduler) = setup();
        let surface = SurfaceStyle::new();
        let gate = VisibilityGate::new(true);
        let sink: Rc<dyn StyleSink> = Rc::new(surface.clone());
        let channel = AnimatedChannel::new(
            scheduler.handle(),
            Channel::builder("bg", ChannelValue::xy(50.0, 50.0), SpringConfig::interactive())
                .bind("x", "--background-x", Unit::Percent)
                .bind("y", "--background-y", Unit::Percent)
                .gate(gate.clone())
                .build(sink)
                .unwrap(),
        )
        .unwrap();

        channel
            .set_target(&ChannelValue::xy(60.0, 40.0), Transition::Hard)
            .unwrap();
        pump(&host, &scheduler, 2);
        gate.set_visible(false);

        let before = channel.current().unwrap();
        pump(&host, &scheduler, 20);
        assert_eq!(channel.current().unwrap(), before);
        assert!(channel.is_animating());

        gate.set_visible(true);
        pump(&host, &scheduler, 10_000);
        assert_eq!(channel.current().unwrap(), ChannelValue::xy(60.0, 40.0));
    }

    #[test]
    fn test_tick_callbacks_run_until_false() {
        let (host, scheduler) = setup();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);

        scheduler
            .handle()
            .add_tick_callback(move |_| {
                counter.set(counter.get() + 1);
                counter.get() < 3
            })
            .unwrap();

        pump(&host, &scheduler, 100);
        assert_eq!(calls.get(), 3);
        assert_eq!(scheduler.tick_callback_count(), 0);
        assert!(!scheduler.is_frame_pending());
    }

    #[test]
    fn test_callback_retargets_during_tick() {
        let (host, scheduler) = setup();
        let surface = SurfaceStyle::new();
        let channel = Rc::new(rotate(&scheduler.handle(), &surface));
        let driven = Rc::clone(&channel);

        scheduler
            .handle()
            .add_tick_callback(move |now| {
                driven
                    .set_target(&ChannelValue::xy(now as f32, 0.0), Transition::Hard)
                    .is_ok()
                    && now < 64.0
            })
            .unwrap();

        pump(&host, &scheduler, 3);
        assert_eq!(host.frame_request_count(), 4);
        assert_eq!(channel.target().unwrap(), ChannelValue::xy(48.0, 0.0));
    }

    #[test]
    fn test_drop_removes_channel() {
        let (_host, scheduler) = setup();
        let surface = SurfaceStyle::new();
        {
            let channel = rotate(&scheduler.handle(), &surface);
            channel
                .set_target(&ChannelValue::xy(1.0, 1.0), Transition::Hard)
                .unwrap();
            assert_eq!(scheduler.channel_count(), 1);
        }
        assert_eq!(scheduler.channel_count(), 0);
        assert_eq!(scheduler.active_count(), 0);
        assert!(!scheduler.is_frame_pending());
    }

    #[test]
    fn test_handle_weak_reference() {
        let handle = {
            let (_host, scheduler) = setup();
            scheduler.handle()
        };
        assert!(!handle.is_alive());

        let surface = SurfaceStyle::new();
        let sink: Rc<dyn StyleSink> = Rc::new(surface);
        let channel = Channel::builder("s", ChannelValue::scalar(1.0), SpringConfig::popover())
            .bind_scalar("--card-scale", Unit::None)
            .build(sink)
            .unwrap();
        assert_eq!(
            handle.add_channel(channel).unwrap_err(),
            AnimationError::SchedulerUnavailable
        );
    }

    #[test]
    fn test_rejected_target_does_not_register() {
        let (host, scheduler) = setup();
        let surface = SurfaceStyle::new();
        let channel = rotate(&scheduler.handle(), &surface);

        assert!(channel
            .set_target(&ChannelValue::scalar(1.0), Transition::Hard)
            .is_err());
        assert!(!channel.is_animating());
        assert!(!host.frame_pending());
    }
}
