//! Device orientation source
//!
//! One publisher per runtime, shared by every card. The underlying sensor
//! is started when the first subscriber arrives and stopped when the last
//! one leaves. New subscribers receive the last known state synchronously
//! so they never wait for the next hardware sample.
//!
//! Readings are reported relative to a base orientation captured from the
//! first sample after construction or after
//! [`OrientationSource::reset_base_orientation`].

use crate::error::SubscriberError;
use holo_platform::{FrameHost, OrientationSample, OrientationSensor};
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use serde::Serialize;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Euler angles in degrees
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct OrientationAngles {
    pub alpha: f32,
    pub beta: f32,
    pub gamma: f32,
}

impl OrientationAngles {
    pub fn new(alpha: f32, beta: f32, gamma: f32) -> Self {
        Self { alpha, beta, gamma }
    }

    /// Missing axes read as zero
    pub fn from_sample(sample: &OrientationSample) -> Self {
        Self {
            alpha: sample.alpha.unwrap_or(0.0),
            beta: sample.beta.unwrap_or(0.0),
            gamma: sample.gamma.unwrap_or(0.0),
        }
    }

    /// Tilt magnitude used for engagement: `|gamma| + |beta|`
    pub fn tilt_magnitude(&self) -> f32 {
        self.gamma.abs() + self.beta.abs()
    }

    fn minus(&self, base: &OrientationAngles) -> Self {
        Self {
            alpha: self.alpha - base.alpha,
            beta: self.beta - base.beta,
            gamma: self.gamma - base.gamma,
        }
    }
}

/// What subscribers receive
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct OrientationState {
    pub supported: bool,
    pub absolute: OrientationAngles,
    pub relative: OrientationAngles,
    pub timestamp_ms: f64,
}

/// Subscriber callback; an `Err` is logged and delivery continues
pub type OrientationCallback =
    Rc<RefCell<dyn FnMut(&OrientationState) -> Result<(), SubscriberError>>>;

struct SourceInner {
    sensor: Rc<dyn OrientationSensor>,
    host: Rc<dyn FrameHost>,
    subscribers: IndexMap<u64, OrientationCallback, FxBuildHasher>,
    next_id: u64,
    listening: bool,
    first_reading: bool,
    base: OrientationAngles,
    state: OrientationState,
}

/// Shared device-orientation publisher
///
/// Cloning yields another handle to the same publisher.
#[derive(Clone)]
pub struct OrientationSource {
    inner: Rc<RefCell<SourceInner>>,
}

impl OrientationSource {
    pub fn new(sensor: Rc<dyn OrientationSensor>, host: Rc<dyn FrameHost>) -> Self {
        let supported = sensor.is_supported();
        let timestamp_ms = host.now_ms();
        Self {
            inner: Rc::new(RefCell::new(SourceInner {
                sensor,
                host,
                subscribers: IndexMap::default(),
                next_id: 0,
                listening: false,
                first_reading: true,
                base: OrientationAngles::default(),
                state: OrientationState {
                    supported,
                    absolute: OrientationAngles::default(),
                    relative: OrientationAngles::default(),
                    timestamp_ms,
                },
            })),
        }
    }

    /// Register a subscriber
    ///
    /// The current state is delivered before this returns; the sensor is
    /// started if this is the first subscriber.
    pub fn subscribe<F>(&self, callback: F) -> OrientationSubscription
    where
        F: FnMut(&OrientationState) -> Result<(), SubscriberError> + 'static,
    {
        let callback: OrientationCallback = Rc::new(RefCell::new(callback));
        let (id, state) = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.subscribers.insert(id, Rc::clone(&callback));
            (id, inner.state)
        };

        deliver(&callback, &state);
        self.start_listening();

        OrientationSubscription {
            source: Rc::downgrade(&self.inner),
            id: Some(id),
        }
    }

    fn start_listening(&self) {
        let sensor = {
            let inner = self.inner.borrow();
            if inner.listening || !inner.state.supported || inner.subscribers.is_empty() {
                return;
            }
            Rc::clone(&inner.sensor)
        };

        match sensor.start() {
            Ok(()) => {
                self.inner.borrow_mut().listening = true;
                tracing::debug!("orientation sensor started");
            }
            Err(err) => {
                tracing::warn!(error = %err, "orientation sensor unavailable");
                let state = {
                    let mut inner = self.inner.borrow_mut();
                    inner.state.supported = false;
                    inner.state
                };
                self.notify(&state);
            }
        }
    }

    /// Feed one hardware sample; ignored while nobody listens
    pub fn handle_sample(&self, sample: &OrientationSample) {
        let state = {
            let mut inner = self.inner.borrow_mut();
            if !inner.listening {
                return;
            }

            let absolute = OrientationAngles::from_sample(sample);
            if inner.first_reading {
                inner.first_reading = false;
                inner.base = absolute;
            }
            let relative = absolute.minus(&inner.base);
            let timestamp_ms = inner.host.now_ms();

            inner.state = OrientationState {
                supported: inner.state.supported,
                absolute,
                relative,
                timestamp_ms,
            };
            inner.state
        };

        self.notify(&state);
    }

    fn notify(&self, state: &OrientationState) {
        let subscribers: Vec<OrientationCallback> =
            self.inner.borrow().subscribers.values().cloned().collect();
        for callback in subscribers {
            deliver(&callback, state);
        }
    }

    /// Make the next sample the new zero reference
    pub fn reset_base_orientation(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.first_reading = true;
        inner.base = OrientationAngles::default();
    }

    /// Last published state
    pub fn state(&self) -> OrientationState {
        self.inner.borrow().state
    }

    pub fn is_supported(&self) -> bool {
        self.inner.borrow().state.supported
    }

    pub fn is_listening(&self) -> bool {
        self.inner.borrow().listening
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }
}

fn deliver(callback: &OrientationCallback, state: &OrientationState) {
    // A subscriber already running further up the stack is skipped
    let Ok(mut callback) = callback.try_borrow_mut() else {
        tracing::trace!("orientation subscriber busy, skipping re-entrant delivery");
        return;
    };
    if let Err(err) = (&mut *callback)(state) {
        tracing::error!(error = %err, "orientation subscriber error");
    }
}

/// Subscription handle; dropping it unsubscribes
pub struct OrientationSubscription {
    source: Weak<RefCell<SourceInner>>,
    id: Option<u64>,
}

impl OrientationSubscription {
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        let (Some(id), Some(inner)) = (self.id.take(), self.source.upgrade()) else {
            return;
        };

        let (sensor, removed) = {
            let mut inner = inner.borrow_mut();
            let removed = inner.subscribers.shift_remove(&id);
            let sensor = (inner.subscribers.is_empty() && inner.listening).then(|| {
                inner.listening = false;
                Rc::clone(&inner.sensor)
            });
            (sensor, removed)
        };
        drop(removed);

        if let Some(sensor) = sensor {
            sensor.stop();
            tracing::debug!("orientation sensor stopped");
        }
    }
}

impl Drop for OrientationSubscription {
    fn drop(&mut self) {
        self.release();
    }
}
