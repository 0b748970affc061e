//! Host seams: frame clock and orientation sensor
//!
//! The animation engine never owns a thread or a timer. It asks the host
//! for frames and reads the host's monotonic clock; the host calls back
//! into the scheduler when a requested frame is due.

use crate::error::{PlatformError, Result};
use std::cell::Cell;

/// Monotonic clock plus a one-shot frame request
pub trait FrameHost {
    /// Monotonic time in milliseconds
    fn now_ms(&self) -> f64;

    /// Ask the host to deliver one `Event::Frame` as soon as possible
    ///
    /// Callers guarantee at most one outstanding request.
    fn request_frame(&self);

    /// Withdraw an outstanding frame request
    fn cancel_frame(&self) {}
}

/// Source of raw device-orientation samples
pub trait OrientationSensor {
    /// Whether the device can report orientation at all
    fn is_supported(&self) -> bool;

    /// Begin delivering samples
    fn start(&self) -> Result<()>;

    /// Stop delivering samples
    fn stop(&self);
}

// ============================================================================
// Manual host (tests and simulation)
// ============================================================================

/// A host whose clock only moves when told to
///
/// Frame requests are recorded and consumed with [`ManualHost::take_frame_request`].
#[derive(Debug, Default)]
pub struct ManualHost {
    now_ms: Cell<f64>,
    frame_requested: Cell<bool>,
    frame_requests: Cell<u64>,
}

impl ManualHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the clock at a given time
    pub fn starting_at(now_ms: f64) -> Self {
        let host = Self::default();
        host.now_ms.set(now_ms);
        host
    }

    /// Move the clock forward
    pub fn advance(&self, delta_ms: f64) {
        self.now_ms.set(self.now_ms.get() + delta_ms);
    }

    /// Set the clock to an absolute time (never moves backwards)
    pub fn set_now(&self, now_ms: f64) {
        if now_ms > self.now_ms.get() {
            self.now_ms.set(now_ms);
        }
    }

    /// Check and clear the outstanding frame request
    pub fn take_frame_request(&self) -> bool {
        self.frame_requested.replace(false)
    }

    /// Whether a frame request is outstanding
    pub fn frame_pending(&self) -> bool {
        self.frame_requested.get()
    }

    /// Total number of frame requests received
    pub fn frame_request_count(&self) -> u64 {
        self.frame_requests.get()
    }
}

impl FrameHost for ManualHost {
    fn now_ms(&self) -> f64 {
        self.now_ms.get()
    }

    fn request_frame(&self) {
        self.frame_requested.set(true);
        self.frame_requests.set(self.frame_requests.get() + 1);
    }

    fn cancel_frame(&self) {
        self.frame_requested.set(false);
    }
}

/// A sensor stub that records start/stop calls
#[derive(Debug)]
pub struct ManualSensor {
    supported: bool,
    listening: Cell<bool>,
    starts: Cell<u32>,
    stops: Cell<u32>,
}

impl ManualSensor {
    pub fn new(supported: bool) -> Self {
        Self {
            supported,
            listening: Cell::new(false),
            starts: Cell::new(0),
            stops: Cell::new(0),
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listening.get()
    }

    pub fn start_count(&self) -> u32 {
        self.starts.get()
    }

    pub fn stop_count(&self) -> u32 {
        self.stops.get()
    }
}

impl OrientationSensor for ManualSensor {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn start(&self) -> Result<()> {
        if !self.supported {
            return Err(PlatformError::SensorUnavailable(
                "deviceorientation".to_string(),
            ));
        }
        self.listening.set(true);
        self.starts.set(self.starts.get() + 1);
        Ok(())
    }

    fn stop(&self) {
        if self.listening.replace(false) {
            self.stops.set(self.stops.get() + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_host_frame_request() {
        let host = ManualHost::new();
        assert!(!host.take_frame_request());

        host.request_frame();
        assert!(host.frame_pending());
        assert!(host.take_frame_request());
        assert!(!host.take_frame_request());
        assert_eq!(host.frame_request_count(), 1);
    }

    #[test]
    fn test_manual_host_clock_is_monotonic() {
        let host = ManualHost::starting_at(100.0);
        host.advance(16.0);
        assert_eq!(host.now_ms(), 116.0);

        host.set_now(50.0);
        assert_eq!(host.now_ms(), 116.0);
    }

    #[test]
    fn test_unsupported_sensor_refuses_start() {
        let sensor = ManualSensor::new(false);
        assert!(sensor.start().is_err());
        assert!(!sensor.is_listening());
    }

    #[test]
    fn test_sensor_counts_stop_once() {
        let sensor = ManualSensor::new(true);
        sensor.start().unwrap();
        sensor.stop();
        sensor.stop();
        assert_eq!(sensor.start_count(), 1);
        assert_eq!(sensor.stop_count(), 1);
    }
}
