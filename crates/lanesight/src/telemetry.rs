//! Per-frame telemetry, the snapshot hub readers poll, and the frame-rate
//! meter.

use lanesight_lane::Direction;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Record emitted once per processed frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameTelemetry {
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
    /// Illuminance reading in lux.
    pub illuminance: f64,
    /// Mean gray level of the incoming frame.
    pub brightness: f64,
    pub gamma: f64,
    #[serde(rename = "offsetPx")]
    pub offset_px: i32,
    pub direction: Direction,
    pub fps: f64,
}

impl FrameTelemetry {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

pub(crate) fn unix_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// A published record with its sequence number.
#[derive(Clone, Debug)]
pub struct TelemetrySnapshot {
    pub seq: u64,
    pub telemetry: Arc<FrameTelemetry>,
}

#[derive(Debug, Default)]
struct HubSlot {
    seq: u64,
    latest: Option<Arc<FrameTelemetry>>,
}

/// Latest-value telemetry exchange: one writer publishes an immutable record
/// per frame, any number of readers take the most recent one. The lock is held
/// only to swap or clone an `Arc`.
#[derive(Clone, Debug, Default)]
pub struct TelemetryHub {
    slot: Arc<Mutex<HubSlot>>,
}

impl TelemetryHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a record and return its sequence number (starting at 1).
    pub fn publish(&self, telemetry: FrameTelemetry) -> u64 {
        let record = Arc::new(telemetry);
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.seq += 1;
        slot.latest = Some(record);
        slot.seq
    }

    pub fn latest(&self) -> Option<TelemetrySnapshot> {
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.latest.as_ref().map(|t| TelemetrySnapshot {
            seq: slot.seq,
            telemetry: Arc::clone(t),
        })
    }

    /// Number of records published so far.
    pub fn published(&self) -> u64 {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .seq
    }
}

/// Frames averaged per FPS update.
pub const FPS_WINDOW: u32 = 30;

/// Windowed frame-rate meter. The value is refreshed every `window` frames
/// and held in between; it is 0 until the first window completes.
#[derive(Clone, Debug)]
pub struct FpsMeter {
    window: u32,
    count: u32,
    window_start: Option<Instant>,
    fps: f64,
}

impl Default for FpsMeter {
    fn default() -> Self {
        Self::new(FPS_WINDOW)
    }
}

impl FpsMeter {
    pub fn new(window: u32) -> Self {
        Self {
            window: window.max(1),
            count: 0,
            window_start: None,
            fps: 0.0,
        }
    }

    /// Record a frame finished at `now` and return the current rate.
    pub fn tick(&mut self, now: Instant) -> f64 {
        let start = *self.window_start.get_or_insert(now);
        self.count += 1;
        if self.count >= self.window {
            let elapsed = now.saturating_duration_since(start);
            if elapsed > Duration::ZERO {
                self.fps = self.count as f64 / elapsed.as_secs_f64();
            }
            self.count = 0;
            self.window_start = Some(now);
        }
        self.fps
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }
}
