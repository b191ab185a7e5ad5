//! Constant-rate pacing clock
//!
//! Reconciles elapsed wall-clock time against the nominal playback time of
//! the audio emitted so far, sleeping whenever the producer runs ahead. The
//! time spent working between two syncs is kept as the busy time, which
//! feeds the endpoint's processing delay.

use std::thread;
use std::time::{Duration, Instant};

/// Pacing clock for a stream of `rate` samples per second
#[derive(Debug, Clone)]
pub struct PacingClock {
    rate: u32,
    /// Reference point of the current run
    ts0: Instant,
    /// Instant the previous sync returned
    ts: Instant,
    /// Samples accounted for since `ts0`
    frames: u64,
    busy: Duration,
    idle: Duration,
}

impl PacingClock {
    pub fn new(rate: u32) -> Self {
        let now = Instant::now();
        Self {
            rate,
            ts0: now,
            ts: now,
            frames: 0,
            busy: Duration::ZERO,
            idle: Duration::ZERO,
        }
    }

    /// Restart the reference point, forgetting all accounted samples
    ///
    /// Must be called after the stream was paused or resynchronized,
    /// otherwise the clock would let the producer burst to catch up.
    pub fn reset(&mut self) {
        let now = Instant::now();
        self.ts0 = now;
        self.ts = now;
        self.frames = 0;
    }

    /// Account for `frames` more emitted samples and sleep until the wall
    /// clock catches up with their nominal duration
    ///
    /// Returns true if the call slept.
    pub fn sync(&mut self, frames: u64) -> bool {
        self.frames += frames;

        let now = Instant::now();
        self.busy = now.saturating_duration_since(self.ts);

        let nominal = self.nominal_duration();
        let elapsed = now.saturating_duration_since(self.ts0);

        let slept = match nominal.checked_sub(elapsed) {
            Some(ahead) if !ahead.is_zero() => {
                thread::sleep(ahead);
                self.idle = ahead;
                true
            }
            _ => {
                self.idle = Duration::ZERO;
                false
            }
        };

        self.ts = Instant::now();
        slept
    }

    /// Nominal playback time of every sample accounted since the reset
    pub fn nominal_duration(&self) -> Duration {
        let rate = u64::from(self.rate.max(1));
        let secs = self.frames / rate;
        let rem = self.frames % rate;
        Duration::from_secs(secs) + Duration::from_nanos(rem * 1_000_000_000 / rate)
    }

    /// Samples accounted since the last reset
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn rate(&self) -> u32 {
        self.rate
    }

    /// Time spent between the previous two syncs
    pub fn busy(&self) -> Duration {
        self.busy
    }

    /// Busy time in microseconds
    pub fn busy_usec(&self) -> u64 {
        self.busy.as_micros() as u64
    }

    /// Time slept by the last sync
    pub fn idle(&self) -> Duration {
        self.idle
    }
}
