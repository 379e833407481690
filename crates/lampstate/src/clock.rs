use std::time::Instant;

/// One full rotation of the lamp takes this many milliseconds.
pub const ROTATION_PERIOD_MS: u64 = 10_000;

/// Maps absolute wall-clock time onto the rotation angle.
///
/// The angle is always derived from the absolute timestamp, never from summed
/// frame deltas, so long sessions do not drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationClock {
    period_ms: u64,
}

impl AnimationClock {
    pub fn new() -> Self {
        Self::with_period(ROTATION_PERIOD_MS)
    }

    pub fn with_period(period_ms: u64) -> Self {
        Self {
            period_ms: period_ms.max(1),
        }
    }

    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }

    /// Rotation in degrees, in `[0, 360)`.
    pub fn angle_at(&self, now_ms: u64) -> f32 {
        let phase = now_ms % self.period_ms;
        (360.0 / self.period_ms as f32) * phase as f32
    }
}

impl Default for AnimationClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of the clock handed to a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSample {
    /// Milliseconds on the source's monotonic timeline.
    pub millis: u64,
    /// Monotonic frame counter for the running session.
    pub frame_index: u64,
}

impl TimeSample {
    pub fn new(millis: u64, frame_index: u64) -> Self {
        Self {
            millis,
            frame_index,
        }
    }
}

/// Abstraction over where frame timestamps originate from.
pub trait TimeSource: Send {
    /// Restarts the frame counter. Wall-clock sources keep their origin.
    fn reset(&mut self);
    /// Produces a time sample for the next frame.
    fn sample(&mut self) -> TimeSample;
}

/// Uptime-style clock: milliseconds since the source was created.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
    frame: u64,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
            frame: 0,
        }
    }
}

impl TimeSource for SystemTimeSource {
    fn reset(&mut self) {
        self.frame = 0;
    }

    fn sample(&mut self) -> TimeSample {
        let sample = TimeSample::new(self.now_ms(), self.frame);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

/// Time source that always reports a fixed timestamp.
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeSource {
    millis: u64,
    frame: u64,
}

impl FixedTimeSource {
    pub fn new(millis: u64) -> Self {
        Self { millis, frame: 0 }
    }

    pub fn set(&mut self, millis: u64) {
        self.millis = millis;
    }
}

impl TimeSource for FixedTimeSource {
    fn reset(&mut self) {
        self.frame = 0;
    }

    fn sample(&mut self) -> TimeSample {
        let sample = TimeSample::new(self.millis, self.frame);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}
