//! Frame clock: delta time, elapsed time and measured frame rate

use cadence_core::ClockConfig;
use std::time::{Duration, Instant};

/// Frame rate reported until the first counting window closes
const INITIAL_FRAME_RATE: u32 = 60;

/// Tracks per-frame timing for the runtime.
///
/// The clock is sampled once per frame by [`FrameClock::tick`]; everything
/// else reads the values captured by that sample, so all components see the
/// same time within one frame.
pub struct FrameClock {
    /// Instant the clock was created
    start: Instant,
    /// Instant of the last tick
    last_instant: Instant,
    /// Time between the last two ticks in seconds
    delta_time: f32,
    /// Time from start to the last tick
    elapsed: Duration,
    /// Clamp for delta_time, 0 disables
    max_delta: f32,
    /// Width of the frame-rate counting window
    window: Duration,
    window_start: Instant,
    frames_in_window: u32,
    frame_rate: u32,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(&ClockConfig::default())
    }
}

impl FrameClock {
    pub fn new(config: &ClockConfig) -> Self {
        Self::starting_at(Instant::now(), config)
    }

    /// Create a clock whose start time is `start`
    pub fn starting_at(start: Instant, config: &ClockConfig) -> Self {
        Self {
            start,
            last_instant: start,
            delta_time: 0.0,
            elapsed: Duration::ZERO,
            max_delta: config.max_delta_seconds,
            window: Duration::from_millis(config.frame_rate_window_ms),
            window_start: start,
            frames_in_window: 0,
            frame_rate: INITIAL_FRAME_RATE,
        }
    }

    /// Advance the clock. Call once per frame, before anything reads it.
    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    /// Advance the clock to a caller-supplied instant.
    ///
    /// Instants earlier than the previous tick produce a zero delta.
    pub fn tick_at(&mut self, now: Instant) {
        let mut delta = now.saturating_duration_since(self.last_instant).as_secs_f32();
        if self.max_delta > 0.0 {
            delta = delta.min(self.max_delta);
        }
        self.delta_time = delta;
        if now > self.last_instant {
            self.last_instant = now;
        }
        self.elapsed = self.last_instant.duration_since(self.start);

        if self.last_instant.duration_since(self.window_start) > self.window {
            self.frame_rate = self.frames_in_window;
            self.frames_in_window = 0;
            self.window_start = self.last_instant;
        }
        self.frames_in_window += 1;
    }

    /// Seconds between the last two ticks
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Ticks counted in the last closed window
    pub fn frame_rate(&self) -> u32 {
        self.frame_rate
    }

    /// Time from clock start to the last tick
    pub fn now(&self) -> Duration {
        self.elapsed
    }

    /// [`FrameClock::now`] in whole milliseconds
    pub fn elapsed_millis(&self) -> u64 {
        self.elapsed.as_millis() as u64
    }

    pub fn start(&self) -> Instant {
        self.start
    }
}
