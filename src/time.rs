//! Frame timing.
//!
//! [`FrameClock`] is the single source of elapsed time for the scene. Live
//! runs call [`FrameClock::update`] once per redraw; tests and benchmarks
//! step it with [`FrameClock::advance`] for deterministic results. One frame
//! never advances by more than [`MAX_FRAME_DELTA`].
//!
//! ```ignore
//! let mut clock = FrameClock::new();
//! clock.advance(1.0 / 60.0);
//! assert_eq!(clock.frame(), 1);
//! ```

use std::time::{Duration, Instant};

use crate::pool::FrameContext;

/// Longest step one frame may take, in seconds.
pub const MAX_FRAME_DELTA: f32 = 0.1;

/// Elapsed time, delta and frame counting.
#[derive(Debug)]
pub struct FrameClock {
    last_frame: Instant,
    elapsed_secs: f32,
    delta_secs: f32,
    frame_count: u64,
    fps: f32,
    fps_frame_count: u64,
    fps_update_time: Instant,
    fps_update_interval: Duration,
}

impl FrameClock {
    /// Create a clock starting from now.
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            last_frame: now,
            elapsed_secs: 0.0,
            delta_secs: 0.0,
            frame_count: 0,
            fps: 0.0,
            fps_frame_count: 0,
            fps_update_time: now,
            fps_update_interval: Duration::from_millis(500),
        }
    }

    /// Sample wall time and advance. Call once per frame.
    pub fn update(&mut self) -> FrameContext {
        let now = Instant::now();
        let raw_delta = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        self.step(raw_delta);

        let since = now.duration_since(self.fps_update_time);
        if since >= self.fps_update_interval {
            let frames = self.frame_count - self.fps_frame_count;
            self.fps = frames as f32 / since.as_secs_f32();
            self.fps_frame_count = self.frame_count;
            self.fps_update_time = now;
        }

        self.context()
    }

    /// Advance by exactly `delta` seconds without looking at wall time.
    pub fn advance(&mut self, delta: f32) -> FrameContext {
        self.step(delta);
        self.context()
    }

    fn step(&mut self, delta: f32) {
        self.delta_secs = delta.clamp(0.0, MAX_FRAME_DELTA);
        self.elapsed_secs += self.delta_secs;
        self.frame_count += 1;
    }

    /// Values for the current frame.
    pub fn context(&self) -> FrameContext {
        FrameContext {
            time: self.elapsed_secs,
            delta: self.delta_secs,
            frame: self.frame_count,
        }
    }

    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.elapsed_secs
    }

    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta_secs
    }

    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    /// Frames per second, refreshed every 500 ms.
    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
