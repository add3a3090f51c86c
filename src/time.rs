//! Frame pacing and timing statistics.
//!
//! [`TickClock`] decides when the next tick is due and how long it should
//! integrate for. [`FrameStats`] accumulates per-phase durations and yields
//! an averaged [`FrameReport`] once per reporting window.
//!
//! # Example
//!
//! ```ignore
//! use pullsim::time::{FrameStats, TickClock};
//! use std::time::Instant;
//!
//! let mut clock = TickClock::new(120.0);
//! let mut stats = FrameStats::new(120);
//!
//! // In the frame loop:
//! if let Some(dt) = clock.poll(Instant::now()) {
//!     // tick(dt), render()...
//!     if let Some(report) = stats.record(tick_time, render_time) {
//!         log::info!("{report}");
//!     }
//! }
//! ```

use std::fmt;
use std::time::{Duration, Instant};

/// Fixed-cadence tick scheduler.
#[derive(Debug, Clone)]
pub struct TickClock {
    /// Minimum time between ticks.
    interval: Duration,
    /// When the last tick fired.
    last_tick: Instant,
    /// Ticks fired so far.
    frame_count: u64,
    /// Fixed delta time reported instead of the measured one.
    fixed_delta: Option<f32>,
}

impl TickClock {
    /// Create a clock targeting `fps` ticks per second, starting now.
    pub fn new(fps: f64) -> Self {
        Self::starting_at(fps, Instant::now())
    }

    /// Create a clock whose first interval is measured from `start`.
    pub fn starting_at(fps: f64, start: Instant) -> Self {
        Self {
            interval: Duration::from_secs_f64(1.0 / fps),
            last_tick: start,
            frame_count: 0,
            fixed_delta: None,
        }
    }

    /// Report `delta` seconds for every tick, whatever the wall clock says.
    pub fn with_fixed_delta(mut self, delta: f32) -> Self {
        self.fixed_delta = Some(delta);
        self
    }

    /// Ticks fired so far.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    /// If a tick is due at `now`, consume it and return its delta time in
    /// seconds (the full elapsed time since the previous tick).
    pub fn poll(&mut self, now: Instant) -> Option<f32> {
        let elapsed = now.saturating_duration_since(self.last_tick);
        if elapsed < self.interval {
            return None;
        }
        self.last_tick = now;
        self.frame_count += 1;
        Some(self.fixed_delta.unwrap_or(elapsed.as_secs_f32()))
    }

    /// Time left until the next tick is due.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.interval
            .saturating_sub(now.saturating_duration_since(self.last_tick))
    }
}

/// Averages over one reporting window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    /// Frames counted since the clock started.
    pub frame: u64,
    pub tick_ms: f64,
    pub render_ms: f64,
    pub total_ms: f64,
    /// Frames per second over the window's wall time, if measured.
    pub fps: Option<f64>,
}

impl fmt::Display for FrameReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "frame {}: tick {:.3} ms, render {:.3} ms, total {:.3} ms",
            self.frame, self.tick_ms, self.render_ms, self.total_ms
        )?;
        if let Some(fps) = self.fps {
            write!(f, ", {fps:.1} fps")?;
        }
        Ok(())
    }
}

/// Rolling tick/render timing accumulator.
#[derive(Debug, Clone)]
pub struct FrameStats {
    report_every: u64,
    frames: u64,
    window_frames: u64,
    tick_total: Duration,
    render_total: Duration,
    window_start: Option<Instant>,
}

impl FrameStats {
    /// Report once every `report_every` frames (at least 1).
    pub fn new(report_every: u64) -> Self {
        Self {
            report_every: report_every.max(1),
            frames: 0,
            window_frames: 0,
            tick_total: Duration::ZERO,
            render_total: Duration::ZERO,
            window_start: None,
        }
    }

    /// Frames recorded so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Record one frame; returns a report when a window completes.
    pub fn record(&mut self, tick: Duration, render: Duration) -> Option<FrameReport> {
        self.record_at(tick, render, Instant::now())
    }

    /// [`Self::record`] with an explicit timestamp for the end of the frame.
    pub fn record_at(
        &mut self,
        tick: Duration,
        render: Duration,
        now: Instant,
    ) -> Option<FrameReport> {
        let window_start = *self.window_start.get_or_insert(now);
        self.frames += 1;
        self.window_frames += 1;
        self.tick_total += tick;
        self.render_total += render;

        if self.frames % self.report_every != 0 {
            return None;
        }

        let n = self.window_frames as f64;
        let tick_ms = self.tick_total.as_secs_f64() * 1000.0 / n;
        let render_ms = self.render_total.as_secs_f64() * 1000.0 / n;
        let wall = now.saturating_duration_since(window_start).as_secs_f64();
        let fps = (wall > 0.0 && self.window_frames > 1)
            .then(|| (self.window_frames - 1) as f64 / wall);

        self.window_frames = 0;
        self.tick_total = Duration::ZERO;
        self.render_total = Duration::ZERO;
        self.window_start = None;

        Some(FrameReport {
            frame: self.frames,
            tick_ms,
            render_ms,
            total_ms: tick_ms + render_ms,
            fps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_waits_for_interval() {
        let start = Instant::now();
        let mut clock = TickClock::starting_at(100.0, start);
        assert_eq!(clock.poll(start + Duration::from_millis(5)), None);
        assert_eq!(clock.frame(), 0);

        let dt = clock.poll(start + Duration::from_millis(12)).unwrap();
        assert!((dt - 0.012).abs() < 1e-6);
        assert_eq!(clock.frame(), 1);

        // next interval is measured from the tick that just fired
        assert_eq!(clock.poll(start + Duration::from_millis(15)), None);
        assert!(clock.poll(start + Duration::from_millis(22)).is_some());
    }

    #[test]
    fn test_remaining() {
        let start = Instant::now();
        let clock = TickClock::starting_at(100.0, start);
        assert_eq!(
            clock.remaining(start + Duration::from_millis(4)),
            Duration::from_millis(6)
        );
        assert_eq!(
            clock.remaining(start + Duration::from_millis(40)),
            Duration::ZERO
        );
    }

    #[test]
    fn test_fixed_delta() {
        let start = Instant::now();
        let mut clock = TickClock::starting_at(60.0, start).with_fixed_delta(0.016);
        let dt = clock.poll(start + Duration::from_millis(100)).unwrap();
        assert_eq!(dt, 0.016);
    }

    #[test]
    fn test_stats_report_window() {
        let mut stats = FrameStats::new(3);
        let start = Instant::now();
        let ms = Duration::from_millis;
        assert!(stats.record_at(ms(2), ms(4), start).is_none());
        assert!(stats.record_at(ms(4), ms(4), start + ms(10)).is_none());
        let report = stats.record_at(ms(6), ms(4), start + ms(20)).unwrap();

        assert_eq!(report.frame, 3);
        assert!((report.tick_ms - 4.0).abs() < 1e-9);
        assert!((report.render_ms - 4.0).abs() < 1e-9);
        assert!((report.total_ms - 8.0).abs() < 1e-9);
        assert!((report.fps.unwrap() - 100.0).abs() < 1e-6);

        // window restarts
        assert!(stats.record_at(ms(1), ms(1), start + ms(30)).is_none());
        assert_eq!(stats.frames(), 4);
    }

    #[test]
    fn test_report_display() {
        let report = FrameReport {
            frame: 120,
            tick_ms: 1.5,
            render_ms: 2.25,
            total_ms: 3.75,
            fps: None,
        };
        assert_eq!(
            report.to_string(),
            "frame 120: tick 1.500 ms, render 2.250 ms, total 3.750 ms"
        );
    }
}
