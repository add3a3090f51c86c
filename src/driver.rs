//! Fixed-cadence frame loop and display surfaces.
//!
//! The [`FrameDriver`] moves through `Idle -> Running -> Stopped`. While
//! running it polls a [`TickClock`]; when a tick is due it consumes input,
//! applies pending requests, integrates, rasterizes and presents, otherwise
//! it waits up to a millisecond on its control channel.
//!
//! A [`DriverHandle`] stops the loop at the next tick boundary. If every
//! handle is dropped while the loop is waiting, the wait is treated as
//! interrupted and the loop stops with [`DriverError::Interrupted`]; there
//! is no restart.
//!
//! # Example
//!
//! ```ignore
//! let (mut driver, handle) = FrameDriver::new(120.0);
//! let mut surface = HeadlessSurface::new();
//! std::thread::spawn(move || { /* later */ handle.stop(); });
//! let frames = driver.run(&mut engine, &input, &mut surface)?;
//! ```

use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};

use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::error::{AppError, DriverError, PresentError};
use crate::input::SharedInput;
use crate::time::{FrameStats, TickClock};

/// Longest single idle wait between tick checks.
pub const IDLE_WAIT: Duration = Duration::from_millis(1);

/// Lifecycle of a [`FrameDriver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Running,
    Stopped,
}

/// Messages accepted on the control channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Stop,
}

/// Cloneable remote control for a running driver.
#[derive(Debug, Clone)]
pub struct DriverHandle {
    tx: Sender<Control>,
}

impl DriverHandle {
    /// Ask the loop to stop after the tick in flight. Returns `false` if the
    /// driver is already gone.
    pub fn stop(&self) -> bool {
        self.tx.send(Control::Stop).is_ok()
    }
}

// ============================================================================
// Display surfaces
// ============================================================================

/// One finished frame, borrowed from the engine.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    /// Row-major packed ARGB pixels, `width * height` of them.
    pub pixels: &'a [u32],
    pub width: u32,
    pub height: u32,
    /// Zero-based frame number.
    pub index: u64,
}

/// Accepts one finished pixel buffer per frame.
pub trait DisplaySurface {
    fn present(&mut self, frame: FrameView<'_>) -> Result<(), PresentError>;
}

impl<S: DisplaySurface + ?Sized> DisplaySurface for &mut S {
    fn present(&mut self, frame: FrameView<'_>) -> Result<(), PresentError> {
        (**self).present(frame)
    }
}

impl<S: DisplaySurface + ?Sized> DisplaySurface for Box<S> {
    fn present(&mut self, frame: FrameView<'_>) -> Result<(), PresentError> {
        (**self).present(frame)
    }
}

/// Surface that shows nothing; counts frames and fingerprints the last one.
#[derive(Debug, Clone, Default)]
pub struct HeadlessSurface {
    frames: u64,
    checksum: u64,
    size: (u32, u32),
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames presented so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Fingerprint of the last frame's pixels.
    pub fn checksum(&self) -> u64 {
        self.checksum
    }

    /// Size of the last frame.
    pub fn size(&self) -> (u32, u32) {
        self.size
    }
}

impl DisplaySurface for HeadlessSurface {
    fn present(&mut self, frame: FrameView<'_>) -> Result<(), PresentError> {
        self.frames += 1;
        self.size = (frame.width, frame.height);
        self.checksum = frame
            .pixels
            .iter()
            .fold(0xcbf2_9ce4_8422_2325u64, |h, &p| {
                (h ^ p as u64).wrapping_mul(0x0000_0100_0000_01b3)
            });
        Ok(())
    }
}

/// An owned copy of a frame, sent across threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub pixels: Vec<u32>,
    pub width: u32,
    pub height: u32,
    pub index: u64,
}

impl Frame {
    pub fn view(&self) -> FrameView<'_> {
        FrameView {
            pixels: &self.pixels,
            width: self.width,
            height: self.height,
            index: self.index,
        }
    }
}

/// Sends frames to another thread without blocking the frame loop.
///
/// When the receiver falls behind, new frames are dropped. Pixel buffers
/// handed back through [`FrameReceiver::recycle`] are reused.
#[derive(Debug)]
pub struct ChannelSurface {
    tx: Sender<Frame>,
    recycled: Receiver<Vec<u32>>,
    dropped: u64,
}

/// Receiving end of a [`ChannelSurface`].
#[derive(Debug)]
pub struct FrameReceiver {
    rx: Receiver<Frame>,
    recycle: Sender<Vec<u32>>,
}

/// Create a connected surface/receiver pair holding at most `capacity`
/// undelivered frames.
pub fn frame_channel(capacity: usize) -> (ChannelSurface, FrameReceiver) {
    let capacity = capacity.max(1);
    let (tx, rx) = crossbeam_channel::bounded(capacity);
    let (recycle, recycled) = crossbeam_channel::bounded(capacity + 1);
    (
        ChannelSurface {
            tx,
            recycled,
            dropped: 0,
        },
        FrameReceiver { rx, recycle },
    )
}

impl ChannelSurface {
    /// Frames dropped because the receiver was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl DisplaySurface for ChannelSurface {
    fn present(&mut self, frame: FrameView<'_>) -> Result<(), PresentError> {
        let mut pixels = self.recycled.try_recv().unwrap_or_default();
        pixels.clear();
        pixels.extend_from_slice(frame.pixels);

        let owned = Frame {
            pixels,
            width: frame.width,
            height: frame.height,
            index: frame.index,
        };
        match self.tx.try_send(owned) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.dropped += 1;
                Ok(())
            }
            Err(TrySendError::Disconnected(_)) => Err(PresentError::Disconnected),
        }
    }
}

impl FrameReceiver {
    /// Newest pending frame, recycling any older ones.
    pub fn latest(&self) -> Option<Frame> {
        let mut newest = None;
        while let Ok(frame) = self.rx.try_recv() {
            if let Some(old) = newest.replace(frame) {
                self.recycle(old);
            }
        }
        newest
    }

    /// Wait up to `timeout` for the next frame.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Frame> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Hand a frame's buffer back to the sender for reuse.
    pub fn recycle(&self, frame: Frame) {
        let _ = self.recycle.try_send(frame.pixels);
    }
}

// ============================================================================
// Driver
// ============================================================================

/// Runs an [`Engine`] at a fixed cadence.
#[derive(Debug)]
pub struct FrameDriver {
    state: DriverState,
    control: Receiver<Control>,
    target_fps: f64,
    max_frames: Option<u64>,
    fixed_delta: Option<f32>,
    report_every: u64,
}

impl FrameDriver {
    /// Create an idle driver targeting `target_fps` ticks per second and the
    /// handle that stops it.
    pub fn new(target_fps: f64) -> (Self, DriverHandle) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let driver = Self {
            state: DriverState::Idle,
            control: rx,
            target_fps,
            max_frames: None,
            fixed_delta: None,
            report_every: target_fps.round().max(1.0) as u64,
        };
        (driver, DriverHandle { tx })
    }

    /// Stop on its own after `frames` frames.
    pub fn with_max_frames(mut self, frames: u64) -> Self {
        self.max_frames = Some(frames);
        self
    }

    /// Integrate every tick with `dt` seconds instead of the measured time.
    pub fn with_fixed_delta(mut self, dt: f32) -> Self {
        self.fixed_delta = Some(dt);
        self
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Run the frame loop until stopped. Returns the number of frames
    /// presented.
    pub fn run<S>(
        &mut self,
        engine: &mut Engine,
        input: &SharedInput,
        surface: &mut S,
    ) -> Result<u64, DriverError>
    where
        S: DisplaySurface + ?Sized,
    {
        if self.state == DriverState::Stopped {
            return Err(DriverError::Stopped);
        }
        self.state = DriverState::Running;
        log::info!("frame loop running at {} fps", self.target_fps);

        let result = self.run_loop(engine, input, surface);
        self.state = DriverState::Stopped;
        match &result {
            Ok(frames) => log::info!("frame loop stopped after {frames} frames"),
            Err(err) => log::error!("frame loop failed: {err}"),
        }
        result
    }

    fn run_loop<S>(
        &mut self,
        engine: &mut Engine,
        input: &SharedInput,
        surface: &mut S,
    ) -> Result<u64, DriverError>
    where
        S: DisplaySurface + ?Sized,
    {
        let mut clock = TickClock::new(self.target_fps);
        if let Some(dt) = self.fixed_delta {
            clock = clock.with_fixed_delta(dt);
        }
        let mut stats = FrameStats::new(self.report_every);
        let mut frames = 0u64;

        loop {
            if let Ok(Control::Stop) = self.control.try_recv() {
                return Ok(frames);
            }
            if self.max_frames.is_some_and(|max| frames >= max) {
                return Ok(frames);
            }

            let now = Instant::now();
            let Some(dt) = clock.poll(now) else {
                let wait = clock.remaining(now).min(IDLE_WAIT);
                match self.control.recv_timeout(wait) {
                    Ok(Control::Stop) => return Ok(frames),
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => return Err(DriverError::Interrupted),
                }
            };

            let frame = input.take_frame(dt);
            if !frame.requests.is_empty() {
                engine.apply(frame.requests);
            }

            let tick_start = Instant::now();
            engine.tick(&frame.tick);
            let render_start = Instant::now();
            engine.render();
            surface.present(FrameView {
                pixels: engine.output(),
                width: engine.width(),
                height: engine.height(),
                index: frames,
            })?;
            let end = Instant::now();
            frames += 1;

            if let Some(report) = stats.record_at(render_start - tick_start, end - render_start, end)
            {
                log::info!("{report}");
            }
        }
    }
}

/// Run `config` without a window, presenting into a [`HeadlessSurface`].
///
/// With `frames` set the loop stops after that many frames; otherwise it
/// runs until the process is interrupted.
pub fn run_headless(config: EngineConfig, frames: Option<u64>) -> Result<HeadlessSurface, AppError> {
    let mut engine = Engine::new(config)?;
    let (mut driver, _handle) = FrameDriver::new(engine.config().target_fps);
    if let Some(frames) = frames {
        driver = driver.with_max_frames(frames);
    }
    let input = SharedInput::new();
    let mut surface = HeadlessSurface::new();
    driver.run(&mut engine, &input, &mut surface)?;
    log::info!(
        "headless run finished: {} frames, checksum {:016x}",
        surface.frames(),
        surface.checksum()
    );
    Ok(surface)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    fn engine() -> Engine {
        Engine::new(
            EngineConfig::new()
                .with_size(40, 30)
                .with_particle_count(256)
                .with_workers(2),
        )
        .unwrap()
    }

    struct FailingSurface;

    impl DisplaySurface for FailingSurface {
        fn present(&mut self, _frame: FrameView<'_>) -> Result<(), PresentError> {
            Err(PresentError::Surface("lost".into()))
        }
    }

    #[test]
    fn test_headless_max_frames() {
        let mut engine = engine();
        let input = SharedInput::new();
        let (driver, _handle) = FrameDriver::new(1000.0);
        let mut driver = driver.with_max_frames(5);
        let mut surface = HeadlessSurface::new();

        assert_eq!(driver.state(), DriverState::Idle);
        let frames = driver.run(&mut engine, &input, &mut surface).unwrap();
        assert_eq!(frames, 5);
        assert_eq!(surface.frames(), 5);
        assert_eq!(surface.size(), (40, 30));
        assert_eq!(driver.state(), DriverState::Stopped);
    }

    #[test]
    fn test_stopped_driver_does_not_restart() {
        let mut engine = engine();
        let input = SharedInput::new();
        let (driver, _handle) = FrameDriver::new(1000.0);
        let mut driver = driver.with_max_frames(1);
        let mut surface = HeadlessSurface::new();
        driver.run(&mut engine, &input, &mut surface).unwrap();
        assert!(matches!(
            driver.run(&mut engine, &input, &mut surface),
            Err(DriverError::Stopped)
        ));
    }

    #[test]
    fn test_stop_from_other_thread() {
        let (mut driver, handle) = FrameDriver::new(500.0);
        let worker = std::thread::spawn(move || {
            let mut engine = engine();
            let input = SharedInput::new();
            let mut surface = HeadlessSurface::new();
            let result = driver.run(&mut engine, &input, &mut surface);
            (result, driver.state(), surface.frames())
        });
        std::thread::sleep(Duration::from_millis(30));
        assert!(handle.stop());
        let (result, state, presented) = worker.join().unwrap();
        assert_eq!(result.unwrap(), presented);
        assert_eq!(state, DriverState::Stopped);
    }

    #[test]
    fn test_dropped_handle_interrupts_wait() {
        let mut engine = engine();
        let input = SharedInput::new();
        let (mut driver, handle) = FrameDriver::new(1.0);
        drop(handle);
        let mut surface = HeadlessSurface::new();
        let result = driver.run(&mut engine, &input, &mut surface);
        assert!(matches!(result, Err(DriverError::Interrupted)));
        assert_eq!(driver.state(), DriverState::Stopped);
        assert_eq!(surface.frames(), 0);
    }

    #[test]
    fn test_present_failure_is_fatal() {
        let mut engine = engine();
        let input = SharedInput::new();
        let (mut driver, _handle) = FrameDriver::new(1000.0);
        let result = driver.run(&mut engine, &input, &mut FailingSurface);
        assert!(matches!(
            result,
            Err(DriverError::Present(PresentError::Surface(_)))
        ));
        assert_eq!(driver.state(), DriverState::Stopped);
    }

    #[test]
    fn test_requests_applied_before_tick() {
        let mut engine = engine();
        let input = SharedInput::new();
        input.request_resize(20, 10);
        input.set_pointer(Vec2::new(10.0, 5.0));
        let (driver, _handle) = FrameDriver::new(1000.0);
        let mut driver = driver.with_max_frames(1).with_fixed_delta(0.01);
        let mut surface = HeadlessSurface::new();
        driver.run(&mut engine, &input, &mut surface).unwrap();
        assert_eq!(surface.size(), (20, 10));
        assert_eq!(engine.output().len(), 200);
    }

    #[test]
    fn test_channel_surface_recycles_and_drops() {
        let (mut surface, receiver) = frame_channel(1);
        let pixels = [1u32, 2, 3, 4];
        let view = |index| FrameView {
            pixels: &pixels,
            width: 2,
            height: 2,
            index,
        };

        surface.present(view(0)).unwrap();
        surface.present(view(1)).unwrap();
        assert_eq!(surface.dropped(), 1);

        let frame = receiver.latest().unwrap();
        assert_eq!(frame.index, 0);
        assert_eq!(frame.pixels, vec![1, 2, 3, 4]);
        receiver.recycle(frame);

        surface.present(view(2)).unwrap();
        assert_eq!(receiver.latest().unwrap().index, 2);

        drop(receiver);
        assert!(matches!(
            surface.present(view(3)),
            Err(PresentError::Disconnected)
        ));
    }

    #[test]
    fn test_stop_request_queued() {
        let (driver, handle) = FrameDriver::new(60.0);
        assert!(handle.clone().stop());
        assert_eq!(driver.control.try_recv(), Ok(Control::Stop));
        assert!(driver.control.try_recv().is_err());
    }

    #[test]
    fn test_run_headless_is_deterministic() {
        let config = EngineConfig::new()
            .with_size(32, 24)
            .with_particle_count(300)
            .with_workers(3)
            .with_target_fps(1000.0);
        let a = run_headless(config.clone(), Some(3)).unwrap();
        let b = run_headless(config, Some(3)).unwrap();
        assert_eq!(a.frames(), 3);
        assert_eq!(a.size(), (32, 24));
        // no input: particles never move, so the frames match
        assert_eq!(a.checksum(), b.checksum());
    }

    #[test]
    fn test_frame_view_borrows_pixels() {
        let frame = Frame {
            pixels: vec![7, 8],
            width: 2,
            height: 1,
            index: 4,
        };
        let view = frame.view();
        assert_eq!(view.pixels, &[7, 8]);
        assert_eq!((view.width, view.height, view.index), (2, 1, 4));
    }
}
