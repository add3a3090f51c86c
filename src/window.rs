//! Windowed front end.
//!
//! The winit event loop owns the window and the [`Presenter`]. The engine
//! and its [`FrameDriver`] run on a dedicated simulation thread that sends
//! finished frames back over a [`frame_channel`]. Window events are turned
//! into [`SharedInput`] updates; closing the window stops the driver, joins
//! the simulation thread and only then drops the frame receiver.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use crate::config::{EngineConfig, RunOptions};
use crate::driver::{frame_channel, DisplaySurface, DriverHandle, FrameDriver, FrameReceiver};
use crate::engine::Engine;
use crate::error::{AppError, DriverError};
use crate::gpu::Presenter;
use crate::input::{handle_window_event, EventResponse, SharedInput};

/// Undelivered frames the simulation may queue before dropping.
const FRAME_QUEUE: usize = 2;

/// How long a redraw waits for a new frame.
const FRAME_WAIT: Duration = Duration::from_millis(8);

/// Open a window and run the simulation until it is closed.
pub fn run(config: EngineConfig, options: RunOptions) -> Result<(), AppError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config, options);
    event_loop.run_app(&mut app)?;
    app.shutdown();

    match app.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

struct SimThread {
    handle: DriverHandle,
    thread: JoinHandle<Result<u64, DriverError>>,
}

struct App {
    config: EngineConfig,
    options: RunOptions,
    input: SharedInput,
    window: Option<Arc<Window>>,
    presenter: Option<Presenter>,
    receiver: Option<FrameReceiver>,
    sim: Option<SimThread>,
    error: Option<AppError>,
}

impl App {
    fn new(config: EngineConfig, options: RunOptions) -> Self {
        Self {
            config,
            options,
            input: SharedInput::new(),
            window: None,
            presenter: None,
            receiver: None,
            sim: None,
            error: None,
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<(), AppError> {
        let window_attrs = Window::default_attributes()
            .with_title("pullsim")
            .with_inner_size(winit::dpi::PhysicalSize::new(
                self.config.width,
                self.config.height,
            ));
        let window = Arc::new(event_loop.create_window(window_attrs)?);
        let presenter = Presenter::new(window.clone())?;

        let mut engine = Engine::new(self.config.clone())?;
        let size = window.inner_size();
        if size.width > 0 && (size.width, size.height) != (engine.width(), engine.height()) {
            self.input.request_resize(size.width, size.height);
        }

        let (mut driver, handle) = FrameDriver::new(self.config.target_fps);
        if let Some(frames) = self.options.frames {
            driver = driver.with_max_frames(frames);
        }
        let (mut surface, receiver) = frame_channel(FRAME_QUEUE);
        let input = self.input.clone();
        let thread = std::thread::Builder::new()
            .name("pullsim-sim".into())
            .spawn(move || driver.run(&mut engine, &input, &mut surface))?;

        self.window = Some(window);
        self.presenter = Some(presenter);
        self.receiver = Some(receiver);
        self.sim = Some(SimThread { handle, thread });
        Ok(())
    }

    /// Stop the driver, join the simulation thread, then drop the receiver.
    fn shutdown(&mut self) {
        if let Some(sim) = self.sim.take() {
            sim.handle.stop();
            match sim.thread.join() {
                Ok(Ok(frames)) => log::debug!("simulation thread done after {frames} frames"),
                Ok(Err(err)) => self.record_error(err.into()),
                Err(_) => self.record_error(AppError::SimulationPanicked),
            }
        }
        self.receiver = None;
    }

    fn record_error(&mut self, err: AppError) {
        log::error!("{err}");
        self.error.get_or_insert(err);
    }

    fn redraw(&mut self) {
        let (Some(presenter), Some(receiver)) = (&mut self.presenter, &self.receiver) else {
            return;
        };
        let Some(frame) = receiver
            .latest()
            .or_else(|| receiver.recv_timeout(FRAME_WAIT))
        else {
            return;
        };
        let result = presenter.present(frame.view());
        receiver.recycle(frame);
        if let Err(err) = result {
            self.record_error(DriverError::from(err).into());
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.start(event_loop) {
            self.record_error(err);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if handle_window_event(&self.input, &event) == EventResponse::Exit {
            self.shutdown();
            event_loop.exit();
            return;
        }

        match event {
            WindowEvent::Resized(size) => {
                if let Some(presenter) = &mut self.presenter {
                    presenter.resize(size);
                }
            }
            WindowEvent::RedrawRequested => {
                self.redraw();
                if self.error.is_some() {
                    self.shutdown();
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.sim.as_ref().is_some_and(|sim| sim.thread.is_finished()) {
            self.shutdown();
            event_loop.exit();
            return;
        }
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}
