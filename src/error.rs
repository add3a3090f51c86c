//! Error types for pullsim.
//!
//! Only a few conditions can fail: bad canvas or engine configuration,
//! image decoding, the frame loop losing its control channel, and the
//! display side (window, GPU, presentation). Particles leaving the canvas
//! are never an error.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while configuring or resizing the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Canvas dimensions must both be positive.
    #[error("invalid canvas dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The worker pool could not be built.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Errors from the image decoder collaborator.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The file could not be read.
    #[error("failed to read image '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The file is not a valid image.
    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),
    /// The image has no pixels.
    #[error("image has no pixels")]
    Empty,
}

/// Errors from the pattern initializer.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// The image layout was requested but no image is configured.
    #[error("image layout requested but no image was provided")]
    MissingImage,
    /// The image scales down to zero pixels for this particle count.
    #[error("image scales to an empty {width}x{height} grid")]
    EmptyImage { width: u32, height: u32 },
    /// Decoding the configured image failed.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Errors from a display surface.
#[derive(Debug, Error)]
pub enum PresentError {
    /// The receiving side of the surface has gone away.
    #[error("display surface disconnected")]
    Disconnected,
    /// The surface rejected the frame.
    #[error("display surface error: {0}")]
    Surface(String),
}

/// Reasons the frame driver stopped abnormally.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The idle wait lost its control channel.
    #[error("frame loop wait was interrupted")]
    Interrupted,
    /// The driver has already stopped and cannot be restarted.
    #[error("frame driver already stopped")]
    Stopped,
    /// Presenting a frame failed.
    #[error(transparent)]
    Present(#[from] PresentError),
}

/// Errors that can occur during GPU initialization.
#[derive(Debug, Error)]
pub enum GpuError {
    /// Failed to create a surface for rendering.
    #[error("failed to create GPU surface: {0}")]
    SurfaceCreation(#[from] wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    #[error("no compatible GPU adapter found; ensure your system supports Vulkan, Metal, DX12 or WebGPU")]
    NoAdapter,
    /// Failed to create GPU device.
    #[error("failed to create GPU device: {0}")]
    DeviceCreation(#[from] wgpu::RequestDeviceError),
    /// The surface reports no texture formats for the chosen adapter.
    #[error("surface reports no supported formats")]
    UnsupportedSurface,
}

/// Errors that can occur when running the application.
#[derive(Debug, Error)]
pub enum AppError {
    /// Failed to create or run the event loop.
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    /// Failed to create the window.
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    /// GPU initialization failed.
    #[error("GPU error: {0}")]
    Gpu(#[from] GpuError),
    /// Engine setup failed.
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// The frame loop ended abnormally.
    #[error(transparent)]
    Driver(#[from] DriverError),
    /// The simulation thread could not be spawned.
    #[error("failed to spawn simulation thread: {0}")]
    Thread(#[from] std::io::Error),
    /// The simulation thread panicked.
    #[error("simulation thread panicked")]
    SimulationPanicked,
}
