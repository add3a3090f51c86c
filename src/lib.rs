//! # pullsim
//!
//! Millions of 2D particles pulled toward the mouse pointer, integrated and
//! rasterized on the CPU every frame.
//!
//! Particles live in a structure-of-arrays [`ParticleStore`]. Each tick the
//! store is split into one contiguous range per worker; every worker runs
//! the 4-lane kinematics kernel over its range, then scatters its particles
//! into a private scratch framebuffer. The scratch buffers are merged into
//! the output (first non-empty pixel wins, in worker order) and the result
//! is handed to a display surface.
//!
//! ## Quick Start
//!
//! ```ignore
//! use pullsim::prelude::*;
//!
//! fn main() -> Result<(), AppError> {
//!     let config = EngineConfig::new()
//!         .with_particle_count(2_000_000)
//!         .with_layout(Layout::Disc);
//!     pullsim::window::run(config, RunOptions::default())
//! }
//! ```
//!
//! ## Driving the engine directly
//!
//! ```ignore
//! let mut engine = Engine::new(EngineConfig::new().with_size(200, 200).with_particle_count(1000))?;
//! let input = TickInput {
//!     dt: 0.016,
//!     pointer: Vec2::new(100.0, 100.0),
//!     pressed: true,
//!     ..Default::default()
//! };
//! engine.tick(&input);
//! engine.render();
//! ```
//!
//! ## Layouts
//!
//! | Key | Layout |
//! |-----|--------|
//! | `1` | [`Layout::Square`] - uniform over the canvas |
//! | `2` | [`Layout::MultiCluster`] - uniform, hue blended toward five random centers |
//! | `3` | [`Layout::Disc`] - rainbow disc around the center |
//! | `4` | [`Layout::Image`] - the configured image, one particle per pixel |

pub mod color;
pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
mod gpu;
pub mod image_grid;
pub mod input;
pub mod lanes;
pub mod layout;
pub mod physics;
pub mod pool;
pub mod raster;
pub mod rng;
pub mod store;
pub mod time;
pub mod window;

pub use config::{Args, EngineConfig, RunOptions};
pub use driver::{
    frame_channel, run_headless, ChannelSurface, DisplaySurface, DriverHandle, DriverState,
    Frame, FrameDriver, FrameReceiver, FrameView, HeadlessSurface,
};
pub use engine::Engine;
pub use error::{
    AppError, DecodeError, DriverError, EngineError, GpuError, LayoutError, PresentError,
};
pub use glam::Vec2;
pub use gpu::Presenter;
pub use image_grid::{FileDecoder, ImageDecoder, RgbGrid};
pub use input::{InputFrame, Requests, SharedInput};
pub use layout::{Initializer, Layout};
pub use physics::{BoundaryPolicy, Features, PhysicsConfig, TickConstants, TickInput};
pub use pool::WorkerPool;
pub use raster::FrameBuffers;
pub use store::ParticleStore;

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use pullsim::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{EngineConfig, RunOptions};
    pub use crate::driver::{DisplaySurface, FrameDriver, FrameView, HeadlessSurface};
    pub use crate::engine::Engine;
    pub use crate::error::{AppError, EngineError, LayoutError};
    pub use crate::input::{KeyCode, MouseButton, SharedInput};
    pub use crate::layout::Layout;
    pub use crate::physics::{BoundaryPolicy, Features, PhysicsConfig, TickInput};
    pub use crate::Vec2;
}
