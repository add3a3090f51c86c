//! Engine configuration and the command-line surface.
//!
//! [`EngineConfig`] is built in code with `with_*` methods; [`Args`] is the
//! clap definition used by the binary, which converts into an
//! `EngineConfig` plus [`RunOptions`].
//!
//! ```ignore
//! let config = EngineConfig::new()
//!     .with_size(800, 600)
//!     .with_particle_count(1_000_000)
//!     .with_layout(Layout::Disc);
//! config.validate()?;
//! ```

use std::path::PathBuf;

use clap::Parser;

use crate::error::EngineError;
use crate::layout::Layout;
use crate::physics::{BoundaryPolicy, Features, PhysicsConfig};
use crate::rng::XorShift64;

pub const DEFAULT_WIDTH: u32 = 1200;
pub const DEFAULT_HEIGHT: u32 = 800;
pub const DEFAULT_PARTICLES: usize = 5_000_000;
pub const DEFAULT_FPS: f64 = 120.0;

/// Everything needed to build an [`Engine`](crate::engine::Engine).
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub width: u32,
    pub height: u32,
    pub particle_count: usize,
    /// Worker threads; `None` uses one per logical CPU.
    pub workers: Option<usize>,
    pub target_fps: f64,
    pub physics: PhysicsConfig,
    pub features: Features,
    /// Layout applied at startup.
    pub layout: Layout,
    /// Image used by [`Layout::Image`].
    pub image_path: Option<PathBuf>,
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            particle_count: DEFAULT_PARTICLES,
            workers: None,
            target_fps: DEFAULT_FPS,
            physics: PhysicsConfig::default(),
            features: Features::default(),
            layout: Layout::Square,
            image_path: None,
            seed: XorShift64::DEFAULT_SEED,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_particle_count(mut self, count: usize) -> Self {
        self.particle_count = count;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    pub fn with_target_fps(mut self, fps: f64) -> Self {
        self.target_fps = fps;
        self
    }

    pub fn with_physics(mut self, physics: PhysicsConfig) -> Self {
        self.physics = physics;
        self
    }

    pub fn with_features(mut self, features: Features) -> Self {
        self.features = features;
        self
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.image_path = Some(path.into());
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Worker count after resolving `None` to the CPU count.
    pub fn resolved_workers(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get).max(1)
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.width == 0 || self.height == 0 {
            return Err(EngineError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if self.particle_count == 0 {
            return Err(invalid("particle count must be at least 1"));
        }
        if self.workers == Some(0) {
            return Err(invalid("worker count must be at least 1"));
        }
        if !(self.target_fps.is_finite() && self.target_fps > 0.0) {
            return Err(invalid(format!(
                "target fps must be positive, got {}",
                self.target_fps
            )));
        }

        let p = &self.physics;
        if !p.pull_force.is_finite() {
            return Err(invalid("pull force must be finite"));
        }
        if !(p.min_pull_distance.is_finite() && p.min_pull_distance >= 0.0) {
            return Err(invalid("minimum pull distance must be non-negative"));
        }
        if !(p.friction.is_finite() && p.friction > 0.0) {
            return Err(invalid(format!(
                "friction must be positive, got {}",
                p.friction
            )));
        }
        if !(p.slow_down_scale.is_finite() && p.slow_down_scale >= 0.0) {
            return Err(invalid("slow-down scale must be non-negative"));
        }
        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> EngineError {
    EngineError::InvalidConfig(msg.into())
}

/// How the binary runs the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunOptions {
    /// Run without a window.
    pub headless: bool,
    /// Stop after this many frames.
    pub frames: Option<u64>,
}

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "pullsim")]
#[command(about = "Millions of particles pulled toward the mouse pointer", long_about = None)]
#[command(version)]
pub struct Args {
    /// Number of particles
    #[arg(short = 'n', long, default_value_t = DEFAULT_PARTICLES)]
    pub particles: usize,

    /// Canvas width in pixels
    #[arg(long, default_value_t = DEFAULT_WIDTH)]
    pub width: u32,

    /// Canvas height in pixels
    #[arg(long, default_value_t = DEFAULT_HEIGHT)]
    pub height: u32,

    /// Worker threads (defaults to the number of logical CPUs)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Target ticks per second
    #[arg(long, default_value_t = DEFAULT_FPS)]
    pub fps: f64,

    /// What happens at the canvas edges
    #[arg(long, value_enum, default_value_t = BoundaryPolicy::Discard)]
    pub boundary: BoundaryPolicy,

    /// Pull acceleration toward the pointer, px/s²
    #[arg(long, default_value_t = 800.0)]
    pub pull_force: f32,

    /// Fraction of velocity kept after one second
    #[arg(long, default_value_t = 0.9)]
    pub friction: f32,

    /// Squared distance below which the pointer stops pulling
    #[arg(long, default_value_t = 1.0)]
    pub min_pull_distance: f32,

    /// Velocity multiplier applied by the slow-down key
    #[arg(long, default_value_t = 0.2)]
    pub slow_down_scale: f32,

    /// Disable panning
    #[arg(long)]
    pub no_pan: bool,

    /// Disable the slow-down key
    #[arg(long)]
    pub no_slow_down: bool,

    /// Initial layout
    #[arg(short, long, value_enum, default_value_t = Layout::Square)]
    pub layout: Layout,

    /// Image for the image layout (key 4)
    #[arg(short, long)]
    pub image: Option<PathBuf>,

    /// Seed for the layout random generator
    #[arg(long, default_value_t = XorShift64::DEFAULT_SEED)]
    pub seed: u64,

    /// Run without a window
    #[arg(long)]
    pub headless: bool,

    /// Stop after this many frames
    #[arg(long)]
    pub frames: Option<u64>,

    /// Verbosity level (can be repeated for more detail)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Split into engine configuration and run options.
    pub fn into_config(self) -> (EngineConfig, RunOptions) {
        let physics = PhysicsConfig::new()
            .with_pull_force(self.pull_force)
            .with_friction(self.friction)
            .with_min_pull_distance(self.min_pull_distance)
            .with_boundary(self.boundary)
            .with_slow_down_scale(self.slow_down_scale);
        let features = Features {
            pan: !self.no_pan,
            slow_down: !self.no_slow_down,
        };

        let mut config = EngineConfig::new()
            .with_size(self.width, self.height)
            .with_particle_count(self.particles)
            .with_target_fps(self.fps)
            .with_physics(physics)
            .with_features(features)
            .with_layout(self.layout)
            .with_seed(self.seed);
        config.workers = self.workers;
        config.image_path = self.image;

        let run = RunOptions {
            headless: self.headless,
            frames: self.frames,
        };
        (config, run)
    }

    /// Log level implied by `-v`/`-q`, if any.
    pub fn log_level(&self) -> Option<log::LevelFilter> {
        if self.verbose > 0 {
            Some(match self.verbose {
                1 => log::LevelFilter::Debug,
                _ => log::LevelFilter::Trace,
            })
        } else if self.quiet {
            Some(log::LevelFilter::Error)
        } else {
            None
        }
    }
}
