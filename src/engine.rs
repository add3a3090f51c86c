//! The simulation engine: particle store, framebuffers and worker pool.
//!
//! An [`Engine`] is a single configurable simulation. It owns everything a
//! frame touches and exposes the three per-frame steps separately
//! ([`Engine::apply`], [`Engine::tick`], [`Engine::render`]) so the frame
//! driver, benchmarks and tests can drive it directly.
//!
//! # Example
//!
//! ```ignore
//! use pullsim::prelude::*;
//!
//! let mut engine = Engine::new(EngineConfig::new().with_size(200, 200).with_particle_count(1000))?;
//! let input = TickInput { dt: 0.016, pointer: Vec2::new(100.0, 100.0), pressed: true, ..Default::default() };
//! engine.tick(&input);
//! engine.render();
//! let pixels = engine.output();
//! ```

use crate::config::EngineConfig;
use crate::error::{EngineError, LayoutError};
use crate::image_grid::{FileDecoder, ImageDecoder, RgbGrid};
use crate::input::Requests;
use crate::layout::{Initializer, Layout};
use crate::physics::{self, TickConstants, TickInput};
use crate::pool::WorkerPool;
use crate::raster::{self, FrameBuffers};
use crate::store::ParticleStore;

/// One particle simulation.
pub struct Engine {
    config: EngineConfig,
    store: ParticleStore,
    buffers: FrameBuffers,
    pool: WorkerPool,
    initializer: Initializer,
    layout: Layout,
    decoder: Box<dyn ImageDecoder + Send>,
    image: Option<RgbGrid>,
    return_to_start: bool,
}

impl Engine {
    /// Build an engine that reads images from disk.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        Self::with_decoder(config, Box::new(FileDecoder))
    }

    /// Build an engine with a custom image decoder.
    ///
    /// The configured layout is applied immediately. If it is the image
    /// layout and the image cannot be loaded, the engine starts with the
    /// square layout instead.
    pub fn with_decoder(
        config: EngineConfig,
        decoder: Box<dyn ImageDecoder + Send>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let pool = WorkerPool::new(config.resolved_workers())?;
        let buffers = FrameBuffers::new(config.width, config.height, pool.workers())?;
        let store = ParticleStore::new(config.particle_count);

        log::info!(
            "engine: {} particles on {}x{} with {} workers",
            config.particle_count,
            config.width,
            config.height,
            pool.workers()
        );

        let mut engine = Self {
            initializer: Initializer::new(config.seed),
            layout: config.layout,
            config,
            store,
            buffers,
            pool,
            decoder,
            image: None,
            return_to_start: false,
        };

        let layout = engine.layout;
        if let Err(err) = engine.reset(layout) {
            log::warn!("{layout} layout unavailable at startup ({err}), using square");
            engine.populate_fallback();
        }
        Ok(engine)
    }

    // ========== Accessors ==========

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &ParticleStore {
        &self.store
    }

    pub fn buffers(&self) -> &FrameBuffers {
        &self.buffers
    }

    /// Composited pixels from the last [`Engine::render`].
    pub fn output(&self) -> &[u32] {
        self.buffers.output()
    }

    pub fn width(&self) -> u32 {
        self.buffers.width()
    }

    pub fn height(&self) -> u32 {
        self.buffers.height()
    }

    pub fn workers(&self) -> usize {
        self.pool.workers()
    }

    /// Layout the particles were last arranged in.
    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn return_to_start(&self) -> bool {
        self.return_to_start
    }

    // ========== Requests ==========

    /// Re-arrange every particle in `layout`.
    ///
    /// On failure (no image configured, decode error, image too small) the
    /// previous layout and particle state are kept.
    pub fn reset(&mut self, layout: Layout) -> Result<(), LayoutError> {
        if layout == Layout::Image {
            self.load_image()?;
        }
        let (w, h) = (self.width(), self.height());
        self.initializer
            .populate(layout, &mut self.store, w, h, self.image.as_ref())?;
        self.layout = layout;
        log::info!("reset to {layout} layout");
        Ok(())
    }

    /// Resize the canvas and re-run the active layout for the new size.
    ///
    /// Invalid sizes are rejected and the current buffers are kept.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), EngineError> {
        self.buffers.resize(width, height)?;
        self.config.width = width;
        self.config.height = height;
        log::info!("resized to {width}x{height}");

        let layout = self.layout;
        if let Err(err) = self.reset(layout) {
            log::warn!("could not re-apply {layout} layout after resize ({err}), using square");
            self.populate_fallback();
        }
        Ok(())
    }

    /// Apply one tick's worth of one-shot requests. Failures are logged and
    /// leave the engine as it was.
    pub fn apply(&mut self, requests: Requests) {
        if let Some((w, h)) = requests.resize {
            if let Err(err) = self.resize(w, h) {
                log::warn!("resize rejected: {err}");
            }
        }
        if let Some(layout) = requests.reset {
            if let Err(err) = self.reset(layout) {
                log::warn!("reset to {layout} failed: {err}");
            }
        }
        if requests.toggle_return_to_start {
            self.return_to_start = !self.return_to_start;
            log::info!(
                "return to start {}",
                if self.return_to_start { "on" } else { "off" }
            );
        }
    }

    fn load_image(&mut self) -> Result<&RgbGrid, LayoutError> {
        if self.image.is_none() {
            let path = self
                .config
                .image_path
                .as_deref()
                .ok_or(LayoutError::MissingImage)?;
            let grid = self.decoder.decode(path)?;
            self.image = Some(grid);
        }
        self.image.as_ref().ok_or(LayoutError::MissingImage)
    }

    fn populate_fallback(&mut self) {
        let (w, h) = (self.width(), self.height());
        self.initializer.square(&mut self.store, w, h);
        self.layout = Layout::Square;
    }

    // ========== Frame ==========

    /// Integrate every particle by one tick.
    pub fn tick(&mut self, input: &TickInput) {
        let k = TickConstants::new(
            &self.config.physics,
            self.config.features,
            input,
            self.width(),
            self.height(),
        );
        physics::tick(&self.pool, &mut self.store, &k);
    }

    /// Rasterize the store into the output buffer.
    pub fn render(&mut self) {
        raster::render(&self.pool, &self.store, &mut self.buffers);
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("particles", &self.store.len())
            .field("width", &self.width())
            .field("height", &self.height())
            .field("workers", &self.workers())
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;
    use glam::Vec2;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FakeDecoder {
        grid: Option<RgbGrid>,
        calls: Arc<AtomicUsize>,
    }

    impl ImageDecoder for FakeDecoder {
        fn decode(&self, _path: &Path) -> Result<RgbGrid, DecodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.grid.clone().ok_or(DecodeError::Empty)
        }
    }

    fn small_config() -> EngineConfig {
        EngineConfig::new()
            .with_size(64, 48)
            .with_particle_count(500)
            .with_workers(3)
    }

    fn engine_with(grid: Option<RgbGrid>, config: EngineConfig) -> (Engine, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let decoder = FakeDecoder {
            grid,
            calls: calls.clone(),
        };
        (Engine::with_decoder(config, Box::new(decoder)).unwrap(), calls)
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(matches!(
            Engine::new(small_config().with_size(0, 5)),
            Err(EngineError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_resize_reallocates_and_repopulates() {
        let mut engine = Engine::new(small_config()).unwrap();
        engine.resize(30, 20).unwrap();
        assert_eq!((engine.width(), engine.height()), (30, 20));
        assert_eq!(engine.output().len(), 600);
        assert!(engine.buffers().scratch().iter().all(|s| s.len() == 600));
        for i in 0..engine.store().len() {
            let (x, y) = engine.store().position(i);
            assert!((0.0..30.0).contains(&x) && (0.0..20.0).contains(&y));
        }
    }

    #[test]
    fn test_invalid_resize_keeps_state() {
        let mut engine = Engine::new(small_config()).unwrap();
        let before = engine.store().pos_x().to_vec();
        assert!(engine.resize(0, 20).is_err());
        assert_eq!((engine.width(), engine.height()), (64, 48));
        assert_eq!(engine.output().len(), 64 * 48);
        assert_eq!(engine.store().pos_x(), before.as_slice());
    }

    #[test]
    fn test_image_reset_without_image_keeps_layout() {
        let mut engine = Engine::new(small_config().with_layout(Layout::Disc)).unwrap();
        let before = engine.store().pos_x().to_vec();
        engine.apply(Requests {
            reset: Some(Layout::Image),
            ..Default::default()
        });
        assert_eq!(engine.layout(), Layout::Disc);
        assert_eq!(engine.store().pos_x(), before.as_slice());
    }

    #[test]
    fn test_decode_failure_keeps_layout() {
        let (mut engine, calls) = engine_with(None, small_config().with_image("broken.png"));
        let before = engine.store().pos_y().to_vec();
        assert!(matches!(
            engine.reset(Layout::Image),
            Err(LayoutError::Decode(DecodeError::Empty))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(engine.layout(), Layout::Square);
        assert_eq!(engine.store().pos_y(), before.as_slice());
    }

    #[test]
    fn test_startup_image_fallback() {
        let (engine, _) = engine_with(
            None,
            small_config()
                .with_layout(Layout::Image)
                .with_image("missing.png"),
        );
        assert_eq!(engine.layout(), Layout::Square);
    }

    #[test]
    fn test_image_decoded_once() {
        let grid = RgbGrid::from_fn(10, 10, |x, _| x * 0x11);
        let (mut engine, calls) = engine_with(
            Some(grid),
            small_config()
                .with_layout(Layout::Image)
                .with_image("picture.png"),
        );
        assert_eq!(engine.layout(), Layout::Image);
        engine.reset(Layout::Image).unwrap();
        engine.resize(80, 80).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(engine.layout(), Layout::Image);
    }

    #[test]
    fn test_toggle_return_to_start() {
        let mut engine = Engine::new(small_config()).unwrap();
        let toggle = Requests {
            toggle_return_to_start: true,
            ..Default::default()
        };
        engine.apply(toggle);
        assert!(engine.return_to_start());
        engine.apply(toggle);
        assert!(!engine.return_to_start());
    }

    #[test]
    fn test_tick_and_render() {
        let mut engine = Engine::new(small_config()).unwrap();
        let input = TickInput {
            dt: 0.016,
            pointer: Vec2::new(32.0, 24.0),
            pressed: true,
            ..Default::default()
        };
        let before = engine.store().mean_distance_to(32.0, 24.0);
        engine.tick(&input);
        engine.tick(&input);
        assert!(engine.store().mean_distance_to(32.0, 24.0) < before);

        engine.render();
        let lit = engine.output().iter().filter(|&&c| c != 0).count();
        assert!(lit > 0 && lit <= 500);
    }
}
