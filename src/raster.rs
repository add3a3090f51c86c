//! Two-phase rasterization of the particle store.
//!
//! Phase A: every worker clears its own scratch buffer and stamps the
//! colors of its particle partition into it. Later particles overwrite
//! earlier ones inside one worker.
//!
//! Phase B: the pixel range is re-partitioned across workers and each
//! output pixel takes the first non-zero value found across the scratch
//! buffers in ascending worker order (0 if none). The output is fully
//! recomputed every frame.

use crate::error::EngineError;
use crate::pool::WorkerPool;
use crate::store::{ParticleSlices, ParticleStore};

/// Output framebuffer plus one scratch buffer per worker.
#[derive(Debug, Clone)]
pub struct FrameBuffers {
    width: u32,
    height: u32,
    output: Vec<u32>,
    scratch: Vec<Vec<u32>>,
}

impl FrameBuffers {
    /// Allocate zeroed buffers for a `width` x `height` canvas.
    pub fn new(width: u32, height: u32, workers: usize) -> Result<Self, EngineError> {
        check_dimensions(width, height)?;
        let pixels = pixel_count(width, height);
        Ok(Self {
            width,
            height,
            output: vec![0; pixels],
            scratch: vec![vec![0; pixels]; workers],
        })
    }

    /// Reallocate every buffer for a new canvas size.
    ///
    /// On invalid dimensions the previous buffers are kept untouched.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), EngineError> {
        *self = Self::new(width, height, self.scratch.len())?;
        Ok(())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Composited pixels, row-major, packed ARGB.
    pub fn output(&self) -> &[u32] {
        &self.output
    }

    pub fn scratch(&self) -> &[Vec<u32>] {
        &self.scratch
    }

    pub fn worker_count(&self) -> usize {
        self.scratch.len()
    }
}

fn check_dimensions(width: u32, height: u32) -> Result<(), EngineError> {
    if width == 0 || height == 0 {
        return Err(EngineError::InvalidDimensions { width, height });
    }
    Ok(())
}

#[inline]
fn pixel_count(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

/// Clear `scratch` and stamp every particle of `particles` into it.
///
/// Coordinates are clamped to the canvas before truncation, so particles
/// off the canvas pile up on the border. NaN clamps to 0.
pub fn scatter_into(scratch: &mut [u32], particles: ParticleSlices<'_>, width: u32, height: u32) {
    scratch.fill(0);
    let max_x = (width - 1) as f32;
    let max_y = (height - 1) as f32;
    let w = width as usize;

    for ((&x, &y), &color) in particles
        .pos_x
        .iter()
        .zip(particles.pos_y)
        .zip(particles.color)
    {
        // f32::max/min return the non-NaN operand, and `as` saturates
        let ix = x.max(0.0).min(max_x) as usize;
        let iy = y.max(0.0).min(max_y) as usize;
        scratch[iy * w + ix] = color;
    }
}

/// Composite `out` from the scratch buffers, where `out[i]` corresponds to
/// pixel `offset + i`.
pub fn merge_into<B: AsRef<[u32]>>(out: &mut [u32], scratch: &[B], offset: usize) {
    for (i, px) in out.iter_mut().enumerate() {
        let idx = offset + i;
        *px = scratch
            .iter()
            .map(|buf| buf.as_ref()[idx])
            .find(|&c| c != 0)
            .unwrap_or(0);
    }
}

/// Rasterize `store` into `buffers.output` using the pool.
pub fn render(pool: &WorkerPool, store: &ParticleStore, buffers: &mut FrameBuffers) {
    let FrameBuffers {
        width,
        height,
        output,
        scratch,
    } = buffers;
    let (width, height) = (*width, *height);

    // Phase A: one scratch buffer per particle partition
    let particles = store.slices();
    let ranges = pool.ranges(particles.len());
    let parts: Vec<_> = scratch.iter_mut().zip(ranges).collect();
    pool.run_partitions(parts, |_, (buf, range)| {
        scatter_into(buf, particles.range(range), width, height);
    });

    // Phase B: pixel ranges read every scratch buffer
    let scratch: &[Vec<u32>] = scratch;
    let pixel_ranges = pool.ranges(output.len());
    let offsets: Vec<usize> = pixel_ranges.iter().map(|r| r.start).collect();
    let parts: Vec<_> = pool
        .split_mut(output.as_mut_slice())
        .into_iter()
        .zip(offsets)
        .collect();
    pool.run_partitions(parts, |_, (out, offset)| merge_into(out, scratch, offset));
}
