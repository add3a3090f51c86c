//! The per-tick particle integrator.
//!
//! Every tick, each worker takes one contiguous partition of the store and
//! integrates it in two passes: a four-lane pass over the largest aligned
//! prefix, then a scalar pass over the (at most three) leftover particles.
//! Both passes apply exactly the same single-precision operations in the
//! same order, so a particle ends up with the same bits whichever pass
//! handled it.
//!
//! Per particle, in order:
//!
//! 1. If the pointer is pressed and the squared distance to it exceeds the
//!    minimum pull distance, add `normalize(pointer - p) * force` to `v`.
//! 2. `p += v * dt + pan`.
//! 3. Apply the boundary policy.
//! 4. `v *= friction`, then `v *= damping` when slow-down was requested.
//!
//! # Example
//!
//! ```ignore
//! use pullsim::physics::{PhysicsConfig, Features, TickConstants, TickInput, tick};
//!
//! let input = TickInput { dt: 1.0 / 120.0, pressed: true, ..Default::default() };
//! let k = TickConstants::new(&PhysicsConfig::default(), Features::default(), &input, 1200, 800);
//! tick(&pool, &mut store, &k);
//! ```

use glam::Vec2;

use crate::lanes::{aligned_len, F32x4, LANES};
use crate::pool::WorkerPool;
use crate::store::{KinematicSlicesMut, ParticleStore};

// ============================================================================
// Configuration
// ============================================================================

/// What happens when a particle leaves the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum BoundaryPolicy {
    /// Particles keep moving; off-canvas ones are pinned to the border only
    /// when drawn.
    #[default]
    Discard,
    /// Positions are clamped to the canvas and the crossing velocity
    /// component is negated.
    ReflectClamp,
}

/// Immutable physics constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsConfig {
    /// Acceleration toward the pointer, in px/s².
    pub pull_force: f32,
    /// Squared distance at or below which no pull is applied.
    pub min_pull_distance: f32,
    /// Fraction of velocity kept after one second.
    pub friction: f32,
    /// Boundary handling.
    pub boundary: BoundaryPolicy,
    /// Velocity multiplier applied on a slow-down request.
    pub slow_down_scale: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            pull_force: 800.0,
            min_pull_distance: 1.0,
            friction: 0.9,
            boundary: BoundaryPolicy::Discard,
            slow_down_scale: 0.2,
        }
    }
}

impl PhysicsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pull_force(mut self, pull_force: f32) -> Self {
        self.pull_force = pull_force;
        self
    }

    pub fn with_min_pull_distance(mut self, min_pull_distance: f32) -> Self {
        self.min_pull_distance = min_pull_distance;
        self
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    pub fn with_boundary(mut self, boundary: BoundaryPolicy) -> Self {
        self.boundary = boundary;
        self
    }

    pub fn with_slow_down_scale(mut self, scale: f32) -> Self {
        self.slow_down_scale = scale;
        self
    }
}

/// Optional behaviours. A disabled feature ignores its requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Features {
    pub pan: bool,
    pub slow_down: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            pan: true,
            slow_down: true,
        }
    }
}

// ============================================================================
// Per-tick values
// ============================================================================

/// Input captured once per tick, before any worker starts.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickInput {
    /// Elapsed seconds since the previous tick.
    pub dt: f32,
    /// Pointer position in canvas pixels.
    pub pointer: Vec2,
    /// Whether the pointer is pulling.
    pub pressed: bool,
    /// Offset added to every position this tick.
    pub pan: Vec2,
    /// One-shot slow-down request.
    pub slow_down: bool,
}

/// Everything a worker needs to integrate its partition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickConstants {
    pub dt: f32,
    pub pointer_x: f32,
    pub pointer_y: f32,
    pub pressed: bool,
    pub min_pull_distance: f32,
    /// `pull_force * dt`.
    pub force: f32,
    pub pan_x: f32,
    pub pan_y: f32,
    /// `friction.powf(dt)`.
    pub friction: f32,
    pub damping: Option<f32>,
    pub boundary: BoundaryPolicy,
    pub max_x: f32,
    pub max_y: f32,
}

impl TickConstants {
    pub fn new(
        config: &PhysicsConfig,
        features: Features,
        input: &TickInput,
        width: u32,
        height: u32,
    ) -> Self {
        let dt = input.dt;
        let pan = if features.pan { input.pan } else { Vec2::ZERO };
        let damping =
            (features.slow_down && input.slow_down).then_some(config.slow_down_scale);
        Self {
            dt,
            pointer_x: input.pointer.x,
            pointer_y: input.pointer.y,
            pressed: input.pressed,
            min_pull_distance: config.min_pull_distance,
            force: config.pull_force * dt,
            pan_x: pan.x,
            pan_y: pan.y,
            friction: config.friction.powf(dt),
            damping,
            boundary: config.boundary,
            max_x: width.saturating_sub(1) as f32,
            max_y: height.saturating_sub(1) as f32,
        }
    }
}

// ============================================================================
// Kernels
// ============================================================================

/// Integrate every particle in `part` one at a time.
pub fn integrate_scalar(part: KinematicSlicesMut<'_>, k: &TickConstants) {
    let KinematicSlicesMut {
        pos_x,
        pos_y,
        vel_x,
        vel_y,
    } = part;

    for (((x, y), vx), vy) in pos_x
        .iter_mut()
        .zip(pos_y.iter_mut())
        .zip(vel_x.iter_mut())
        .zip(vel_y.iter_mut())
    {
        if k.pressed {
            let dx = k.pointer_x - *x;
            let dy = k.pointer_y - *y;
            let d2 = dx * dx + dy * dy;
            if d2 > k.min_pull_distance {
                let dist = d2.sqrt();
                *vx = *vx + (dx / dist) * k.force;
                *vy = *vy + (dy / dist) * k.force;
            }
        }

        *x = *x + (*vx * k.dt + k.pan_x);
        *y = *y + (*vy * k.dt + k.pan_y);

        if k.boundary == BoundaryPolicy::ReflectClamp {
            if *x < 0.0 {
                *x = 0.0;
                *vx = -*vx;
            } else if *x > k.max_x {
                *x = k.max_x;
                *vx = -*vx;
            }
            if *y < 0.0 {
                *y = 0.0;
                *vy = -*vy;
            } else if *y > k.max_y {
                *y = k.max_y;
                *vy = -*vy;
            }
        }

        *vx = *vx * k.friction;
        *vy = *vy * k.friction;

        if let Some(d) = k.damping {
            *vx = *vx * d;
            *vy = *vy * d;
        }
    }
}

/// Integrate `part` four particles at a time.
///
/// `part.len()` must be a multiple of [`LANES`].
pub fn integrate_lanes(part: KinematicSlicesMut<'_>, k: &TickConstants) {
    debug_assert_eq!(part.len() % LANES, 0);
    let KinematicSlicesMut {
        pos_x,
        pos_y,
        vel_x,
        vel_y,
    } = part;

    let zero = F32x4::splat(0.0);
    let pointer_x = F32x4::splat(k.pointer_x);
    let pointer_y = F32x4::splat(k.pointer_y);
    let min_d2 = F32x4::splat(k.min_pull_distance);
    let force = F32x4::splat(k.force);
    let dt = F32x4::splat(k.dt);
    let pan_x = F32x4::splat(k.pan_x);
    let pan_y = F32x4::splat(k.pan_y);
    let max_x = F32x4::splat(k.max_x);
    let max_y = F32x4::splat(k.max_y);
    let friction = F32x4::splat(k.friction);
    let damping = k.damping.map(F32x4::splat);

    for (((cx, cy), cvx), cvy) in pos_x
        .chunks_exact_mut(LANES)
        .zip(pos_y.chunks_exact_mut(LANES))
        .zip(vel_x.chunks_exact_mut(LANES))
        .zip(vel_y.chunks_exact_mut(LANES))
    {
        let mut x = F32x4::load(cx);
        let mut y = F32x4::load(cy);
        let mut vx = F32x4::load(cvx);
        let mut vy = F32x4::load(cvy);

        if k.pressed {
            let dx = pointer_x - x;
            let dy = pointer_y - y;
            let d2 = dx * dx + dy * dy;
            let pull = d2.simd_gt(min_d2);
            if pull.any() {
                let dist = d2.sqrt();
                vx = pull.select(vx + (dx / dist) * force, vx);
                vy = pull.select(vy + (dy / dist) * force, vy);
            }
        }

        x = x + (vx * dt + pan_x);
        y = y + (vy * dt + pan_y);

        if k.boundary == BoundaryPolicy::ReflectClamp {
            let lo = x.simd_lt(zero);
            let hi = x.simd_gt(max_x);
            x = lo.select(zero, hi.select(max_x, x));
            vx = lo.or(hi).select(-vx, vx);

            let lo = y.simd_lt(zero);
            let hi = y.simd_gt(max_y);
            y = lo.select(zero, hi.select(max_y, y));
            vy = lo.or(hi).select(-vy, vy);
        }

        vx = vx * friction;
        vy = vy * friction;

        if let Some(d) = damping {
            vx = vx * d;
            vy = vy * d;
        }

        x.store(cx);
        y.store(cy);
        vx.store(cvx);
        vy.store(cvy);
    }
}

/// Integrate one worker's partition: lanes over the aligned prefix, scalar
/// over the tail.
pub fn integrate_partition(part: KinematicSlicesMut<'_>, k: &TickConstants) {
    let aligned = aligned_len(part.len());
    let (head, tail) = part.split_at(aligned);
    integrate_lanes(head, k);
    integrate_scalar(tail, k);
}

/// Advance every particle in `store` by one tick across the pool.
pub fn tick(pool: &WorkerPool, store: &mut ParticleStore, k: &TickConstants) {
    let parts = pool.split_mut(store.kinematics_mut());
    pool.run_partitions(parts, |_, part| integrate_partition(part, k));
}
