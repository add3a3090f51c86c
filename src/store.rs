//! Structure-of-arrays particle storage.
//!
//! Positions, velocities and colors live in five parallel arrays so the
//! physics kernel can stream each component through SIMD lanes. The arrays
//! are private; the only way to change their length is to reallocate all
//! of them together.

/// Five parallel arrays describing `N` particles.
#[derive(Debug, Clone, Default)]
pub struct ParticleStore {
    pos_x: Vec<f32>,
    pos_y: Vec<f32>,
    vel_x: Vec<f32>,
    vel_y: Vec<f32>,
    color: Vec<u32>,
}

/// Mutable view of every array in a store (or of one partition of it).
///
/// All five slices always have the same length.
#[derive(Debug)]
pub struct ParticleSlicesMut<'a> {
    pub pos_x: &'a mut [f32],
    pub pos_y: &'a mut [f32],
    pub vel_x: &'a mut [f32],
    pub vel_y: &'a mut [f32],
    pub color: &'a mut [u32],
}

/// Mutable positions and velocities only. Colors stay read-only during
/// simulation, so the physics kernel gets this narrower view.
#[derive(Debug)]
pub struct KinematicSlicesMut<'a> {
    pub pos_x: &'a mut [f32],
    pub pos_y: &'a mut [f32],
    pub vel_x: &'a mut [f32],
    pub vel_y: &'a mut [f32],
}

/// Read-only view of a store's positions and colors, used by the rasterizer.
#[derive(Debug, Clone, Copy)]
pub struct ParticleSlices<'a> {
    pub pos_x: &'a [f32],
    pub pos_y: &'a [f32],
    pub color: &'a [u32],
}

impl ParticleStore {
    /// Allocate `count` particles at the origin, at rest, fully transparent.
    pub fn new(count: usize) -> Self {
        Self {
            pos_x: vec![0.0; count],
            pos_y: vec![0.0; count],
            vel_x: vec![0.0; count],
            vel_y: vec![0.0; count],
            color: vec![0; count],
        }
    }

    /// Replace every array with a fresh allocation of `count` particles.
    pub fn reallocate(&mut self, count: usize) {
        *self = Self::new(count);
    }

    /// Number of particles.
    #[inline]
    pub fn len(&self) -> usize {
        self.pos_x.len()
    }

    /// Check if the store holds no particles.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pos_x.is_empty()
    }

    pub fn pos_x(&self) -> &[f32] {
        &self.pos_x
    }

    pub fn pos_y(&self) -> &[f32] {
        &self.pos_y
    }

    pub fn vel_x(&self) -> &[f32] {
        &self.vel_x
    }

    pub fn vel_y(&self) -> &[f32] {
        &self.vel_y
    }

    pub fn color(&self) -> &[u32] {
        &self.color
    }

    /// Position of particle `i`.
    #[inline]
    pub fn position(&self, i: usize) -> (f32, f32) {
        (self.pos_x[i], self.pos_y[i])
    }

    /// Velocity of particle `i`.
    #[inline]
    pub fn velocity(&self, i: usize) -> (f32, f32) {
        (self.vel_x[i], self.vel_y[i])
    }

    /// Borrow every array mutably at once.
    pub fn slices_mut(&mut self) -> ParticleSlicesMut<'_> {
        ParticleSlicesMut {
            pos_x: &mut self.pos_x,
            pos_y: &mut self.pos_y,
            vel_x: &mut self.vel_x,
            vel_y: &mut self.vel_y,
            color: &mut self.color,
        }
    }

    /// Borrow positions and velocities mutably.
    pub fn kinematics_mut(&mut self) -> KinematicSlicesMut<'_> {
        KinematicSlicesMut {
            pos_x: &mut self.pos_x,
            pos_y: &mut self.pos_y,
            vel_x: &mut self.vel_x,
            vel_y: &mut self.vel_y,
        }
    }

    /// Borrow the arrays the rasterizer reads.
    pub fn slices(&self) -> ParticleSlices<'_> {
        ParticleSlices {
            pos_x: &self.pos_x,
            pos_y: &self.pos_y,
            color: &self.color,
        }
    }

    /// Mean Euclidean distance from every particle to `(x, y)`.
    ///
    /// Accumulates in `f64` so the result stays stable for large stores.
    pub fn mean_distance_to(&self, x: f32, y: f32) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let sum: f64 = self
            .pos_x
            .iter()
            .zip(&self.pos_y)
            .map(|(&px, &py)| {
                let dx = (px - x) as f64;
                let dy = (py - y) as f64;
                (dx * dx + dy * dy).sqrt()
            })
            .sum();
        sum / self.len() as f64
    }
}

impl<'a> ParticleSlicesMut<'a> {
    /// Number of particles in this view.
    #[inline]
    pub fn len(&self) -> usize {
        self.pos_x.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pos_x.is_empty()
    }

    /// Write one particle.
    #[inline]
    pub fn set(&mut self, i: usize, x: f32, y: f32, color: u32) {
        self.pos_x[i] = x;
        self.pos_y[i] = y;
        self.vel_x[i] = 0.0;
        self.vel_y[i] = 0.0;
        self.color[i] = color;
    }
}

impl<'a> KinematicSlicesMut<'a> {
    #[inline]
    pub fn len(&self) -> usize {
        self.pos_x.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pos_x.is_empty()
    }

    /// Split into the first `mid` particles and the rest.
    pub fn split_at(self, mid: usize) -> (KinematicSlicesMut<'a>, KinematicSlicesMut<'a>) {
        let (px0, px1) = self.pos_x.split_at_mut(mid);
        let (py0, py1) = self.pos_y.split_at_mut(mid);
        let (vx0, vx1) = self.vel_x.split_at_mut(mid);
        let (vy0, vy1) = self.vel_y.split_at_mut(mid);
        (
            KinematicSlicesMut {
                pos_x: px0,
                pos_y: py0,
                vel_x: vx0,
                vel_y: vy0,
            },
            KinematicSlicesMut {
                pos_x: px1,
                pos_y: py1,
                vel_x: vx1,
                vel_y: vy1,
            },
        )
    }
}

impl<'a> ParticleSlices<'a> {
    #[inline]
    pub fn len(&self) -> usize {
        self.pos_x.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pos_x.is_empty()
    }

    /// Sub-view over `range`.
    pub fn range(&self, range: std::ops::Range<usize>) -> ParticleSlices<'a> {
        ParticleSlices {
            pos_x: &self.pos_x[range.clone()],
            pos_y: &self.pos_y[range.clone()],
            color: &self.color[range],
        }
    }
}
