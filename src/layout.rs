//! Initial particle arrangements.
//!
//! Every layout overwrites positions and colors for the whole store and
//! zeroes all velocities. Procedural layouts color particles on the OKLab
//! chroma circle at a fixed lightness; the image layout copies pixel colors.
//!
//! Layouts run on one thread from a single [`XorShift64`] sequence, so a
//! given seed and call order always produce the same store.

use std::f64::consts::PI;

use crate::color::{chroma_color, OPAQUE};
use crate::error::LayoutError;
use crate::image_grid::RgbGrid;
use crate::rng::XorShift64;
use crate::store::ParticleStore;

/// Number of attractor points the multi-cluster layout blends between.
pub const CLUSTER_COUNT: usize = 5;

/// Fraction of the canvas kept clear of cluster centers on every side.
pub const CLUSTER_MARGIN: f32 = 0.12;

/// Available arrangements, in keyboard order (`1`..`4`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, clap::ValueEnum)]
pub enum Layout {
    /// Uniform over the canvas, hue by angle around the center.
    #[default]
    Square,
    /// Uniform over the canvas, hue blended from five random centers.
    MultiCluster,
    /// Random points in a centered disc.
    Disc,
    /// One particle per pixel of a downscaled image.
    Image,
}

impl Layout {
    pub const ALL: [Layout; 4] = [
        Layout::Square,
        Layout::MultiCluster,
        Layout::Disc,
        Layout::Image,
    ];

    /// Layout bound to number key `n` (1-based).
    pub fn from_number(n: u32) -> Option<Layout> {
        let idx = n.checked_sub(1)? as usize;
        Self::ALL.get(idx).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Layout::Square => "square",
            Layout::MultiCluster => "multi-cluster",
            Layout::Disc => "disc",
            Layout::Image => "image",
        }
    }
}

impl std::fmt::Display for Layout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Writes layouts into a [`ParticleStore`].
#[derive(Debug, Clone)]
pub struct Initializer {
    rng: XorShift64,
}

impl Default for Initializer {
    fn default() -> Self {
        Self::new(XorShift64::DEFAULT_SEED)
    }
}

impl Initializer {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: XorShift64::new(seed),
        }
    }

    /// Arrange every particle according to `layout` on a
    /// `width` x `height` canvas.
    ///
    /// Only [`Layout::Image`] can fail; on failure the store is unchanged.
    pub fn populate(
        &mut self,
        layout: Layout,
        store: &mut ParticleStore,
        width: u32,
        height: u32,
        image: Option<&RgbGrid>,
    ) -> Result<(), LayoutError> {
        match layout {
            Layout::Square => self.square(store, width, height),
            Layout::MultiCluster => self.multi_cluster(store, width, height),
            Layout::Disc => self.disc(store, width, height),
            Layout::Image => {
                let image = image.ok_or(LayoutError::MissingImage)?;
                place_image(store, width, height, image)?;
            }
        }
        Ok(())
    }

    // ========== Procedural layouts ==========

    /// Uniform over the canvas; hue is the angle to the canvas center.
    pub fn square(&mut self, store: &mut ParticleStore, width: u32, height: u32) {
        let (w, h) = (width as f32, height as f32);
        let (cx, cy) = (w / 2.0, h / 2.0);
        let mut s = store.slices_mut();

        for i in 0..s.len() {
            let x = w * self.rng.next_f32();
            let y = h * self.rng.next_f32();
            let angle = ((y - cy) as f64).atan2((x - cx) as f64);
            s.set(i, x, y, chroma_color(angle.cos(), angle.sin()));
        }
    }

    /// Uniform over the canvas; hue is a distance-weighted blend of the
    /// directions to [`CLUSTER_COUNT`] random centers.
    pub fn multi_cluster(&mut self, store: &mut ParticleStore, width: u32, height: u32) {
        let (w, h) = (width as f32, height as f32);
        let min_x = w * CLUSTER_MARGIN;
        let range_x = w * (1.0 - CLUSTER_MARGIN) - min_x;
        let min_y = h * CLUSTER_MARGIN;
        let range_y = h * (1.0 - CLUSTER_MARGIN) - min_y;

        let mut centers = [(0.0f32, 0.0f32); CLUSTER_COUNT];
        for c in centers.iter_mut() {
            *c = (
                min_x + range_x * self.rng.next_f32(),
                min_y + range_y * self.rng.next_f32(),
            );
        }

        let mut s = store.slices_mut();
        for i in 0..s.len() {
            let x = w * self.rng.next_f32();
            let y = h * self.rng.next_f32();

            let mut total_weight = 0.0f32;
            let mut blend_cos = 0.0f64;
            let mut blend_sin = 0.0f64;
            for &(tx, ty) in &centers {
                let dx = x - tx;
                let dy = y - ty;
                let weight = 1.0 / (dx * dx + dy * dy + 1.0);
                total_weight += weight;
                let angle = (dy as f64).atan2(dx as f64);
                blend_cos += angle.cos() * weight as f64;
                blend_sin += angle.sin() * weight as f64;
            }

            let total = total_weight as f64;
            s.set(i, x, y, chroma_color(blend_cos / total, blend_sin / total));
        }
    }

    /// Random points in a disc of radius `min(width, height) / 2` around the
    /// canvas center; hue is the polar angle.
    pub fn disc(&mut self, store: &mut ParticleStore, width: u32, height: u32) {
        let (cx, cy) = (width as f32 / 2.0, height as f32 / 2.0);
        let radius = (width.min(height) / 2) as f32;
        let mut s = store.slices_mut();

        for i in 0..s.len() {
            let d = self.rng.next_f32() * radius;
            let angle = (self.rng.next_f32() * 2.0) as f64 * PI;
            let (sin, cos) = angle.sin_cos();
            let color = chroma_color(cos, sin);
            s.set(i, cos as f32 * d + cx, sin as f32 * d + cy, color);
        }
    }
}

// ========== Image layout ==========

/// Lay particles out as the pixels of `image`, scaled to fit a
/// `⌊√N⌋` x `⌊√N⌋` box and centered on the canvas.
///
/// Pixel `(x, y)` of the scaled image goes to particle `y * scaled_w + x`,
/// at the pixel center. Particles beyond the pixel count repeat the placed
/// ones cyclically (particle `i` copies particle `i % pixel_count`).
pub fn place_image(
    store: &mut ParticleStore,
    width: u32,
    height: u32,
    image: &RgbGrid,
) -> Result<(), LayoutError> {
    let n = store.len();
    let side = (n as f64).sqrt().floor() as u32;
    let (sw, sh) = if image.is_empty() {
        (0, 0)
    } else {
        let (sw, sh) = image.fitted_size(side);
        (sw.min(side), sh.min(side))
    };
    let pixel_count = sw as usize * sh as usize;
    if pixel_count == 0 {
        return Err(LayoutError::EmptyImage {
            width: sw,
            height: sh,
        });
    }

    let scaled = image.resized(sw, sh);
    let off_x = (width as f32 - sw as f32) / 2.0;
    let off_y = (height as f32 - sh as f32) / 2.0;
    let mut s = store.slices_mut();

    for y in 0..sh {
        for x in 0..sw {
            let k = y as usize * sw as usize + x as usize;
            s.set(
                k,
                off_x + x as f32 + 0.5,
                off_y + y as f32 + 0.5,
                OPAQUE | scaled.rgb(x, y),
            );
        }
    }

    for i in pixel_count..n {
        let src = i % pixel_count;
        let (x, y, color) = (s.pos_x[src], s.pos_y[src], s.color[src]);
        s.set(i, x, y, color);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{oklab_to_argb, LAYOUT_CHROMA, LAYOUT_LIGHTNESS};

    /// Color at `(cos * chroma, sin * chroma)` worked out without the layout helpers.
    fn expected_color(cos: f64, sin: f64) -> u32 {
        let c = LAYOUT_CHROMA as f64;
        oklab_to_argb(LAYOUT_LIGHTNESS, (c * cos) as f32, (c * sin) as f32)
    }

    fn dirty_store(n: usize) -> ParticleStore {
        let mut store = ParticleStore::new(n);
        let mut s = store.slices_mut();
        s.vel_x.fill(3.0);
        s.vel_y.fill(-3.0);
        store
    }

    #[test]
    fn test_layout_keys() {
        assert_eq!(Layout::from_number(1), Some(Layout::Square));
        assert_eq!(Layout::from_number(2), Some(Layout::MultiCluster));
        assert_eq!(Layout::from_number(3), Some(Layout::Disc));
        assert_eq!(Layout::from_number(4), Some(Layout::Image));
        assert_eq!(Layout::from_number(0), None);
        assert_eq!(Layout::from_number(5), None);
    }

    #[test]
    fn test_square_in_domain() {
        let mut store = dirty_store(5000);
        Initializer::new(3).square(&mut store, 120, 80);
        for i in 0..store.len() {
            let (x, y) = store.position(i);
            assert!((0.0..120.0).contains(&x) && (0.0..80.0).contains(&y));
            assert_eq!(store.velocity(i), (0.0, 0.0));
            assert_eq!(store.color()[i] >> 24, 0xFF);
        }
    }

    #[test]
    fn test_disc_in_domain() {
        let mut store = dirty_store(5000);
        Initializer::new(9).disc(&mut store, 101, 60);
        // integer halving: radius 30
        for i in 0..store.len() {
            let (x, y) = store.position(i);
            let (dx, dy) = (x - 50.5, y - 30.0);
            assert!((dx * dx + dy * dy).sqrt() <= 30.0 + 1e-3);
            assert_eq!(store.velocity(i), (0.0, 0.0));
        }
    }

    #[test]
    fn test_multi_cluster_in_domain() {
        let mut store = dirty_store(2000);
        Initializer::new(5).multi_cluster(&mut store, 64, 64);
        for i in 0..store.len() {
            let (x, y) = store.position(i);
            assert!((0.0..64.0).contains(&x) && (0.0..64.0).contains(&y));
            assert_eq!(store.velocity(i), (0.0, 0.0));
        }
        let distinct: std::collections::HashSet<u32> = store.color().iter().copied().collect();
        assert!(distinct.len() > 10);
    }

    // ========== Exact colors ==========

    #[test]
    fn test_square_color_from_center_angle() {
        let mut store = ParticleStore::new(2);
        Initializer::new(11).square(&mut store, 100, 60);

        let mut rng = XorShift64::new(11);
        for i in 0..2 {
            let x = 100.0 * rng.next_f32();
            let y = 60.0 * rng.next_f32();
            let angle = ((y - 30.0) as f64).atan2((x - 50.0) as f64);
            assert_eq!(store.position(i), (x, y));
            assert_eq!(store.color()[i], expected_color(angle.cos(), angle.sin()));
        }
    }

    #[test]
    fn test_disc_color_from_polar_angle() {
        let mut store = ParticleStore::new(2);
        Initializer::new(23).disc(&mut store, 80, 50);

        let mut rng = XorShift64::new(23);
        for i in 0..2 {
            let d = rng.next_f32() * 25.0;
            let angle = (rng.next_f32() * 2.0) as f64 * PI;
            let (x, y) = (angle.cos() as f32 * d + 40.0, angle.sin() as f32 * d + 25.0);
            assert_eq!(store.position(i), (x, y));
            assert_eq!(store.color()[i], expected_color(angle.cos(), angle.sin()));
        }
    }

    #[test]
    fn test_multi_cluster_color_is_weighted_blend() {
        let (w, h) = (90.0f32, 70.0f32);
        let mut store = ParticleStore::new(2);
        Initializer::new(31).multi_cluster(&mut store, 90, 70);

        let mut rng = XorShift64::new(31);
        let (min_x, min_y) = (w * CLUSTER_MARGIN, h * CLUSTER_MARGIN);
        let range_x = w * (1.0 - CLUSTER_MARGIN) - min_x;
        let range_y = h * (1.0 - CLUSTER_MARGIN) - min_y;
        let centers: Vec<(f32, f32)> = (0..CLUSTER_COUNT)
            .map(|_| {
                let cx = min_x + range_x * rng.next_f32();
                let cy = min_y + range_y * rng.next_f32();
                (cx, cy)
            })
            .collect();

        for i in 0..2 {
            let x = w * rng.next_f32();
            let y = h * rng.next_f32();
            let mut total = 0.0f32;
            let (mut cos_sum, mut sin_sum) = (0.0f64, 0.0f64);
            for &(tx, ty) in &centers {
                let (dx, dy) = (x - tx, y - ty);
                let weight = 1.0 / (dx * dx + dy * dy + 1.0);
                total += weight;
                let angle = (dy as f64).atan2(dx as f64);
                cos_sum += angle.cos() * weight as f64;
                sin_sum += angle.sin() * weight as f64;
            }
            let total = total as f64;

            assert_eq!(store.position(i), (x, y));
            assert_eq!(store.color()[i], expected_color(cos_sum / total, sin_sum / total));
        }
    }

    #[test]
    fn test_same_seed_same_layout() {
        let mut a = ParticleStore::new(300);
        let mut b = ParticleStore::new(300);
        for layout in [Layout::Square, Layout::MultiCluster, Layout::Disc] {
            Initializer::new(77)
                .populate(layout, &mut a, 50, 40, None)
                .unwrap();
            Initializer::new(77)
                .populate(layout, &mut b, 50, 40, None)
                .unwrap();
            assert_eq!(a.pos_x(), b.pos_x());
            assert_eq!(a.pos_y(), b.pos_y());
            assert_eq!(a.color(), b.color());
        }
    }

    #[test]
    fn test_image_placement_and_overflow() {
        let grid = RgbGrid::from_fn(4, 4, |x, y| (y * 4 + x) * 0x10);
        let mut store = dirty_store(20);
        place_image(&mut store, 10, 10, &grid).unwrap();

        for y in 0..4u32 {
            for x in 0..4u32 {
                let k = (y * 4 + x) as usize;
                assert_eq!(store.position(k), (3.0 + x as f32 + 0.5, 3.0 + y as f32 + 0.5));
                assert_eq!(store.color()[k], OPAQUE | (k as u32 * 0x10));
            }
        }
        for i in 16..20 {
            assert_eq!(store.position(i), store.position(i % 16));
            assert_eq!(store.color()[i], store.color()[i % 16]);
            assert_eq!(store.velocity(i), (0.0, 0.0));
        }
    }

    #[test]
    fn test_image_too_small_leaves_store() {
        let grid = RgbGrid::from_fn(1, 4, |_, _| 0xFFFFFF);
        let mut store = dirty_store(3);
        let before = store.clone();
        let err = Initializer::default()
            .populate(Layout::Image, &mut store, 10, 10, Some(&grid))
            .unwrap_err();
        assert!(matches!(
            err,
            LayoutError::EmptyImage {
                width: 0,
                height: 1
            }
        ));
        assert_eq!(store.vel_x(), before.vel_x());
    }

    #[test]
    fn test_image_layout_without_image() {
        let mut store = dirty_store(10);
        let err = Initializer::default()
            .populate(Layout::Image, &mut store, 10, 10, None)
            .unwrap_err();
        assert!(matches!(err, LayoutError::MissingImage));
    }
}
