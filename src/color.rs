//! Perceptual color mapping.
//!
//! Particles are colored in the OKLab space and converted once, at layout
//! time, to packed 32-bit ARGB. The conversion is a fixed closed-form
//! transform, so the same inputs always produce the same bits.

/// Lightness used by every procedural layout.
pub const LAYOUT_LIGHTNESS: f32 = 0.7;

/// Chroma radius used by every procedural layout.
pub const LAYOUT_CHROMA: f32 = 0.25;

/// Opaque alpha in the top byte.
pub const OPAQUE: u32 = 0xFF00_0000;

/// Convert an OKLab color to packed, fully opaque ARGB.
///
/// Channels are scaled to `[0, 255]` by truncation and clamped, matching
/// the integer conversion used by the display path.
pub fn oklab_to_argb(l: f32, a: f32, b: f32) -> u32 {
    let lp = l + 0.396_337_78 * a + 0.215_803_76 * b;
    let mp = l - 0.105_561_34 * a + 0.078_235_37 * b;
    let sp = l - 0.308_175_8 * a - 1.073_251_4 * b;

    let l3 = lp * lp * lp;
    let m3 = mp * mp * mp;
    let s3 = sp * sp * sp;

    let r = 4.076_741_7 * l3 - 3.307_711_6 * m3 + 0.230_969_94 * s3;
    let g = -1.268_438 * l3 + 2.609_757_4 * m3 - 0.341_319_4 * s3;
    let bl = -0.004_196_086_3 * l3 - 0.703_418_6 * m3 + 1.707_614_7 * s3;

    OPAQUE | (to_byte(r) << 16) | (to_byte(g) << 8) | to_byte(bl)
}

/// Layout color in the `(cos, sin)` direction of the OKLab a/b plane,
/// scaled by [`LAYOUT_CHROMA`]. Directions shorter than one desaturate.
#[inline]
pub fn chroma_color(cos: f64, sin: f64) -> u32 {
    let c = LAYOUT_CHROMA as f64;
    oklab_to_argb(LAYOUT_LIGHTNESS, (c * cos) as f32, (c * sin) as f32)
}

/// Split a packed color into `[a, r, g, b]` bytes.
#[inline]
pub fn unpack_argb(color: u32) -> [u8; 4] {
    color.to_be_bytes()
}

/// sRGB transfer curve.
#[inline]
fn srgb_gamma(linear: f32) -> f32 {
    if linear <= 0.003_130_8 {
        linear * 12.92
    } else {
        1.055 * linear.powf(1.0 / 2.4) - 0.055
    }
}

#[inline]
fn to_byte(linear: f32) -> u32 {
    // `as i32` truncates toward zero and saturates NaN to 0
    let v = (srgb_gamma(linear) * 255.0) as i32;
    v.clamp(0, 255) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_achromatic_is_gray() {
        let [alpha, r, g, b] = unpack_argb(oklab_to_argb(0.7, 0.0, 0.0));
        assert_eq!(alpha, 0xFF);
        assert!(r.abs_diff(g) <= 1 && g.abs_diff(b) <= 1, "{r} {g} {b}");
        assert!((150..=165).contains(&r), "unexpected gray level {r}");
    }

    #[test]
    fn test_black_and_white_ends() {
        assert_eq!(oklab_to_argb(0.0, 0.0, 0.0), OPAQUE);

        let [_, r, g, b] = unpack_argb(oklab_to_argb(1.0, 0.0, 0.0));
        assert!(r >= 254 && g >= 254 && b >= 254);
    }

    #[test]
    fn test_out_of_gamut_is_clamped() {
        let [_, r, g, b] = unpack_argb(oklab_to_argb(2.0, 0.5, -0.5));
        // every channel saturates or stays inside the byte range
        assert!(r == 255 || g == 255 || b == 255);
        let [_, r, g, b] = unpack_argb(oklab_to_argb(-1.0, 0.0, 0.0));
        assert_eq!((r, g, b), (0, 0, 0));
    }

    #[test]
    fn test_hue_circle_is_colorful() {
        // Opposite hues on the circle should differ clearly.
        let [_, r0, g0, b0] = unpack_argb(chroma_color(1.0, 0.0));
        let [_, r1, g1, b1] = unpack_argb(chroma_color(-1.0, 0.0));
        let diff = r0.abs_diff(r1) as u32 + g0.abs_diff(g1) as u32 + b0.abs_diff(b1) as u32;
        assert!(diff > 100, "hues too similar: {diff}");
    }

    #[test]
    fn test_zero_direction_is_gray() {
        assert_eq!(chroma_color(0.0, 0.0), oklab_to_argb(LAYOUT_LIGHTNESS, 0.0, 0.0));
    }

    #[test]
    fn test_reproducible_bits() {
        for i in 0..64 {
            let a = (i as f32 / 64.0 - 0.5) * 0.5;
            assert_eq!(oklab_to_argb(0.7, a, -a), oklab_to_argb(0.7, a, -a));
        }
    }
}
