//! Four-wide `f32` lanes for the physics kernel.
//!
//! On x86_64 the lanes map onto SSE registers (SSE and SSE2 are part of the
//! x86_64 baseline, so no runtime detection is needed). Every other target
//! gets a plain array implementation with the same interface.
//!
//! Each lane operation is the single-precision IEEE operation the scalar
//! code uses (`+`, `-`, `*`, `/`, `sqrt`, sign flip, ordered compares), with
//! no fused multiply-add, so a lane computes bit-for-bit what the scalar
//! path computes for the same element.

use std::ops::{Add, Div, Mul, Neg, Sub};

/// Number of `f32` elements processed per vector step.
pub const LANES: usize = 4;

/// Largest multiple of [`LANES`] that fits in `len`.
#[inline]
pub const fn aligned_len(len: usize) -> usize {
    len - len % LANES
}

#[cfg(target_arch = "x86_64")]
mod imp {
    use super::LANES;
    use std::arch::x86_64::*;

    #[derive(Clone, Copy, Debug)]
    pub struct F32x4(__m128);

    #[derive(Clone, Copy, Debug)]
    pub struct Mask4(__m128);

    impl F32x4 {
        #[inline(always)]
        pub fn splat(v: f32) -> Self {
            // SAFETY: SSE and SSE2 are baseline on x86_64; register operands only.
            unsafe { Self(_mm_set1_ps(v)) }
        }

        #[inline(always)]
        pub fn load(src: &[f32]) -> Self {
            assert!(src.len() >= LANES);
            // SAFETY: length checked above; loadu has no alignment requirement.
            unsafe { Self(_mm_loadu_ps(src.as_ptr())) }
        }

        #[inline(always)]
        pub fn store(self, dst: &mut [f32]) {
            assert!(dst.len() >= LANES);
            // SAFETY: length checked above; storeu has no alignment requirement.
            unsafe { _mm_storeu_ps(dst.as_mut_ptr(), self.0) }
        }

        #[inline(always)]
        pub fn sqrt(self) -> Self {
            // SAFETY: SSE and SSE2 are baseline on x86_64; register operands only.
            unsafe { Self(_mm_sqrt_ps(self.0)) }
        }

        #[inline(always)]
        pub fn simd_gt(self, rhs: Self) -> Mask4 {
            // SAFETY: SSE and SSE2 are baseline on x86_64; register operands only.
            unsafe { Mask4(_mm_cmpgt_ps(self.0, rhs.0)) }
        }

        #[inline(always)]
        pub fn simd_lt(self, rhs: Self) -> Mask4 {
            // SAFETY: SSE and SSE2 are baseline on x86_64; register operands only.
            unsafe { Mask4(_mm_cmplt_ps(self.0, rhs.0)) }
        }

        #[inline(always)]
        pub fn to_array(self) -> [f32; LANES] {
            let mut out = [0.0; LANES];
            self.store(&mut out);
            out
        }

        #[inline(always)]
        pub(super) fn add_impl(self, rhs: Self) -> Self {
            // SAFETY: SSE and SSE2 are baseline on x86_64; register operands only.
            unsafe { Self(_mm_add_ps(self.0, rhs.0)) }
        }

        #[inline(always)]
        pub(super) fn sub_impl(self, rhs: Self) -> Self {
            // SAFETY: SSE and SSE2 are baseline on x86_64; register operands only.
            unsafe { Self(_mm_sub_ps(self.0, rhs.0)) }
        }

        #[inline(always)]
        pub(super) fn mul_impl(self, rhs: Self) -> Self {
            // SAFETY: SSE and SSE2 are baseline on x86_64; register operands only.
            unsafe { Self(_mm_mul_ps(self.0, rhs.0)) }
        }

        #[inline(always)]
        pub(super) fn div_impl(self, rhs: Self) -> Self {
            // SAFETY: SSE and SSE2 are baseline on x86_64; register operands only.
            unsafe { Self(_mm_div_ps(self.0, rhs.0)) }
        }

        #[inline(always)]
        pub(super) fn neg_impl(self) -> Self {
            // SAFETY: SSE and SSE2 are baseline on x86_64; register operands only.
            unsafe { Self(_mm_xor_ps(self.0, _mm_set1_ps(-0.0))) }
        }
    }

    impl Mask4 {
        /// True if any lane is set.
        #[inline(always)]
        pub fn any(self) -> bool {
            // SAFETY: SSE and SSE2 are baseline on x86_64; register operands only.
            unsafe { _mm_movemask_ps(self.0) != 0 }
        }

        #[inline(always)]
        pub fn or(self, rhs: Self) -> Self {
            // SAFETY: SSE and SSE2 are baseline on x86_64; register operands only.
            unsafe { Self(_mm_or_ps(self.0, rhs.0)) }
        }

        /// Lane-wise `if mask { on_true } else { on_false }`.
        #[inline(always)]
        pub fn select(self, on_true: F32x4, on_false: F32x4) -> F32x4 {
            // SAFETY: SSE and SSE2 are baseline on x86_64; register operands only.
            unsafe {
                F32x4(_mm_or_ps(
                    _mm_and_ps(self.0, on_true.0),
                    _mm_andnot_ps(self.0, on_false.0),
                ))
            }
        }
    }
}

#[cfg(not(target_arch = "x86_64"))]
mod imp {
    use super::LANES;

    #[derive(Clone, Copy, Debug)]
    pub struct F32x4([f32; LANES]);

    #[derive(Clone, Copy, Debug)]
    pub struct Mask4([bool; LANES]);

    impl F32x4 {
        #[inline(always)]
        pub fn splat(v: f32) -> Self {
            Self([v; LANES])
        }

        #[inline(always)]
        pub fn load(src: &[f32]) -> Self {
            let mut lanes = [0.0; LANES];
            lanes.copy_from_slice(&src[..LANES]);
            Self(lanes)
        }

        #[inline(always)]
        pub fn store(self, dst: &mut [f32]) {
            dst[..LANES].copy_from_slice(&self.0);
        }

        #[inline(always)]
        pub fn sqrt(self) -> Self {
            Self(self.0.map(f32::sqrt))
        }

        #[inline(always)]
        pub fn simd_gt(self, rhs: Self) -> Mask4 {
            Mask4(std::array::from_fn(|i| self.0[i] > rhs.0[i]))
        }

        #[inline(always)]
        pub fn simd_lt(self, rhs: Self) -> Mask4 {
            Mask4(std::array::from_fn(|i| self.0[i] < rhs.0[i]))
        }

        #[inline(always)]
        pub fn to_array(self) -> [f32; LANES] {
            self.0
        }

        #[inline(always)]
        pub(super) fn add_impl(self, rhs: Self) -> Self {
            Self(std::array::from_fn(|i| self.0[i] + rhs.0[i]))
        }

        #[inline(always)]
        pub(super) fn sub_impl(self, rhs: Self) -> Self {
            Self(std::array::from_fn(|i| self.0[i] - rhs.0[i]))
        }

        #[inline(always)]
        pub(super) fn mul_impl(self, rhs: Self) -> Self {
            Self(std::array::from_fn(|i| self.0[i] * rhs.0[i]))
        }

        #[inline(always)]
        pub(super) fn div_impl(self, rhs: Self) -> Self {
            Self(std::array::from_fn(|i| self.0[i] / rhs.0[i]))
        }

        #[inline(always)]
        pub(super) fn neg_impl(self) -> Self {
            Self(self.0.map(|v| -v))
        }
    }

    impl Mask4 {
        #[inline(always)]
        pub fn any(self) -> bool {
            self.0.iter().any(|&m| m)
        }

        #[inline(always)]
        pub fn or(self, rhs: Self) -> Self {
            Self(std::array::from_fn(|i| self.0[i] || rhs.0[i]))
        }

        #[inline(always)]
        pub fn select(self, on_true: F32x4, on_false: F32x4) -> F32x4 {
            F32x4(std::array::from_fn(|i| {
                if self.0[i] {
                    on_true.0[i]
                } else {
                    on_false.0[i]
                }
            }))
        }
    }
}

pub use imp::{F32x4, Mask4};

impl Add for F32x4 {
    type Output = Self;
    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        self.add_impl(rhs)
    }
}

impl Sub for F32x4 {
    type Output = Self;
    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        self.sub_impl(rhs)
    }
}

impl Mul for F32x4 {
    type Output = Self;
    #[inline(always)]
    fn mul(self, rhs: Self) -> Self {
        self.mul_impl(rhs)
    }
}

impl Div for F32x4 {
    type Output = Self;
    #[inline(always)]
    fn div(self, rhs: Self) -> Self {
        self.div_impl(rhs)
    }
}

impl Neg for F32x4 {
    type Output = Self;
    #[inline(always)]
    fn neg(self) -> Self {
        self.neg_impl()
    }
}
