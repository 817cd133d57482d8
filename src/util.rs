
use std::fmt::Debug;

use bitflags::bitflags;
use cfg_if::cfg_if;

use crate::format::Storage;

#[cfg(target_arch = "x86_64")]
cpufeatures::new!(cpuid_avx2, "avx2");

#[cfg(target_arch = "x86_64")]
pub use cpuid_avx2::get as has_avx2;

/// A sample type that a plane can be stored as.
///
/// Integer samples are always unsigned and hold at most 16 significant bits,
/// floating point samples are stored as `f32`.
pub trait Pixel: Copy + Default + Debug + PartialOrd + Send + Sync + 'static {
    const STORAGE: Storage;

    #[must_use]
    fn to_f32(self) -> f32;

    /// Integer value of the sample. Float samples are truncated, which is
    /// never relied upon by the fixed-point paths.
    #[must_use]
    fn to_i32(self) -> i32;

    /// Converts a computed value back to storage. Integer targets round half
    /// to even and clamp to `[0, max_val]`, float targets are passed through.
    #[must_use]
    fn from_f64(val: f64, max_val: f64) -> Self;
}

impl Pixel for u8 {
    const STORAGE: Storage = Storage::U8;

    #[inline]
    fn to_f32(self) -> f32 {
        f32::from(self)
    }

    #[inline]
    fn to_i32(self) -> i32 {
        i32::from(self)
    }

    #[inline]
    fn from_f64(val: f64, max_val: f64) -> Self {
        clamp_round(val, max_val) as u8
    }
}

impl Pixel for u16 {
    const STORAGE: Storage = Storage::U16;

    #[inline]
    fn to_f32(self) -> f32 {
        f32::from(self)
    }

    #[inline]
    fn to_i32(self) -> i32 {
        i32::from(self)
    }

    #[inline]
    fn from_f64(val: f64, max_val: f64) -> Self {
        clamp_round(val, max_val) as u16
    }
}

impl Pixel for f32 {
    const STORAGE: Storage = Storage::F32;

    #[inline]
    fn to_f32(self) -> f32 {
        self
    }

    #[inline]
    fn to_i32(self) -> i32 {
        self as i32
    }

    #[inline]
    fn from_f64(val: f64, _max_val: f64) -> Self {
        val as f32
    }
}

/// Rounds half to even (`nearbyint` in the default rounding mode) and clamps
/// to the representable integer range. NaN maps to zero.
#[inline]
#[must_use]
pub fn clamp_round(val: f64, max_val: f64) -> f64 {
    if val.is_nan() {
        return 0.0;
    }
    val.round_ties_even().clamp(0.0, max_val)
}

#[must_use]
pub const fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

bitflags! {
    /// Instruction set extensions the convolution loops may use.
    ///
    /// Detected once by the caller and handed to every filter at construction,
    /// so that tests can pin a filter to the scalar code.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CpuFeatures: u8 {
        const AVX2 = 1 << 0;
    }
}

impl CpuFeatures {
    #[must_use]
    pub fn detect() -> Self {
        cfg_if! {
            if #[cfg(all(target_arch = "x86_64", not(feature = "no_simd")))] {
                if has_avx2() {
                    return Self::AVX2;
                }
            }
        }

        Self::empty()
    }
}
