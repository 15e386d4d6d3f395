//! Pure numeric primitives for the compressor: dB/linear conversion, the
//! sin/asin gain-trajectory warp, the knee exponential, and Q-format
//! conversion. No state; every function is a total function of its inputs.

#![allow(clippy::excessive_precision)]

use libm::{asinf, expf, logf, sinf};

/// `decibels_to_linear(x) = exp(0.11512925 * x)` (= `10^(x/20)`).
///
/// Identical formula to [`sonido_core::math::db_to_linear`] (same
/// `LN_10/20` constant); re-exported under the compressor's naming so the
/// rest of this crate reads against the spec's vocabulary.
#[inline]
pub fn decibels_to_linear(x: f32) -> f32 {
    sonido_core::math::db_to_linear(x)
}

/// `linear_to_decibels(x) = 8.6858896 * ln(x)` for `x > 0`, else the floor
/// value `-1000`.
///
/// `sonido_core::math::linear_to_db` clamps its argument at `1e-10` rather
/// than returning a hard floor, so this is not a re-export: the compressor
/// needs `-1000` exactly for non-positive inputs (detector/envelope code
/// relies on it as a recognizable sentinel-like floor, see spec property
/// 10), not an approximation.
#[inline]
pub fn linear_to_decibels(x: f32) -> f32 {
    const FACTOR: f32 = 20.0 / core::f32::consts::LN_10;
    if x > 0.0 { logf(x) * FACTOR } else { -1000.0 }
}

/// `sin((pi/2) * x)`, the forward half of the attack/release gain warp.
///
/// Mutual inverse of [`warp_asinf`] on `[-1, 1]`.
#[inline]
pub fn warp_sinf(x: f32) -> f32 {
    sinf(core::f32::consts::FRAC_PI_2 * x)
}

/// `asin(x) * (2/pi)`, the inverse half of the attack/release gain warp.
#[inline]
pub fn warp_asinf(x: f32) -> f32 {
    asinf(x) * core::f32::consts::FRAC_2_PI
}

/// `exp(x)`, named for locality at call sites in the knee curve. Callers
/// pass negative arguments to keep values bounded.
#[inline]
pub fn knee_expf(x: f32) -> f32 {
    expf(x)
}

/// True iff `x` is non-zero and not a normal finite number (NaN, subnormal,
/// +/-inf). Zero is considered "good" — it is a legitimate detector value.
#[inline]
pub fn isbadf(x: f32) -> bool {
    x != 0.0 && !x.is_normal()
}

/// Replace `x` with `default` if [`isbadf`] flags it as a runtime anomaly.
///
/// Centralizes the "fix gremlins" pattern at exactly the call sites the
/// engine documents: the detector average, and the attack/release
/// `compression_diff_db` values.
#[inline]
pub fn sanitize(x: f32, default: f32) -> f32 {
    if isbadf(x) { default } else { x }
}

/// Signed fixed-point value with `FRAC` fractional bits, stored as `i32`.
///
/// Used only at persistent-state / wire-format boundaries (`DrcConfig`,
/// the chunked configuration blob); every per-sample computation happens in
/// `f32` and converts to `Qn` only when the result must be stored or
/// transmitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Qn<const FRAC: u32>(i32);

impl<const FRAC: u32> Qn<FRAC> {
    /// Raw fixed-point representation.
    #[inline]
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// Raw fixed-point representation.
    #[inline]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Convert a float into this Q-format, saturating to `i32::MIN..=i32::MAX`.
    #[inline]
    pub fn from_f32(value: f32) -> Self {
        let scaled = value * (1i64 << FRAC) as f32;
        let saturated = scaled.clamp(i32::MIN as f32, i32::MAX as f32);
        Self(saturated.round() as i32)
    }

    /// Convert back to float: `raw * 2^-FRAC`.
    #[inline]
    pub fn to_f32(self) -> f32 {
        self.0 as f32 / (1i64 << FRAC) as f32
    }
}

/// `q_to_float(v, n) = v * 2^-n`. Free-function form for code porting
/// directly from the Q-format conversion macro in the original source.
#[inline]
pub fn q_to_float(v: i32, n: u32) -> f32 {
    v as f32 / (1i64 << n) as f32
}

/// `float_to_q(f, n) = round(saturate(f * 2^n))`.
#[inline]
pub fn float_to_q(f: f32, n: u32) -> i32 {
    let scaled = f * (1i64 << n) as f32;
    scaled.clamp(i32::MIN as f32, i32::MAX as f32).round() as i32
}
