//! Shaped-power detector: the compression curve (linear / knee / ratio)
//! and the per-division running average with adaptive release.

use crate::config::DrcRuntimeParams;
use crate::math::{knee_expf, linear_to_decibels, sanitize};
use crate::NEG_TWO_DB;

/// `knee_alpha + knee_beta * exp(-K * x)` — the knee region's curve value
/// before dividing by `x` to get a gain.
#[inline]
fn knee_curve_k(params: &DrcRuntimeParams, x: f32) -> f32 {
    params.knee_alpha + params.knee_beta * knee_expf(-params.k * x)
}

/// The compression curve: maps an absolute input amplitude to the gain
/// that would be applied if the compressor instantaneously tracked it.
///
/// - below `linear_threshold`: unity.
/// - below `knee_threshold`: the smooth knee curve, `knee_curve_k(x) / x`.
/// - above: the constant-ratio branch, `ratio_base * x^(slope - 1)`.
pub fn volume_gain(params: &DrcRuntimeParams, x: f32) -> f32 {
    if x < params.linear_threshold {
        1.0
    } else if x < params.knee_threshold {
        knee_curve_k(params, x) / x
    } else {
        params.ratio_base * knee_expf(libm::logf(x) * (params.slope - 1.0))
    }
}

/// Advance `detector_average` by one sample's shaped gain, in place.
///
/// Release is adaptive: very loud input (`gain > NEG_TWO_DB`) decays fast
/// via `sat_release_rate_at_neg_two_db`; quieter releases use a
/// dB-proportional rate. Attack tracks the new gain immediately.
#[inline]
pub fn update_detector_average_sample(
    params: &DrcRuntimeParams,
    detector_average: &mut f32,
    abs_input: f32,
) {
    let gain = volume_gain(params, abs_input);
    let mut avg = *detector_average;

    if gain > avg {
        // Release: level has dropped, average is free to rise back up.
        if gain > NEG_TWO_DB {
            avg += (gain - avg) * params.sat_release_rate_at_neg_two_db;
        } else {
            let gain_db = linear_to_decibels(gain);
            let rate =
                crate::math::decibels_to_linear(gain_db * params.sat_release_frames_inv_neg) - 1.0;
            avg += (gain - avg) * rate;
        }
    } else {
        // Attack: level has risen, average tracks it immediately.
        avg = gain;
    }

    avg = sanitize(avg, 1.0);
    *detector_average = avg.min(1.0);
}

/// Run the detector over one division's worth of per-frame absolute input
/// (cross-channel max already taken), updating `detector_average` in
/// place. Spec invariant: `0 < detector_average <= 1` after every sample.
pub fn update_detector_average(
    params: &DrcRuntimeParams,
    detector_average: &mut f32,
    abs_input: &[f32],
) {
    for &x in abs_input {
        update_detector_average_sample(params, detector_average, x);
    }
}
