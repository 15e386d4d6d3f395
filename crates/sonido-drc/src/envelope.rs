//! Attack/release envelope follower: converts the detector's
//! `detector_average` into a per-sample gain trajectory.

use crate::config::DrcRuntimeParams;
use crate::math::{decibels_to_linear, linear_to_decibels, sanitize, warp_asinf};
use libm::powf;

/// Per-division state the envelope carries forward between calls: the
/// running peak of attack `compression_diff_db`, reset on entering
/// release.
#[derive(Debug, Clone, Copy)]
pub struct EnvelopeState {
    pub max_attack_compression_diff_db: f32,
}

impl EnvelopeState {
    /// The sentinel this resets to on entering release: any finite
    /// `compression_diff_db` will exceed it immediately.
    pub const NEG_SENTINEL: f32 = f32::NEG_INFINITY;

    pub fn new() -> Self {
        Self {
            max_attack_compression_diff_db: Self::NEG_SENTINEL,
        }
    }
}

impl Default for EnvelopeState {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of one envelope update: the per-sample multiplicative slew and
/// the pre-warped desired gain output compression applies toward.
#[derive(Debug, Clone, Copy)]
pub struct EnvelopeUpdate {
    pub envelope_rate: f32,
    pub scaled_desired_gain: f32,
    pub is_releasing: bool,
}

/// Run one envelope update. `compressor_gain` is read but not written here
/// (output compression advances it); `state` carries the attack peak
/// across divisions.
pub fn update_envelope(
    params: &DrcRuntimeParams,
    detector_average: f32,
    compressor_gain: f32,
    state: &mut EnvelopeState,
) -> EnvelopeUpdate {
    let desired_gain = detector_average;
    let scaled_desired_gain = warp_asinf(desired_gain);
    let is_releasing = scaled_desired_gain > compressor_gain;
    let compression_diff_db = linear_to_decibels(compressor_gain / scaled_desired_gain);

    let envelope_rate = if is_releasing {
        state.max_attack_compression_diff_db = EnvelopeState::NEG_SENTINEL;
        let diff_db = sanitize(compression_diff_db, -1.0);

        let x = diff_db.clamp(-12.0, 0.0);
        let x = 0.25 * (x + 12.0);
        let x2 = x * x;
        let x3 = x2 * x;
        let x4 = x3 * x;

        let [k_a, k_b, k_c, k_d, k_e] = params.release_poly;
        let release_frames = k_a + k_b * x + k_c * x2 + k_d * x3 + k_e * x4;

        decibels_to_linear(5.0 / release_frames)
    } else {
        let diff_db = sanitize(compression_diff_db, 1.0);
        state.max_attack_compression_diff_db =
            state.max_attack_compression_diff_db.max(diff_db);
        let eff = state.max_attack_compression_diff_db.max(0.5);

        1.0 - powf(0.25 / eff, 1.0 / params.attack_frames)
    };

    EnvelopeUpdate {
        envelope_rate,
        scaled_desired_gain,
        is_releasing,
    }
}
