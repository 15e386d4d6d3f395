//! Named compressor configurations, standing in for the control-plane
//! presets a real pipeline host would upload as a binary blob (spec
//! §6.2). Values are chosen to exercise the curve shapes named in spec
//! §8's end-to-end scenarios, not derived from a topology/tuning tool
//! (no such tool is part of this crate's scope).

use anyhow::{bail, Result};
use sonido_drc::config::DrcConfig;
use sonido_drc::math::Qn;

/// Resolve a preset name to a configuration. `disabled` is pure
/// pass-through; the others differ in threshold/knee/ratio to make the
/// compression audible at different intensities.
pub fn by_name(name: &str) -> Result<DrcConfig> {
    match name {
        "disabled" => Ok(DrcConfig::disabled()),
        "gentle" => Ok(gentle()),
        "default" => Ok(default()),
        "heavy" => Ok(heavy()),
        other => bail!("unknown preset '{other}' (expected disabled, gentle, default, or heavy)"),
    }
}

/// Light compression: high threshold, shallow ratio.
pub fn gentle() -> DrcConfig {
    DrcConfig {
        enabled: true,
        pre_delay_time: 0.004,
        linear_threshold: Qn::from_f32(0.6),
        knee_threshold: Qn::from_f32(0.75),
        knee_alpha: Qn::from_f32(0.3),
        knee_beta: Qn::from_f32(0.08),
        k: Qn::from_f32(4.0),
        ratio_base: Qn::from_f32(1.05),
        slope: Qn::from_f32(0.5),
        master_linear_gain: Qn::from_f32(1.0),
        attack_frames: Qn::from_f32(15.0),
        sat_release_frames_inv_neg: Qn::from_f32(0.08),
        sat_release_rate_at_neg_two_db: Qn::from_f32(0.04),
        release_poly: release_poly_default(),
    }
}

/// Moderate compression: the shape used throughout the engine's own
/// `#[cfg(test)]` fixtures.
pub fn default() -> DrcConfig {
    DrcConfig {
        enabled: true,
        pre_delay_time: 0.008,
        linear_threshold: Qn::from_f32(0.4),
        knee_threshold: Qn::from_f32(0.5),
        knee_alpha: Qn::from_f32(0.25),
        knee_beta: Qn::from_f32(0.1),
        k: Qn::from_f32(5.0),
        ratio_base: Qn::from_f32(1.2),
        slope: Qn::from_f32(0.25),
        master_linear_gain: Qn::from_f32(1.0),
        attack_frames: Qn::from_f32(10.0),
        sat_release_frames_inv_neg: Qn::from_f32(0.1),
        sat_release_rate_at_neg_two_db: Qn::from_f32(0.05),
        release_poly: release_poly_default(),
    }
}

/// Aggressive limiting: low threshold, steep ratio, fast attack.
pub fn heavy() -> DrcConfig {
    DrcConfig {
        enabled: true,
        pre_delay_time: 0.008,
        linear_threshold: Qn::from_f32(0.2),
        knee_threshold: Qn::from_f32(0.3),
        knee_alpha: Qn::from_f32(0.15),
        knee_beta: Qn::from_f32(0.05),
        k: Qn::from_f32(6.0),
        ratio_base: Qn::from_f32(1.4),
        slope: Qn::from_f32(0.1),
        master_linear_gain: Qn::from_f32(1.1),
        attack_frames: Qn::from_f32(4.0),
        sat_release_frames_inv_neg: Qn::from_f32(0.15),
        sat_release_rate_at_neg_two_db: Qn::from_f32(0.08),
        release_poly: release_poly_default(),
    }
}

/// Shared release-curve polynomial: a mild monotonic ramp from ~1 frame
/// near 0 dB of compression up to a few frames at -12 dB, consistent with
/// spec §4.4's "more compression -> faster release" invariant.
fn release_poly_default() -> [Qn<12>; 5] {
    [
        Qn::from_f32(1.0),
        Qn::from_f32(2.0),
        Qn::from_f32(0.5),
        Qn::from_f32(0.0),
        Qn::from_f32(0.0),
    ]
}
