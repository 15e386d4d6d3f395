//! Output compression: applies gain to the division about to be read out
//! of the pre-delay, slewing `compressor_gain` geometrically toward
//! `scaled_desired_gain` over groups of 4 samples.

use crate::config::DrcRuntimeParams;
use crate::envelope::EnvelopeUpdate;
use crate::math::warp_sinf;
use crate::predelay::PreDelayLine;
use crate::DIVISION_FRAMES;

/// Apply output compression to one division, read from (and rewritten
/// into) the pre-delay ring(s) starting at `read_index`, across all
/// channels. Returns the updated `compressor_gain`.
///
/// `compressor_gain` is channel-shared: the spec's detector/envelope
/// operate on the cross-channel maximum, so one gain trajectory applies
/// to every channel's samples at the same position.
pub fn compress_output<const N: usize>(
    params: &DrcRuntimeParams,
    update: &EnvelopeUpdate,
    compressor_gain: f32,
    read_index: usize,
    rings: &mut [PreDelayLine<N>],
) -> f32 {
    debug_assert_eq!(DIVISION_FRAMES % 4, 0);
    let outer_steps = DIVISION_FRAMES / 4;

    let mut gain = compressor_gain;
    for step in 0..outer_steps {
        let base_index = read_index + step * 4;

        let group = if update.envelope_rate < 1.0 {
            attack_group(update, gain)
        } else {
            release_group(update, gain, step > 0)
        };

        for (j, &x) in group.iter().enumerate() {
            let g = warp_sinf(x);
            let total = params.master_linear_gain * g;
            for ring in rings.iter_mut() {
                ring.apply_gain(base_index + j, total);
            }
        }

        gain = group[3];
    }

    gain
}

/// Attack branch: `r = 1 - envelope_rate`, `c = compressor_gain -
/// scaled_desired_gain`, `base = scaled_desired_gain`; samples approach
/// `base` from above as `c` decays geometrically by `r` each step.
fn attack_group(update: &EnvelopeUpdate, compressor_gain: f32) -> [f32; 4] {
    let r = 1.0 - update.envelope_rate;
    let base = update.scaled_desired_gain;
    let c = compressor_gain - base;

    let r2 = r * r;
    let r3 = r2 * r;
    let r4 = r3 * r;

    [c * r + base, c * r2 + base, c * r3 + base, c * r4 + base]
}

/// Release branch: samples approach `1.0` (no `base` offset). The initial
/// outer step's `c·r, c·r², c·r³, c·r⁴` are left unclamped (matching the
/// original's threaded `x` array on its first pass); every subsequent step
/// clamps so the `warp_sinf` input never leaves its domain, since once a
/// position saturates to `1.0` it must stay there rather than being pushed
/// back out by another multiplication by `r`.
fn release_group(update: &EnvelopeUpdate, compressor_gain: f32, clamp: bool) -> [f32; 4] {
    let r = update.envelope_rate;
    let c = compressor_gain;

    let r2 = r * r;
    let r3 = r2 * r;
    let r4 = r3 * r;

    let group = [c * r, c * r2, c * r3, c * r4];
    if clamp {
        group.map(|x| x.min(1.0))
    } else {
        group
    }
}
