//! Compressor configuration: the parameter table, its Q-format wire
//! representation, and the two-slot adoption rule — modeled as an owned
//! `current` plus `Option<pending>` rather than a pair of raw pointers.

use crate::error::DrcError;
use crate::math::Qn;
use crate::MAX_CONFIG_BYTES;

/// Number of `i32` fields serialized in the wire blob, in field order.
/// Kept in one place so `from_bytes`/`to_bytes` can't drift apart.
const FIELD_COUNT: usize = 16;

/// Compressor parameters, precomputed by the control plane and held
/// immutable for the duration of a division.
///
/// Q-format fields are stored at their wire fraction width; every
/// per-division computation converts to `f32` once, at adoption time
/// (see [`DrcConfig::to_runtime`]), and the hot path never touches `Qn`
/// again.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrcConfig {
    /// Pass-through when false.
    pub enabled: bool,
    /// Look-ahead time in seconds.
    pub pre_delay_time: f32,
    /// Below this linear amplitude, gain is unity. Q30.
    pub linear_threshold: Qn<30>,
    /// Below this linear amplitude, the knee curve applies. Q24.
    pub knee_threshold: Qn<24>,
    /// Knee curve constant. Q24.
    pub knee_alpha: Qn<24>,
    /// Knee curve constant. Q24.
    pub knee_beta: Qn<24>,
    /// Knee exponential rate. Q20.
    pub k: Qn<20>,
    /// Post-knee curve scale. Q30.
    pub ratio_base: Qn<30>,
    /// Post-knee curve exponent, in `(0, 1)`. Q30.
    pub slope: Qn<30>,
    /// Applied after compression. Q24.
    pub master_linear_gain: Qn<24>,
    /// Attack time in frames. Q20.
    pub attack_frames: Qn<20>,
    /// Detector release shaping. Q30.
    pub sat_release_frames_inv_neg: Qn<30>,
    /// Fast-release rate at -2 dB. Q30.
    pub sat_release_rate_at_neg_two_db: Qn<30>,
    /// Release-curve 4th order polynomial coefficients. Q12.
    pub release_poly: [Qn<12>; 5],
}

/// Q-format fields converted to `f32` once at adoption time; the per-division
/// hot path reads only this struct.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrcRuntimeParams {
    pub enabled: bool,
    pub pre_delay_time: f32,
    pub linear_threshold: f32,
    pub knee_threshold: f32,
    pub knee_alpha: f32,
    pub knee_beta: f32,
    pub k: f32,
    pub ratio_base: f32,
    pub slope: f32,
    pub master_linear_gain: f32,
    pub attack_frames: f32,
    pub sat_release_frames_inv_neg: f32,
    pub sat_release_rate_at_neg_two_db: f32,
    pub release_poly: [f32; 5],
}

impl DrcConfig {
    /// A disabled (pass-through) configuration — the default when no
    /// config blob has been uploaded.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            pre_delay_time: 0.0,
            linear_threshold: Qn::from_f32(0.0),
            knee_threshold: Qn::from_f32(0.0),
            knee_alpha: Qn::from_f32(0.0),
            knee_beta: Qn::from_f32(0.0),
            k: Qn::from_f32(0.0),
            ratio_base: Qn::from_f32(1.0),
            slope: Qn::from_f32(1.0),
            master_linear_gain: Qn::from_f32(1.0),
            attack_frames: Qn::from_f32(1.0),
            sat_release_frames_inv_neg: Qn::from_f32(0.0),
            sat_release_rate_at_neg_two_db: Qn::from_f32(0.0),
            release_poly: [Qn::from_f32(0.0); 5],
        }
    }

    /// Validate the field invariants: `linear_threshold <=
    /// knee_threshold`, `slope` a genuine compression ratio in `(0, 1)`,
    /// positive attack time.
    pub fn validate(&self) -> Result<(), DrcError> {
        let slope = self.slope.to_f32();
        if self.linear_threshold.to_f32() > self.knee_threshold.to_f32() {
            return Err(DrcError::ConfigMalformed(
                "linear_threshold must be <= knee_threshold",
            ));
        }
        if slope <= 0.0 || slope >= 1.0 {
            return Err(DrcError::ConfigMalformed("slope must be in (0, 1)"));
        }
        if self.attack_frames.to_f32() <= 0.0 {
            return Err(DrcError::ConfigMalformed("attack_frames must be > 0"));
        }
        Ok(())
    }

    /// Convert every Q-format field to `f32`, once, for the per-division
    /// hot path: all per-sample math runs in float from here on.
    pub fn to_runtime(&self) -> DrcRuntimeParams {
        DrcRuntimeParams {
            enabled: self.enabled,
            pre_delay_time: self.pre_delay_time,
            linear_threshold: self.linear_threshold.to_f32(),
            knee_threshold: self.knee_threshold.to_f32(),
            knee_alpha: self.knee_alpha.to_f32(),
            knee_beta: self.knee_beta.to_f32(),
            k: self.k.to_f32(),
            ratio_base: self.ratio_base.to_f32(),
            slope: self.slope.to_f32(),
            master_linear_gain: self.master_linear_gain.to_f32(),
            attack_frames: self.attack_frames.to_f32(),
            sat_release_frames_inv_neg: self.sat_release_frames_inv_neg.to_f32(),
            sat_release_rate_at_neg_two_db: self.sat_release_rate_at_neg_two_db.to_f32(),
            release_poly: self.release_poly.map(Qn::to_f32),
        }
    }

    /// Decode a configuration from its wire blob: `FIELD_COUNT` little-endian
    /// `i32` raw Q-format values, preceded by a one-byte `enabled` flag and
    /// a little-endian `f32` `pre_delay_time`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DrcError> {
        if bytes.len() > MAX_CONFIG_BYTES {
            return Err(DrcError::ConfigTooLarge {
                size: bytes.len(),
                max: MAX_CONFIG_BYTES,
            });
        }
        let header_len = 1 + 4;
        let body_len = FIELD_COUNT * 4;
        if bytes.len() < header_len + body_len {
            return Err(DrcError::ConfigMalformed("blob shorter than fixed layout"));
        }

        let enabled = bytes[0] != 0;
        let pre_delay_time = f32::from_le_bytes(bytes[1..5].try_into().unwrap());

        let mut raw = [0i32; FIELD_COUNT];
        for (i, chunk) in bytes[5..5 + body_len].chunks_exact(4).enumerate() {
            raw[i] = i32::from_le_bytes(chunk.try_into().unwrap());
        }

        let config = Self {
            enabled,
            pre_delay_time,
            linear_threshold: Qn::from_raw(raw[0]),
            knee_threshold: Qn::from_raw(raw[1]),
            knee_alpha: Qn::from_raw(raw[2]),
            knee_beta: Qn::from_raw(raw[3]),
            k: Qn::from_raw(raw[4]),
            ratio_base: Qn::from_raw(raw[5]),
            slope: Qn::from_raw(raw[6]),
            master_linear_gain: Qn::from_raw(raw[7]),
            attack_frames: Qn::from_raw(raw[8]),
            sat_release_frames_inv_neg: Qn::from_raw(raw[9]),
            sat_release_rate_at_neg_two_db: Qn::from_raw(raw[10]),
            release_poly: [
                Qn::from_raw(raw[11]),
                Qn::from_raw(raw[12]),
                Qn::from_raw(raw[13]),
                Qn::from_raw(raw[14]),
                Qn::from_raw(raw[15]),
            ],
        };
        config.validate()?;
        Ok(config)
    }

    /// Encode back into the wire layout `from_bytes` decodes.
    pub fn to_bytes(&self) -> alloc_or_stack::Blob {
        let mut out = alloc_or_stack::Blob::new();
        out.push(self.enabled as u8);
        out.extend(self.pre_delay_time.to_le_bytes());
        for raw in [
            self.linear_threshold.raw(),
            self.knee_threshold.raw(),
            self.knee_alpha.raw(),
            self.knee_beta.raw(),
            self.k.raw(),
            self.ratio_base.raw(),
            self.slope.raw(),
            self.master_linear_gain.raw(),
            self.attack_frames.raw(),
            self.sat_release_frames_inv_neg.raw(),
            self.sat_release_rate_at_neg_two_db.raw(),
            self.release_poly[0].raw(),
            self.release_poly[1].raw(),
            self.release_poly[2].raw(),
            self.release_poly[3].raw(),
            self.release_poly[4].raw(),
        ] {
            out.extend(raw.to_le_bytes());
        }
        out
    }
}

/// A tiny fixed-capacity byte buffer so `to_bytes` works without requiring
/// the `alloc`/`std` feature. Capacity matches the fixed wire layout.
mod alloc_or_stack {
    use crate::config::{FIELD_COUNT, MAX_CONFIG_BYTES};

    const CAP: usize = MAX_CONFIG_BYTES;
    const _: () = assert!(1 + 4 + FIELD_COUNT * 4 <= CAP);

    #[derive(Debug)]
    pub struct Blob {
        data: [u8; CAP],
        len: usize,
    }

    impl Blob {
        pub fn new() -> Self {
            Self { data: [0; CAP], len: 0 }
        }

        pub fn push(&mut self, byte: u8) {
            self.data[self.len] = byte;
            self.len += 1;
        }

        pub fn extend<const N: usize>(&mut self, bytes: [u8; N]) {
            self.data[self.len..self.len + N].copy_from_slice(&bytes);
            self.len += N;
        }
    }

    impl core::ops::Deref for Blob {
        type Target = [u8];
        fn deref(&self) -> &[u8] {
            &self.data[..self.len]
        }
    }
}
