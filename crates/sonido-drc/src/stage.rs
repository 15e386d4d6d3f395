//! Pipeline stage lifecycle and configuration transport (spec §4.7, §6).
//!
//! `DrcStage` is the minimal in-repo stand-in for the pipeline host's view
//! of a stage: the real host (trigger dispatch, ring-buffer ownership, IPC)
//! is out of scope (`SPEC_FULL.md` §2), but the lifecycle state machine and
//! the chunked configuration upload protocol are promoted to a real module
//! here so the engine is exercisable end-to-end without one.
//!
//! Grounded on `drc_new`/`drc_prepare`/`drc_trigger`/`drc_cmd_set_data`/
//! `drc_cmd_get_data`/`drc_reset`/`drc_free` in the original source: `prepare`,
//! `reset`, and `free` are distinct operations from `trigger`, which only
//! ever carries `start`/`stop` (the original's `comp_set_state` dispatch for
//! `COMP_TRIGGER_{START,STOP}`; prepare/reset/free each call
//! `comp_set_state` themselves as part of their own body, not through a
//! generic `cmd`).

use crate::config::DrcConfig;
use crate::engine::DrcEngine;
use crate::error::DrcError;
use crate::{DIVISION_FRAMES, MAX_CHANNELS, MAX_CONFIG_BYTES, MAX_PRE_DELAY_FRAMES};

/// Sample container the stage has been bound to at `prepare()` time.
///
/// Internal detector/envelope math is always `f32`; this only selects the
/// pre-delay element's Q-fraction width (spec §6.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    /// 16-bit signed PCM, Q15.
    S16LE,
    /// 24-bit signed PCM in a 32-bit container, Q23.
    S24_4LE,
    /// 32-bit signed PCM, Q31.
    S32LE,
}

impl SampleFormat {
    /// Q-format fraction width for this container (spec §6.3).
    pub const fn frac_bits(self) -> u32 {
        match self {
            Self::S16LE => 15,
            Self::S24_4LE => 23,
            Self::S32LE => 31,
        }
    }
}

/// Stream parameters a host supplies via `params()`, ahead of `prepare()`
/// (spec §6.1: "accepts any params the generic verifier accepts" — all
/// cross-checking is deferred to `prepare()`, matching the original's
/// `drc_params` postponing configuration work).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamParams {
    /// Active channel count, `1..=MAX_CHANNELS`.
    pub channels: usize,
    /// Sample rate in Hz.
    pub sample_rate_hz: u32,
    /// Sample container format.
    pub format: SampleFormat,
}

/// Lifecycle state (spec §4.7 table, minus the `FREED` terminal state, which
/// is modeled by `free()` consuming the stage).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    /// Allocated, not yet bound to stream formats or buffers.
    Ready,
    /// Buffers allocated, format bound, not yet accepting `copy`.
    Prepared,
    /// Accepting `copy`.
    Active,
}

/// `trigger()` commands. Only `start`/`stop` travel through the generic
/// trigger dispatch (spec §4.7); `prepare`/`reset`/`free` are separate
/// operations (spec §6.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// `PREPARED -> ACTIVE`.
    Start,
    /// `ACTIVE -> PREPARED`, idempotent if already `PREPARED`.
    Stop,
}

/// Raw bytes of a configuration upload still in progress (spec §6.2).
/// Doubles as the "busy" marker: a second `msg_index == 0` is rejected
/// while this is `Some`, mirroring the original's reuse of `cd->config_new`
/// for both the in-progress buffer and the not-yet-adopted result.
struct PendingUpload {
    buffer: [u8; MAX_CONFIG_BYTES],
    total_size: usize,
}

/// Result of a `cmd_get_data` chunk: how many bytes of `out` were written,
/// and how many bytes of the blob remain after this chunk (spec §6.2
/// read-back mirror).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigChunk {
    /// Bytes written into the caller's buffer this call.
    pub num_elems: usize,
    /// Bytes of the blob still to come after this chunk.
    pub elems_remaining: usize,
}

const SCRATCH_FRAMES: usize = DIVISION_FRAMES * 4;

/// The minimal pipeline-stage stand-in: lifecycle state machine,
/// two-slot configuration adoption, chunked upload/read-back, and the
/// sample-format-dispatched `copy` entry points.
pub struct DrcStage {
    state: StageState,
    config: Option<DrcConfig>,
    config_new: Option<DrcConfig>,
    pending: Option<PendingUpload>,
    engine: Option<DrcEngine<MAX_PRE_DELAY_FRAMES>>,
    source_params: Option<StreamParams>,
    sink_params: Option<StreamParams>,
    format: Option<SampleFormat>,
    num_channels: usize,
    sample_rate: f32,
}

impl DrcStage {
    /// Create a stage, optionally with an initial configuration blob (spec
    /// §6.1 `create`). Rejects an oversized or malformed blob outright,
    /// matching the original's "fail with null" contract (here, `Err`
    /// instead of a null pointer).
    pub fn create(initial_config: Option<&[u8]>) -> Result<Self, DrcError> {
        let config = initial_config.map(DrcConfig::from_bytes).transpose()?;

        #[cfg(feature = "tracing")]
        tracing::debug!(has_config = config.is_some(), "drc stage created");

        Ok(Self {
            state: StageState::Ready,
            config,
            config_new: None,
            pending: None,
            engine: None,
            source_params: None,
            sink_params: None,
            format: None,
            num_channels: 0,
            sample_rate: 0.0,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> StageState {
        self.state
    }

    /// Stage stream parameters ahead of `prepare()` (spec §6.1 `params`).
    /// All cross-checking between source and sink is deferred to
    /// `prepare()`.
    pub fn params(&mut self, source: StreamParams, sink: StreamParams) {
        self.source_params = Some(source);
        self.sink_params = Some(sink);
    }

    /// `READY -> PREPARED`: requires equal source/sink formats and channel
    /// counts within `MAX_CHANNELS`; allocates the engine (spec §6.1
    /// `prepare`).
    pub fn prepare(&mut self) -> Result<(), DrcError> {
        if self.state != StageState::Ready {
            return Err(DrcError::ConfigMalformed("prepare requires READY state"));
        }
        let (source, sink) = match (self.source_params, self.sink_params) {
            (Some(s), Some(k)) => (s, k),
            _ => {
                return Err(DrcError::ConfigMalformed(
                    "prepare requires params() to be called first",
                ));
            }
        };
        if source.format != sink.format || source.channels != sink.channels {
            return Err(DrcError::FormatMismatch);
        }
        if source.channels == 0 || source.channels > MAX_CHANNELS {
            return Err(DrcError::ChannelCountExceeded {
                requested: source.channels,
                max: MAX_CHANNELS,
            });
        }

        self.format = Some(source.format);
        self.num_channels = source.channels;
        self.sample_rate = source.sample_rate_hz as f32;

        let runtime = self.runtime_params();
        self.engine = Some(DrcEngine::new(
            self.num_channels,
            self.sample_rate,
            runtime.pre_delay_time,
        ));
        self.state = StageState::Prepared;

        #[cfg(feature = "tracing")]
        tracing::debug!(channels = self.num_channels, sample_rate = self.sample_rate, "drc stage prepared");

        Ok(())
    }

    /// Dispatch a trigger command (spec §4.7). Only `start`/`stop` travel
    /// through here; `stop` from `PREPARED` is a no-op (idempotent, per
    /// spec table).
    pub fn trigger(&mut self, cmd: Trigger) -> Result<(), DrcError> {
        let next = match (cmd, self.state) {
            (Trigger::Start, StageState::Prepared) => StageState::Active,
            (Trigger::Stop, StageState::Active) => StageState::Prepared,
            (Trigger::Stop, StageState::Prepared) => StageState::Prepared,
            _ => {
                return Err(DrcError::ConfigMalformed(
                    "trigger not valid for current state",
                ));
            }
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(?cmd, from = ?self.state, to = ?next, "drc stage trigger");

        self.state = next;
        Ok(())
    }

    /// `any -> READY`: zeroes engine state and frees the pre-delay buffers
    /// (spec §4.7 `reset`).
    pub fn reset(&mut self) {
        self.engine = None;
        self.state = StageState::Ready;

        #[cfg(feature = "tracing")]
        tracing::debug!("drc stage reset");
    }

    /// `READY -> FREED`: consumes the stage, releasing all memory on drop
    /// (spec §4.7 `free`).
    pub fn free(self) -> Result<(), DrcError> {
        if self.state != StageState::Ready {
            return Err(DrcError::ConfigMalformed("free requires READY state"));
        }
        Ok(())
    }

    /// Effective runtime parameters: the live configuration if one has been
    /// adopted, otherwise pass-through (spec §4.7 "if config absent, bind
    /// pass-through").
    fn runtime_params(&self) -> crate::config::DrcRuntimeParams {
        self.config.unwrap_or_else(DrcConfig::disabled).to_runtime()
    }

    /// Swap `config_new` into `config` and fully re-setup the engine, if a
    /// staged configuration is waiting (spec §4.6 step: "swap `config_new`
    /// if present ... then process", called at the top of every `copy`).
    fn adopt_pending_config(&mut self) {
        let Some(new_config) = self.config_new.take() else {
            return;
        };
        self.config = Some(new_config);
        if self.engine.is_some() {
            let runtime = self.runtime_params();
            self.engine = Some(DrcEngine::new(
                self.num_channels,
                self.sample_rate,
                runtime.pre_delay_time,
            ));

            #[cfg(feature = "tracing")]
            tracing::debug!("drc stage adopted staged configuration, engine re-setup");
        }
    }

    /// Chunked configuration upload (spec §6.2). `msg_index == 0` starts a
    /// new upload (rejecting a concurrent one as `UploadBusy`); later chunks
    /// append at `total_size - elems_remaining - data.len()`. When
    /// `elems_remaining == 0`, the completed blob is parsed and either
    /// adopted immediately (`READY`, or no live config yet) or staged into
    /// `config_new` for the next `copy` to swap in.
    pub fn cmd_set_data(
        &mut self,
        msg_index: u32,
        elems_remaining: usize,
        data: &[u8],
    ) -> Result<(), DrcError> {
        if msg_index == 0 {
            if self.pending.is_some() || self.config_new.is_some() {
                return Err(DrcError::UploadBusy);
            }
            let total_size = data
                .len()
                .checked_add(elems_remaining)
                .ok_or(DrcError::ConfigMalformed("chunk size overflow"))?;
            if total_size > MAX_CONFIG_BYTES {
                return Err(DrcError::ConfigTooLarge {
                    size: total_size,
                    max: MAX_CONFIG_BYTES,
                });
            }
            let mut buffer = [0u8; MAX_CONFIG_BYTES];
            buffer[..data.len()].copy_from_slice(data);
            self.pending = Some(PendingUpload { buffer, total_size });
        } else {
            let pending = self
                .pending
                .as_mut()
                .ok_or(DrcError::ConfigMalformed("continuation chunk without a start chunk"))?;
            let offset = pending
                .total_size
                .checked_sub(elems_remaining)
                .and_then(|v| v.checked_sub(data.len()))
                .ok_or(DrcError::ConfigMalformed("chunk offset underflow"))?;
            if offset + data.len() > pending.total_size {
                return Err(DrcError::ConfigMalformed("chunk exceeds declared total size"));
            }
            pending.buffer[offset..offset + data.len()].copy_from_slice(data);
        }

        if elems_remaining == 0 {
            let pending = self.pending.take().expect("just populated above");
            let parsed = DrcConfig::from_bytes(&pending.buffer[..pending.total_size])?;

            if self.state == StageState::Ready {
                self.config = None;
            }
            if self.config.is_none() {
                self.config = Some(parsed);
            } else {
                self.config_new = Some(parsed);
            }

            #[cfg(feature = "tracing")]
            tracing::debug!(bytes = pending.total_size, "drc configuration upload complete");
        }

        Ok(())
    }

    /// Chunked configuration read-back (spec §6.2 mirror). Writes up to
    /// `out.len()` bytes of the live configuration's wire encoding starting
    /// at `msg_index * out.len()`, and reports how many bytes remain.
    pub fn cmd_get_data(&self, msg_index: u32, out: &mut [u8]) -> Result<ConfigChunk, DrcError> {
        let config = self
            .config
            .ok_or(DrcError::ConfigMalformed("no configuration to read back"))?;
        let blob = config.to_bytes();
        let blob: &[u8] = &blob;
        let total = blob.len();
        let max_size = out.len();

        if max_size == 0 {
            return Err(DrcError::ConfigMalformed("zero-size read-back buffer"));
        }

        let offset = (msg_index as usize).saturating_mul(max_size).min(total);
        let num_elems = (total - offset).min(max_size);
        let elems_remaining = total - offset - num_elems;

        out[..num_elems].copy_from_slice(&blob[offset..offset + num_elems]);
        Ok(ConfigChunk {
            num_elems,
            elems_remaining,
        })
    }

    fn require_active(&self) -> Result<(), DrcError> {
        if self.state != StageState::Active {
            return Err(DrcError::ConfigMalformed("copy requires ACTIVE state"));
        }
        Ok(())
    }

    /// Process one `copy` invocation's worth of S16LE frames.
    pub fn copy_s16(&mut self, source: &[&[i16]], sink: &mut [&mut [i16]]) -> Result<(), DrcError> {
        self.require_active()?;
        match self.format {
            Some(SampleFormat::S16LE) => {}
            Some(_) => return Err(DrcError::UnsupportedFormat),
            None => return Err(DrcError::UnsupportedFormat),
        }
        self.adopt_pending_config();

        let frames = source[0].len();
        let channels = self.num_channels;
        let enabled = self.runtime_params().enabled;

        if !enabled {
            for c in 0..channels {
                sink[c][..frames].copy_from_slice(&source[c][..frames]);
            }
            return Ok(());
        }

        let frac = SampleFormat::S16LE.frac_bits();
        let params = self.runtime_params();
        let engine = self
            .engine
            .as_mut()
            .ok_or(DrcError::ConfigMalformed("copy requires a prepared engine"))?;

        let mut pos = 0usize;
        while pos < frames {
            let chunk = SCRATCH_FRAMES.min(frames - pos);
            let mut src = [[0f32; SCRATCH_FRAMES]; MAX_CHANNELS];
            let mut dst = [[0f32; SCRATCH_FRAMES]; MAX_CHANNELS];
            for c in 0..channels {
                for i in 0..chunk {
                    src[c][i] = crate::math::q_to_float(i32::from(source[c][pos + i]), frac);
                }
            }

            run_engine_chunk(engine, &params, channels, chunk, &src, &mut dst);

            for c in 0..channels {
                for i in 0..chunk {
                    let raw = crate::math::float_to_q(dst[c][i], frac);
                    sink[c][pos + i] = raw.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16;
                }
            }
            pos += chunk;
        }
        Ok(())
    }

    /// Process one `copy` invocation's worth of frames in a 32-bit integer
    /// container (S24_4LE or S32LE — they differ only in Q-fraction width,
    /// both represented as `i32`; spec §9 open question resolution).
    pub fn copy_i32(&mut self, source: &[&[i32]], sink: &mut [&mut [i32]]) -> Result<(), DrcError> {
        self.require_active()?;
        let format = match self.format {
            Some(f @ (SampleFormat::S24_4LE | SampleFormat::S32LE)) => f,
            _ => return Err(DrcError::UnsupportedFormat),
        };
        self.adopt_pending_config();

        let frames = source[0].len();
        let channels = self.num_channels;
        let enabled = self.runtime_params().enabled;

        if !enabled {
            for c in 0..channels {
                sink[c][..frames].copy_from_slice(&source[c][..frames]);
            }
            return Ok(());
        }

        let frac = format.frac_bits();
        let params = self.runtime_params();
        let engine = self
            .engine
            .as_mut()
            .ok_or(DrcError::ConfigMalformed("copy requires a prepared engine"))?;

        let mut pos = 0usize;
        while pos < frames {
            let chunk = SCRATCH_FRAMES.min(frames - pos);
            let mut src = [[0f32; SCRATCH_FRAMES]; MAX_CHANNELS];
            let mut dst = [[0f32; SCRATCH_FRAMES]; MAX_CHANNELS];
            for c in 0..channels {
                for i in 0..chunk {
                    src[c][i] = crate::math::q_to_float(source[c][pos + i], frac);
                }
            }

            run_engine_chunk(engine, &params, channels, chunk, &src, &mut dst);

            for c in 0..channels {
                for i in 0..chunk {
                    sink[c][pos + i] = crate::math::float_to_q(dst[c][i], frac);
                }
            }
            pos += chunk;
        }
        Ok(())
    }
}

/// Run one scratch-buffer chunk through the engine, dispatching on channel
/// count to avoid constructing aliased mutable slices from a fixed array
/// (`MAX_CHANNELS` is small and fixed, so an explicit 1/2-channel match is
/// simpler than generic slice-of-slices plumbing here).
fn run_engine_chunk(
    engine: &mut DrcEngine<MAX_PRE_DELAY_FRAMES>,
    params: &crate::config::DrcRuntimeParams,
    channels: usize,
    chunk: usize,
    src: &[[f32; SCRATCH_FRAMES]; MAX_CHANNELS],
    dst: &mut [[f32; SCRATCH_FRAMES]; MAX_CHANNELS],
) {
    let (dst_a, dst_b) = dst.split_at_mut(1);
    match channels {
        1 => engine.copy(params, &[&src[0][..chunk]], &mut [&mut dst_a[0][..chunk]]),
        2 => engine.copy(
            params,
            &[&src[0][..chunk], &src[1][..chunk]],
            &mut [&mut dst_a[0][..chunk], &mut dst_b[0][..chunk]],
        ),
        _ => unreachable!("channels bounded by MAX_CHANNELS at prepare()"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream_params(channels: usize, format: SampleFormat) -> StreamParams {
        StreamParams {
            channels,
            sample_rate_hz: 16000,
            format,
        }
    }

    fn prepared_stage(channels: usize, format: SampleFormat) -> DrcStage {
        let mut stage = DrcStage::create(None).unwrap();
        stage.params(stream_params(channels, format), stream_params(channels, format));
        stage.prepare().unwrap();
        stage.trigger(Trigger::Start).unwrap();
        stage
    }

    #[test]
    fn lifecycle_happy_path() {
        let mut stage = DrcStage::create(None).unwrap();
        assert_eq!(stage.state(), StageState::Ready);
        stage.params(stream_params(1, SampleFormat::S16LE), stream_params(1, SampleFormat::S16LE));
        stage.prepare().unwrap();
        assert_eq!(stage.state(), StageState::Prepared);
        stage.trigger(Trigger::Start).unwrap();
        assert_eq!(stage.state(), StageState::Active);
        stage.trigger(Trigger::Stop).unwrap();
        assert_eq!(stage.state(), StageState::Prepared);
        stage.reset();
        assert_eq!(stage.state(), StageState::Ready);
        stage.free().unwrap();
    }

    #[test]
    fn prepare_rejects_format_mismatch() {
        let mut stage = DrcStage::create(None).unwrap();
        stage.params(
            stream_params(1, SampleFormat::S16LE),
            stream_params(1, SampleFormat::S32LE),
        );
        assert!(matches!(stage.prepare(), Err(DrcError::FormatMismatch)));
    }

    #[test]
    fn prepare_rejects_excess_channels() {
        let mut stage = DrcStage::create(None).unwrap();
        stage.params(
            stream_params(MAX_CHANNELS + 1, SampleFormat::S16LE),
            stream_params(MAX_CHANNELS + 1, SampleFormat::S16LE),
        );
        assert!(matches!(
            stage.prepare(),
            Err(DrcError::ChannelCountExceeded { .. })
        ));
    }

    #[test]
    fn disabled_stage_is_bit_exact_pass_through_s16() {
        let mut stage = prepared_stage(1, SampleFormat::S16LE);
        let input: Vec<i16> = (0..256).map(|i| (i % 256) as i16).collect();
        let mut output = vec![0i16; 256];
        stage.copy_s16(&[&input], &mut [&mut output]).unwrap();
        assert_eq!(input, output);
    }

    #[test]
    fn second_upload_start_while_busy_is_rejected() {
        let mut stage = DrcStage::create(None).unwrap();
        stage.cmd_set_data(0, 8, &[0u8; 4]).unwrap();
        assert!(matches!(
            stage.cmd_set_data(0, 0, &[0u8; 4]),
            Err(DrcError::UploadBusy)
        ));
    }

    #[test]
    fn upload_rejects_oversized_declared_total() {
        let mut stage = DrcStage::create(None).unwrap();
        let result = stage.cmd_set_data(0, MAX_CONFIG_BYTES, &[0u8; 1]);
        assert!(matches!(result, Err(DrcError::ConfigTooLarge { .. })));
    }

    #[test]
    fn chunked_upload_then_get_data_round_trips() {
        let config = crate::config::DrcConfig {
            enabled: true,
            pre_delay_time: 0.004,
            linear_threshold: crate::math::Qn::from_f32(0.4),
            knee_threshold: crate::math::Qn::from_f32(0.6),
            knee_alpha: crate::math::Qn::from_f32(0.2),
            knee_beta: crate::math::Qn::from_f32(0.05),
            k: crate::math::Qn::from_f32(4.0),
            ratio_base: crate::math::Qn::from_f32(1.1),
            slope: crate::math::Qn::from_f32(0.25),
            master_linear_gain: crate::math::Qn::from_f32(1.0),
            attack_frames: crate::math::Qn::from_f32(10.0),
            sat_release_frames_inv_neg: crate::math::Qn::from_f32(0.1),
            sat_release_rate_at_neg_two_db: crate::math::Qn::from_f32(0.05),
            release_poly: [crate::math::Qn::from_f32(1.0); 5],
        };
        let blob = config.to_bytes();
        let blob: &[u8] = &blob;

        let mut stage = DrcStage::create(None).unwrap();
        let chunk_size = 16;
        let mut offset = 0;
        while offset < blob.len() {
            let end = (offset + chunk_size).min(blob.len());
            let remaining = blob.len() - end;
            let msg_index = (offset / chunk_size) as u32;
            stage
                .cmd_set_data(msg_index, remaining, &blob[offset..end])
                .unwrap();
            offset = end;
        }

        let mut readback = vec![0u8; blob.len()];
        let mut pos = 0;
        let mut msg_index = 0u32;
        loop {
            let mut out_chunk = vec![0u8; chunk_size];
            let chunk = stage.cmd_get_data(msg_index, &mut out_chunk).unwrap();
            readback[pos..pos + chunk.num_elems].copy_from_slice(&out_chunk[..chunk.num_elems]);
            pos += chunk.num_elems;
            msg_index += 1;
            if chunk.elems_remaining == 0 {
                break;
            }
        }

        assert_eq!(readback, blob);
    }

    #[test]
    fn pending_config_adopted_on_next_copy_when_already_active() {
        let mut stage = prepared_stage(1, SampleFormat::S16LE);
        let config = DrcConfig::disabled();
        let blob = config.to_bytes();
        let blob: &[u8] = &blob;
        stage.cmd_set_data(0, 0, blob).unwrap();
        assert!(stage.config_new.is_none(), "no live config yet: adopted immediately");
    }
}
