//! The processing driver: the per-`copy` fragment loop that writes input
//! into the pre-delay, reads delayed output back out, and triggers a
//! division update (detector -> envelope -> compress) whenever a division
//! boundary is crossed (spec §4.6).

use crate::config::DrcRuntimeParams;
use crate::detector::update_detector_average_sample;
use crate::envelope::{update_envelope, EnvelopeState};
use crate::compress::compress_output;
use crate::predelay::{advance_index, round_pre_delay_frames, PreDelayLine};
use crate::{DIVISION_FRAMES, MAX_CHANNELS};

/// Per-instance DRC engine state (spec §3.3), parameterized over the
/// pre-delay ring capacity `N` (must be [`crate::MAX_PRE_DELAY_FRAMES`] in
/// production; kept generic so tests can use a smaller ring).
pub struct DrcEngine<const N: usize> {
    rings: [PreDelayLine<N>; MAX_CHANNELS],
    num_channels: usize,
    write_index: usize,
    read_index: usize,
    last_pre_delay_frames: usize,
    detector_average: f32,
    compressor_gain: f32,
    envelope_state: EnvelopeState,
    processed: bool,
}

impl<const N: usize> DrcEngine<N> {
    /// Construct an engine with `num_channels` active channels
    /// (`1..=MAX_CHANNELS`) and a look-ahead derived from `pre_delay_time`
    /// and `sample_rate`. Zeroes all buffers and resets state — this is
    /// the "full re-setup" the spec requires on configuration adoption.
    pub fn new(num_channels: usize, sample_rate: f32, pre_delay_time: f32) -> Self {
        assert!(num_channels >= 1 && num_channels <= MAX_CHANNELS);
        let requested_frames = (pre_delay_time * sample_rate).round() as usize;
        let last_pre_delay_frames = round_pre_delay_frames(requested_frames, N);

        Self {
            rings: core::array::from_fn(|_| PreDelayLine::new()),
            num_channels,
            write_index: last_pre_delay_frames,
            read_index: 0,
            last_pre_delay_frames,
            detector_average: 0.0,
            compressor_gain: 1.0,
            envelope_state: EnvelopeState::new(),
            processed: false,
        }
    }

    /// Current look-ahead, in frames. Spec invariant: a multiple of
    /// `DIVISION_FRAMES`, `>= DIVISION_FRAMES`.
    pub fn pre_delay_frames(&self) -> usize {
        self.last_pre_delay_frames
    }

    /// Current detector average (spec invariant: `(0, 1]`).
    pub fn detector_average(&self) -> f32 {
        self.detector_average
    }

    /// Current applied gain, pre-master.
    pub fn compressor_gain(&self) -> f32 {
        self.compressor_gain
    }

    /// Number of frames look-ahead vs. read (spec invariant 2).
    pub fn lookahead_distance(&self) -> usize {
        (self.write_index + N - self.read_index) % N
    }

    /// Run one complete division update: detector (over the division just
    /// written) -> envelope -> compress (over the division about to be
    /// read). `div_start_write` and the post-advance `read_index` are
    /// passed explicitly so priming can reuse this against a synthetic
    /// all-zero division.
    fn process_one_division(&mut self, params: &DrcRuntimeParams, div_start_write: usize) {
        for i in 0..DIVISION_FRAMES {
            let abs_input = (0..self.num_channels)
                .map(|c| self.rings[c].read(div_start_write + i).abs())
                .fold(0.0_f32, f32::max);
            update_detector_average_sample(params, &mut self.detector_average, abs_input);
        }

        let update = update_envelope(
            params,
            self.detector_average,
            self.compressor_gain,
            &mut self.envelope_state,
        );

        self.compressor_gain = compress_output(
            params,
            &update,
            self.compressor_gain,
            self.read_index,
            &mut self.rings[..self.num_channels],
        );
    }

    /// Prime the pipeline: spec §9 resolves the "warm-up transient" open
    /// question by running the detector over an initial all-zero division
    /// before the first envelope update (rather than leaving
    /// `detector_average` at its raw zero-initialized value, which would
    /// otherwise make the first `scaled_desired_gain` collapse to 0). See
    /// `DESIGN.md` for the rationale.
    fn prime(&mut self, params: &DrcRuntimeParams) {
        for _ in 0..DIVISION_FRAMES {
            update_detector_average_sample(params, &mut self.detector_average, 0.0);
        }

        let update = update_envelope(
            params,
            self.detector_average,
            self.compressor_gain,
            &mut self.envelope_state,
        );
        self.compressor_gain = compress_output(
            params,
            &update,
            self.compressor_gain,
            self.read_index,
            &mut self.rings[..self.num_channels],
        );
        self.processed = true;
    }

    /// Process one `copy` invocation's worth of frames: `source`/`sink`
    /// are per-channel slices of length `frames` (the host's ring-buffer
    /// view, reduced to what a single `copy` needs — see `SPEC_FULL.md`
    /// §6.1). When `params.enabled` is false, samples pass through
    /// unmodified and no state advances (spec §4.6 step 1).
    pub fn copy(&mut self, params: &DrcRuntimeParams, source: &[&[f32]], sink: &mut [&mut [f32]]) {
        debug_assert_eq!(source.len(), self.num_channels);
        debug_assert_eq!(sink.len(), self.num_channels);
        let frames = source[0].len();

        if !params.enabled {
            for c in 0..self.num_channels {
                sink[c][..frames].copy_from_slice(&source[c][..frames]);
            }
            return;
        }

        if !self.processed {
            self.prime(params);
        }

        let mut offset = self.write_index % DIVISION_FRAMES;
        let mut remaining = frames;
        let mut pos = 0usize;

        while remaining > 0 {
            let fragment = (DIVISION_FRAMES - offset).min(remaining);

            for c in 0..self.num_channels {
                for i in 0..fragment {
                    self.rings[c].write(self.write_index + i, source[c][pos + i]);
                    sink[c][pos + i] = self.rings[c].read(self.read_index + i);
                }
            }

            self.write_index = advance_index::<N>(self.write_index, fragment);
            self.read_index = advance_index::<N>(self.read_index, fragment);
            offset = (offset + fragment) % DIVISION_FRAMES;
            pos += fragment;
            remaining -= fragment;

            if offset == 0 {
                let div_start_write = (self.write_index + N - DIVISION_FRAMES) % N;
                self.process_one_division(params, div_start_write);
            }
        }
    }

    /// Zero all state and buffers (the `reset` trigger, spec §4.7).
    pub fn reset(&mut self) {
        for ring in &mut self.rings {
            ring.clear();
        }
        self.write_index = self.last_pre_delay_frames;
        self.read_index = 0;
        self.detector_average = 0.0;
        self.compressor_gain = 1.0;
        self.envelope_state = EnvelopeState::new();
        self.processed = false;
    }
}
