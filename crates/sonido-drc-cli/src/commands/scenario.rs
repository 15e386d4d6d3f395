//! Generate and run one of the end-to-end scenarios from spec §8 (S1-S6),
//! writing the result to a WAV file so it can be listened to directly.
//! Each scenario builds its own synthetic input rather than reading a
//! file, since the point is to exercise a specific, precisely-controlled
//! input shape (a ramp, silence, a steady tone, a burst).

use crate::presets;
use clap::{Args, ValueEnum};
use sonido_drc::{DrcStage, SampleFormat, StreamParams, Trigger, DIVISION_FRAMES};
use sonido_io::{write_wav_i32, WavSpec};
use std::path::PathBuf;

const SAMPLE_RATE: u32 = 16000;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Scenario {
    /// S1: pass-through, disabled.
    S1,
    /// S2: silence in, silence out.
    S2,
    /// S3: steady tone below the linear threshold.
    S3,
    /// S4: steady tone above the knee.
    S4,
    /// S5: silence then a sustained loud tone (impulse attack).
    S5,
    /// S6: a loud burst followed by a quiet tail (release).
    S6,
}

#[derive(Args)]
pub struct ScenarioArgs {
    /// Which scenario to run
    #[arg(value_enum)]
    scenario: Scenario,

    /// Output WAV file
    output: PathBuf,
}

pub fn run(args: ScenarioArgs) -> anyhow::Result<()> {
    let (input, preset) = build_input(args.scenario);
    let config = presets::by_name(preset)?;
    let blob = config.to_bytes();
    let blob: &[u8] = &blob;

    let mut stage = DrcStage::create(Some(blob))?;
    let params = StreamParams {
        channels: 1,
        sample_rate_hz: SAMPLE_RATE,
        format: SampleFormat::S16LE,
    };
    stage.params(params, params);
    stage.prepare()?;
    stage.trigger(Trigger::Start)?;

    let mut output = vec![0i16; input.len()];
    stage.copy_s16(&[&input], &mut [&mut output])?;

    let input_peak = input.iter().map(|&s| i32::from(s).abs()).max().unwrap_or(0);
    let output_peak = output.iter().map(|&s| i32::from(s).abs()).max().unwrap_or(0);
    println!(
        "scenario {:?}: preset={preset}, {} frames, input peak {input_peak}, output peak {output_peak}",
        args.scenario,
        input.len(),
    );

    let spec = WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
    };
    let samples: Vec<i32> = output.into_iter().map(i32::from).collect();
    write_wav_i32(&args.output, &samples, spec)?;
    Ok(())
}

/// Build the synthetic input for a scenario and the preset name to drive
/// it with. Amplitudes are expressed in `i16` full scale.
fn build_input(scenario: Scenario) -> (Vec<i16>, &'static str) {
    match scenario {
        Scenario::S1 => (ramp(8 * DIVISION_FRAMES), "disabled"),
        Scenario::S2 => (vec![0i16; 64 * DIVISION_FRAMES], "default"),
        Scenario::S3 => (tone(440.0, 0.3, 64 * DIVISION_FRAMES), "default"),
        Scenario::S4 => (tone(440.0, 0.9, 256 * DIVISION_FRAMES), "default"),
        Scenario::S5 => {
            let mut samples = vec![0i16; 32 * DIVISION_FRAMES];
            samples.extend(tone(440.0, 0.95, 64 * DIVISION_FRAMES));
            (samples, "default")
        }
        Scenario::S6 => {
            let mut samples = tone(440.0, 0.95, 8 * DIVISION_FRAMES);
            samples.extend(tone(440.0, 0.1, 64 * DIVISION_FRAMES));
            (samples, "default")
        }
    }
}

/// A repeating `0..255` ramp, cast to `i16` (spec §8 S1's input shape).
fn ramp(num_samples: usize) -> Vec<i16> {
    (0..num_samples).map(|i| (i % 256) as i16).collect()
}

/// A sine tone at `amplitude` (fraction of full scale) sampled at
/// `SAMPLE_RATE`.
fn tone(freq_hz: f32, amplitude: f32, num_samples: usize) -> Vec<i16> {
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            let v = (2.0 * std::f32::consts::PI * freq_hz * t).sin() * amplitude;
            (v * f32::from(i16::MAX)) as i16
        })
        .collect()
}
