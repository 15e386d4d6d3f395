//! Run the compressor stage over a WAV file end-to-end: build a stage
//! with a named preset, `prepare`/`start` it, and drive `copy` over the
//! whole file in one call (the stage internally divides work into
//! `DIVISION_FRAMES`-aligned fragments, see `sonido_drc::stage`).

use crate::presets;
use clap::Args;
use sonido_drc::{DrcStage, SampleFormat, StreamParams, Trigger};
use sonido_io::{read_wav_i32, read_wav_info, write_wav_i32, WavFormat};
use std::path::PathBuf;

#[derive(Args)]
pub struct ProcessArgs {
    /// Input WAV file (16, 24, or 32-bit PCM; mono or stereo, mixed
    /// down to mono on read)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output WAV file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Compressor preset: disabled, gentle, default, or heavy
    #[arg(short, long, default_value = "default")]
    preset: String,
}

pub fn run(args: ProcessArgs) -> anyhow::Result<()> {
    let info = read_wav_info(&args.input)?;
    if info.format != WavFormat::Pcm {
        anyhow::bail!("only integer PCM WAV input is supported (got IEEE float)");
    }

    let format = match info.bits_per_sample {
        16 => SampleFormat::S16LE,
        24 => SampleFormat::S24_4LE,
        32 => SampleFormat::S32LE,
        other => anyhow::bail!("unsupported bit depth {other} (expected 16, 24, or 32)"),
    };

    println!("Reading {}...", args.input.display());
    let (samples, spec) = read_wav_i32(&args.input)?;
    println!(
        "  {} frames, {} Hz, {}-bit PCM (preset: {})",
        samples.len(),
        spec.sample_rate,
        spec.bits_per_sample,
        args.preset
    );

    let config = presets::by_name(&args.preset)?;
    let blob = config.to_bytes();
    let blob: &[u8] = &blob;
    let mut stage = DrcStage::create(Some(blob))?;

    let stream_params = StreamParams {
        channels: 1,
        sample_rate_hz: spec.sample_rate,
        format,
    };
    stage.params(stream_params, stream_params);
    stage.prepare()?;
    stage.trigger(Trigger::Start)?;

    let output = match format {
        SampleFormat::S16LE => {
            let input16: Vec<i16> = samples.iter().map(|&s| s.clamp(-32768, 32767) as i16).collect();
            let mut out16 = vec![0i16; samples.len()];
            stage.copy_s16(&[&input16], &mut [&mut out16])?;
            out16.into_iter().map(i32::from).collect()
        }
        SampleFormat::S24_4LE | SampleFormat::S32LE => {
            let mut out32 = vec![0i32; samples.len()];
            stage.copy_i32(&[&samples], &mut [&mut out32])?;
            out32
        }
    };

    println!("Writing {}...", args.output.display());
    write_wav_i32(&args.output, &output, spec)?;
    println!("Done!");

    Ok(())
}
