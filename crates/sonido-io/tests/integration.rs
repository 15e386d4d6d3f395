//! Integration tests for `sonido-io` WAV file I/O.

use sonido_io::{read_wav, read_wav_i32, read_wav_info, write_wav, write_wav_i32, WavSpec};
use tempfile::NamedTempFile;

/// Generate a 1-second sine wave at the given sample rate.
fn sine_wave(sample_rate: u32, freq_hz: f32, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|i| (2.0 * std::f32::consts::PI * freq_hz * i as f32 / sample_rate as f32).sin())
        .collect()
}

#[test]
fn wav_roundtrip_mono_f32_44100() {
    let sr = 44100;
    let samples = sine_wave(sr, 440.0, sr as usize);
    let spec = WavSpec {
        channels: 1,
        sample_rate: sr,
        bits_per_sample: 32,
    };

    let file = NamedTempFile::new().unwrap();
    write_wav(file.path(), &samples, spec).unwrap();

    let (loaded, loaded_spec) = read_wav(file.path()).unwrap();
    assert_eq!(loaded_spec.sample_rate, sr);
    assert_eq!(loaded.len(), samples.len());

    for (a, b) in samples.iter().zip(loaded.iter()) {
        assert!((a - b).abs() < 1e-6, "sample mismatch: {a} vs {b}");
    }
}

#[test]
fn wav_roundtrip_mono_i16() {
    let sr = 16000;
    let samples: Vec<i32> = (0..sr as i32).map(|i| ((i % 256) - 128) * 64).collect();
    let spec = WavSpec {
        channels: 1,
        sample_rate: sr,
        bits_per_sample: 16,
    };

    let file = NamedTempFile::new().unwrap();
    write_wav_i32(file.path(), &samples, spec).unwrap();

    let (loaded, loaded_spec) = read_wav_i32(file.path()).unwrap();
    assert_eq!(loaded_spec.bits_per_sample, 16);
    assert_eq!(loaded, samples);
}

#[test]
fn stereo_input_is_mixed_down_to_mono() {
    let sr = 48000;
    let left = sine_wave(sr, 440.0, 1000);
    let right = sine_wave(sr, 880.0, 1000);
    let interleaved: Vec<f32> = left.iter().zip(right.iter()).flat_map(|(&l, &r)| [l, r]).collect();

    let spec = WavSpec {
        channels: 2,
        sample_rate: sr,
        bits_per_sample: 32,
    };

    let file = NamedTempFile::new().unwrap();
    write_wav(file.path(), &interleaved, spec).unwrap();

    let (mono, mono_spec) = read_wav(file.path()).unwrap();
    assert_eq!(mono_spec.channels, 2);
    assert_eq!(mono.len(), 1000);
    for (i, &m) in mono.iter().enumerate() {
        let expected = (left[i] + right[i]) / 2.0;
        assert!((m - expected).abs() < 1e-6);
    }
}

#[test]
fn wav_info_reports_metadata_without_loading_samples() {
    let sr = 48000;
    let num_samples = 2400; // 50ms
    let samples = sine_wave(sr, 440.0, num_samples);
    let spec = WavSpec {
        channels: 1,
        sample_rate: sr,
        bits_per_sample: 32,
    };

    let file = NamedTempFile::new().unwrap();
    write_wav(file.path(), &samples, spec).unwrap();

    let info = read_wav_info(file.path()).unwrap();
    assert_eq!(info.channels, 1);
    assert_eq!(info.sample_rate, sr);
    assert_eq!(info.bits_per_sample, 32);
    assert_eq!(info.num_frames, num_samples as u64);
    assert!((info.duration_secs - 0.05).abs() < 1e-6);
}

#[test]
fn wav_write_empty_buffer_roundtrips() {
    let spec = WavSpec {
        channels: 1,
        sample_rate: 48000,
        bits_per_sample: 32,
    };

    let file = NamedTempFile::new().unwrap();
    write_wav(file.path(), &[], spec).unwrap();

    let (loaded, loaded_spec) = read_wav(file.path()).unwrap();
    assert_eq!(loaded_spec.sample_rate, 48000);
    assert!(loaded.is_empty());
}
