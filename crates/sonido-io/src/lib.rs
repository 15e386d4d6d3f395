//! WAV file I/O for the DRC workspace.
//!
//! - **WAV file I/O**: [`read_wav`]/[`write_wav`] for normalized float samples,
//!   [`read_wav_i32`]/[`write_wav_i32`] for the raw integer containers the
//!   DRC stage processes directly (S16/S24/S32).
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sonido_io::{read_wav_i32, write_wav_i32};
//!
//! let (samples, spec) = read_wav_i32("input.wav")?;
//! write_wav_i32("output.wav", &samples, spec)?;
//! ```

mod wav;

pub use wav::{
    WavFormat, WavInfo, WavSpec, read_wav, read_wav_i32, read_wav_info, write_wav, write_wav_i32,
};

/// Error types for audio I/O operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for audio I/O operations.
pub type Result<T> = std::result::Result<T, Error>;
