//! Sonido DRC - dynamic range compressor engine for a streaming audio pipeline stage.
//!
//! This crate implements the signal-processing core of a look-ahead dynamic
//! range compressor: pre-delay buffers, a shaped-power detector, an
//! attack/release envelope follower, and per-division output gain. It also
//! provides a minimal in-repo stand-in for the pipeline host's view of a
//! stage ([`stage::DrcStage`]) so the engine is exercisable without a real
//! host: the lifecycle state machine and the chunked configuration upload
//! protocol.
//!
//! # Modules
//!
//! - [`math`] - pure numeric primitives (dB/linear, warp, knee, Q-format).
//! - [`predelay`] - per-channel look-ahead ring buffers.
//! - [`detector`] - shaped-power compression curve and running average.
//! - [`envelope`] - attack/release envelope follower.
//! - [`compress`] - per-division output gain application.
//! - [`engine`] - the processing driver tying the above together.
//! - [`config`] - the parameter table and its chunked wire format.
//! - [`stage`] - lifecycle state machine and configuration transport.
//! - [`error`] - error types reported to the caller.
//!
//! # no_std support
//!
//! Mirrors `sonido-core`'s `std`/`alloc` feature split: with the `std`
//! feature disabled this crate is `no_std` (every buffer is a fixed-size
//! array sized by the constants below, never heap-allocated).

#![cfg_attr(not(feature = "std"), no_std)]

pub mod compress;
pub mod config;
pub mod detector;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod math;
pub mod predelay;
pub mod stage;

pub use config::{DrcConfig, DrcRuntimeParams};
pub use engine::DrcEngine;
pub use error::DrcError;
pub use stage::{DrcStage, SampleFormat, StreamParams, Trigger};

/// Processing granularity: the block of samples at which the detector and
/// envelope update. A power of two.
pub const DIVISION_FRAMES: usize = 32;

/// Capacity of each per-channel pre-delay ring, in frames. A power of two
/// and a multiple of [`DIVISION_FRAMES`]; used as a mask.
pub const MAX_PRE_DELAY_FRAMES: usize = 1024;

/// Initial look-ahead, in frames, before any configuration sets an explicit
/// `pre_delay_time` (matches the original firmware's default of 8ms at
/// 32kHz-class rates, rounded to a `DIVISION_FRAMES` multiple).
pub const DEFAULT_PRE_DELAY_FRAMES: usize = 256;

/// Upper bound on simultaneously processed channels.
pub const MAX_CHANNELS: usize = 2;

/// `10^(-2/20)`, the release-shaping breakpoint between the fast and
/// dB-proportional release rates.
pub const NEG_TWO_DB: f32 = 0.794_328_2;

/// Maximum size, in bytes, of an uploaded configuration blob.
pub const MAX_CONFIG_BYTES: usize = 1024;
