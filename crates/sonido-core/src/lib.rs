//! Sonido Core - DSP math primitives shared across the sonido workspace
//!
//! This crate provides the foundational numeric building blocks for audio
//! DSP: level conversions, waveshaping, and related utilities, designed for
//! real-time processing with zero allocation.
//!
//! # Utilities
//!
//! - Math functions: [`db_to_linear`], [`linear_to_db`], [`fast_tanh`], etc.
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible for embedded audio applications.
//! Disable the default `std` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! sonido-core = { version = "0.1", default-features = false }
//! ```
//!
//! # Design Principles
//!
//! - **Real-time safe**: No allocations in audio processing paths
//! - **No dependencies on std**: Pure `no_std` with `libm` for math

#![cfg_attr(not(feature = "std"), no_std)]

pub mod math;

// Re-export main types at crate root
pub use math::{
    asymmetric_clip, db_to_linear, fast_tanh, flush_denormal, foldback, hard_clip, linear_to_db,
    mono_sum, soft_clip, wet_dry_mix, wet_dry_mix_stereo,
};
