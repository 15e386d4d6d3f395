//! Error types for the compressor stage.
//!
//! Configuration, resource, and format errors are reported to the caller
//! through this enum. Runtime numeric anomalies are absorbed by
//! [`crate::math::sanitize`] and never surfaced here.

use thiserror::Error;

/// Errors a [`crate::stage::DrcStage`] operation can report.
///
/// `copy` itself never returns this type in the steady-state path: bad
/// floats are recovered locally, not propagated.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum DrcError {
    /// A configuration blob (or upload) exceeds `MAX_CONFIG_BYTES`.
    #[error("configuration blob of {size} bytes exceeds the {max} byte limit")]
    ConfigTooLarge {
        /// Size that was rejected.
        size: usize,
        /// The limit it was compared against.
        max: usize,
    },

    /// A configuration blob failed structural or invariant validation.
    #[error("malformed configuration: {0}")]
    ConfigMalformed(&'static str),

    /// A second `msg_index == 0` arrived while a prior upload is still in
    /// progress.
    #[error("a configuration upload is already in progress")]
    UploadBusy,

    /// Source and sink sample formats differ at `prepare`.
    #[error("source and sink sample formats must match")]
    FormatMismatch,

    /// Requested channel count exceeds `MAX_CHANNELS`.
    #[error("channel count {requested} exceeds the maximum of {max}")]
    ChannelCountExceeded {
        /// Channels the host requested.
        requested: usize,
        /// `MAX_CHANNELS`.
        max: usize,
    },

    /// No processing function bound for the requested sample format.
    #[error("no processing function for the requested sample format")]
    UnsupportedFormat,

    /// Pre-delay buffer allocation failed at `prepare`.
    #[error("failed to allocate pre-delay buffers")]
    ResourceExhausted,
}
