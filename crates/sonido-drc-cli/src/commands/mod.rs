//! Subcommand implementations, one module per `Commands` variant.

pub mod info;
pub mod process;
pub mod scenario;
