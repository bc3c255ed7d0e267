//! Shared plumbing: configuration, errors and randomness.

pub mod config;
pub mod errors;
pub mod random;

pub use config::ChatConfig;
pub use errors::{ChatError, ConfigError, GenerationError};
pub use random::{RandomSource, ThreadRandom};
