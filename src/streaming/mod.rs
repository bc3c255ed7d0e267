//! Streaming scheduler for slow, character-by-character replies.
//!
//! - [`delay`] - per-character-class delay distributions
//! - [`emitter`] - the cancellable timed-emission task and its stream handle

pub mod delay;
pub mod emitter;

pub use delay::{CharClass, DelayProfile, DelayRule, Pacing};
pub use emitter::{spawn_emitter, CharStream, StreamToken};
