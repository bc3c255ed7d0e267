//! # critterchat
//!
//! A chat relay that answers through one of three animal personas, all
//! backed by a single local text-generation engine:
//!
//! - **cat** - ignores what the model says and meows back
//! - **goldfish** - short replies with a small, randomly forgetful memory
//! - **sloth** - a normal reply, streamed one character at a time, slowly
//!
//! The HTTP surface lives in [`server`]; the request flow in [`chat`].

pub mod chat;
pub mod llms;
pub mod memory;
pub mod persona;
pub mod server;
pub mod streaming;
pub mod utilities;

pub use chat::{ChatReply, ChatRequest, Dispatcher};
pub use llms::{GeneratorSlot, TextGenerator};
pub use memory::{Reaper, SessionStore};
pub use persona::Persona;
pub use utilities::{ChatConfig, ChatError, GenerationError};

/// Library version reported by `/health`.
pub const VERSION: &str = "0.3.1";
