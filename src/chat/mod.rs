//! Chat entry point.
//!
//! ```text
//! ChatRequest
//!   → validate message and persona tag
//!   → wait for the generator slot (503 until loaded)
//!   → Cat / Goldfish → ChatReply::Complete
//!   → Sloth          → ChatReply::Stream
//! ```

pub mod dispatcher;

pub use dispatcher::{ChatReply, ChatRequest, Dispatcher, DEFAULT_SESSION_ID};
