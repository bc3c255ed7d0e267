//! Generation engine implementations.
//!
//! Each provider implements [`TextGenerator`](crate::llms::base_llm::TextGenerator).

pub mod ollama;
