//! Text-generation boundary.
//!
//! - [`base_llm`] - the [`TextGenerator`] trait, requests and the readiness slot
//! - [`providers`] - concrete engines (Ollama)

pub mod base_llm;
pub mod providers;

#[cfg(test)]
pub mod testing;

pub use base_llm::{GenerationRequest, GeneratorSlot, TextGenerator};
pub use providers::ollama::OllamaGenerator;
