//! Generation adapter boundary.
//!
//! Every persona talks to the text-generation engine through the
//! [`TextGenerator`] trait. One instance is shared by all three personas;
//! what differs per persona is the [`GenerationRequest`] they build.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utilities::errors::GenerationError;

/// A single prompt-completion request. Not retained after the call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
    pub temperature: f64,
    /// Nucleus-sampling mass.
    pub top_p: f64,
}

impl GenerationRequest {
    /// Check the adapter contract before any I/O happens.
    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.prompt.trim().is_empty() {
            return Err(GenerationError::InvalidRequest("prompt is empty".into()));
        }
        if self.max_tokens == 0 {
            return Err(GenerationError::InvalidRequest(
                "max_tokens must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// The external text-generation engine.
///
/// Implementations return the full generated text, which for a
/// causal-LM pipeline includes the prompt itself. Callers split the reply
/// out with a cue marker.
#[async_trait]
pub trait TextGenerator: Send + Sync + fmt::Debug {
    /// Short identifier for logs and the health check.
    fn model(&self) -> &str;

    /// Run one completion.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

/// Generate a unique call ID for log correlation.
pub fn generate_call_id() -> String {
    Uuid::new_v4().to_string()
}


/// Write-once holder for the shared generator.
///
/// Empty until the engine has finished loading; the dispatcher answers
/// "not ready" until then.
#[derive(Debug, Clone, Default)]
pub struct GeneratorSlot {
    inner: Arc<OnceCell<Arc<dyn TextGenerator>>>,
}

impl GeneratorSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// A slot that is ready from the start.
    pub fn ready(generator: Arc<dyn TextGenerator>) -> Self {
        let slot = Self::new();
        slot.install(generator);
        slot
    }

    /// Install the generator. Returns `false` if one was already installed.
    pub fn install(&self, generator: Arc<dyn TextGenerator>) -> bool {
        let model = generator.model().to_string();
        let installed = self.inner.set(generator).is_ok();
        if installed {
            log::info!("Generator '{}' installed", model);
        } else {
            log::warn!("Generator already installed; ignoring '{}'", model);
        }
        installed
    }

    pub fn get(&self) -> Option<Arc<dyn TextGenerator>> {
        self.inner.get().cloned()
    }

    pub fn is_ready(&self) -> bool {
        self.inner.get().is_some()
    }
}
