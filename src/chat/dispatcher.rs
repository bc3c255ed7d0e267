//! Request dispatcher: validate, pick a persona, run it.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::llms::GeneratorSlot;
use crate::memory::SessionStore;
use crate::persona::{Persona, Personas};
use crate::streaming::CharStream;
use crate::utilities::config::ChatConfig;
use crate::utilities::errors::ChatError;
use crate::utilities::random::RandomSource;

pub const DEFAULT_SESSION_ID: &str = "default";

fn default_session_id() -> String {
    DEFAULT_SESSION_ID.to_string()
}

// ============================================================================
// Request / Reply types
// ============================================================================

/// Incoming chat request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The user's message text.
    #[serde(default)]
    pub message: String,
    /// Persona tag: `cat`, `goldfish` or `sloth` (any case).
    #[serde(default)]
    pub model: String,
    /// Session identifier for goldfish memory.
    #[serde(default = "default_session_id")]
    pub session_id: String,
    /// Display name of the caller. Logged only.
    #[serde(default)]
    pub name: Option<String>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            model: model.into(),
            session_id: default_session_id(),
            name: None,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    /// The session key, with blank ids folded into the default session.
    pub fn session_key(&self) -> &str {
        match self.session_id.trim() {
            "" => DEFAULT_SESSION_ID,
            key => key,
        }
    }
}

/// A persona's answer: either finished text or a live stream.
#[derive(Debug)]
pub enum ChatReply {
    Complete(String),
    Stream(CharStream),
}

impl ChatReply {
    /// Finished text, draining the stream if needed.
    pub async fn into_text(self) -> String {
        match self {
            ChatReply::Complete(text) => text,
            ChatReply::Stream(stream) => stream.collect_text().await,
        }
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Routes requests to personas once the generator is available.
#[derive(Debug)]
pub struct Dispatcher {
    slot: GeneratorSlot,
    store: SessionStore,
    rng: Arc<dyn RandomSource>,
    config: Arc<ChatConfig>,
    personas: OnceCell<Arc<Personas>>,
}

impl Dispatcher {
    pub fn new(
        slot: GeneratorSlot,
        store: SessionStore,
        rng: Arc<dyn RandomSource>,
        config: Arc<ChatConfig>,
    ) -> Self {
        Self {
            slot,
            store,
            rng,
            config,
            personas: OnceCell::new(),
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub fn models_loaded(&self) -> bool {
        self.slot.is_ready()
    }

    /// Personas bound to the installed generator, built on first use.
    fn personas(&self) -> Result<Arc<Personas>, ChatError> {
        if let Some(personas) = self.personas.get() {
            return Ok(Arc::clone(personas));
        }
        let generator = self.slot.get().ok_or(ChatError::NotReady)?;
        let personas = self.personas.get_or_init(|| {
            Arc::new(Personas::new(
                generator,
                &self.config,
                self.store.clone(),
                Arc::clone(&self.rng),
            ))
        });
        Ok(Arc::clone(personas))
    }

    /// Handle one chat request.
    ///
    /// The persona runs on its own task so a goldfish exchange completes
    /// and is recorded even if the caller goes away mid-generation.
    pub async fn dispatch(&self, request: ChatRequest) -> Result<ChatReply, ChatError> {
        let message = request.message.trim();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let persona: Persona = request.model.parse()?;
        let personas = self.personas()?;

        let session_key = request.session_key().to_string();
        log::debug!(
            "Dispatching to {} (session '{}', caller {:?})",
            persona,
            session_key,
            request.name.as_deref().unwrap_or("anonymous")
        );

        let message = message.to_string();
        let task = tokio::spawn(async move {
            match persona {
                Persona::Cat => ChatReply::Complete(personas.cat.respond(&message).await),
                Persona::Goldfish => {
                    ChatReply::Complete(personas.goldfish.respond(&message, &session_key).await)
                }
                Persona::Sloth => ChatReply::Stream(personas.sloth.stream_respond(&message).await),
            }
        });

        task.await.map_err(|e| {
            log::error!("{} persona task failed: {}", persona, e);
            ChatError::Internal(format!("{} persona failed", persona))
        })
    }
}
