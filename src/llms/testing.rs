//! Test doubles for the generation boundary.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;

use super::base_llm::{GenerationRequest, TextGenerator};
use crate::utilities::errors::GenerationError;

#[derive(Debug, Clone)]
enum Script {
    /// Echo the prompt followed by this suffix.
    Echo(String),
    /// Return this text verbatim.
    Fixed(String),
    Fail,
    Panic,
}

/// Generator with canned behaviour that records every request.
#[derive(Debug)]
pub struct ScriptedGenerator {
    script: Script,
    delay: Option<Duration>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    fn with_script(script: Script) -> Self {
        Self {
            script,
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Echoes the prompt with " echoed reply" appended, like a causal LM.
    pub fn echo() -> Self {
        Self::with_script(Script::Echo(" echoed reply".to_string()))
    }

    /// Echoes the prompt followed by `suffix`.
    pub fn echo_with(suffix: &str) -> Self {
        Self::with_script(Script::Echo(suffix.to_string()))
    }

    /// Returns `text` without the prompt.
    pub fn fixed(text: &str) -> Self {
        Self::with_script(Script::Fixed(text.to_string()))
    }

    /// Always fails with `EngineUnavailable`.
    pub fn failing() -> Self {
        Self::with_script(Script::Fail)
    }

    /// Panics inside `generate`, standing in for a persona bug.
    pub fn panicking() -> Self {
        Self::with_script(Script::Panic)
    }

    /// Sleep this long (tokio time) before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.requests.lock().iter().map(|r| r.prompt.clone()).collect()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn model(&self) -> &str {
        match self.script {
            Script::Echo(_) => "scripted-echo",
            Script::Fixed(_) => "scripted-fixed",
            Script::Fail => "scripted-fail",
            Script::Panic => "scripted-panic",
        }
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        request.validate()?;
        self.requests.lock().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.script {
            Script::Echo(suffix) => Ok(format!("{}{}", request.prompt, suffix)),
            Script::Fixed(text) => Ok(text.clone()),
            Script::Fail => Err(GenerationError::EngineUnavailable("scripted failure".into())),
            Script::Panic => panic!("scripted generator panic"),
        }
    }
}
