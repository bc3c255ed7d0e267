//! Sloth persona: a normal reply, delivered very slowly.

use std::sync::Arc;

use crate::llms::TextGenerator;
use crate::persona::profile::PersonaProfile;
use crate::streaming::{spawn_emitter, CharStream, DelayProfile, Pacing};
use crate::utilities::errors::GenerationError;
use crate::utilities::random::RandomSource;

pub const SLOTH_EMOJI: &str = "🦥";

#[derive(Debug, Clone)]
pub struct SlothPersona {
    generator: Arc<dyn TextGenerator>,
    profile: PersonaProfile,
    delays: DelayProfile,
    rng: Arc<dyn RandomSource>,
}

impl SlothPersona {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        profile: PersonaProfile,
        delays: DelayProfile,
        rng: Arc<dyn RandomSource>,
    ) -> Self {
        Self {
            generator,
            profile,
            delays,
            rng,
        }
    }

    /// Generate the full reply up front, always ending up with a sloth in it.
    pub async fn compose(&self, input: &str) -> Result<String, GenerationError> {
        let prompt = self.profile.render(&[("input", input)]);
        let generated = self.generator.generate(&self.profile.request(prompt)).await?;
        let mut reply = self.profile.extract_reply(&generated);
        if !reply.contains(SLOTH_EMOJI) {
            reply.push(' ');
            reply.push_str(SLOTH_EMOJI);
        }
        Ok(reply)
    }

    /// Compose eagerly, then hand back a stream that trickles the reply out.
    ///
    /// On generation failure the apology is streamed instead, at a flat pace.
    pub async fn stream_respond(&self, input: &str) -> CharStream {
        match self.compose(input).await {
            Ok(reply) => spawn_emitter(reply, Pacing::Profile(self.delays.clone()), Arc::clone(&self.rng)),
            Err(e) => {
                log::warn!("Sloth generation failed, streaming apology: {}", e);
                spawn_emitter(
                    self.profile.error_reply.clone(),
                    Pacing::Flat(self.delays.error_delay()),
                    Arc::clone(&self.rng),
                )
            }
        }
    }
}
