//! Cat persona: answers in meows.
//!
//! The generator is still called (with the cat prompt) so the adapter
//! boundary is exercised and the latency is real, but its text is thrown
//! away. The reply is synthesized: one meow per input word, clamped to
//! 2..=8, followed by one to three distinct cat emojis.

use std::sync::Arc;

use crate::llms::TextGenerator;
use crate::persona::profile::PersonaProfile;
use crate::utilities::random::{choose, choose_distinct, RandomSource};

pub const MEOWS: [&str; 5] = ["meow", "mrow", "purr", "mew", "meeeow"];

pub const MEOW_SUFFIXES: [&str; 6] = ["", "!", "~", "?", "...", " :3"];

pub const CAT_EMOJIS: [&str; 9] = ["😺", "😸", "😹", "😻", "😼", "😽", "🙀", "😿", "😾"];

pub const MIN_MEOWS: usize = 2;
pub const MAX_MEOWS: usize = 8;
pub const MAX_EMOJIS: usize = 3;

/// A synthesized cat reply before rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeowReply {
    /// Base plus suffix, e.g. `"purr~"`.
    pub meows: Vec<String>,
    pub emojis: Vec<&'static str>,
}

impl MeowReply {
    pub fn render(&self) -> String {
        format!("{} {}", self.meows.join(" "), self.emojis.concat())
    }
}

/// Number of whitespace-separated words.
pub fn word_count(input: &str) -> usize {
    input.split_whitespace().count()
}

#[derive(Debug, Clone)]
pub struct CatPersona {
    generator: Arc<dyn TextGenerator>,
    profile: PersonaProfile,
    rng: Arc<dyn RandomSource>,
}

impl CatPersona {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        profile: PersonaProfile,
        rng: Arc<dyn RandomSource>,
    ) -> Self {
        Self {
            generator,
            profile,
            rng,
        }
    }

    /// Reply to `input`. Never fails: a generator error yields the fixed
    /// fallback plus one emoji.
    pub async fn respond(&self, input: &str) -> String {
        let prompt = self.profile.render(&[("input", input)]);
        match self.generator.generate(&self.profile.request(prompt)).await {
            Ok(_flavor) => self.synthesize(input).render(),
            Err(e) => {
                log::warn!("Cat generation failed, using fallback: {}", e);
                format!("{} {}", self.profile.error_reply, choose(self.rng.as_ref(), &CAT_EMOJIS))
            }
        }
    }

    /// Build the meows and emojis for `input`.
    pub fn synthesize(&self, input: &str) -> MeowReply {
        let rng = self.rng.as_ref();
        let count = word_count(input).clamp(MIN_MEOWS, MAX_MEOWS);
        let meows = (0..count)
            .map(|_| format!("{}{}", choose(rng, &MEOWS), choose(rng, &MEOW_SUFFIXES)))
            .collect();
        let emoji_count = 1 + rng.index(MAX_EMOJIS);
        let emojis = choose_distinct(rng, &CAT_EMOJIS, emoji_count)
            .into_iter()
            .copied()
            .collect();
        MeowReply { meows, emojis }
    }
}
