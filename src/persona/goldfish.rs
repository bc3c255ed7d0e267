//! Goldfish persona: short, lossy memory.
//!
//! Each call works on a draft copy of the session:
//!
//! 1. cap the history at `2 * max_exchanges` turns, oldest dropped first;
//! 2. independently, with `amnesia_probability`, forget everything;
//! 3. render the last `context_turns` turns as prompt context;
//! 4. generate hot (high temperature) behind a random forgetful preamble;
//! 5. cut the reply out after the cue marker and add a fish;
//! 6. append the exchange, re-apply the cap and write the draft back.
//!
//! The session lock is held for the whole exchange so calls on the same key
//! never interleave. A failed generation writes nothing back.

use std::sync::Arc;

use crate::llms::TextGenerator;
use crate::memory::session::{Role, SessionStore, Turn};
use crate::persona::profile::PersonaProfile;
use crate::utilities::config::MemoryConfig;
use crate::utilities::random::{choose, RandomSource};

pub const FORGETFUL_PREAMBLES: [&str; 6] = [
    "Oh! Hello there, new friend!",
    "Wait, have we met before?",
    "Ooh, a shiny new conversation!",
    "Sorry, what was the question again?",
    "Blub... where was I?",
    "Hi! I just got here, I think.",
];

pub const FISH_EMOJIS: [&str; 4] = ["🐟", "🐠", "🐡", "🫧"];

/// Render turns as `User: ...` / `Goldfish: ...` lines, each newline-terminated.
pub fn render_context(turns: &[Turn]) -> String {
    turns
        .iter()
        .map(|turn| {
            let speaker = match turn.role {
                Role::User => "User",
                Role::Persona => "Goldfish",
            };
            format!("{}: {}\n", speaker, turn.text)
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct GoldfishPersona {
    generator: Arc<dyn TextGenerator>,
    profile: PersonaProfile,
    memory: MemoryConfig,
    store: SessionStore,
    rng: Arc<dyn RandomSource>,
}

impl GoldfishPersona {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        profile: PersonaProfile,
        memory: MemoryConfig,
        store: SessionStore,
        rng: Arc<dyn RandomSource>,
    ) -> Self {
        Self {
            generator,
            profile,
            memory,
            store,
            rng,
        }
    }

    fn fish(&self) -> &'static str {
        *choose(self.rng.as_ref(), &FISH_EMOJIS)
    }

    /// Reply to `input` within session `session_key`.
    pub async fn respond(&self, input: &str, session_key: &str) -> String {
        let handle = self.store.get_or_create(session_key);
        let mut session = handle.lock().await;
        let mut draft = session.clone();

        let max_turns = 2 * self.memory.max_exchanges;
        let capped = draft.retain_latest(max_turns);
        if capped > 0 {
            log::debug!("Session '{}': dropped {} old turns", session_key, capped);
        }
        if self.rng.chance(self.memory.amnesia_probability) {
            let forgotten = draft.clear();
            log::debug!("Session '{}': amnesia, forgot {} turns", session_key, forgotten);
        }

        let context = render_context(draft.recent(self.memory.context_turns));
        let preamble = *choose(self.rng.as_ref(), &FORGETFUL_PREAMBLES);
        let prompt = self.profile.render(&[
            ("preamble", preamble),
            ("context", &context),
            ("input", input),
        ]);

        let generated = match self.generator.generate(&self.profile.request(prompt)).await {
            Ok(text) => text,
            Err(e) => {
                log::warn!("Goldfish generation failed for '{}': {}", session_key, e);
                return format!("{} {}", self.profile.error_reply, self.fish());
            }
        };

        let reply = format!("{} {}", self.profile.extract_reply(&generated), self.fish());
        draft.push_exchange(input, reply.clone());
        draft.retain_latest(max_turns);
        *session = draft;
        drop(session);
        self.store.mark_updated(session_key, &handle);

        reply
    }
}
