//! Personas: the three ways a chat reply gets transformed.
//!
//! ```text
//! Persona::Cat       -> CatPersona::respond         -> meows + emojis
//! Persona::Goldfish  -> GoldfishPersona::respond    -> short reply, lossy session
//! Persona::Sloth     -> SlothPersona::stream_respond -> slow character stream
//! ```
//!
//! All three share one [`TextGenerator`](crate::llms::TextGenerator) and
//! differ only in their [`PersonaProfile`] and post-processing.

pub mod cat;
pub mod goldfish;
pub mod profile;
pub mod sloth;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::llms::TextGenerator;
use crate::memory::SessionStore;
use crate::utilities::config::ChatConfig;
use crate::utilities::errors::ChatError;
use crate::utilities::random::RandomSource;

pub use cat::CatPersona;
pub use goldfish::GoldfishPersona;
pub use profile::PersonaProfile;
pub use sloth::SlothPersona;

/// Selectable persona, parsed case-insensitively from the request's `model`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Persona {
    Cat,
    Goldfish,
    Sloth,
}

impl Persona {
    pub const ALL: [Persona; 3] = [Persona::Cat, Persona::Goldfish, Persona::Sloth];

    pub fn as_str(&self) -> &'static str {
        match self {
            Persona::Cat => "cat",
            Persona::Goldfish => "goldfish",
            Persona::Sloth => "sloth",
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Persona {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cat" => Ok(Persona::Cat),
            "goldfish" => Ok(Persona::Goldfish),
            "sloth" => Ok(Persona::Sloth),
            _ => Err(ChatError::InvalidModel(s.to_string())),
        }
    }
}

/// The three transformers wired to one generator.
#[derive(Debug, Clone)]
pub struct Personas {
    pub cat: CatPersona,
    pub goldfish: GoldfishPersona,
    pub sloth: SlothPersona,
}

impl Personas {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        config: &ChatConfig,
        store: SessionStore,
        rng: Arc<dyn RandomSource>,
    ) -> Self {
        Self {
            cat: CatPersona::new(Arc::clone(&generator), config.cat.clone(), Arc::clone(&rng)),
            goldfish: GoldfishPersona::new(
                Arc::clone(&generator),
                config.goldfish.clone(),
                config.memory.clone(),
                store,
                Arc::clone(&rng),
            ),
            sloth: SlothPersona::new(generator, config.sloth.clone(), config.stream.clone(), rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("cat".parse::<Persona>().unwrap(), Persona::Cat);
        assert_eq!("GoldFish".parse::<Persona>().unwrap(), Persona::Goldfish);
        assert_eq!(" SLOTH ".parse::<Persona>().unwrap(), Persona::Sloth);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        let err = "dog".parse::<Persona>().unwrap_err();
        assert!(matches!(err, ChatError::InvalidModel(ref m) if m == "dog"));
        assert!(err.is_client_error());
        assert!("".parse::<Persona>().is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for persona in Persona::ALL {
            assert_eq!(persona.to_string().parse::<Persona>().unwrap(), persona);
        }
    }
}
