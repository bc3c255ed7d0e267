//! Persona profiles: the per-persona prompt and sampling settings that sit
//! in front of the one shared generator.

use serde::{Deserialize, Serialize};

use crate::llms::GenerationRequest;

/// Prompt template, sampling parameters and fallback strings for one persona.
///
/// Templates use `{name}` placeholders filled by [`PersonaProfile::render`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaProfile {
    pub prompt_template: String,
    /// Literal splitting the echoed prompt from the model's reply.
    pub cue_marker: String,
    pub temperature: f64,
    pub top_p: f64,
    pub max_tokens: u32,
    /// Used when the cue marker is missing from the generated text.
    pub fallback_reply: String,
    /// Used when the generator itself fails.
    pub error_reply: String,
    /// Reply length cap in characters.
    pub max_reply_chars: usize,
}

impl PersonaProfile {
    pub fn cat() -> Self {
        Self {
            prompt_template: "User: {input}\nCat:".to_string(),
            cue_marker: "Cat:".to_string(),
            temperature: 0.7,
            top_p: 0.9,
            max_tokens: 60,
            fallback_reply: "meow".to_string(),
            error_reply: "meow meow!".to_string(),
            max_reply_chars: 200,
        }
    }

    pub fn goldfish() -> Self {
        Self {
            prompt_template: "{preamble}\n{context}User: {input}\nGoldfish:".to_string(),
            cue_marker: "Goldfish:".to_string(),
            temperature: 0.9,
            top_p: 0.95,
            max_tokens: 80,
            fallback_reply: "Wait, what were we talking about?".to_string(),
            error_reply: "Sorry, I forgot what I was going to say...".to_string(),
            max_reply_chars: 200,
        }
    }

    pub fn sloth() -> Self {
        Self {
            prompt_template: "User: {input}\nSloth:".to_string(),
            cue_marker: "Sloth:".to_string(),
            temperature: 0.7,
            top_p: 0.9,
            max_tokens: 60,
            fallback_reply: "Hmm... let me think about that... slowly...".to_string(),
            error_reply: "Sorry... I fell asleep... please try again later 🦥".to_string(),
            max_reply_chars: 150,
        }
    }

    /// Fill `{key}` placeholders. Unknown placeholders are left as-is.
    pub fn render(&self, vars: &[(&str, &str)]) -> String {
        let mut prompt = self.prompt_template.clone();
        for (key, value) in vars {
            prompt = prompt.replace(&format!("{{{}}}", key), value);
        }
        prompt
    }

    /// Generation request carrying this profile's sampling settings.
    pub fn request(&self, prompt: String) -> GenerationRequest {
        GenerationRequest {
            prompt,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            top_p: self.top_p,
        }
    }

    /// Pull the reply out of generated text.
    ///
    /// Takes whatever follows the last cue marker, keeps its first non-empty
    /// line and caps it at `max_reply_chars`. Without a marker (or with
    /// nothing after it) the fixed fallback is returned instead.
    pub fn extract_reply(&self, generated: &str) -> String {
        let tail = match generated.rfind(&self.cue_marker) {
            Some(pos) => &generated[pos + self.cue_marker.len()..],
            None => return self.fallback_reply.clone(),
        };

        match tail.lines().map(str::trim).find(|line| !line.is_empty()) {
            Some(line) => truncate_chars(line, self.max_reply_chars).trim_end().to_string(),
            None => self.fallback_reply.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.prompt_template.contains("{input}") {
            return Err("prompt_template must contain {input}".into());
        }
        if self.cue_marker.is_empty() {
            return Err("cue_marker cannot be empty".into());
        }
        if self.max_tokens == 0 {
            return Err("max_tokens must be positive".into());
        }
        if !(self.temperature > 0.0) {
            return Err(format!("temperature must be positive, got {}", self.temperature));
        }
        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            return Err(format!("top_p must be within (0, 1], got {}", self.top_p));
        }
        if self.max_reply_chars == 0 {
            return Err("max_reply_chars must be positive".into());
        }
        Ok(())
    }
}

/// Cut to at most `max` characters, respecting char boundaries.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_profiles_validate() {
        PersonaProfile::cat().validate().unwrap();
        PersonaProfile::goldfish().validate().unwrap();
        PersonaProfile::sloth().validate().unwrap();
    }

    #[test]
    fn test_goldfish_runs_hotter_than_cat() {
        assert!(PersonaProfile::goldfish().temperature > PersonaProfile::cat().temperature);
    }

    #[test]
    fn test_render_fills_placeholders() {
        let profile = PersonaProfile::goldfish();
        let prompt = profile.render(&[
            ("preamble", "Oh hi!"),
            ("context", "User: a\nGoldfish: b\n"),
            ("input", "hello"),
        ]);
        assert_eq!(prompt, "Oh hi!\nUser: a\nGoldfish: b\nUser: hello\nGoldfish:");
    }

    #[test]
    fn test_extract_after_last_marker() {
        let profile = PersonaProfile::goldfish();
        let text = "User: a\nGoldfish: old\nUser: b\nGoldfish: fresh reply\nUser: more";
        assert_eq!(profile.extract_reply(text), "fresh reply");
    }

    #[test]
    fn test_extract_without_marker_uses_fallback() {
        let profile = PersonaProfile::sloth();
        assert_eq!(
            profile.extract_reply("no marker anywhere"),
            "Hmm... let me think about that... slowly..."
        );
    }

    #[test]
    fn test_extract_empty_tail_uses_fallback() {
        let profile = PersonaProfile::sloth();
        assert_eq!(profile.extract_reply("User: x\nSloth:   \n\n"), profile.fallback_reply);
    }

    #[test]
    fn test_extract_skips_leading_blank_line() {
        let profile = PersonaProfile::sloth();
        assert_eq!(profile.extract_reply("Sloth:\n  slow words  \nnext"), "slow words");
    }

    #[test]
    fn test_extract_truncates_by_chars() {
        let mut profile = PersonaProfile::sloth();
        profile.max_reply_chars = 3;
        assert_eq!(profile.extract_reply("Sloth: 🦥🦥🦥🦥"), "🦥🦥🦥");
    }

    #[test]
    fn test_validate_rejects_bad_top_p() {
        let mut profile = PersonaProfile::cat();
        profile.top_p = 1.5;
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_truncate_chars_short_input() {
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abcdef", 2), "ab");
    }
}
