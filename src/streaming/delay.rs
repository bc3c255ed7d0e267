//! Per-character emission delays.
//!
//! Each character falls into a [`CharClass`]; each class has a base pause
//! plus uniform jitter. Ordinary characters also have a chance of an extra
//! stall.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::utilities::random::RandomSource;

/// Longest single pause a profile may produce.
pub const MAX_DELAY_SECS: f64 = 60.0;

/// Seconds to a `Duration`, clamped into `[0, MAX_DELAY_SECS]`. NaN is zero.
fn clamp_secs(secs: f64) -> Duration {
    if secs.is_nan() {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(secs.clamp(0.0, MAX_DELAY_SECS))
}

/// Character classes with distinct pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    /// `.`, `!`, `?`
    SentenceEnd,
    Space,
    /// `,`, `;`
    Clause,
    Other,
}

impl CharClass {
    pub fn of(ch: char) -> Self {
        match ch {
            '.' | '!' | '?' => Self::SentenceEnd,
            ' ' => Self::Space,
            ',' | ';' => Self::Clause,
            _ => Self::Other,
        }
    }
}

/// `base + U[0, jitter)` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayRule {
    pub base_secs: f64,
    pub jitter_secs: f64,
}

impl DelayRule {
    pub const fn new(base_secs: f64, jitter_secs: f64) -> Self {
        Self {
            base_secs,
            jitter_secs,
        }
    }

    fn sample(&self, rng: &dyn RandomSource) -> f64 {
        self.base_secs + rng.up_to(self.jitter_secs)
    }
}

/// Delay distributions for every character class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayProfile {
    pub sentence_end: DelayRule,
    pub space: DelayRule,
    pub clause: DelayRule,
    pub other: DelayRule,
    /// Chance that an ordinary character gets an extra stall.
    pub stall_probability: f64,
    /// Upper bound of the extra stall, `U[0, stall_secs)`.
    pub stall_secs: f64,
    /// Flat per-character delay for the error stream.
    pub error_delay_secs: f64,
}

impl Default for DelayProfile {
    fn default() -> Self {
        Self {
            sentence_end: DelayRule::new(0.8, 0.7),
            space: DelayRule::new(0.3, 0.4),
            clause: DelayRule::new(0.4, 0.3),
            other: DelayRule::new(0.1, 0.2),
            stall_probability: 0.2,
            stall_secs: 0.5,
            error_delay_secs: 0.2,
        }
    }
}

impl DelayProfile {
    pub fn rule(&self, class: CharClass) -> &DelayRule {
        match class {
            CharClass::SentenceEnd => &self.sentence_end,
            CharClass::Space => &self.space,
            CharClass::Clause => &self.clause,
            CharClass::Other => &self.other,
        }
    }

    /// Draw the pause before emitting `ch`.
    pub fn delay_for(&self, ch: char, rng: &dyn RandomSource) -> Duration {
        let class = CharClass::of(ch);
        let mut secs = self.rule(class).sample(rng);
        if class == CharClass::Other && rng.chance(self.stall_probability) {
            secs += rng.up_to(self.stall_secs);
        }
        clamp_secs(secs)
    }

    fn bounds_secs(&self, class: CharClass) -> (f64, f64) {
        let rule = self.rule(class);
        let mut max = rule.base_secs + rule.jitter_secs;
        if class == CharClass::Other && self.stall_probability > 0.0 {
            max += self.stall_secs;
        }
        (rule.base_secs, max)
    }

    /// `[min, max)` of the pause before `ch`.
    pub fn bounds(&self, ch: char) -> (Duration, Duration) {
        let (min, max) = self.bounds_secs(CharClass::of(ch));
        (
            clamp_secs(min),
            clamp_secs(max),
        )
    }

    pub fn error_delay(&self) -> Duration {
        clamp_secs(self.error_delay_secs)
    }

    /// Every value finite and non-negative, and no single pause longer than
    /// [`MAX_DELAY_SECS`].
    pub fn validate(&self) -> Result<(), String> {
        let fields = [
            ("sentence_end.base_secs", self.sentence_end.base_secs),
            ("sentence_end.jitter_secs", self.sentence_end.jitter_secs),
            ("space.base_secs", self.space.base_secs),
            ("space.jitter_secs", self.space.jitter_secs),
            ("clause.base_secs", self.clause.base_secs),
            ("clause.jitter_secs", self.clause.jitter_secs),
            ("other.base_secs", self.other.base_secs),
            ("other.jitter_secs", self.other.jitter_secs),
            ("stall_secs", self.stall_secs),
            ("error_delay_secs", self.error_delay_secs),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{} must be a finite, non-negative number, got {}", name, value));
            }
        }
        if !(0.0..=1.0).contains(&self.stall_probability) {
            return Err(format!(
                "stall_probability must be within [0, 1], got {}",
                self.stall_probability
            ));
        }
        for class in [CharClass::SentenceEnd, CharClass::Space, CharClass::Clause, CharClass::Other] {
            let (_, max) = self.bounds_secs(class);
            if max > MAX_DELAY_SECS {
                return Err(format!(
                    "{:?} delay can reach {}s, limit is {}s",
                    class, max, MAX_DELAY_SECS
                ));
            }
        }
        if self.error_delay_secs > MAX_DELAY_SECS {
            return Err(format!(
                "error_delay_secs {} exceeds limit of {}s",
                self.error_delay_secs, MAX_DELAY_SECS
            ));
        }
        Ok(())
    }
}

/// How an emitter paces its characters.
#[derive(Debug, Clone, PartialEq)]
pub enum Pacing {
    /// Class-dependent random delays.
    Profile(DelayProfile),
    /// The same delay before every character.
    Flat(Duration),
}

impl Pacing {
    pub fn delay_for(&self, ch: char, rng: &dyn RandomSource) -> Duration {
        match self {
            Self::Profile(profile) => profile.delay_for(ch, rng),
            Self::Flat(delay) => *delay,
        }
    }
}
