use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Enums
// =============================================================================

/// Vocabulary category a trigger belongs to.
///
/// The declaration order is not the match priority; the matcher fixes its
/// own order (Word, then Letter, then Command) for exact matches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// An action command that switches the character animation.
    Command,
    /// A single letter of the alphabet.
    Letter,
    /// A multi-word vocabulary item.
    Word,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Command => write!(f, "command"),
            Category::Letter => write!(f, "letter"),
            Category::Word => write!(f, "word"),
        }
    }
}

/// Whether a letter is a vowel or a consonant.
///
/// Consonants are displayed without their dead-consonant mark; vowels keep
/// their form.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LetterKind {
    #[default]
    Vowel,
    Consonant,
}

/// Matching strategy that produced a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    /// A transcript token equals a trigger.
    Exact,
    /// A transcript token contains a (long enough) trigger.
    Partial,
    /// A single glyph recovered from a clipped transcript.
    SingleChar,
}

impl fmt::Display for MatchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchTier::Exact => write!(f, "exact"),
            MatchTier::Partial => write!(f, "partial"),
            MatchTier::SingleChar => write!(f, "single_char"),
        }
    }
}

/// Error reported by the recognizer capability.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecognitionErrorKind {
    /// The recognizer heard nothing before it timed out.
    NoSpeech,
    /// The recognizer was interrupted from outside.
    Aborted,
    /// Any other fault (network, audio capture, service).
    Other(String),
}

/// How the session controller reacts to a recognition error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Silence: restart quietly.
    BenignSilence,
    /// External interruption: restart quietly, sooner.
    Aborted,
    /// A real fault: surface it, then restart.
    Fault,
}

impl RecognitionErrorKind {
    /// Parse the error code reported by a recognizer.
    pub fn from_code(code: &str) -> Self {
        match code {
            "no-speech" | "no_speech" => RecognitionErrorKind::NoSpeech,
            "aborted" => RecognitionErrorKind::Aborted,
            other => RecognitionErrorKind::Other(other.to_string()),
        }
    }

    pub fn classify(&self) -> ErrorClass {
        match self {
            RecognitionErrorKind::NoSpeech => ErrorClass::BenignSilence,
            RecognitionErrorKind::Aborted => ErrorClass::Aborted,
            RecognitionErrorKind::Other(_) => ErrorClass::Fault,
        }
    }

    /// Transient errors are recovered internally and never surfaced.
    pub fn is_transient(&self) -> bool {
        !matches!(self.classify(), ErrorClass::Fault)
    }
}

impl fmt::Display for RecognitionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecognitionErrorKind::NoSpeech => write!(f, "no-speech"),
            RecognitionErrorKind::Aborted => write!(f, "aborted"),
            RecognitionErrorKind::Other(code) => write!(f, "{}", code),
        }
    }
}

// =============================================================================
// Newtype Wrappers
// =============================================================================

/// Key of an action command, e.g. `walk` or `dance`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CommandKey(pub String);

impl CommandKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommandKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for a recognition session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unix timestamp in milliseconds since epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.0).unwrap_or_default()
    }
}

// =============================================================================
// Payloads
// =============================================================================

/// Display data for a letter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LetterInfo {
    /// Glyph to display; consonants are reduced to their base glyph.
    pub display_form: String,
    /// Spoken name of the letter.
    pub name: String,
    /// Sound hint shown next to the letter.
    #[serde(default)]
    pub sound: String,
    pub kind: LetterKind,
}

/// Display data for a vocabulary word.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordInfo {
    /// The word in its native script.
    pub surface_form: String,
    pub gloss_english: String,
    /// Romanized pronunciation.
    pub pronunciation: String,
    pub meaning: String,
    /// Category the word was listed under, e.g. `animals`.
    pub category: String,
    pub illustration: Option<String>,
    pub icon: Option<String>,
}

/// What a trigger resolves to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum Payload {
    Command { key: CommandKey },
    Letter(LetterInfo),
    Word(WordInfo),
}

impl Payload {
    pub fn category(&self) -> Category {
        match self {
            Payload::Command { .. } => Category::Command,
            Payload::Letter(_) => Category::Letter,
            Payload::Word(_) => Category::Word,
        }
    }
}

/// The outcome of a successful resolution.
///
/// "No match" is not represented here: the matcher returns `None` and the
/// display keeps whatever it showed before.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedMatch {
    pub category: Category,
    pub payload: Payload,
    /// Raw trigger text that matched.
    pub matched_trigger: String,
    pub tier: MatchTier,
}
