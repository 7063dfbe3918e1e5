//! Vocabulary tables supplied at startup.
//!
//! Tables are plain structured data: a command table mapping each command key
//! to its trigger phrases, a letter table split into vowels and consonants,
//! and a word table keyed by category. Fields are optional at this layer so
//! that a single bad record never fails the whole load; the registry drops
//! incomplete records with a diagnostic.

use std::collections::BTreeMap;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::VocabularyError;

pub const COMMANDS_FILE: &str = "commands.json";
pub const LETTERS_FILE: &str = "letters.json";
pub const WORDS_FILE: &str = "words.json";

// =============================================================================
// Commands
// =============================================================================

/// One action command and the phrases that trigger it.
///
/// Trigger order is for documentation only; matching does not depend on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRecord {
    pub key: String,
    pub triggers: Vec<String>,
}

impl CommandRecord {
    pub fn new(key: &str, triggers: &[&str]) -> Self {
        Self {
            key: key.to_string(),
            triggers: triggers.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// The command table, stored on disk as `{ "walk": ["நட"], ... }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTable {
    pub commands: Vec<CommandRecord>,
}

impl CommandTable {
    /// The animation commands the character understands out of the box.
    pub fn builtin() -> Self {
        Self {
            commands: vec![
                CommandRecord::new("walk", &["நட"]),
                CommandRecord::new("run", &["ஓடு"]),
                CommandRecord::new("jump", &["குதி"]),
                CommandRecord::new("sit", &["உட்கார்", "உட்காரு"]),
                CommandRecord::new("dance", &["நடன", "டான்ஸ்"]),
            ],
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let map: BTreeMap<String, Vec<String>> = serde_json::from_str(json)?;
        Ok(Self {
            commands: map
                .into_iter()
                .map(|(key, triggers)| CommandRecord { key, triggers })
                .collect(),
        })
    }
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::builtin()
    }
}

// =============================================================================
// Letters
// =============================================================================

/// A letter as listed in `letters.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LetterRecord {
    #[serde(default)]
    pub letter: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub sound: Option<String>,
}

impl LetterRecord {
    pub fn new(letter: &str, name: &str, sound: &str) -> Self {
        Self {
            letter: Some(letter.to_string()),
            name: Some(name.to_string()),
            sound: Some(sound.to_string()),
        }
    }
}

/// The letter table; the section a record sits in decides its kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LetterTable {
    #[serde(default)]
    pub vowels: Vec<LetterRecord>,
    #[serde(default)]
    pub consonants: Vec<LetterRecord>,
}

// =============================================================================
// Words
// =============================================================================

/// A vocabulary word as listed in `words.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordRecord {
    /// Native-script form, the primary display field.
    #[serde(default)]
    pub tamil: Option<String>,
    /// Transliteration / English gloss.
    #[serde(default)]
    pub english: Option<String>,
    #[serde(default)]
    pub pronunciation: Option<String>,
    #[serde(default)]
    pub meaning: Option<String>,
    #[serde(default)]
    pub emoji: Option<String>,
    #[serde(default, rename = "imageUrl")]
    pub image_url: Option<String>,
}

/// Words grouped by category name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WordTable {
    pub categories: BTreeMap<String, Vec<WordRecord>>,
}

// =============================================================================
// All tables
// =============================================================================

/// Every vocabulary source the registry is built from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VocabularyTables {
    pub commands: CommandTable,
    pub letters: LetterTable,
    pub words: WordTable,
}

impl VocabularyTables {
    /// Load `commands.json`, `letters.json` and `words.json` from a directory.
    ///
    /// A missing command file falls back to the built-in commands; missing
    /// letter or word files leave that table empty. A file that exists but
    /// cannot be parsed is an error.
    pub fn load_dir(dir: &Path) -> Result<Self, VocabularyError> {
        let commands = match read_optional(&dir.join(COMMANDS_FILE))? {
            Some(content) => {
                CommandTable::from_json(&content).map_err(|e| malformed(dir, COMMANDS_FILE, e))?
            }
            None => {
                info!("No {} in {}, using built-in commands", COMMANDS_FILE, dir.display());
                CommandTable::builtin()
            }
        };

        let letters: LetterTable = load_optional_json(dir, LETTERS_FILE)?;
        let words: WordTable = load_optional_json(dir, WORDS_FILE)?;

        info!(
            commands = commands.commands.len(),
            vowels = letters.vowels.len(),
            consonants = letters.consonants.len(),
            word_categories = words.categories.len(),
            "Vocabulary loaded from {}",
            dir.display()
        );

        Ok(Self {
            commands,
            letters,
            words,
        })
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, VocabularyError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(VocabularyError::Read {
            path: path.display().to_string(),
            source: e,
        }),
    }
}

fn load_optional_json<T: DeserializeOwned + Default>(
    dir: &Path,
    file: &str,
) -> Result<T, VocabularyError> {
    match read_optional(&dir.join(file))? {
        Some(content) => serde_json::from_str(&content).map_err(|e| malformed(dir, file, e)),
        None => {
            warn!("No {} in {}, table left empty", file, dir.display());
            Ok(T::default())
        }
    }
}

fn malformed(dir: &Path, file: &str, err: serde_json::Error) -> VocabularyError {
    VocabularyError::Malformed {
        path: dir.join(file).display().to_string(),
        reason: err.to_string(),
    }
}
