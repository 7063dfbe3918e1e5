//! Flat registry of pre-normalized triggers.
//!
//! Built once from the vocabulary tables and read-only afterwards. Each raw
//! trigger is normalized exactly once here so the matcher never normalizes
//! vocabulary at resolution time.

use pommai_core::config::MatchingConfig;
use pommai_core::types::{Category, CommandKey, LetterInfo, LetterKind, Payload, WordInfo};
use tracing::{debug, warn};

use crate::normalize::{char_len, normalize, strip_marks};
use crate::vocabulary::{LetterRecord, VocabularyTables, WordRecord};

/// A single trigger phrase and what it resolves to.
///
/// Invariant: `normalized_text` is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerEntry {
    pub trigger_text: String,
    pub normalized_text: String,
    /// Length of `normalized_text` in characters.
    pub length: usize,
    pub category: Category,
    pub payload: Payload,
}

impl TriggerEntry {
    /// Normalize and wrap a trigger. Returns `None` if nothing survives
    /// normalization.
    pub fn new(trigger_text: &str, payload: Payload) -> Option<Self> {
        let normalized_text = normalize(trigger_text);
        if normalized_text.is_empty() {
            return None;
        }
        Some(Self {
            trigger_text: trigger_text.to_string(),
            length: char_len(&normalized_text),
            normalized_text,
            category: payload.category(),
            payload,
        })
    }
}

/// Counters collected while building a registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Trigger entries in the registry.
    pub entries: usize,
    /// Vocabulary records dropped for lacking their primary field.
    pub dropped: usize,
    /// Raw triggers discarded because they normalized to nothing.
    pub empty_triggers: usize,
}

/// Immutable list of trigger entries across all categories.
#[derive(Debug, Clone, Default)]
pub struct TriggerRegistry {
    entries: Vec<TriggerEntry>,
    report: BuildReport,
}

impl TriggerRegistry {
    /// Build the registry from vocabulary tables.
    ///
    /// Entries are laid out commands, then letters (vowels before
    /// consonants), then words. Within a category, the first entry with a
    /// given normalized text wins at match time.
    pub fn build(tables: &VocabularyTables, config: &MatchingConfig) -> Self {
        let mut builder = Builder::default();

        for command in &tables.commands.commands {
            let key = command.key.trim();
            if key.is_empty() {
                warn!(triggers = ?command.triggers, "Dropping command without a key");
                builder.report.dropped += 1;
                continue;
            }
            let payload = Payload::Command {
                key: CommandKey::new(key),
            };
            for trigger in &command.triggers {
                builder.push(trigger, &payload);
            }
        }

        for record in &tables.letters.vowels {
            builder.push_letter(record, LetterKind::Vowel, &config.letter_name_suffix);
        }
        for record in &tables.letters.consonants {
            builder.push_letter(record, LetterKind::Consonant, &config.letter_name_suffix);
        }

        for (category, words) in &tables.words.categories {
            for record in words {
                builder.push_word(record, category);
            }
        }

        builder.report.entries = builder.entries.len();
        debug!(
            entries = builder.report.entries,
            dropped = builder.report.dropped,
            empty_triggers = builder.report.empty_triggers,
            "Trigger registry built"
        );

        Self {
            entries: builder.entries,
            report: builder.report,
        }
    }

    /// Wrap entries built elsewhere, discarding any with empty normalized text.
    pub fn from_entries(entries: Vec<TriggerEntry>) -> Self {
        let before = entries.len();
        let entries: Vec<TriggerEntry> = entries
            .into_iter()
            .filter(|e| !e.normalized_text.is_empty())
            .collect();
        let report = BuildReport {
            entries: entries.len(),
            dropped: 0,
            empty_triggers: before - entries.len(),
        };
        Self { entries, report }
    }

    pub fn entries(&self) -> &[TriggerEntry] {
        &self.entries
    }

    pub fn by_category(&self, category: Category) -> impl Iterator<Item = &TriggerEntry> + '_ {
        self.entries.iter().filter(move |e| e.category == category)
    }

    pub fn report(&self) -> BuildReport {
        self.report
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Default)]
struct Builder {
    entries: Vec<TriggerEntry>,
    report: BuildReport,
}

impl Builder {
    fn push(&mut self, trigger: &str, payload: &Payload) {
        match TriggerEntry::new(trigger, payload.clone()) {
            Some(entry) => self.entries.push(entry),
            None => {
                debug!(trigger, "Trigger normalizes to nothing, skipped");
                self.report.empty_triggers += 1;
            }
        }
    }

    fn push_letter(&mut self, record: &LetterRecord, kind: LetterKind, name_suffix: &str) {
        let Some(letter) = non_empty(&record.letter) else {
            warn!(name = ?record.name, "Dropping letter record without a glyph");
            self.report.dropped += 1;
            return;
        };
        let name = non_empty(&record.name).unwrap_or_default();

        let base = strip_marks(letter);
        let display_form = match kind {
            LetterKind::Consonant if !base.is_empty() => base.clone(),
            _ => letter.to_string(),
        };

        let payload = Payload::Letter(LetterInfo {
            display_form,
            name: name.to_string(),
            sound: non_empty(&record.sound).unwrap_or_default().to_string(),
            kind,
        });

        let mut triggers: Vec<&str> = vec![letter];
        if base != letter {
            triggers.push(&base);
        }
        triggers.push(name);
        if let Some(stem) = name.strip_suffix(name_suffix).filter(|_| !name_suffix.is_empty()) {
            triggers.push(stem);
        }

        let mut seen: Vec<&str> = Vec::with_capacity(triggers.len());
        for trigger in triggers {
            if seen.contains(&trigger) {
                continue;
            }
            seen.push(trigger);
            self.push(trigger, &payload);
        }
    }

    fn push_word(&mut self, record: &WordRecord, category: &str) {
        let Some(surface) = non_empty(&record.tamil) else {
            warn!(category, english = ?record.english, "Dropping word record without a native form");
            self.report.dropped += 1;
            return;
        };

        let payload = Payload::Word(WordInfo {
            surface_form: surface.to_string(),
            gloss_english: non_empty(&record.english).unwrap_or_default().to_string(),
            pronunciation: non_empty(&record.pronunciation)
                .unwrap_or_default()
                .to_string(),
            meaning: non_empty(&record.meaning).unwrap_or_default().to_string(),
            category: category.to_string(),
            illustration: non_empty(&record.image_url).map(str::to_string),
            icon: non_empty(&record.emoji).map(str::to_string),
        });

        self.push(surface, &payload);
        for trigger in [&record.english, &record.pronunciation] {
            if let Some(trigger) = non_empty(trigger) {
                self.push(trigger, &payload);
            }
        }
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
