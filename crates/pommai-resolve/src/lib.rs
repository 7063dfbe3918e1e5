//! Command resolution for Pommai.
//!
//! Turns free-form transcripts into commands, letters, or vocabulary words:
//! text is normalized, vocabulary tables are flattened into a registry of
//! pre-normalized triggers, and the matcher applies its tiers (exact, longest
//! partial, single character) in a fixed order.

pub mod error;
pub mod matcher;
pub mod normalize;
pub mod registry;
pub mod vocabulary;

pub use error::VocabularyError;
pub use matcher::Matcher;
pub use normalize::{normalize, tokenize};
pub use registry::{BuildReport, TriggerEntry, TriggerRegistry};
pub use vocabulary::{
    CommandRecord, CommandTable, LetterRecord, LetterTable, VocabularyTables, WordRecord,
    WordTable,
};
