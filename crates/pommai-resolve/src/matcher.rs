//! Tiered transcript matching.
//!
//! Tiers run in a fixed order and the first hit wins:
//!
//! 1. Exact: a token equals a trigger. Categories are checked Word, Letter,
//!    Command for each token, tokens in transcript order.
//! 2. Partial: a token contains a Letter or Command trigger. Triggers are
//!    tried longest first, each against every token, subject to a per-category
//!    minimum length. Words never match partially.
//! 3. Single character: when some token (or the whole transcript) is one
//!    character long, the first letter whose display form appears in the
//!    transcript wins.

use std::collections::HashMap;
use std::sync::Arc;

use pommai_core::config::MatchingConfig;
use pommai_core::types::{Category, MatchTier, Payload, ResolvedMatch};
use tracing::debug;

use crate::normalize::{char_len, normalize, tokenize};
use crate::registry::{TriggerEntry, TriggerRegistry};

const EXACT_PRIORITY: [Category; 3] = [Category::Word, Category::Letter, Category::Command];

/// Resolves normalized transcripts against an immutable registry.
///
/// Indices are built once in [`Matcher::new`]; `resolve` only reads them, so
/// one matcher can serve concurrent callers.
#[derive(Debug, Clone)]
pub struct Matcher {
    registry: Arc<TriggerRegistry>,
    /// First entry per (category, normalized text).
    exact: HashMap<(Category, String), usize>,
    /// Letter and Command entries above their floors, longest first.
    partial: Vec<usize>,
    /// Letter entries paired with their normalized display form, one per letter.
    letters: Vec<(usize, String)>,
}

impl Matcher {
    pub fn new(registry: Arc<TriggerRegistry>, config: &MatchingConfig) -> Self {
        let entries = registry.entries();

        let mut exact = HashMap::with_capacity(entries.len());
        for (idx, entry) in entries.iter().enumerate() {
            exact
                .entry((entry.category, entry.normalized_text.clone()))
                .or_insert(idx);
        }

        let mut partial: Vec<usize> = entries
            .iter()
            .enumerate()
            .filter(|(_, e)| match e.category {
                Category::Letter => e.length >= config.letter_min_partial_len,
                Category::Command => e.length >= config.command_min_partial_len,
                Category::Word => false,
            })
            .map(|(idx, _)| idx)
            .collect();
        // Stable: equal lengths keep registry order.
        partial.sort_by(|a, b| entries[*b].length.cmp(&entries[*a].length));

        let mut letters: Vec<(usize, String)> = Vec::new();
        let mut last_payload: Option<&Payload> = None;
        for (idx, entry) in entries.iter().enumerate() {
            let Payload::Letter(info) = &entry.payload else {
                continue;
            };
            if last_payload == Some(&entry.payload) {
                continue;
            }
            last_payload = Some(&entry.payload);
            let display = normalize(&info.display_form);
            if !display.is_empty() {
                letters.push((idx, display));
            }
        }

        debug!(
            triggers = entries.len(),
            partial_candidates = partial.len(),
            letters = letters.len(),
            "Matcher ready"
        );

        Self {
            registry,
            exact,
            partial,
            letters,
        }
    }

    pub fn registry(&self) -> &TriggerRegistry {
        &self.registry
    }

    /// Resolve already-normalized tokens. Returns `None` when no tier matches.
    pub fn resolve(&self, words: &[&str]) -> Option<ResolvedMatch> {
        let words: Vec<&str> = words.iter().copied().filter(|w| !w.is_empty()).collect();
        if words.is_empty() {
            return None;
        }

        let resolved = self
            .exact_match(&words)
            .or_else(|| self.partial_match(&words))
            .or_else(|| self.single_char_match(&words));

        match &resolved {
            Some(m) => debug!(
                tier = %m.tier,
                category = %m.category,
                trigger = %m.matched_trigger,
                "Transcript resolved"
            ),
            None => debug!(tokens = words.len(), "No match"),
        }
        resolved
    }

    /// Normalize, tokenize and resolve a raw transcript.
    pub fn resolve_transcript(&self, transcript: &str) -> Option<ResolvedMatch> {
        let normalized = normalize(transcript);
        self.resolve(&tokenize(&normalized))
    }

    fn exact_match(&self, words: &[&str]) -> Option<ResolvedMatch> {
        for word in words {
            for category in EXACT_PRIORITY {
                if let Some(&idx) = self.exact.get(&(category, (*word).to_string())) {
                    return Some(self.hit(idx, MatchTier::Exact));
                }
            }
        }
        None
    }

    fn partial_match(&self, words: &[&str]) -> Option<ResolvedMatch> {
        let entries = self.registry.entries();
        for &idx in &self.partial {
            let trigger = &entries[idx].normalized_text;
            if words.iter().any(|w| w.contains(trigger.as_str())) {
                return Some(self.hit(idx, MatchTier::Partial));
            }
        }
        None
    }

    fn single_char_match(&self, words: &[&str]) -> Option<ResolvedMatch> {
        let joined = words.join(" ");
        let clipped = char_len(&joined) == 1 || words.iter().any(|w| char_len(w) == 1);
        if !clipped {
            return None;
        }

        let (idx, display) = self
            .letters
            .iter()
            .find(|(_, display)| joined.contains(display.as_str()) || words.contains(&display.as_str()))?;

        let entry = &self.registry.entries()[*idx];
        Some(ResolvedMatch {
            category: entry.category,
            payload: entry.payload.clone(),
            matched_trigger: display.clone(),
            tier: MatchTier::SingleChar,
        })
    }

    fn hit(&self, idx: usize, tier: MatchTier) -> ResolvedMatch {
        let TriggerEntry {
            trigger_text,
            category,
            payload,
            ..
        } = &self.registry.entries()[idx];
        ResolvedMatch {
            category: *category,
            payload: payload.clone(),
            matched_trigger: trigger_text.clone(),
            tier,
        }
    }
}
