//! Benchmarks for transcript resolution.
//!
//! Resolution runs once per final transcript on the event path, so it must
//! stay well under a millisecond even with a full alphabet and a few hundred
//! vocabulary words loaded.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};
use pommai_core::config::MatchingConfig;
use pommai_resolve::{
    normalize, CommandTable, LetterRecord, LetterTable, Matcher, TriggerRegistry,
    VocabularyTables, WordRecord, WordTable,
};

const VOWELS: &[&str] = &["அ", "ஆ", "இ", "ஈ", "உ", "ஊ", "எ", "ஏ", "ஐ", "ஒ", "ஓ", "ஔ"];
const CONSONANTS: &[&str] = &[
    "க்", "ங்", "ச்", "ஞ்", "ட்", "ண்", "த்", "ந்", "ப்", "ம்", "ய்", "ர்", "ல்", "வ்", "ழ்",
    "ள்", "ற்", "ன்",
];

/// Build a vocabulary with the full alphabet and `per_category` synthetic
/// words in each of five categories.
fn vocabulary(per_category: usize) -> VocabularyTables {
    let letter = |glyph: &str| LetterRecord::new(glyph, &format!("{}கரம்", glyph), glyph);

    let mut categories = BTreeMap::new();
    for category in ["animals", "fruits", "family", "nature", "body"] {
        let words = (0..per_category)
            .map(|i| WordRecord {
                tamil: Some(format!("சொல்{}{}", category.len(), i)),
                english: Some(format!("{}{}", category, i)),
                pronunciation: Some(format!("sol-{}-{}", category, i)),
                meaning: Some(format!("{} word {}", category, i)),
                ..Default::default()
            })
            .collect();
        categories.insert(category.to_string(), words);
    }

    VocabularyTables {
        commands: CommandTable::builtin(),
        letters: LetterTable {
            vowels: VOWELS.iter().map(|&g| letter(g)).collect(),
            consonants: CONSONANTS.iter().map(|&g| letter(g)).collect(),
        },
        words: WordTable { categories },
    }
}

fn matcher(per_category: usize) -> Matcher {
    let config = MatchingConfig::default();
    let registry = TriggerRegistry::build(&vocabulary(per_category), &config);
    Matcher::new(Arc::new(registry), &config)
}

/// Transcripts that land in each tier, plus one that misses everything.
fn transcripts() -> Vec<(&'static str, &'static str)> {
    vec![
        ("exact_command", "உட்கார்"),
        ("exact_word", "animals42"),
        ("partial_command", "நான் இப்போது உட்கார்ந்து இருக்கிறேன்"),
        ("single_char", "x"),
        ("no_match", "hello there general kenobi"),
    ]
}

fn bench_resolve(c: &mut Criterion) {
    let matcher = matcher(60);

    let mut group = c.benchmark_group("resolve");
    group.sample_size(200);
    group.measurement_time(Duration::from_secs(5));

    for (name, transcript) in transcripts() {
        group.bench_function(name, |b| b.iter(|| matcher.resolve_transcript(transcript)));
    }

    group.finish();
}

fn bench_normalize(c: &mut Criterion) {
    let inputs: Vec<String> = (0..100)
        .map(|i| format!("  உட்கார்!!  நட,  ஓடு... turn {} «now»  ", i))
        .collect();

    c.bench_function("normalize_noisy_transcript", |b| {
        let mut idx = 0usize;
        b.iter(|| {
            let out = normalize(&inputs[idx % inputs.len()]);
            idx += 1;
            out
        });
    });
}

fn bench_registry_build(c: &mut Criterion) {
    let tables = vocabulary(60);
    let config = MatchingConfig::default();

    c.bench_function("registry_build_and_index", |b| {
        b.iter(|| {
            let registry = TriggerRegistry::build(&tables, &config);
            Matcher::new(Arc::new(registry), &config)
        });
    });
}

/// p95 latency check across a mixed batch of transcripts.
fn bench_resolve_latency_assertion(c: &mut Criterion) {
    let matcher = matcher(200);
    let batch: Vec<&str> = transcripts()
        .into_iter()
        .map(|(_, t)| t)
        .cycle()
        .take(1000)
        .collect();

    let target = Duration::from_micros(500);

    c.bench_function("resolve_mixed_large_vocabulary", |b| {
        let mut idx = 0usize;
        b.iter(|| {
            let m = matcher.resolve_transcript(batch[idx % batch.len()]);
            idx += 1;
            m
        });
    });

    let mut times = Vec::with_capacity(batch.len());
    for transcript in &batch {
        let start = std::time::Instant::now();
        let _resolved = matcher.resolve_transcript(transcript);
        times.push(start.elapsed());
    }

    times.sort();
    let p95 = times[949];
    let median = times[499];

    eprintln!("\n=== Resolve latency (1000 mixed transcripts) ===");
    eprintln!("Median:  {:?}", median);
    eprintln!("p95:     {:?} (target: {:?})", p95, target);

    assert!(
        p95 < target,
        "resolve p95 {:?} exceeds target {:?}",
        p95,
        target
    );
}

criterion_group!(
    benches,
    bench_resolve,
    bench_normalize,
    bench_registry_build,
    bench_resolve_latency_assertion
);
criterion_main!(benches);
