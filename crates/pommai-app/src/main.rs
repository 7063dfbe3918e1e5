//! Pommai application binary - composition root.
//!
//! 1. Load configuration from TOML, apply CLI overrides
//! 2. Load vocabulary tables and build the trigger registry
//! 3. Either write the default config (`--init-config`), resolve a single
//!    transcript (`--once`) or run a listening
//!    session on the console recognizer, printing every session event as a
//!    JSON line

mod cli;
mod console;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use pommai_core::config::PommaiConfig;
use pommai_core::events::SessionEvent;
use pommai_resolve::{normalize, Matcher, TriggerRegistry, VocabularyTables};
use pommai_session::{ResolutionPipeline, SessionController};
use tokio::sync::broadcast::error::RecvError;

use cli::CliArgs;
use console::ConsoleRecognizer;

/// Extra wait after input ends so the last transcript clears its debounce.
const DRAIN_GRACE: Duration = Duration::from_millis(200);

fn print_event(event: &SessionEvent) {
    match serde_json::to_string(event) {
        Ok(line) => println!("{}", line),
        Err(e) => tracing::warn!(error = %e, event = event.event_name(), "Failed to encode event"),
    }
}

/// Write the default configuration to `path`. An existing file is left alone.
fn init_config(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        return Err(format!("{} already exists", path.display()).into());
    }
    PommaiConfig::default().save(path)?;
    println!("{}", path.display());
    Ok(())
}

/// Resolve one transcript and print the outcome.
fn run_once(matcher: &Matcher, text: &str) -> Result<(), Box<dyn std::error::Error>> {
    let resolved = matcher.resolve_transcript(text);
    let output = serde_json::json!({
        "transcript": text,
        "normalized": normalize(text),
        "resolved": resolved,
    });
    println!("{}", serde_json::to_string(&output)?);
    Ok(())
}

/// Listen on the console until Ctrl-C or end of input.
async fn run_interactive(
    config: &PommaiConfig,
    matcher: Arc<Matcher>,
) -> Result<(), Box<dyn std::error::Error>> {
    let recognizer = Arc::new(ConsoleRecognizer::stdin(config.recognition.clone()));
    let controller = SessionController::new(Arc::clone(&recognizer), config.session.clone());
    let pipeline = ResolutionPipeline::new(controller, matcher, &config.session);
    let mut events = pipeline.subscribe();

    if let Err(e) = pipeline.init().await {
        tracing::error!(error = %e, "Speech recognition unavailable");
        return Err(e.into());
    }
    pipeline.start()?;

    let grace = config.session.result_debounce() + DRAIN_GRACE;
    let mut shutdown_at: Option<tokio::time::Instant> = None;

    loop {
        tokio::select! {
            received = events.recv() => match received {
                Ok(event) => print_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event printer fell behind");
                }
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
            _ = recognizer.wait_closed(), if shutdown_at.is_none() => {
                tracing::info!("Input closed");
                shutdown_at = Some(tokio::time::Instant::now() + grace);
            }
            _ = tokio::time::sleep_until(shutdown_at.unwrap_or_else(tokio::time::Instant::now)),
                if shutdown_at.is_some() => break,
        }
    }

    pipeline.stop();
    while let Ok(event) = events.try_recv() {
        print_event(&event);
    }

    let stats = pipeline.controller().stats();
    tracing::info!(
        restarts = stats.restart_attempts,
        errors = stats.errors_forwarded,
        results = stats.results_forwarded,
        "Session finished"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let (mut config, load_error) = match PommaiConfig::load(&config_file) {
        Ok(config) => (config, None),
        Err(e) => (PommaiConfig::default(), Some(e)),
    };
    if let Some(level) = args.resolve_log_level() {
        config.general.log_level = level;
    }

    // Tracing goes to stderr; stdout carries JSON output only.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .init();

    if args.init_config {
        return init_config(&config_file);
    }

    tracing::info!("Starting Pommai v{}", env!("CARGO_PKG_VERSION"));
    match load_error {
        None => tracing::info!(path = %config_file.display(), "Configuration loaded"),
        Some(e) => tracing::warn!(
            path = %config_file.display(),
            error = %e,
            "Failed to load config, using defaults"
        ),
    }

    // Vocabulary.
    let vocab_dir = args.resolve_vocab_dir(&config.general.vocabulary_dir);
    let tables = VocabularyTables::load_dir(&vocab_dir)?;
    let registry = TriggerRegistry::build(&tables, &config.matching);
    let report = registry.report();
    tracing::info!(
        entries = report.entries,
        dropped = report.dropped,
        empty_triggers = report.empty_triggers,
        "Trigger registry ready"
    );
    let matcher = Arc::new(Matcher::new(Arc::new(registry), &config.matching));

    match args.once.as_deref() {
        Some(text) => run_once(&matcher, text),
        None => run_interactive(&config, matcher).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_config_writes_defaults_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        init_config(&path).unwrap();
        let written = PommaiConfig::load(&path).unwrap();
        assert_eq!(written.general.log_level, "info");
        assert_eq!(written.matching.command_min_partial_len, 4);
        assert_eq!(written.session.error_restart_ms, 2000);

        assert!(init_config(&path).is_err());
    }
}
