//! A recognizer that reads utterances from the terminal.
//!
//! Each input line is one utterance and behaves like a single-shot speech
//! run: the line is delivered only while the recognizer is started, and the
//! run ends right after it. Lines starting with `!` simulate recognizer
//! errors by code:
//!
//! - `!no-speech`: nothing was heard
//! - `!aborted`: the run was interrupted
//! - `!<code>` or `!error <code>`: any other fault

use std::sync::{Arc, Mutex};

use pommai_core::config::RecognitionConfig;
use pommai_core::types::RecognitionErrorKind;
use pommai_session::{EventSink, Recognizer, RecognizerError};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::{watch, Notify};
use tracing::{debug, info, warn};

type Input = Box<dyn AsyncRead + Send + Unpin>;

/// What one line of input stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Utterance {
    Speech(String),
    Fault(RecognitionErrorKind),
}

/// Parse one input line. Blank lines are ignored.
pub fn parse_utterance(line: &str) -> Option<Utterance> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let Some(directive) = line.strip_prefix('!') else {
        return Some(Utterance::Speech(line.to_string()));
    };
    let (name, rest) = match directive.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (directive, ""),
    };
    let code = match name {
        "" => "unknown",
        "error" if rest.is_empty() => "unknown",
        "error" => rest,
        code => code,
    };
    Some(Utterance::Fault(RecognitionErrorKind::from_code(code)))
}

/// Word-by-word partial transcripts leading up to the full text.
fn interim_prefixes(text: &str) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    (1..words.len()).map(|n| words[..n].join(" ")).collect()
}

pub struct ConsoleRecognizer {
    options: RecognitionConfig,
    input: Mutex<Option<Input>>,
    running: Arc<watch::Sender<bool>>,
    closed: Arc<Notify>,
}

impl ConsoleRecognizer {
    /// Read utterances from standard input.
    pub fn stdin(options: RecognitionConfig) -> Self {
        Self::with_input(options, tokio::io::stdin())
    }

    pub fn with_input(options: RecognitionConfig, input: impl AsyncRead + Send + Unpin + 'static) -> Self {
        let (running, _) = watch::channel(false);
        Self {
            options,
            input: Mutex::new(Some(Box::new(input))),
            running: Arc::new(running),
            closed: Arc::new(Notify::new()),
        }
    }

    pub fn is_running(&self) -> bool {
        *self.running.borrow()
    }

    /// Resolves once the input is exhausted and every line was delivered.
    pub async fn wait_closed(&self) {
        self.closed.notified().await;
    }
}

impl Recognizer for ConsoleRecognizer {
    async fn init(&self, sink: EventSink) -> Result<(), RecognizerError> {
        let input = self
            .input
            .lock()
            .expect("console input mutex poisoned")
            .take()
            .ok_or_else(|| RecognizerError::Unavailable("console input already in use".into()))?;

        info!(
            language = %self.options.language,
            interim_results = self.options.interim_results,
            "Console recognizer ready, one utterance per line"
        );

        tokio::spawn(read_utterances(
            input,
            sink,
            Arc::clone(&self.running),
            self.options.interim_results,
            Arc::clone(&self.closed),
        ));
        Ok(())
    }

    fn start(&self) -> Result<(), RecognizerError> {
        let mut already_running = false;
        self.running.send_if_modified(|running| {
            if *running {
                already_running = true;
                false
            } else {
                *running = true;
                true
            }
        });

        if already_running {
            Err(RecognizerError::AlreadyRunning)
        } else {
            Ok(())
        }
    }

    fn stop(&self) -> Result<(), RecognizerError> {
        self.running.send_replace(false);
        Ok(())
    }
}

async fn read_utterances(
    input: Input,
    sink: EventSink,
    running: Arc<watch::Sender<bool>>,
    interim_results: bool,
    closed: Arc<Notify>,
) {
    let mut lines = BufReader::new(input).lines();
    let mut started = running.subscribe();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Console input failed");
                break;
            }
        };
        let Some(utterance) = parse_utterance(&line) else {
            continue;
        };

        if started.wait_for(|running| *running).await.is_err() {
            break;
        }
        // The run is over as soon as its single utterance is out.
        running.send_replace(false);

        let delivered = match utterance {
            Utterance::Speech(text) => {
                debug!(text = %text, "Console utterance");
                let partials = if interim_results {
                    interim_prefixes(&text)
                } else {
                    Vec::new()
                };
                partials.into_iter().all(|p| sink.result(p, false)) && sink.result(text, true) && sink.end()
            }
            Utterance::Fault(kind) => sink.error(kind),
        };
        if !delivered {
            debug!("Session gone, console reader exiting");
            break;
        }
    }

    closed.notify_one();
}
