//! Error types for vocabulary loading.

use pommai_core::error::PommaiError;

/// Errors from reading vocabulary tables.
///
/// Malformed individual records are not errors: they are dropped with a
/// diagnostic while the registry is built.
#[derive(Debug, thiserror::Error)]
pub enum VocabularyError {
    #[error("Failed to read vocabulary file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed vocabulary file {path}: {reason}")]
    Malformed { path: String, reason: String },
    #[error("Core error: {0}")]
    Core(#[from] PommaiError),
}

impl From<VocabularyError> for PommaiError {
    fn from(err: VocabularyError) -> Self {
        match err {
            VocabularyError::Core(inner) => inner,
            other => PommaiError::Vocabulary(other.to_string()),
        }
    }
}
