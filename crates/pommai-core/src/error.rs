use thiserror::Error;

/// Top-level error type for the Pommai system.
///
/// Subsystem crates define their own error types and wrap `PommaiError`
/// through `#[from]` so that the `?` operator works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PommaiError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Vocabulary error: {0}")]
    Vocabulary(String),

    #[error("Recognizer initialization failed: {0}")]
    Initialization(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for PommaiError {
    fn from(err: toml::de::Error) -> Self {
        PommaiError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for PommaiError {
    fn from(err: toml::ser::Error) -> Self {
        PommaiError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for PommaiError {
    fn from(err: serde_json::Error) -> Self {
        PommaiError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Pommai operations.
pub type Result<T> = std::result::Result<T, PommaiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_all_variants() {
        let cases: Vec<(PommaiError, &str)> = vec![
            (
                PommaiError::Config("bad key".to_string()),
                "Configuration error: bad key",
            ),
            (
                PommaiError::Vocabulary("no letters".to_string()),
                "Vocabulary error: no letters",
            ),
            (
                PommaiError::Initialization("permission denied".to_string()),
                "Recognizer initialization failed: permission denied",
            ),
            (
                PommaiError::Session("not initialized".to_string()),
                "Session error: not initialized",
            ),
            (
                PommaiError::Serialization("invalid json".to_string()),
                "Serialization error: invalid json",
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PommaiError = io_err.into();
        match &err {
            PommaiError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            _ => panic!("Expected Io variant"),
        }
        assert!(err.to_string().starts_with("I/O error:"));
    }

    #[test]
    fn test_error_from_toml_de() {
        let err: std::result::Result<toml::Value, _> = toml::from_str("invalid = [[[");
        let err: PommaiError = err.unwrap_err().into();
        assert!(matches!(err, PommaiError::Config(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let err: std::result::Result<serde_json::Value, _> = serde_json::from_str("{ nope }");
        let err: PommaiError = err.unwrap_err().into();
        assert!(matches!(err, PommaiError::Serialization(_)));
    }

    #[test]
    fn test_result_type_with_question_mark() {
        fn inner() -> Result<String> {
            let io_result: std::result::Result<i32, std::io::Error> = Ok(42);
            let value = io_result?;
            Ok(value.to_string())
        }

        assert_eq!(inner().unwrap(), "42");
    }
}
