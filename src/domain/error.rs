//! Domain error types.

/// Top-level error type for kimchigold.
#[derive(Debug, thiserror::Error)]
pub enum KimchiError {
    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("storage error: {reason}")]
    Storage { reason: String },

    #[error("current quote unavailable: {reason}")]
    QuoteUnavailable { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl KimchiError {
    pub fn data(reason: impl Into<String>) -> Self {
        KimchiError::Data {
            reason: reason.into(),
        }
    }

    pub fn configuration(reason: impl Into<String>) -> Self {
        KimchiError::Configuration {
            reason: reason.into(),
        }
    }

    pub fn storage(reason: impl Into<String>) -> Self {
        KimchiError::Storage {
            reason: reason.into(),
        }
    }
}

impl From<&KimchiError> for std::process::ExitCode {
    fn from(err: &KimchiError) -> Self {
        let code: u8 = match err {
            KimchiError::Io(_) => 1,
            KimchiError::ConfigParse { .. } | KimchiError::ConfigInvalid { .. } => 2,
            KimchiError::Storage { .. } => 3,
            KimchiError::Configuration { .. } => 4,
            KimchiError::Data { .. } => 5,
            KimchiError::QuoteUnavailable { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
