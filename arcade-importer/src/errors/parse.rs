use arcade_shared::ValidationError;
use thiserror::Error;

/// A record, or a whole entry, that could not be decoded.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Malformed record: {0}")]
    Malformed(String),

    #[error("Checksum mismatch on line {line}: expected {expected}, computed {computed}")]
    Checksum {
        line: u8,
        expected: u32,
        computed: u32,
    },

    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Unreadable archive: {0}")]
    Archive(String),

    #[error("Text is not UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid value: {0}")]
    Validation(#[from] ValidationError),
}

impl ParseError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }
}
