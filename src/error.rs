// Error type shared by every scraping call.
//
// All variants are fatal for the operation that raised them. A wrong
// password is not an error: the sign-in loop simply asks again.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum KosError {
    #[error("Request to the portal failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("User not signed in")]
    NotSignedIn,

    #[error("Page code not found")]
    PageCodeNotFound,

    #[error("Expected {what} not found on page")]
    MissingElement { what: String },

    #[error("Could not read {what} from '{text}'")]
    PatternMismatch { what: String, text: String },

    #[error("Invalid portal address: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Terminal I/O failed: {0}")]
    Terminal(#[from] std::io::Error),

    #[error("Could not serialise output: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl KosError {
    pub(crate) fn missing(what: impl Into<String>) -> Self {
        KosError::MissingElement { what: what.into() }
    }

    pub(crate) fn mismatch(what: impl Into<String>, text: impl Into<String>) -> Self {
        KosError::PatternMismatch {
            what: what.into(),
            text: text.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, KosError>;
