//! Error taxonomy for a collection pass
//!
//! Pass-level errors abort `Bridge::collect`; item-level errors drop a single
//! item and the pass continues.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// Empty or unusable caller input
    #[error("invalid input: {0}")]
    Input(String),

    /// Document could not be retrieved
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// Document was retrieved but does not have the declared shape
    #[error("invalid document from {url}: {reason}")]
    InvalidDocument { url: String, reason: String },

    #[error("item is missing required field `{0}`")]
    MissingRequiredField(&'static str),

    #[error("no media stream candidates")]
    NoCandidates,

    #[error("incomplete source data: {0}")]
    IncompleteSourceData(String),

    /// Rule set could not be loaded or contains an invalid value
    #[error("invalid rule set: {0}")]
    Config(String),
}

impl BridgeError {
    pub fn fetch(url: &str, reason: impl ToString) -> Self {
        BridgeError::Fetch {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_document(url: &str, reason: impl ToString) -> Self {
        BridgeError::InvalidDocument {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error may be absorbed at the item boundary.
    ///
    /// Fetch failures count as item-level only when raised by a per-item
    /// fetch; the pipeline decides that by where the error occurs.
    pub fn is_item_level(&self) -> bool {
        matches!(
            self,
            BridgeError::MissingRequiredField(_)
                | BridgeError::NoCandidates
                | BridgeError::IncompleteSourceData(_)
                | BridgeError::Fetch { .. }
                | BridgeError::InvalidDocument { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
