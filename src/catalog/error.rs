use thiserror::Error;

/// why a single listing item was left out of a page
///
/// never surfaced to callers, the extractor logs it and moves on
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("item has no title")]
    MissingTitle,

    #[error("item has no usable link")]
    MissingLink,

    #[error("title rejected: {0}")]
    InvalidTitle(String),

    #[error("link rejected: {0}")]
    InvalidLink(String),
}
