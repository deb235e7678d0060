//! Errors surfaced by the interaction handlers.

use thiserror::Error;

/// Failure while handling a single inbound event.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The handler does not know how to process this event kind.
    #[error("unsupported event type: {0}")]
    UnsupportedEventType(String),
    /// Posting the reply failed.
    #[error(transparent)]
    Send(#[from] anyhow::Error),
}

impl HandlerError {
    /// Whether redelivering the same event could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            HandlerError::UnsupportedEventType(_) => false,
            HandlerError::Send(_) => true,
        }
    }
}
