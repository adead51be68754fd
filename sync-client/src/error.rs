//! Client errors.

use thiserror::Error;

use crate::remote::RemoteError;
use crate::store::StoreError;

/// Errors surfaced by the offline engine.
///
/// Most engine operations recover on their own (a failed fetch is skipped,
/// a failed submission stays queued). Only failures the caller must know
/// about, such as an answer that could not be recorded, come back as errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Persisting state failed.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Talking to the remote work source failed.
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    /// `start()` was called on an engine that is already running.
    #[error("engine already started")]
    AlreadyStarted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ClientError::from(RemoteError::Timeout);
        assert_eq!(err.to_string(), "remote error: request timed out");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ClientError>();
    }
}
