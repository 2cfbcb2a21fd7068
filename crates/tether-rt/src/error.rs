// Errors surfaced by the message queue and dispatcher.

use thiserror::Error;

/// Error type a callback reports failure with.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// What every queued callback returns.
pub type CallbackResult = Result<(), BoxError>;

#[derive(Debug, Error)]
pub enum DispatchError {
    /// The queue was closed before the submission was attempted.
    #[error("message queue is closed to new operations")]
    Closed,

    #[error("send called from the message queue thread")]
    SendFromOwnerThread,

    #[error("message queue thread is trying to wait on an operation it is responsible for executing")]
    WaitOnOwnerThread,

    #[error("message loop must be entered from the thread that created the queue")]
    NotOwnerThread,

    /// `run_loop` was called from inside a callback it is currently running.
    #[error("message loop is already running")]
    LoopAlreadyRunning,

    /// The operation was dropped with its queue and will never run.
    #[error("operation was discarded before the message loop invoked it")]
    Abandoned,

    /// The error a callback returned, passed through untouched.
    #[error(transparent)]
    Callback(BoxError),
}

impl DispatchError {
    /// True for protocol misuse: the call was rejected up front and nothing
    /// was queued, waited on or run.
    pub fn is_invalid_operation(&self) -> bool {
        matches!(
            self,
            DispatchError::Closed
                | DispatchError::SendFromOwnerThread
                | DispatchError::WaitOnOwnerThread
                | DispatchError::NotOwnerThread
                | DispatchError::LoopAlreadyRunning
        )
    }

    /// The callback's own error, if this is a callback failure.
    pub fn callback_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            DispatchError::Callback(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}
