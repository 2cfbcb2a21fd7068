// Queued units of work and the completion handle for synchronous round trips.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, ThreadId};

use futures::executor::block_on;
use tokio::sync::oneshot;

use crate::error::{CallbackResult, DispatchError};

/// Callback and state, bound together at submission time.
type Job = Box<dyn FnOnce() -> CallbackResult + Send + 'static>;

/// How a synchronous operation's callback finished.
enum Outcome {
    Completed,
    Failed(crate::error::BoxError),
    Panicked(Box<dyn Any + Send + 'static>),
}

/// One queued callback.
///
/// A synchronous operation carries the sending half of its completion
/// signal; a fire-and-forget one carries nothing. The signal is consumed by
/// `invoke`, so it is released exactly once.
pub(crate) struct Operation {
    job: Job,
    /// Thread that created the queue; the only one allowed to invoke.
    owner: ThreadId,
    completion: Option<oneshot::Sender<Outcome>>,
}

impl Operation {
    /// A fire-and-forget operation.
    pub(crate) fn new<S, F>(callback: F, state: S, owner: ThreadId) -> Self
    where
        F: FnOnce(S) -> CallbackResult + Send + 'static,
        S: Send + 'static,
    {
        Operation {
            job: Box::new(move || callback(state)),
            owner,
            completion: None,
        }
    }

    /// A synchronous operation plus the handle its submitter waits on.
    pub(crate) fn synchronous<S, F>(callback: F, state: S, owner: ThreadId) -> (Self, Completion)
    where
        F: FnOnce(S) -> CallbackResult + Send + 'static,
        S: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let operation = Operation {
            job: Box::new(move || callback(state)),
            owner,
            completion: Some(tx),
        };
        (operation, Completion { owner, signal: rx })
    }

    pub(crate) fn is_synchronous(&self) -> bool {
        self.completion.is_some()
    }

    /// Run the callback on the current (owner) thread.
    ///
    /// Synchronous operations never fail here: an error or panic is captured
    /// and handed to the waiter along with the completion signal.
    /// Fire-and-forget operations return the callback's error as-is and let
    /// a panic unwind through the caller.
    pub(crate) fn invoke(self) -> CallbackResult {
        let Operation {
            job,
            owner,
            completion,
        } = self;
        debug_assert_eq!(thread::current().id(), owner, "operation invoked off its owner thread");

        let Some(signal) = completion else {
            return job();
        };

        let outcome = match panic::catch_unwind(AssertUnwindSafe(job)) {
            Ok(Ok(())) => Outcome::Completed,
            Ok(Err(err)) => Outcome::Failed(err),
            Err(payload) => Outcome::Panicked(payload),
        };
        // The waiter may have dropped its handle; nobody left to tell.
        let _ = signal.send(outcome);
        Ok(())
    }
}

/// Handle to a synchronous operation, returned by
/// [`MessageQueue::enqueue_synchronous`](crate::MessageQueue::enqueue_synchronous).
///
/// Dropping it without waiting is allowed; the operation still runs.
#[must_use = "a completion does nothing unless waited on"]
pub struct Completion {
    owner: ThreadId,
    signal: oneshot::Receiver<Outcome>,
}

impl Completion {
    /// Block until the operation has run on the owner thread.
    ///
    /// Returns the callback's error as [`DispatchError::Callback`]. If the
    /// callback panicked, the panic resumes on this thread with its original
    /// payload.
    ///
    /// Fails immediately with [`DispatchError::WaitOnOwnerThread`] when
    /// called from the owner thread, which is the only thread that could
    /// ever release the wait. Returns [`DispatchError::Abandoned`] if the
    /// queue was dropped before the operation ran.
    ///
    /// Blocks the calling thread even when it is driving an async runtime.
    pub fn wait(self) -> Result<(), DispatchError> {
        if thread::current().id() == self.owner {
            return Err(DispatchError::WaitOnOwnerThread);
        }

        match block_on(self.signal) {
            Ok(Outcome::Completed) => Ok(()),
            Ok(Outcome::Failed(err)) => Err(DispatchError::Callback(err)),
            Ok(Outcome::Panicked(payload)) => panic::resume_unwind(payload),
            Err(_) => Err(DispatchError::Abandoned),
        }
    }
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}
