// Post/send facade over a message queue.

use std::sync::Arc;

use crate::error::{CallbackResult, DispatchError};
use crate::queue::MessageQueue;

/// Submits work to a [`MessageQueue`]'s owner thread.
///
/// This is the handle to pass to code that needs to resume on the owner
/// thread. It holds nothing but the queue, so cloning it yields an
/// equivalent dispatcher addressing the same queue.
#[derive(Clone, Debug)]
pub struct Dispatcher {
    queue: Arc<MessageQueue>,
}

impl Dispatcher {
    pub fn new(queue: Arc<MessageQueue>) -> Self {
        Dispatcher { queue }
    }

    /// The queue this dispatcher submits to.
    pub fn queue(&self) -> &Arc<MessageQueue> {
        &self.queue
    }

    pub fn is_owner_thread(&self) -> bool {
        self.queue.is_owner_thread()
    }

    /// Schedule `callback(state)` on the owner thread and return at once,
    /// whichever thread this is called from.
    pub fn post<S, F>(&self, callback: F, state: S) -> Result<(), DispatchError>
    where
        F: FnOnce(S) -> CallbackResult + Send + 'static,
        S: Send + 'static,
    {
        self.queue.enqueue(callback, state)
    }

    pub fn post_fn<F>(&self, f: F) -> Result<(), DispatchError>
    where
        F: FnOnce() -> CallbackResult + Send + 'static,
    {
        self.queue.enqueue_fn(f)
    }

    /// Run `callback(state)` on the owner thread and block until it is done.
    ///
    /// The callback's error comes back unchanged inside
    /// [`DispatchError::Callback`]; a panic in the callback resumes here.
    /// Called from the owner thread this fails with
    /// [`DispatchError::SendFromOwnerThread`] before anything is queued.
    pub fn send<S, F>(&self, callback: F, state: S) -> Result<(), DispatchError>
    where
        F: FnOnce(S) -> CallbackResult + Send + 'static,
        S: Send + 'static,
    {
        // Waiting here would deadlock: nobody else can run the loop.
        if self.queue.is_owner_thread() {
            return Err(DispatchError::SendFromOwnerThread);
        }

        self.queue.enqueue_synchronous(callback, state)?.wait()
    }

    pub fn send_fn<F>(&self, f: F) -> Result<(), DispatchError>
    where
        F: FnOnce() -> CallbackResult + Send + 'static,
    {
        self.send(|()| f(), ())
    }
}
