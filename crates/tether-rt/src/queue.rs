// Thread-affine message queue and its run loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, Thread};

use concurrent_queue::{ConcurrentQueue, PopError, PushError};

use crate::dispatcher::Dispatcher;
use crate::error::{CallbackResult, DispatchError};
use crate::operation::{Completion, Operation};

/// A multi-producer, single-consumer queue of callbacks bound to the thread
/// that created it.
///
/// Any thread may append; only the owner thread runs [`run_loop`], which
/// invokes operations one at a time in append order. Share it between
/// threads as `Arc<MessageQueue>`, or hand out [`Dispatcher`]s.
///
/// [`run_loop`]: MessageQueue::run_loop
pub struct MessageQueue {
    /// Creating thread. Its id answers "am I the owner?", its handle is what
    /// producers unpark after an append.
    owner: Thread,
    /// Pending operations, FIFO. Closing it is the one-way shutdown flag.
    pending: ConcurrentQueue<Operation>,
    /// Set while `run_loop` is on the stack, to reject re-entry.
    running: AtomicBool,
}

impl MessageQueue {
    /// Create a queue owned by the calling thread.
    pub fn new() -> Self {
        MessageQueue {
            owner: thread::current(),
            pending: ConcurrentQueue::unbounded(),
            running: AtomicBool::new(false),
        }
    }

    /// The queue's default dispatcher.
    pub fn dispatcher(self: &Arc<Self>) -> Dispatcher {
        Dispatcher::new(Arc::clone(self))
    }

    /// Whether the calling thread is the owner thread.
    pub fn is_owner_thread(&self) -> bool {
        thread::current().id() == self.owner.id()
    }

    /// Append a fire-and-forget operation. Never blocks.
    ///
    /// Callable from any thread, the owner included. An error returned by
    /// `callback` is not reported back here: it comes out of [`run_loop`]
    /// on the owner thread.
    ///
    /// [`run_loop`]: MessageQueue::run_loop
    pub fn enqueue<S, F>(&self, callback: F, state: S) -> Result<(), DispatchError>
    where
        F: FnOnce(S) -> CallbackResult + Send + 'static,
        S: Send + 'static,
    {
        self.push(Operation::new(callback, state, self.owner.id()))
    }

    /// [`enqueue`](MessageQueue::enqueue) for a closure that carries its own state.
    pub fn enqueue_fn<F>(&self, f: F) -> Result<(), DispatchError>
    where
        F: FnOnce() -> CallbackResult + Send + 'static,
    {
        self.enqueue(|()| f(), ())
    }

    /// Append a synchronous operation and return the handle to wait on.
    /// Never blocks; the blocking happens in [`Completion::wait`].
    pub fn enqueue_synchronous<S, F>(&self, callback: F, state: S) -> Result<Completion, DispatchError>
    where
        F: FnOnce(S) -> CallbackResult + Send + 'static,
        S: Send + 'static,
    {
        let (operation, completion) = Operation::synchronous(callback, state, self.owner.id());
        self.push(operation)?;
        Ok(completion)
    }

    /// [`enqueue_synchronous`](MessageQueue::enqueue_synchronous) for a
    /// closure that carries its own state.
    pub fn enqueue_synchronous_fn<F>(&self, f: F) -> Result<Completion, DispatchError>
    where
        F: FnOnce() -> CallbackResult + Send + 'static,
    {
        self.enqueue_synchronous(|()| f(), ())
    }

    fn push(&self, operation: Operation) -> Result<(), DispatchError> {
        match self.pending.push(operation) {
            Ok(()) => {
                self.owner.unpark();
                Ok(())
            }
            // Dropping the rejected operation abandons its completion, but
            // the caller never got that handle.
            Err(PushError::Closed(_)) => Err(DispatchError::Closed),
            Err(PushError::Full(_)) => unreachable!("unbounded queue is never full"),
        }
    }

    /// Run queued operations on the owner thread until the queue is closed
    /// and drained.
    ///
    /// Blocks while the queue is empty and open. Operations run strictly in
    /// append order. A synchronous operation's failure goes to its waiter and
    /// the loop carries on; a fire-and-forget operation's error ends the loop
    /// with [`DispatchError::Callback`], and its panic unwinds out of here.
    /// Operations still queued at that point stay queued, so the host may
    /// call `run_loop` again to keep draining.
    ///
    /// Returns [`DispatchError::NotOwnerThread`] off the owner thread and
    /// [`DispatchError::LoopAlreadyRunning`] when re-entered from a callback.
    pub fn run_loop(&self) -> Result<(), DispatchError> {
        if !self.is_owner_thread() {
            return Err(DispatchError::NotOwnerThread);
        }
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(DispatchError::LoopAlreadyRunning);
        }
        let _running = RunningGuard(&self.running);

        tracing::debug!(pending = self.pending.len(), "entering message loop");
        let mut invoked: u64 = 0;

        loop {
            match self.pending.pop() {
                Ok(operation) => {
                    tracing::trace!(synchronous = operation.is_synchronous(), "invoking operation");
                    invoked += 1;
                    operation.invoke().map_err(DispatchError::Callback)?;
                }
                // Producers unpark us after every push and on close. An
                // unpark that lands before we park makes `park` return at once.
                Err(PopError::Empty) => thread::park(),
                Err(PopError::Closed) => break,
            }
        }

        tracing::debug!(invoked, "message loop drained");
        Ok(())
    }

    /// Stop accepting new operations. Already-queued operations still run
    /// before [`run_loop`](MessageQueue::run_loop) returns.
    ///
    /// Idempotent and callable from any thread.
    pub fn close(&self) {
        if self.pending.close() {
            tracing::debug!(pending = self.pending.len(), "message queue closed");
        }
        self.owner.unpark();
    }

    pub fn is_closed(&self) -> bool {
        self.pending.is_closed()
    }

    /// Number of operations waiting to run.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl Default for MessageQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MessageQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageQueue")
            .field("owner", &self.owner.id())
            .field("pending", &self.pending.len())
            .field("closed", &self.pending.is_closed())
            .finish()
    }
}

/// Clears the running flag when `run_loop` exits, unwinding included.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
