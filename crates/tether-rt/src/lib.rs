//! tether-rt: a thread-affine message queue.
//!
//! A [`MessageQueue`] is bound to the thread that created it (the owner
//! thread). Any thread may append work; only the owner thread runs it, one
//! operation at a time, in the order the operations were appended.
//!
//! [`Dispatcher`] is the submission facade handed to code that needs to get
//! back onto the owner thread: `post` for fire-and-forget, `send` for a
//! blocking round trip that re-raises the callback's failure on the caller.
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::thread;
//!
//! use tether_rt::MessageQueue;
//!
//! let queue = Arc::new(MessageQueue::new());
//! let dispatcher = queue.dispatcher();
//!
//! let producer = thread::spawn(move || {
//!     dispatcher.post_fn(|| {
//!         println!("running on the owner thread");
//!         Ok(())
//!     })?;
//!     dispatcher.send_fn(|| Ok(()))?;
//!     dispatcher.queue().close();
//!     Ok::<_, tether_rt::DispatchError>(())
//! });
//!
//! queue.run_loop()?;
//! producer.join().unwrap()?;
//! # Ok::<_, tether_rt::DispatchError>(())
//! ```

mod dispatcher;
mod error;
mod operation;
mod queue;

pub use dispatcher::Dispatcher;
pub use error::{BoxError, CallbackResult, DispatchError};
pub use operation::Completion;
pub use queue::MessageQueue;
