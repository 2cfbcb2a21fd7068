// Cross-thread scenarios: many producers, one owner thread running the loop.

use std::cell::Cell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;

use tether_rt::{DispatchError, MessageQueue};

const PRODUCERS: usize = 10;
const PER_PRODUCER: usize = 100;

thread_local! {
    /// Only ever touched on the owner thread.
    static OWNER_COUNTER: Cell<usize> = const { Cell::new(0) };
}

#[derive(Debug)]
struct Rejected {
    code: u16,
}

impl fmt::Display for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rejected with code {}", self.code)
    }
}

impl std::error::Error for Rejected {}

#[test]
fn ten_producers_increment_a_counter_serially() {
    let queue = Arc::new(MessageQueue::new());
    let start = Arc::new(Barrier::new(PRODUCERS));

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|_| {
            let dispatcher = queue.dispatcher();
            let start = start.clone();
            thread::spawn(move || {
                start.wait();
                for _ in 0..PER_PRODUCER {
                    dispatcher
                        .post_fn(|| {
                            // A non-atomic read-modify-write: only safe because
                            // every callback runs on the same thread.
                            OWNER_COUNTER.with(|c| c.set(c.get() + 1));
                            Ok(())
                        })
                        .unwrap();
                }
            })
        })
        .collect();

    let closer_queue = queue.clone();
    let closer = thread::spawn(move || {
        for producer in producers {
            producer.join().unwrap();
        }
        closer_queue.close();
    });

    queue.run_loop().unwrap();
    closer.join().unwrap();

    assert_eq!(OWNER_COUNTER.with(Cell::get), PRODUCERS * PER_PRODUCER);
}

#[test]
fn invocation_order_respects_each_producers_append_order() {
    let queue = Arc::new(MessageQueue::new());
    let seen: Arc<Mutex<Vec<(usize, usize)>>> = Arc::new(Mutex::new(Vec::new()));

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let dispatcher = queue.dispatcher();
            let seen = seen.clone();
            thread::spawn(move || {
                for seq in 0..PER_PRODUCER {
                    dispatcher
                        .post(
                            |(seen, producer, seq): (Arc<Mutex<Vec<(usize, usize)>>>, usize, usize)| {
                                seen.lock().unwrap().push((producer, seq));
                                Ok(())
                            },
                            (seen.clone(), producer, seq),
                        )
                        .unwrap();
                }
            })
        })
        .collect();

    let closer_queue = queue.clone();
    let closer = thread::spawn(move || {
        for producer in producers {
            producer.join().unwrap();
        }
        closer_queue.close();
    });

    queue.run_loop().unwrap();
    closer.join().unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), PRODUCERS * PER_PRODUCER);

    // Appends from one thread are totally ordered, so each producer's
    // sequence numbers must come out strictly increasing.
    let mut next = vec![0usize; PRODUCERS];
    for &(producer, seq) in seen.iter() {
        assert_eq!(seq, next[producer], "producer {producer} ran out of order");
        next[producer] += 1;
    }
}

#[test]
fn operations_queued_across_threads_run_in_append_order() {
    let queue = Arc::new(MessageQueue::new());
    let log = Arc::new(Mutex::new(Vec::new()));

    // Hand the append position from one thread to the next so the total
    // append order is known up front.
    let mut previous: Option<thread::JoinHandle<()>> = None;
    for i in 0..8u32 {
        let dispatcher = queue.dispatcher();
        let log = log.clone();
        let before = previous.take();
        previous = Some(thread::spawn(move || {
            if let Some(before) = before {
                before.join().unwrap();
            }
            dispatcher
                .post_fn(move || {
                    log.lock().unwrap().push(i);
                    Ok(())
                })
                .unwrap();
        }));
    }
    if let Some(last) = previous {
        last.join().unwrap();
    }
    queue.close();

    queue.run_loop().unwrap();
    assert_eq!(*log.lock().unwrap(), (0..8).collect::<Vec<_>>());
}

#[test]
fn failing_send_is_reraised_and_later_posts_still_run() {
    let queue = Arc::new(MessageQueue::new());
    let later_ran = Arc::new(AtomicBool::new(false));

    let failing = {
        let dispatcher = queue.dispatcher();
        let follow_up_dispatcher = queue.dispatcher();
        let flag = later_ran.clone();
        thread::spawn(move || {
            let result = dispatcher.send(|code: u16| Err(Rejected { code }.into()), 418);

            // Another thread keeps using the queue after the failure.
            thread::spawn(move || {
                follow_up_dispatcher
                    .post_fn(move || {
                        flag.store(true, Ordering::SeqCst);
                        Ok(())
                    })
                    .unwrap();
                follow_up_dispatcher.queue().close();
            })
            .join()
            .unwrap();

            result
        })
    };

    queue.run_loop().unwrap();
    let err = failing.join().unwrap().unwrap_err();

    let rejected = err
        .callback_error()
        .and_then(|e| e.downcast_ref::<Rejected>())
        .expect("same error type comes back");
    assert_eq!(rejected.code, 418);
    assert_eq!(err.to_string(), "rejected with code 418");
    assert!(later_ran.load(Ordering::SeqCst));
}

#[test]
fn panicking_send_resumes_on_the_producer() {
    let queue = Arc::new(MessageQueue::new());
    let dispatcher = queue.dispatcher();

    let producer = thread::spawn(move || {
        let caught = panic::catch_unwind(AssertUnwindSafe(|| {
            dispatcher.send_fn(|| panic!("callback gave up"))
        }));
        dispatcher.queue().close();
        caught
    });

    queue.run_loop().unwrap();
    let payload = producer.join().unwrap().expect_err("send should panic");
    assert_eq!(payload.downcast_ref::<&str>(), Some(&"callback gave up"));
}

#[test]
fn wait_returns_only_after_the_callback_finished() {
    let queue = Arc::new(MessageQueue::new());
    let steps = Arc::new(AtomicUsize::new(0));

    let producer = {
        let queue = queue.clone();
        let steps = steps.clone();
        thread::spawn(move || {
            let completion = queue
                .enqueue_synchronous(
                    |steps: Arc<AtomicUsize>| {
                        for _ in 0..1000 {
                            steps.fetch_add(1, Ordering::SeqCst);
                        }
                        Ok(())
                    },
                    steps.clone(),
                )
                .unwrap();
            completion.wait().unwrap();
            let observed = steps.load(Ordering::SeqCst);
            queue.close();
            observed
        })
    };

    queue.run_loop().unwrap();
    assert_eq!(producer.join().unwrap(), 1000);
}

#[test]
fn close_drains_everything_queued_before_it() {
    let queue = Arc::new(MessageQueue::new());
    let ran = Arc::new(AtomicUsize::new(0));
    let queued = Arc::new(AtomicUsize::new(0));

    let producers: Vec<_> = (0..4)
        .map(|_| {
            let dispatcher = queue.dispatcher();
            let ran = ran.clone();
            let queued = queued.clone();
            thread::spawn(move || loop {
                let ran = ran.clone();
                match dispatcher.post_fn(move || {
                    ran.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }) {
                    Ok(()) => {
                        queued.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(err) => {
                        assert!(matches!(err, DispatchError::Closed));
                        break;
                    }
                }
            })
        })
        .collect();

    // Let the producers race the close.
    let closer_queue = queue.clone();
    let closer_queued = queued.clone();
    let closer = thread::spawn(move || {
        while closer_queued.load(Ordering::SeqCst) < 2000 {
            thread::yield_now();
        }
        closer_queue.close();
    });

    queue.run_loop().unwrap();
    closer.join().unwrap();
    for producer in producers {
        producer.join().unwrap();
    }

    assert!(queue.is_closed());
    assert!(queue.is_empty());
    assert_eq!(ran.load(Ordering::SeqCst), queued.load(Ordering::SeqCst));
}

#[test]
fn send_and_wait_on_the_owner_thread_never_block() {
    let queue = Arc::new(MessageQueue::new());
    let dispatcher = queue.dispatcher();

    let err = dispatcher.send_fn(|| Ok(())).unwrap_err();
    assert!(matches!(err, DispatchError::SendFromOwnerThread));

    let completion = queue.enqueue_synchronous_fn(|| Ok(())).unwrap();
    let err = completion.wait().unwrap_err();
    assert!(matches!(err, DispatchError::WaitOnOwnerThread));

    // The synchronous operation is still queued and runs normally.
    assert_eq!(queue.len(), 1);
    queue.close();
    queue.run_loop().unwrap();
}

#[test]
fn send_from_inside_an_async_runtime_blocks_until_done() {
    let queue = Arc::new(MessageQueue::new());
    let ran = Arc::new(AtomicBool::new(false));

    let producer = {
        let dispatcher = queue.dispatcher();
        let ran = ran.clone();
        thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let result = rt.block_on(async {
                dispatcher.send(
                    |ran: Arc<AtomicBool>| {
                        ran.store(true, Ordering::SeqCst);
                        Ok(())
                    },
                    ran,
                )
            });
            dispatcher.queue().close();
            result
        })
    };

    queue.run_loop().unwrap();
    producer.join().unwrap().unwrap();
    assert!(ran.load(Ordering::SeqCst));
}
