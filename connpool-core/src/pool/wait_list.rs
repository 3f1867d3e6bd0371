use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, Thread};
use std::time::Instant;

/// A FIFO queue of threads waiting for capacity to be returned to the pool.
///
/// The list itself is not synchronized; it lives inside the pool state and is only touched
/// while the pool lock is held. Blocking on a [`Waiter`] happens *outside* that lock.
pub(super) struct WaitList {
    queue: VecDeque<Arc<Waiter>>,
}

/// A single-shot wakeup token for one blocked caller.
pub(super) struct Waiter {
    thread: Thread,
    woken: AtomicBool,
}

impl WaitList {
    pub fn new() -> Self {
        WaitList {
            queue: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Register the calling thread at the tail of the list.
    pub fn push(&mut self) -> Arc<Waiter> {
        let waiter = Arc::new(Waiter {
            thread: thread::current(),
            woken: AtomicBool::new(false),
        });

        self.queue.push_back(waiter.clone());
        waiter
    }

    /// Remove the longest-waiting token and wake it.
    ///
    /// Returns `false` if the list was empty.
    pub fn wake_one(&mut self) -> bool {
        match self.queue.pop_front() {
            Some(waiter) => {
                // every token in the list is still owned by a blocked caller;
                // timed-out callers remove themselves before giving up
                let woken = waiter.wake();
                debug_assert!(woken, "BUG: waiter was woken twice");
                true
            }
            None => false,
        }
    }

    /// Remove `waiter` from the list without waking it.
    ///
    /// Returns `false` if the token is no longer in the list, which means
    /// [`wake_one()`][Self::wake_one] already took it.
    pub fn remove(&mut self, waiter: &Arc<Waiter>) -> bool {
        let Some(pos) = self.queue.iter().position(|w| Arc::ptr_eq(w, waiter)) else {
            return false;
        };

        self.queue.remove(pos);
        true
    }
}

impl Waiter {
    /// Returns `true` if this token was woken by this call, `false` if it already was.
    fn wake(&self) -> bool {
        let do_wake = self
            .woken
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();

        if do_wake {
            self.thread.unpark();
        }

        do_wake
    }

    pub fn is_woken(&self) -> bool {
        self.woken.load(Ordering::Acquire)
    }

    /// Block until woken.
    ///
    /// Returns `true` if we were woken without the deadline elapsing, `false` if the deadline
    /// elapsed. If no deadline is set then this always returns `true` but *will block* until woken.
    ///
    /// Must not be called while holding the pool lock.
    pub fn block_on(&self, deadline: Option<Instant>) -> bool {
        debug_assert_eq!(
            self.thread.id(),
            thread::current().id(),
            "BUG: waiting on another thread's token"
        );

        while !self.is_woken() {
            if let Some(deadline) = deadline {
                let now = Instant::now();

                if deadline <= now {
                    return false;
                }

                // N.B. may wake spuriously
                thread::park_timeout(deadline - now);
            } else {
                // N.B. may return spuriously
                thread::park();
            }
        }

        true
    }
}
