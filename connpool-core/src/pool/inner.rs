use std::mem;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::metrics::PoolMetricsCollector;
use super::options::PoolOptions;
use super::wait_list::{WaitList, Waiter};
use crate::connection::{Connection, ConnectionFactory};
use crate::error::{Error, Result};

pub(crate) struct SharedPool<F: ConnectionFactory> {
    factory: F,
    state: Mutex<PoolState<F::Connection>>,
    pub(super) options: PoolOptions,
}

/// Everything here is guarded by the one pool lock; the cross-field capacity check
/// must see all of it at once.
struct PoolState<C> {
    /// Idle connections ready to be handed out; popped from the back.
    free: Vec<C>,
    /// Freed connections not yet merged into `free`, oldest first.
    pending: Vec<C>,
    /// Connections currently held by callers.
    reserved: usize,
    /// Slots claimed by callers currently inside the factory.
    connecting: usize,
    waiters: WaitList,
}

enum TryReserve<C> {
    Reserved(C),
    /// A slot was claimed; the caller must open a connection for it.
    Connect,
    Unavailable,
}

/// Holds a slot claimed for a new connection while the factory runs.
///
/// Releases the slot and wakes a waiter if dropped without being committed.
struct ConnectGuard<'a, F: ConnectionFactory> {
    pool: &'a SharedPool<F>,
}

impl<C> PoolState<C> {
    fn new() -> Self {
        PoolState {
            free: Vec::new(),
            pending: Vec::new(),
            reserved: 0,
            connecting: 0,
            waiters: WaitList::new(),
        }
    }

    fn total(&self) -> usize {
        self.reserved + self.connecting + self.free.len() + self.pending.len()
    }

    fn num_idle(&self) -> usize {
        self.free.len() + self.pending.len()
    }

    fn reserve_free(&mut self) -> Option<C> {
        let conn = self.free.pop()?;
        self.reserved += 1;
        Some(conn)
    }

    fn try_reserve(&mut self, max_connections: Option<usize>) -> TryReserve<C> {
        if let Some(conn) = self.reserve_free() {
            return TryReserve::Reserved(conn);
        }

        if !self.pending.is_empty() {
            let merged = self.pending.len();

            // reversed so the connection that has been idle longest is popped first
            self.free.extend(self.pending.drain(..).rev());

            tracing::debug!(
                target: "connpool::pool",
                merged,
                "merged freed connections into the idle list"
            );

            let Some(conn) = self.reserve_free() else {
                unreachable!("BUG: idle list empty after merging {merged} freed connections");
            };

            return TryReserve::Reserved(conn);
        }

        if max_connections.is_some_and(|max| self.total() >= max) {
            return TryReserve::Unavailable;
        }

        self.connecting += 1;
        TryReserve::Connect
    }

    fn release_reserved(&mut self) {
        assert!(
            self.reserved > 0,
            "BUG: released more connections than were reserved"
        );
        self.reserved -= 1;
    }
}

impl<F: ConnectionFactory> SharedPool<F> {
    pub(super) fn new_arc(options: PoolOptions, factory: F) -> Arc<Self> {
        Arc::new(Self {
            factory,
            state: Mutex::new(PoolState::new()),
            options,
        })
    }

    pub(super) fn size(&self) -> usize {
        self.state.lock().total()
    }

    pub(super) fn num_idle(&self) -> usize {
        self.state.lock().num_idle()
    }

    pub(super) fn num_reserved(&self) -> usize {
        self.state.lock().reserved
    }

    pub(super) fn num_waiting(&self) -> usize {
        self.state.lock().waiters.len()
    }

    /// Reserve a connection if one is idle or there is room to open one. Never blocks
    /// on other callers.
    pub(super) fn reserve_if_available(&self) -> Result<Option<F::Connection>> {
        let started = Instant::now();
        self.options.metrics.reserve_called();

        let attempt = self.state.lock().try_reserve(self.options.max_connections);

        let conn = match attempt {
            TryReserve::Reserved(conn) => conn,
            TryReserve::Connect => self.connect()?,
            TryReserve::Unavailable => return Ok(None),
        };

        self.options.metrics.connection_reserved(started.elapsed());
        Ok(Some(conn))
    }

    /// Reserve a connection, blocking until one is freed or `timeout` elapses.
    ///
    /// Being woken only means capacity *may* be available; the loop re-checks under the lock
    /// and may go back to waiting (at the tail of the list) if another caller got there first.
    pub(super) fn reserve_or_wait(
        &self,
        timeout: Option<Duration>,
    ) -> Result<Option<F::Connection>> {
        let started = Instant::now();
        // a deadline too far out to represent is no deadline at all
        let deadline = timeout.and_then(|timeout| started.checked_add(timeout));

        self.options.metrics.reserve_called();

        loop {
            let mut state = self.state.lock();

            let conn = match state.try_reserve(self.options.max_connections) {
                TryReserve::Reserved(conn) => {
                    drop(state);
                    conn
                }
                TryReserve::Connect => {
                    drop(state);
                    self.connect()?
                }
                TryReserve::Unavailable => {
                    let waiter = state.waiters.push();
                    drop(state);

                    tracing::trace!(target: "connpool::pool", "waiting for a connection");

                    if waiter.block_on(deadline) {
                        tracing::trace!(target: "connpool::pool", "woken by a freed connection");
                        continue;
                    }

                    self.abandon(&waiter);

                    tracing::trace!(
                        target: "connpool::pool",
                        waited_secs = started.elapsed().as_secs_f64(),
                        "timed out waiting for a connection"
                    );
                    self.options.metrics.reserve_timed_out();
                    return Ok(None);
                }
            };

            self.options.metrics.connection_reserved(started.elapsed());
            return Ok(Some(conn));
        }
    }

    /// Withdraw a waiter whose deadline elapsed.
    fn abandon(&self, waiter: &Arc<Waiter>) {
        let mut state = self.state.lock();

        if !state.waiters.remove(waiter) {
            // we were woken between the deadline elapsing and taking the lock;
            // hand the wakeup to the next waiter so it isn't lost
            state.waiters.wake_one();
        }
    }

    /// Open a connection for a slot claimed by `try_reserve()`.
    fn connect(&self) -> Result<F::Connection> {
        let guard = ConnectGuard { pool: self };

        match self.factory.connect() {
            Ok(conn) => {
                guard.commit();

                tracing::debug!(target: "connpool::pool", "opened new connection");
                self.options.metrics.connection_created();

                Ok(conn)
            }
            Err(error) => {
                drop(guard);

                tracing::warn!(target: "connpool::pool", %error, "failed to open new connection");
                self.options.metrics.connect_failed();

                Err(Error::connect(error))
            }
        }
    }

    /// Return a reserved connection to the pool, or close it if enough are already waiting
    /// to be reused.
    pub(super) fn free(&self, conn: F::Connection) -> Result<()> {
        let evicted = {
            let mut state = self.state.lock();

            if state.reserved == 0 {
                drop(state);

                // not ours to keep; still close it before reporting the misuse
                if let Err(error) = conn.close() {
                    tracing::warn!(target: "connpool::pool", %error, "error closing foreign connection");
                }

                panic!("BUG: freed a connection that was not reserved from this pool");
            }

            state.release_reserved();

            let evict = self
                .options
                .max_idle_connections
                .is_some_and(|max| state.pending.len() >= max);

            let evicted = if evict {
                Some(conn)
            } else {
                state.pending.push(conn);
                None
            };

            // either way one unit of capacity came back
            state.waiters.wake_one();

            evicted
        };

        if let Some(conn) = evicted {
            tracing::debug!(target: "connpool::pool", "idle limit reached; closing freed connection");
            self.options.metrics.connection_evicted();

            conn.close().map_err(Error::close)?;
        }

        Ok(())
    }

    /// Stop counting a reserved connection the caller is keeping for itself.
    pub(super) fn forget(&self) {
        let mut state = self.state.lock();
        state.release_reserved();
        state.waiters.wake_one();
    }

    /// Close every idle connection.
    pub(super) fn close_idle(&self) -> Result<()> {
        let idle = {
            let mut state = self.state.lock();

            let mut idle = mem::take(&mut state.free);
            idle.append(&mut state.pending);

            // the closed connections no longer count against `max_connections`
            for _ in 0..idle.len() {
                if !state.waiters.wake_one() {
                    break;
                }
            }

            idle
        };

        tracing::debug!(target: "connpool::pool", closing = idle.len(), "closing idle connections");

        close_all(idle)
    }
}

impl<F: ConnectionFactory> Drop for SharedPool<F> {
    fn drop(&mut self) {
        let state = self.state.get_mut();

        let idle: Vec<_> = state.free.drain(..).chain(state.pending.drain(..)).collect();

        // errors are logged by `close_all()`; there is no one left to return them to
        let _ = close_all(idle);
    }
}

impl<F: ConnectionFactory> ConnectGuard<'_, F> {
    fn commit(self) {
        {
            let mut state = self.pool.state.lock();
            state.connecting -= 1;
            state.reserved += 1;
        }

        mem::forget(self);
    }
}

impl<F: ConnectionFactory> Drop for ConnectGuard<'_, F> {
    fn drop(&mut self) {
        let mut state = self.pool.state.lock();
        state.connecting -= 1;
        // someone may have gone to sleep because our slot made the pool look full
        state.waiters.wake_one();
    }
}

/// Close each connection, returning the first error after trying all of them.
fn close_all<C: Connection>(conns: Vec<C>) -> Result<()> {
    let mut first_error = None;

    for conn in conns {
        if let Err(error) = conn.close() {
            tracing::warn!(target: "connpool::pool", %error, "error closing idle connection");
            first_error.get_or_insert(Error::close(error));
        }
    }

    first_error.map_or(Ok(()), Err)
}
