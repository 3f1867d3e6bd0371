//! Provides the connection pool for reusing connections across threads.
//!
//! Opening a connection is often expensive: a TCP handshake, TLS, authentication.
//! A [`Pool`] keeps connections around after use so the next caller can skip that work.
//!
//! The pool opens connections lazily through its [`ConnectionFactory`], up to
//! [`max_connections`][PoolOptions::max_connections]. When none are idle and no more may be
//! opened, [`Pool::reserve_or_wait`] blocks the calling thread until another thread
//! [`free`][Pool::free]s one. Waiting callers are woken one at a time in the order they started
//! waiting, but a woken caller still has to win the race for the freed connection; a caller
//! using [`Pool::reserve_if_available`] at the same moment may take it first.
//!
//! Freed connections are reused oldest-first. Once
//! [`max_idle_connections`][PoolOptions::max_idle_connections] freed connections are waiting to
//! be reused, further freed connections are closed instead.
//!
//! [`Pool`] is `Send`, `Sync` and `Clone`; clones share the same connections.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::connection::ConnectionFactory;
use crate::error::{Error, Result};

use self::inner::SharedPool;

pub use self::connection::PoolConnection;
pub use self::options::PoolOptions;

mod connection;
mod inner;
pub mod metrics;
mod options;
mod wait_list;

/// A bounded pool of connections opened by `F`.
pub struct Pool<F: ConnectionFactory>(pub(crate) Arc<SharedPool<F>>);

impl<F: ConnectionFactory> Pool<F> {
    /// Create a pool with no limits.
    ///
    /// See [`PoolOptions`] to configure one.
    pub fn new(factory: F) -> Self {
        Self::builder().build(factory)
    }

    /// A helpful alias for [`PoolOptions::new()`].
    ///
    /// The factory type has to be named here, e.g. `Pool::<MyFactory>::builder()`; for closures
    /// start from [`PoolOptions::new()`] instead.
    pub fn builder() -> PoolOptions {
        PoolOptions::new()
    }

    /// Reserve a connection, blocking the calling thread until one is available.
    ///
    /// An idle connection is reused if there is one, otherwise a new one is opened if the pool is
    /// below `max_connections`. Failing both, the thread waits until another thread
    /// [`free`][Self::free]s a connection, or until `timeout` elapses, in which case `Ok(None)` is
    /// returned. A `timeout` of `None` waits indefinitely.
    ///
    /// Returns [`Error::Connect`] if opening a new connection fails; this is not retried.
    pub fn reserve_or_wait(&self, timeout: Option<Duration>) -> Result<Option<F::Connection>> {
        self.0.reserve_or_wait(timeout)
    }

    /// Reserve a connection if one is idle or can be opened without exceeding
    /// `max_connections`.
    ///
    /// Returns `Ok(None)` immediately otherwise; never waits for another thread.
    ///
    /// Returns [`Error::Connect`] if opening a new connection fails.
    pub fn reserve_if_available(&self) -> Result<Option<F::Connection>> {
        self.0.reserve_if_available()
    }

    /// Return a reserved connection to the pool and wake one waiting caller.
    ///
    /// If `max_idle_connections` freed connections are already waiting to be reused, `conn` is
    /// closed instead. [`Error::Close`] is returned if that fails; the connection is gone from
    /// the pool either way.
    ///
    /// `conn` must have been reserved from this pool.
    ///
    /// # Panics
    /// If this pool has no reserved connections outstanding. `conn` is closed before panicking.
    pub fn free(&self, conn: F::Connection) -> Result<()> {
        self.0.free(conn)
    }

    /// Acquire a connection wrapped in a guard that frees it on drop.
    ///
    /// Waits at most the configured [`acquire_timeout`][PoolOptions::acquire_timeout] before
    /// returning [`Error::PoolTimedOut`], or forever if none is configured.
    pub fn acquire(&self) -> Result<PoolConnection<F>> {
        self.acquire_inner(self.0.options.acquire_timeout)
    }

    /// Acquire a connection wrapped in a guard, waiting at most the given duration.
    ///
    /// If the given duration elapses, this will return [`Error::PoolTimedOut`].
    pub fn acquire_timeout(&self, timeout: Duration) -> Result<PoolConnection<F>> {
        self.acquire_inner(Some(timeout))
    }

    fn acquire_inner(&self, timeout: Option<Duration>) -> Result<PoolConnection<F>> {
        self.0
            .reserve_or_wait(timeout)?
            .map(|live| PoolConnection::new(live, self.clone()))
            .ok_or(Error::PoolTimedOut)
    }

    /// Attempts to acquire a guarded connection without waiting.
    ///
    /// Returns `Ok(None)` when [`reserve_if_available()`][Self::reserve_if_available] would.
    pub fn try_acquire(&self) -> Result<Option<PoolConnection<F>>> {
        Ok(self
            .0
            .reserve_if_available()?
            .map(|live| PoolConnection::new(live, self.clone())))
    }

    /// Close all idle connections.
    ///
    /// Reserved connections are unaffected. Every idle connection is closed even if some fail;
    /// the first failure is returned.
    pub fn close_idle(&self) -> Result<()> {
        self.0.close_idle()
    }

    /// Returns the number of connections counted against `max_connections`: reserved, idle,
    /// and currently being opened.
    pub fn size(&self) -> usize {
        self.0.size()
    }

    /// Returns the number of idle connections.
    pub fn num_idle(&self) -> usize {
        self.0.num_idle()
    }

    /// Returns the number of connections currently reserved by callers.
    pub fn num_reserved(&self) -> usize {
        self.0.num_reserved()
    }

    /// Returns the number of callers blocked in [`reserve_or_wait()`][Self::reserve_or_wait].
    pub fn num_waiting(&self) -> usize {
        self.0.num_waiting()
    }

    /// Get the options for this pool.
    pub fn options(&self) -> &PoolOptions {
        &self.0.options
    }
}

/// Returns a new [Pool] tied to the same shared connection pool.
impl<F: ConnectionFactory> Clone for Pool<F> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<F: ConnectionFactory> fmt::Debug for Pool<F> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("Pool")
            .field("size", &self.0.size())
            .field("num_idle", &self.0.num_idle())
            .field("num_waiting", &self.0.num_waiting())
            .field("options", &self.0.options)
            .finish()
    }
}
