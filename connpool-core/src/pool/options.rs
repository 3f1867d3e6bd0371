use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;

use crate::connection::ConnectionFactory;
use crate::pool::inner::SharedPool;
use crate::pool::metrics::PoolMetricsCollector;
use crate::pool::Pool;

/// Configuration options/builder for constructing a [`Pool`].
///
/// See the source of [`Self::new()`] for the current defaults.
#[derive(Clone)]
pub struct PoolOptions {
    pub(crate) max_connections: Option<usize>,
    pub(crate) max_idle_connections: Option<usize>,
    pub(crate) acquire_timeout: Option<Duration>,
    pub(crate) metrics: Option<Arc<dyn PoolMetricsCollector>>,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl PoolOptions {
    /// Create a new `PoolOptions` with no limits.
    ///
    /// See the source of this method for the current values.
    pub fn new() -> Self {
        Self {
            // open as many connections as callers ask for
            max_connections: None,
            // keep every returned connection around
            max_idle_connections: None,
            // `Pool::acquire()` waits forever
            acquire_timeout: None,
            metrics: None,
        }
    }

    /// Set the maximum number of connections that may be open at the same time,
    /// counting both reserved and idle connections.
    ///
    /// Once reached, reservations wait for (or, with
    /// [`Pool::reserve_if_available()`], give up on) a connection being freed.
    ///
    /// A limit of `0` means the pool never opens a connection.
    pub fn max_connections(mut self, max: impl Into<Option<usize>>) -> Self {
        self.max_connections = max.into();
        self
    }

    /// Set how many freed connections may pile up waiting to be reused.
    ///
    /// A connection returned while that many are already waiting is closed instead.
    pub fn max_idle_connections(mut self, max: impl Into<Option<usize>>) -> Self {
        self.max_idle_connections = max.into();
        self
    }

    /// Set the amount of time [`Pool::acquire()`] waits for a connection.
    ///
    /// If set to `None`, [`Pool::acquire()`] will wait as long as it takes.
    /// Has no effect on [`Pool::reserve_or_wait()`], which takes its timeout as an argument.
    pub fn acquire_timeout(mut self, timeout: impl Into<Option<Duration>>) -> Self {
        self.acquire_timeout = timeout.into();
        self
    }

    /// Install a collector that is notified of pool events.
    ///
    /// See [`SimplePoolMetrics`][crate::pool::metrics::SimplePoolMetrics] for a ready-made one.
    pub fn metrics_collector(mut self, collector: Arc<dyn PoolMetricsCollector>) -> Self {
        self.metrics = Some(collector);
        self
    }

    pub fn get_max_connections(&self) -> Option<usize> {
        self.max_connections
    }

    pub fn get_max_idle_connections(&self) -> Option<usize> {
        self.max_idle_connections
    }

    pub fn get_acquire_timeout(&self) -> Option<Duration> {
        self.acquire_timeout
    }

    /// Creates a new pool from this configuration.
    ///
    /// This does not open any connections; the first one is opened by the first reservation.
    pub fn build<F: ConnectionFactory>(self, factory: F) -> Pool<F> {
        Pool(SharedPool::new_arc(self, factory))
    }
}

impl Debug for PoolOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolOptions")
            .field("max_connections", &self.max_connections)
            .field("max_idle_connections", &self.max_idle_connections)
            .field("acquire_timeout", &self.acquire_timeout)
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}
