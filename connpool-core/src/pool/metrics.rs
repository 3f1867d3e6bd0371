//! Metrics collection utilities for [`Pool`][crate::pool::Pool].

use std::fmt::{self, Debug, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Describes a type that can collect metrics from a [`Pool`][crate::pool::Pool].
///
/// Set the collector for a pool with
/// [`PoolOptions::metrics_collector`][crate::pool::PoolOptions::metrics_collector].
///
/// All methods on this trait have provided impls so you can override just the ones you care about.
/// They are called outside the pool lock, but on the thread doing the work, so keep them cheap.
pub trait PoolMetricsCollector: Send + Sync + 'static {
    /// Record when a reservation (blocking or not) is started.
    fn reserve_called(&self) {}

    /// Record when a reservation hands out a connection, with the time it took.
    fn connection_reserved(&self, total_wait: Duration) {
        drop(total_wait);
    }

    /// Record when a blocking reservation gives up because its deadline elapsed.
    fn reserve_timed_out(&self) {}

    /// Record when the factory opens a new connection.
    fn connection_created(&self) {}

    /// Record when the factory fails to open a new connection.
    fn connect_failed(&self) {}

    /// Record when a freed connection is closed because the idle limit was reached.
    fn connection_evicted(&self) {}
}

macro_rules! opt_delegate {
    ($receiver:ident.$method:ident $( ( $($arg:expr),*) )?) => {
        if let Some(this) = $receiver {
            this.$method($( $($arg),* )?);
        }
    }
}

#[doc(hidden)]
impl PoolMetricsCollector for Option<Arc<dyn PoolMetricsCollector>> {
    fn reserve_called(&self) {
        opt_delegate!(self.reserve_called());
    }

    fn connection_reserved(&self, total_wait: Duration) {
        opt_delegate!(self.connection_reserved(total_wait));
    }

    fn reserve_timed_out(&self) {
        opt_delegate!(self.reserve_timed_out());
    }

    fn connection_created(&self) {
        opt_delegate!(self.connection_created());
    }

    fn connect_failed(&self) {
        opt_delegate!(self.connect_failed());
    }

    fn connection_evicted(&self) {
        opt_delegate!(self.connection_evicted());
    }
}

/// A simple counting metrics collector.
///
/// ```rust
/// # use connpool_core::{BoxDynError, Connection, PoolOptions};
/// # use connpool_core::pool::metrics::SimplePoolMetrics;
/// # struct Socket;
/// # impl Connection for Socket {
/// #     fn close(self) -> Result<(), BoxDynError> { Ok(()) }
/// # }
/// let metrics = SimplePoolMetrics::new();
///
/// let pool = PoolOptions::new()
///     .metrics_collector(metrics.collector())
///     .build(|| Ok::<_, BoxDynError>(Socket));
///
/// let _conn = pool.reserve_if_available()?;
/// assert_eq!(metrics.snapshot().connections_created, 1);
/// # Ok::<(), connpool_core::Error>(())
/// ```
#[derive(Clone, Default)]
pub struct SimplePoolMetrics {
    inner: Arc<SimpleMetricsInner>,
}

/// A snapshot of metrics returned by [`SimplePoolMetrics::snapshot()`].
///
/// If the `json` feature is enabled, this type implements `serde::Serialize`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
#[non_exhaustive]
pub struct SimplePoolMetricsSnapshot {
    /// Total number of reservations started.
    pub reserve_calls: u64,

    /// Total number of reservations that handed out a connection.
    pub reservations: u64,

    /// Total time spent by successful reservations, in nanoseconds.
    pub total_reserve_nanos: u64,

    /// Total number of blocking reservations that timed out.
    pub reserve_timeouts: u64,

    /// Total number of connections opened by the factory.
    pub connections_created: u64,

    /// Total number of failed factory calls.
    pub connect_failures: u64,

    /// Total number of connections closed because the idle limit was reached.
    pub connections_evicted: u64,
}

#[derive(Default)]
struct SimpleMetricsInner {
    reserve_calls: AtomicU64,
    reservations: AtomicU64,
    total_reserve_nanos: AtomicU64,
    reserve_timeouts: AtomicU64,
    connections_created: AtomicU64,
    connect_failures: AtomicU64,
    connections_evicted: AtomicU64,
}

impl SimplePoolMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the collector handle to pass to
    /// [`PoolOptions::metrics_collector`][crate::pool::PoolOptions::metrics_collector].
    pub fn collector(&self) -> Arc<dyn PoolMetricsCollector> {
        self.inner.clone()
    }

    pub fn snapshot(&self) -> SimplePoolMetricsSnapshot {
        let inner = &self.inner;

        SimplePoolMetricsSnapshot {
            reserve_calls: inner.reserve_calls.load(Ordering::Relaxed),
            reservations: inner.reservations.load(Ordering::Relaxed),
            total_reserve_nanos: inner.total_reserve_nanos.load(Ordering::Relaxed),
            reserve_timeouts: inner.reserve_timeouts.load(Ordering::Relaxed),
            connections_created: inner.connections_created.load(Ordering::Relaxed),
            connect_failures: inner.connect_failures.load(Ordering::Relaxed),
            connections_evicted: inner.connections_evicted.load(Ordering::Relaxed),
        }
    }
}

impl Debug for SimplePoolMetrics {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SimplePoolMetrics")
            .field(&self.snapshot())
            .finish()
    }
}

impl PoolMetricsCollector for SimpleMetricsInner {
    fn reserve_called(&self) {
        self.reserve_calls.fetch_add(1, Ordering::Relaxed);
    }

    fn connection_reserved(&self, total_wait: Duration) {
        self.reservations.fetch_add(1, Ordering::Relaxed);
        // saturate rather than wrap
        let nanos = u64::try_from(total_wait.as_nanos()).unwrap_or(u64::MAX);
        self.total_reserve_nanos.fetch_add(nanos, Ordering::Relaxed);
    }

    fn reserve_timed_out(&self) {
        self.reserve_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    fn connection_created(&self) {
        self.connections_created.fetch_add(1, Ordering::Relaxed);
    }

    fn connect_failed(&self) {
        self.connect_failures.fetch_add(1, Ordering::Relaxed);
    }

    fn connection_evicted(&self) {
        self.connections_evicted.fetch_add(1, Ordering::Relaxed);
    }
}
