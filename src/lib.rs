//! connpool is a bounded connection pool for blocking code.
//!
//! A [`Pool`] hands out connections opened by a [`ConnectionFactory`], reuses the ones that are
//! given back, and makes callers wait, in turn, when the configured maximum is reached.
//!
//! ```rust
//! use connpool::{BoxDynError, Connection, PoolOptions};
//! use std::time::Duration;
//!
//! struct Socket(u32);
//!
//! impl Connection for Socket {
//!     fn close(self) -> Result<(), BoxDynError> {
//!         Ok(())
//!     }
//! }
//!
//! let pool = PoolOptions::new()
//!     .max_connections(1)
//!     .max_idle_connections(1)
//!     .build(|| Ok::<_, BoxDynError>(Socket(7)));
//!
//! let conn = pool.reserve_or_wait(None)?.expect("no timeout was given");
//! assert!(pool.reserve_if_available()?.is_none());
//!
//! pool.free(conn)?;
//!
//! let again = pool.reserve_or_wait(Some(Duration::from_secs(1)))?;
//! assert_eq!(again.map(|Socket(id)| id), Some(7));
//! # Ok::<(), connpool::Error>(())
//! ```
//!
//! For RAII-style use, [`Pool::acquire()`] returns a [`PoolConnection`] that frees the
//! connection when dropped.
#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(future_incompatible)]

pub use connpool_core::{
    BoxDynError, Connection, ConnectionFactory, Error, Pool, PoolConnection, PoolOptions, Result,
};

/// Types for collecting metrics from a [`Pool`].
pub mod metrics {
    pub use connpool_core::pool::metrics::{
        PoolMetricsCollector, SimplePoolMetrics, SimplePoolMetricsSnapshot,
    };
}
