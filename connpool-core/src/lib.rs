//! Core of connpool, the blocking connection pool.
//!
//! Not intended to be used directly; use the `connpool` crate instead.
#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(future_incompatible)]
#![warn(clippy::needless_borrow)]
#![warn(clippy::redundant_pub_crate)]
#![warn(clippy::use_self)]

pub mod connection;
pub mod error;
pub mod pool;

pub use connection::{Connection, ConnectionFactory};
pub use error::{BoxDynError, Error, Result};
pub use pool::metrics::{PoolMetricsCollector, SimplePoolMetrics, SimplePoolMetricsSnapshot};
pub use pool::{Pool, PoolConnection, PoolOptions};
