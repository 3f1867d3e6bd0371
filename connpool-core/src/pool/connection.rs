use std::fmt::{self, Debug, Formatter};
use std::ops::{Deref, DerefMut};

use crate::connection::ConnectionFactory;
use crate::error::Result;
use crate::pool::Pool;

/// A connection checked out from a [`Pool`].
///
/// Will be returned to the pool on-drop.
pub struct PoolConnection<F: ConnectionFactory> {
    live: Option<F::Connection>,
    pool: Pool<F>,
}

const DEREF_ERR: &str = "(bug) connection already released to pool";

impl<F: ConnectionFactory> PoolConnection<F> {
    pub(super) fn new(live: F::Connection, pool: Pool<F>) -> Self {
        Self {
            live: Some(live),
            pool,
        }
    }

    /// Return the connection to the pool now, surfacing the error if it had to be closed
    /// and closing failed.
    ///
    /// Dropping a `PoolConnection` does the same, but can only log that error.
    pub fn release(mut self) -> Result<()> {
        let live = self.live.take().expect("PoolConnection double-dropped");
        self.pool.free(live)
    }

    /// Take the connection out of the pool for good.
    ///
    /// The pool stops counting it against `max_connections` and will open a new connection
    /// in its place if needed. Closing the returned connection is up to the caller.
    pub fn detach(mut self) -> F::Connection {
        let live = self.live.take().expect("PoolConnection double-dropped");
        self.pool.0.forget();
        live
    }
}

impl<F: ConnectionFactory> Debug for PoolConnection<F> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolConnection")
            .field("connection", &std::any::type_name::<F::Connection>())
            .field("released", &self.live.is_none())
            .finish()
    }
}

impl<F: ConnectionFactory> Deref for PoolConnection<F> {
    type Target = F::Connection;

    fn deref(&self) -> &Self::Target {
        self.live.as_ref().expect(DEREF_ERR)
    }
}

impl<F: ConnectionFactory> DerefMut for PoolConnection<F> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.live.as_mut().expect(DEREF_ERR)
    }
}

/// Returns the connection to the [`Pool`] it was checked-out from.
impl<F: ConnectionFactory> Drop for PoolConnection<F> {
    fn drop(&mut self) {
        if let Some(live) = self.live.take() {
            if let Err(error) = self.pool.free(live) {
                tracing::warn!(
                    target: "connpool::pool",
                    %error,
                    "error occurred while returning connection to the pool"
                );
            }
        }
    }
}
