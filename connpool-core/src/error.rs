use std::error::Error as StdError;
use std::result::Result as StdResult;

/// A specialized `Result` type for connpool.
pub type Result<T> = StdResult<T, Error>;

/// The error type collaborators return from [`Connection::close`] and
/// [`ConnectionFactory::connect`].
///
/// [`Connection::close`]: crate::Connection::close
/// [`ConnectionFactory::connect`]: crate::ConnectionFactory::connect
pub type BoxDynError = Box<dyn StdError + 'static + Send + Sync>;

/// Represents all the ways a method can fail within connpool.
///
/// Running out of capacity is *not* an error; [`Pool::reserve_or_wait`] and
/// [`Pool::reserve_if_available`] return `Ok(None)` for that.
///
/// [`Pool::reserve_or_wait`]: crate::pool::Pool::reserve_or_wait
/// [`Pool::reserve_if_available`]: crate::pool::Pool::reserve_if_available
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The connection factory failed to open a new connection.
    ///
    /// The failed attempt does not count against the pool's capacity.
    #[error("error occurred while opening a new connection: {0}")]
    Connect(#[source] BoxDynError),

    /// A connection failed to close while being evicted from the pool.
    ///
    /// The connection is considered gone from the pool regardless.
    #[error("error occurred while closing a connection: {0}")]
    Close(#[source] BoxDynError),

    /// A [`Pool::acquire`] timed out waiting for a connection to become available.
    ///
    /// [`Pool::acquire`]: crate::pool::Pool::acquire
    #[error("pool timed out while waiting for an open connection")]
    PoolTimedOut,
}

impl Error {
    #[inline]
    pub(crate) fn connect(err: impl Into<BoxDynError>) -> Self {
        Error::Connect(err.into())
    }

    #[inline]
    pub(crate) fn close(err: impl Into<BoxDynError>) -> Self {
        Error::Close(err.into())
    }
}
