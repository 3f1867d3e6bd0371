use crate::error::BoxDynError;

/// A resource that can be held by a [`Pool`][crate::pool::Pool].
///
/// The pool never inspects a connection; the only thing it can do with one is hand it out,
/// take it back, or close it when it has more idle connections than it is allowed to keep.
pub trait Connection: Send + 'static {
    /// Explicitly close this connection, releasing any underlying resources.
    ///
    /// Called by the pool when evicting an idle connection. The connection is gone from the pool
    /// whether or not this succeeds.
    fn close(self) -> Result<(), BoxDynError>;
}

/// Opens new connections on behalf of a [`Pool`][crate::pool::Pool].
///
/// The pool calls [`connect()`][Self::connect] lazily, only when it has no idle connection to
/// hand out and is below its configured maximum. A failed call is surfaced to the caller
/// that triggered it and is never retried.
///
/// Any `Fn() -> Result<C, E>` closure is a factory:
///
/// ```rust
/// # use connpool_core::{Connection, BoxDynError, Pool};
/// struct Socket;
///
/// impl Connection for Socket {
///     fn close(self) -> Result<(), BoxDynError> {
///         Ok(())
///     }
/// }
///
/// let pool = Pool::new(|| Ok::<_, std::io::Error>(Socket));
/// let conn = pool.reserve_if_available()?.expect("unbounded pool always has room");
/// pool.free(conn)?;
/// # Ok::<(), connpool_core::Error>(())
/// ```
pub trait ConnectionFactory: Send + Sync + 'static {
    /// The type of connection this factory opens.
    type Connection: Connection;

    /// Open a new connection.
    ///
    /// This must not be assumed idempotent; every call is expected to open a distinct resource.
    fn connect(&self) -> Result<Self::Connection, BoxDynError>;
}

impl<F, C, E> ConnectionFactory for F
where
    F: Fn() -> Result<C, E> + Send + Sync + 'static,
    C: Connection,
    E: Into<BoxDynError>,
{
    type Connection = C;

    #[inline]
    fn connect(&self) -> Result<C, BoxDynError> {
        self().map_err(Into::into)
    }
}
