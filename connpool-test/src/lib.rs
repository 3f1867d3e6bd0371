use connpool::{BoxDynError, Connection, ConnectionFactory, Pool, PoolOptions};
use parking_lot::Mutex;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

pub fn setup_if_needed() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Poll `cond` until it returns `true`, giving up after `timeout`.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;

    while !cond() {
        if Instant::now() >= deadline {
            return false;
        }

        thread::sleep(Duration::from_millis(1));
    }

    true
}

/// A connection that records whether it was closed.
#[derive(Debug)]
pub struct MockConnection {
    pub id: usize,
    closed: Arc<AtomicBool>,
    fail_close: bool,
}

impl MockConnection {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Connection for MockConnection {
    fn close(self) -> Result<(), BoxDynError> {
        self.closed.store(true, Ordering::SeqCst);

        if self.fail_close {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock close failed").into());
        }

        Ok(())
    }
}

/// A factory that hands out numbered [`MockConnection`]s and remembers every one of them.
#[derive(Clone, Default)]
pub struct MockFactory {
    shared: Arc<Shared>,
}

#[derive(Default)]
struct Shared {
    calls: AtomicUsize,
    fail_connect: AtomicBool,
    fail_close: AtomicBool,
    // `closed` flag of every opened connection, indexed by id
    opened: Mutex<Vec<Arc<AtomicBool>>>,
}

impl MockFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a pool over a handle to this factory.
    pub fn pool(&self, options: PoolOptions) -> Pool<MockFactory> {
        setup_if_needed();
        options.build(self.clone())
    }

    /// Make subsequent `connect()` calls fail, or succeed again.
    pub fn fail_connect(&self, fail: bool) {
        self.shared.fail_connect.store(fail, Ordering::SeqCst);
    }

    /// Make connections opened from now on fail to close.
    pub fn fail_close(&self, fail: bool) {
        self.shared.fail_close.store(fail, Ordering::SeqCst);
    }

    /// Number of times the pool called `connect()`, successful or not.
    pub fn calls(&self) -> usize {
        self.shared.calls.load(Ordering::SeqCst)
    }

    /// Number of connections successfully opened.
    pub fn opened(&self) -> usize {
        self.shared.opened.lock().len()
    }

    /// Number of opened connections that have since been closed.
    pub fn closed(&self) -> usize {
        self.shared
            .opened
            .lock()
            .iter()
            .filter(|closed| closed.load(Ordering::SeqCst))
            .count()
    }

    /// Whether the connection with the given id has been closed.
    pub fn is_closed(&self, id: usize) -> bool {
        self.shared.opened.lock()[id].load(Ordering::SeqCst)
    }
}

impl ConnectionFactory for MockFactory {
    type Connection = MockConnection;

    fn connect(&self) -> Result<MockConnection, BoxDynError> {
        self.shared.calls.fetch_add(1, Ordering::SeqCst);

        if self.shared.fail_connect.load(Ordering::SeqCst) {
            return Err(
                io::Error::new(io::ErrorKind::ConnectionRefused, "mock connect failed").into(),
            );
        }

        let closed = Arc::new(AtomicBool::new(false));

        let id = {
            let mut opened = self.shared.opened.lock();
            opened.push(closed.clone());
            opened.len() - 1
        };

        Ok(MockConnection {
            id,
            closed,
            fail_close: self.shared.fail_close.load(Ordering::SeqCst),
        })
    }
}
