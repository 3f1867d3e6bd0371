use connpool::{Error, PoolOptions};
use connpool_test::{wait_until, MockFactory};
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::Duration;

#[test]
fn free_beyond_idle_limit_closes_connection() -> anyhow::Result<()> {
    let factory = MockFactory::new();
    let pool = factory.pool(PoolOptions::new().max_idle_connections(2));

    let c0 = pool.reserve_if_available()?.expect("unbounded");
    let c1 = pool.reserve_if_available()?.expect("unbounded");
    let c2 = pool.reserve_if_available()?.expect("unbounded");

    pool.free(c0)?;
    pool.free(c1)?;
    assert_eq!(pool.num_idle(), 2);

    pool.free(c2)?;
    assert!(factory.is_closed(2));
    assert_eq!(pool.num_idle(), 2);
    assert_eq!(pool.size(), 2);

    let ids: Vec<usize> = (0..3)
        .map(|_| pool.reserve_if_available().map(|conn| conn.expect("unbounded").id))
        .collect::<Result<_, _>>()?;

    // two reused oldest-first, then a fresh one
    assert_eq!(ids, vec![0, 1, 3]);
    assert!(!factory.is_closed(0));
    assert!(!factory.is_closed(1));

    Ok(())
}

#[test]
fn evicted_connection_frees_its_slot() -> anyhow::Result<()> {
    let factory = MockFactory::new();
    let pool = factory.pool(
        PoolOptions::new()
            .max_connections(1)
            .max_idle_connections(0),
    );

    let conn = pool.reserve_if_available()?.expect("pool is empty");
    pool.free(conn)?;

    assert!(factory.is_closed(0));
    assert_eq!(pool.size(), 0);

    let conn = pool.reserve_if_available()?.expect("slot was released");
    assert_eq!(conn.id, 1);
    assert_eq!(factory.opened(), 2);

    Ok(())
}

#[test]
fn eviction_wakes_a_waiter() -> anyhow::Result<()> {
    let factory = MockFactory::new();
    let pool = factory.pool(
        PoolOptions::new()
            .max_connections(1)
            .max_idle_connections(0),
    );

    let held = pool.reserve_or_wait(None)?.expect("pool is empty");

    let waiter = thread::spawn({
        let pool = pool.clone();
        move || pool.reserve_or_wait(None)
    });

    assert!(wait_until(Duration::from_secs(5), || pool.num_waiting() == 1));

    pool.free(held)?;

    // the waiter could not reuse the closed connection, so it opened another
    let conn = waiter.join().expect("waiter panicked")?;
    assert_eq!(conn.map(|conn| conn.id), Some(1));
    assert!(factory.is_closed(0));

    Ok(())
}

#[test]
fn failed_close_on_free_is_reported() -> anyhow::Result<()> {
    let factory = MockFactory::new();
    let pool = factory.pool(PoolOptions::new().max_idle_connections(0));

    factory.fail_close(true);

    let conn = pool.reserve_if_available()?.expect("unbounded");
    let err = pool.free(conn).unwrap_err();

    assert!(matches!(err, Error::Close(_)), "unexpected error: {err:?}");
    assert_eq!(pool.size(), 0);
    assert_eq!(pool.num_reserved(), 0);

    Ok(())
}

#[test]
fn close_idle_leaves_reserved_connections() -> anyhow::Result<()> {
    let factory = MockFactory::new();
    let pool = factory.pool(PoolOptions::new().max_connections(3));

    let c0 = pool.reserve_if_available()?.expect("below max");
    let c1 = pool.reserve_if_available()?.expect("below max");
    let c2 = pool.reserve_if_available()?.expect("below max");

    pool.free(c0)?;
    pool.free(c1)?;

    // merge one of them into the idle list so both lists are non-empty
    let c0 = pool.reserve_if_available()?.expect("idle connection");
    pool.free(c0)?;

    pool.close_idle()?;

    assert_eq!(factory.closed(), 2);
    assert!(!c2.is_closed());
    assert_eq!(pool.num_idle(), 0);
    assert_eq!(pool.size(), 1);

    pool.free(c2)?;
    assert_eq!(pool.num_idle(), 1);

    Ok(())
}

#[test]
fn close_idle_reports_first_failure() -> anyhow::Result<()> {
    let factory = MockFactory::new();
    let pool = factory.pool(PoolOptions::new());

    factory.fail_close(true);
    let c0 = pool.reserve_if_available()?.expect("unbounded");
    factory.fail_close(false);
    let c1 = pool.reserve_if_available()?.expect("unbounded");

    pool.free(c0)?;
    pool.free(c1)?;

    let err = pool.close_idle().unwrap_err();
    assert!(matches!(err, Error::Close(_)), "unexpected error: {err:?}");

    // the failure did not stop the other one from being closed
    assert_eq!(factory.closed(), 2);
    assert_eq!(pool.size(), 0);

    Ok(())
}

#[test]
fn dropping_pool_closes_idle_connections() -> anyhow::Result<()> {
    let factory = MockFactory::new();
    let pool = factory.pool(PoolOptions::new());

    let c0 = pool.reserve_if_available()?.expect("unbounded");
    let c1 = pool.reserve_if_available()?.expect("unbounded");

    pool.free(c0)?;
    drop(pool);

    assert!(factory.is_closed(0));
    assert!(!c1.is_closed());

    Ok(())
}

#[test]
fn freeing_foreign_connection_closes_it_and_panics() -> anyhow::Result<()> {
    let ours = MockFactory::new();
    let pool = ours.pool(PoolOptions::new());

    let theirs = MockFactory::new();
    let foreign = theirs
        .pool(PoolOptions::new())
        .reserve_if_available()?
        .expect("unbounded");

    let result = panic::catch_unwind(AssertUnwindSafe(|| pool.free(foreign)));

    let payload = result.expect_err("freeing an unreserved connection must panic");
    let message = payload
        .downcast_ref::<&str>()
        .copied()
        .unwrap_or_default();
    assert!(message.contains("not reserved from this pool"), "{message}");

    assert!(theirs.is_closed(0));
    assert_eq!(pool.size(), 0);
    assert_eq!(pool.num_idle(), 0);

    Ok(())
}
