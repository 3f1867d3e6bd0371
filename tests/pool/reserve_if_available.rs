use connpool::{Error, PoolOptions};
use connpool_test::MockFactory;
use std::collections::HashSet;

#[test]
fn reserve_with_no_limits_succeeds() -> anyhow::Result<()> {
    let factory = MockFactory::new();
    let pool = factory.pool(PoolOptions::new());

    assert!(pool.reserve_if_available()?.is_some());
    assert_eq!(factory.opened(), 1);
    assert_eq!(pool.num_reserved(), 1);

    Ok(())
}

#[test]
fn reserve_with_zero_limit_never_connects() -> anyhow::Result<()> {
    let factory = MockFactory::new();
    let pool = factory.pool(PoolOptions::new().max_connections(0));

    assert!(pool.reserve_if_available()?.is_none());
    assert_eq!(factory.calls(), 0);
    assert_eq!(pool.size(), 0);

    Ok(())
}

#[test]
fn reserve_fails_when_over_limit() -> anyhow::Result<()> {
    let factory = MockFactory::new();
    let pool = factory.pool(PoolOptions::new().max_connections(1));

    let c1 = pool.reserve_if_available()?;
    assert!(c1.is_some());

    let c2 = pool.reserve_if_available()?;
    assert!(c2.is_none());
    assert_eq!(factory.calls(), 1);

    Ok(())
}

#[test]
fn reserve_after_free_reuses_same_connection() -> anyhow::Result<()> {
    let factory = MockFactory::new();
    let pool = factory.pool(PoolOptions::new().max_connections(1));

    let c1 = pool.reserve_if_available()?.expect("pool is empty");
    let id = c1.id;
    pool.free(c1)?;

    assert_eq!(pool.num_idle(), 1);
    assert_eq!(pool.num_reserved(), 0);

    let c2 = pool.reserve_if_available()?.expect("connection was freed");
    assert_eq!(c2.id, id);
    assert_eq!(factory.opened(), 1);

    Ok(())
}

#[test]
fn factory_error_is_surfaced_and_not_counted() -> anyhow::Result<()> {
    let factory = MockFactory::new();
    let pool = factory.pool(PoolOptions::new().max_connections(1));

    factory.fail_connect(true);

    let err = pool.reserve_if_available().unwrap_err();
    assert!(matches!(err, Error::Connect(_)), "unexpected error: {err:?}");
    assert_eq!(pool.size(), 0);

    // no retry happened behind our back
    assert_eq!(factory.calls(), 1);

    factory.fail_connect(false);

    // the failed attempt did not use up the only slot
    assert!(pool.reserve_if_available()?.is_some());
    assert_eq!(pool.size(), 1);

    Ok(())
}

#[test]
fn draining_after_frees_returns_each_connection_once() -> anyhow::Result<()> {
    let factory = MockFactory::new();
    let pool = factory.pool(PoolOptions::new().max_connections(5));

    let mut conns = Vec::new();
    for _ in 0..5 {
        conns.push(pool.reserve_if_available()?.expect("below max_connections"));
    }

    let freed: Vec<usize> = conns.iter().map(|conn| conn.id).collect();

    for conn in conns {
        pool.free(conn)?;
    }

    let mut drained = Vec::new();
    while let Some(conn) = pool.reserve_if_available()? {
        drained.push(conn.id);
    }

    // oldest freed is reused first
    assert_eq!(drained, freed);
    assert_eq!(drained.iter().collect::<HashSet<_>>().len(), 5);
    assert_eq!(factory.opened(), 5);

    Ok(())
}

#[test]
fn idle_connections_are_reused_newest_merge_last() -> anyhow::Result<()> {
    let factory = MockFactory::new();
    let pool = factory.pool(PoolOptions::new());

    let a = pool.reserve_if_available()?.expect("unbounded");
    let b = pool.reserve_if_available()?.expect("unbounded");
    let (a_id, b_id) = (a.id, b.id);

    pool.free(a)?;
    pool.free(b)?;

    // merges [a, b]; `a` comes out first and `b` stays idle
    let first = pool.reserve_if_available()?.expect("idle connection");
    assert_eq!(first.id, a_id);

    // freed while `b` is still idle: goes to the back of the line
    pool.free(first)?;

    let second = pool.reserve_if_available()?.expect("idle connection");
    assert_eq!(second.id, b_id);

    let third = pool.reserve_if_available()?.expect("idle connection");
    assert_eq!(third.id, a_id);

    assert_eq!(factory.opened(), 2);

    Ok(())
}
