//! Pool integration tests against the mock MAPI server.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use monet_client::{Config, Value};
use monet_pool::{Pool, PoolConfig};
use monet_testing::{MockMapiServer, MockServerBuilder};

fn pool_config(server: &MockMapiServer, size: usize) -> PoolConfig {
    PoolConfig::new()
        .connection(
            Config::new()
                .host(server.addr().ip().to_string())
                .port(server.addr().port()),
        )
        .pool_size(size)
        .name("test-pool")
}

/// Wait until the pool has the expected number of idle connections.
async fn wait_for_idle(pool: &Pool, expected: usize) {
    for _ in 0..200 {
        if pool.status().idle >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "pool never reached {expected} idle connections: {:?}",
        pool.status()
    );
}

fn scripted() -> MockServerBuilder {
    MockMapiServer::builder().with_response(
        "sselect 1;",
        "&1 0 1 1 1\n% .%1 # table_name\n% %1 # name\n% int # type\n% 1 # length\n[ 1\t]\n",
    )
}

#[tokio::test]
async fn test_startup_fills_slots() {
    let server = scripted().build().await.unwrap();
    let pool = Pool::start(pool_config(&server, 3));
    wait_for_idle(&pool, 3).await;

    let status = pool.status();
    assert_eq!(status.size, 3);
    assert_eq!(status.idle, 3);
    assert_eq!(status.in_use, 0);
    assert_eq!(server.connections_accepted(), 3);
}

#[tokio::test]
async fn test_checkout_reuses_connections() {
    let server = scripted().build().await.unwrap();
    let pool = Pool::start(pool_config(&server, 1));
    wait_for_idle(&pool, 1).await;

    for _ in 0..5 {
        let result = pool.query("select 1").await.unwrap();
        assert_eq!(result.scalar(), Some(&Value::Int(1)));
    }
    // A single worker served every query.
    assert_eq!(server.connections_accepted(), 1);
}

#[tokio::test]
async fn test_checkout_is_exclusive() {
    let server = scripted().build().await.unwrap();
    let pool = Pool::start(pool_config(&server, 1));
    wait_for_idle(&pool, 1).await;

    let first = pool.checkout().await.unwrap();
    assert_eq!(pool.status().in_use, 1);

    // A second checkout must block until the first is returned.
    let second = tokio::time::timeout(Duration::from_millis(100), pool.checkout()).await;
    assert!(second.is_err());

    drop(first);
    let second = tokio::time::timeout(Duration::from_secs(1), pool.checkout())
        .await
        .expect("checkout after release")
        .unwrap();
    drop(second);
}

#[tokio::test]
async fn test_broken_connection_evicted_and_replaced() {
    let server = scripted().build().await.unwrap();
    let pool = Pool::start(pool_config(&server, 1));
    wait_for_idle(&pool, 1).await;

    {
        let mut conn = pool.checkout().await.unwrap();
        conn.mark_broken();
    }
    assert_eq!(pool.status().idle, 0);

    // The replacement is a fresh TCP connection.
    let result = pool.query("select 1").await.unwrap();
    assert_eq!(result.scalar(), Some(&Value::Int(1)));
    assert_eq!(server.connections_accepted(), 2);
}

#[tokio::test]
async fn test_concurrent_checkouts() {
    let server = scripted().build().await.unwrap();
    let pool = Pool::start(pool_config(&server, 4));
    wait_for_idle(&pool, 4).await;

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let pool = pool.clone();
        tasks.push(tokio::spawn(async move {
            pool.query("select 1").await.unwrap().scalar().cloned()
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap(), Some(Value::Int(1)));
    }
    // No more connections than the pool size were ever established.
    assert!(server.connections_accepted() <= 4);
}

#[tokio::test]
async fn test_closed_pool_rejects_checkout() {
    let server = scripted().build().await.unwrap();
    let pool = Pool::start(pool_config(&server, 1));
    wait_for_idle(&pool, 1).await;

    pool.close();
    assert!(pool.is_closed());
    assert!(pool.checkout().await.is_err());
    assert_eq!(pool.status().idle, 0);
}

#[tokio::test]
async fn test_detach_removes_connection_from_pool() {
    let server = scripted().build().await.unwrap();
    let pool = Pool::start(pool_config(&server, 1));
    wait_for_idle(&pool, 1).await;

    let guard = pool.checkout().await.unwrap();
    let mut conn = guard.detach();
    assert_eq!(pool.status().idle, 0);

    // The detached connection still works standalone.
    let result = conn.query("select 1").await.unwrap();
    assert_eq!(result.scalar(), Some(&Value::Int(1)));
}

#[tokio::test]
async fn test_pool_transaction() {
    let server = scripted()
        .with_response("prepare insert into t values (?)", "&5 5 1 6 1\n% p # table_name\n% p # name\n% p # type\n% p # length\n[ \"int\",\t32,\t0,\tNULL,\tNULL,\tNULL\t]\n")
        .with_response("exec 5(1)", "&2 1 -1 0 0")
        .build()
        .await
        .unwrap();
    let pool = Pool::start(pool_config(&server, 1));
    wait_for_idle(&pool, 1).await;

    let count = pool
        .transaction(async |tx| {
            tx.query_with("insert into t values (?)", &[Value::Int(1)])
                .await
                .map(|result| monet_client::TxOutcome::Commit(result.row_count()))
        })
        .await
        .unwrap();
    assert_eq!(count, 1);
}
