//! Query and transaction integration tests against the mock MAPI server.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use monet_client::{Config, Connection, Error, QueryResult, TxOutcome, Value};
use monet_testing::{MockMapiServer, MockServerBuilder};

fn config_for(server: &MockMapiServer) -> Config {
    Config::new()
        .host(server.addr().ip().to_string())
        .port(server.addr().port())
}

/// A one-column `int` select result with the given rows.
fn int_result(row_count: usize, rows: &[i64]) -> String {
    let mut payload = format!("&1 0 {row_count} 1 {row_count}\n");
    payload.push_str("% .%1 # table_name\n");
    payload.push_str("% %1 # name\n");
    payload.push_str("% int # type\n");
    payload.push_str("% 1 # length\n");
    for value in rows {
        payload.push_str(&format!("[ {value}\t]\n"));
    }
    payload
}

/// A prepare reply with one `int` placeholder.
fn int_prepare(id: &str) -> String {
    format!(
        "&5 {id} 1 6 1\n\
         % .prepare,\t.prepare,\t.prepare,\t.prepare,\t.prepare,\t.prepare # table_name\n\
         % type,\tdigits,\tscale,\tschema,\ttable,\tcolumn # name\n\
         % varchar,\tint,\tint,\tstr,\tstr,\tstr # type\n\
         % 3,\t2,\t1,\t0,\t0,\t0 # length\n\
         [ \"int\",\t32,\t0,\tNULL,\tNULL,\tNULL\t]\n"
    )
}

async fn connect(builder: MockServerBuilder) -> (MockMapiServer, Connection) {
    let server = builder.build().await.unwrap();
    let conn = Connection::connect(config_for(&server)).await.unwrap();
    (server, conn)
}

#[tokio::test]
async fn test_select_with_no_rows() {
    let (_server, mut conn) = connect(
        MockMapiServer::builder().with_response("sselect 1 where false;", int_result(0, &[])),
    )
    .await;

    let result = conn.query("select 1 where false").await.unwrap();
    let QueryResult::Rows(rows) = &result else {
        panic!("expected rows, got {result:?}");
    };
    assert_eq!(rows.row_count, 0);
    assert!(rows.rows.is_empty());
    assert_eq!(rows.columns, vec!["%1"]);
    assert_eq!(rows.types, vec![monet_client::ColumnType::Int]);
}

#[tokio::test]
async fn test_select_ordered_rows() {
    let payload = "&1 0 3 2 3\n\
                   % sys.result_test,\tsys.result_test # table_name\n\
                   % id,\tname # name\n\
                   % int,\tvarchar # type\n\
                   % 1,\t7 # length\n\
                   [ 1,\t\"Leto\"\t]\n\
                   [ 2,\t\"Jessica\"\t]\n\
                   [ 3,\t\"Paul\"\t]\n";
    let (_server, mut conn) = connect(
        MockMapiServer::builder()
            .with_response("sselect * from result_test order by id;", payload),
    )
    .await;

    let result = conn
        .query("select * from result_test order by id")
        .await
        .unwrap();
    let rows: Vec<_> = result.rows().collect();
    assert_eq!(
        rows,
        vec![
            &[Value::Int(1), Value::Text("Leto".into())][..],
            &[Value::Int(2), Value::Text("Jessica".into())][..],
            &[Value::Int(3), Value::Text("Paul".into())][..],
        ]
    );
}

#[tokio::test]
async fn test_parameterised_query_prepares_execs_and_deallocates() {
    let exec_reply = "&1 3 1 2 1\n\
                      % .%2,\t.%2 # table_name\n\
                      % %2,\t%3 # name\n\
                      % int,\tvarchar # type\n\
                      % 1,\t1 # length\n\
                      [ 0,\t\"a\"\t]\n";
    let (_server, mut conn) = connect(
        MockMapiServer::builder()
            .with_response("prepare select 1 - ?, 'a'", int_prepare("2"))
            .with_response("exec 2(1)", exec_reply),
    )
    .await;

    let result = conn
        .query_with("select 1 - ?, 'a'", &[Value::Int(1)])
        .await
        .unwrap();
    let rows: Vec<_> = result.rows().collect();
    assert_eq!(rows, vec![&[Value::Int(0), Value::Text("a".into())][..]]);
    // The deallocate ran against the mock's default reply; the
    // connection stays usable.
    assert!(conn.is_reusable());
}

#[tokio::test]
async fn test_failed_exec_with_benign_deallocate() {
    let (_server, mut conn) = connect(
        MockMapiServer::builder()
            .with_response("prepare insert into t values (?)", int_prepare("9"))
            .with_response("exec 9(5)", "!40002!INSERT INTO: constraint violated")
            .with_response("deallocate 9", "!7003!no such prepared statement")
            .with_response("sselect 1;", int_result(1, &[1])),
    )
    .await;

    let err = conn
        .query_with("insert into t values (?)", &[Value::Int(5)])
        .await
        .unwrap_err();
    assert_eq!(err.server_code(), Some(40002));

    // Code 7003 on deallocate is the normal post-failure state; the
    // connection remains usable.
    assert!(conn.is_reusable());
    let followup = conn.query("select 1").await.unwrap();
    assert_eq!(followup.scalar(), Some(&Value::Int(1)));
}

#[tokio::test]
async fn test_hard_deallocate_failure_closes_connection() {
    let (_server, mut conn) = connect(
        MockMapiServer::builder()
            .with_response("prepare select ?", int_prepare("4"))
            .with_response("exec 4(1)", int_result(1, &[1]))
            .with_response("deallocate 4", "!42000!deallocate refused"),
    )
    .await;

    let err = conn.query_with("select ?", &[Value::Int(1)]).await.unwrap_err();
    assert_eq!(err.server_code(), Some(42000));
    assert!(!conn.is_reusable());
}

#[tokio::test]
async fn test_upsert_result() {
    let (_server, mut conn) = connect(
        MockMapiServer::builder().with_response("sinsert into t values (1);", "&2 1 42 0 0"),
    )
    .await;

    let result = conn.query("insert into t values (1)").await.unwrap();
    assert_eq!(
        result,
        QueryResult::Upsert {
            row_count: 1,
            last_id: Some(42),
        }
    );
    assert_eq!(conn.execute("insert into t values (1)", &[]).await.unwrap(), 1);
}

#[tokio::test]
async fn test_embedded_ddl_error() {
    let (_server, mut conn) = connect(
        MockMapiServer::builder().with_response("screate table result_test (id int);", "&3 72\n!201!er1"),
    )
    .await;

    let err = conn
        .query("create table result_test (id int)")
        .await
        .unwrap_err();
    assert_eq!(err.server_code(), Some(201));
    assert!(err.to_string().contains("er1"));
}

#[tokio::test]
async fn test_transaction_commit_path() {
    let (_server, mut conn) = connect(
        MockMapiServer::builder()
            .with_response("prepare insert into tx_test values (?)", int_prepare("7"))
            .with_response("exec 7(3)", "&2 1 -1 0 0")
            .with_response("sselect * from tx_test;", int_result(1, &[3])),
    )
    .await;

    let result = conn
        .transaction(async |tx| {
            tx.query_with("insert into tx_test values (?)", &[Value::Int(3)])
                .await?;
            let rows = tx.query("select * from tx_test").await?;
            Ok(TxOutcome::Commit(rows))
        })
        .await
        .unwrap();

    assert_eq!(result.into_rows(), vec![vec![Value::Int(3)]]);
    assert!(conn.is_reusable());
}

#[tokio::test]
async fn test_transaction_rollback_path() {
    let (_server, mut conn) = connect(
        MockMapiServer::builder()
            .with_response("prepare insert into tx_test values (?)", int_prepare("7"))
            .with_response("exec 7(3)", "&2 1 -1 0 0"),
    )
    .await;

    let err = conn
        .transaction(async |tx| -> Result<TxOutcome<()>, Error> {
            tx.query_with("insert into tx_test values (?)", &[Value::Int(3)])
                .await?;
            Ok(TxOutcome::rollback("fail"))
        })
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Client(ref message) if message == "fail"), "got {err}");
    assert!(conn.is_reusable());
}

#[tokio::test]
async fn test_transaction_error_rolls_back() {
    let (_server, mut conn) = connect(
        MockMapiServer::builder()
            .with_response("sselect boom;", "!42000!identifier 'boom' unknown"),
    )
    .await;

    let err = conn
        .transaction(async |tx| {
            let rows = tx.query("select boom").await?;
            Ok(TxOutcome::Commit(rows))
        })
        .await
        .unwrap_err();

    assert_eq!(err.server_code(), Some(42000));
    // The server error does not poison the connection; rollback settled it.
    assert!(conn.is_reusable());
}

#[tokio::test]
async fn test_transaction_named_statements_deallocated() {
    let (_server, mut conn) = connect(
        MockMapiServer::builder()
            .with_response("prepare insert into tx_test values (?)", int_prepare("7"))
            .with_response("exec 7(3)", "&2 1 -1 0 0")
            .with_response("exec 7(4)", "&2 1 -1 0 0"),
    )
    .await;

    let inserted = conn
        .transaction(async |tx| {
            tx.prepare("ins", "insert into tx_test values (?)").await?;
            assert_eq!(tx.statement_count(), 1);
            tx.exec("ins", &[Value::Int(3)]).await?;
            let second = tx.exec("ins", &[Value::Int(4)]).await?;
            Ok(TxOutcome::Commit(second.row_count()))
        })
        .await
        .unwrap();

    assert_eq!(inserted, 1);
    assert!(conn.is_reusable());
}

#[tokio::test]
async fn test_transaction_unknown_named_statement() {
    let (_server, mut conn) = connect(MockMapiServer::builder()).await;

    let err = conn
        .transaction(async |tx| -> Result<TxOutcome<()>, Error> {
            let result = tx.exec("missing", &[]).await;
            result.map(|_| TxOutcome::Commit(()))
        })
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Client(_)), "got {err}");
}

#[tokio::test]
async fn test_transaction_panic_poisons_connection() {
    use futures_util::FutureExt;

    let (_server, mut conn) = connect(MockMapiServer::builder()).await;

    let result = std::panic::AssertUnwindSafe(
        conn.transaction(async |_tx| -> Result<TxOutcome<()>, Error> { panic!("boom") }),
    )
    .catch_unwind()
    .await;

    assert!(result.is_err());
    // The transaction never settled, so the connection must not be
    // reused; the pool evicts it and the server rolls back on close.
    assert!(!conn.is_reusable());
}

#[tokio::test]
async fn test_login_read_timeout_is_network_error() {
    use std::time::Duration;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        // Accept and hold the socket without ever sending a challenge.
        if let Ok((socket, _)) = listener.accept().await {
            tokio::time::sleep(Duration::from_secs(60)).await;
            drop(socket);
        }
    });

    let config = Config::new()
        .host(addr.ip().to_string())
        .port(addr.port())
        .timeouts(monet_client::TimeoutConfig::new().read(Duration::from_millis(100)));
    let err = Connection::connect(config).await.unwrap_err();
    assert!(err.is_network(), "got {err}");
}
