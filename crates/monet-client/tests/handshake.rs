//! Handshake integration tests against the mock MAPI server.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use monet_client::{Config, Connection, Error};
use monet_testing::MockMapiServer;

fn config_for(server: &MockMapiServer) -> Config {
    Config::new()
        .host(server.addr().ip().to_string())
        .port(server.addr().port())
}

#[tokio::test]
async fn test_connect_and_configure_session() {
    let server = MockMapiServer::start().await.unwrap();
    let conn = Connection::connect(config_for(&server)).await.unwrap();
    assert!(conn.is_reusable());
}

#[tokio::test]
async fn test_connect_with_schema_and_role() {
    let server = MockMapiServer::start().await.unwrap();
    let config = config_for(&server).schema("analytics").role("reader");
    let conn = Connection::connect(config).await.unwrap();
    assert!(conn.is_reusable());
}

#[tokio::test]
async fn test_wrong_password_is_server_error() {
    let server = MockMapiServer::start().await.unwrap();
    let config = config_for(&server).password("wrong");
    let err = Connection::connect(config).await.unwrap_err();
    assert!(matches!(err, Error::Server(_)), "got {err}");
}

#[tokio::test]
async fn test_proxy_rounds_rerun_challenge_on_same_socket() {
    let server = MockMapiServer::builder()
        .with_proxy_rounds(2)
        .build()
        .await
        .unwrap();
    let conn = Connection::connect(config_for(&server)).await.unwrap();
    assert!(conn.is_reusable());
    // Proxy rounds reuse the socket; only one TCP connection is made.
    assert_eq!(server.connections_accepted(), 1);
}

#[tokio::test]
async fn test_too_many_proxy_rounds_is_driver_error() {
    let server = MockMapiServer::builder()
        .with_proxy_rounds(32)
        .build()
        .await
        .unwrap();
    let err = Connection::connect(config_for(&server)).await.unwrap_err();
    assert!(matches!(err, Error::Driver(_)), "got {err}");
    assert!(err.to_string().contains("proxy"));
}

#[tokio::test]
async fn test_redirect_reconnects_with_merged_options() {
    // The redirect target only accepts the database named in the URI,
    // proving the client merged it into its options.
    let target = MockMapiServer::builder()
        .with_credentials("monetdb", "monetdb", "dune_db")
        .build()
        .await
        .unwrap();
    let front = MockMapiServer::builder()
        .with_redirect(format!(
            "^mapi:monetdb://{}:{}/dune_db\n",
            target.addr().ip(),
            target.addr().port()
        ))
        .build()
        .await
        .unwrap();

    let conn = Connection::connect(config_for(&front)).await.unwrap();
    assert!(conn.is_reusable());
    assert_eq!(conn.config().database, "dune_db");
    assert_eq!(front.connections_accepted(), 1);
    assert_eq!(target.connections_accepted(), 1);
}

#[tokio::test]
async fn test_redirect_to_dead_host_is_network_error() {
    // Obtain a port with no listener for the redirect target.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead = listener.local_addr().unwrap();
    drop(listener);

    let front = MockMapiServer::builder()
        .with_redirect(format!("^mapi:monetdb://{}:{}/monetdb\n", dead.ip(), dead.port()))
        .build()
        .await
        .unwrap();

    let err = Connection::connect(config_for(&front)).await.unwrap_err();
    assert!(err.is_network(), "got {err}");
}

#[tokio::test]
async fn test_connect_refused_is_network_error() {
    // Bind-then-drop to obtain a port with no listener.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = Config::new()
        .host(addr.ip().to_string())
        .port(addr.port());
    let err = Connection::connect(config).await.unwrap_err();
    assert!(err.is_network(), "got {err}");
}
