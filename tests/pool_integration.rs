//! End-to-end tests: pool of RESP clients against in-process endpoints.

mod common;

use common::{start_mock_redis, MockRedis};
use proxy_pool::{
    ClientError, Command, EndpointClient, EndpointConfig, ProxyPool, Reply, RespClientFactory,
};

fn base() -> EndpointConfig {
    EndpointConfig {
        read_timeout_ms: 1_000,
        write_timeout_ms: 1_000,
        dial_timeout_ms: 1_000,
        ..EndpointConfig::default()
    }
}

async fn set(pool: &ProxyPool<RespClientFactory>, key: &str, value: &str) {
    let member = pool.select().unwrap();
    let reply = member.issue(Command::set(key, value)).await.unwrap();
    assert!(reply.is_ok(), "unexpected reply from {}: {reply}", member.addr());
}

#[tokio::test]
async fn test_reconcile_moves_traffic() {
    let first = start_mock_redis(None).await;
    let second = start_mock_redis(None).await;

    let pool = ProxyPool::new(vec![first.endpoint()], base(), RespClientFactory).unwrap();
    set(&pool, "foo", "bar").await;
    assert_eq!(first.get("foo").as_deref(), Some("bar"));

    let report = pool.reconcile(vec![second.endpoint()]).unwrap();
    assert_eq!(report.added, vec![second.endpoint()]);
    assert_eq!(report.removed, vec![first.endpoint()]);

    set(&pool, "foo", "baz").await;
    assert_eq!(second.get("foo").as_deref(), Some("baz"));
    // The old endpoint never saw the second write.
    assert_eq!(first.get("foo").as_deref(), Some("bar"));

    pool.shutdown();
}

#[tokio::test]
async fn test_commands_spread_evenly() {
    let servers: Vec<MockRedis> = vec![
        start_mock_redis(None).await,
        start_mock_redis(None).await,
        start_mock_redis(None).await,
    ];
    let pool = ProxyPool::new(servers.iter().map(MockRedis::endpoint), base(), RespClientFactory).unwrap();

    for i in 0..30 {
        set(&pool, &format!("key{i}"), "v").await;
    }

    for server in &servers {
        assert_eq!(server.commands(), 10, "uneven load on {}", server.addr);
    }
    pool.shutdown();
}

#[tokio::test]
async fn test_connections_are_reused() {
    let server = start_mock_redis(None).await;
    let pool = ProxyPool::new(vec![server.endpoint()], base(), RespClientFactory).unwrap();

    for _ in 0..10 {
        let member = pool.select().unwrap();
        assert_eq!(member.issue(Command::ping()).await.unwrap(), Reply::Simple("PONG".into()));
    }

    assert_eq!(server.connections(), 1);
    assert_eq!(pool.select().unwrap().idle_connections(), 1);
    pool.shutdown();
}

#[tokio::test]
async fn test_auth_and_db_selection() {
    let server = start_mock_redis(Some("s3cret")).await;

    let authed = EndpointConfig {
        password: Some("s3cret".into()),
        db: 2,
        ..base()
    };
    let pool = ProxyPool::new(vec![server.endpoint()], authed, RespClientFactory).unwrap();
    set(&pool, "user", "alice").await;
    let reply = pool.select().unwrap().issue(Command::get("user")).await.unwrap();
    assert_eq!(reply, Reply::Bulk(b"alice".to_vec()));
    pool.shutdown();

    let wrong = EndpointConfig {
        password: Some("nope".into()),
        ..base()
    };
    let pool = ProxyPool::new(vec![server.endpoint()], wrong, RespClientFactory).unwrap();
    let err = pool.select().unwrap().issue(Command::ping()).await.unwrap_err();
    match err {
        ClientError::Server(msg) => assert!(msg.starts_with("WRONGPASS"), "got {msg}"),
        other => panic!("expected server error, got {other:?}"),
    }
    pool.shutdown();
}

#[tokio::test]
async fn test_server_error_reply_is_surfaced() {
    let server = start_mock_redis(None).await;
    let pool = ProxyPool::new(vec![server.endpoint()], base(), RespClientFactory).unwrap();
    let member = pool.select().unwrap();

    let err = member.issue(Command::new("FLUSHALL")).await.unwrap_err();
    assert!(matches!(err, ClientError::Server(ref msg) if msg.starts_with("ERR unknown command")));

    // The connection survives an error reply.
    member.issue(Command::set("k", "v")).await.unwrap();
    assert_eq!(server.connections(), 1);
    assert_eq!(
        member.issue(Command::del("k")).await.unwrap(),
        Reply::Integer(1)
    );
    pool.shutdown();
}

#[tokio::test]
async fn test_shutdown_closes_every_client() {
    let first = start_mock_redis(None).await;
    let second = start_mock_redis(None).await;
    let pool = ProxyPool::new(vec![first.endpoint(), second.endpoint()], base(), RespClientFactory).unwrap();

    let held: Vec<_> = pool.snapshot().iter().cloned().collect();
    pool.shutdown();

    assert!(pool.is_empty());
    for member in held {
        assert!(member.is_closed());
        let err = member.issue(Command::ping()).await.unwrap_err();
        assert!(matches!(err, ClientError::Closed));
    }
}
