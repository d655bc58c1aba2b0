//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

use proxy_pool::client::resp::{encode_reply, parse_reply};
use proxy_pool::client::{ClientError, ClientFactory, ClientResult, Command, EndpointClient, Reply};
use proxy_pool::{EndpointAddr, EndpointConfig};

type Store = Arc<Mutex<HashMap<Vec<u8>, Vec<u8>>>>;

/// An in-process endpoint speaking enough RESP for the tests.
pub struct MockRedis {
    pub addr: SocketAddr,
    store: Store,
    commands: Arc<AtomicUsize>,
    connections: Arc<AtomicUsize>,
    stop_tx: broadcast::Sender<()>,
}

impl MockRedis {
    pub fn endpoint(&self) -> EndpointAddr {
        self.addr.to_string().parse().unwrap()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.store
            .lock()
            .unwrap()
            .get(key.as_bytes())
            .map(|v| String::from_utf8_lossy(v).into_owned())
    }

    /// Data commands served (AUTH and SELECT excluded).
    pub fn commands(&self) -> usize {
        self.commands.load(Ordering::SeqCst)
    }

    /// Connections accepted so far.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Stop accepting and drop every open connection.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(());
    }
}

/// Start a mock endpoint on an ephemeral port.
pub async fn start_mock_redis(password: Option<&'static str>) -> MockRedis {
    start_mock_redis_at("127.0.0.1:0".parse().unwrap(), password).await
}

/// Start a mock endpoint on `addr`.
pub async fn start_mock_redis_at(addr: SocketAddr, password: Option<&'static str>) -> MockRedis {
    let listener = TcpListener::bind(addr).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let store: Store = Arc::default();
    let commands = Arc::new(AtomicUsize::new(0));
    let connections = Arc::new(AtomicUsize::new(0));
    let (stop_tx, mut stop_rx) = broadcast::channel(1);

    let server = MockRedis {
        addr,
        store: store.clone(),
        commands: commands.clone(),
        connections: connections.clone(),
        stop_tx: stop_tx.clone(),
    };

    tokio::spawn(async move {
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((socket, _)) => {
                        connections.fetch_add(1, Ordering::SeqCst);
                        let store = store.clone();
                        let commands = commands.clone();
                        let stop_rx = stop_tx.subscribe();
                        tokio::spawn(serve_connection(socket, store, commands, password, stop_rx));
                    }
                    Err(_) => break,
                },
                _ = stop_rx.recv() => break,
            }
        }
    });

    server
}

async fn serve_connection(
    mut socket: TcpStream,
    store: Store,
    commands: Arc<AtomicUsize>,
    password: Option<&'static str>,
    mut stop_rx: broadcast::Receiver<()>,
) {
    let mut authed = password.is_none();
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    loop {
        let n = tokio::select! {
            read = socket.read(&mut chunk) => match read {
                Ok(0) | Err(_) => return,
                Ok(n) => n,
            },
            _ = stop_rx.recv() => return,
        };
        buf.extend_from_slice(&chunk[..n]);

        while let Ok(Some((frame, used))) = parse_reply(&buf) {
            buf.drain(..used);
            let args = match frame {
                Reply::Array(items) => items
                    .into_iter()
                    .filter_map(|item| item.as_bytes().map(<[u8]>::to_vec))
                    .collect::<Vec<_>>(),
                _ => Vec::new(),
            };
            let reply = respond(&args, &mut authed, password, &store, &commands);
            let mut out = Vec::new();
            encode_reply(&reply, &mut out);
            if socket.write_all(&out).await.is_err() {
                return;
            }
        }
    }
}

fn respond(
    args: &[Vec<u8>],
    authed: &mut bool,
    password: Option<&str>,
    store: &Store,
    commands: &AtomicUsize,
) -> Reply {
    let Some(name) = args.first() else {
        return Reply::Error("ERR empty command".into());
    };
    let name = String::from_utf8_lossy(name).to_ascii_uppercase();

    match name.as_str() {
        "AUTH" => {
            let given = args.last().map(|p| String::from_utf8_lossy(p).into_owned());
            if password.is_some() && given.as_deref() == password {
                *authed = true;
                Reply::Simple("OK".into())
            } else {
                Reply::Error("WRONGPASS invalid username-password pair".into())
            }
        }
        _ if !*authed => Reply::Error("NOAUTH Authentication required.".into()),
        "SELECT" => Reply::Simple("OK".into()),
        _ => {
            commands.fetch_add(1, Ordering::SeqCst);
            let mut store = store.lock().unwrap();
            match (name.as_str(), args.len()) {
                ("PING", _) => Reply::Simple("PONG".into()),
                ("SET", n) if n >= 3 => {
                    store.insert(args[1].clone(), args[2].clone());
                    Reply::Simple("OK".into())
                }
                ("GET", 2) => store.get(&args[1]).cloned().map(Reply::Bulk).unwrap_or(Reply::Nil),
                ("DEL", 2) => Reply::Integer(store.remove(&args[1]).map_or(0, |_| 1)),
                _ => Reply::Error(format!("ERR unknown command '{name}'")),
            }
        }
    }
}

/// An address nothing listens on.
pub fn closed_port() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

/// Client double that only counts closes.
#[derive(Debug, Default)]
pub struct CountingClient {
    pub closes: AtomicUsize,
}

impl EndpointClient for CountingClient {
    async fn issue(&self, command: Command) -> ClientResult<Reply> {
        if self.closes.load(Ordering::SeqCst) > 0 {
            return Err(ClientError::Closed);
        }
        Ok(Reply::Simple(command.name()))
    }

    fn close(&self) -> ClientResult<()> {
        match self.closes.fetch_add(1, Ordering::SeqCst) {
            0 => Ok(()),
            _ => Err(ClientError::Closed),
        }
    }
}

/// Factory double counting the clients it builds.
#[derive(Debug, Default)]
pub struct CountingFactory {
    pub created: AtomicUsize,
}

impl ClientFactory for CountingFactory {
    type Client = CountingClient;

    fn create(&self, _config: &EndpointConfig) -> ClientResult<CountingClient> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(CountingClient::default())
    }
}

pub fn addrs(list: &[&str]) -> Vec<EndpointAddr> {
    list.iter().map(|s| s.parse().unwrap()).collect()
}
