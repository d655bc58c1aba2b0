//! A single RESP connection to one endpoint.
//!
//! # Responsibilities
//! - Dial the endpoint over TCP or a Unix socket within the dial timeout
//! - Authenticate and select the logical database on connect
//! - Run one request/reply round trip under the read/write timeouts
//! - Remember when the connection was last used (idle eviction)

use std::future::Future;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::client::resp::{encode_command, parse_reply, Command, FrameScanner, Reply};
use crate::client::{ClientError, ClientResult};
use crate::config::{EndpointConfig, Transport};

const READ_CHUNK: usize = 4096;

trait Stream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Stream for T {}

/// An established connection.
pub struct RespConnection {
    stream: Box<dyn Stream>,
    buf: Vec<u8>,
    scanner: FrameScanner,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
    last_used: Instant,
}

impl std::fmt::Debug for RespConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RespConnection")
            .field("buffered", &self.buf.len())
            .field("last_used", &self.last_used)
            .finish()
    }
}

impl RespConnection {
    /// Dial the endpoint named by `config.address` and run the handshake.
    pub async fn dial(config: &EndpointConfig) -> ClientResult<Self> {
        let addr = config
            .address
            .as_ref()
            .ok_or_else(|| ClientError::InvalidConfig("endpoint address is not set".into()))?;

        let stream: Box<dyn Stream> = match config.transport {
            Transport::Tcp => {
                let stream =
                    with_timeout(Some(config.dial_timeout()), "dial", TcpStream::connect(addr.as_str()))
                        .await??;
                stream.set_nodelay(true)?;
                Box::new(stream)
            }
            Transport::Unix => Box::new(dial_unix(addr.as_str(), config.dial_timeout()).await?),
        };

        let mut conn = Self {
            stream,
            buf: Vec::with_capacity(READ_CHUNK),
            scanner: FrameScanner::default(),
            read_timeout: config.read_timeout(),
            write_timeout: config.write_timeout(),
            last_used: Instant::now(),
        };

        if let Some(password) = &config.password {
            conn.checked(&Command::auth(config.username.as_deref(), password)).await?;
        }
        if config.db != 0 {
            conn.checked(&Command::select(config.db)).await?;
        }

        tracing::debug!(addr = %addr, "Connection established");
        Ok(conn)
    }

    /// Write `command` and read exactly one reply.
    pub async fn round_trip(&mut self, command: &Command) -> ClientResult<Reply> {
        let mut out = Vec::new();
        encode_command(command, &mut out);

        let write_timeout = self.write_timeout;
        let stream = &mut self.stream;
        with_timeout(write_timeout, "write", async {
            stream.write_all(&out).await?;
            stream.flush().await
        })
        .await??;

        loop {
            // Only build the reply once the scanner has seen all of it.
            if let Some(end) = self.scanner.scan(&self.buf)? {
                if let Some((reply, used)) = parse_reply(&self.buf[..end])? {
                    self.buf.drain(..used);
                    self.last_used = Instant::now();
                    return Ok(reply);
                }
            }

            let mut chunk = [0u8; READ_CHUNK];
            let n = with_timeout(self.read_timeout, "read", self.stream.read(&mut chunk)).await??;
            if n == 0 {
                return Err(ClientError::Io(std::io::ErrorKind::UnexpectedEof.into()));
            }
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }

    /// Time since the last completed round trip.
    pub fn idle_for(&self) -> Duration {
        self.last_used.elapsed()
    }

    async fn checked(&mut self, command: &Command) -> ClientResult<()> {
        match self.round_trip(command).await? {
            Reply::Error(msg) => Err(ClientError::Server(msg)),
            _ => Ok(()),
        }
    }
}

#[cfg(unix)]
async fn dial_unix(path: &str, limit: Duration) -> ClientResult<tokio::net::UnixStream> {
    Ok(with_timeout(Some(limit), "dial", tokio::net::UnixStream::connect(path)).await??)
}

#[cfg(not(unix))]
async fn dial_unix(_path: &str, _limit: Duration) -> ClientResult<TcpStream> {
    Err(ClientError::InvalidConfig("unix transport is not available on this platform".into()))
}

async fn with_timeout<T>(
    limit: Option<Duration>,
    op: &'static str,
    fut: impl Future<Output = T>,
) -> ClientResult<T> {
    match limit {
        Some(limit) => timeout(limit, fut).await.map_err(|_| ClientError::Timeout {
            op,
            after_ms: limit.as_millis() as u64,
        }),
        None => Ok(fut.await),
    }
}
