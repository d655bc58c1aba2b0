//! Endpoint abstraction.
//!
//! # Responsibilities
//! - Name a single proxy endpoint (`EndpointAddr`)
//! - Pair an endpoint with the client that talks to it (`PooledClient`)
//! - Provide the canonical ordering used to lay out a pool snapshot

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;
use thiserror::Error;

use crate::client::{ClientResult, EndpointClient};

/// Error returned when an endpoint address cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid endpoint address '{input}': {reason}")]
pub struct AddrParseError {
    pub input: String,
    pub reason: &'static str,
}

/// Address of one proxy endpoint.
///
/// Either `host:port` (IPv6 hosts in brackets) or an absolute Unix socket
/// path. Ordering is plain byte-wise string order, which is the canonical
/// order of a pool snapshot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EndpointAddr(String);

impl EndpointAddr {
    /// The address as it was configured.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the address names a Unix socket path.
    pub fn is_unix_path(&self) -> bool {
        self.0.starts_with('/')
    }
}

impl FromStr for EndpointAddr {
    type Err = AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let fail = |reason| AddrParseError {
            input: s.to_string(),
            reason,
        };

        if input.is_empty() {
            return Err(fail("address is empty"));
        }
        if input.starts_with('/') {
            return Ok(Self(input.to_string()));
        }

        let (host, port) = input.rsplit_once(':').ok_or_else(|| fail("missing port"))?;
        if host.is_empty() || host == "[]" {
            return Err(fail("missing host"));
        }
        if host.contains(':') && !(host.starts_with('[') && host.ends_with(']')) {
            return Err(fail("IPv6 hosts must be enclosed in brackets"));
        }
        match port.parse::<u16>() {
            Ok(0) => Err(fail("port must be non-zero")),
            Ok(_) => Ok(Self(input.to_string())),
            Err(_) => Err(fail("port is not a number")),
        }
    }
}

impl TryFrom<String> for EndpointAddr {
    type Error = AddrParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl TryFrom<&str> for EndpointAddr {
    type Error = AddrParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EndpointAddr> for String {
    fn from(addr: EndpointAddr) -> Self {
        addr.0
    }
}

impl fmt::Display for EndpointAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A client bound to one endpoint, as held by a pool snapshot.
///
/// Immutable once created. Snapshots share it through `Arc`, so a caller that
/// selected it keeps a usable handle even after a reconcile retires it; the
/// pool closes the underlying client exactly once when it leaves rotation.
#[derive(Debug)]
pub struct PooledClient<C> {
    addr: EndpointAddr,
    client: C,
}

impl<C: EndpointClient> PooledClient<C> {
    pub fn new(addr: EndpointAddr, client: C) -> Self {
        Self { addr, client }
    }

    /// Endpoint this client talks to.
    pub fn addr(&self) -> &EndpointAddr {
        &self.addr
    }

    /// The underlying endpoint client.
    pub fn client(&self) -> &C {
        &self.client
    }

    pub(crate) fn close(&self) -> ClientResult<()> {
        self.client.close()
    }
}

impl<C> Deref for PooledClient<C> {
    type Target = C;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}
