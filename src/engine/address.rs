//! Engine address parsing.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use thiserror::Error;

/// `IP:port` of one detection engine.
///
/// Hostnames are rejected: engines are addressed by numeric IP only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BackendAddress(SocketAddr);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid engine address {0:?}, expected IP:port")]
pub struct InvalidAddress(pub String);

impl BackendAddress {
    pub fn socket_addr(&self) -> SocketAddr {
        self.0
    }
}

impl FromStr for BackendAddress {
    type Err = InvalidAddress;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<SocketAddr>()
            .map(Self)
            .map_err(|_| InvalidAddress(s.to_string()))
    }
}

impl From<SocketAddr> for BackendAddress {
    fn from(addr: SocketAddr) -> Self {
        Self(addr)
    }
}

impl fmt::Display for BackendAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
