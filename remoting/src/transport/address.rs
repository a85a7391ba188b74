//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//


//! Endpoint addresses.
//!
//! Two schemes are understood:
//!
//! - `tcp://host:port` dials or binds a TCP socket. Binding port `0` lets
//!   the OS pick a free port; the listener reports the real one.
//! - `memory://name` dials or binds a named slot on a [`MemoryNetwork`].

use std::fmt;
use std::str::FromStr;

use crate::transport::{
    Listener, MemoryNetwork, TcpAcceptor, TcpTransport, Transport, TransportError,
};

/// A parsed endpoint address.
///
/// # Examples
///
/// ```rust
/// use remoting::transport::Address;
///
/// let address: Address = "tcp://127.0.0.1:0".parse().unwrap();
/// assert_eq!(address, Address::tcp("127.0.0.1:0"));
///
/// let address: Address = "memory://calculator".parse().unwrap();
/// assert_eq!(address.to_string(), "memory://calculator");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Address {
    /// A TCP `host:port` pair.
    Tcp(String),
    /// A named slot on an in-process memory network.
    Memory(String),
}

impl Address {
    /// Creates a TCP address from a `host:port` string.
    pub fn tcp(authority: impl Into<String>) -> Self {
        Address::Tcp(authority.into())
    }

    /// Creates a memory address from a slot name.
    pub fn memory(name: impl Into<String>) -> Self {
        Address::Memory(name.into())
    }

    /// The URI scheme of this address.
    pub fn scheme(&self) -> &'static str {
        match self {
            Address::Tcp(_) => "tcp",
            Address::Memory(_) => "memory",
        }
    }

    /// Binds a listener on this address.
    pub async fn bind(&self, network: &MemoryNetwork) -> Result<Box<dyn Listener>, TransportError> {
        match self {
            Address::Tcp(authority) => Ok(Box::new(TcpAcceptor::bind(authority).await?)),
            Address::Memory(name) => Ok(Box::new(network.bind(name)?)),
        }
    }

    /// Opens a transport to this address.
    pub async fn connect(
        &self,
        network: &MemoryNetwork,
    ) -> Result<Box<dyn Transport>, TransportError> {
        match self {
            Address::Tcp(authority) => Ok(Box::new(TcpTransport::connect(authority.as_str()).await?)),
            Address::Memory(name) => Ok(Box::new(network.connect(name).await?)),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Tcp(authority) => write!(f, "tcp://{authority}"),
            Address::Memory(name) => write!(f, "memory://{name}"),
        }
    }
}

impl FromStr for Address {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| TransportError::InvalidAddress {
            address: s.to_string(),
            reason: reason.to_string(),
        };
        let (scheme, rest) = s
            .split_once("://")
            .ok_or_else(|| invalid("missing scheme"))?;
        if rest.is_empty() {
            return Err(invalid("missing host or name"));
        }
        match scheme {
            "tcp" => {
                let (host, port) = rest
                    .rsplit_once(':')
                    .ok_or_else(|| invalid("missing port"))?;
                if host.is_empty() {
                    return Err(invalid("missing host"));
                }
                port.parse::<u16>().map_err(|_| invalid("invalid port"))?;
                Ok(Address::Tcp(rest.to_string()))
            }
            "memory" => Ok(Address::Memory(rest.to_string())),
            _ => Err(invalid("unknown scheme")),
        }
    }
}
