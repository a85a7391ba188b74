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


//! TCP transport.

use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpListener, TcpStream};

use crate::transport::{Address, Listener, Transport, TransportError, TransportMetadata};

#[cfg(feature = "tracing")]
use tracing::{debug, info, instrument, warn};

/// TCP transport implementation.
///
/// `TcpTransport` wraps a Tokio `TcpStream`. Nagle's algorithm is disabled
/// since every frame is written in one piece and latency matters more than
/// packet count for request/response traffic.
///
/// # Examples
///
/// ```rust,no_run
/// use remoting::transport::TcpTransport;
/// use tokio::io::AsyncWriteExt;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut transport = TcpTransport::connect("127.0.0.1:8080").await?;
/// transport.write_all(b"hello").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct TcpTransport {
    stream: TcpStream,
    metadata: TransportMetadata,
}

impl TcpTransport {
    /// Wraps an already-connected stream.
    pub fn from_stream(stream: TcpStream) -> io::Result<Self> {
        let local_addr = stream.local_addr()?;
        let peer_addr = stream.peer_addr()?;
        if let Err(_error) = stream.set_nodelay(true) {
            #[cfg(feature = "tracing")]
            warn!("Failed to set TCP_NODELAY: {}", _error);
        }

        let metadata = TransportMetadata::new("tcp")
            .with_local_address(Address::Tcp(local_addr.to_string()))
            .with_peer_address(Address::Tcp(peer_addr.to_string()));

        #[cfg(feature = "tracing")]
        debug!(transport_id = %metadata.id, %local_addr, %peer_addr, "Created TCP transport");

        Ok(Self { stream, metadata })
    }

    /// Connects to a `host:port` authority.
    #[cfg_attr(feature = "tracing", instrument(skip(addr), fields(address)))]
    pub async fn connect(addr: impl Into<String>) -> Result<Self, TransportError> {
        let addr = addr.into();

        #[cfg(feature = "tracing")]
        {
            tracing::Span::current().record("address", addr.as_str());
            info!("Connecting to TCP endpoint");
        }

        let stream = TcpStream::connect(&addr)
            .await
            .map_err(|source| TransportError::ConnectionFailed {
                address: addr.clone(),
                source,
            })?;

        Self::from_stream(stream).map_err(|source| TransportError::Io { source })
    }

    /// Returns the local socket address.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.stream.local_addr()
    }

    /// Returns the peer socket address.
    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.stream.peer_addr()
    }
}

impl Transport for TcpTransport {
    fn metadata(&self) -> &TransportMetadata {
        &self.metadata
    }
}

impl AsyncRead for TcpTransport {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_read(cx, buf)
    }
}

impl AsyncWrite for TcpTransport {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.stream).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_shutdown(cx)
    }
}

/// A bound TCP listener producing [`TcpTransport`]s.
#[derive(Debug)]
pub struct TcpAcceptor {
    listener: TcpListener,
    address: Address,
}

impl TcpAcceptor {
    /// Binds to a `host:port` authority.
    #[cfg_attr(feature = "tracing", instrument(skip(addr), fields(address)))]
    pub async fn bind(addr: impl Into<String>) -> Result<Self, TransportError> {
        let addr = addr.into();

        #[cfg(feature = "tracing")]
        tracing::Span::current().record("address", addr.as_str());

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| TransportError::BindFailed {
                address: addr.clone(),
                source,
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| TransportError::BindFailed {
                address: addr.clone(),
                source,
            })?;

        #[cfg(feature = "tracing")]
        info!(%local_addr, "TCP listener bound");

        Ok(Self {
            listener,
            address: Address::Tcp(local_addr.to_string()),
        })
    }
}

#[async_trait]
impl Listener for TcpAcceptor {
    async fn accept(&self) -> Result<Box<dyn Transport>, TransportError> {
        let (stream, _peer_addr) = self
            .listener
            .accept()
            .await
            .map_err(|source| TransportError::Io { source })?;

        #[cfg(feature = "tracing")]
        debug!(peer_addr = %_peer_addr, "Accepted TCP connection");

        let transport =
            TcpTransport::from_stream(stream).map_err(|source| TransportError::Io { source })?;
        Ok(Box::new(transport))
    }

    fn local_address(&self) -> &Address {
        &self.address
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_tcp_connect_and_echo() {
        let acceptor = TcpAcceptor::bind("127.0.0.1:0").await.unwrap();
        let Address::Tcp(authority) = acceptor.local_address().clone() else {
            panic!("expected a tcp address");
        };
        assert!(!authority.ends_with(":0"));

        let server = tokio::spawn(async move {
            let mut transport = acceptor.accept().await.unwrap();
            let mut buffer = [0u8; 5];
            transport.read_exact(&mut buffer).await.unwrap();
            transport.write_all(&buffer).await.unwrap();
        });

        let mut client = TcpTransport::connect(authority).await.unwrap();
        assert_eq!(client.metadata().transport_type, "tcp");
        client.write_all(b"hello").await.unwrap();
        let mut buffer = [0u8; 5];
        client.read_exact(&mut buffer).await.unwrap();
        assert_eq!(&buffer, b"hello");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_tcp_connect_refused() {
        // Bind then drop to find a port nothing listens on.
        let acceptor = TcpAcceptor::bind("127.0.0.1:0").await.unwrap();
        let Address::Tcp(authority) = acceptor.local_address().clone() else {
            panic!("expected a tcp address");
        };
        drop(acceptor);

        let error = TcpTransport::connect(authority).await.unwrap_err();
        assert!(matches!(error, TransportError::ConnectionFailed { .. }));
    }
}
