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


//! In-process memory transport.
//!
//! A [`MemoryNetwork`] is a registry of named listeners living entirely in
//! process memory. It plays the role a named pipe namespace plays on a host:
//! endpoints bind `memory://name` and peers connect to that name. Each
//! connection is a pair of [`tokio::io::duplex`] streams, so writes apply
//! backpressure once the buffer is full and dropping one side is observed as
//! EOF by the other.

use std::collections::HashMap;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};
use std::task::{Context, Poll};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};
use tokio::sync::mpsc;

use crate::transport::{Address, Listener, Transport, TransportError, TransportMetadata};

#[cfg(feature = "tracing")]
use tracing::debug;

/// Default per-direction buffer of a memory connection.
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Pending connections a memory listener queues before `connect` waits.
const ACCEPT_BACKLOG: usize = 16;

/// One side of an in-memory connection.
#[derive(Debug)]
pub struct MemoryTransport {
    stream: DuplexStream,
    metadata: TransportMetadata,
}

impl MemoryTransport {
    /// Creates a connected pair of memory transports.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use remoting::transport::MemoryTransport;
    /// use tokio::io::{AsyncReadExt, AsyncWriteExt};
    ///
    /// # #[tokio::main]
    /// # async fn main() {
    /// let (mut a, mut b) = MemoryTransport::pair(1024);
    /// a.write_all(b"ping").await.unwrap();
    /// let mut buffer = [0u8; 4];
    /// b.read_exact(&mut buffer).await.unwrap();
    /// assert_eq!(&buffer, b"ping");
    /// # }
    /// ```
    pub fn pair(buffer_size: usize) -> (Self, Self) {
        let (a, b) = tokio::io::duplex(buffer_size);
        (
            Self {
                stream: a,
                metadata: TransportMetadata::new("memory"),
            },
            Self {
                stream: b,
                metadata: TransportMetadata::new("memory"),
            },
        )
    }

    fn with_addresses(mut self, local: Option<Address>, peer: Option<Address>) -> Self {
        self.metadata.local_address = local;
        self.metadata.peer_address = peer;
        self
    }
}

impl Transport for MemoryTransport {
    fn metadata(&self) -> &TransportMetadata {
        &self.metadata
    }
}

impl AsyncRead for MemoryTransport {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_read(cx, buf)
    }
}

impl AsyncWrite for MemoryTransport {
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

type Slots = HashMap<String, mpsc::Sender<MemoryTransport>>;

/// A namespace of in-process listeners.
///
/// Cloning a network yields another handle to the same namespace.
#[derive(Clone)]
pub struct MemoryNetwork {
    slots: Arc<Mutex<Slots>>,
    buffer_size: usize,
}

impl MemoryNetwork {
    /// Creates a new, empty network.
    pub fn new() -> Self {
        Self::with_buffer_size(DEFAULT_BUFFER_SIZE)
    }

    /// Creates a new, empty network with a custom per-connection buffer.
    pub fn with_buffer_size(buffer_size: usize) -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
            buffer_size,
        }
    }

    /// The process-wide network used when no other is configured.
    pub fn global() -> Self {
        static GLOBAL: OnceLock<MemoryNetwork> = OnceLock::new();
        GLOBAL.get_or_init(MemoryNetwork::new).clone()
    }

    /// Binds a listener to `name`.
    ///
    /// Fails with `BindFailed` if the name is taken by a live listener.
    pub fn bind(&self, name: &str) -> Result<MemoryListener, TransportError> {
        let mut slots = self.slots.lock();
        if slots.get(name).is_some_and(|sender| !sender.is_closed()) {
            return Err(TransportError::BindFailed {
                address: Address::memory(name).to_string(),
                source: io::Error::new(io::ErrorKind::AddrInUse, "name is already bound"),
            });
        }
        let (sender, receiver) = mpsc::channel(ACCEPT_BACKLOG);
        slots.insert(name.to_string(), sender);

        #[cfg(feature = "tracing")]
        debug!(name, "Memory listener bound");

        Ok(MemoryListener {
            address: Address::memory(name),
            name: name.to_string(),
            receiver: tokio::sync::Mutex::new(receiver),
            slots: Arc::clone(&self.slots),
        })
    }

    /// Connects to the listener bound at `name`.
    pub async fn connect(&self, name: &str) -> Result<MemoryTransport, TransportError> {
        let refused = || TransportError::ConnectionFailed {
            address: Address::memory(name).to_string(),
            source: io::Error::new(io::ErrorKind::ConnectionRefused, "no listener bound"),
        };
        let sender = self.slots.lock().get(name).cloned().ok_or_else(refused)?;

        let (client, server) = MemoryTransport::pair(self.buffer_size);
        let client = client.with_addresses(None, Some(Address::memory(name)));
        let server = server.with_addresses(Some(Address::memory(name)), None);
        sender.send(server).await.map_err(|_| refused())?;
        Ok(client)
    }

    /// Returns `true` if a live listener is bound at `name`.
    pub fn is_bound(&self, name: &str) -> bool {
        self.slots
            .lock()
            .get(name)
            .is_some_and(|sender| !sender.is_closed())
    }
}

impl Default for MemoryNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryNetwork")
            .field("listeners", &self.slots.lock().len())
            .field("buffer_size", &self.buffer_size)
            .finish()
    }
}

/// A listener bound on a [`MemoryNetwork`]. Dropping it frees the name.
pub struct MemoryListener {
    address: Address,
    name: String,
    receiver: tokio::sync::Mutex<mpsc::Receiver<MemoryTransport>>,
    slots: Arc<Mutex<Slots>>,
}

#[async_trait]
impl Listener for MemoryListener {
    async fn accept(&self) -> Result<Box<dyn Transport>, TransportError> {
        let transport = self
            .receiver
            .lock()
            .await
            .recv()
            .await
            .ok_or(TransportError::Closed)?;
        Ok(Box::new(transport))
    }

    fn local_address(&self) -> &Address {
        &self.address
    }
}

impl Drop for MemoryListener {
    fn drop(&mut self) {
        self.receiver.get_mut().close();
        let mut slots = self.slots.lock();
        // Only remove our own registration; the name may have been rebound.
        if slots.get(&self.name).is_some_and(|sender| sender.is_closed()) {
            slots.remove(&self.name);
        }
    }
}

impl std::fmt::Debug for MemoryListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryListener")
            .field("address", &self.address)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_bind_connect_accept() {
        let network = MemoryNetwork::new();
        let listener = network.bind("echo").unwrap();
        assert!(network.is_bound("echo"));

        let mut client = network.connect("echo").await.unwrap();
        let mut server = listener.accept().await.unwrap();
        assert_eq!(
            client.metadata().peer_address,
            Some(Address::memory("echo"))
        );

        client.write_all(b"abc").await.unwrap();
        let mut buffer = [0u8; 3];
        server.read_exact(&mut buffer).await.unwrap();
        assert_eq!(&buffer, b"abc");
    }

    #[tokio::test]
    async fn test_double_bind_fails() {
        let network = MemoryNetwork::new();
        let _listener = network.bind("taken").unwrap();
        assert!(matches!(
            network.bind("taken"),
            Err(TransportError::BindFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_rebind_after_drop() {
        let network = MemoryNetwork::new();
        drop(network.bind("slot").unwrap());
        assert!(!network.is_bound("slot"));
        let _listener = network.bind("slot").unwrap();
    }

    #[tokio::test]
    async fn test_connect_without_listener_is_refused() {
        let network = MemoryNetwork::new();
        let error = network.connect("nobody").await.unwrap_err();
        assert!(matches!(error, TransportError::ConnectionFailed { .. }));
    }

    #[tokio::test]
    async fn test_drop_is_eof() {
        let (mut a, b) = MemoryTransport::pair(16);
        drop(b);
        let mut buffer = Vec::new();
        assert_eq!(a.read_to_end(&mut buffer).await.unwrap(), 0);
    }
}
