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


//! Byte-stream transports.
//!
//! This module provides the lowest layer of the stack: reliable, ordered,
//! bidirectional byte streams between two endpoints. Everything above it
//! (framing, handshake, RPC correlation) treats a transport as an opaque
//! stream via the [`Transport`] trait.
//!
//! # Available transports
//!
//! - [`TcpTransport`] / [`TcpAcceptor`]: TCP sockets, addressed as
//!   `tcp://host:port`.
//! - [`MemoryTransport`] / [`MemoryListener`]: in-process connections on a
//!   [`MemoryNetwork`], addressed as `memory://name`. Used for tests and for
//!   endpoints that share a process.
//!
//! # Example
//!
//! ```rust
//! use remoting::transport::{Address, Listener, MemoryNetwork};
//! use tokio::io::{AsyncReadExt, AsyncWriteExt};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let network = MemoryNetwork::new();
//! let address: Address = "memory://service".parse()?;
//! let listener = address.bind(&network).await?;
//!
//! let mut client = address.connect(&network).await?;
//! let mut server = listener.accept().await?;
//!
//! client.write_all(b"hi").await?;
//! let mut buffer = [0u8; 2];
//! server.read_exact(&mut buffer).await?;
//! assert_eq!(&buffer, b"hi");
//! # Ok(())
//! # }
//! ```

mod address;
mod error;
mod memory;
mod tcp;
mod traits;
mod types;

pub use address::Address;
pub use error::TransportError;
pub use memory::{DEFAULT_BUFFER_SIZE, MemoryListener, MemoryNetwork, MemoryTransport};
pub use tcp::{TcpAcceptor, TcpTransport};
pub use traits::{Listener, Transport};
pub use types::{TransportId, TransportMetadata};
