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


//! Core transport traits.

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::transport::{Address, TransportError, TransportMetadata};

/// A bidirectional, ordered, reliable byte stream between two endpoints.
///
/// Framing and message semantics live above this trait; a transport only
/// moves bytes. Implementations must be `Unpin` so they can be split into
/// independent read and write halves.
pub trait Transport: AsyncRead + AsyncWrite + Send + Sync + Unpin + 'static {
    /// Returns metadata about this transport.
    fn metadata(&self) -> &TransportMetadata;
}

impl Transport for Box<dyn Transport> {
    fn metadata(&self) -> &TransportMetadata {
        (**self).metadata()
    }
}

/// Accepts inbound transports on a bound address.
#[async_trait]
pub trait Listener: Send + Sync {
    /// Waits for the next inbound connection.
    async fn accept(&self) -> Result<Box<dyn Transport>, TransportError>;

    /// The address this listener is actually bound to.
    ///
    /// For TCP this reflects the port chosen by the OS when binding port 0.
    fn local_address(&self) -> &Address;
}
