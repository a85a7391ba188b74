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


//! Identity and metadata shared by all transports.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::transport::Address;

static NEXT_TRANSPORT_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a transport within this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransportId(u64);

impl TransportId {
    /// Creates a new transport ID.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocates the next process-unique transport ID.
    pub fn next() -> Self {
        Self(NEXT_TRANSPORT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Transport({})", self.0)
    }
}

/// Metadata describing an open transport.
#[derive(Debug, Clone)]
pub struct TransportMetadata {
    /// Unique identifier for this transport
    pub id: TransportId,

    /// Local address of the connection, if available
    pub local_address: Option<Address>,

    /// Remote peer address, if available
    pub peer_address: Option<Address>,

    /// Transport type ("tcp" or "memory")
    pub transport_type: &'static str,
}

impl TransportMetadata {
    /// Creates new transport metadata with a fresh ID.
    pub fn new(transport_type: &'static str) -> Self {
        Self {
            id: TransportId::next(),
            local_address: None,
            peer_address: None,
            transport_type,
        }
    }

    /// Sets the local address.
    pub fn with_local_address(mut self, address: Address) -> Self {
        self.local_address = Some(address);
        self
    }

    /// Sets the peer address.
    pub fn with_peer_address(mut self, address: Address) -> Self {
        self.peer_address = Some(address);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_ids_are_unique() {
        let a = TransportId::next();
        let b = TransportId::next();
        assert_ne!(a, b);
        assert_eq!(TransportId::new(7).to_string(), "Transport(7)");
    }

    #[test]
    fn test_metadata_builder() {
        let metadata = TransportMetadata::new("memory")
            .with_local_address(Address::memory("a"))
            .with_peer_address(Address::memory("b"));
        assert_eq!(metadata.transport_type, "memory");
        assert_eq!(metadata.local_address, Some(Address::memory("a")));
        assert_eq!(metadata.peer_address, Some(Address::memory("b")));
    }
}
