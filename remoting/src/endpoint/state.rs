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


//! Connection state of an endpoint.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Externally observable state of a [`crate::RemotingEndpoint`].
///
/// ```text
/// Disconnected -> Connecting -> Handshaking -> Connected -> Disconnected
///                                                       \-> Disposed
/// ```
///
/// A failed connect attempt falls back to `Disconnected`. `Disposed` is
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointState {
    /// No connection; connect and bind are allowed.
    Disconnected,
    /// A transport is being opened.
    Connecting,
    /// The transport is open and the handshake is running.
    Handshaking,
    /// Calls can be made.
    Connected,
    /// The endpoint has been disposed and can no longer be used.
    Disposed,
}

impl EndpointState {
    /// Returns `true` when calls can be made.
    pub fn is_connected(self) -> bool {
        self == EndpointState::Connected
    }
}

impl fmt::Display for EndpointState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EndpointState::Disconnected => "disconnected",
            EndpointState::Connecting => "connecting",
            EndpointState::Handshaking => "handshaking",
            EndpointState::Connected => "connected",
            EndpointState::Disposed => "disposed",
        };
        f.write_str(name)
    }
}

/// Token assigned by the accepting side to one successful handshake.
///
/// Each reconnect yields a fresh id, so stale notifications about an older
/// connection can be told apart from the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generates a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_ids_differ() {
        assert_ne!(ConnectionId::new(), ConnectionId::new());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(EndpointState::Handshaking.to_string(), "handshaking");
        assert!(EndpointState::Connected.is_connected());
        assert!(!EndpointState::Disposed.is_connected());
    }
}
