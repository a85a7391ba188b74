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


//! Configuration types for endpoints.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::endpoint::{Authenticator, EndpointError};
use crate::serialization::framing::MAX_FRAME_SIZE;
use crate::transport::MemoryNetwork;
use crate::types::TypeModel;

/// Protocol token both sides must agree on during the handshake.
pub const PROTOCOL_TOKEN: &str = concat!("remoting/", env!("CARGO_PKG_VERSION"));

/// Configuration for a [`crate::RemotingEndpoint`].
///
/// # Examples
///
/// ```rust
/// use remoting::endpoint::{EndpointConfig, SharedSecretAuthenticator};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let config = EndpointConfig::new()
///     .with_name("calculator")
///     .with_handshake_timeout(Duration::from_secs(2))
///     .with_client_authenticator(Arc::new(SharedSecretAuthenticator::new("s3cret")));
/// assert_eq!(config.name, "calculator");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone)]
pub struct EndpointConfig {
    /// Name reported to peers and used in logs.
    pub name: String,

    /// Upper bound for the whole handshake.
    pub handshake_timeout: Duration,

    /// Largest frame accepted or sent, in bytes.
    pub max_frame_size: u32,

    /// Token both sides must present during the handshake.
    pub protocol: String,

    /// Frames that may wait in the outbound queue before senders block.
    pub queue_depth: usize,

    /// Authenticates the client to the server.
    ///
    /// On the accepting side it issues and verifies the challenge; on the
    /// connecting side it answers it.
    pub client_authenticator: Option<Arc<dyn Authenticator>>,

    /// Authenticates the server to the client.
    ///
    /// On the connecting side it issues and verifies the challenge; on the
    /// accepting side it answers it.
    pub server_authenticator: Option<Arc<dyn Authenticator>>,

    /// Network `memory://` addresses are resolved on.
    pub network: MemoryNetwork,

    /// Type model shared with the endpoint's serializer.
    pub type_model: Arc<TypeModel>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            name: format!("endpoint-{}", Uuid::new_v4().simple()),
            handshake_timeout: Duration::from_secs(5),
            max_frame_size: MAX_FRAME_SIZE,
            protocol: PROTOCOL_TOKEN.to_string(),
            queue_depth: 128,
            client_authenticator: None,
            server_authenticator: None,
            network: MemoryNetwork::global(),
            type_model: Arc::new(TypeModel::new()),
        }
    }
}

impl std::fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("name", &self.name)
            .field("handshake_timeout", &self.handshake_timeout)
            .field("max_frame_size", &self.max_frame_size)
            .field("protocol", &self.protocol)
            .field("queue_depth", &self.queue_depth)
            .field("client_authenticator", &self.client_authenticator.is_some())
            .field("server_authenticator", &self.server_authenticator.is_some())
            .field("network", &self.network)
            .finish_non_exhaustive()
    }
}

impl EndpointConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the endpoint name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the handshake timeout.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Sets the maximum frame size.
    pub fn with_max_frame_size(mut self, size: u32) -> Self {
        self.max_frame_size = size;
        self
    }

    /// Sets the protocol token.
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    /// Sets the outbound queue depth.
    pub fn with_queue_depth(mut self, depth: usize) -> Self {
        self.queue_depth = depth;
        self
    }

    /// Sets the authenticator proving the client's identity.
    pub fn with_client_authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.client_authenticator = Some(authenticator);
        self
    }

    /// Sets the authenticator proving the server's identity.
    pub fn with_server_authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.server_authenticator = Some(authenticator);
        self
    }

    /// Sets the memory network.
    pub fn with_network(mut self, network: MemoryNetwork) -> Self {
        self.network = network;
        self
    }

    /// Shares a type model with other endpoints.
    pub fn with_type_model(mut self, type_model: Arc<TypeModel>) -> Self {
        self.type_model = type_model;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), EndpointError> {
        let invalid = |reason: &str| {
            Err(EndpointError::InvalidConfiguration {
                reason: reason.to_string(),
            })
        };
        if self.queue_depth == 0 {
            return invalid("queue_depth must be greater than 0");
        }
        if self.max_frame_size == 0 {
            return invalid("max_frame_size must be greater than 0");
        }
        if self.handshake_timeout.is_zero() {
            return invalid("handshake_timeout must be greater than 0");
        }
        if self.protocol.is_empty() {
            return invalid("protocol must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EndpointConfig::default();
        assert_eq!(config.handshake_timeout, Duration::from_secs(5));
        assert_eq!(config.max_frame_size, 16 * 1024 * 1024);
        assert_eq!(config.protocol, PROTOCOL_TOKEN);
        assert!(config.client_authenticator.is_none());
        assert!(config.name.starts_with("endpoint-"));
    }

    #[test]
    fn test_validate_zero_values() {
        assert!(EndpointConfig::new().with_queue_depth(0).validate().is_err());
        assert!(EndpointConfig::new().with_max_frame_size(0).validate().is_err());
        assert!(
            EndpointConfig::new()
                .with_handshake_timeout(Duration::ZERO)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_debug_hides_authenticators() {
        let config = EndpointConfig::new().with_client_authenticator(Arc::new(
            crate::endpoint::SharedSecretAuthenticator::new("hunter2"),
        ));
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("client_authenticator: true"));
    }
}
