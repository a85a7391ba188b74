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


//! Error types for the endpoint layer.

use std::fmt;

use crate::grain::ObjectId;
use crate::transport::TransportError;

/// Errors raised while binding, connecting, or managing the object tables of
/// an endpoint.
#[derive(Debug)]
pub enum EndpointError {
    /// The underlying transport failed.
    Transport(TransportError),

    /// Nothing is listening at the address, or it could not be reached in
    /// time.
    NoSuchEndpoint {
        /// The address that was dialled.
        address: String,
        /// Why the endpoint could not be reached.
        reason: String,
    },

    /// The handshake failed or timed out.
    HandshakeFailed {
        /// Description of the failure.
        reason: String,
    },

    /// The peer requires credentials that this endpoint did not provide.
    AuthenticationRequired {
        /// Description of the failure.
        reason: String,
    },

    /// Credentials were exchanged but rejected.
    AuthenticationFailed {
        /// Description of the failure.
        reason: String,
    },

    /// The endpoint already has a connection.
    AlreadyConnected,

    /// The endpoint already has a listener.
    AlreadyBound {
        /// The address currently bound.
        address: String,
    },

    /// An endpoint cannot connect to its own listener.
    ConnectToSelf {
        /// The endpoint's own address.
        address: String,
    },

    /// A timeout of zero was given.
    InvalidTimeout,

    /// A servant or proxy is already registered under this id.
    DuplicateObjectId {
        /// The id in use.
        object_id: ObjectId,
    },

    /// The id is registered for another interface.
    InterfaceMismatch {
        /// The id that was looked up.
        object_id: ObjectId,
        /// Interface requested by the caller.
        expected: String,
        /// Interface of the registered object.
        actual: String,
    },

    /// The endpoint has been disposed.
    Disposed,

    /// Configuration values are unusable.
    InvalidConfiguration {
        /// What is wrong.
        reason: String,
    },

    /// A handshake message could not be (de)serialized.
    Serialization(String),
}

impl EndpointError {
    /// Returns `true` for failures establishing or keeping a connection.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Transport(_)
                | Self::NoSuchEndpoint { .. }
                | Self::HandshakeFailed { .. }
                | Self::AuthenticationRequired { .. }
                | Self::AuthenticationFailed { .. }
        )
    }

    /// Returns `true` if retrying the same operation may succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Transport(error) => error.is_recoverable(),
            Self::NoSuchEndpoint { .. } | Self::HandshakeFailed { .. } => true,
            _ => false,
        }
    }
}

impl fmt::Display for EndpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(err) => write!(f, "transport error: {}", err),
            Self::NoSuchEndpoint { address, reason } => {
                write!(f, "no endpoint at '{}': {}", address, reason)
            }
            Self::HandshakeFailed { reason } => write!(f, "handshake failed: {}", reason),
            Self::AuthenticationRequired { reason } => {
                write!(f, "authentication required: {}", reason)
            }
            Self::AuthenticationFailed { reason } => {
                write!(f, "authentication failed: {}", reason)
            }
            Self::AlreadyConnected => write!(f, "endpoint is already connected"),
            Self::AlreadyBound { address } => {
                write!(f, "endpoint is already bound to '{}'", address)
            }
            Self::ConnectToSelf { address } => {
                write!(f, "an endpoint cannot connect to itself ('{}')", address)
            }
            Self::InvalidTimeout => write!(f, "timeout must be greater than zero"),
            Self::DuplicateObjectId { object_id } => {
                write!(f, "object id {} is already in use", object_id)
            }
            Self::InterfaceMismatch {
                object_id,
                expected,
                actual,
            } => write!(
                f,
                "object {} implements '{}', not '{}'",
                object_id, actual, expected
            ),
            Self::Disposed => write!(f, "endpoint has been disposed"),
            Self::InvalidConfiguration { reason } => {
                write!(f, "invalid configuration: {}", reason)
            }
            Self::Serialization(err) => write!(f, "serialization error: {}", err),
        }
    }
}

impl std::error::Error for EndpointError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TransportError> for EndpointError {
    fn from(err: TransportError) -> Self {
        Self::Transport(err)
    }
}

impl From<serde_json::Error> for EndpointError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EndpointError::ConnectToSelf {
            address: "memory://a".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "an endpoint cannot connect to itself ('memory://a')"
        );

        let err = EndpointError::DuplicateObjectId {
            object_id: ObjectId::new(4),
        };
        assert_eq!(err.to_string(), "object id #4 is already in use");
    }

    #[test]
    fn test_classification() {
        let err = EndpointError::AuthenticationFailed {
            reason: "bad secret".to_string(),
        };
        assert!(err.is_connection_error());
        assert!(!err.is_recoverable());

        let err: EndpointError = TransportError::ConnectionLost {
            reason: "reset".to_string(),
            source: None,
        }
        .into();
        assert!(err.is_connection_error());
        assert!(err.is_recoverable());

        assert!(!EndpointError::Disposed.is_connection_error());
    }
}
