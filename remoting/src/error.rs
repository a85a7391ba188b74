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


//! Top-level error type for remoting.
//!
//! [`RemotingError`] is what every remote call returns on failure. Its
//! variants fall into four groups that callers handle differently:
//!
//! 1. **Protocol errors**: the call could not be encoded, decoded or routed
//!    ([`RemotingError::is_protocol_error`]),
//! 2. **Faults**: the subject's own code failed ([`RemotingError::is_fault`]),
//! 3. **Contract violations**: the subject broke a rule of the runtime, such
//!    as returning a task that was never started
//!    ([`RemotingError::is_contract_violation`]),
//! 4. **Connection errors**: the connection is gone or was never there
//!    ([`RemotingError::is_connection_error`]).
//!
//! Only the affected call fails; the endpoint stays usable.
//!
//! # Examples
//!
//! ```rust
//! use remoting::{ObjectId, RemotingError};
//!
//! let error = RemotingError::NotSupported {
//!     interface: "Jobs".to_string(),
//!     method: "run".to_string(),
//!     object_id: ObjectId::new(3),
//! };
//! assert!(error.is_contract_violation());
//! assert_eq!(
//!     error.to_string(),
//!     "Jobs.run of servant #3 returned a non-started task - this is not supported"
//! );
//! ```

use std::error::Error as StdError;
use std::fmt;

use crate::endpoint::EndpointError;
use crate::grain::ObjectId;
use crate::serialization::{DecodeError, EncodeError, Fault, RegistrationError};
use crate::transport::TransportError;

/// Result alias used throughout the crate.
pub type Result<T, E = RemotingError> = std::result::Result<T, E>;

/// Error returned by remote calls and endpoint operations.
#[derive(Debug)]
pub enum RemotingError {
    /// Arguments or results could not be encoded locally.
    Encode(EncodeError),

    /// A response could not be decoded locally.
    Decode(DecodeError),

    /// A type used by the call has a contradictory description.
    Registration(RegistrationError),

    /// The peer could not decode or encode its side of the call.
    Protocol {
        /// The peer's description of the problem.
        message: String,
    },

    /// The servant does not implement the requested method.
    UnknownMethod {
        /// Interface named by the call.
        interface: String,
        /// Method named by the call.
        method: String,
    },

    /// The object exists but implements another interface.
    TypeMismatch {
        /// Interface the caller expected.
        expected: String,
        /// Interface the object actually implements.
        actual: String,
    },

    /// No servant or proxy is registered under the object id.
    NoSuchObject {
        /// The unknown object id.
        object_id: ObjectId,
    },

    /// The subject returned a task that had not been started.
    NotSupported {
        /// Interface of the servant.
        interface: String,
        /// Offending method.
        method: String,
        /// Object id of the servant.
        object_id: ObjectId,
    },

    /// The subject's code failed.
    Fault(Fault),

    /// The connection dropped while the call was in flight.
    ConnectionLost {
        /// Why the connection was lost.
        reason: String,
    },

    /// There is no connection to send the call on.
    NotConnected,

    /// An endpoint operation failed.
    Endpoint(EndpointError),

    /// An invariant of the runtime itself was broken.
    Internal {
        /// Description of the failure.
        message: String,
    },
}

impl RemotingError {
    /// Wraps an application error whose value should reach the caller.
    pub fn fault<E: StdError + crate::types::Remotable>(error: E) -> Self {
        Self::Fault(Fault::new(error))
    }

    /// Returns `true` for failures of the subject's own code.
    #[must_use]
    pub const fn is_fault(&self) -> bool {
        matches!(self, Self::Fault(_))
    }

    /// Returns `true` for encoding, decoding and routing failures.
    #[must_use]
    pub const fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::Encode(_)
                | Self::Decode(_)
                | Self::Registration(_)
                | Self::Protocol { .. }
                | Self::UnknownMethod { .. }
                | Self::TypeMismatch { .. }
                | Self::NoSuchObject { .. }
        )
    }

    /// Returns `true` when the subject broke a rule of the runtime.
    #[must_use]
    pub const fn is_contract_violation(&self) -> bool {
        matches!(self, Self::NotSupported { .. })
    }

    /// Returns `true` when the connection is missing or dropped.
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        match self {
            Self::ConnectionLost { .. } | Self::NotConnected => true,
            Self::Endpoint(error) => error.is_connection_error(),
            _ => false,
        }
    }

    /// Returns `true` if retrying after a reconnect may succeed.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::ConnectionLost { .. } | Self::NotConnected => true,
            Self::Endpoint(error) => error.is_recoverable(),
            _ => false,
        }
    }

    /// The fault, if this is one.
    pub fn as_fault(&self) -> Option<&Fault> {
        match self {
            Self::Fault(fault) => Some(fault),
            _ => None,
        }
    }
}

impl fmt::Display for RemotingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encode(error) => write!(f, "encode error: {error}"),
            Self::Decode(error) => write!(f, "decode error: {error}"),
            Self::Registration(error) => write!(f, "registration error: {error}"),
            Self::Protocol { message } => write!(f, "remote protocol error: {message}"),
            Self::UnknownMethod { interface, method } => {
                write!(f, "unknown method {interface}.{method}")
            }
            Self::TypeMismatch { expected, actual } => {
                write!(f, "interface type mismatch: expected {expected}, found {actual}")
            }
            Self::NoSuchObject { object_id } => write!(f, "no object with id {object_id}"),
            Self::NotSupported {
                interface,
                method,
                object_id,
            } => write!(
                f,
                "{interface}.{method} of servant #{} returned a non-started task - this is not supported",
                object_id.as_u64()
            ),
            Self::Fault(fault) => write!(f, "remote fault: {fault}"),
            Self::ConnectionLost { reason } => write!(f, "connection lost: {reason}"),
            Self::NotConnected => write!(f, "endpoint is not connected"),
            Self::Endpoint(error) => write!(f, "endpoint error: {error}"),
            Self::Internal { message } => write!(f, "internal error: {message}"),
        }
    }
}

impl StdError for RemotingError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Encode(error) => Some(error),
            Self::Decode(error) => Some(error),
            Self::Registration(error) => Some(error),
            Self::Fault(fault) => Some(fault),
            Self::Endpoint(error) => Some(error),
            _ => None,
        }
    }
}

impl From<EncodeError> for RemotingError {
    fn from(error: EncodeError) -> Self {
        Self::Encode(error)
    }
}

impl From<DecodeError> for RemotingError {
    fn from(error: DecodeError) -> Self {
        Self::Decode(error)
    }
}

impl From<RegistrationError> for RemotingError {
    fn from(error: RegistrationError) -> Self {
        Self::Registration(error)
    }
}

impl From<Fault> for RemotingError {
    fn from(fault: Fault) -> Self {
        Self::Fault(fault)
    }
}

impl From<EndpointError> for RemotingError {
    fn from(error: EndpointError) -> Self {
        Self::Endpoint(error)
    }
}

impl From<TransportError> for RemotingError {
    fn from(error: TransportError) -> Self {
        Self::Endpoint(EndpointError::Transport(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let fault = RemotingError::Fault(Fault::opaque("E", "boom"));
        assert!(fault.is_fault());
        assert!(!fault.is_protocol_error());

        let decode = RemotingError::from(DecodeError::InvalidUtf8);
        assert!(decode.is_protocol_error());
        assert!(!decode.is_connection_error());

        let lost = RemotingError::ConnectionLost {
            reason: "reset".to_string(),
        };
        assert!(lost.is_connection_error());
        assert!(lost.is_recoverable());
        assert!(!lost.is_fault());
    }

    #[test]
    fn test_display() {
        let error = RemotingError::UnknownMethod {
            interface: "Calculator".to_string(),
            method: "divide".to_string(),
        };
        assert_eq!(error.to_string(), "unknown method Calculator.divide");
        assert_eq!(
            RemotingError::NoSuchObject {
                object_id: ObjectId::new(9)
            }
            .to_string(),
            "no object with id #9"
        );
    }

    #[test]
    fn test_error_source() {
        let error = RemotingError::from(EncodeError::TooLarge { length: 1 });
        assert!(error.source().is_some());
        assert!(RemotingError::NotConnected.source().is_none());
    }
}
