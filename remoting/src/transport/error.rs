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


//! Failures of the byte streams underneath a connection.
//!
//! These sit at the bottom of the error hierarchy. The endpoint wraps them in
//! [`crate::endpoint::EndpointError`], which decides whether a failed
//! `connect` is worth another attempt.

use std::io;

use thiserror::Error;

/// Errors raised while binding, dialling or using a transport.
///
/// ```rust
/// use remoting::transport::TransportError;
/// use std::io;
///
/// let refused = TransportError::ConnectionFailed {
///     address: "memory://calculator".to_string(),
///     source: io::Error::new(io::ErrorKind::ConnectionRefused, "nobody is listening"),
/// };
/// assert!(refused.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum TransportError {
    /// Nobody accepted the connection.
    #[error("failed to connect to {address}: {source}")]
    ConnectionFailed {
        /// Address that was dialled.
        address: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// An established stream went away.
    #[error("connection lost: {reason}")]
    ConnectionLost {
        /// Why the stream ended.
        reason: String,
        /// Underlying I/O error, if there was one.
        #[source]
        source: Option<io::Error>,
    },

    /// Reading a frame failed.
    #[error("read failed: {source}")]
    ReadFailed {
        #[source]
        #[allow(missing_docs)]
        source: io::Error,
    },

    /// Writing a frame failed.
    #[error("write failed: {source}")]
    WriteFailed {
        #[source]
        #[allow(missing_docs)]
        source: io::Error,
    },

    /// The address is neither `tcp://` nor `memory://`, or is malformed.
    #[error("invalid address {address}: {reason}")]
    InvalidAddress {
        /// Rejected address text.
        address: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A length prefix announced more than the endpoint accepts.
    #[error("frame of {size} bytes exceeds maximum of {max_size} bytes")]
    FrameTooLarge {
        /// Announced or actual frame length.
        size: usize,
        /// Configured limit.
        max_size: u32,
    },

    /// The listener was dropped.
    #[error("transport is closed")]
    Closed,

    /// The address is taken or cannot be listened on.
    #[error("failed to bind to {address}: {source}")]
    BindFailed {
        /// Address that could not be bound.
        address: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Any other I/O failure.
    #[error("I/O error: {source}")]
    Io {
        #[source]
        #[allow(missing_docs)]
        source: io::Error,
    },
}

impl TransportError {
    /// Whether dialling again later might succeed.
    ///
    /// A refused or dropped connection is recoverable since the peer may
    /// simply not be up yet. Bad addresses, oversized frames and taken
    /// addresses are not.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::ConnectionFailed { .. } | Self::ConnectionLost { .. } => true,
            Self::ReadFailed { source } | Self::WriteFailed { source } | Self::Io { source } => {
                matches!(
                    source.kind(),
                    io::ErrorKind::Interrupted
                        | io::ErrorKind::TimedOut
                        | io::ErrorKind::ConnectionReset
                        | io::ErrorKind::ConnectionAborted
                )
            }
            Self::InvalidAddress { .. }
            | Self::FrameTooLarge { .. }
            | Self::Closed
            | Self::BindFailed { .. } => false,
        }
    }
}

impl From<io::Error> for TransportError {
    fn from(source: io::Error) -> Self {
        Self::Io { source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refused_connection_is_recoverable() {
        let error = TransportError::ConnectionFailed {
            address: "tcp://127.0.0.1:1".to_string(),
            source: io::Error::from(io::ErrorKind::ConnectionRefused),
        };
        assert!(error.is_recoverable());
    }

    #[test]
    fn test_oversized_frame_is_fatal() {
        let error = TransportError::FrameTooLarge {
            size: 10,
            max_size: 5,
        };
        assert!(!error.is_recoverable());
        assert_eq!(
            error.to_string(),
            "frame of 10 bytes exceeds maximum of 5 bytes"
        );
    }

    #[test]
    fn test_reset_read_is_recoverable() {
        let error = TransportError::ReadFailed {
            source: io::Error::from(io::ErrorKind::ConnectionReset),
        };
        assert!(error.is_recoverable());
        let error = TransportError::from(io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(!error.is_recoverable());
    }
}
