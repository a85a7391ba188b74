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


//! Connection handshake.
//!
//! Messages are JSON documents behind the usual 4-byte big-endian length
//! prefix. The connecting side (client) drives the exchange:
//!
//! ```text
//! client                                   server
//!   | Hello { protocol, name, challenge? }   |
//!   |--------------------------------------->|
//!   |  Challenge { name, challenge?, resp? } |   or Outcome(error)
//!   |<---------------------------------------|
//!   | Response { response? }                 |
//!   |--------------------------------------->|
//!   |        Outcome(Ok { connection_id })   |
//!   |<---------------------------------------|
//! ```
//!
//! `Hello.challenge` is issued by the client's server authenticator and
//! answered by the server's; `Challenge.challenge` is issued by the server's
//! client authenticator and answered by the client's.

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::endpoint::{ConnectionId, EndpointConfig, EndpointError};
use crate::serialization::framing::{read_frame, write_frame};
use crate::transport::TransportError;

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

/// One step of the handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandshakeMessage {
    /// First message, sent by the client.
    Hello {
        /// Protocol token; must match the server's.
        protocol: String,
        /// Client endpoint name.
        name: String,
        /// Challenge the server must answer, if the client authenticates it.
        challenge: Option<String>,
    },

    /// Server reply to `Hello`.
    Challenge {
        /// Server endpoint name.
        name: String,
        /// Challenge the client must answer, if the server authenticates it.
        challenge: Option<String>,
        /// Server's answer to the client's challenge.
        response: Option<String>,
    },

    /// Client answer to the server's challenge.
    Response {
        /// The answer, if the client has an authenticator.
        response: Option<String>,
    },

    /// Final message, sent by the server.
    Outcome(HandshakeOutcome),
}

/// Final result of a handshake as decided by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandshakeOutcome {
    /// The connection is established.
    Ok {
        /// Id assigned to the new connection.
        connection_id: ConnectionId,
    },
    /// Protocol mismatch, busy server, or an out-of-order message.
    HandshakeError {
        /// Description of the failure.
        message: String,
    },
    /// The client did not answer a required challenge.
    AuthenticationRequired {
        /// Description of the failure.
        message: String,
    },
    /// The client's answer was wrong.
    AuthenticationFailed {
        /// Description of the failure.
        message: String,
    },
}

impl HandshakeOutcome {
    fn into_error(self) -> Option<EndpointError> {
        match self {
            HandshakeOutcome::Ok { .. } => None,
            HandshakeOutcome::HandshakeError { message } => {
                Some(EndpointError::HandshakeFailed { reason: message })
            }
            HandshakeOutcome::AuthenticationRequired { message } => {
                Some(EndpointError::AuthenticationRequired { reason: message })
            }
            HandshakeOutcome::AuthenticationFailed { message } => {
                Some(EndpointError::AuthenticationFailed { reason: message })
            }
        }
    }
}

/// Result of a successful handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    /// Id of the new connection.
    pub connection_id: ConnectionId,
    /// Name the peer reported.
    pub peer_name: String,
}

async fn send<T>(
    transport: &mut T,
    message: &HandshakeMessage,
    max_size: u32,
) -> Result<(), EndpointError>
where
    T: AsyncWrite + Unpin + ?Sized,
{
    let bytes = serde_json::to_vec(message)?;
    write_frame(transport, &bytes, max_size).await?;
    Ok(())
}

async fn receive<T>(transport: &mut T, max_size: u32) -> Result<HandshakeMessage, EndpointError>
where
    T: AsyncRead + Unpin + ?Sized,
{
    let bytes = read_frame(transport, max_size)
        .await?
        .ok_or_else(|| TransportError::ConnectionLost {
            reason: "peer closed the connection during the handshake".to_string(),
            source: None,
        })?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn unexpected(message: &HandshakeMessage) -> EndpointError {
    EndpointError::HandshakeFailed {
        reason: format!("unexpected handshake message {message:?}"),
    }
}

/// Runs the client side of the handshake.
pub async fn outgoing<T>(transport: &mut T, config: &EndpointConfig) -> Result<Handshake, EndpointError>
where
    T: AsyncRead + AsyncWrite + Unpin + ?Sized,
{
    let max_size = config.max_frame_size;
    let our_challenge = config
        .server_authenticator
        .as_ref()
        .map(|authenticator| authenticator.challenge());

    send(
        transport,
        &HandshakeMessage::Hello {
            protocol: config.protocol.clone(),
            name: config.name.clone(),
            challenge: our_challenge.clone(),
        },
        max_size,
    )
    .await?;

    let (peer_name, their_challenge) = match receive(transport, max_size).await? {
        HandshakeMessage::Challenge {
            name,
            challenge,
            response,
        } => {
            if let (Some(authenticator), Some(challenge)) =
                (&config.server_authenticator, &our_challenge)
            {
                let Some(response) = response else {
                    return Err(EndpointError::AuthenticationFailed {
                        reason: format!("server '{name}' did not authenticate itself"),
                    });
                };
                if !authenticator.verify(challenge, &response) {
                    return Err(EndpointError::AuthenticationFailed {
                        reason: format!("server '{name}' failed authentication"),
                    });
                }
            }
            (name, challenge)
        }
        HandshakeMessage::Outcome(outcome) => {
            return Err(outcome.into_error().unwrap_or_else(|| EndpointError::HandshakeFailed {
                reason: "server accepted before authentication".to_string(),
            }));
        }
        other => return Err(unexpected(&other)),
    };

    let response = match (&their_challenge, &config.client_authenticator) {
        (Some(challenge), Some(authenticator)) => Some(authenticator.respond(challenge)),
        _ => None,
    };
    send(transport, &HandshakeMessage::Response { response }, max_size).await?;

    match receive(transport, max_size).await? {
        HandshakeMessage::Outcome(HandshakeOutcome::Ok { connection_id }) => {
            #[cfg(feature = "tracing")]
            debug!(%connection_id, peer = %peer_name, "Outgoing handshake complete");
            Ok(Handshake {
                connection_id,
                peer_name,
            })
        }
        HandshakeMessage::Outcome(outcome) => Err(outcome
            .into_error()
            .unwrap_or_else(|| EndpointError::HandshakeFailed {
                reason: "invalid outcome".to_string(),
            })),
        other => Err(unexpected(&other)),
    }
}

/// Runs the server side of the handshake.
///
/// With `busy` set the client is turned away with a handshake error after
/// its `Hello`, leaving any existing connection untouched.
pub async fn incoming<T>(
    transport: &mut T,
    config: &EndpointConfig,
    busy: bool,
) -> Result<Handshake, EndpointError>
where
    T: AsyncRead + AsyncWrite + Unpin + ?Sized,
{
    let max_size = config.max_frame_size;

    let (peer_name, their_challenge) = match receive(transport, max_size).await? {
        HandshakeMessage::Hello {
            protocol,
            name,
            challenge,
        } => {
            if protocol != config.protocol {
                let message = format!(
                    "protocol mismatch: server speaks '{}', client speaks '{}'",
                    config.protocol, protocol
                );
                return reject(transport, max_size, HandshakeOutcome::HandshakeError { message })
                    .await;
            }
            if busy {
                let message = format!("endpoint '{}' is already connected", config.name);
                return reject(transport, max_size, HandshakeOutcome::HandshakeError { message })
                    .await;
            }
            (name, challenge)
        }
        other => return Err(unexpected(&other)),
    };

    let response = match (&their_challenge, &config.server_authenticator) {
        (Some(challenge), Some(authenticator)) => Some(authenticator.respond(challenge)),
        _ => None,
    };
    let our_challenge = config
        .client_authenticator
        .as_ref()
        .map(|authenticator| authenticator.challenge());
    send(
        transport,
        &HandshakeMessage::Challenge {
            name: config.name.clone(),
            challenge: our_challenge.clone(),
            response,
        },
        max_size,
    )
    .await?;

    let client_response = match receive(transport, max_size).await? {
        HandshakeMessage::Response { response } => response,
        other => return Err(unexpected(&other)),
    };

    if let (Some(authenticator), Some(challenge)) = (&config.client_authenticator, &our_challenge) {
        let Some(response) = client_response else {
            let message = format!("endpoint '{}' requires authentication", config.name);
            return reject(
                transport,
                max_size,
                HandshakeOutcome::AuthenticationRequired { message },
            )
            .await;
        };
        if !authenticator.verify(challenge, &response) {
            let message = format!("client '{peer_name}' failed authentication");
            return reject(
                transport,
                max_size,
                HandshakeOutcome::AuthenticationFailed { message },
            )
            .await;
        }
    }

    let connection_id = ConnectionId::new();
    send(
        transport,
        &HandshakeMessage::Outcome(HandshakeOutcome::Ok { connection_id }),
        max_size,
    )
    .await?;

    #[cfg(feature = "tracing")]
    debug!(%connection_id, peer = %peer_name, "Incoming handshake complete");

    Ok(Handshake {
        connection_id,
        peer_name,
    })
}

async fn reject<T>(
    transport: &mut T,
    max_size: u32,
    outcome: HandshakeOutcome,
) -> Result<Handshake, EndpointError>
where
    T: AsyncWrite + Unpin + ?Sized,
{
    #[cfg(feature = "tracing")]
    warn!(?outcome, "Rejecting incoming handshake");

    let message = HandshakeMessage::Outcome(outcome.clone());
    // The peer may already be gone; the local error is what matters.
    let _ = send(transport, &message, max_size).await;
    Err(outcome
        .into_error()
        .unwrap_or_else(|| EndpointError::HandshakeFailed {
            reason: "rejected".to_string(),
        }))
}
