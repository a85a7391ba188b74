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


//! Endpoints: connection state machine, handshake and authentication.
//!
//! A [`RemotingEndpoint`] owns the object tables (servants by id, proxies by
//! id) and at most one connection. Its life cycle:
//!
//! ```text
//!              connect()                 handshake ok
//! Disconnected ---------> Connecting ---> Handshaking ---> Connected
//!      ^                      |                |               |
//!      |       failure        |    failure     |  disconnect() |
//!      +----------------------+----------------+---------------+
//! ```
//!
//! A bound endpoint moves from `Disconnected` to `Handshaking` when a peer
//! connects, and returns to accepting after every disconnect. A second peer
//! arriving while a connection exists is turned away during its handshake.
//! `dispose()` moves any state to `Disposed`.
//!
//! # Handshake
//!
//! See [`handshake`] for the message flow. Two optional [`Authenticator`]s
//! can be configured: the client authenticator lets the server check the
//! client, the server authenticator lets the client check the server.

mod auth;
mod config;
mod connection;
mod endpoint;
mod error;
pub mod handshake;
mod state;

pub use auth::{Authenticator, SharedSecretAuthenticator};
pub use config::{EndpointConfig, PROTOCOL_TOKEN};
pub use endpoint::RemotingEndpoint;
pub use error::EndpointError;
pub use state::{ConnectionId, EndpointState};
