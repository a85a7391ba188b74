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

#![doc = include_str!("../../README.md")]
#![allow(clippy::module_inception)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

//! # Remoting - Proxy/Servant Object Remoting
//!
//! Remoting lets two processes hand each other live objects: one side
//! exposes a subject behind a **servant**, the other talks to it through a
//! **proxy** that implements the same Rust trait. It provides:
//!
//! - **Remote interfaces**: `#[remoting::interface]` traits with calls,
//!   started tasks and events, including interface inheritance
//! - **By-value and by-reference types**: `#[derive(Remotable)]` data
//!   contracts, singletons, and `Arc<dyn Interface>` handles
//! - **Compact binary wire format**: fixed-width little-endian primitives and
//!   hinted composites with null markers
//! - **Bi-directional endpoints**: either side may call the other once
//!   connected, over TCP or an in-process memory network
//! - **Authentication**: pluggable client and server authenticators checked
//!   during the handshake
//! - **Remote faults**: errors raised by a subject travel back to the caller
//! - **Reconnection**: retrying connects with exponential backoff
//!
//! ## Architecture
//!
//! - **[`types`]**: The type model, describing everything that can be sent
//! - **[`serialization`]**: The binary codec and the serializer compiled
//!   from type descriptions
//! - **[`transport`]**: Byte streams (TCP, memory)
//! - **[`channel`]**: Call and response frames and their correlation
//! - **[`grain`]**: Proxies, servants, events and tasks
//! - **[`endpoint`]**: Connection state machine, handshake and object tables
//! - **[`reconnection`]**: Retry strategies for connecting
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use remoting::{EndpointConfig, ObjectId, RemotingEndpoint, RemotingError};
//!
//! #[remoting::interface]
//! pub trait Calculator {
//!     async fn add(&self, a: i32, b: i32) -> Result<i32, RemotingError>;
//! }
//!
//! struct Adder;
//!
//! #[remoting::async_trait]
//! impl Calculator for Adder {
//!     async fn add(&self, a: i32, b: i32) -> Result<i32, RemotingError> {
//!         Ok(a + b)
//!     }
//! }
//!
//! let server = RemotingEndpoint::new(EndpointConfig::new().with_name("server"))?;
//! server.create_servant::<dyn Calculator>(ObjectId::new(1), Arc::new(Adder))?;
//! let address = server.bind("tcp://127.0.0.1:0").await?;
//!
//! let client = RemotingEndpoint::new(EndpointConfig::new().with_name("client"))?;
//! client.connect(&address.to_string(), Duration::from_secs(5)).await?;
//! let calculator = client.create_proxy::<dyn Calculator>(ObjectId::new(1))?;
//! assert_eq!(calculator.add(2, 3).await?, 5);
//! ```
//!
//! ## Features
//!
//! - **`tracing`** (default): Structured logging through the `tracing` crate
//!
//! ## Error Handling
//!
//! Errors are layered:
//!
//! - [`TransportError`]: I/O and connection errors of a byte stream
//! - [`EndpointError`]: Connection management, handshake and object tables
//! - [`RemotingError`]: Everything a remote call can fail with, including
//!   codec errors and remote [`Fault`]s
//!
//! ## Safety
//!
//! Remoting is written in 100% safe Rust with `#![deny(unsafe_code)]`.
//! All concurrency is handled through Tokio's async runtime.

extern crate self as remoting;

pub mod channel;
pub mod endpoint;
pub mod error;
pub mod grain;
pub mod reconnection;
pub mod serialization;
pub mod transport;
pub mod types;

// Re-export the macros and the trait helper generated code relies on.
pub use async_trait::async_trait;
pub use remoting_macros::interface;

pub use endpoint::{
    Authenticator, ConnectionId, EndpointConfig, EndpointError, EndpointState, RemotingEndpoint,
    SharedSecretAuthenticator,
};
pub use error::{RemotingError, Result};
pub use grain::{
    Call, EndpointChannel, Event, EventForwarder, EventHandler, Grain, ObjectId, ProxyObject,
    RemoteInterface, Servant, SubscriptionId, Task,
};
pub use reconnection::{ExponentialBackoff, NoReconnect, ReconnectionStrategy};
pub use serialization::{BinaryReader, BinaryWriter, Fault, Serializer};
pub use transport::{Address, TransportError};
pub use types::{Decimal, Remotable, TypeDescription, TypeModel, TypeRef};
