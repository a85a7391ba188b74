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


//! Grains: the per-object plumbing shared by proxies and servants.
//!
//! A [`Grain`] binds an [`ObjectId`] to the channel calls travel on and to
//! the [`Serializer`] that encodes them. Generated code builds on it:
//!
//! - a **proxy** implements a remote interface locally and forwards every
//!   call through its grain ([`ProxyObject`]),
//! - a **servant** receives calls for an object id and dispatches them onto
//!   the subject it wraps ([`Servant`]),
//! - [`RemoteInterface`], implemented for `dyn Trait` by
//!   `#[remoting::interface]`, ties both to the type model.
//!
//! [`Event`] and [`Task`] are the two non-trivial method shapes an interface
//! may expose.

mod event;
mod proxy;
mod servant;
mod task;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

pub use event::{Event, EventForwarder, EventHandler, SubscriptionId};
pub use proxy::ProxyObject;
pub use servant::Servant;
pub use task::Task;

use crate::error::RemotingError;
use crate::serialization::{BinaryReader, BinaryWriter, Serializer};
use crate::types::{MethodDescription, Remotable};

/// Identifies an object exposed by one side of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Wraps a raw id.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for ObjectId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Outgoing side of an endpoint as seen by proxies and servants.
#[async_trait]
pub trait EndpointChannel: Send + Sync {
    /// Sends a call to the peer and waits for its response payload.
    ///
    /// Event pushes from a servant use the same path with the event name as
    /// method.
    async fn call_remote_method(
        &self,
        object_id: ObjectId,
        interface: &str,
        method: &str,
        arguments: Bytes,
    ) -> Result<Bytes, RemotingError>;
}

/// Object id, channel and serializer of one proxy or servant.
#[derive(Clone)]
pub struct Grain {
    object_id: ObjectId,
    channel: Arc<dyn EndpointChannel>,
    serializer: Arc<Serializer>,
}

impl Grain {
    /// Creates a grain.
    pub fn new(
        object_id: ObjectId,
        channel: Arc<dyn EndpointChannel>,
        serializer: Arc<Serializer>,
    ) -> Self {
        Self {
            object_id,
            channel,
            serializer,
        }
    }

    /// The object this grain talks about.
    pub fn object_id(&self) -> ObjectId {
        self.object_id
    }

    /// The serializer for arguments and results.
    pub fn serializer(&self) -> &Arc<Serializer> {
        &self.serializer
    }

    /// The channel calls are sent on.
    pub fn channel(&self) -> &Arc<dyn EndpointChannel> {
        &self.channel
    }

    /// Starts building a call of `interface.method`.
    pub fn call<'a>(&'a self, interface: &'a str, method: &'a str) -> Call<'a> {
        Call {
            grain: self,
            interface,
            method,
            arguments: BinaryWriter::new(),
        }
    }

    /// Sends pre-encoded arguments and returns the raw response payload.
    pub async fn invoke(
        &self,
        interface: &str,
        method: &str,
        arguments: Bytes,
    ) -> Result<Bytes, RemotingError> {
        self.channel
            .call_remote_method(self.object_id, interface, method, arguments)
            .await
    }
}

impl fmt::Debug for Grain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grain")
            .field("object_id", &self.object_id)
            .finish_non_exhaustive()
    }
}

/// An outgoing call being assembled by a proxy.
pub struct Call<'a> {
    grain: &'a Grain,
    interface: &'a str,
    method: &'a str,
    arguments: BinaryWriter,
}

impl Call<'_> {
    /// Appends the next argument.
    pub fn argument<T: Remotable>(mut self, value: &T) -> Result<Self, RemotingError> {
        self.grain.serializer.write(&mut self.arguments, value)?;
        Ok(self)
    }

    /// Sends the call and decodes a `T` from the response.
    pub async fn returning<T: Remotable>(self) -> Result<T, RemotingError> {
        let response = self
            .grain
            .invoke(self.interface, self.method, self.arguments.into_bytes())
            .await?;
        let mut reader = BinaryReader::new(&response);
        let value = self.grain.serializer.read::<T>(&mut reader)?;
        reader.finish()?;
        Ok(value)
    }
}

/// Glue generated by `#[remoting::interface]` for `dyn Trait`.
///
/// Implementing it makes `Arc<dyn Trait>` a by-reference
/// [`Remotable`]: writing one exposes a servant, reading one yields a proxy.
pub trait RemoteInterface: Send + Sync + 'static {
    /// Interface name used on the wire.
    const NAME: &'static str;

    /// Descriptions of every method, including inherited ones.
    fn methods() -> Vec<MethodDescription>;

    /// Creates a proxy forwarding through `grain`.
    fn create_proxy(grain: Grain) -> Arc<dyn ProxyObject>;

    /// Recovers the interface handle from a proxy created by
    /// [`RemoteInterface::create_proxy`].
    fn downcast_proxy(proxy: Arc<dyn ProxyObject>) -> Option<Arc<Self>>;

    /// Creates a servant dispatching onto `subject`.
    fn create_servant(subject: Arc<Self>, grain: Grain) -> Arc<dyn Servant>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_id_display() {
        assert_eq!(ObjectId::new(42).to_string(), "#42");
        assert_eq!(ObjectId::from(7).as_u64(), 7);
    }
}
