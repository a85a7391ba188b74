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


use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;

use super::{Grain, ObjectId};
use crate::error::RemotingError;
use crate::serialization::BinaryReader;

/// A local stand-in for an object living on the peer.
///
/// Proxies are generated by `#[remoting::interface]`. Besides implementing
/// the interface trait they receive event pushes for the object they stand
/// for.
#[async_trait]
pub trait ProxyObject: Send + Sync + 'static {
    /// Grain the proxy forwards through.
    fn grain(&self) -> &Grain;

    /// Interface the proxy implements.
    fn interface_name(&self) -> &'static str;

    /// Object id of the remote object.
    fn object_id(&self) -> ObjectId {
        self.grain().object_id()
    }

    /// Delivers a value pushed by the servant's event forwarder to the local
    /// handlers of `event`.
    async fn invoke_event(
        &self,
        event: &str,
        arguments: &mut BinaryReader<'_>,
    ) -> Result<(), RemotingError>;

    /// Upcasts for downcasting to the concrete proxy type.
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}
