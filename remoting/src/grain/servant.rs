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

use async_trait::async_trait;

use super::ObjectId;
use crate::error::RemotingError;
use crate::serialization::{BinaryReader, BinaryWriter};

/// Receives calls for one exposed object and dispatches them onto its
/// subject.
///
/// Servants are generated by `#[remoting::interface]`. Dispatch is an exact
/// match on the method name over the interface's flattened method set;
/// names outside of it answer [`RemotingError::UnknownMethod`].
#[async_trait]
pub trait Servant: Send + Sync + 'static {
    /// Id under which the subject is exposed.
    fn object_id(&self) -> ObjectId;

    /// Interface the servant dispatches.
    fn interface_name(&self) -> &'static str;

    /// The subject, as the `Arc<dyn Trait>` the servant was created with.
    fn subject(&self) -> &(dyn Any + Send + Sync);

    /// Called when the connection the subscriptions arrived on is gone.
    /// Event forwarders stop pushing until the peer subscribes again.
    fn connection_closed(&self) {}

    /// Dispatchable method names, sorted and without duplicates.
    fn methods(&self) -> Vec<&'static str>;

    /// Decodes the arguments of `method`, invokes the subject and encodes the
    /// result.
    async fn invoke(
        &self,
        method: &str,
        arguments: &mut BinaryReader<'_>,
        result: &mut BinaryWriter,
    ) -> Result<(), RemotingError>;
}
