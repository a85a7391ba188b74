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


//! Inbound calls currently executing.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::task::AbortHandle;

use super::RpcId;
use crate::grain::ObjectId;

/// One inbound call whose method body is still running.
#[derive(Debug)]
pub struct MethodInvocation {
    /// Correlation id of the call.
    pub rpc_id: RpcId,
    /// Target object.
    pub object_id: ObjectId,
    /// Method being executed.
    pub method: String,
    handle: AbortHandle,
}

impl MethodInvocation {
    /// Records an invocation running on the task behind `handle`.
    pub fn new(rpc_id: RpcId, object_id: ObjectId, method: String, handle: AbortHandle) -> Self {
        Self {
            rpc_id,
            object_id,
            method,
            handle,
        }
    }

    /// Cancels the invocation.
    pub fn abort(&self) {
        self.handle.abort();
    }
}

/// Invocations of one connection keyed by [`RpcId`].
#[derive(Debug, Default)]
pub struct InvocationTable {
    invocations: Mutex<HashMap<RpcId, MethodInvocation>>,
}

impl InvocationTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracks `invocation`. Returns `false`, leaving the table untouched, if
    /// its id is already in flight.
    pub fn insert(&self, invocation: MethodInvocation) -> bool {
        let mut invocations = self.invocations.lock();
        if invocations.contains_key(&invocation.rpc_id) {
            return false;
        }
        invocations.insert(invocation.rpc_id, invocation);
        true
    }

    /// Returns `true` if `rpc_id` is in flight.
    pub fn contains(&self, rpc_id: RpcId) -> bool {
        self.invocations.lock().contains_key(&rpc_id)
    }

    /// Stops tracking `rpc_id`.
    pub fn remove(&self, rpc_id: RpcId) -> Option<MethodInvocation> {
        self.invocations.lock().remove(&rpc_id)
    }

    /// Aborts and forgets every invocation. Returns how many were aborted.
    pub fn abort_all(&self) -> usize {
        let drained: Vec<_> = self.invocations.lock().drain().collect();
        for (_, invocation) in &drained {
            invocation.abort();
        }
        drained.len()
    }

    /// Number of invocations in flight.
    pub fn len(&self) -> usize {
        self.invocations.lock().len()
    }

    /// Returns `true` if nothing is in flight.
    pub fn is_empty(&self) -> bool {
        self.invocations.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_insert_rejects_duplicates() {
        let table = InvocationTable::new();
        let task = tokio::spawn(std::future::pending::<()>());
        let first = MethodInvocation::new(
            RpcId::new(1),
            ObjectId::new(1),
            "a".to_string(),
            task.abort_handle(),
        );
        let second = MethodInvocation::new(
            RpcId::new(1),
            ObjectId::new(2),
            "b".to_string(),
            task.abort_handle(),
        );
        assert!(table.insert(first));
        assert!(!table.insert(second));
        assert_eq!(table.len(), 1);
        assert_eq!(table.remove(RpcId::new(1)).unwrap().method, "a");
        task.abort();
    }

    #[tokio::test]
    async fn test_abort_all() {
        let table = InvocationTable::new();
        let task = tokio::spawn(tokio::time::sleep(Duration::from_secs(60)));
        table.insert(MethodInvocation::new(
            RpcId::new(4),
            ObjectId::new(1),
            "slow".to_string(),
            task.abort_handle(),
        ));

        assert_eq!(table.abort_all(), 1);
        assert!(table.is_empty());
        assert!(task.await.unwrap_err().is_cancelled());
    }
}
