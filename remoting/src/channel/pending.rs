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


//! Outgoing calls waiting for their response.

use std::collections::HashMap;

use tokio::sync::{Mutex, oneshot};

use super::RpcId;
use super::frame::ResponseFrame;
use crate::error::RemotingError;

/// Outcome delivered to a waiting caller.
pub type PendingResult = Result<ResponseFrame, RemotingError>;

/// Table of outgoing calls keyed by [`RpcId`].
///
/// The caller registers before sending its frame and awaits the returned
/// receiver. The connection reader completes entries as responses arrive;
/// when the connection drops every remaining entry is failed with the
/// reason.
#[derive(Debug, Default)]
pub struct PendingCalls {
    calls: Mutex<HashMap<RpcId, oneshot::Sender<PendingResult>>>,
}

impl PendingCalls {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a call and returns the receiver its response arrives on.
    pub async fn register(&self, rpc_id: RpcId) -> oneshot::Receiver<PendingResult> {
        let (tx, rx) = oneshot::channel();
        self.calls.lock().await.insert(rpc_id, tx);
        rx
    }

    /// Completes a call. Returns `false` if nobody was waiting for it.
    pub async fn complete(&self, response: ResponseFrame) -> bool {
        match self.calls.lock().await.remove(&response.rpc_id) {
            Some(tx) => tx.send(Ok(response)).is_ok(),
            None => false,
        }
    }

    /// Fails one call, e.g. because its response could not be decoded.
    pub async fn fail(&self, rpc_id: RpcId, error: RemotingError) -> bool {
        match self.calls.lock().await.remove(&rpc_id) {
            Some(tx) => tx.send(Err(error)).is_ok(),
            None => false,
        }
    }

    /// Forgets a call without completing it.
    pub async fn cancel(&self, rpc_id: RpcId) -> bool {
        self.calls.lock().await.remove(&rpc_id).is_some()
    }

    /// Fails every waiting call with [`RemotingError::ConnectionLost`].
    /// Returns how many were failed.
    pub async fn fail_all(&self, reason: &str) -> usize {
        let drained: Vec<_> = self.calls.lock().await.drain().collect();
        let count = drained.len();
        for (_, tx) in drained {
            let _ = tx.send(Err(RemotingError::ConnectionLost {
                reason: reason.to_string(),
            }));
        }
        count
    }

    /// Number of calls awaiting a response.
    pub async fn len(&self) -> usize {
        self.calls.lock().await.len()
    }

    /// Returns `true` if no call is waiting.
    pub async fn is_empty(&self) -> bool {
        self.calls.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ResponseStatus;
    use bytes::Bytes;

    fn response(id: i64) -> ResponseFrame {
        ResponseFrame {
            rpc_id: RpcId::new(id),
            status: ResponseStatus::Success,
            payload: Bytes::from(id.to_le_bytes().to_vec()),
        }
    }

    #[tokio::test]
    async fn test_register_and_complete_out_of_order() {
        let pending = PendingCalls::new();
        let rx1 = pending.register(RpcId::new(1)).await;
        let rx2 = pending.register(RpcId::new(2)).await;
        assert_eq!(pending.len().await, 2);

        assert!(pending.complete(response(2)).await);
        assert!(pending.complete(response(1)).await);

        assert_eq!(rx1.await.unwrap().unwrap().rpc_id, RpcId::new(1));
        assert_eq!(rx2.await.unwrap().unwrap().rpc_id, RpcId::new(2));
        assert!(pending.is_empty().await);
    }

    #[tokio::test]
    async fn test_complete_unknown() {
        let pending = PendingCalls::new();
        assert!(!pending.complete(response(9)).await);
    }

    #[tokio::test]
    async fn test_cancel() {
        let pending = PendingCalls::new();
        let rx = pending.register(RpcId::new(3)).await;
        assert!(pending.cancel(RpcId::new(3)).await);
        assert!(rx.await.is_err());
    }

    #[tokio::test]
    async fn test_fail_all() {
        let pending = PendingCalls::new();
        let rx1 = pending.register(RpcId::new(1)).await;
        let rx2 = pending.register(RpcId::new(2)).await;

        assert_eq!(pending.fail_all("connection reset").await, 2);
        for rx in [rx1, rx2] {
            match rx.await.unwrap() {
                Err(RemotingError::ConnectionLost { reason }) => {
                    assert_eq!(reason, "connection reset")
                }
                other => panic!("unexpected outcome: {other:?}"),
            }
        }
        assert!(pending.is_empty().await);
    }

    #[tokio::test]
    async fn test_fail_one() {
        let pending = PendingCalls::new();
        let rx1 = pending.register(RpcId::new(1)).await;
        let _rx2 = pending.register(RpcId::new(2)).await;

        let error = RemotingError::Protocol {
            message: "bad response".to_string(),
        };
        assert!(pending.fail(RpcId::new(1), error).await);
        assert!(matches!(
            rx1.await.unwrap(),
            Err(RemotingError::Protocol { .. })
        ));
        assert_eq!(pending.len().await, 1);
        assert!(!pending.fail(RpcId::new(9), RemotingError::NotConnected).await);
    }
}
