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


//! One established connection: a reader task, a writer task and the
//! per-connection call tables.

use std::sync::{Arc, Weak};

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::io::{AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::{mpsc, oneshot};
use tokio::task::AbortHandle;

use super::endpoint::EndpointInner;
use crate::channel::{
    CallFrame, Frame, FrameKind, InvocationTable, MethodInvocation, PendingCalls, PendingResult,
};
use crate::endpoint::ConnectionId;
use crate::error::RemotingError;
use crate::serialization::EncodeError;
use crate::serialization::framing::{read_frame, write_frame};
use crate::transport::{Address, Transport};

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

pub(crate) struct Connection {
    id: ConnectionId,
    peer_name: String,
    remote_address: Option<Address>,
    max_frame_size: u32,
    outbound: mpsc::Sender<Bytes>,
    pending: PendingCalls,
    invocations: InvocationTable,
    tasks: Mutex<Vec<AbortHandle>>,
}

impl Connection {
    /// Splits `transport` and spawns the reader and writer tasks.
    pub(crate) fn start(
        transport: Box<dyn Transport>,
        id: ConnectionId,
        peer_name: String,
        remote_address: Option<Address>,
        max_frame_size: u32,
        queue_depth: usize,
        endpoint: Weak<EndpointInner>,
    ) -> Arc<Self> {
        let (read_half, write_half) = tokio::io::split(transport);
        let (outbound, queue) = mpsc::channel(queue_depth);
        let connection = Arc::new(Self {
            id,
            peer_name,
            remote_address,
            max_frame_size,
            outbound,
            pending: PendingCalls::new(),
            invocations: InvocationTable::new(),
            tasks: Mutex::new(Vec::new()),
        });

        let writer = tokio::spawn(write_loop(
            write_half,
            queue,
            max_frame_size,
            id,
            endpoint.clone(),
        ));
        let reader = tokio::spawn(read_loop(read_half, Arc::clone(&connection), endpoint));
        connection
            .tasks
            .lock()
            .extend([writer.abort_handle(), reader.abort_handle()]);
        connection
    }

    pub(crate) fn id(&self) -> ConnectionId {
        self.id
    }

    pub(crate) fn peer_name(&self) -> &str {
        &self.peer_name
    }

    pub(crate) fn remote_address(&self) -> Option<&Address> {
        self.remote_address.as_ref()
    }

    /// Queues an encoded frame for the writer.
    async fn send(&self, frame: &Frame) -> Result<(), RemotingError> {
        let bytes = frame.encode()?;
        if bytes.len() > self.max_frame_size as usize {
            return Err(EncodeError::TooLarge {
                length: bytes.len(),
            }
            .into());
        }
        self.outbound
            .send(bytes)
            .await
            .map_err(|_| RemotingError::ConnectionLost {
                reason: "connection is closed".to_string(),
            })
    }

    /// Sends a call and waits for its response.
    pub(crate) async fn call(&self, call: CallFrame) -> Result<PendingResult, RemotingError> {
        let rpc_id = call.rpc_id;
        let response = self.pending.register(rpc_id).await;
        if let Err(error) = self.send(&Frame::Call(call)).await {
            self.pending.cancel(rpc_id).await;
            return Err(error);
        }
        response.await.map_err(|_| RemotingError::ConnectionLost {
            reason: "connection is closed".to_string(),
        })
    }

    /// Runs an inbound call on its own task, tracked until its response has
    /// been queued.
    fn spawn_invocation(self: &Arc<Self>, endpoint: Arc<EndpointInner>, call: CallFrame) {
        let rpc_id = call.rpc_id;
        let object_id = call.object_id;
        let method = call.method.clone();
        let (registered_tx, registered_rx) = oneshot::channel::<()>();
        let connection = Arc::clone(self);

        let task = tokio::spawn(async move {
            // Wait until the invocation is tracked so the removal below
            // cannot race the insertion.
            if registered_rx.await.is_err() {
                return;
            }
            let response = endpoint.dispatch(call).await;
            connection.invocations.remove(rpc_id);
            let sent = match connection.send(&Frame::Response(response)).await {
                Err(RemotingError::Encode(error)) => {
                    let fallback = endpoint.fault_response(rpc_id, &RemotingError::Encode(error));
                    connection.send(&Frame::Response(fallback)).await
                }
                other => other,
            };
            if let Err(_error) = sent {
                #[cfg(feature = "tracing")]
                debug!(%rpc_id, "Dropping response: {}", _error);
            }
        });

        let invocation = MethodInvocation::new(rpc_id, object_id, method, task.abort_handle());
        if self.invocations.insert(invocation) {
            let _ = registered_tx.send(());
        } else {
            #[cfg(feature = "tracing")]
            warn!(%rpc_id, "Ignoring call with an rpc id already in flight");
            task.abort();
        }
    }

    /// Stops both tasks and all inbound invocations, and fails every
    /// outgoing call still waiting.
    pub(crate) async fn close(&self, reason: &str) {
        self.abort_tasks();
        let _aborted = self.invocations.abort_all();
        let _failed = self.pending.fail_all(reason).await;

        #[cfg(feature = "tracing")]
        debug!(
            connection_id = %self.id,
            aborted = _aborted,
            failed = _failed,
            "Connection closed: {}",
            reason
        );
    }

    pub(crate) fn abort_tasks(&self) {
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
    }
}

async fn read_loop(
    mut reader: ReadHalf<Box<dyn Transport>>,
    connection: Arc<Connection>,
    endpoint: Weak<EndpointInner>,
) {
    let reason = loop {
        let bytes = match read_frame(&mut reader, connection.max_frame_size).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => break "peer closed the connection".to_string(),
            Err(error) => break error.to_string(),
        };
        match Frame::decode(&bytes) {
            Ok(Frame::Call(call)) => {
                let Some(endpoint) = endpoint.upgrade() else {
                    break "endpoint dropped".to_string();
                };
                connection.spawn_invocation(endpoint, call);
            }
            Ok(Frame::Response(response)) => {
                let _rpc_id = response.rpc_id;
                if !connection.pending.complete(response).await {
                    #[cfg(feature = "tracing")]
                    debug!(rpc_id = %_rpc_id, "Response for a call nobody waits for");
                }
            }
            Err(error) => {
                #[cfg(feature = "tracing")]
                warn!(connection_id = %connection.id, "Malformed frame: {}", error);

                match Frame::header(&bytes) {
                    Some((FrameKind::Call, rpc_id)) => {
                        let Some(endpoint) = endpoint.upgrade() else {
                            break "endpoint dropped".to_string();
                        };
                        let response = endpoint.fault_response(rpc_id, &RemotingError::Decode(error));
                        if let Err(error) = connection.send(&Frame::Response(response)).await {
                            break error.to_string();
                        }
                    }
                    Some((FrameKind::Response, rpc_id)) => {
                        connection
                            .pending
                            .fail(rpc_id, RemotingError::Decode(error))
                            .await;
                    }
                    None => break format!("corrupt frame: {error}"),
                }
            }
        }
    };
    connection_lost(endpoint, connection.id, reason);
}

async fn write_loop(
    mut writer: WriteHalf<Box<dyn Transport>>,
    mut queue: mpsc::Receiver<Bytes>,
    max_frame_size: u32,
    id: ConnectionId,
    endpoint: Weak<EndpointInner>,
) {
    while let Some(bytes) = queue.recv().await {
        if let Err(error) = write_frame(&mut writer, &bytes, max_frame_size).await {
            connection_lost(endpoint, id, error.to_string());
            return;
        }
    }
    let _ = writer.shutdown().await;
}

fn connection_lost(endpoint: Weak<EndpointInner>, id: ConnectionId, reason: String) {
    if let Some(endpoint) = endpoint.upgrade() {
        // Tear down from a fresh task: the teardown aborts the task that
        // noticed the failure.
        tokio::spawn(async move {
            endpoint.drop_connection(Some(id), &reason).await;
        });
    }
}
