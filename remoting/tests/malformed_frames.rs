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


//! Integration tests for frames that arrive damaged.
//!
//! A raw peer speaks the handshake and then writes frames by hand:
//! - A corrupt call is answered with a fault for its rpc id
//! - A corrupt response fails the caller waiting for it
//! - A frame without an intact header drops the connection

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use remoting::channel::{CallFrame, Frame, ResponseStatus, RpcId};
use remoting::endpoint::handshake;
use remoting::serialization::framing::{read_frame, write_frame, MAX_FRAME_SIZE};
use remoting::transport::{Listener, MemoryNetwork};
use remoting::{
    EndpointConfig, EndpointState, ObjectId, RemoteInterface, RemotingEndpoint, RemotingError,
};

#[remoting::interface]
pub trait Echo {
    async fn echo(&self, value: u64) -> Result<u64, RemotingError>;
}

struct Mirror;

#[remoting::async_trait]
impl Echo for Mirror {
    async fn echo(&self, value: u64) -> Result<u64, RemotingError> {
        Ok(value)
    }
}

const ECHO: ObjectId = ObjectId::new(1);
const TIMEOUT: Duration = Duration::from_secs(5);

fn echo_call(rpc_id: i64, value: u64) -> Vec<u8> {
    Frame::Call(CallFrame {
        rpc_id: RpcId::new(rpc_id),
        object_id: ECHO,
        interface: <dyn Echo as RemoteInterface>::NAME.to_string(),
        method: "echo".to_string(),
        payload: Bytes::copy_from_slice(&value.to_le_bytes()),
    })
    .encode()
    .unwrap()
    .to_vec()
}

async fn next_frame<T>(transport: &mut T) -> Frame
where
    T: tokio::io::AsyncRead + Unpin,
{
    let bytes = tokio::time::timeout(TIMEOUT, read_frame(transport, MAX_FRAME_SIZE))
        .await
        .expect("no frame arrived")
        .unwrap()
        .expect("stream closed");
    Frame::decode(&bytes).unwrap()
}

#[tokio::test]
async fn test_corrupt_call_is_answered_with_a_fault() {
    let network = MemoryNetwork::new();
    let server = RemotingEndpoint::new(
        EndpointConfig::new()
            .with_name("server")
            .with_network(network.clone()),
    )
    .unwrap();
    server
        .create_servant::<dyn Echo>(ECHO, Arc::new(Mirror))
        .unwrap();
    server.bind("memory://echo").await.unwrap();

    let mut transport = network.connect("echo").await.unwrap();
    handshake::outgoing(&mut transport, &EndpointConfig::new().with_name("raw"))
        .await
        .unwrap();

    let mut corrupt = echo_call(7, 1);
    corrupt.push(0xFF);
    write_frame(&mut transport, &corrupt, MAX_FRAME_SIZE)
        .await
        .unwrap();
    let Frame::Response(response) = next_frame(&mut transport).await else {
        panic!("expected a response");
    };
    assert_eq!(response.rpc_id, RpcId::new(7));
    assert_eq!(response.status, ResponseStatus::Fault);
    assert!(!response.payload.is_empty());

    // The connection stays usable.
    write_frame(&mut transport, &echo_call(8, 42), MAX_FRAME_SIZE)
        .await
        .unwrap();
    let Frame::Response(response) = next_frame(&mut transport).await else {
        panic!("expected a response");
    };
    assert_eq!(response.rpc_id, RpcId::new(8));
    assert_eq!(response.status, ResponseStatus::Success);
    assert_eq!(response.payload.as_ref(), 42u64.to_le_bytes());
    assert_eq!(server.state(), EndpointState::Connected);
}

#[tokio::test]
async fn test_corrupt_response_fails_the_caller() {
    let network = MemoryNetwork::new();
    let listener = network.bind("raw-server").unwrap();
    let client = RemotingEndpoint::new(
        EndpointConfig::new()
            .with_name("client")
            .with_network(network.clone()),
    )
    .unwrap();

    let raw = tokio::spawn(async move {
        let mut transport = listener.accept().await.unwrap();
        handshake::incoming(&mut transport, &EndpointConfig::new().with_name("raw"), false)
            .await
            .unwrap();
        let Frame::Call(call) = next_frame(&mut transport).await else {
            panic!("expected a call");
        };

        // Valid header, unknown status byte.
        let mut corrupt = vec![2u8];
        corrupt.extend_from_slice(&call.rpc_id.as_i64().to_le_bytes());
        corrupt.push(9);
        write_frame(&mut transport, &corrupt, MAX_FRAME_SIZE)
            .await
            .unwrap();

        // A header too short to name an rpc id ends the connection.
        let Frame::Call(_) = next_frame(&mut transport).await else {
            panic!("expected a call");
        };
        write_frame(&mut transport, &[2u8, 0, 0], MAX_FRAME_SIZE)
            .await
            .unwrap();
        transport
    });

    client.connect("memory://raw-server", TIMEOUT).await.unwrap();
    let echo = client.create_proxy::<dyn Echo>(ECHO).unwrap();

    let error = tokio::time::timeout(TIMEOUT, echo.echo(1))
        .await
        .expect("caller was left waiting")
        .unwrap_err();
    assert!(matches!(error, RemotingError::Decode(_)), "{error:?}");
    assert_eq!(client.state(), EndpointState::Connected);

    let error = tokio::time::timeout(TIMEOUT, echo.echo(2))
        .await
        .expect("caller was left waiting")
        .unwrap_err();
    assert!(matches!(error, RemotingError::ConnectionLost { .. }), "{error:?}");
    let _transport = raw.await.unwrap();

    let mut state = client.watch_state();
    tokio::time::timeout(
        TIMEOUT,
        state.wait_for(|state| *state == EndpointState::Disconnected),
    )
    .await
    .unwrap()
    .unwrap();
}
