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


//! Wire frames exchanged on an established connection.
//!
//! Every frame starts with a kind byte and the [`RpcId`]:
//!
//! ```text
//! call:     [1][i64 rpc id][u64 object id][string interface][string method][bytes payload]
//! response: [2][i64 rpc id][u8 status][bytes payload]
//! ```
//!
//! Strings and byte arrays use the codec layout (presence byte, `i32`
//! length, data). A call payload holds the encoded arguments in declaration
//! order; a success payload holds the encoded return value (empty for
//! `()`), a fault payload holds an encoded error.

use bytes::Bytes;

use super::RpcId;
use crate::grain::ObjectId;
use crate::serialization::{BinaryReader, BinaryWriter, DecodeError, EncodeError};

const CALL: u8 = 1;
const RESPONSE: u8 = 2;

/// Outcome of a call as carried by its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResponseStatus {
    /// The payload is the return value.
    Success = 0,
    /// The payload is an encoded error.
    Fault = 1,
}

/// A request to invoke `interface.method` on an object of the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFrame {
    /// Correlation id chosen by the caller.
    pub rpc_id: RpcId,
    /// Target object.
    pub object_id: ObjectId,
    /// Interface the caller believes the object implements.
    pub interface: String,
    /// Method, or `+event` / `-event` / event name for subscriptions and pushes.
    pub method: String,
    /// Encoded arguments.
    pub payload: Bytes,
}

/// The single answer to a [`CallFrame`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFrame {
    /// Correlation id copied from the call.
    pub rpc_id: RpcId,
    /// Whether the call succeeded.
    pub status: ResponseStatus,
    /// Encoded return value or error.
    pub payload: Bytes,
}

/// Which side of an exchange a frame is, read from its first byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// A [`CallFrame`].
    Call,
    /// A [`ResponseFrame`].
    Response,
}

/// Any frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// An inbound or outbound call.
    Call(CallFrame),
    /// The response to an earlier call.
    Response(ResponseFrame),
}

impl Frame {
    /// The correlation id of this frame.
    pub fn rpc_id(&self) -> RpcId {
        match self {
            Frame::Call(call) => call.rpc_id,
            Frame::Response(response) => response.rpc_id,
        }
    }

    /// Reads only the kind byte and rpc id of a frame body.
    ///
    /// Used to answer a frame whose remainder fails to decode. `None` means
    /// not even the header is intact.
    pub fn header(input: &[u8]) -> Option<(FrameKind, RpcId)> {
        let mut reader = BinaryReader::new(input);
        let kind = match reader.read_u8().ok()? {
            CALL => FrameKind::Call,
            RESPONSE => FrameKind::Response,
            _ => return None,
        };
        let rpc_id = RpcId::new(reader.read_i64().ok()?);
        Some((kind, rpc_id))
    }

    /// Encodes the frame body (without the length prefix).
    pub fn encode(&self) -> Result<Bytes, EncodeError> {
        let mut writer = BinaryWriter::new();
        match self {
            Frame::Call(call) => {
                writer.write_u8(CALL);
                writer.write_i64(call.rpc_id.as_i64());
                writer.write_u64(call.object_id.as_u64());
                writer.write_string(Some(call.interface.as_str()))?;
                writer.write_string(Some(call.method.as_str()))?;
                writer.write_bytes(Some(call.payload.as_ref()))?;
            }
            Frame::Response(response) => {
                writer.write_u8(RESPONSE);
                writer.write_i64(response.rpc_id.as_i64());
                writer.write_u8(response.status as u8);
                writer.write_bytes(Some(response.payload.as_ref()))?;
            }
        }
        Ok(writer.into_bytes())
    }

    /// Decodes a frame body, rejecting trailing bytes.
    pub fn decode(input: &[u8]) -> Result<Frame, DecodeError> {
        let mut reader = BinaryReader::new(input);
        let frame = match reader.read_u8()? {
            CALL => Frame::Call(CallFrame {
                rpc_id: RpcId::new(reader.read_i64()?),
                object_id: ObjectId::new(reader.read_u64()?),
                interface: required(reader.read_string()?, "interface name")?,
                method: required(reader.read_string()?, "method name")?,
                payload: required(reader.read_bytes()?, "call payload")?,
            }),
            RESPONSE => {
                let rpc_id = RpcId::new(reader.read_i64()?);
                let status = match reader.read_u8()? {
                    0 => ResponseStatus::Success,
                    1 => ResponseStatus::Fault,
                    other => {
                        return Err(DecodeError::InvalidValue {
                            type_name: "response status".to_string(),
                            reason: format!("unknown status {other}"),
                        });
                    }
                };
                Frame::Response(ResponseFrame {
                    rpc_id,
                    status,
                    payload: required(reader.read_bytes()?, "response payload")?,
                })
            }
            other => {
                return Err(DecodeError::InvalidValue {
                    type_name: "frame".to_string(),
                    reason: format!("unknown frame kind {other}"),
                });
            }
        };
        reader.finish()?;
        Ok(frame)
    }
}

fn required<T>(value: Option<T>, what: &str) -> Result<T, DecodeError> {
    value.ok_or_else(|| DecodeError::UnexpectedNull {
        type_name: what.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_layout() {
        let frame = Frame::Call(CallFrame {
            rpc_id: RpcId::new(5),
            object_id: ObjectId::new(9),
            interface: "I".to_string(),
            method: "m".to_string(),
            payload: Bytes::from_static(&[0xAA]),
        });
        let bytes = frame.encode().unwrap();

        let mut expected = vec![1u8];
        expected.extend_from_slice(&5i64.to_le_bytes());
        expected.extend_from_slice(&9u64.to_le_bytes());
        expected.extend_from_slice(&[1, 1, 0, 0, 0, b'I']);
        expected.extend_from_slice(&[1, 1, 0, 0, 0, b'm']);
        expected.extend_from_slice(&[1, 1, 0, 0, 0, 0xAA]);
        assert_eq!(bytes.as_ref(), expected.as_slice());

        assert_eq!(Frame::decode(&bytes).unwrap(), frame);
    }

    #[test]
    fn test_response_decode() {
        let frame = Frame::Response(ResponseFrame {
            rpc_id: RpcId::new(-1),
            status: ResponseStatus::Fault,
            payload: Bytes::new(),
        });
        let bytes = frame.encode().unwrap();
        assert_eq!(Frame::decode(&bytes).unwrap().rpc_id(), RpcId::new(-1));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            Frame::decode(&[7]),
            Err(DecodeError::InvalidValue { .. })
        ));
        assert!(matches!(
            Frame::decode(&[2, 0, 0]),
            Err(DecodeError::UnexpectedEof { .. })
        ));

        let mut bytes = vec![2u8];
        bytes.extend_from_slice(&1i64.to_le_bytes());
        bytes.push(9);
        assert!(matches!(
            Frame::decode(&bytes),
            Err(DecodeError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_header_survives_corrupt_body() {
        let frame = Frame::Call(CallFrame {
            rpc_id: RpcId::new(7),
            object_id: ObjectId::new(1),
            interface: "I".to_string(),
            method: "m".to_string(),
            payload: Bytes::new(),
        });
        let mut bytes = frame.encode().unwrap().to_vec();
        bytes.push(0xFF);
        assert!(Frame::decode(&bytes).is_err());
        assert_eq!(
            Frame::header(&bytes),
            Some((FrameKind::Call, RpcId::new(7)))
        );

        assert_eq!(Frame::header(&[2, 1, 0]), None);
        assert_eq!(Frame::header(&[9; 16]), None);
    }

    #[test]
    fn test_decode_rejects_null_method() {
        let mut bytes = vec![1u8];
        bytes.extend_from_slice(&1i64.to_le_bytes());
        bytes.extend_from_slice(&1u64.to_le_bytes());
        bytes.extend_from_slice(&[1, 1, 0, 0, 0, b'I']);
        bytes.push(0);
        assert!(matches!(
            Frame::decode(&bytes),
            Err(DecodeError::UnexpectedNull { .. })
        ));
    }
}
