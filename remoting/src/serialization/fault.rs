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


//! Marshalling of remote failures.
//!
//! A failed call answers with a fault payload instead of a return value. The
//! payload starts with a category byte so the caller can tell a failure of the
//! subject's own code from a protocol problem or a contract violation:
//!
//! ```text
//! 0  application fault   kind (1 = value, 2 = unserializable), type name,
//!                        message, then the encoded value for kind 1
//! 1  protocol error      message
//! 2  unknown method      interface, method
//! 3  type mismatch       expected interface, actual interface
//! 4  not supported       interface, method, object id
//! 5  no such object      object id
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "tracing")]
use tracing::warn;

use super::codec::{BinaryReader, BinaryWriter};
use super::error::{DecodeError, EncodeError};
use super::serializer::Serializer;
use crate::error::RemotingError;
use crate::grain::ObjectId;
use crate::types::{Remotable, TypeRef};

const FAULT_VALUE: u8 = 1;
const FAULT_UNSERIALIZABLE: u8 = 2;

const CATEGORY_FAULT: u8 = 0;
const CATEGORY_PROTOCOL: u8 = 1;
const CATEGORY_UNKNOWN_METHOD: u8 = 2;
const CATEGORY_TYPE_MISMATCH: u8 = 3;
const CATEGORY_NOT_SUPPORTED: u8 = 4;
const CATEGORY_NO_SUCH_OBJECT: u8 = 5;

/// An error raised by the subject of a remote call, as seen by the caller.
///
/// A fault always carries the original type name and message. When the error
/// type is [`Remotable`] and registered on both sides, the value itself
/// crosses the wire and can be recovered with [`Fault::downcast_ref`].
///
/// # Examples
///
/// ```rust
/// use remoting::Fault;
///
/// let fault = Fault::from_error(std::io::Error::other("disk full"));
/// assert_eq!(fault.message(), "disk full");
/// assert!(fault.downcast_ref::<std::io::Error>().is_some());
/// ```
#[derive(Clone)]
pub struct Fault {
    type_name: String,
    message: String,
    value: Option<Arc<dyn Any + Send + Sync>>,
    type_ref: Option<TypeRef>,
    unserializable: bool,
}

impl Fault {
    /// Wraps an error whose value travels to the caller.
    pub fn new<E: std::error::Error + Remotable>(error: E) -> Self {
        Self {
            type_name: std::any::type_name::<E>().to_string(),
            message: error.to_string(),
            value: Some(Arc::new(error)),
            type_ref: Some(TypeRef::of::<E>()),
            unserializable: false,
        }
    }

    /// Wraps an error of which only type name and message travel.
    pub fn from_error<E: std::error::Error + Send + Sync + 'static>(error: E) -> Self {
        Self {
            type_name: std::any::type_name::<E>().to_string(),
            message: error.to_string(),
            value: Some(Arc::new(error)),
            type_ref: None,
            unserializable: false,
        }
    }

    /// A fault without any value.
    pub fn opaque(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
            value: None,
            type_ref: None,
            unserializable: false,
        }
    }

    /// Fully qualified Rust type name of the original error.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Display text of the original error.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The error value, if it is available locally and of type `E`.
    pub fn downcast_ref<E: Any>(&self) -> Option<&E> {
        self.value.as_deref()?.downcast_ref::<E>()
    }

    /// Whether the error value is available locally and of type `E`.
    pub fn is<E: Any>(&self) -> bool {
        self.downcast_ref::<E>().is_some()
    }

    /// Whether the original error could not be reconstructed on this side.
    pub fn is_unserializable(&self) -> bool {
        self.unserializable
    }

    fn encode_value(&self, serializer: &Serializer) -> Option<Vec<u8>> {
        let type_ref = self.type_ref?;
        let value = self.value.as_deref()?;
        let mut writer = BinaryWriter::new();
        match serializer.write_dyn(type_ref, &mut writer, value) {
            Ok(()) => Some(writer.as_slice().to_vec()),
            Err(_error) => {
                #[cfg(feature = "tracing")]
                warn!(
                    fault_type = %self.type_name,
                    error = %_error,
                    "fault value is not serializable, sending type name and message only"
                );
                None
            }
        }
    }

    pub(crate) fn encode(
        &self,
        serializer: &Serializer,
        writer: &mut BinaryWriter,
    ) -> Result<(), EncodeError> {
        let value = self.encode_value(serializer);
        writer.write_u8(if value.is_some() {
            FAULT_VALUE
        } else {
            FAULT_UNSERIALIZABLE
        });
        writer.write_string(Some(&self.type_name))?;
        writer.write_string(Some(&self.message))?;
        if let Some(value) = value {
            writer.write_bytes(Some(&value))?;
        }
        Ok(())
    }

    pub(crate) fn decode(
        serializer: &Serializer,
        reader: &mut BinaryReader<'_>,
    ) -> Result<Self, DecodeError> {
        let kind = reader.read_u8()?;
        let type_name = reader.read_string()?.unwrap_or_default();
        let message = reader.read_string()?.unwrap_or_default();
        let mut fault = Self::opaque(type_name, message);
        match kind {
            FAULT_VALUE => {
                let data = reader.read_bytes()?.unwrap_or_default();
                if let Some(type_ref) = serializer.find_type(&fault.type_name) {
                    if let Ok(value) = serializer.read_dyn(type_ref, &mut BinaryReader::new(&data)) {
                        fault.value = Some(Arc::from(value));
                        fault.type_ref = Some(type_ref);
                        return Ok(fault);
                    }
                }
            }
            FAULT_UNSERIALIZABLE => {}
            value => {
                return Err(DecodeError::InvalidValue {
                    type_name: "Fault".to_string(),
                    reason: format!("unknown fault kind {value}"),
                });
            }
        }
        match serializer.substitute(&fault.type_name) {
            Some(value) => fault.value = Some(Arc::from(value)),
            None => fault.unserializable = true,
        }
        Ok(fault)
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.type_name, self.message)
    }
}

impl fmt::Debug for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fault")
            .field("type_name", &self.type_name)
            .field("message", &self.message)
            .field("has_value", &self.value.is_some())
            .field("unserializable", &self.unserializable)
            .finish()
    }
}

impl std::error::Error for Fault {}

/// Writes the fault payload of a failed call.
pub(crate) fn encode_error(
    serializer: &Serializer,
    writer: &mut BinaryWriter,
    error: &RemotingError,
) -> Result<(), EncodeError> {
    match error {
        RemotingError::Fault(fault) => {
            writer.write_u8(CATEGORY_FAULT);
            fault.encode(serializer, writer)
        }
        RemotingError::Encode(_)
        | RemotingError::Decode(_)
        | RemotingError::Registration(_)
        | RemotingError::Protocol { .. } => {
            writer.write_u8(CATEGORY_PROTOCOL);
            writer.write_string(Some(&error.to_string()))
        }
        RemotingError::UnknownMethod { interface, method } => {
            writer.write_u8(CATEGORY_UNKNOWN_METHOD);
            writer.write_string(Some(interface))?;
            writer.write_string(Some(method))
        }
        RemotingError::TypeMismatch { expected, actual } => {
            writer.write_u8(CATEGORY_TYPE_MISMATCH);
            writer.write_string(Some(expected))?;
            writer.write_string(Some(actual))
        }
        RemotingError::NotSupported {
            interface,
            method,
            object_id,
        } => {
            writer.write_u8(CATEGORY_NOT_SUPPORTED);
            writer.write_string(Some(interface))?;
            writer.write_string(Some(method))?;
            writer.write_u64(object_id.as_u64());
            Ok(())
        }
        RemotingError::NoSuchObject { object_id } => {
            writer.write_u8(CATEGORY_NO_SUCH_OBJECT);
            writer.write_u64(object_id.as_u64());
            Ok(())
        }
        other => {
            // A failure of the servant's own outgoing calls is an application
            // fault from the caller's point of view.
            writer.write_u8(CATEGORY_FAULT);
            Fault::opaque(std::any::type_name::<RemotingError>(), other.to_string())
                .encode(serializer, writer)
        }
    }
}

fn text(reader: &mut BinaryReader<'_>) -> Result<String, DecodeError> {
    Ok(reader.read_string()?.unwrap_or_default())
}

/// Reads the fault payload of a failed call.
pub(crate) fn decode_error(
    serializer: &Serializer,
    reader: &mut BinaryReader<'_>,
) -> Result<RemotingError, DecodeError> {
    let error = match reader.read_u8()? {
        CATEGORY_FAULT => RemotingError::Fault(Fault::decode(serializer, reader)?),
        CATEGORY_PROTOCOL => RemotingError::Protocol {
            message: text(reader)?,
        },
        CATEGORY_UNKNOWN_METHOD => RemotingError::UnknownMethod {
            interface: text(reader)?,
            method: text(reader)?,
        },
        CATEGORY_TYPE_MISMATCH => RemotingError::TypeMismatch {
            expected: text(reader)?,
            actual: text(reader)?,
        },
        CATEGORY_NOT_SUPPORTED => RemotingError::NotSupported {
            interface: text(reader)?,
            method: text(reader)?,
            object_id: ObjectId::new(reader.read_u64()?),
        },
        CATEGORY_NO_SUCH_OBJECT => RemotingError::NoSuchObject {
            object_id: ObjectId::new(reader.read_u64()?),
        },
        category => {
            return Err(DecodeError::InvalidValue {
                type_name: "fault payload".to_string(),
                reason: format!("unknown category {category}"),
            });
        }
    };
    Ok(error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeModel;

    fn serializer() -> Serializer {
        Serializer::new(Arc::new(TypeModel::new()))
    }

    fn roundtrip(error: &RemotingError, serializer: &Serializer) -> RemotingError {
        let mut writer = BinaryWriter::new();
        encode_error(serializer, &mut writer, error).unwrap();
        let bytes = writer.into_bytes();
        let mut reader = BinaryReader::new(&bytes);
        let decoded = decode_error(serializer, &mut reader).unwrap();
        assert!(reader.is_empty());
        decoded
    }

    #[derive(Debug, Default)]
    struct QuotaExceeded;

    impl fmt::Display for QuotaExceeded {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("quota exceeded")
        }
    }

    impl std::error::Error for QuotaExceeded {}

    #[test]
    fn test_opaque_fault_is_unserializable() {
        let serializer = serializer();
        let error = RemotingError::Fault(Fault::from_error(QuotaExceeded));
        let RemotingError::Fault(fault) = roundtrip(&error, &serializer) else {
            panic!("expected a fault");
        };
        assert!(fault.is_unserializable());
        assert_eq!(fault.message(), "quota exceeded");
        assert!(fault.type_name().ends_with("QuotaExceeded"));
    }

    #[test]
    fn test_substitute_is_used() {
        let serializer = serializer();
        serializer.register_substitute::<QuotaExceeded>();
        let error = RemotingError::Fault(Fault::from_error(QuotaExceeded));
        let RemotingError::Fault(fault) = roundtrip(&error, &serializer) else {
            panic!("expected a fault");
        };
        assert!(!fault.is_unserializable());
        assert!(fault.is::<QuotaExceeded>());
    }

    #[test]
    fn test_protocol_categories() {
        let serializer = serializer();
        let error = RemotingError::NotSupported {
            interface: "Jobs".to_string(),
            method: "run".to_string(),
            object_id: ObjectId::new(7),
        };
        assert!(matches!(
            roundtrip(&error, &serializer),
            RemotingError::NotSupported { object_id, .. } if object_id == ObjectId::new(7)
        ));
        let error = RemotingError::UnknownMethod {
            interface: "Jobs".to_string(),
            method: "walk".to_string(),
        };
        assert!(roundtrip(&error, &serializer).is_protocol_error());
    }
}
