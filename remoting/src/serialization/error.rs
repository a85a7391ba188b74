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


//! Serialization error types.
//!
//! Three errors cover the life cycle of a value:
//!
//! - [`RegistrationError`]: a type description is contradictory, so the
//!   serializer refuses to compile routines for it,
//! - [`EncodeError`]: a value could not be written,
//! - [`DecodeError`]: bytes could not be turned back into a value.

use thiserror::Error;

use super::codec::Hint;

/// A type description the serializer cannot work with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// The type is marked as never serializable.
    #[error("type {type_name} is not serializable")]
    NotSerializable {
        /// Name of the offending type.
        type_name: String,
    },

    /// A member-wise data contract has no way to be constructed.
    #[error("data contract {type_name} has no constructor")]
    MissingConstructor {
        /// Name of the offending type.
        type_name: String,
    },

    /// A singleton has no instance factory.
    #[error("singleton {type_name} has no instance factory")]
    MissingFactory {
        /// Name of the offending type.
        type_name: String,
    },

    /// A by-reference type has no interface glue.
    #[error("by-reference type {type_name} is not a remote interface")]
    MissingInterface {
        /// Name of the offending type.
        type_name: String,
    },

    /// The description mixes incompatible serialization kinds.
    #[error("type {type_name} combines incompatible serialization kinds")]
    AmbiguousKind {
        /// Name of the offending type.
        type_name: String,
    },

    /// Two members share a name.
    #[error("type {type_name} declares member {member} more than once")]
    DuplicateMember {
        /// Name of the offending type.
        type_name: String,
        /// The duplicated member name.
        member: String,
    },

    /// An enumeration is backed by a non-integer type.
    #[error("enumeration {type_name} cannot be stored as {storage}")]
    InvalidEnum {
        /// Name of the offending type.
        type_name: String,
        /// The rejected storage type.
        storage: &'static str,
    },
}

/// A value that could not be written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// The value's type could not be registered.
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// The routine for one type was handed a value of another type.
    #[error("value is not a {expected}")]
    TypeMismatch {
        /// Name of the type the routine expected.
        expected: String,
    },

    /// A length-prefixed value does not fit the 32-bit length prefix.
    #[error("value of {length} bytes is too large to encode")]
    TooLarge {
        /// Length of the value in bytes.
        length: usize,
    },

    /// A by-reference value was written without an endpoint to host it.
    #[error("cannot encode {interface} by reference without an endpoint")]
    NoObjectTable {
        /// The interface being written.
        interface: String,
    },

    /// The hosting endpoint refused to create a servant.
    #[error("cannot host {interface}: {reason}")]
    ServantUnavailable {
        /// The interface being written.
        interface: String,
        /// Why the servant could not be created.
        reason: String,
    },
}

/// Bytes that could not be turned back into a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The value's type could not be registered.
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// The input ended early.
    #[error("unexpected end of input: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof {
        /// Bytes the reader needed.
        needed: usize,
        /// Bytes that were left.
        remaining: usize,
    },

    /// A hint byte outside the known set.
    #[error("invalid serialization hint {value}")]
    InvalidHint {
        /// The byte that was read.
        value: u8,
    },

    /// A valid hint that does not fit the expected type.
    #[error("unexpected {hint:?} hint for {type_name}")]
    UnexpectedHint {
        /// Name of the type being read.
        type_name: String,
        /// The hint that was read.
        hint: Hint,
    },

    /// A null marker where the type cannot be null.
    #[error("unexpected null for non-nullable {type_name}")]
    UnexpectedNull {
        /// Name of the type being read.
        type_name: String,
    },

    /// A negative or oversized length prefix.
    #[error("invalid length prefix {length}")]
    InvalidLength {
        /// The length that was read.
        length: i64,
    },

    /// A string that is not valid UTF-8.
    #[error("string is not valid UTF-8")]
    InvalidUtf8,

    /// A value that is well-formed but not valid for its type.
    #[error("invalid {type_name}: {reason}")]
    InvalidValue {
        /// Name of the type being read.
        type_name: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A remote reference to another interface than the one expected.
    #[error("expected a reference to {expected} but got {actual}")]
    InterfaceMismatch {
        /// The interface the reader expected.
        expected: String,
        /// The interface named on the wire.
        actual: String,
    },

    /// A by-reference value was read without an endpoint to proxy it.
    #[error("cannot decode {interface} by reference without an endpoint")]
    NoObjectTable {
        /// The interface being read.
        interface: String,
    },

    /// Input continued after the value ended.
    #[error("{remaining} trailing bytes after value")]
    TrailingBytes {
        /// Bytes left over.
        remaining: usize,
    },
}
