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


//! Serialization layer.
//!
//! This module turns values into bytes and back. It consists of:
//!
//! - **[`codec`]**: [`BinaryWriter`] and [`BinaryReader`], the little-endian
//!   leaf encodings and the [`Hint`] byte,
//! - **[`serializer`]**: the [`Serializer`], which compiles per-type routines
//!   from [`crate::types::TypeDescription`]s,
//! - **[`fault`]**: marshalling of remote failures ([`Fault`]),
//! - **[`framing`]**: length-prefixed frames over a byte stream,
//! - **Error types**: [`RegistrationError`], [`EncodeError`] and
//!   [`DecodeError`], all distinct from remote application faults.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use remoting::serialization::{BinaryReader, BinaryWriter, Serializer};
//! use remoting::types::TypeModel;
//!
//! let serializer = Serializer::new(Arc::new(TypeModel::new()));
//! let mut writer = BinaryWriter::new();
//! serializer.write(&mut writer, &i64::MIN).unwrap();
//! serializer.write(&mut writer, &vec![1u16, 2, 3]).unwrap();
//!
//! let bytes = writer.into_bytes();
//! let mut reader = BinaryReader::new(&bytes);
//! assert_eq!(serializer.read::<i64>(&mut reader).unwrap(), i64::MIN);
//! assert_eq!(serializer.read::<Vec<u16>>(&mut reader).unwrap(), [1, 2, 3]);
//! ```

pub mod codec;
pub mod error;
pub mod fault;
pub mod framing;
pub mod serializer;

pub use codec::{BinaryReader, BinaryWriter, Hint};
pub use error::{DecodeError, EncodeError, RegistrationError};
pub use fault::Fault;
pub use serializer::{ObjectTable, Serializer};
