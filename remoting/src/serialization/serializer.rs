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


//! Compiled, type-erased serialization routines.
//!
//! The [`Serializer`] turns [`TypeDescription`]s into a pair of routines per
//! type, one writing a `&dyn Any` and one reading a [`BoxedValue`]. Routines
//! are compiled on first use and cached by [`TypeId`]; composite routines call
//! back into the serializer for their members, so recursive types work.
//!
//! # Wire layout
//!
//! ```text
//! primitive         see codec
//! enum              storage integer
//! Option<T>         0 for None; otherwise the value, preceded by a 1 unless
//!                   T already starts with its own hint byte
//! Vec<T>            1, i32 count, elements
//! data contract     1, fields sorted by name, properties sorted by name
//! singleton         2
//! interface         3, u64 object id, interface name
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use bytes::Bytes;
use parking_lot::RwLock;
#[cfg(feature = "tracing")]
use tracing::debug;

use super::codec::{BinaryReader, BinaryWriter, Hint};
use super::error::{DecodeError, EncodeError, RegistrationError};
use crate::grain::ObjectId;
use crate::types::{
    BoxedValue, EnumShape, InterfaceHooks, MemberValues, NullableShape, Primitive, Remotable,
    SequenceShape, SerializationKind, TypeDescription, TypeModel, TypeRef, TypeShape,
};

type WriteFn =
    dyn Fn(&Serializer, &mut BinaryWriter, &dyn Any) -> Result<(), EncodeError> + Send + Sync;
type ReadFn =
    dyn Fn(&Serializer, &mut BinaryReader<'_>) -> Result<BoxedValue, DecodeError> + Send + Sync;

/// Hosts servants for outgoing interface references and proxies for incoming
/// ones. Implemented by the endpoint.
pub trait ObjectTable: Send + Sync {
    /// Returns the object id under which `value` is exposed, creating a
    /// servant on first sight.
    fn servant_for(&self, value: &dyn Any, hooks: &InterfaceHooks)
    -> Result<ObjectId, EncodeError>;

    /// Returns a proxy for the peer object `object_id`, reusing a live one.
    fn proxy_for(&self, object_id: ObjectId, hooks: &InterfaceHooks)
    -> Result<BoxedValue, DecodeError>;
}

struct Routines {
    description: Arc<TypeDescription>,
    write: Box<WriteFn>,
    read: Box<ReadFn>,
}

#[derive(Clone, Copy)]
enum Member {
    Field(fn(&dyn Any) -> Option<&dyn Any>, TypeRef),
    Property(fn(&dyn Any) -> Option<BoxedValue>, TypeRef),
}

impl Member {
    fn type_ref(&self) -> TypeRef {
        match self {
            Self::Field(_, type_ref) | Self::Property(_, type_ref) => *type_ref,
        }
    }
}

/// Type-directed binary serializer.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use remoting::serialization::Serializer;
/// use remoting::types::TypeModel;
///
/// let serializer = Serializer::new(Arc::new(TypeModel::new()));
/// let bytes = serializer.serialize(&Some("hello".to_string())).unwrap();
/// let value: Option<String> = serializer.deserialize(&bytes).unwrap();
/// assert_eq!(value.as_deref(), Some("hello"));
/// ```
pub struct Serializer {
    model: Arc<TypeModel>,
    routines: RwLock<HashMap<TypeId, Arc<Routines>>>,
    by_rust_name: RwLock<HashMap<&'static str, TypeRef>>,
    substitutes: RwLock<HashMap<&'static str, fn() -> BoxedValue>>,
    objects: OnceLock<Weak<dyn ObjectTable>>,
}

impl Serializer {
    /// Creates a serializer backed by `model`.
    pub fn new(model: Arc<TypeModel>) -> Self {
        Self {
            model,
            routines: RwLock::new(HashMap::new()),
            by_rust_name: RwLock::new(HashMap::new()),
            substitutes: RwLock::new(HashMap::new()),
            objects: OnceLock::new(),
        }
    }

    /// The type model descriptions are taken from.
    pub fn model(&self) -> &Arc<TypeModel> {
        &self.model
    }

    /// Attaches the table that hosts by-reference values. Only the first
    /// attachment takes effect.
    pub(crate) fn attach(&self, objects: Weak<dyn ObjectTable>) -> bool {
        self.objects.set(objects).is_ok()
    }

    fn object_table(&self) -> Option<Arc<dyn ObjectTable>> {
        self.objects.get().and_then(Weak::upgrade)
    }

    /// Validates `T` and every type it is made of, and compiles routines for
    /// them. Types are also registered implicitly on first use.
    ///
    /// # Errors
    ///
    /// Returns the first [`RegistrationError`] found in the type graph.
    pub fn register<T: Remotable>(&self) -> Result<(), RegistrationError> {
        self.routines(TypeRef::of::<T>()).map(|_| ())
    }

    /// Whether routines for `T` have been compiled.
    pub fn is_registered<T: Remotable>(&self) -> bool {
        self.routines.read().contains_key(&TypeId::of::<T>())
    }

    /// Registers `E::default()` as the stand-in for faults of type `E` whose
    /// value cannot be decoded.
    pub fn register_substitute<E>(&self)
    where
        E: Default + std::error::Error + Send + Sync + 'static,
    {
        fn substitute<E: Default + Send + Sync + 'static>() -> BoxedValue {
            Box::new(E::default())
        }
        self.substitutes
            .write()
            .insert(std::any::type_name::<E>(), substitute::<E>);
    }

    pub(crate) fn substitute(&self, rust_name: &str) -> Option<BoxedValue> {
        let factory = *self.substitutes.read().get(rust_name)?;
        Some(factory())
    }

    /// Finds a registered type by its fully qualified Rust name.
    pub fn find_type(&self, rust_name: &str) -> Option<TypeRef> {
        self.by_rust_name.read().get(rust_name).copied()
    }

    /// Returns the description of a registered type.
    pub fn description(&self, type_ref: TypeRef) -> Result<Arc<TypeDescription>, RegistrationError> {
        self.routines(type_ref)
            .map(|routines| Arc::clone(&routines.description))
    }

    fn routines(&self, type_ref: TypeRef) -> Result<Arc<Routines>, RegistrationError> {
        if let Some(routines) = self.routines.read().get(&type_ref.type_id()) {
            return Ok(Arc::clone(routines));
        }
        let description = self.model.describe_ref(type_ref);
        description.validate()?;
        let compiled = Arc::new(self.compile(&description));
        let routines = Arc::clone(
            self.routines
                .write()
                .entry(type_ref.type_id())
                .or_insert(compiled),
        );
        // Dependencies go after the insert so recursive types terminate.
        for dependency in description.dependencies() {
            if let Err(error) = self.routines(dependency) {
                self.routines.write().remove(&type_ref.type_id());
                return Err(error);
            }
        }
        self.by_rust_name
            .write()
            .insert(type_ref.rust_name(), type_ref);
        #[cfg(feature = "tracing")]
        debug!(
            type_name = %description.name(),
            kind = %description.kind(),
            "registered remotable type"
        );
        Ok(routines)
    }

    /// Writes a type-erased value of the type behind `type_ref`.
    pub fn write_dyn(
        &self,
        type_ref: TypeRef,
        writer: &mut BinaryWriter,
        value: &dyn Any,
    ) -> Result<(), EncodeError> {
        let routines = self.routines(type_ref)?;
        (routines.write)(self, writer, value)
    }

    /// Reads a type-erased value of the type behind `type_ref`.
    pub fn read_dyn(
        &self,
        type_ref: TypeRef,
        reader: &mut BinaryReader<'_>,
    ) -> Result<BoxedValue, DecodeError> {
        let routines = self.routines(type_ref)?;
        (routines.read)(self, reader)
    }

    /// Writes `value`.
    pub fn write<T: Remotable>(&self, writer: &mut BinaryWriter, value: &T) -> Result<(), EncodeError> {
        self.write_dyn(TypeRef::of::<T>(), writer, value)
    }

    /// Reads a `T`.
    pub fn read<T: Remotable>(&self, reader: &mut BinaryReader<'_>) -> Result<T, DecodeError> {
        let value = self.read_dyn(TypeRef::of::<T>(), reader)?;
        value
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| DecodeError::InvalidValue {
                type_name: std::any::type_name::<T>().to_string(),
                reason: "routine produced a value of another type".to_string(),
            })
    }

    /// Serializes `value` into a fresh buffer.
    pub fn serialize<T: Remotable>(&self, value: &T) -> Result<Bytes, EncodeError> {
        let mut writer = BinaryWriter::new();
        self.write(&mut writer, value)?;
        Ok(writer.into_bytes())
    }

    /// Deserializes a `T` that must span all of `input`.
    pub fn deserialize<T: Remotable>(&self, input: &[u8]) -> Result<T, DecodeError> {
        let mut reader = BinaryReader::new(input);
        let value = self.read(&mut reader)?;
        reader.finish()?;
        Ok(value)
    }

    fn is_self_hinted(&self, type_ref: TypeRef) -> bool {
        match self.model.describe_ref(type_ref).shape() {
            TypeShape::Primitive(primitive) => primitive.is_self_hinted(),
            TypeShape::Sequence(_) | TypeShape::Composite => true,
            TypeShape::Enum(_) | TypeShape::Nullable(_) => false,
        }
    }

    fn compile(&self, description: &Arc<TypeDescription>) -> Routines {
        let (write, read) = match description.shape() {
            TypeShape::Primitive(primitive) => primitive_routines(*primitive),
            TypeShape::Enum(shape) => enum_routines(description, shape),
            TypeShape::Nullable(shape) => {
                let inner_hinted = self.is_self_hinted(shape.inner);
                nullable_routines(description, shape, inner_hinted)
            }
            TypeShape::Sequence(shape) => sequence_routines(description, shape),
            TypeShape::Composite => match (description.kind(), description.interface()) {
                (SerializationKind::ByReference, Some(hooks)) => reference_routines(*hooks),
                (SerializationKind::Singleton, _) => singleton_routines(description),
                _ => contract_routines(description),
            },
        };
        Routines {
            description: Arc::clone(description),
            write,
            read,
        }
    }
}

impl fmt::Debug for Serializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Serializer")
            .field("model", &self.model)
            .field("registered", &self.routines.read().len())
            .field("substitutes", &self.substitutes.read().len())
            .finish()
    }
}

fn mismatch(type_name: &str) -> EncodeError {
    EncodeError::TypeMismatch {
        expected: type_name.to_string(),
    }
}

fn expect_hint(
    reader: &mut BinaryReader<'_>,
    expected: Hint,
    type_name: &str,
) -> Result<(), DecodeError> {
    match reader.read_hint()? {
        hint if hint == expected => Ok(()),
        Hint::Null => Err(DecodeError::UnexpectedNull {
            type_name: type_name.to_string(),
        }),
        hint => Err(DecodeError::UnexpectedHint {
            type_name: type_name.to_string(),
            hint,
        }),
    }
}

fn leaf<T: Send + Sync + 'static>(
    write: fn(&mut BinaryWriter, &T) -> Result<(), EncodeError>,
    read: fn(&mut BinaryReader<'_>) -> Result<T, DecodeError>,
) -> (Box<WriteFn>, Box<ReadFn>) {
    (
        Box::new(
            move |_: &Serializer, writer: &mut BinaryWriter, value: &dyn Any| -> Result<(), EncodeError> {
                let value = value
                    .downcast_ref::<T>()
                    .ok_or_else(|| mismatch(std::any::type_name::<T>()))?;
                write(writer, value)
            },
        ),
        Box::new(
            move |_: &Serializer, reader: &mut BinaryReader<'_>| -> Result<BoxedValue, DecodeError> {
                Ok(Box::new(read(reader)?))
            },
        ),
    )
}

fn non_null<T>(value: Option<T>, type_name: &str) -> Result<T, DecodeError> {
    value.ok_or_else(|| DecodeError::UnexpectedNull {
        type_name: type_name.to_string(),
    })
}

macro_rules! copied {
    ($ty:ty, $write:ident, $read:ident) => {
        leaf::<$ty>(
            |writer, value| {
                writer.$write(*value);
                Ok(())
            },
            |reader| reader.$read(),
        )
    };
}

macro_rules! borrowed {
    ($ty:ty, $write:ident, $read:ident) => {
        leaf::<$ty>(
            |writer, value| {
                writer.$write(value);
                Ok(())
            },
            |reader| reader.$read(),
        )
    };
}

fn primitive_routines(primitive: Primitive) -> (Box<WriteFn>, Box<ReadFn>) {
    use chrono::{DateTime, Utc};
    use std::net::{IpAddr, SocketAddr};
    use uuid::Uuid;

    use crate::types::Decimal;

    match primitive {
        Primitive::I8 => copied!(i8, write_i8, read_i8),
        Primitive::U8 => copied!(u8, write_u8, read_u8),
        Primitive::I16 => copied!(i16, write_i16, read_i16),
        Primitive::U16 => copied!(u16, write_u16, read_u16),
        Primitive::I32 => copied!(i32, write_i32, read_i32),
        Primitive::U32 => copied!(u32, write_u32, read_u32),
        Primitive::I64 => copied!(i64, write_i64, read_i64),
        Primitive::U64 => copied!(u64, write_u64, read_u64),
        Primitive::F32 => copied!(f32, write_f32, read_f32),
        Primitive::F64 => copied!(f64, write_f64, read_f64),
        Primitive::Bool => copied!(bool, write_bool, read_bool),
        Primitive::Decimal => copied!(Decimal, write_decimal, read_decimal),
        Primitive::DateTime => borrowed!(DateTime<Utc>, write_date_time, read_date_time),
        Primitive::Guid => borrowed!(Uuid, write_guid, read_guid),
        Primitive::IpAddr => borrowed!(IpAddr, write_ip_addr, read_ip_addr),
        Primitive::SocketAddr => borrowed!(SocketAddr, write_socket_addr, read_socket_addr),
        Primitive::String => leaf::<String>(
            |writer, value| writer.write_string(Some(value)),
            |reader| non_null(reader.read_string()?, "String"),
        ),
        Primitive::Bytes => leaf::<Bytes>(
            |writer, value| writer.write_bytes(Some(value)),
            |reader| non_null(reader.read_bytes()?, "Bytes"),
        ),
        Primitive::Unit => leaf::<()>(|_, _| Ok(()), |_| Ok(())),
    }
}

fn write_integer(writer: &mut BinaryWriter, storage: Primitive, raw: i64) {
    // Discriminants are produced by the enum itself and fit their storage.
    match storage {
        Primitive::I8 => writer.write_i8(raw as i8),
        Primitive::U8 => writer.write_u8(raw as u8),
        Primitive::I16 => writer.write_i16(raw as i16),
        Primitive::U16 => writer.write_u16(raw as u16),
        Primitive::I32 => writer.write_i32(raw as i32),
        Primitive::U32 => writer.write_u32(raw as u32),
        Primitive::U64 => writer.write_u64(raw as u64),
        _ => writer.write_i64(raw),
    }
}

fn read_integer(reader: &mut BinaryReader<'_>, storage: Primitive) -> Result<i64, DecodeError> {
    Ok(match storage {
        Primitive::I8 => i64::from(reader.read_i8()?),
        Primitive::U8 => i64::from(reader.read_u8()?),
        Primitive::I16 => i64::from(reader.read_i16()?),
        Primitive::U16 => i64::from(reader.read_u16()?),
        Primitive::I32 => i64::from(reader.read_i32()?),
        Primitive::U32 => i64::from(reader.read_u32()?),
        Primitive::U64 => reader.read_u64()? as i64,
        _ => reader.read_i64()?,
    })
}

fn enum_routines(description: &TypeDescription, shape: &EnumShape) -> (Box<WriteFn>, Box<ReadFn>) {
    let storage = shape.storage;
    let to_value = shape.to_value;
    let from_value = shape.from_value;
    let write_name = description.name().to_string();
    let read_name = write_name.clone();
    (
        Box::new(
            move |_: &Serializer, writer: &mut BinaryWriter, value: &dyn Any| -> Result<(), EncodeError> {
                let raw = to_value(value).ok_or_else(|| mismatch(&write_name))?;
                write_integer(writer, storage, raw);
                Ok(())
            },
        ),
        Box::new(
            move |_: &Serializer, reader: &mut BinaryReader<'_>| -> Result<BoxedValue, DecodeError> {
                let raw = read_integer(reader, storage)?;
                from_value(raw).ok_or_else(|| DecodeError::InvalidValue {
                    type_name: read_name.clone(),
                    reason: format!("{raw} is not a declared value"),
                })
            },
        ),
    )
}

fn nullable_routines(
    description: &TypeDescription,
    shape: &NullableShape,
    inner_hinted: bool,
) -> (Box<WriteFn>, Box<ReadFn>) {
    let inner = shape.inner;
    let project = shape.project;
    let some = shape.some;
    let none = shape.none;
    let write_name = description.name().to_string();
    let read_name = write_name.clone();
    (
        Box::new(
            move |serializer: &Serializer, writer: &mut BinaryWriter, value: &dyn Any| -> Result<(), EncodeError> {
                match project(value) {
                    None => Err(mismatch(&write_name)),
                    Some(None) => {
                        writer.write_hint(Hint::Null);
                        Ok(())
                    }
                    Some(Some(value)) => {
                        if !inner_hinted {
                            writer.write_hint(Hint::Inline);
                        }
                        serializer.write_dyn(inner, writer, value)
                    }
                }
            },
        ),
        Box::new(
            move |serializer: &Serializer, reader: &mut BinaryReader<'_>| -> Result<BoxedValue, DecodeError> {
                if reader.peek_u8()? == Hint::Null as u8 {
                    reader.read_u8()?;
                    return Ok(none());
                }
                if !inner_hinted {
                    expect_hint(reader, Hint::Inline, &read_name)?;
                }
                let value = serializer.read_dyn(inner, reader)?;
                some(value).ok_or_else(|| DecodeError::InvalidValue {
                    type_name: read_name.clone(),
                    reason: "inner value has another type".to_string(),
                })
            },
        ),
    )
}

fn sequence_routines(
    description: &TypeDescription,
    shape: &SequenceShape,
) -> (Box<WriteFn>, Box<ReadFn>) {
    let element = shape.element;
    let items = shape.items;
    let collect = shape.collect;
    let write_name = description.name().to_string();
    let read_name = write_name.clone();
    (
        Box::new(
            move |serializer: &Serializer, writer: &mut BinaryWriter, value: &dyn Any| -> Result<(), EncodeError> {
                let items = items(value).ok_or_else(|| mismatch(&write_name))?;
                let count = i32::try_from(items.len())
                    .map_err(|_| EncodeError::TooLarge { length: items.len() })?;
                writer.write_hint(Hint::Inline);
                writer.write_i32(count);
                for item in items {
                    serializer.write_dyn(element, writer, item)?;
                }
                Ok(())
            },
        ),
        Box::new(
            move |serializer: &Serializer, reader: &mut BinaryReader<'_>| -> Result<BoxedValue, DecodeError> {
                expect_hint(reader, Hint::Inline, &read_name)?;
                let count = reader.read_i32()?;
                let count = usize::try_from(count).map_err(|_| DecodeError::InvalidLength {
                    length: i64::from(count),
                })?;
                let mut values = Vec::with_capacity(count.min(reader.remaining()));
                for _ in 0..count {
                    values.push(serializer.read_dyn(element, reader)?);
                }
                collect(values).ok_or_else(|| DecodeError::InvalidValue {
                    type_name: read_name.clone(),
                    reason: "element has another type".to_string(),
                })
            },
        ),
    )
}

fn contract_routines(description: &TypeDescription) -> (Box<WriteFn>, Box<ReadFn>) {
    let members: Arc<[Member]> = description
        .fields()
        .iter()
        .map(|field| Member::Field(field.getter(), field.type_ref()))
        .chain(
            description
                .properties()
                .iter()
                .map(|property| Member::Property(property.getter(), property.type_ref())),
        )
        .collect();
    let read_members = Arc::clone(&members);
    let constructor = description.constructor();
    let after_deserialize = description.after_deserialize();
    let write_name = description.name().to_string();
    let read_name = write_name.clone();
    (
        Box::new(
            move |serializer: &Serializer, writer: &mut BinaryWriter, value: &dyn Any| -> Result<(), EncodeError> {
                writer.write_hint(Hint::Inline);
                for member in members.iter() {
                    match member {
                        Member::Field(get, type_ref) => {
                            let field = get(value).ok_or_else(|| mismatch(&write_name))?;
                            serializer.write_dyn(*type_ref, writer, field)?;
                        }
                        Member::Property(get, type_ref) => {
                            let property = get(value).ok_or_else(|| mismatch(&write_name))?;
                            serializer.write_dyn(*type_ref, writer, &*property)?;
                        }
                    }
                }
                Ok(())
            },
        ),
        Box::new(
            move |serializer: &Serializer, reader: &mut BinaryReader<'_>| -> Result<BoxedValue, DecodeError> {
                expect_hint(reader, Hint::Inline, &read_name)?;
                let mut values = Vec::with_capacity(read_members.len());
                for member in read_members.iter() {
                    values.push(serializer.read_dyn(member.type_ref(), reader)?);
                }
                let invalid = |reason: &str| DecodeError::InvalidValue {
                    type_name: read_name.clone(),
                    reason: reason.to_string(),
                };
                let constructor = constructor.ok_or_else(|| invalid("no constructor"))?;
                let mut value = constructor(&mut MemberValues::new(values))
                    .ok_or_else(|| invalid("constructor rejected the members"))?;
                if let Some(callback) = after_deserialize {
                    callback(&mut *value);
                }
                Ok(value)
            },
        ),
    )
}

fn singleton_routines(description: &TypeDescription) -> (Box<WriteFn>, Box<ReadFn>) {
    let type_id = description.type_id();
    let factory = description.singleton_factory();
    let write_name = description.name().to_string();
    let read_name = write_name.clone();
    (
        Box::new(
            move |_: &Serializer, writer: &mut BinaryWriter, value: &dyn Any| -> Result<(), EncodeError> {
                if value.type_id() != type_id {
                    return Err(mismatch(&write_name));
                }
                writer.write_hint(Hint::Singleton);
                Ok(())
            },
        ),
        Box::new(
            move |_: &Serializer, reader: &mut BinaryReader<'_>| -> Result<BoxedValue, DecodeError> {
                expect_hint(reader, Hint::Singleton, &read_name)?;
                let factory = factory.ok_or_else(|| DecodeError::InvalidValue {
                    type_name: read_name.clone(),
                    reason: "no instance factory".to_string(),
                })?;
                Ok(factory())
            },
        ),
    )
}

fn reference_routines(hooks: InterfaceHooks) -> (Box<WriteFn>, Box<ReadFn>) {
    (
        Box::new(
            move |serializer: &Serializer, writer: &mut BinaryWriter, value: &dyn Any| -> Result<(), EncodeError> {
                let objects = serializer
                    .object_table()
                    .ok_or_else(|| EncodeError::NoObjectTable {
                        interface: hooks.name.to_string(),
                    })?;
                let object_id = objects.servant_for(value, &hooks)?;
                writer.write_hint(Hint::ByReference);
                writer.write_u64(object_id.as_u64());
                writer.write_string(Some(hooks.name))
            },
        ),
        Box::new(
            move |serializer: &Serializer, reader: &mut BinaryReader<'_>| -> Result<BoxedValue, DecodeError> {
                expect_hint(reader, Hint::ByReference, hooks.name)?;
                let object_id = ObjectId::new(reader.read_u64()?);
                let interface = non_null(reader.read_string()?, hooks.name)?;
                if interface != hooks.name {
                    return Err(DecodeError::InterfaceMismatch {
                        expected: hooks.name.to_string(),
                        actual: interface,
                    });
                }
                let objects = serializer
                    .object_table()
                    .ok_or_else(|| DecodeError::NoObjectTable {
                        interface: hooks.name.to_string(),
                    })?;
                objects.proxy_for(object_id, &hooks)
            },
        ),
    )
}
