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


use std::any::{Any, TypeId};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use super::Remotable;
use crate::grain::{Grain, ProxyObject, Servant};
use crate::serialization::RegistrationError;

/// A type-erased value travelling between the serializer and a description.
pub type BoxedValue = Box<dyn Any + Send + Sync>;

/// Reads a field out of a value without copying it.
pub type FieldGetter = fn(&dyn Any) -> Option<&dyn Any>;

/// Reads a computed property out of a value.
pub type PropertyGetter = fn(&dyn Any) -> Option<BoxedValue>;

/// Builds a value from its members, supplied in stable member order.
pub type Constructor = fn(&mut MemberValues) -> Option<BoxedValue>;

/// How a type crosses an endpoint boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SerializationKind {
    /// The type can never be sent.
    NoneSerializable,
    /// The type is copied by value, member by member.
    DataContract,
    /// The receiver substitutes its own process-wide instance.
    Singleton,
    /// The sender keeps the object and the receiver gets a proxy to it.
    ByReference,
}

impl fmt::Display for SerializationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoneSerializable => "not serializable",
            Self::DataContract => "data contract",
            Self::Singleton => "singleton",
            Self::ByReference => "by reference",
        };
        f.write_str(name)
    }
}

/// Built-in leaf types understood by the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// `i8`
    I8,
    /// `u8`
    U8,
    /// `i16`
    I16,
    /// `u16`
    U16,
    /// `i32`
    I32,
    /// `u32`
    U32,
    /// `i64`
    I64,
    /// `u64`
    U64,
    /// `f32`
    F32,
    /// `f64`
    F64,
    /// [`crate::types::Decimal`]
    Decimal,
    /// `bool`
    Bool,
    /// `String`
    String,
    /// `bytes::Bytes`
    Bytes,
    /// `chrono::DateTime<Utc>`
    DateTime,
    /// `uuid::Uuid`
    Guid,
    /// `std::net::IpAddr`
    IpAddr,
    /// `std::net::SocketAddr`
    SocketAddr,
    /// `()`, encoded as nothing at all.
    Unit,
}

impl Primitive {
    /// The wire name of the primitive.
    pub const fn name(self) -> &'static str {
        match self {
            Self::I8 => "i8",
            Self::U8 => "u8",
            Self::I16 => "i16",
            Self::U16 => "u16",
            Self::I32 => "i32",
            Self::U32 => "u32",
            Self::I64 => "i64",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Decimal => "Decimal",
            Self::Bool => "bool",
            Self::String => "String",
            Self::Bytes => "Bytes",
            Self::DateTime => "DateTime",
            Self::Guid => "Guid",
            Self::IpAddr => "IpAddr",
            Self::SocketAddr => "SocketAddr",
            Self::Unit => "()",
        }
    }

    /// Whether values of this primitive carry their own null marker.
    pub const fn is_self_hinted(self) -> bool {
        matches!(self, Self::String | Self::Bytes)
    }

    /// Whether the primitive can back an enumeration.
    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            Self::I8 | Self::U8 | Self::I16 | Self::U16 | Self::I32 | Self::U32 | Self::I64 | Self::U64
        )
    }
}

/// A lazily resolved reference to another described type.
///
/// Holding a `TypeRef` instead of a full description keeps recursive types
/// finite: the referenced description is only built when someone asks.
#[derive(Clone, Copy)]
pub struct TypeRef {
    type_id: TypeId,
    rust_name: &'static str,
    describe: fn() -> TypeDescription,
}

impl TypeRef {
    /// A reference to `T`.
    pub fn of<T: Remotable>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            rust_name: std::any::type_name::<T>(),
            describe: T::describe,
        }
    }

    /// The runtime identity of the referenced type.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The fully qualified Rust name of the referenced type.
    pub fn rust_name(&self) -> &'static str {
        self.rust_name
    }

    /// Builds the referenced description. Prefer [`crate::types::TypeModel`],
    /// which memoises the result.
    pub fn describe(&self) -> TypeDescription {
        (self.describe)()
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for TypeRef {}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeRef({})", self.rust_name)
    }
}

/// Structural shape of a described type.
pub enum TypeShape {
    /// A leaf value.
    Primitive(Primitive),
    /// A field-less enumeration stored as an integer.
    Enum(EnumShape),
    /// `Option<T>`.
    Nullable(NullableShape),
    /// `Vec<T>`.
    Sequence(SequenceShape),
    /// A user type made of members, a singleton or a remote interface.
    Composite,
}

impl fmt::Debug for TypeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(p) => write!(f, "Primitive({})", p.name()),
            Self::Enum(e) => f
                .debug_struct("Enum")
                .field("storage", &e.storage)
                .field("variants", &e.variants)
                .finish(),
            Self::Nullable(n) => write!(f, "Nullable({:?})", n.inner),
            Self::Sequence(s) => write!(f, "Sequence({:?})", s.element),
            Self::Composite => f.write_str("Composite"),
        }
    }
}

/// Enumeration layout: an integer storage type plus the named values.
pub struct EnumShape {
    pub(crate) storage: Primitive,
    pub(crate) variants: Vec<(String, i64)>,
    pub(crate) to_value: fn(&dyn Any) -> Option<i64>,
    pub(crate) from_value: fn(i64) -> Option<BoxedValue>,
}

impl EnumShape {
    /// The integer type the enumeration is written as.
    pub fn storage(&self) -> Primitive {
        self.storage
    }

    /// Variant names and their discriminants, in declaration order.
    pub fn variants(&self) -> &[(String, i64)] {
        &self.variants
    }
}

/// Layout of `Option<T>`.
pub struct NullableShape {
    pub(crate) inner: TypeRef,
    pub(crate) project: fn(&dyn Any) -> Option<Option<&dyn Any>>,
    pub(crate) some: fn(BoxedValue) -> Option<BoxedValue>,
    pub(crate) none: fn() -> BoxedValue,
}

impl NullableShape {
    /// The type wrapped by the option.
    pub fn inner(&self) -> TypeRef {
        self.inner
    }
}

/// Layout of `Vec<T>`.
pub struct SequenceShape {
    pub(crate) element: TypeRef,
    pub(crate) items: fn(&dyn Any) -> Option<Vec<&dyn Any>>,
    pub(crate) collect: fn(Vec<BoxedValue>) -> Option<BoxedValue>,
}

impl SequenceShape {
    /// The element type.
    pub fn element(&self) -> TypeRef {
        self.element
    }
}

/// A stored member of a data contract.
pub struct FieldDescription {
    name: String,
    type_ref: TypeRef,
    get: FieldGetter,
}

impl FieldDescription {
    /// Member name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Member type.
    pub fn type_ref(&self) -> TypeRef {
        self.type_ref
    }

    pub(crate) fn getter(&self) -> FieldGetter {
        self.get
    }
}

impl fmt::Debug for FieldDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescription")
            .field("name", &self.name)
            .field("type", &self.type_ref)
            .finish()
    }
}

/// A computed member of a data contract. Properties are serialized after all
/// fields and handed to the constructor like any other member.
pub struct PropertyDescription {
    name: String,
    type_ref: TypeRef,
    get: PropertyGetter,
}

impl PropertyDescription {
    /// Member name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Member type.
    pub fn type_ref(&self) -> TypeRef {
        self.type_ref
    }

    pub(crate) fn getter(&self) -> PropertyGetter {
        self.get
    }
}

impl fmt::Debug for PropertyDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescription")
            .field("name", &self.name)
            .field("type", &self.type_ref)
            .finish()
    }
}

/// How a remote method delivers its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodKind {
    /// `async fn` returning `Result<T, E>`; the caller awaits the response.
    Call,
    /// Returns a [`crate::Task`] that must already be started.
    Task,
    /// Exposes an [`crate::Event`]; subscription is forwarded to the peer.
    Event,
}

/// One parameter of a remote method.
#[derive(Debug, Clone)]
pub struct ParameterDescription {
    name: String,
    position: usize,
    type_ref: TypeRef,
}

impl ParameterDescription {
    /// Creates a parameter description.
    pub fn new(name: impl Into<String>, position: usize, type_ref: TypeRef) -> Self {
        Self {
            name: name.into(),
            position,
            type_ref,
        }
    }

    /// Parameter name, or `"return"` for the return parameter.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Zero based position in the argument list.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Parameter type.
    pub fn type_ref(&self) -> TypeRef {
        self.type_ref
    }
}

/// A method exposed by a remote interface.
#[derive(Debug, Clone)]
pub struct MethodDescription {
    name: String,
    kind: MethodKind,
    return_parameter: ParameterDescription,
    parameters: Vec<ParameterDescription>,
}

impl MethodDescription {
    /// Creates a method description.
    pub fn new(
        name: impl Into<String>,
        kind: MethodKind,
        return_type: TypeRef,
        parameters: Vec<ParameterDescription>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            return_parameter: ParameterDescription::new("return", usize::MAX, return_type),
            parameters,
        }
    }

    /// Method name as it appears on the wire.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Delivery style.
    pub fn kind(&self) -> MethodKind {
        self.kind
    }

    /// The return value; for events this is the event argument type.
    pub fn return_parameter(&self) -> &ParameterDescription {
        &self.return_parameter
    }

    /// Parameters in declaration order.
    pub fn parameters(&self) -> &[ParameterDescription] {
        &self.parameters
    }
}

/// Glue between a [`SerializationKind::ByReference`] description and the
/// generated proxy and servant types of one interface.
#[derive(Clone, Copy)]
pub struct InterfaceHooks {
    pub(crate) name: &'static str,
    pub(crate) identity: fn(&dyn Any) -> Option<usize>,
    pub(crate) create_servant: fn(&dyn Any, Grain) -> Option<Arc<dyn Servant>>,
    pub(crate) create_proxy: fn(Grain) -> Arc<dyn ProxyObject>,
    pub(crate) wrap_proxy: fn(Arc<dyn ProxyObject>) -> Option<BoxedValue>,
}

impl InterfaceHooks {
    /// Interface name used on the wire.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for InterfaceHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InterfaceHooks({})", self.name)
    }
}

/// Member values handed to a [`Constructor`], in stable member order.
pub struct MemberValues {
    values: std::vec::IntoIter<BoxedValue>,
}

impl MemberValues {
    pub(crate) fn new(values: Vec<BoxedValue>) -> Self {
        Self {
            values: values.into_iter(),
        }
    }

    /// Takes the next member, or `None` when it is missing or of another type.
    pub fn take<T: 'static>(&mut self) -> Option<T> {
        self.values.next()?.downcast::<T>().ok().map(|value| *value)
    }
}

/// Complete description of one remotable type.
pub struct TypeDescription {
    name: String,
    type_id: TypeId,
    rust_name: &'static str,
    kind: SerializationKind,
    shape: TypeShape,
    fields: Vec<FieldDescription>,
    properties: Vec<PropertyDescription>,
    methods: Vec<MethodDescription>,
    constructor: Option<Constructor>,
    singleton: Option<fn() -> BoxedValue>,
    interface: Option<InterfaceHooks>,
    after_deserialize: Option<fn(&mut dyn Any)>,
}

impl TypeDescription {
    fn bare<T: 'static>(name: impl Into<String>, kind: SerializationKind, shape: TypeShape) -> Self {
        Self {
            name: name.into(),
            type_id: TypeId::of::<T>(),
            rust_name: std::any::type_name::<T>(),
            kind,
            shape,
            fields: Vec::new(),
            properties: Vec::new(),
            methods: Vec::new(),
            constructor: None,
            singleton: None,
            interface: None,
            after_deserialize: None,
        }
    }

    /// Describes a leaf type handled directly by the codec.
    pub fn primitive<T: 'static>(primitive: Primitive) -> Self {
        Self::bare::<T>(
            primitive.name(),
            SerializationKind::DataContract,
            TypeShape::Primitive(primitive),
        )
    }

    /// Describes a field-less enumeration written as its discriminant.
    pub fn enumeration<T: 'static>(
        name: impl Into<String>,
        storage: Primitive,
        variants: Vec<(String, i64)>,
        to_value: fn(&dyn Any) -> Option<i64>,
        from_value: fn(i64) -> Option<BoxedValue>,
    ) -> Self {
        Self::bare::<T>(
            name,
            SerializationKind::DataContract,
            TypeShape::Enum(EnumShape {
                storage,
                variants,
                to_value,
                from_value,
            }),
        )
    }

    pub(crate) fn nullable<T: 'static>(name: impl Into<String>, shape: NullableShape) -> Self {
        Self::bare::<T>(name, SerializationKind::DataContract, TypeShape::Nullable(shape))
    }

    pub(crate) fn sequence<T: 'static>(name: impl Into<String>, shape: SequenceShape) -> Self {
        Self::bare::<T>(name, SerializationKind::DataContract, TypeShape::Sequence(shape))
    }

    /// Starts describing a data contract.
    pub fn data_contract<T: 'static>(name: impl Into<String>) -> DataContractBuilder {
        DataContractBuilder {
            description: Self::bare::<T>(name, SerializationKind::DataContract, TypeShape::Composite),
        }
    }

    /// Describes a singleton; the receiver calls `factory` instead of reading
    /// any members.
    pub fn singleton<T: 'static>(name: impl Into<String>, factory: fn() -> BoxedValue) -> Self {
        let mut description =
            Self::bare::<T>(name, SerializationKind::Singleton, TypeShape::Composite);
        description.singleton = Some(factory);
        description
    }

    /// Describes a type that must never be sent.
    pub fn not_serializable<T: 'static>(name: impl Into<String>) -> Self {
        Self::bare::<T>(name, SerializationKind::NoneSerializable, TypeShape::Composite)
    }

    pub(crate) fn by_reference<T: 'static>(
        hooks: InterfaceHooks,
        methods: Vec<MethodDescription>,
    ) -> Self {
        let mut description =
            Self::bare::<T>(hooks.name, SerializationKind::ByReference, TypeShape::Composite);
        description.interface = Some(hooks);
        description.methods = methods;
        description
    }

    /// Type name. Interfaces are named after their trait.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runtime identity of the described type.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Fully qualified Rust type name.
    pub fn rust_name(&self) -> &'static str {
        self.rust_name
    }

    /// How values of the type cross the boundary.
    pub fn kind(&self) -> SerializationKind {
        self.kind
    }

    /// Structural shape.
    pub fn shape(&self) -> &TypeShape {
        &self.shape
    }

    /// Fields, sorted by name.
    pub fn fields(&self) -> &[FieldDescription] {
        &self.fields
    }

    /// Properties, sorted by name.
    pub fn properties(&self) -> &[PropertyDescription] {
        &self.properties
    }

    /// Remote methods, sorted by name. Empty unless the type is an interface.
    pub fn methods(&self) -> &[MethodDescription] {
        &self.methods
    }

    /// Looks up a remote method by its wire name.
    pub fn method(&self, name: &str) -> Option<&MethodDescription> {
        self.methods.iter().find(|method| method.name == name)
    }

    /// Whether the description carries a constructor.
    pub fn has_constructor(&self) -> bool {
        self.constructor.is_some()
    }

    pub(crate) fn constructor(&self) -> Option<Constructor> {
        self.constructor
    }

    pub(crate) fn singleton_factory(&self) -> Option<fn() -> BoxedValue> {
        self.singleton
    }

    /// Interface glue, present on [`SerializationKind::ByReference`] types.
    pub fn interface(&self) -> Option<&InterfaceHooks> {
        self.interface.as_ref()
    }

    pub(crate) fn after_deserialize(&self) -> Option<fn(&mut dyn Any)> {
        self.after_deserialize
    }

    /// Types the serializer has to know before it can handle this one.
    pub fn dependencies(&self) -> Vec<TypeRef> {
        let mut dependencies: Vec<TypeRef> = self
            .fields
            .iter()
            .map(FieldDescription::type_ref)
            .chain(self.properties.iter().map(PropertyDescription::type_ref))
            .collect();
        match &self.shape {
            TypeShape::Nullable(shape) => dependencies.push(shape.inner),
            TypeShape::Sequence(shape) => dependencies.push(shape.element),
            _ => {}
        }
        dependencies
    }

    /// Checks the description for contradictions.
    ///
    /// # Errors
    ///
    /// - [`RegistrationError::NotSerializable`] for `NoneSerializable` types,
    /// - [`RegistrationError::MissingConstructor`] for a member-wise data
    ///   contract without constructor,
    /// - [`RegistrationError::AmbiguousKind`] when interface glue is combined
    ///   with another kind,
    /// - [`RegistrationError::DuplicateMember`] when two members share a name,
    /// - [`RegistrationError::InvalidEnum`] for enumerations over a
    ///   non-integer storage type.
    pub fn validate(&self) -> Result<(), RegistrationError> {
        let type_name = || self.name.clone();
        match self.kind {
            SerializationKind::NoneSerializable => {
                return Err(RegistrationError::NotSerializable {
                    type_name: type_name(),
                });
            }
            SerializationKind::DataContract => {
                if self.interface.is_some() || self.singleton.is_some() {
                    return Err(RegistrationError::AmbiguousKind {
                        type_name: type_name(),
                    });
                }
                if matches!(self.shape, TypeShape::Composite) && self.constructor.is_none() {
                    return Err(RegistrationError::MissingConstructor {
                        type_name: type_name(),
                    });
                }
            }
            SerializationKind::Singleton => {
                if self.interface.is_some() || !self.fields.is_empty() {
                    return Err(RegistrationError::AmbiguousKind {
                        type_name: type_name(),
                    });
                }
                if self.singleton.is_none() {
                    return Err(RegistrationError::MissingFactory {
                        type_name: type_name(),
                    });
                }
            }
            SerializationKind::ByReference => {
                if self.interface.is_none() {
                    return Err(RegistrationError::MissingInterface {
                        type_name: type_name(),
                    });
                }
                if !self.fields.is_empty() || self.constructor.is_some() {
                    return Err(RegistrationError::AmbiguousKind {
                        type_name: type_name(),
                    });
                }
            }
        }
        if let TypeShape::Enum(shape) = &self.shape {
            if !shape.storage.is_integer() {
                return Err(RegistrationError::InvalidEnum {
                    type_name: type_name(),
                    storage: shape.storage.name(),
                });
            }
        }
        let mut seen = HashSet::new();
        let members = self
            .fields
            .iter()
            .map(FieldDescription::name)
            .chain(self.properties.iter().map(PropertyDescription::name))
            .chain(self.methods.iter().map(MethodDescription::name));
        for member in members {
            if !seen.insert(member) {
                return Err(RegistrationError::DuplicateMember {
                    type_name: type_name(),
                    member: member.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Debug for TypeDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescription")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("shape", &self.shape)
            .field("fields", &self.fields)
            .field("properties", &self.properties)
            .field("methods", &self.methods)
            .finish_non_exhaustive()
    }
}

/// Builder returned by [`TypeDescription::data_contract`].
pub struct DataContractBuilder {
    description: TypeDescription,
}

impl DataContractBuilder {
    /// Adds a stored member.
    pub fn field(mut self, name: impl Into<String>, type_ref: TypeRef, get: FieldGetter) -> Self {
        self.description.fields.push(FieldDescription {
            name: name.into(),
            type_ref,
            get,
        });
        self
    }

    /// Adds a computed member.
    pub fn property(
        mut self,
        name: impl Into<String>,
        type_ref: TypeRef,
        get: PropertyGetter,
    ) -> Self {
        self.description.properties.push(PropertyDescription {
            name: name.into(),
            type_ref,
            get,
        });
        self
    }

    /// Sets the constructor. It receives every field, then every property,
    /// each group sorted by name.
    pub fn constructor(mut self, constructor: Constructor) -> Self {
        self.description.constructor = Some(constructor);
        self
    }

    /// Sets a callback run on every freshly deserialized value.
    pub fn after_deserialize(mut self, callback: fn(&mut dyn Any)) -> Self {
        self.description.after_deserialize = Some(callback);
        self
    }

    /// Finishes the description, putting members into stable order.
    pub fn build(mut self) -> TypeDescription {
        self.description.fields.sort_by(|a, b| a.name.cmp(&b.name));
        self.description.properties.sort_by(|a, b| a.name.cmp(&b.name));
        self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sample {
        b: i32,
        a: String,
    }

    fn get_a(value: &dyn Any) -> Option<&dyn Any> {
        value.downcast_ref::<Sample>().map(|s| &s.a as &dyn Any)
    }

    fn get_b(value: &dyn Any) -> Option<&dyn Any> {
        value.downcast_ref::<Sample>().map(|s| &s.b as &dyn Any)
    }

    fn get_len(value: &dyn Any) -> Option<BoxedValue> {
        value
            .downcast_ref::<Sample>()
            .map(|s| Box::new(s.a.len() as i32) as BoxedValue)
    }

    fn construct(values: &mut MemberValues) -> Option<BoxedValue> {
        let a = values.take::<String>()?;
        let b = values.take::<i32>()?;
        let _len = values.take::<i32>()?;
        Some(Box::new(Sample { a, b }))
    }

    fn sample() -> DataContractBuilder {
        TypeDescription::data_contract::<Sample>("Sample")
            .field("b", TypeRef::of::<i32>(), get_b)
            .property("len", TypeRef::of::<i32>(), get_len)
            .field("a", TypeRef::of::<String>(), get_a)
    }

    #[test]
    fn test_members_are_sorted() {
        let description = sample().constructor(construct).build();
        let names: Vec<_> = description.fields().iter().map(FieldDescription::name).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(description.properties()[0].name(), "len");
        assert!(description.validate().is_ok());
        assert_eq!(description.dependencies().len(), 3);
    }

    #[test]
    fn test_missing_constructor_is_rejected() {
        let description = sample().build();
        assert_eq!(
            description.validate(),
            Err(RegistrationError::MissingConstructor {
                type_name: "Sample".to_string()
            })
        );
    }

    #[test]
    fn test_duplicate_member_is_rejected() {
        let description = sample()
            .field("a", TypeRef::of::<String>(), get_a)
            .constructor(construct)
            .build();
        assert!(matches!(
            description.validate(),
            Err(RegistrationError::DuplicateMember { member, .. }) if member == "a"
        ));
    }

    #[test]
    fn test_not_serializable_is_rejected() {
        let description = TypeDescription::not_serializable::<Sample>("Sample");
        assert!(matches!(
            description.validate(),
            Err(RegistrationError::NotSerializable { .. })
        ));
    }

    #[test]
    fn test_member_values_take_in_order() {
        let values: Vec<BoxedValue> = vec![Box::new(1i32), Box::new("x".to_string())];
        let mut values = MemberValues::new(values);
        assert_eq!(values.take::<i32>(), Some(1));
        assert_eq!(values.take::<i32>(), None);
        assert_eq!(values.take::<String>(), None);
    }
}
