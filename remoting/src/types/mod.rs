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


//! Static type descriptions.
//!
//! This module is the type model of the remoting runtime. Every value that
//! crosses an endpoint boundary is described by a [`TypeDescription`]: its
//! name, its [`SerializationKind`], the members it is made of and, for remote
//! interfaces, the methods it exposes. Descriptions are produced by an
//! explicit registration step, the [`Remotable`] trait, which is implemented:
//!
//! - by `#[derive(Remotable)]` for structs and field-less enums,
//! - by hand through [`TypeDescription::data_contract`],
//! - by this crate for primitives, strings, byte arrays, nullable values,
//!   sequences and `Arc<dyn Interface>` handles.
//!
//! Descriptions are memoised by a [`TypeModel`], which is passed explicitly
//! to the serializer instead of living in a process-wide cache.
//!
//! # Stable member order
//!
//! Fields and properties are sorted by name when a description is built. The
//! serializer walks members in exactly that order for both writing and
//! reading, so two endpoints that share a description agree on the layout.
//!
//! # Example
//!
//! ```rust
//! use remoting::types::{Remotable, SerializationKind, TypeModel};
//!
//! #[derive(Remotable)]
//! struct Point {
//!     y: f64,
//!     x: f64,
//! }
//!
//! let model = TypeModel::new();
//! let description = model.describe::<Point>();
//! assert_eq!(description.kind(), SerializationKind::DataContract);
//! let names: Vec<_> = description.fields().iter().map(|f| f.name()).collect();
//! assert_eq!(names, ["x", "y"]);
//! ```

mod builtin;
mod decimal;
mod description;
mod model;

pub use decimal::Decimal;
pub use description::{
    BoxedValue, DataContractBuilder, EnumShape, FieldDescription, InterfaceHooks, MemberValues,
    MethodDescription, MethodKind, NullableShape, ParameterDescription, Primitive,
    PropertyDescription, SequenceShape, SerializationKind, TypeDescription, TypeRef, TypeShape,
};
pub use model::TypeModel;
pub use remoting_macros::Remotable;

/// A type that can be described to, and therefore carried by, the remoting
/// runtime.
///
/// Implementations must be pure: calling [`Remotable::describe`] twice yields
/// equivalent descriptions. Use `#[derive(Remotable)]` for plain data types.
pub trait Remotable: Send + Sync + 'static {
    /// Builds the description of this type.
    fn describe() -> TypeDescription;
}
