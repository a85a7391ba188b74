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


//! `Remotable` implementations for types owned by other crates.

use std::any::Any;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{
    BoxedValue, Decimal, InterfaceHooks, NullableShape, Primitive, Remotable, SequenceShape,
    TypeDescription, TypeRef,
};
use crate::grain::{Grain, ProxyObject, RemoteInterface, Servant};

macro_rules! remotable_primitive {
    ($($ty:ty => $primitive:ident),* $(,)?) => {
        $(
            impl Remotable for $ty {
                fn describe() -> TypeDescription {
                    TypeDescription::primitive::<$ty>(Primitive::$primitive)
                }
            }
        )*
    };
}

remotable_primitive! {
    i8 => I8,
    u8 => U8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    Decimal => Decimal,
    bool => Bool,
    String => String,
    Bytes => Bytes,
    DateTime<Utc> => DateTime,
    Uuid => Guid,
    IpAddr => IpAddr,
    SocketAddr => SocketAddr,
    () => Unit,
}

fn project_option<T: 'static>(value: &dyn Any) -> Option<Option<&dyn Any>> {
    value
        .downcast_ref::<Option<T>>()
        .map(|option| option.as_ref().map(|inner| inner as &dyn Any))
}

fn wrap_some<T: Send + Sync + 'static>(value: BoxedValue) -> Option<BoxedValue> {
    let value = value.downcast::<T>().ok()?;
    Some(Box::new(Some(*value)))
}

fn none<T: Send + Sync + 'static>() -> BoxedValue {
    Box::new(Option::<T>::None)
}

impl<T: Remotable> Remotable for Option<T> {
    fn describe() -> TypeDescription {
        let inner = TypeRef::of::<T>();
        TypeDescription::nullable::<Self>(
            format!("Option<{}>", inner.rust_name()),
            NullableShape {
                inner,
                project: project_option::<T>,
                some: wrap_some::<T>,
                none: none::<T>,
            },
        )
    }
}

fn sequence_items<T: 'static>(value: &dyn Any) -> Option<Vec<&dyn Any>> {
    value
        .downcast_ref::<Vec<T>>()
        .map(|items| items.iter().map(|item| item as &dyn Any).collect())
}

fn collect_sequence<T: Send + Sync + 'static>(values: Vec<BoxedValue>) -> Option<BoxedValue> {
    let items = values
        .into_iter()
        .map(|value| value.downcast::<T>().ok().map(|item| *item))
        .collect::<Option<Vec<T>>>()?;
    Some(Box::new(items))
}

impl<T: Remotable> Remotable for Vec<T> {
    fn describe() -> TypeDescription {
        let element = TypeRef::of::<T>();
        TypeDescription::sequence::<Self>(
            format!("Vec<{}>", element.rust_name()),
            SequenceShape {
                element,
                items: sequence_items::<T>,
                collect: collect_sequence::<T>,
            },
        )
    }
}

fn subject_identity<I: RemoteInterface + ?Sized>(value: &dyn Any) -> Option<usize> {
    value
        .downcast_ref::<Arc<I>>()
        .map(|subject| Arc::as_ptr(subject) as *const () as usize)
}

fn servant_for<I: RemoteInterface + ?Sized>(value: &dyn Any, grain: Grain) -> Option<Arc<dyn Servant>> {
    let subject = value.downcast_ref::<Arc<I>>()?;
    Some(I::create_servant(Arc::clone(subject), grain))
}

fn wrap_proxy<I: RemoteInterface + ?Sized>(proxy: Arc<dyn ProxyObject>) -> Option<BoxedValue> {
    I::downcast_proxy(proxy).map(|subject| Box::new(subject) as BoxedValue)
}

impl<I: RemoteInterface + ?Sized> Remotable for Arc<I> {
    fn describe() -> TypeDescription {
        let hooks = InterfaceHooks {
            name: I::NAME,
            identity: subject_identity::<I>,
            create_servant: servant_for::<I>,
            create_proxy: I::create_proxy,
            wrap_proxy: wrap_proxy::<I>,
        };
        let mut methods = I::methods();
        methods.sort_by(|a, b| a.name().cmp(b.name()));
        TypeDescription::by_reference::<Self>(hooks, methods)
    }
}
