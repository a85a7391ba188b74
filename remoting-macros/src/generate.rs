//! Code generation for the `#[remoting::interface]` macro.
//!
//! For an interface `Foo` this module generates:
//! - `FooProxy`, implementing `Foo` by forwarding through a grain,
//! - `FooServant`, dispatching calls onto an `Arc<dyn Foo>` subject,
//! - `impl RemoteInterface for dyn Foo`,
//!
//! plus hidden helpers that let the proxies and servants of derived
//! interfaces reuse this interface's methods and events.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{Ident, ItemTrait, Path, TypeParamBound, parse_quote};

use crate::parse::{InterfaceDef, MethodDef, MethodShape};

/// Names of everything generated for one interface.
struct Names {
    proxy: Ident,
    proxy_impl: Ident,
    servant: Ident,
    events: Ident,
    forwarders: Ident,
    dispatch: Ident,
}

impl Names {
    fn of(ident: &Ident) -> Self {
        Self {
            proxy: format_ident!("{}Proxy", ident),
            proxy_impl: format_ident!("{}ProxyImpl", ident),
            servant: format_ident!("{}Servant", ident),
            events: format_ident!("__{}ProxyEvents", ident),
            forwarders: format_ident!("__{}EventForwarders", ident),
            dispatch: format_ident!("__{}Dispatch", ident),
        }
    }
}

/// An interface ancestor and the paths of its generated helpers.
struct Ancestor {
    path: Path,
    field: Ident,
    proxy_impl: Path,
    events: Path,
    forwarders: Path,
    dispatch: Path,
}

impl Ancestor {
    fn new(path: &Path) -> Option<Self> {
        let ident = &path.segments.last()?.ident;
        let names = Names::of(ident);
        let sibling = |name: &Ident| {
            let mut sibling = path.clone();
            if let Some(last) = sibling.segments.last_mut() {
                last.ident = name.clone();
                last.arguments = syn::PathArguments::None;
            }
            sibling
        };
        Some(Self {
            path: path.clone(),
            field: format_ident!("__{}", snake_case(&ident.to_string())),
            proxy_impl: sibling(&names.proxy_impl),
            events: sibling(&names.events),
            forwarders: sibling(&names.forwarders),
            dispatch: sibling(&names.dispatch),
        })
    }
}

fn snake_case(name: &str) -> String {
    let mut snake = String::with_capacity(name.len() + 4);
    for (index, ch) in name.chars().enumerate() {
        if ch.is_uppercase() {
            if index > 0 {
                snake.push('_');
            }
            snake.extend(ch.to_lowercase());
        } else {
            snake.push(ch);
        }
    }
    snake
}

/// Expands the whole interface.
pub fn expand(mut item: ItemTrait, def: &InterfaceDef) -> TokenStream {
    add_thread_bounds(&mut item);
    let names = Names::of(&def.ident);
    let ancestors: Vec<Ancestor> = def.ancestors.iter().filter_map(Ancestor::new).collect();

    let proxy_events = generate_proxy_events(def, &names);
    let proxy_blanket = generate_proxy_blanket(def, &names, &ancestors);
    let proxy = generate_proxy(def, &names, &ancestors);
    let forwarders = generate_forwarders(def, &names);
    let dispatch = generate_dispatch(def, &names);
    let servant = generate_servant(def, &names, &ancestors);
    let remote_interface = generate_remote_interface(def, &names, &ancestors);

    quote! {
        #[::remoting::async_trait]
        #item

        #proxy_events
        #proxy_blanket
        #proxy
        #forwarders
        #dispatch
        #servant
        #remote_interface
    }
}

/// Interfaces are shared across tasks, so every one is `Send + Sync + 'static`.
fn add_thread_bounds(item: &mut ItemTrait) {
    let has = |name: &str| {
        item.supertraits.iter().any(|bound| match bound {
            TypeParamBound::Trait(bound) => bound.path.is_ident(name),
            TypeParamBound::Lifetime(lifetime) => name == "'static" && lifetime.ident == "static",
            _ => false,
        })
    };
    let (send, sync, stat) = (has("Send"), has("Sync"), has("'static"));
    if !send {
        item.supertraits.push(parse_quote!(::core::marker::Send));
    }
    if !sync {
        item.supertraits.push(parse_quote!(::core::marker::Sync));
    }
    if !stat {
        item.supertraits.push(parse_quote!('static));
    }
    if item.colon_token.is_none() {
        item.colon_token = Some(Default::default());
    }
}

fn argument_idents(method: &MethodDef) -> Vec<Ident> {
    (0..method.params.len())
        .map(|position| format_ident!("__arg{}", position))
        .collect()
}

fn generate_proxy_events(def: &InterfaceDef, names: &Names) -> TokenStream {
    let vis = &def.vis;
    let events = &names.events;
    let idents: Vec<_> = def.events().map(|(method, _)| &method.ident).collect();
    let wire: Vec<_> = def.events().map(|(method, _)| &method.name).collect();
    let payloads: Vec<_> = def.events().map(|(_, payload)| payload).collect();

    quote! {
        #[doc(hidden)]
        #vis struct #events {
            #( #idents: ::remoting::Event<#payloads>, )*
        }

        impl #events {
            #[doc(hidden)]
            #[allow(unused_variables)]
            pub fn new(grain: &::remoting::Grain, interface: &'static str) -> Self {
                Self {
                    #( #idents: ::remoting::Event::remote(
                        ::core::clone::Clone::clone(grain),
                        interface,
                        #wire,
                    ), )*
                }
            }

            /// Raises the local event `event` with a value pushed by the servant.
            #[doc(hidden)]
            #[allow(unused_variables)]
            pub async fn deliver(
                &self,
                grain: &::remoting::Grain,
                event: &str,
                arguments: &mut ::remoting::serialization::BinaryReader<'_>,
            ) -> ::core::result::Result<bool, ::remoting::RemotingError> {
                match event {
                    #( #wire => {
                        let value = grain.serializer().read::<#payloads>(arguments)?;
                        self.#idents.raise(value).await?;
                        ::core::result::Result::Ok(true)
                    } )*
                    _ => ::core::result::Result::Ok(false),
                }
            }
        }
    }
}

/// Builds the call expression shared by ordinary and task methods.
fn prepared_call(method: &MethodDef, grain: TokenStream) -> TokenStream {
    let wire = &method.name;
    let args = argument_idents(method);
    quote! {
        ::core::result::Result::<_, ::remoting::RemotingError>::Ok(#grain.call(interface, #wire))
            #( .and_then(|call| call.argument(&#args)) )*
    }
}

fn generate_proxy_blanket(def: &InterfaceDef, names: &Names, ancestors: &[Ancestor]) -> TokenStream {
    let vis = &def.vis;
    let trait_ident = &def.ident;
    let proxy_impl = &names.proxy_impl;
    let events = &names.events;
    let ancestor_impls = ancestors.iter().map(|ancestor| &ancestor.proxy_impl);

    let methods = def.methods.iter().map(|method| {
        let ident = &method.ident;
        let output = &method.output;
        let args = argument_idents(method);
        let types = method.params.iter().map(|param| &param.ty);
        match &method.shape {
            MethodShape::Call { output: value } => {
                let prepared = prepared_call(method, quote!(grain));
                quote! {
                    async fn #ident(&self, #( #args: #types ),*) #output {
                        let grain = ::remoting::ProxyObject::grain(self);
                        let interface = ::remoting::ProxyObject::interface_name(self);
                        let prepared = #prepared;
                        let result = match prepared {
                            ::core::result::Result::Ok(call) => call.returning::<#value>().await,
                            ::core::result::Result::Err(error) => ::core::result::Result::Err(error),
                        };
                        result.map_err(::core::convert::From::from)
                    }
                }
            }
            MethodShape::Task { output: value } => {
                let prepared = prepared_call(method, quote!(grain));
                quote! {
                    fn #ident(&self, #( #args: #types ),*) #output {
                        let grain = ::core::clone::Clone::clone(::remoting::ProxyObject::grain(self));
                        let interface = ::remoting::ProxyObject::interface_name(self);
                        ::remoting::Task::spawn(async move {
                            let prepared = #prepared;
                            match prepared {
                                ::core::result::Result::Ok(call) => call.returning::<#value>().await,
                                ::core::result::Result::Err(error) => ::core::result::Result::Err(error),
                            }
                        })
                    }
                }
            }
            MethodShape::Event { .. } => quote! {
                fn #ident(&self) #output {
                    &<Self as #proxy_impl>::proxy_events(self).#ident
                }
            },
        }
    });

    quote! {
        #[doc(hidden)]
        #vis trait #proxy_impl: ::remoting::ProxyObject #( + #ancestor_impls )* {
            #[doc(hidden)]
            fn proxy_events(&self) -> &#events;
        }

        #[::remoting::async_trait]
        impl<P: #proxy_impl> #trait_ident for P {
            #( #methods )*
        }
    }
}

fn generate_proxy(def: &InterfaceDef, names: &Names, ancestors: &[Ancestor]) -> TokenStream {
    let vis = &def.vis;
    let trait_ident = &def.ident;
    let wire = &def.name;
    let Names {
        proxy,
        proxy_impl,
        events,
        ..
    } = names;
    let fields: Vec<_> = ancestors.iter().map(|ancestor| &ancestor.field).collect();
    let ancestor_events: Vec<_> = ancestors.iter().map(|ancestor| &ancestor.events).collect();
    let ancestor_impls: Vec<_> = ancestors.iter().map(|ancestor| &ancestor.proxy_impl).collect();
    let doc = format!("Forwards [`{trait_ident}`] calls to an object living on the peer.");

    quote! {
        #[doc = #doc]
        #vis struct #proxy {
            grain: ::remoting::Grain,
            events: #events,
            #( #fields: #ancestor_events, )*
        }

        impl #proxy {
            /// Creates a proxy for the object behind `grain`.
            pub fn new(grain: ::remoting::Grain) -> Self {
                Self {
                    events: #events::new(&grain, #wire),
                    #( #fields: #ancestor_events::new(&grain, #wire), )*
                    grain,
                }
            }
        }

        impl ::core::fmt::Debug for #proxy {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.debug_struct(stringify!(#proxy))
                    .field("object_id", &self.grain.object_id())
                    .finish_non_exhaustive()
            }
        }

        #[::remoting::async_trait]
        impl ::remoting::ProxyObject for #proxy {
            fn grain(&self) -> &::remoting::Grain {
                &self.grain
            }

            fn interface_name(&self) -> &'static str {
                #wire
            }

            async fn invoke_event(
                &self,
                event: &str,
                arguments: &mut ::remoting::serialization::BinaryReader<'_>,
            ) -> ::core::result::Result<(), ::remoting::RemotingError> {
                if self.events.deliver(&self.grain, event, arguments).await? {
                    return ::core::result::Result::Ok(());
                }
                #(
                    if self.#fields.deliver(&self.grain, event, arguments).await? {
                        return ::core::result::Result::Ok(());
                    }
                )*
                ::core::result::Result::Err(::remoting::RemotingError::UnknownMethod {
                    interface: ::std::string::ToString::to_string(#wire),
                    method: ::std::string::ToString::to_string(event),
                })
            }

            fn into_any(
                self: ::std::sync::Arc<Self>,
            ) -> ::std::sync::Arc<dyn ::core::any::Any + ::core::marker::Send + ::core::marker::Sync> {
                self
            }
        }

        impl #proxy_impl for #proxy {
            fn proxy_events(&self) -> &#events {
                &self.events
            }
        }

        #(
            impl #ancestor_impls for #proxy {
                fn proxy_events(&self) -> &#ancestor_events {
                    &self.#fields
                }
            }
        )*
    }
}

fn generate_forwarders(def: &InterfaceDef, names: &Names) -> TokenStream {
    let vis = &def.vis;
    let trait_ident = &def.ident;
    let forwarders = &names.forwarders;
    let idents: Vec<_> = def.events().map(|(method, _)| &method.ident).collect();
    let wire: Vec<_> = def.events().map(|(method, _)| &method.name).collect();

    quote! {
        #[doc(hidden)]
        #vis struct #forwarders {
            #( #idents: ::remoting::EventForwarder, )*
        }

        impl #forwarders {
            #[doc(hidden)]
            #[allow(unused_variables)]
            pub fn attach<S: #trait_ident + ?Sized>(
                subject: &S,
                grain: &::remoting::Grain,
                interface: &'static str,
            ) -> Self {
                Self {
                    #( #idents: ::remoting::EventForwarder::attach(
                        <S as #trait_ident>::#idents(subject),
                        grain,
                        interface,
                        #wire,
                    ), )*
                }
            }

            #[doc(hidden)]
            #[allow(unused_variables)]
            pub fn detach<S: #trait_ident + ?Sized>(&self, subject: &S) {
                #( self.#idents.detach(<S as #trait_ident>::#idents(subject)); )*
            }

            #[doc(hidden)]
            pub fn clear_subscriptions(&self) {
                #( self.#idents.set_subscribed(false); )*
            }

            #[doc(hidden)]
            #[allow(unused_variables)]
            pub fn set_subscribed(&self, event: &str, subscribed: bool) -> bool {
                match event {
                    #( #wire => {
                        self.#idents.set_subscribed(subscribed);
                        true
                    } )*
                    _ => false,
                }
            }
        }
    }
}

fn generate_dispatch(def: &InterfaceDef, names: &Names) -> TokenStream {
    let vis = &def.vis;
    let trait_ident = &def.ident;
    let dispatch = &names.dispatch;

    let mut wire_names: Vec<&str> = def.dispatched().map(|method| method.name.as_str()).collect();
    wire_names.sort_unstable();
    wire_names.dedup();

    let arms = def.dispatched().filter_map(|method| {
        let ident = &method.ident;
        let wire = &method.name;
        let args = argument_idents(method);
        let types: Vec<_> = method.params.iter().map(|param| &param.ty).collect();
        let invoke = match &method.shape {
            MethodShape::Call { .. } => quote! {
                let value = <S as #trait_ident>::#ident(subject, #( #args ),*)
                    .await
                    .map_err(::core::convert::Into::<::remoting::RemotingError>::into)?;
            },
            MethodShape::Task { .. } => quote! {
                let task = <S as #trait_ident>::#ident(subject, #( #args ),*);
                if !task.is_started() {
                    return ::core::result::Result::Err(::remoting::RemotingError::NotSupported {
                        interface: ::std::string::ToString::to_string(interface),
                        method: ::std::string::ToString::to_string(#wire),
                        object_id: grain.object_id(),
                    });
                }
                let value = task.await?;
            },
            MethodShape::Event { .. } => return None,
        };
        Some(quote! {
            #wire => async {
                #( let #args = serializer.read::<#types>(arguments)?; )*
                #invoke
                serializer.write(result, &value)?;
                ::core::result::Result::Ok::<(), ::remoting::RemotingError>(())
            }
            .await,
        })
    });

    quote! {
        #[doc(hidden)]
        #vis struct #dispatch;

        impl #dispatch {
            /// Call and task methods declared by this interface, sorted.
            #[doc(hidden)]
            pub const METHODS: &'static [&'static str] = &[#( #wire_names ),*];

            /// Runs `method` on `subject`; `None` if the interface does not
            /// declare it.
            #[doc(hidden)]
            #[allow(unused_variables)]
            pub async fn invoke<S: #trait_ident + ?Sized>(
                subject: &S,
                grain: &::remoting::Grain,
                interface: &'static str,
                method: &str,
                arguments: &mut ::remoting::serialization::BinaryReader<'_>,
                result: &mut ::remoting::serialization::BinaryWriter,
            ) -> ::core::option::Option<::core::result::Result<(), ::remoting::RemotingError>> {
                let serializer = grain.serializer();
                let outcome = match method {
                    #( #arms )*
                    _ => return ::core::option::Option::None,
                };
                ::core::option::Option::Some(outcome)
            }
        }
    }
}

fn generate_servant(def: &InterfaceDef, names: &Names, ancestors: &[Ancestor]) -> TokenStream {
    let vis = &def.vis;
    let trait_ident = &def.ident;
    let wire = &def.name;
    let Names {
        servant,
        forwarders,
        dispatch,
        ..
    } = names;
    let fields: Vec<_> = ancestors.iter().map(|ancestor| &ancestor.field).collect();
    let ancestor_forwarders: Vec<_> = ancestors.iter().map(|a| &a.forwarders).collect();
    let ancestor_dispatch: Vec<_> = ancestors.iter().map(|a| &a.dispatch).collect();
    let doc = format!("Dispatches remote calls onto a local [`{trait_ident}`].");

    quote! {
        #[doc = #doc]
        #vis struct #servant {
            grain: ::remoting::Grain,
            subject: ::std::sync::Arc<dyn #trait_ident>,
            forwarders: #forwarders,
            #( #fields: #ancestor_forwarders, )*
        }

        impl #servant {
            /// Wraps `subject` and attaches forwarders to its events.
            pub fn new(subject: ::std::sync::Arc<dyn #trait_ident>, grain: ::remoting::Grain) -> Self {
                Self {
                    forwarders: #forwarders::attach(&*subject, &grain, #wire),
                    #( #fields: #ancestor_forwarders::attach(&*subject, &grain, #wire), )*
                    subject,
                    grain,
                }
            }

            fn set_subscribed(&self, event: &str, subscribed: bool) -> bool {
                self.forwarders.set_subscribed(event, subscribed)
                    #( || self.#fields.set_subscribed(event, subscribed) )*
            }
        }

        impl ::core::ops::Drop for #servant {
            fn drop(&mut self) {
                self.forwarders.detach(&*self.subject);
                #( self.#fields.detach(&*self.subject); )*
            }
        }

        impl ::core::fmt::Debug for #servant {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.debug_struct(stringify!(#servant))
                    .field("object_id", &self.grain.object_id())
                    .finish_non_exhaustive()
            }
        }

        #[::remoting::async_trait]
        impl ::remoting::Servant for #servant {
            fn object_id(&self) -> ::remoting::ObjectId {
                self.grain.object_id()
            }

            fn interface_name(&self) -> &'static str {
                #wire
            }

            fn subject(&self) -> &(dyn ::core::any::Any + ::core::marker::Send + ::core::marker::Sync) {
                &self.subject
            }

            fn connection_closed(&self) {
                self.forwarders.clear_subscriptions();
                #( self.#fields.clear_subscriptions(); )*
            }

            fn methods(&self) -> ::std::vec::Vec<&'static str> {
                let mut methods = #dispatch::METHODS.to_vec();
                #( methods.extend_from_slice(#ancestor_dispatch::METHODS); )*
                methods.sort_unstable();
                methods.dedup();
                methods
            }

            async fn invoke(
                &self,
                method: &str,
                arguments: &mut ::remoting::serialization::BinaryReader<'_>,
                result: &mut ::remoting::serialization::BinaryWriter,
            ) -> ::core::result::Result<(), ::remoting::RemotingError> {
                if let ::core::option::Option::Some(event) = method.strip_prefix('+') {
                    if self.set_subscribed(event, true) {
                        return ::core::result::Result::Ok(());
                    }
                } else if let ::core::option::Option::Some(event) = method.strip_prefix('-') {
                    if self.set_subscribed(event, false) {
                        return ::core::result::Result::Ok(());
                    }
                }
                let subject = &*self.subject;
                if let ::core::option::Option::Some(outcome) =
                    #dispatch::invoke(subject, &self.grain, #wire, method, arguments, result).await
                {
                    return outcome;
                }
                #(
                    if let ::core::option::Option::Some(outcome) =
                        #ancestor_dispatch::invoke(subject, &self.grain, #wire, method, arguments, result).await
                    {
                        return outcome;
                    }
                )*
                ::core::result::Result::Err(::remoting::RemotingError::UnknownMethod {
                    interface: ::std::string::ToString::to_string(#wire),
                    method: ::std::string::ToString::to_string(method),
                })
            }
        }
    }
}

fn method_description(method: &MethodDef) -> TokenStream {
    let wire = &method.name;
    let (kind, value) = match &method.shape {
        MethodShape::Call { output } => (quote!(Call), output),
        MethodShape::Task { output } => (quote!(Task), output),
        MethodShape::Event { payload } => (quote!(Event), payload),
    };
    let parameters = method.params.iter().enumerate().map(|(position, param)| {
        let name = &param.name;
        let ty = &param.ty;
        quote! {
            ::remoting::types::ParameterDescription::new(
                #name,
                #position,
                ::remoting::types::TypeRef::of::<#ty>(),
            )
        }
    });
    quote! {
        ::remoting::types::MethodDescription::new(
            #wire,
            ::remoting::types::MethodKind::#kind,
            ::remoting::types::TypeRef::of::<#value>(),
            ::std::vec![#( #parameters ),*],
        )
    }
}

fn generate_remote_interface(
    def: &InterfaceDef,
    names: &Names,
    ancestors: &[Ancestor],
) -> TokenStream {
    let trait_ident = &def.ident;
    let wire = &def.name;
    let Names { proxy, servant, .. } = names;
    let descriptions = def.methods.iter().map(method_description);
    let ancestor_paths = ancestors.iter().map(|ancestor| &ancestor.path);

    quote! {
        impl ::remoting::RemoteInterface for dyn #trait_ident {
            const NAME: &'static str = #wire;

            fn methods() -> ::std::vec::Vec<::remoting::types::MethodDescription> {
                #[allow(unused_mut)]
                let mut methods: ::std::vec::Vec<::remoting::types::MethodDescription> =
                    ::std::vec![#( #descriptions ),*];
                #(
                    for inherited in <dyn #ancestor_paths as ::remoting::RemoteInterface>::methods() {
                        if !methods.iter().any(|method| method.name() == inherited.name()) {
                            methods.push(inherited);
                        }
                    }
                )*
                methods.sort_by(|a, b| a.name().cmp(b.name()));
                methods
            }

            fn create_proxy(
                grain: ::remoting::Grain,
            ) -> ::std::sync::Arc<dyn ::remoting::ProxyObject> {
                ::std::sync::Arc::new(#proxy::new(grain))
            }

            fn downcast_proxy(
                proxy: ::std::sync::Arc<dyn ::remoting::ProxyObject>,
            ) -> ::core::option::Option<::std::sync::Arc<Self>> {
                ::remoting::ProxyObject::into_any(proxy)
                    .downcast::<#proxy>()
                    .ok()
                    .map(|proxy| proxy as ::std::sync::Arc<Self>)
            }

            fn create_servant(
                subject: ::std::sync::Arc<Self>,
                grain: ::remoting::Grain,
            ) -> ::std::sync::Arc<dyn ::remoting::Servant> {
                ::std::sync::Arc::new(#servant::new(subject, grain))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_case() {
        assert_eq!(snake_case("Calculator"), "calculator");
        assert_eq!(snake_case("JobQueue"), "job_queue");
    }

    #[test]
    fn test_ancestor_paths() {
        let path: Path = parse_quote!(crate::shapes::Shape);
        let ancestor = Ancestor::new(&path).unwrap();
        let events = &ancestor.events;
        assert_eq!(
            quote!(#events).to_string(),
            quote!(crate::shapes::__ShapeProxyEvents).to_string()
        );
        assert_eq!(ancestor.field, "__shape");
    }
}
