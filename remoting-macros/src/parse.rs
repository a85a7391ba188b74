//! Parsing logic for the `#[remoting::interface]` macro.
//!
//! This module turns a trait definition into an [`InterfaceDef`]: the wire
//! name, the interface ancestors, and every method classified by the way it
//! delivers its result.

use syn::{
    Error, FnArg, GenericArgument, Ident, ItemTrait, LitStr, Pat, Path, PathArguments, Result,
    ReturnType, TraitItem, TraitItemFn, Type, TypeParamBound, Visibility,
};

/// Marker traits that are not interface ancestors.
const MARKER_TRAITS: &[&str] = &["Send", "Sync", "Sized", "Unpin", "Any"];

/// Arguments of the attribute itself.
#[derive(Debug, Default)]
pub struct InterfaceArgs {
    /// Wire name overriding the trait name.
    pub name: Option<String>,
}

impl InterfaceArgs {
    /// Parses `name = "..."`.
    pub fn parse(tokens: proc_macro2::TokenStream) -> Result<Self> {
        let mut args = Self::default();
        let parser = syn::meta::parser(|meta| {
            if meta.path.is_ident("name") {
                let value: LitStr = meta.value()?.parse()?;
                args.name = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("unknown attribute, supported: name"))
            }
        });
        syn::parse::Parser::parse2(parser, tokens)?;
        Ok(args)
    }
}

/// Parsed interface definition.
#[derive(Debug)]
pub struct InterfaceDef {
    /// Visibility of the trait, reused for everything generated.
    pub vis: Visibility,
    /// The trait name.
    pub ident: Ident,
    /// Name used on the wire.
    pub name: String,
    /// Interface supertraits. Every interface ancestor has to be listed.
    pub ancestors: Vec<Path>,
    /// Methods in declaration order.
    pub methods: Vec<MethodDef>,
}

impl InterfaceDef {
    /// Methods answered by the servant's dispatch table: calls and tasks.
    pub fn dispatched(&self) -> impl Iterator<Item = &MethodDef> {
        self.methods
            .iter()
            .filter(|method| !matches!(method.shape, MethodShape::Event { .. }))
    }

    /// Event accessors.
    pub fn events(&self) -> impl Iterator<Item = (&MethodDef, &Type)> {
        self.methods.iter().filter_map(|method| match &method.shape {
            MethodShape::Event { payload } => Some((method, payload)),
            _ => None,
        })
    }
}

/// How a method delivers its result.
#[derive(Debug)]
pub enum MethodShape {
    /// `async fn m(&self, ..) -> Result<T, E>`
    Call {
        /// `T`
        output: Type,
    },
    /// `fn m(&self, ..) -> Task<T>`
    Task {
        /// `T`
        output: Type,
    },
    /// `fn e(&self) -> &Event<T>`
    Event {
        /// `T`
        payload: Type,
    },
}

/// Parsed method definition.
#[derive(Debug)]
pub struct MethodDef {
    /// Method name
    pub ident: Ident,
    /// Name used on the wire.
    pub name: String,
    /// Delivery style
    pub shape: MethodShape,
    /// Parameters, excluding the receiver
    pub params: Vec<ParamDef>,
    /// Declared return type, reused verbatim in generated impls
    pub output: ReturnType,
}

/// Parsed parameter definition.
#[derive(Debug)]
pub struct ParamDef {
    /// Name recorded in the method description.
    pub name: String,
    /// Parameter type
    pub ty: Type,
}

/// Parses a trait annotated with `#[remoting::interface]`.
pub fn parse_interface(item: &ItemTrait, args: InterfaceArgs) -> Result<InterfaceDef> {
    if !item.generics.params.is_empty() || item.generics.where_clause.is_some() {
        return Err(Error::new_spanned(
            &item.generics,
            "remote interfaces cannot be generic",
        ));
    }
    if let Some(unsafety) = &item.unsafety {
        return Err(Error::new_spanned(unsafety, "remote interfaces cannot be unsafe"));
    }

    let ancestors = item
        .supertraits
        .iter()
        .filter_map(|bound| match bound {
            TypeParamBound::Trait(bound) => Some(&bound.path),
            _ => None,
        })
        .filter(|path| {
            path.segments
                .last()
                .is_some_and(|segment| !MARKER_TRAITS.iter().any(|m| segment.ident == m))
        })
        .cloned()
        .collect();

    let mut methods = Vec::new();
    for trait_item in &item.items {
        match trait_item {
            TraitItem::Fn(method) => methods.push(parse_method(method)?),
            other => {
                return Err(Error::new_spanned(
                    other,
                    "remote interfaces may only contain methods",
                ));
            }
        }
    }

    Ok(InterfaceDef {
        vis: item.vis.clone(),
        ident: item.ident.clone(),
        name: args.name.unwrap_or_else(|| unraw(&item.ident)),
        ancestors,
        methods,
    })
}

fn parse_method(method: &TraitItemFn) -> Result<MethodDef> {
    let sig = &method.sig;
    if !sig.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &sig.generics,
            "remote methods cannot be generic",
        ));
    }

    let mut inputs = sig.inputs.iter();
    match inputs.next() {
        Some(FnArg::Receiver(receiver))
            if receiver.reference.is_some() && receiver.mutability.is_none() => {}
        _ => {
            return Err(Error::new_spanned(
                sig,
                "remote methods must take `&self`",
            ));
        }
    }

    let mut params = Vec::new();
    for (position, input) in inputs.enumerate() {
        let FnArg::Typed(typed) = input else {
            continue;
        };
        if matches!(*typed.ty, Type::Reference(_)) {
            return Err(Error::new_spanned(
                &typed.ty,
                "parameters of remote methods must be owned remotable types",
            ));
        }
        let name = match &*typed.pat {
            Pat::Ident(pat) => unraw(&pat.ident),
            _ => format!("arg{position}"),
        };
        params.push(ParamDef {
            name,
            ty: (*typed.ty).clone(),
        });
    }

    let ReturnType::Type(_, declared) = &sig.output else {
        return Err(shape_error(sig));
    };

    let shape = if sig.asyncness.is_some() {
        let output = generic_argument(declared, "Result", 2)
            .or_else(|| generic_argument(declared, "Result", 1))
            .ok_or_else(|| shape_error(sig))?;
        MethodShape::Call { output }
    } else if let Some(output) = generic_argument(declared, "Task", 1) {
        MethodShape::Task { output }
    } else if let Type::Reference(reference) = &**declared {
        let payload = generic_argument(&reference.elem, "Event", 1)
            .filter(|_| reference.mutability.is_none() && params.is_empty())
            .ok_or_else(|| shape_error(sig))?;
        MethodShape::Event { payload }
    } else {
        return Err(shape_error(sig));
    };

    Ok(MethodDef {
        ident: sig.ident.clone(),
        name: unraw(&sig.ident),
        shape,
        params,
        output: sig.output.clone(),
    })
}

fn shape_error(sig: &syn::Signature) -> Error {
    Error::new_spanned(
        sig,
        "remote methods must be `async fn(..) -> Result<T, E>`, `fn(..) -> Task<T>` \
         or `fn(&self) -> &Event<T>`",
    )
}

/// Returns the first generic argument of `ty` if its last path segment is
/// `name` with exactly `arity` type arguments.
fn generic_argument(ty: &Type, name: &str, arity: usize) -> Option<Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != name {
        return None;
    }
    let PathArguments::AngleBracketed(arguments) = &segment.arguments else {
        return None;
    };
    let types: Vec<&Type> = arguments
        .args
        .iter()
        .filter_map(|argument| match argument {
            GenericArgument::Type(ty) => Some(ty),
            _ => None,
        })
        .collect();
    (types.len() == arity).then(|| types[0].clone())
}

fn unraw(ident: &Ident) -> String {
    let name = ident.to_string();
    name.strip_prefix("r#").map(str::to_string).unwrap_or(name)
}
