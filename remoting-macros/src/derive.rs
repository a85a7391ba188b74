//! `#[derive(Remotable)]`: type descriptions for structs and field-less enums.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{
    Data, DeriveInput, Error, Fields, GenericParam, Ident, Index, LitStr, Member, Path, Result,
    Type, parse_quote,
};

#[derive(Default)]
struct ContainerArgs {
    name: Option<String>,
    singleton: Option<Path>,
    not_serializable: bool,
    after_deserialize: Option<Path>,
}

impl ContainerArgs {
    fn parse(input: &DeriveInput) -> Result<Self> {
        let mut args = Self::default();
        for attr in input.attrs.iter().filter(|attr| attr.path().is_ident("remoting")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    args.name = Some(meta.value()?.parse::<LitStr>()?.value());
                } else if meta.path.is_ident("singleton") {
                    args.singleton = Some(meta.value()?.parse::<LitStr>()?.parse()?);
                } else if meta.path.is_ident("not_serializable") {
                    args.not_serializable = true;
                } else if meta.path.is_ident("after_deserialize") {
                    args.after_deserialize = Some(meta.value()?.parse::<LitStr>()?.parse()?);
                } else {
                    return Err(meta.error(
                        "unknown attribute, supported: name, singleton, not_serializable, \
                         after_deserialize",
                    ));
                }
                Ok(())
            })?;
        }
        if args.singleton.is_some() && args.not_serializable {
            return Err(Error::new_spanned(
                &input.ident,
                "`singleton` and `not_serializable` are exclusive",
            ));
        }
        Ok(args)
    }
}

fn is_skipped(attrs: &[syn::Attribute]) -> Result<bool> {
    let mut skip = false;
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("remoting")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                skip = true;
                Ok(())
            } else {
                Err(meta.error("unknown field attribute, supported: skip"))
            }
        })?;
    }
    Ok(skip)
}

struct MemberDef {
    name: String,
    member: Member,
    ty: Type,
    skip: bool,
}

/// Expands the derive.
pub fn expand(mut input: DeriveInput) -> Result<TokenStream> {
    let args = ContainerArgs::parse(&input)?;
    if let Some(lifetime) = input.generics.lifetimes().next() {
        return Err(Error::new_spanned(
            lifetime,
            "remotable types cannot borrow, they must be 'static",
        ));
    }
    for param in &mut input.generics.params {
        if let GenericParam::Type(param) = param {
            param.bounds.push(parse_quote!(::remoting::types::Remotable));
        }
    }

    let ident = &input.ident;
    let name = args.name.clone().unwrap_or_else(|| ident.to_string());
    let body = if args.not_serializable {
        quote!(::remoting::types::TypeDescription::not_serializable::<Self>(#name))
    } else if let Some(factory) = &args.singleton {
        quote! {
            ::remoting::types::TypeDescription::singleton::<Self>(#name, || {
                ::std::boxed::Box::new(#factory()) as ::remoting::types::BoxedValue
            })
        }
    } else {
        match &input.data {
            Data::Struct(data) => data_contract(&name, &data.fields, &args)?,
            Data::Enum(data) => {
                if !input.generics.params.is_empty() {
                    return Err(Error::new_spanned(
                        &input.generics,
                        "remotable enums cannot be generic",
                    ));
                }
                enumeration(&input, &name, data)?
            }
            Data::Union(_) => {
                return Err(Error::new_spanned(ident, "unions cannot be remotable"));
            }
        }
    };

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    Ok(quote! {
        impl #impl_generics ::remoting::types::Remotable for #ident #ty_generics #where_clause {
            fn describe() -> ::remoting::types::TypeDescription {
                #body
            }
        }
    })
}

fn data_contract(name: &str, fields: &Fields, args: &ContainerArgs) -> Result<TokenStream> {
    let mut members = Vec::new();
    for (index, field) in fields.iter().enumerate() {
        let (name, member) = match &field.ident {
            Some(ident) => {
                let name = ident.to_string();
                let name = name.strip_prefix("r#").map(str::to_string).unwrap_or(name);
                (name, Member::Named(ident.clone()))
            }
            None => (index.to_string(), Member::Unnamed(Index::from(index))),
        };
        members.push(MemberDef {
            name,
            member,
            ty: field.ty.clone(),
            skip: is_skipped(&field.attrs)?,
        });
    }
    members.sort_by(|a, b| a.name.cmp(&b.name));

    let sent: Vec<&MemberDef> = members.iter().filter(|member| !member.skip).collect();
    let field_calls = sent.iter().map(|MemberDef { name, member, ty, .. }| {
        quote! {
            .field(
                #name,
                ::remoting::types::TypeRef::of::<#ty>(),
                |value| value
                    .downcast_ref::<Self>()
                    .map(|value| &value.#member as &dyn ::core::any::Any),
            )
        }
    });

    let temps: Vec<Ident> = (0..sent.len()).map(|index| format_ident!("__member{}", index)).collect();
    let takes = sent.iter().zip(&temps).map(|(member, temp)| {
        let ty = &member.ty;
        quote!(let #temp = values.take::<#ty>()?;)
    });
    let inits = members.iter().map(|member| {
        let field = &member.member;
        match sent.iter().position(|sent| sent.name == member.name) {
            Some(index) => {
                let temp = &temps[index];
                quote!(#field: #temp)
            }
            None => quote!(#field: ::core::default::Default::default()),
        }
    });
    let construct = match fields {
        Fields::Unit => quote!(Self),
        _ => quote!(Self { #( #inits ),* }),
    };

    let after = args.after_deserialize.as_ref().map(|callback| {
        quote! {
            .after_deserialize(|value| {
                if let ::core::option::Option::Some(value) = value.downcast_mut::<Self>() {
                    #callback(value);
                }
            })
        }
    });

    Ok(quote! {
        ::remoting::types::TypeDescription::data_contract::<Self>(#name)
            #( #field_calls )*
            .constructor(|values| {
                #( #takes )*
                ::core::option::Option::Some(
                    ::std::boxed::Box::new(#construct) as ::remoting::types::BoxedValue,
                )
            })
            #after
            .build()
    })
}

/// Integer storage of an enum, taken from its `#[repr]`.
fn enum_storage(input: &DeriveInput) -> Result<TokenStream> {
    let mut storage = quote!(I32);
    for attr in input.attrs.iter().filter(|attr| attr.path().is_ident("repr")) {
        attr.parse_nested_meta(|meta| {
            let primitive = ["i8", "u8", "i16", "u16", "i32", "u32", "i64", "u64", "isize", "usize"]
                .into_iter()
                .find(|repr| meta.path.is_ident(repr));
            if meta.input.peek(syn::token::Paren) {
                let content;
                syn::parenthesized!(content in meta.input);
                content.parse::<TokenStream>()?;
            }
            if let Some(repr) = primitive {
                storage = match repr {
                    "isize" => quote!(I64),
                    "usize" => quote!(U64),
                    other => {
                        let variant = Ident::new(&other.to_uppercase(), proc_macro2::Span::call_site());
                        quote!(#variant)
                    }
                };
            }
            Ok(())
        })?;
    }
    Ok(storage)
}

fn enumeration(input: &DeriveInput, name: &str, data: &syn::DataEnum) -> Result<TokenStream> {
    if data.variants.is_empty() {
        return Err(Error::new_spanned(
            &input.ident,
            "remotable enums need at least one variant",
        ));
    }
    if let Some(variant) = data.variants.iter().find(|v| !matches!(v.fields, Fields::Unit)) {
        return Err(Error::new_spanned(
            variant,
            "remotable enums must be field-less",
        ));
    }
    let storage = enum_storage(input)?;
    let variants: Vec<&Ident> = data.variants.iter().map(|variant| &variant.ident).collect();
    let names: Vec<String> = variants.iter().map(|variant| variant.to_string()).collect();

    Ok(quote! {
        ::remoting::types::TypeDescription::enumeration::<Self>(
            #name,
            ::remoting::types::Primitive::#storage,
            ::std::vec![#( (::std::string::String::from(#names), Self::#variants as i64) ),*],
            |value| {
                value.downcast_ref::<Self>().map(|value| match value {
                    #( Self::#variants => Self::#variants as i64, )*
                })
            },
            |raw| {
                #(
                    if raw == Self::#variants as i64 {
                        return ::core::option::Option::Some(
                            ::std::boxed::Box::new(Self::#variants) as ::remoting::types::BoxedValue,
                        );
                    }
                )*
                ::core::option::Option::None
            },
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_are_taken_in_name_order() {
        let input: DeriveInput = parse_quote! {
            struct Point { y: f64, x: f64 }
        };
        let tokens = expand(input).unwrap().to_string();
        let x = tokens.find("\"x\"").unwrap();
        let y = tokens.find("\"y\"").unwrap();
        assert!(x < y);
    }

    #[test]
    fn test_rejects_data_enums() {
        let input: DeriveInput = parse_quote! {
            enum Shape { Circle(f64), Square }
        };
        assert!(expand(input).is_err());
    }

    #[test]
    fn test_repr_selects_storage() {
        let input: DeriveInput = parse_quote! {
            #[repr(u8)]
            enum Color { Red = 1, Green = 2 }
        };
        assert_eq!(enum_storage(&input).unwrap().to_string(), "U8");
    }

    #[test]
    fn test_singleton_and_not_serializable_conflict() {
        let input: DeriveInput = parse_quote! {
            #[remoting(singleton = "Clock::instance", not_serializable)]
            struct Clock;
        };
        assert!(expand(input).is_err());
    }
}
