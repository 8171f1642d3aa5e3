//! Proc macros for `datafix`.
//!
//! Provides **`#[data_fix]`**, an attribute macro that turns a plain
//! transform function into a `datafix::Fix` factory.

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, punctuated::Punctuated, token::Comma, ItemFn, Meta};

/// Attribute macro that wraps a transform function into a `Fix`.
///
/// The function takes a single `Dynamic<O>` and returns the migrated
/// `Dynamic<O>`, or `Result<Dynamic<O>, String>` for a fix that can abort
/// the update. It may be generic over exactly one `DynamicOps` parameter,
/// or name a concrete operation set.
///
/// # Attributes
///
/// - `type = "name"`: **Required.** The type reference the fix applies to.
/// - `from = N`: **Required.** Source schema version.
/// - `to = M`: **Required.** Target schema version.
/// - `name = "..."`: Optional. Fix name for logs and errors (defaults to the
///   function name).
///
/// # Generated Code
///
/// Keeps the function and adds `{fn_name}_fix()` returning the `Fix`.
///
/// # Example
///
/// ```ignore
/// use datafix::{data_fix, Dynamic, DynamicOps};
///
/// #[data_fix(type = "player", from = 1, to = 2)]
/// fn rename_player_name<O: DynamicOps>(input: Dynamic<O>) -> Dynamic<O> {
///     input.rename_field("playerName", "name")
/// }
/// // Generates: fn rename_player_name_fix<O: DynamicOps>() -> datafix::Fix<O>
/// ```
#[proc_macro_attribute]
pub fn data_fix(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    let args = parse_macro_input!(attr with Punctuated::<Meta, Comma>::parse_terminated);

    let mut type_ref: Option<String> = None;
    let mut from_version: Option<u32> = None;
    let mut to_version: Option<u32> = None;
    let mut fix_name: Option<String> = None;

    for meta in &args {
        let nv = match meta {
            Meta::NameValue(nv) => nv,
            other => {
                return syn::Error::new_spanned(other, "expected `key = value`")
                    .to_compile_error()
                    .into();
            }
        };
        let key = nv
            .path
            .get_ident()
            .map(|i| i.to_string())
            .unwrap_or_default();
        match (key.as_str(), &nv.value) {
            (
                "type",
                syn::Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Str(lit),
                    ..
                }),
            ) => type_ref = Some(lit.value()),
            (
                "name",
                syn::Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Str(lit),
                    ..
                }),
            ) => fix_name = Some(lit.value()),
            (
                "from",
                syn::Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Int(lit),
                    ..
                }),
            ) => match parse_version(lit) {
                Ok(v) => from_version = Some(v),
                Err(err) => return err.to_compile_error().into(),
            },
            (
                "to",
                syn::Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Int(lit),
                    ..
                }),
            ) => match parse_version(lit) {
                Ok(v) => to_version = Some(v),
                Err(err) => return err.to_compile_error().into(),
            },
            ("type" | "name", value) => {
                return syn::Error::new_spanned(value, format!("`{key}` must be a string literal"))
                    .to_compile_error()
                    .into();
            }
            ("from" | "to", value) => {
                return syn::Error::new_spanned(value, format!("`{key}` must be an integer literal"))
                    .to_compile_error()
                    .into();
            }
            _ => {
                return syn::Error::new_spanned(&nv.path, format!("unknown attribute `{key}`"))
                    .to_compile_error()
                    .into();
            }
        }
    }

    let type_ref = match type_ref {
        Some(t) => t,
        None => return missing("type"),
    };
    let from_ver = match from_version {
        Some(v) => v,
        None => return missing("from"),
    };
    let to_ver = match to_version {
        Some(v) => v,
        None => return missing("to"),
    };

    let fn_name = &input.sig.ident;
    let fix_name = fix_name.unwrap_or_else(|| fn_name.to_string());

    let input_type = match (input.sig.inputs.len(), input.sig.inputs.first()) {
        (1, Some(syn::FnArg::Typed(pat_type))) => &pat_type.ty,
        _ => {
            return syn::Error::new_spanned(
                &input.sig,
                "fix function must take exactly one `Dynamic` argument",
            )
            .to_compile_error()
            .into();
        }
    };

    let fallible = match &input.sig.output {
        syn::ReturnType::Default => {
            return syn::Error::new_spanned(&input.sig, "fix function must return a `Dynamic`")
                .to_compile_error()
                .into();
        }
        syn::ReturnType::Type(_, ty) => returns_result(ty),
    };
    let constructor = if fallible {
        quote! { try_new }
    } else {
        quote! { new }
    };

    let type_params: Vec<&syn::TypeParam> = input.sig.generics.type_params().collect();
    let vis = &input.vis;
    let factory = syn::Ident::new(&format!("{fn_name}_fix"), fn_name.span());
    let doc = format!("Fix `{fix_name}` for `{type_ref}` from v{from_ver} to v{to_ver}.");

    let body = |ops: proc_macro2::TokenStream| {
        quote! {
            ::datafix::Fix::#constructor(
                #fix_name,
                ::datafix::TypeReference::new(#type_ref),
                ::datafix::DataVersion::new(#from_ver),
                ::datafix::DataVersion::new(#to_ver),
                #fn_name #ops,
            )
        }
    };

    let factory_fn = match type_params.as_slice() {
        [] => {
            let ops = match ops_argument(input_type) {
                Some(ops) => ops,
                None => {
                    return syn::Error::new_spanned(
                        input_type,
                        "expected `Dynamic<O>` with a concrete operation set",
                    )
                    .to_compile_error()
                    .into();
                }
            };
            let call = body(quote! {});
            quote! {
                #[doc = #doc]
                #vis fn #factory() -> ::datafix::Fix<#ops> {
                    #call
                }
            }
        }
        [param] => {
            let ops = &param.ident;
            let call = body(quote! { ::<#ops> });
            quote! {
                #[doc = #doc]
                #vis fn #factory<#ops: ::datafix::DynamicOps>() -> ::datafix::Fix<#ops> {
                    #call
                }
            }
        }
        _ => {
            return syn::Error::new_spanned(
                &input.sig.generics,
                "fix function may have at most one type parameter",
            )
            .to_compile_error()
            .into();
        }
    };

    let expanded = quote! {
        #input

        #factory_fn
    };

    expanded.into()
}

fn missing(key: &str) -> TokenStream {
    syn::Error::new(
        proc_macro2::Span::call_site(),
        format!("missing required attribute `{key}`"),
    )
    .to_compile_error()
    .into()
}

/// A schema version literal, spanned on the literal when it does not fit.
fn parse_version(lit: &syn::LitInt) -> syn::Result<u32> {
    lit.base10_parse::<u32>().map_err(|err| {
        syn::Error::new(lit.span(), format!("version `{lit}` is not a valid u32: {err}"))
    })
}

fn returns_result(ty: &syn::Type) -> bool {
    match ty {
        syn::Type::Path(path) => path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "Result"),
        _ => false,
    }
}

/// The `O` of a `Dynamic<O>` argument type.
fn ops_argument(ty: &syn::Type) -> Option<&syn::Type> {
    let syn::Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    match &segment.arguments {
        syn::PathArguments::AngleBracketed(args) => args.args.iter().find_map(|arg| match arg {
            syn::GenericArgument::Type(ty) => Some(ty),
            _ => None,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proc_macro2::Span;

    #[test]
    fn version_in_range_parses() {
        let lit = syn::LitInt::new("42", Span::call_site());
        assert_eq!(parse_version(&lit).unwrap(), 42);
    }

    #[test]
    fn version_out_of_range_is_reported() {
        let lit = syn::LitInt::new("5000000000", Span::call_site());
        let err = parse_version(&lit).unwrap_err().to_string();
        assert!(err.starts_with("version `5000000000` is not a valid u32"), "{err}");
    }

    #[test]
    fn result_return_type_is_detected() {
        let fallible: syn::Type = syn::parse_quote!(Result<Dynamic<O>, String>);
        let plain: syn::Type = syn::parse_quote!(Dynamic<O>);
        assert!(returns_result(&fallible));
        assert!(!returns_result(&plain));
    }
}
