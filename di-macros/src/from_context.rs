//! `#[derive(FromContext)]`: assemble a struct field by field from a context.

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, parse_quote, Data, DeriveInput, Field, Fields};

pub fn derive_from_context_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let context_type = match parse_context_type(&input) {
        Ok(ty) => ty,
        Err(err) => return err.to_compile_error().into(),
    };

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return syn::Error::new_spanned(
                    &input,
                    "FromContext can only be derived for structs with named fields",
                )
                .to_compile_error()
                .into();
            }
        },
        _ => {
            return syn::Error::new_spanned(&input, "FromContext can only be derived for structs")
                .to_compile_error()
                .into();
        }
    };

    let mut generics = input.generics.clone();
    let mut field_inits = Vec::new();

    for field in fields {
        let Some(field_name) = field.ident.as_ref() else {
            continue;
        };
        let field_type = &field.ty;

        let use_default = match uses_default(field) {
            Ok(flag) => flag,
            Err(err) => return err.to_compile_error().into(),
        };

        if use_default {
            field_inits.push(quote! {
                #field_name: ::core::default::Default::default()
            });
            continue;
        }

        // Generic structs only resolve when every field type does.
        if !input.generics.params.is_empty() {
            generics
                .make_where_clause()
                .predicates
                .push(parse_quote! { #field_type: crate::FromRef<#context_type> });
        }

        field_inits.push(quote! {
            #field_name: <#field_type as crate::FromRef<#context_type>>::from_ref(ctx)
        });
    }

    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let expanded = quote! {
        impl #impl_generics crate::FromRef<#context_type> for #name #ty_generics #where_clause {
            fn from_ref(ctx: &#context_type) -> Self {
                Self {
                    #(#field_inits),*
                }
            }
        }
    };

    TokenStream::from(expanded)
}

/// Reads `#[from_context(default)]` on a field.
fn uses_default(field: &Field) -> syn::Result<bool> {
    let mut use_default = false;
    for attr in &field.attrs {
        if !attr.path().is_ident("from_context") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("default") {
                use_default = true;
                Ok(())
            } else {
                Err(meta.error("unknown field attribute, expected `default`"))
            }
        })?;
    }
    Ok(use_default)
}

/// Reads `#[from_context(Context = "MyContext")]` on the struct, defaulting to `Context`.
fn parse_context_type(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    for attr in &input.attrs {
        if !attr.path().is_ident("from_context") {
            continue;
        }

        let mut context_ty: Option<syn::Type> = None;
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("Context") {
                let value: syn::LitStr = meta.value()?.parse()?;
                context_ty = Some(value.parse()?);
                Ok(())
            } else {
                Err(meta.error("unknown struct attribute, expected `Context = \"...\"`"))
            }
        })?;

        if let Some(ty) = context_ty {
            return Ok(quote! { #ty });
        }
    }

    Ok(quote! { Context })
}
