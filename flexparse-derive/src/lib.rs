//! Derive macros that remove per-struct boilerplate from implementing
//! [`flexparse::StatementNode`]/[`flexparse::IncludeTarget`] on
//! grammar-author value types (§4.D, §4.H "Grammar-author surface").

extern crate proc_macro;

use proc_macro::TokenStream;
use quote::quote;
use syn::parse_macro_input;
use syn::DeriveInput;

struct StatementNodeAttrs {
    position_field: String,
    is_error: bool,
    include_target: bool,
}

fn extract_statement_attrs(attrs: &[syn::Attribute]) -> Result<StatementNodeAttrs, syn::Error> {
    let mut position_field = "position".to_string();
    let mut is_error = false;
    let mut include_target = false;

    for attr in attrs {
        if !attr.path().is_ident("flexparse") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("error") {
                is_error = true;
                Ok(())
            } else if meta.path.is_ident("include_target") {
                include_target = true;
                Ok(())
            } else if meta.path.is_ident("position") {
                let value = meta.value()?;
                let lit: syn::LitStr = value.parse()?;
                position_field = lit.value();
                Ok(())
            } else {
                Err(meta.error("unsupported flexparse attribute"))
            }
        })?;
    }

    Ok(StatementNodeAttrs {
        position_field,
        is_error,
        include_target,
    })
}

/// Implements [`flexparse::Positioned`] and [`flexparse::StatementNode`] for
/// a struct that carries its committed position in a `position: Position`
/// field (override the field name with `#[flexparse(position = "...")]`).
///
/// `#[flexparse(error)]` tags the value as a grammar-author error for the
/// purposes of a block's error view. `#[flexparse(include_target)]` wires
/// `as_include` to `Some(self)`, assuming the type also implements
/// [`flexparse::IncludeTarget`] (typically via `#[derive(IncludeTarget)]`).
#[proc_macro_derive(StatementNode, attributes(flexparse))]
pub fn derive_statement_node(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let attrs = match extract_statement_attrs(&input.attrs) {
        Ok(attrs) => attrs,
        Err(err) => return err.to_compile_error().into(),
    };

    let position_field = syn::Ident::new(&attrs.position_field, name.span());
    let is_error = attrs.is_error;

    let as_include = if attrs.include_target {
        quote! {
            fn as_include(&self) -> Option<&dyn flexparse::IncludeTarget> {
                Some(self)
            }
        }
    } else {
        quote! {}
    };

    let gen = quote! {
        impl #impl_generics flexparse::Positioned for #name #ty_generics #where_clause {
            fn position(&self) -> flexparse::Position {
                self.#position_field
            }
            fn set_position(&mut self, position: flexparse::Position) {
                self.#position_field = position;
            }
        }

        impl #impl_generics flexparse::StatementNode for #name #ty_generics #where_clause {
            fn position(&self) -> flexparse::Position {
                flexparse::Positioned::position(self)
            }
            fn set_position(&mut self, position: flexparse::Position) {
                flexparse::Positioned::set_position(self, position)
            }
            fn is_error(&self) -> bool {
                #is_error
            }
            #as_include
            fn as_any(&self) -> &dyn std::any::Any {
                self
            }
        }
    };
    gen.into()
}

struct IncludeTargetAttrs {
    target_field: String,
}

fn extract_include_attrs(attrs: &[syn::Attribute]) -> Result<IncludeTargetAttrs, syn::Error> {
    let mut target_field = "target".to_string();

    for attr in attrs {
        if !attr.path().is_ident("flexparse") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("target") {
                let value = meta.value()?;
                let lit: syn::LitStr = value.parse()?;
                target_field = lit.value();
                Ok(())
            } else if meta.path.is_ident("error") || meta.path.is_ident("include_target") {
                // shared #[flexparse(...)] attribute also read by StatementNode
                Ok(())
            } else if meta.path.is_ident("position") {
                let _ = meta.value()?.parse::<syn::LitStr>()?;
                Ok(())
            } else {
                Err(meta.error("unsupported flexparse attribute"))
            }
        })?;
    }

    Ok(IncludeTargetAttrs { target_field })
}

/// Implements [`flexparse::IncludeTarget`] for a struct that carries its
/// include target string in a `target: String` field (override the field
/// name with `#[flexparse(target = "...")]`).
#[proc_macro_derive(IncludeTarget, attributes(flexparse))]
pub fn derive_include_target(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let attrs = match extract_include_attrs(&input.attrs) {
        Ok(attrs) => attrs,
        Err(err) => return err.to_compile_error().into(),
    };
    let target_field = syn::Ident::new(&attrs.target_field, name.span());

    let gen = quote! {
        impl #impl_generics flexparse::IncludeTarget for #name #ty_generics #where_clause {
            fn target(&self) -> &str {
                &self.#target_field
            }
        }
    };
    gen.into()
}
