//! Derive macros for Composable Aggregate
//!
//! This crate provides procedural macros to reduce boilerplate when declaring
//! identifiers and events for event-sourced aggregates.
//!
//! # Available Macros
//!
//! - `#[derive(EntityId)]` - Implements `EntityId` and `TypedEntityId` for identifier newtypes
//! - `#[derive(DomainEvent)]` - Implements `Event` and `DomainEvent` for event structs
//!
//! # Example
//!
//! ```ignore
//! use composable_aggregate_core::prelude::*;
//!
//! #[derive(EntityId, Clone, Debug, PartialEq)]
//! #[entity_type = "Vendor"]
//! struct VendorId(Uuid);
//!
//! #[derive(DomainEvent, Debug)]
//! #[event_type = "VendorCreated.v1"]
//! struct VendorCreated {
//!     meta: EventMeta,
//!     entity_id_path: EntityIdPath,
//!     name: String,
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use proc_macro::TokenStream;
use quote::quote;
use syn::{
    Attribute, Data, DeriveInput, Expr, ExprLit, Fields, FieldsNamed, Ident, Lit, LitStr, Meta,
    parse_macro_input,
};

/// Derive macro for identifier newtypes
///
/// Applies to a tuple struct with exactly one field whose type implements
/// `Display` and `FromStr`. Generates:
/// - `EntityId`: `entity_type()` and `raw_id()` (the field's `Display` output)
/// - `TypedEntityId`: `ENTITY_TYPE` and `from_raw()` (the field's `FromStr`)
///
/// The identifier must also implement `Clone` and `Debug`.
///
/// # Attributes
///
/// - `#[entity_type = "Vendor"]` - The entity type tag. Defaults to the struct
///   name without an `Id` suffix (`VendorId` becomes `"Vendor"`).
///
/// # Panics
///
/// This macro will produce a compile error (not a runtime panic) if:
/// - Applied to anything other than a single-field tuple struct
/// - The struct is generic
/// - The entity type tag is empty or contains a space or `/`
///
/// # Example
///
/// ```ignore
/// #[derive(EntityId, Clone, Debug, PartialEq)]
/// #[entity_type = "Line"]
/// struct LineId(u32);
///
/// assert_eq!(LineId(3).as_string(), "Line 3");
/// assert_eq!(LineId::from_raw("3"), Some(LineId(3)));
/// ```
#[proc_macro_derive(EntityId, attributes(entity_type))]
pub fn derive_entity_id(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_entity_id(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_entity_id(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "#[derive(EntityId)] does not support generic identifiers",
        ));
    }

    let field_type = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Unnamed(fields) if fields.unnamed.len() == 1 => &fields.unnamed[0].ty,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    "#[derive(EntityId)] requires a tuple struct with exactly one field",
                ));
            },
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "#[derive(EntityId)] can only be used on structs",
            ));
        },
    };

    let entity_type = match string_attribute(&input.attrs, "entity_type")? {
        Some(tag) => tag,
        None => {
            let type_name = name.to_string();
            let tag = type_name.strip_suffix("Id").unwrap_or(&type_name);
            LitStr::new(tag, name.span())
        },
    };

    let tag = entity_type.value();
    if tag.is_empty() || tag.contains(' ') || tag.contains('/') {
        return Err(syn::Error::new_spanned(
            &entity_type,
            "entity type must be non-empty and contain no spaces or '/'",
        ));
    }

    Ok(quote! {
        impl ::composable_aggregate_core::entity_id::EntityId for #name {
            fn entity_type(&self) -> ::composable_aggregate_core::entity_id::EntityType {
                <Self as ::composable_aggregate_core::entity_id::TypedEntityId>::ENTITY_TYPE
            }

            fn raw_id(&self) -> ::std::string::String {
                ::std::string::ToString::to_string(&self.0)
            }
        }

        impl ::composable_aggregate_core::entity_id::TypedEntityId for #name {
            const ENTITY_TYPE: ::composable_aggregate_core::entity_id::EntityType =
                ::composable_aggregate_core::entity_id::EntityType::new(#entity_type);

            fn from_raw(raw: &str) -> ::std::option::Option<Self> {
                <#field_type as ::std::str::FromStr>::from_str(raw).ok().map(Self)
            }
        }
    })
}

/// Derive macro for domain event structs
///
/// Applies to a struct with named fields. Generates:
/// - `Event`: `event_type()` and `meta()`
/// - `DomainEvent`: `entity_id_path()`
///
/// # Attributes
///
/// - `#[event_type = "VendorCreated.v1"]` - The event type tag. Defaults to
///   `"<StructName>.v1"`.
/// - `#[event_meta]` - Marks the `EventMeta` field. Defaults to a field named `meta`.
/// - `#[entity_id_path]` - Marks the `EntityIdPath` field. Defaults to a field
///   named `entity_id_path`.
///
/// # Panics
///
/// This macro will produce a compile error (not a runtime panic) if:
/// - Applied to a non-struct type or a struct without named fields
/// - The metadata or path field cannot be found
///
/// # Example
///
/// ```ignore
/// #[derive(DomainEvent, Debug)]
/// struct LineAdded {
///     meta: EventMeta,
///     #[entity_id_path]
///     order: EntityIdPath,
///     line_id: LineId,
/// }
/// ```
#[proc_macro_derive(DomainEvent, attributes(event_type, event_meta, entity_id_path))]
pub fn derive_domain_event(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_domain_event(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_domain_event(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            input,
            "#[derive(DomainEvent)] can only be used on structs",
        ));
    };
    let Fields::Named(fields) = &data.fields else {
        return Err(syn::Error::new_spanned(
            input,
            "#[derive(DomainEvent)] requires named fields",
        ));
    };

    let event_type = string_attribute(&input.attrs, "event_type")?
        .unwrap_or_else(|| LitStr::new(&format!("{name}.v1"), name.span()));

    let meta = find_field(fields, "event_meta", "meta").ok_or_else(|| {
        syn::Error::new_spanned(
            input,
            "#[derive(DomainEvent)] needs a field named `meta` or marked #[event_meta]",
        )
    })?;
    let path = find_field(fields, "entity_id_path", "entity_id_path").ok_or_else(|| {
        syn::Error::new_spanned(
            input,
            "#[derive(DomainEvent)] needs a field named `entity_id_path` or marked #[entity_id_path]",
        )
    })?;

    Ok(quote! {
        impl #impl_generics ::composable_aggregate_core::event::Event for #name #ty_generics #where_clause {
            fn event_type(&self) -> &'static str {
                #event_type
            }

            fn meta(&self) -> &::composable_aggregate_core::event::EventMeta {
                &self.#meta
            }
        }

        impl #impl_generics ::composable_aggregate_core::event::DomainEvent for #name #ty_generics #where_clause {
            fn entity_id_path(&self) -> &::composable_aggregate_core::path::EntityIdPath {
                &self.#path
            }
        }
    })
}

/// Find the field marked with `marker`, falling back to a field named `default_name`.
fn find_field<'a>(fields: &'a FieldsNamed, marker: &str, default_name: &str) -> Option<&'a Ident> {
    fields
        .named
        .iter()
        .find(|field| has_attribute(&field.attrs, marker))
        .or_else(|| {
            fields
                .named
                .iter()
                .find(|field| field.ident.as_ref().is_some_and(|ident| ident == default_name))
        })
        .and_then(|field| field.ident.as_ref())
}

/// Read a `#[name = "value"]` attribute.
fn string_attribute(attrs: &[Attribute], name: &str) -> syn::Result<Option<LitStr>> {
    let Some(attr) = attrs.iter().find(|attr| attr.path().is_ident(name)) else {
        return Ok(None);
    };

    match &attr.meta {
        Meta::NameValue(pair) => match &pair.value {
            Expr::Lit(ExprLit {
                lit: Lit::Str(value),
                ..
            }) => Ok(Some(value.clone())),
            other => Err(syn::Error::new_spanned(
                other,
                format!("expected a string literal: #[{name} = \"...\"]"),
            )),
        },
        _ => Err(syn::Error::new_spanned(
            attr,
            format!("expected #[{name} = \"...\"]"),
        )),
    }
}

/// Helper function to check if an attribute list contains a specific attribute
fn has_attribute(attrs: &[Attribute], name: &str) -> bool {
    attrs.iter().any(|attr| attr.path().is_ident(name))
}

#[cfg(test)]
mod tests {
    // Macro expansion is exercised by the integration tests in tests/
}
