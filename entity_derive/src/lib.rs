//! Procedural macro for generating entity column maps and statement bindings
//!
//! This crate provides the `Entity` derive, which generates the
//! `entity_mapping::Entity` implementation for a struct: the per-type column
//! map, static SQL with placeholders, row hydration, and parameter binding.

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod codegen;
mod parsing;

use codegen::generate_entity_impl;
use parsing::{parse_entity_attributes, parse_fields};

/// Derive macro for the `Entity` trait
///
/// The deriving struct must also be `Debug + Clone + Default` and have named
/// fields whose types are sqlx-encodable and -decodable for PostgreSQL.
///
/// Usage:
/// ```ignore
/// use entity_derive::Entity;
///
/// #[derive(Debug, Clone, Default, PartialEq, Entity)]
/// #[entity(table = "customers")]
/// pub struct Customer {
///     #[key]
///     pub id: Uuid,
///
///     pub first_name: String,
///
///     #[column(name = "mail_address")]
///     pub email: String,
///
///     #[column(skip)]
///     pub derived_score: f64,
/// }
/// ```
///
/// `#[column(name = "...")]` overrides the column a field maps to;
/// `#[column(skip)]` leaves a field out of the map entirely (it stays at its
/// default value after materialization and is never written). Exactly one
/// field must carry `#[key]`.
#[proc_macro_derive(Entity, attributes(entity, key, column))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let name = &input.ident;

    let table_info = match parse_entity_attributes(&input) {
        Ok(info) => info,
        Err(e) => return e.to_compile_error().into(),
    };

    let fields = match parse_fields(&input.data, &table_info) {
        Ok(fields) => fields,
        Err(e) => return e.to_compile_error().into(),
    };

    let expanded = generate_entity_impl(name, &table_info, &fields);

    TokenStream::from(expanded)
}
