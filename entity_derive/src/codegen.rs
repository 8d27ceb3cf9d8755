//! Code generation for the `Entity` implementation
//!
//! Generates the column map, static SQL with placeholders, row hydration,
//! and parameter-binding hooks from parsed table and field metadata.

use proc_macro2::TokenStream;
use quote::quote;
use syn::Ident;

use crate::parsing::{FieldInfo, TableInfo};

/// Quote an already-validated SQL identifier.
///
/// Names were validated at parse time; quoting keeps them safe against any
/// remaining reserved-word collisions.
fn safe_sql_identifier(name: &str) -> String {
    format!("\"{}\"", name)
}

pub fn generate_entity_impl(
    name: &Ident,
    table_info: &TableInfo,
    fields: &[FieldInfo],
) -> TokenStream {
    let table = table_info.table.as_str();
    let quoted_table = safe_sql_identifier(table);

    let mapped: Vec<&FieldInfo> = fields.iter().filter(|f| !f.skip).collect();
    let key = mapped
        .iter()
        .find(|f| f.is_key)
        .expect("parsing guarantees exactly one #[key] field");
    let non_key: Vec<&&FieldInfo> = mapped.iter().filter(|f| !f.is_key).collect();

    let key_ident = &key.ident;
    let key_ty = &key.ty;
    let key_prop = key.ident.to_string();
    let key_col = key.column.as_str();
    let quoted_key_col = safe_sql_identifier(key_col);

    // INSERT over every mapped column
    let insert_cols: Vec<String> = mapped
        .iter()
        .map(|f| safe_sql_identifier(&f.column))
        .collect();
    let insert_placeholders: Vec<String> = (1..=mapped.len()).map(|i| format!("${}", i)).collect();
    let insert_sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quoted_table,
        insert_cols.join(", "),
        insert_placeholders.join(", ")
    );

    // UPDATE of every non-key column, keyed by primary key
    let update_sql = if non_key.is_empty() {
        String::new()
    } else {
        let assignments: Vec<String> = non_key
            .iter()
            .enumerate()
            .map(|(i, f)| format!("{} = ${}", safe_sql_identifier(&f.column), i + 1))
            .collect();
        format!(
            "UPDATE {} SET {} WHERE {} = ${}",
            quoted_table,
            assignments.join(", "),
            quoted_key_col,
            non_key.len() + 1
        )
    };

    let delete_sql = format!(
        "DELETE FROM {} WHERE {} = $1",
        quoted_table, quoted_key_col
    );

    // Table-qualified star so joins do not widen the projection
    let select_base_sql = format!("SELECT {}.* FROM {}", quoted_table, quoted_table);
    let count_base_sql = format!("SELECT COUNT(*) AS total FROM {}", quoted_table);

    let column_entries = mapped.iter().map(|f| {
        let prop = f.ident.to_string();
        let col = f.column.as_str();
        quote! {
            entity_mapping::ColumnMapping {
                property: #prop,
                column: #col,
            }
        }
    });

    let hydrate_fields = mapped.iter().map(|f| {
        let ident = &f.ident;
        let prop = f.ident.to_string();
        let col = f.column.as_str();
        quote! {
            if sqlx::Row::try_column(row, #col).is_ok() {
                out.#ident = sqlx::Row::try_get(row, #col).map_err(|source| {
                    entity_mapping::MaterializeError::decode(#table, #prop, #col, source)
                })?;
            }
        }
    });

    let insert_binds = mapped.iter().map(|f| {
        let ident = &f.ident;
        quote! { let query = query.bind(self.#ident.clone()); }
    });

    let update_binds = non_key.iter().map(|f| {
        let ident = &f.ident;
        quote! { let query = query.bind(self.#ident.clone()); }
    });

    let property_arms = mapped.iter().map(|f| {
        let ident = &f.ident;
        let prop = f.ident.to_string();
        quote! { #prop => Ok(query.bind(self.#ident.clone())), }
    });

    quote! {
        impl entity_mapping::Entity for #name {
            type Key = #key_ty;

            fn table_name() -> &'static str {
                #table
            }

            fn columns() -> &'static [entity_mapping::ColumnMapping] {
                &[
                    #(#column_entries),*
                ]
            }

            fn key_property() -> &'static str {
                #key_prop
            }

            fn key_column() -> &'static str {
                #key_col
            }

            fn key(&self) -> Self::Key {
                self.#key_ident.clone()
            }

            fn insert_sql() -> &'static str {
                #insert_sql
            }

            fn update_sql() -> &'static str {
                #update_sql
            }

            fn delete_sql() -> &'static str {
                #delete_sql
            }

            fn select_base_sql() -> &'static str {
                #select_base_sql
            }

            fn count_base_sql() -> &'static str {
                #count_base_sql
            }

            fn hydrate(
                row: &sqlx::postgres::PgRow,
            ) -> Result<Self, entity_mapping::MaterializeError> {
                let mut out = Self::default();
                #(#hydrate_fields)*
                Ok(out)
            }

            fn bind_insert<'q>(
                &self,
                query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
            ) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
                #(#insert_binds)*
                query
            }

            fn bind_update<'q>(
                &self,
                query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
            ) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
                #(#update_binds)*
                let query = query.bind(self.#key_ident.clone());
                query
            }

            fn bind_property<'q>(
                &self,
                property: &str,
                query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
            ) -> Result<
                sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
                entity_mapping::MappingError,
            > {
                match property {
                    #(#property_arms)*
                    _ => Err(entity_mapping::MappingError::UnknownProperty {
                        entity: #table,
                        property: property.to_string(),
                    }),
                }
            }
        }
    }
}
