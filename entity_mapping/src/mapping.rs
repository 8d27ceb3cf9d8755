//! Per-type column maps.
//!
//! The column map for an entity type is declared once, at compile time, by
//! the derive macro. `ColumnMapper` layers runtime validation on top and
//! memoizes the result per type, so repeated resolution is free and
//! idempotent.

use crate::entity::Entity;
use crate::errors::MappingError;
use std::any::TypeId;
use std::collections::HashSet;
use std::sync::{Mutex, OnceLock};

/// One property-to-column mapping entry.
///
/// The column name defaults to the property name unless overridden with
/// `#[column(name = "...")]` on the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMapping {
    pub property: &'static str,
    pub column: &'static str,
}

/// Resolves and validates the column map of an entity type.
pub struct ColumnMapper;

static VALIDATED: OnceLock<Mutex<HashSet<TypeId>>> = OnceLock::new();

impl ColumnMapper {
    /// Resolve the column map for `E`.
    ///
    /// Validation (non-empty map, unique property names) runs once per
    /// distinct type; later calls return the same static mapping set.
    pub fn resolve<E: Entity>() -> Result<&'static [ColumnMapping], MappingError> {
        let registry = VALIDATED.get_or_init(|| Mutex::new(HashSet::new()));
        let mut validated = registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mappings = E::columns();

        if validated.contains(&TypeId::of::<E>()) {
            return Ok(mappings);
        }

        if mappings.is_empty() {
            return Err(MappingError::NoMappableColumns(E::table_name()));
        }

        let mut seen = HashSet::with_capacity(mappings.len());
        for mapping in mappings {
            if !seen.insert(mapping.property) {
                return Err(MappingError::DuplicateProperty {
                    entity: E::table_name(),
                    property: mapping.property,
                });
            }
        }

        validated.insert(TypeId::of::<E>());
        Ok(mappings)
    }

    /// Resolve the column name mapped by a property of `E`.
    pub fn column_for<E: Entity>(property: &str) -> Result<&'static str, MappingError> {
        Self::resolve::<E>()?
            .iter()
            .find(|mapping| mapping.property == property)
            .map(|mapping| mapping.column)
            .ok_or_else(|| MappingError::UnknownProperty {
                entity: E::table_name(),
                property: property.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::MaterializeError;
    use sqlx::postgres::{PgArguments, PgRow};
    use sqlx::query::Query;
    use sqlx::Postgres;

    macro_rules! test_entity {
        ($name:ident, $table:literal, $columns:expr) => {
            #[derive(Debug, Clone, Default)]
            struct $name;

            impl Entity for $name {
                type Key = i32;

                fn table_name() -> &'static str {
                    $table
                }

                fn columns() -> &'static [ColumnMapping] {
                    $columns
                }

                fn key_property() -> &'static str {
                    "id"
                }

                fn key_column() -> &'static str {
                    "id"
                }

                fn key(&self) -> i32 {
                    0
                }

                fn insert_sql() -> &'static str {
                    ""
                }

                fn update_sql() -> &'static str {
                    ""
                }

                fn delete_sql() -> &'static str {
                    ""
                }

                fn select_base_sql() -> &'static str {
                    ""
                }

                fn count_base_sql() -> &'static str {
                    ""
                }

                fn hydrate(_row: &PgRow) -> Result<Self, MaterializeError> {
                    Ok(Self)
                }

                fn bind_insert<'q>(
                    &self,
                    query: Query<'q, Postgres, PgArguments>,
                ) -> Query<'q, Postgres, PgArguments> {
                    query
                }

                fn bind_update<'q>(
                    &self,
                    query: Query<'q, Postgres, PgArguments>,
                ) -> Query<'q, Postgres, PgArguments> {
                    query
                }

                fn bind_property<'q>(
                    &self,
                    property: &str,
                    _query: Query<'q, Postgres, PgArguments>,
                ) -> Result<Query<'q, Postgres, PgArguments>, MappingError> {
                    Err(MappingError::UnknownProperty {
                        entity: Self::table_name(),
                        property: property.to_string(),
                    })
                }
            }
        };
    }

    test_entity!(
        WellMapped,
        "well_mapped",
        &[
            ColumnMapping {
                property: "id",
                column: "id",
            },
            ColumnMapping {
                property: "label",
                column: "display_label",
            },
        ]
    );

    test_entity!(Bare, "bare", &[]);

    test_entity!(
        Doubled,
        "doubled",
        &[
            ColumnMapping {
                property: "id",
                column: "id",
            },
            ColumnMapping {
                property: "id",
                column: "id_again",
            },
        ]
    );

    #[test]
    fn resolve_is_idempotent() {
        let first = ColumnMapper::resolve::<WellMapped>().expect("valid map");
        let second = ColumnMapper::resolve::<WellMapped>().expect("valid map");
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn resolve_rejects_empty_map() {
        assert!(matches!(
            ColumnMapper::resolve::<Bare>(),
            Err(MappingError::NoMappableColumns("bare"))
        ));
        // failures are not memoized
        assert!(ColumnMapper::resolve::<Bare>().is_err());
    }

    #[test]
    fn resolve_rejects_duplicate_property() {
        assert!(matches!(
            ColumnMapper::resolve::<Doubled>(),
            Err(MappingError::DuplicateProperty {
                entity: "doubled",
                property: "id",
            })
        ));
    }

    #[test]
    fn column_for_applies_overrides() {
        assert_eq!(
            ColumnMapper::column_for::<WellMapped>("label").expect("mapped"),
            "display_label"
        );
        assert!(matches!(
            ColumnMapper::column_for::<WellMapped>("missing"),
            Err(MappingError::UnknownProperty { .. })
        ));
    }
}
