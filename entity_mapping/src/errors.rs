use thiserror::Error;

/// Errors raised while resolving an entity type's column map.
#[derive(Error, Debug)]
pub enum MappingError {
    #[error("entity type '{0}' exposes no mappable columns")]
    NoMappableColumns(&'static str),

    #[error("entity type '{entity}' maps property '{property}' more than once")]
    DuplicateProperty {
        entity: &'static str,
        property: &'static str,
    },

    #[error("entity type '{entity}' has no property named '{property}'")]
    UnknownProperty {
        entity: &'static str,
        property: String,
    },
}

/// Error raised when a result-set value cannot decode into the declared field type.
///
/// A failed row never yields a partially populated entity; the whole instance
/// is discarded with this error.
#[derive(Error, Debug)]
#[error("column '{column}' could not decode into {entity}.{property}: {source}")]
pub struct MaterializeError {
    pub entity: &'static str,
    pub property: &'static str,
    pub column: &'static str,
    #[source]
    pub source: sqlx::Error,
}

impl MaterializeError {
    pub fn decode(
        entity: &'static str,
        property: &'static str,
        column: &'static str,
        source: sqlx::Error,
    ) -> Self {
        Self {
            entity,
            property,
            column,
            source,
        }
    }
}
