//! Related-entity inclusion
//!
//! An include eagerly attaches a related table to a composed query as a
//! LEFT JOIN. Includes apply in the order given; two includes with the same
//! join target (table plus alias) collapse to the last one.

/// One related-entity inclusion
#[derive(Debug, Clone, PartialEq)]
pub struct Include {
    /// Table holding the related entity
    pub table: String,
    /// Optional alias for the joined table
    pub alias: Option<String>,
    /// Column on the base entity side of the join
    pub local_column: String,
    /// Column on the related side of the join
    pub foreign_column: String,
}

impl Include {
    /// Create an inclusion joining `table` on `local_column = foreign_column`
    pub fn relation(
        table: impl Into<String>,
        local_column: impl Into<String>,
        foreign_column: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            alias: None,
            local_column: local_column.into(),
            foreign_column: foreign_column.into(),
        }
    }

    /// Add an alias for the joined table
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Get the table reference (alias if present, otherwise table name)
    pub fn table_ref(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.table)
    }

    /// Whether two includes address the same join target
    pub(crate) fn same_target(&self, other: &Include) -> bool {
        self.table == other.table && self.alias == other.alias
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relation_defaults_to_no_alias() {
        let include = Include::relation("orders", "users.id", "orders.user_id");

        assert_eq!(include.table, "orders");
        assert_eq!(include.alias, None);
        assert_eq!(include.table_ref(), "orders");
    }

    #[test]
    fn with_alias_changes_table_ref() {
        let include = Include::relation("orders", "users.id", "o.user_id").with_alias("o");

        assert_eq!(include.alias, Some("o".to_string()));
        assert_eq!(include.table_ref(), "o");
    }

    #[test]
    fn same_target_compares_table_and_alias() {
        let a = Include::relation("orders", "users.id", "orders.user_id");
        let b = Include::relation("orders", "users.id", "orders.customer_id");
        let c = Include::relation("orders", "users.id", "o.user_id").with_alias("o");

        assert!(a.same_target(&b));
        assert!(!a.same_target(&c));
    }
}
