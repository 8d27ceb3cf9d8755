//! Query specification
//!
//! `QuerySpec` is the single parameter object every read shape collapses
//! into: an optional filter, an ordering list, and related-entity includes.
//! Narrower calls simply leave fields at their defaults.

use crate::query::filter::QueryFilter;
use crate::query::include::Include;
use crate::query::ordering::SortOrder;

/// Ephemeral description of one read: filter, ordering and includes
#[derive(Debug, Clone, Default)]
pub struct QuerySpec {
    pub(crate) filter: Option<QueryFilter>,
    pub(crate) order_by: Vec<(String, SortOrder)>,
    pub(crate) includes: Vec<Include>,
}

impl QuerySpec {
    /// An unfiltered, unordered spec matching the full extent
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter condition; multiple calls combine with AND
    pub fn filter(mut self, filter: QueryFilter) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => QueryFilter::and(vec![existing, filter]),
            None => filter,
        });
        self
    }

    /// Add ordering by a property or column
    pub fn order_by(mut self, field: &str, order: SortOrder) -> Self {
        self.order_by.push((field.to_string(), order));
        self
    }

    /// Add a related-entity inclusion
    pub fn include(mut self, include: Include) -> Self {
        self.includes.push(include);
        self
    }

    pub fn has_filter(&self) -> bool {
        self.filter.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_spec_is_empty() {
        let spec = QuerySpec::new();
        assert!(!spec.has_filter());
        assert!(spec.order_by.is_empty());
        assert!(spec.includes.is_empty());
    }

    #[test]
    fn repeated_filters_combine_with_and() {
        let spec = QuerySpec::new()
            .filter(QueryFilter::eq("status", json!("active")))
            .filter(QueryFilter::gt("amount", json!(5)));

        match spec.filter {
            Some(QueryFilter::Group { filters, .. }) => assert_eq!(filters.len(), 2),
            other => panic!("expected AND group, got {:?}", other),
        }
    }

    #[test]
    fn builder_accumulates_ordering_and_includes() {
        let spec = QuerySpec::new()
            .order_by("name", SortOrder::Asc)
            .order_by("amount", SortOrder::Desc)
            .include(Include::relation("orders", "users.id", "orders.user_id"));

        assert_eq!(spec.order_by.len(), 2);
        assert_eq!(spec.includes.len(), 1);
    }
}
