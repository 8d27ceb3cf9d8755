//! Query composer
//!
//! Builds the SQL of a composed query from a `QuerySpec`, in a fixed
//! application order: related-entity includes rewrite the base source
//! first, ordering applies to the included query, and a missing filter
//! defaults to `WHERE TRUE` so every composed query is well-formed and
//! returns the full extent. Composed queries render SELECT only and carry
//! their parameter values; nothing executes until a repository enumerates
//! or aggregates them.

use crate::query::filter::{LogicalOperator, QueryCondition, QueryFilter, QueryOperator};
use crate::query::include::Include;
use crate::query::ordering::SortOrder;
use crate::query::spec::QuerySpec;
use entity_mapping::{ColumnMapper, Entity, MappingError};
use serde_json::Value;

/// A fully composed, read-only query: SQL text plus ordered parameter values
#[derive(Debug, Clone)]
pub struct ComposedQuery {
    sql: String,
    params: Vec<Value>,
}

impl ComposedQuery {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }
}

/// Aggregate functions supported over a composed query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Max,
    Min,
}

impl AggregateFunction {
    pub fn to_sql(self) -> &'static str {
        match self {
            AggregateFunction::Max => "MAX",
            AggregateFunction::Min => "MIN",
        }
    }
}

pub(crate) fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name)
}

/// Resolve a filter/ordering identifier.
///
/// Bare identifiers matching an entity property map to their quoted column;
/// qualified or unmatched identifiers pass through verbatim.
fn resolve_field<E: Entity>(name: &str) -> String {
    if name.contains('.') {
        return name.to_string();
    }
    match ColumnMapper::column_for::<E>(name) {
        Ok(column) => quote_identifier(column),
        Err(_) => name.to_string(),
    }
}

/// Composes SELECT, COUNT and aggregate queries over an entity type
pub struct QueryComposer;

impl QueryComposer {
    /// Compose the SELECT for a query spec
    pub fn compose<E: Entity>(spec: &QuerySpec) -> ComposedQuery {
        let mut params = Vec::new();
        let mut counter = 1;

        let join_clause = build_join_clause(&spec.includes);
        let order_clause = build_order_clause::<E>(&spec.order_by);
        let where_clause = build_where_clause::<E>(spec.filter.as_ref(), &mut params, &mut counter);

        let base = E::select_base_sql();
        let mut sql = String::with_capacity(
            base.len() + join_clause.len() + where_clause.len() + order_clause.len(),
        );
        sql.push_str(base);
        sql.push_str(&join_clause);
        sql.push_str(&where_clause);
        sql.push_str(&order_clause);

        ComposedQuery { sql, params }
    }

    /// Compose the SELECT for a query spec, limited to the first match
    pub fn compose_first<E: Entity>(spec: &QuerySpec) -> ComposedQuery {
        let mut composed = Self::compose::<E>(spec);
        composed.sql.push_str(" LIMIT 1");
        composed
    }

    /// Compose a COUNT over an optional filter
    pub fn compose_count<E: Entity>(filter: Option<&QueryFilter>) -> ComposedQuery {
        let mut params = Vec::new();
        let mut counter = 1;

        let where_clause = build_where_clause::<E>(filter, &mut params, &mut counter);

        let base = E::count_base_sql();
        let mut sql = String::with_capacity(base.len() + where_clause.len());
        sql.push_str(base);
        sql.push_str(&where_clause);

        ComposedQuery { sql, params }
    }

    /// Compose a MAX/MIN over a filtered, non-ordered, non-included query
    pub fn compose_aggregate<E: Entity>(
        function: AggregateFunction,
        property: &str,
        filter: &QueryFilter,
    ) -> Result<ComposedQuery, MappingError> {
        let column = ColumnMapper::column_for::<E>(property)?;

        let mut params = Vec::new();
        let mut counter = 1;
        let where_clause = build_where_clause::<E>(Some(filter), &mut params, &mut counter);

        let sql = format!(
            "SELECT {}({}) AS agg FROM {}{}",
            function.to_sql(),
            quote_identifier(column),
            quote_identifier(E::table_name()),
            where_clause,
        );

        Ok(ComposedQuery { sql, params })
    }
}

fn build_join_clause(includes: &[Include]) -> String {
    // Duplicate targets collapse to the last include given; distinct targets
    // all apply, in order.
    let mut applied: Vec<&Include> = Vec::new();
    for include in includes {
        if let Some(slot) = applied.iter_mut().find(|existing| existing.same_target(include)) {
            *slot = include;
        } else {
            applied.push(include);
        }
    }

    let mut clause = String::new();
    for include in applied {
        clause.push_str(" LEFT JOIN ");
        clause.push_str(&quote_identifier(&include.table));
        if let Some(alias) = &include.alias {
            clause.push_str(" AS ");
            clause.push_str(&quote_identifier(alias));
        }
        clause.push_str(" ON ");
        clause.push_str(&include.local_column);
        clause.push_str(" = ");
        clause.push_str(&include.foreign_column);
    }
    clause
}

fn build_order_clause<E: Entity>(order_by: &[(String, SortOrder)]) -> String {
    if order_by.is_empty() {
        return String::new();
    }

    let parts: Vec<String> = order_by
        .iter()
        .map(|(field, order)| format!("{} {}", resolve_field::<E>(field), order.to_sql()))
        .collect();

    format!(" ORDER BY {}", parts.join(", "))
}

fn build_where_clause<E: Entity>(
    filter: Option<&QueryFilter>,
    params: &mut Vec<Value>,
    counter: &mut i32,
) -> String {
    let rendered = filter
        .map(|f| render_filter::<E>(f, params, counter))
        .unwrap_or_default();

    if rendered.is_empty() {
        " WHERE TRUE".to_string()
    } else {
        format!(" WHERE {}", rendered)
    }
}

fn render_filter<E: Entity>(
    filter: &QueryFilter,
    params: &mut Vec<Value>,
    counter: &mut i32,
) -> String {
    match filter {
        QueryFilter::Condition(condition) => render_condition::<E>(condition, params, counter),
        QueryFilter::Group { operator, filters } => {
            let operator_str = match operator {
                LogicalOperator::And => " AND ",
                LogicalOperator::Or => " OR ",
            };

            let parts: Vec<String> = filters
                .iter()
                .map(|f| render_filter::<E>(f, params, counter))
                .filter(|s| !s.is_empty())
                .collect();

            match parts.len() {
                0 => String::new(),
                1 => parts.into_iter().next().unwrap_or_default(),
                _ => format!("({})", parts.join(operator_str)),
            }
        }
    }
}

fn render_condition<E: Entity>(
    condition: &QueryCondition,
    params: &mut Vec<Value>,
    counter: &mut i32,
) -> String {
    let field = resolve_field::<E>(&condition.field);

    let push_param = |value: &Value, params: &mut Vec<Value>, counter: &mut i32| {
        params.push(value.clone());
        let placeholder = format!("${}", counter);
        *counter += 1;
        placeholder
    };

    match &condition.operator {
        QueryOperator::Eq => match &condition.value {
            Some(value) => {
                let placeholder = push_param(value, params, counter);
                format!("{} = {}", field, placeholder)
            }
            None => format!("{} IS NULL", field),
        },
        QueryOperator::Ne => match &condition.value {
            Some(value) => {
                let placeholder = push_param(value, params, counter);
                format!("{} != {}", field, placeholder)
            }
            None => format!("{} IS NOT NULL", field),
        },
        QueryOperator::Gt
        | QueryOperator::Gte
        | QueryOperator::Lt
        | QueryOperator::Lte
        | QueryOperator::Like
        | QueryOperator::ILike => match &condition.value {
            Some(value) => {
                let symbol = match condition.operator {
                    QueryOperator::Gt => ">",
                    QueryOperator::Gte => ">=",
                    QueryOperator::Lt => "<",
                    QueryOperator::Lte => "<=",
                    QueryOperator::Like => "LIKE",
                    _ => "ILIKE",
                };
                let placeholder = push_param(value, params, counter);
                format!("{} {} {}", field, symbol, placeholder)
            }
            None => String::new(),
        },
        QueryOperator::In => match &condition.value {
            Some(Value::Array(values)) if !values.is_empty() => {
                let placeholders: Vec<String> = values
                    .iter()
                    .map(|value| push_param(value, params, counter))
                    .collect();
                format!("{} IN ({})", field, placeholders.join(", "))
            }
            // IN () is invalid SQL; an empty list matches nothing
            Some(Value::Array(_)) => "FALSE".to_string(),
            _ => String::new(),
        },
        QueryOperator::NotIn => match &condition.value {
            Some(Value::Array(values)) if !values.is_empty() => {
                let placeholders: Vec<String> = values
                    .iter()
                    .map(|value| push_param(value, params, counter))
                    .collect();
                format!("{} NOT IN ({})", field, placeholders.join(", "))
            }
            // NOT IN () excludes nothing
            Some(Value::Array(_)) => "TRUE".to_string(),
            _ => String::new(),
        },
        QueryOperator::IsNull => format!("{} IS NULL", field),
        QueryOperator::IsNotNull => format!("{} IS NOT NULL", field),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entity_derive::Entity;
    use serde_json::json;

    #[derive(Debug, Clone, Default, Entity)]
    #[entity(table = "gadgets")]
    struct Gadget {
        #[key]
        id: i32,
        name: String,
        #[column(name = "unit_price")]
        price: f64,
    }

    #[test]
    fn empty_spec_composes_full_extent() {
        let composed = QueryComposer::compose::<Gadget>(&QuerySpec::new());

        assert_eq!(
            composed.sql(),
            r#"SELECT "gadgets".* FROM "gadgets" WHERE TRUE"#
        );
        assert!(composed.params().is_empty());
    }

    #[test]
    fn filter_renders_placeholders_and_resolves_properties() {
        let spec = QuerySpec::new().filter(QueryFilter::and(vec![
            QueryFilter::eq("name", json!("widget")),
            QueryFilter::gt("price", json!(10.0)),
        ]));
        let composed = QueryComposer::compose::<Gadget>(&spec);

        assert_eq!(
            composed.sql(),
            r#"SELECT "gadgets".* FROM "gadgets" WHERE ("name" = $1 AND "unit_price" > $2)"#
        );
        assert_eq!(composed.params(), &[json!("widget"), json!(10.0)]);
    }

    #[test]
    fn unmatched_and_qualified_fields_pass_through() {
        let spec = QuerySpec::new().filter(QueryFilter::eq("makers.region", json!("EU")));
        let composed = QueryComposer::compose::<Gadget>(&spec);

        assert!(composed.sql().contains("makers.region = $1"));
    }

    #[test]
    fn ordering_applies_after_includes() {
        let spec = QuerySpec::new()
            .include(Include::relation("makers", "\"gadgets\".maker_id", "makers.id"))
            .order_by("price", SortOrder::Desc);
        let composed = QueryComposer::compose::<Gadget>(&spec);

        assert_eq!(
            composed.sql(),
            r#"SELECT "gadgets".* FROM "gadgets" LEFT JOIN "makers" ON "gadgets".maker_id = makers.id WHERE TRUE ORDER BY "unit_price" DESC"#
        );
    }

    #[test]
    fn duplicate_include_targets_collapse_to_the_last() {
        let spec = QuerySpec::new()
            .include(Include::relation("makers", "a.maker_id", "makers.id"))
            .include(Include::relation("makers", "a.vendor_id", "makers.id"))
            .include(Include::relation("regions", "makers.region_id", "regions.id"));
        let composed = QueryComposer::compose::<Gadget>(&spec);

        let sql = composed.sql();
        assert!(!sql.contains("a.maker_id"));
        assert!(sql.contains("a.vendor_id"));
        assert!(sql.contains(r#"LEFT JOIN "regions""#));
        assert_eq!(sql.matches("LEFT JOIN").count(), 2);
    }

    #[test]
    fn aliased_include_is_a_distinct_target() {
        let spec = QuerySpec::new()
            .include(Include::relation("makers", "g.maker_id", "m1.id").with_alias("m1"))
            .include(Include::relation("makers", "g.vendor_id", "m2.id").with_alias("m2"));
        let composed = QueryComposer::compose::<Gadget>(&spec);

        assert_eq!(composed.sql().matches("LEFT JOIN").count(), 2);
    }

    #[test]
    fn compose_first_limits_to_one_row() {
        let composed = QueryComposer::compose_first::<Gadget>(&QuerySpec::new());
        assert!(composed.sql().ends_with(" LIMIT 1"));
    }

    #[test]
    fn compose_count_defaults_to_match_all() {
        let composed = QueryComposer::compose_count::<Gadget>(None);
        assert_eq!(
            composed.sql(),
            r#"SELECT COUNT(*) AS total FROM "gadgets" WHERE TRUE"#
        );
    }

    #[test]
    fn compose_aggregate_resolves_the_selector() {
        let filter = QueryFilter::is_not_null("name");
        let composed =
            QueryComposer::compose_aggregate::<Gadget>(AggregateFunction::Max, "price", &filter)
                .expect("mapped property");

        assert_eq!(
            composed.sql(),
            r#"SELECT MAX("unit_price") AS agg FROM "gadgets" WHERE "name" IS NOT NULL"#
        );
    }

    #[test]
    fn compose_aggregate_rejects_unknown_property() {
        let filter = QueryFilter::is_not_null("name");
        assert!(QueryComposer::compose_aggregate::<Gadget>(
            AggregateFunction::Min,
            "weight",
            &filter
        )
        .is_err());
    }

    #[test]
    fn empty_in_list_matches_nothing() {
        let spec = QuerySpec::new().filter(QueryFilter::in_values("name", vec![]));
        let composed = QueryComposer::compose::<Gadget>(&spec);

        assert!(composed.sql().ends_with("WHERE FALSE"));
        assert!(composed.params().is_empty());
    }

    #[test]
    fn parameter_numbering_is_sequential_across_groups() {
        let spec = QuerySpec::new().filter(QueryFilter::or(vec![
            QueryFilter::eq("name", json!("a")),
            QueryFilter::in_values("id", vec![json!(1), json!(2)]),
        ]));
        let composed = QueryComposer::compose::<Gadget>(&spec);

        assert!(composed.sql().contains("$1"));
        assert!(composed.sql().contains("$2"));
        assert!(composed.sql().contains("$3"));
        assert_eq!(composed.params().len(), 3);
    }
}
