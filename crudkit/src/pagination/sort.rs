use sea_orm::Order;
use sea_orm::sea_query::ColumnRef;

use super::definition::FilterDefinition;
use super::scopes::column_ref;

/// One validated `[table.]field [direction]` clause, resolved to a column.
#[derive(Debug, Clone)]
pub struct OrderClause {
    pub column: ColumnRef,
    pub direction: Order,
}

/// Convert a direction token to `Order`. Only `desc` (any case) sorts descending.
fn parse_direction(token: Option<&str>) -> Order {
    match token {
        Some(dir) if dir.eq_ignore_ascii_case("desc") => Order::Desc,
        _ => Order::Asc,
    }
}

/// Split `users.name` into `(Some("users"), "name")`.
fn split_qualifier(field: &str) -> (Option<&str>, &str) {
    match field.split_once('.') {
        Some((table, name)) => (Some(table), name),
        None => (None, field),
    }
}

/// Whether every clause of a comma-separated order string names an allowed sort field.
///
/// A table qualifier must match the configured table when one is configured. An empty
/// string is trivially valid.
#[must_use]
pub fn validate_order(order: &str, definition: &FilterDefinition) -> bool {
    order
        .split(',')
        .filter_map(|part| part.split_whitespace().next())
        .all(|field| {
            let (table, name) = split_qualifier(field);
            let Some(config) = definition.sort(name) else {
                return false;
            };
            if !config.allowed {
                return false;
            }
            match (config.table_name.as_deref(), table) {
                (Some(expected), Some(given)) if !expected.is_empty() => expected == given,
                _ => true,
            }
        })
}

/// Resolve a validated order string into typed clauses.
///
/// A registered `SortConfig::field` names the column and only the configured table qualifies
/// it; a client-supplied qualifier never reaches the query. Unregistered fields are used as
/// written; only the trusted default order can reach this function with one.
#[must_use]
pub fn order_clauses(order: &str, definition: &FilterDefinition) -> Vec<OrderClause> {
    order
        .split(',')
        .filter_map(|part| {
            let mut tokens = part.split_whitespace();
            let field = tokens.next()?;
            let (table, name) = split_qualifier(field);
            let config = definition.sort(name);

            let column_name = config
                .map(|config| config.field.as_str())
                .filter(|field| !field.is_empty())
                .unwrap_or(name);
            let table = match config {
                Some(config) => config.table_name.as_deref().filter(|table| !table.is_empty()),
                None => table,
            };
            let column = match table {
                Some(table) if !column_name.contains('.') => {
                    column_ref(&format!("{table}.{column_name}"))
                }
                _ => column_ref(column_name),
            };

            Some(OrderClause {
                column,
                direction: parse_direction(tokens.next()),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::SortConfig;

    fn definition() -> FilterDefinition {
        FilterDefinition::new()
            .add_sort("id", SortConfig::allowed("id"))
            .add_sort("name", SortConfig::allowed("name"))
            .add_sort("age", SortConfig::allowed("age").table_name("users"))
            .add_sort("password", SortConfig::disabled("password"))
            .add_sort("joined", SortConfig::allowed("created_at"))
    }

    #[test]
    fn test_valid_orders() {
        let def = definition();
        assert!(validate_order("", &def));
        assert!(validate_order("name", &def));
        assert!(validate_order("name asc, id desc", &def));
        assert!(validate_order("users.age desc", &def));
        assert!(validate_order("anything.name", &def));
        assert!(validate_order("name asc,,id", &def));
    }

    #[test]
    fn test_unknown_or_disabled_fields_invalidate_whole_order() {
        let def = definition();
        assert!(!validate_order("email asc", &def));
        assert!(!validate_order("name asc, email desc", &def));
        assert!(!validate_order("password", &def));
    }

    #[test]
    fn test_mismatched_table_is_rejected() {
        let def = definition();
        assert!(!validate_order("posts.age desc", &def));
    }

    #[test]
    fn test_directions() {
        assert_eq!(parse_direction(Some("DESC")), Order::Desc);
        assert_eq!(parse_direction(Some("desc")), Order::Desc);
        assert_eq!(parse_direction(Some("asc")), Order::Asc);
        assert_eq!(parse_direction(None), Order::Asc);
        assert_eq!(parse_direction(Some("sideways")), Order::Asc);
    }

    #[test]
    fn test_order_clauses_resolve_columns() {
        let def = definition();
        let clauses = order_clauses("age desc, joined, name ASC", &def);
        assert_eq!(clauses.len(), 3);

        assert_eq!(
            format!("{:?}", clauses[0].column),
            format!("{:?}", column_ref("users.age"))
        );
        assert_eq!(clauses[0].direction, Order::Desc);
        assert_eq!(
            format!("{:?}", clauses[1].column),
            format!("{:?}", column_ref("created_at"))
        );
        assert_eq!(clauses[1].direction, Order::Asc);
        assert_eq!(clauses[2].direction, Order::Asc);
    }

    #[test]
    fn test_client_qualifier_is_dropped_for_registered_fields() {
        let def = definition();
        let clauses = order_clauses("bogus.name asc, posts.joined desc", &def);

        assert_eq!(
            format!("{:?}", clauses[0].column),
            format!("{:?}", column_ref("name"))
        );
        assert_eq!(
            format!("{:?}", clauses[1].column),
            format!("{:?}", column_ref("created_at"))
        );

        let clauses = order_clauses("users.age", &def);
        assert_eq!(
            format!("{:?}", clauses[0].column),
            format!("{:?}", column_ref("users.age"))
        );
    }

    #[test]
    fn test_unregistered_default_column_is_used_as_written() {
        let clauses = order_clauses("users.created_at desc", &FilterDefinition::new());
        assert_eq!(clauses.len(), 1);
        assert_eq!(
            format!("{:?}", clauses[0].column),
            format!("{:?}", column_ref("users.created_at"))
        );
        assert_eq!(clauses[0].direction, Order::Desc);
    }

    #[test]
    fn test_empty_order_has_no_clauses() {
        assert!(order_clauses("", &definition()).is_empty());
    }
}
