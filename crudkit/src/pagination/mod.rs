//! Filtering, sorting and paging driven by untyped query parameters.
//!
//! A [`FilterDefinition`] declares which query keys map to which columns and with which data
//! type. [`Pagination::new`] checks a request's [`QueryConditions`](crate::QueryConditions)
//! against it and keeps only what is valid:
//!
//! - `limit` / `offset`: positive / non-negative integers no larger than `i64::MAX`, `limit`
//!   capped at `max_limit`
//! - `sort`: `[table.]field [asc|desc]` clauses, all registered and allowed, or the default order
//! - every other registered key: `[<operator>:]<value>[,<value>...]`
//!
//! Anything malformed is dropped as if it had not been sent.
//!
//! ```rust,ignore
//! use crudkit::pagination::{FilterConfig, FilterDefinition, FilterType, SortConfig};
//!
//! static USER_FILTERS: LazyLock<FilterDefinition> = LazyLock::new(|| {
//!     FilterDefinition::new()
//!         .add_filter("status", FilterConfig::new("status", FilterType::String))
//!         .add_filter("q", FilterConfig::new("name", FilterType::String).search_fields(["name", "email"]))
//!         .add_filter("age", FilterConfig::new("age", FilterType::Number))
//!         .add_sort("age", SortConfig::allowed("age"))
//! });
//! ```

mod definition;
mod engine;
mod operation;
mod scopes;
mod sort;
mod values;
mod zone;

pub use definition::{
    FilterConfig, FilterDefinition, FilterOperator, FilterType, SortConfig, UnknownOperator,
};
pub use engine::{
    DEFAULT_LIMIT, DEFAULT_MAX_LIMIT, DEFAULT_ORDER, MAX_WINDOW, Pagination, PaginationOptions,
    Scope,
};
pub use operation::{FilterOperation, Rejection};
pub use sort::{OrderClause, order_clauses, validate_order};
pub use zone::{DEFAULT_TIMEZONE, InvalidTimezone, Timezone};
