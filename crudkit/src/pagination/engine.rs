use std::fmt;
use std::sync::Arc;

use sea_orm::sea_query::SimpleExpr;
use sea_orm::{Condition, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Select};

use super::definition::FilterDefinition;
use super::operation::FilterOperation;
use super::scopes::build_condition;
use super::sort::{OrderClause, order_clauses, validate_order};
use super::zone::Timezone;
use crate::query::QueryConditions;

pub const DEFAULT_LIMIT: u64 = 20;
pub const DEFAULT_MAX_LIMIT: u64 = 100;
pub const DEFAULT_ORDER: &str = "id desc";
/// Largest limit or offset a database driver binds without overflowing a signed 64-bit column.
pub const MAX_WINDOW: u64 = i64::MAX.unsigned_abs();

const LIMIT_KEY: &str = "limit";
const OFFSET_KEY: &str = "offset";
const SORT_KEY: &str = "sort";

/// A composable query transformation.
pub type Scope<E> = Arc<dyn Fn(Select<E>) -> Select<E> + Send + Sync>;

/// Paging defaults. Zero, empty and unset values are replaced by the crate defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationOptions {
    pub default_limit: u64,
    pub max_limit: u64,
    pub default_order: String,
    pub timezone: Option<Timezone>,
}

impl PaginationOptions {
    /// Fill every unset field with its default.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        if self.default_limit == 0 {
            self.default_limit = DEFAULT_LIMIT;
        }
        if self.max_limit == 0 {
            self.max_limit = DEFAULT_MAX_LIMIT;
        }
        self.default_limit = self.default_limit.min(MAX_WINDOW);
        self.max_limit = self.max_limit.min(MAX_WINDOW);
        if self.default_order.trim().is_empty() {
            self.default_order = DEFAULT_ORDER.to_string();
        }
        self.timezone.get_or_insert_with(Timezone::default);
        self
    }

    #[must_use]
    pub fn timezone(&self) -> Timezone {
        self.timezone.unwrap_or_default()
    }
}

/// Query state for one request: the page window, the order and every filter that survived
/// validation.
///
/// Built once from the raw query multimap and then only read, apart from
/// [`add_custom_scope`](Self::add_custom_scope).
///
/// ```rust,ignore
/// let pagination = Pagination::new(conditions, &USER_FILTERS, PaginationOptions::default());
/// let rows = pagination.apply(users::Entity::find()).all(&db).await?;
/// let total = pagination.apply_without_meta(users::Entity::find()).count(&db).await?;
/// ```
pub struct Pagination<E: EntityTrait> {
    limit: u64,
    offset: u64,
    order: String,
    order_clauses: Vec<OrderClause>,
    filters: Vec<(String, Condition)>,
    custom_scopes: Vec<Scope<E>>,
    raw: QueryConditions,
    options: PaginationOptions,
}

impl<E: EntityTrait> Pagination<E> {
    #[must_use]
    pub fn new(
        conditions: QueryConditions,
        definition: &FilterDefinition,
        options: PaginationOptions,
    ) -> Self {
        let options = options.with_defaults();

        let limit = conditions
            .first(LIMIT_KEY)
            .and_then(parse_window)
            .filter(|limit| *limit > 0)
            .map_or(options.default_limit, |limit| limit.min(options.max_limit));

        let offset = conditions.first(OFFSET_KEY).and_then(parse_window).unwrap_or(0);

        let order = match conditions.first(SORT_KEY) {
            Some(sort) if validate_order(sort, definition) => sort.to_string(),
            Some(sort) => {
                tracing::debug!(
                    sort,
                    fallback = %options.default_order,
                    "Rejected sort, using default order"
                );
                options.default_order.clone()
            }
            None => options.default_order.clone(),
        };
        let order_clauses = order_clauses(&order, definition);

        let filters = compile_filters(&conditions, definition, options.timezone());

        Self {
            limit,
            offset,
            order,
            order_clauses,
            filters,
            custom_scopes: Vec::new(),
            raw: conditions,
            options,
        }
    }

    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.limit
    }

    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    /// The resolved order string, verbatim. Empty means unordered.
    #[must_use]
    pub fn order(&self) -> &str {
        &self.order
    }

    #[must_use]
    pub const fn options(&self) -> &PaginationOptions {
        &self.options
    }

    /// The multimap this pagination was built from.
    #[must_use]
    pub const fn raw_conditions(&self) -> &QueryConditions {
        &self.raw
    }

    /// Filter key and compiled condition of every filter that will be applied.
    pub fn conditions(&self) -> impl Iterator<Item = (&str, &Condition)> {
        self.filters.iter().map(|(key, condition)| (key.as_str(), condition))
    }

    /// Whether the filter registered under `key` survived validation.
    #[must_use]
    pub fn is_filtered_by(&self, key: &str) -> bool {
        self.filters.iter().any(|(filter_key, _)| filter_key == key)
    }

    /// Append a caller-supplied scope. It runs after the declared filters, before limit,
    /// offset and order, and is also part of [`apply_without_meta`](Self::apply_without_meta).
    pub fn add_custom_scope<F>(&mut self, scope: F) -> &mut Self
    where
        F: Fn(Select<E>) -> Select<E> + Send + Sync + 'static,
    {
        self.custom_scopes.push(Arc::new(scope));
        self
    }

    /// Declared filters followed by custom scopes, in application order.
    #[must_use]
    pub fn filter_scopes(&self) -> Vec<Scope<E>> {
        self.filters
            .iter()
            .map(|(_, condition)| {
                let condition = condition.clone();
                Arc::new(move |query: Select<E>| query.filter(condition.clone())) as Scope<E>
            })
            .chain(self.custom_scopes.iter().cloned())
            .collect()
    }

    /// Limit, offset and order, in that order.
    #[must_use]
    pub fn meta_scopes(&self) -> Vec<Scope<E>> {
        let (limit, offset) = (self.limit, self.offset);
        let clauses = self.order_clauses.clone();
        let limit: Scope<E> = Arc::new(move |query: Select<E>| query.limit(limit));
        let offset: Scope<E> = Arc::new(move |query: Select<E>| query.offset(offset));
        let order: Scope<E> = Arc::new(move |query: Select<E>| order_by(query, &clauses));
        vec![limit, offset, order]
    }

    /// Filters, custom scopes, then limit, offset and order.
    #[must_use]
    pub fn apply(&self, query: Select<E>) -> Select<E> {
        let query = self.apply_without_meta(query).limit(self.limit).offset(self.offset);
        order_by(query, &self.order_clauses)
    }

    /// Filters and custom scopes only, for counting every match.
    #[must_use]
    pub fn apply_without_meta(&self, query: Select<E>) -> Select<E> {
        let query = self
            .filters
            .iter()
            .fold(query, |query, (_, condition)| query.filter(condition.clone()));
        self.custom_scopes.iter().fold(query, |query, scope| scope(query))
    }
}

impl<E: EntityTrait> fmt::Debug for Pagination<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pagination")
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .field("order", &self.order)
            .field("filters", &self.filters.iter().map(|(key, _)| key).collect::<Vec<_>>())
            .field("custom_scopes", &self.custom_scopes.len())
            .finish_non_exhaustive()
    }
}

/// A non-negative integer that fits a signed 64-bit bind parameter.
fn parse_window(raw: &str) -> Option<u64> {
    raw.parse::<i64>()
        .ok()
        .and_then(|value| u64::try_from(value).ok())
}

fn order_by<E: EntityTrait>(query: Select<E>, clauses: &[OrderClause]) -> Select<E> {
    clauses.iter().fold(query, |query, clause| {
        query.order_by(SimpleExpr::Column(clause.column.clone()), clause.direction.clone())
    })
}

/// Compile every registered filter present in `conditions`; invalid ones are dropped.
fn compile_filters(
    conditions: &QueryConditions,
    definition: &FilterDefinition,
    tz: Timezone,
) -> Vec<(String, Condition)> {
    conditions
        .iter()
        .filter_map(|(key, values)| {
            let config = definition.filter(key)?;
            let raw = values.first()?;
            let compiled = FilterOperation::parse(raw)
                .and_then(|operation| build_condition(config, &operation, tz));
            match compiled {
                Ok(condition) => {
                    tracing::trace!(key, raw = %raw, "Compiled filter");
                    Some((key.to_string(), condition))
                }
                Err(reason) => {
                    tracing::debug!(key, raw = %raw, %reason, "Dropping filter");
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::{FilterConfig, FilterType, SortConfig};
    use sea_orm::{ColumnTrait, DbBackend, QueryTrait};

    mod user {
        use sea_orm::entity::prelude::*;

        #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
        #[sea_orm(table_name = "users")]
        pub struct Model {
            #[sea_orm(primary_key)]
            pub id: i32,
            pub name: String,
            pub status: String,
            pub age: i32,
            pub is_active: bool,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }

    fn definition() -> FilterDefinition {
        FilterDefinition::new()
            .add_filter("status", FilterConfig::new("status", FilterType::String))
            .add_filter("age", FilterConfig::new("age", FilterType::Number))
            .add_filter("is_active", FilterConfig::new("is_active", FilterType::Bool))
            .add_sort("age", SortConfig::allowed("age"))
            .add_sort("name", SortConfig::allowed("name"))
            .add_sort("password", SortConfig::disabled("password"))
    }

    fn conditions(pairs: &[(&str, &str)]) -> QueryConditions {
        pairs.iter().copied().collect()
    }

    fn paginate(pairs: &[(&str, &str)], options: PaginationOptions) -> Pagination<user::Entity> {
        Pagination::new(conditions(pairs), &definition(), options)
    }

    fn sql(query: Select<user::Entity>) -> String {
        query.build(DbBackend::Sqlite).to_string()
    }

    #[test]
    fn test_options_defaults() {
        let options = PaginationOptions::default().with_defaults();
        assert_eq!(options.default_limit, 20);
        assert_eq!(options.max_limit, 100);
        assert_eq!(options.default_order, "id desc");
        assert_eq!(options.timezone(), Timezone::default());
    }

    #[test]
    fn test_explicit_options_survive_defaulting() {
        let options = PaginationOptions {
            default_limit: 5,
            max_limit: 50,
            default_order: "name asc".to_string(),
            timezone: Some("UTC".parse().unwrap()),
        }
        .with_defaults();
        assert_eq!(options.default_limit, 5);
        assert_eq!(options.max_limit, 50);
        assert_eq!(options.default_order, "name asc");
        assert_eq!(options.timezone().to_string(), "UTC");
    }

    #[test]
    fn test_limit_is_clamped() {
        let options = PaginationOptions {
            max_limit: 50,
            ..PaginationOptions::default()
        };
        assert_eq!(paginate(&[("limit", "500")], options.clone()).limit(), 50);
        assert_eq!(paginate(&[("limit", "7")], options.clone()).limit(), 7);
        assert_eq!(paginate(&[("limit", "0")], options.clone()).limit(), 20);
        assert_eq!(paginate(&[("limit", "-3")], options.clone()).limit(), 20);
        assert_eq!(paginate(&[("limit", "ten")], options.clone()).limit(), 20);
        assert_eq!(paginate(&[], options).limit(), 20);
    }

    #[test]
    fn test_offset_floor() {
        let options = PaginationOptions::default();
        assert_eq!(paginate(&[("offset", "15")], options.clone()).offset(), 15);
        assert_eq!(paginate(&[("offset", "-1")], options.clone()).offset(), 0);
        assert_eq!(paginate(&[("offset", "abc")], options.clone()).offset(), 0);
        assert_eq!(paginate(&[], options).offset(), 0);
    }

    #[test]
    fn test_window_beyond_signed_range_is_ignored() {
        let options = PaginationOptions::default();
        let huge = u64::MAX.to_string();
        let huge = huge.as_str();
        let pagination = paginate(&[("offset", huge), ("limit", huge)], options.clone());
        assert_eq!(pagination.offset(), 0);
        assert_eq!(pagination.limit(), 20);

        let largest = i64::MAX.to_string();
        let pagination = paginate(&[("offset", largest.as_str())], options.clone());
        assert_eq!(pagination.offset(), MAX_WINDOW);
        let sql = sql(paginate(&[("offset", huge)], options).apply(user::Entity::find()));
        assert!(sql.contains("OFFSET 0"), "{sql}");
    }

    #[test]
    fn test_unbounded_options_are_capped() {
        let options = PaginationOptions {
            default_limit: u64::MAX,
            max_limit: u64::MAX,
            ..PaginationOptions::default()
        }
        .with_defaults();
        assert_eq!(options.default_limit, MAX_WINDOW);
        assert_eq!(options.max_limit, MAX_WINDOW);
    }

    #[test]
    fn test_invalid_sort_falls_back_to_default_order() {
        let options = PaginationOptions::default();
        assert_eq!(paginate(&[("sort", "age desc")], options.clone()).order(), "age desc");
        assert_eq!(paginate(&[("sort", "email")], options.clone()).order(), "id desc");
        assert_eq!(
            paginate(&[("sort", "age desc, password")], options.clone()).order(),
            "id desc"
        );
        assert_eq!(paginate(&[], options).order(), "id desc");
    }

    #[test]
    fn test_only_valid_filters_are_compiled() {
        let pagination = paginate(
            &[
                ("status", "active"),
                ("age", "gte:old"),
                ("is_active", "between:true,false"),
                ("unknown", "x"),
            ],
            PaginationOptions::default(),
        );
        assert!(pagination.is_filtered_by("status"));
        assert!(!pagination.is_filtered_by("age"));
        assert!(!pagination.is_filtered_by("is_active"));
        assert_eq!(pagination.conditions().count(), 1);
    }

    #[test]
    fn test_apply_adds_filters_then_meta() {
        let pagination = paginate(
            &[("status", "active"), ("age", "gte:28"), ("limit", "5"), ("sort", "age desc")],
            PaginationOptions::default(),
        );
        let sql = sql(pagination.apply(user::Entity::find()));

        assert!(sql.contains(r#""age" >= 28"#), "{sql}");
        assert!(sql.contains(r#""status" = 'active'"#), "{sql}");
        assert!(sql.contains(r#"ORDER BY "age" DESC"#), "{sql}");
        assert!(sql.contains("LIMIT 5"), "{sql}");
        assert!(sql.contains("OFFSET 0"), "{sql}");
    }

    #[test]
    fn test_apply_without_meta_skips_window_and_order() {
        let pagination = paginate(
            &[("status", "active"), ("limit", "5"), ("offset", "10"), ("sort", "age")],
            PaginationOptions::default(),
        );
        let sql = sql(pagination.apply_without_meta(user::Entity::find()));

        assert!(sql.contains(r#""status" = 'active'"#), "{sql}");
        assert!(!sql.contains("LIMIT"), "{sql}");
        assert!(!sql.contains("OFFSET"), "{sql}");
        assert!(!sql.contains("ORDER BY"), "{sql}");
    }

    #[test]
    fn test_custom_scopes_apply_to_both_paths() {
        let mut pagination = paginate(&[("status", "active")], PaginationOptions::default());
        pagination.add_custom_scope(|query| query.filter(user::Column::Age.lt(65)));

        let full = sql(pagination.apply(user::Entity::find()));
        let count = sql(pagination.apply_without_meta(user::Entity::find()));
        for sql in [full, count] {
            assert!(sql.contains(r#""users"."age" < 65"#), "{sql}");
            assert!(sql.contains(r#""status" = 'active'"#), "{sql}");
        }
    }

    #[test]
    fn test_scope_lists_compose_like_apply() {
        let mut pagination = paginate(
            &[("status", "active"), ("limit", "3"), ("sort", "name")],
            PaginationOptions::default(),
        );
        pagination.add_custom_scope(|query| query.filter(user::Column::IsActive.eq(true)));

        let filter_scopes = pagination.filter_scopes();
        assert_eq!(filter_scopes.len(), 2);
        assert_eq!(pagination.meta_scopes().len(), 3);

        let composed = filter_scopes
            .iter()
            .chain(pagination.meta_scopes().iter())
            .fold(user::Entity::find(), |query, scope| scope(query));
        assert_eq!(sql(composed), sql(pagination.apply(user::Entity::find())));
    }

    #[test]
    fn test_empty_sort_means_unordered() {
        let pagination = paginate(&[("sort", "")], PaginationOptions::default());
        assert_eq!(pagination.order(), "");
        assert!(!sql(pagination.apply(user::Entity::find())).contains("ORDER BY"));
    }

    #[test]
    fn test_default_order_is_applied() {
        let pagination = paginate(&[], PaginationOptions::default());
        let sql = sql(pagination.apply(user::Entity::find()));
        assert!(sql.contains(r#"ORDER BY "id" DESC"#), "{sql}");
        assert!(sql.contains("LIMIT 20"), "{sql}");
    }
}
