//! Declarative filter and sort schema.
//!
//! A [`FilterDefinition`] is built once per entity (usually in a `LazyLock`) and then only
//! read. It maps the query-string keys a client may send to the columns they touch.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Data type of a filterable field. Decides the legal operators and how values are parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterType {
    Id,
    Number,
    String,
    Bool,
    Date,
    #[serde(rename = "DATETIME")]
    DateTime,
    Enum,
}

impl FilterType {
    /// Operators accepted for this type when a [`FilterConfig`] does not override them.
    #[must_use]
    pub const fn default_operators(self) -> &'static [FilterOperator] {
        use FilterOperator::{Between, Eq, Gt, Gte, In, Like, Lt, Lte, Neq, NotIn};
        match self {
            Self::Id | Self::Number => &[Eq, Neq, In, NotIn, Between, Gt, Gte, Lt, Lte],
            Self::String => &[Eq, Neq, In, NotIn, Like],
            Self::Bool => &[Eq],
            Self::Date | Self::DateTime => &[Eq, Between, Gte, Lte],
            Self::Enum => &[Eq, In],
        }
    }
}

/// Comparison requested by a filter value prefix such as `gte:` or `in:`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Eq,
    Neq,
    In,
    NotIn,
    Like,
    Between,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl FilterOperator {
    /// The query-string spelling of the operator.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::Like => "like",
            Self::Between => "between",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
        }
    }

    /// Whether `count` values is the right arity for this operator.
    #[must_use]
    pub const fn accepts_arity(self, count: usize) -> bool {
        match self {
            Self::Between => count == 2,
            Self::In | Self::NotIn => count > 0,
            _ => count == 1,
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of the known operator spellings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownOperator(pub String);

impl fmt::Display for UnknownOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown filter operator '{}'", self.0)
    }
}

impl std::error::Error for UnknownOperator {}

impl FromStr for FilterOperator {
    type Err = UnknownOperator;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "eq" => Self::Eq,
            "neq" => Self::Neq,
            "in" => Self::In,
            "not_in" => Self::NotIn,
            "like" => Self::Like,
            "between" => Self::Between,
            "gt" => Self::Gt,
            "gte" => Self::Gte,
            "lt" => Self::Lt,
            "lte" => Self::Lte,
            other => return Err(UnknownOperator(other.to_string())),
        })
    }
}

/// One filterable field.
///
/// ```rust
/// use crudkit::pagination::{FilterConfig, FilterType};
///
/// let search = FilterConfig::new("name", FilterType::String)
///     .search_fields(["name", "email"])
///     .table_name("users");
/// assert_eq!(search.fields(), vec!["users.name", "users.email"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterConfig {
    /// Primary column.
    pub field: String,
    /// Columns OR-ed together; replaces `field` when non-empty.
    pub search_fields: Vec<String>,
    pub filter_type: FilterType,
    /// Qualifier prefixed onto every column that is not already qualified.
    pub table_name: Option<String>,
    /// Overrides [`FilterType::default_operators`] when non-empty.
    pub operators: Vec<FilterOperator>,
    /// Whitelist for [`FilterType::Enum`].
    pub enum_values: Vec<String>,
}

impl FilterConfig {
    #[must_use]
    pub fn new(field: impl Into<String>, filter_type: FilterType) -> Self {
        Self {
            field: field.into(),
            search_fields: Vec::new(),
            filter_type,
            table_name: None,
            operators: Vec::new(),
            enum_values: Vec::new(),
        }
    }

    #[must_use]
    pub fn search_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn table_name(mut self, table: impl Into<String>) -> Self {
        self.table_name = Some(table.into());
        self
    }

    #[must_use]
    pub fn operators(mut self, operators: impl IntoIterator<Item = FilterOperator>) -> Self {
        self.operators = operators.into_iter().collect();
        self
    }

    #[must_use]
    pub fn enum_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = values.into_iter().map(Into::into).collect();
        self
    }

    /// The configured operators, or the type's defaults when none were configured.
    #[must_use]
    pub fn allowed_operators(&self) -> &[FilterOperator] {
        if self.operators.is_empty() {
            self.filter_type.default_operators()
        } else {
            &self.operators
        }
    }

    /// Columns this filter targets, table-qualified where a table name is configured.
    ///
    /// Always returns a fresh vector; the configuration is never rewritten.
    #[must_use]
    pub fn fields(&self) -> Vec<String> {
        let raw: &[String] = if self.search_fields.is_empty() {
            std::slice::from_ref(&self.field)
        } else {
            &self.search_fields
        };

        raw.iter()
            .filter(|field| !field.is_empty())
            .map(|field| match &self.table_name {
                Some(table) if !table.is_empty() && !field.contains('.') => {
                    format!("{table}.{field}")
                }
                _ => field.clone(),
            })
            .collect()
    }
}

/// One sortable field. Sorting is opt-in: `allowed` must be set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortConfig {
    pub field: String,
    pub table_name: Option<String>,
    pub allowed: bool,
}

impl SortConfig {
    /// A sortable field.
    #[must_use]
    pub fn allowed(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            table_name: None,
            allowed: true,
        }
    }

    /// A declared but disabled sort field; clients asking for it get the default order.
    #[must_use]
    pub fn disabled(field: impl Into<String>) -> Self {
        Self {
            allowed: false,
            ..Self::allowed(field)
        }
    }

    #[must_use]
    pub fn table_name(mut self, table: impl Into<String>) -> Self {
        self.table_name = Some(table.into());
        self
    }
}

/// Filter and sort registry for one query type. Last registration of a key wins.
#[derive(Debug, Clone, Default)]
pub struct FilterDefinition {
    filters: HashMap<String, FilterConfig>,
    sorts: HashMap<String, SortConfig>,
}

impl FilterDefinition {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn add_filter(mut self, key: impl Into<String>, config: FilterConfig) -> Self {
        self.filters.insert(key.into(), config);
        self
    }

    #[must_use]
    pub fn add_sort(mut self, key: impl Into<String>, config: SortConfig) -> Self {
        self.sorts.insert(key.into(), config);
        self
    }

    #[must_use]
    pub fn filter(&self, key: &str) -> Option<&FilterConfig> {
        self.filters.get(key)
    }

    #[must_use]
    pub fn sort(&self, key: &str) -> Option<&SortConfig> {
        self.sorts.get(key)
    }

    pub fn filters(&self) -> impl Iterator<Item = (&str, &FilterConfig)> {
        self.filters.iter().map(|(key, config)| (key.as_str(), config))
    }
}
