//! Query-string driven filtering, sorting and paging for Axum and Sea-ORM services, plus a
//! generic repository to run the result.
//!
//! ```rust,ignore
//! async fn list_users(
//!     State(app): State<AppState>,
//!     conditions: QueryConditions,
//! ) -> Result<ListResponse<user::Model>, ApiError> {
//!     let pagination = Pagination::new(conditions, &USER_FILTERS, app.pagination.clone());
//!     app.users.find_page(&ExecContext::new(), &pagination).await
//! }
//! ```

pub mod config;
pub mod context;
pub mod errors;
pub mod pagination;
pub mod query;
pub mod repository;
pub mod response;
pub mod validation;

pub use config::{AppConfig, ConfigError, DatabaseConfig, PaginationConfig};
pub use context::ExecContext;
pub use errors::ApiError;
pub use pagination::{
    FilterConfig, FilterDefinition, FilterOperator, FilterType, Pagination, PaginationOptions,
    SortConfig, Timezone,
};
pub use query::QueryConditions;
pub use repository::{CrudRepository, ModelOf, PrimaryKeyOf, Repository};
pub use response::{ApiResponse, ListResponse, Meta};
pub use validation::{ExistRule, UniqueRule, ValidationError, ValidationErrors};

/// Token type accepted by [`ExecContext::from_token`].
pub use tokio_util::sync::CancellationToken;
