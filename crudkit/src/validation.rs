//! Validation support
//!
//! Field-level [`ValidationError`]s, collected into [`ValidationErrors`] and turned into a
//! 422 [`ApiError`], plus the two database-backed rules a CRUD payload usually needs:
//!
//! - [`UniqueRule`]: the value must not exist yet (`"users.email"`)
//! - [`ExistRule`]: the value must reference an existing row (`"roles.id"`)
//!
//! # Example
//!
//! ```rust,ignore
//! use crudkit::validation::{ExistRule, UniqueRule, ValidationErrors};
//!
//! let mut errors = ValidationErrors::new();
//! if let Some(rule) = UniqueRule::parse("users.email") {
//!     errors.check(rule.soft_delete("deleted_at").validate(&db, "email", &payload.email).await);
//! }
//! errors.result()?;
//! ```
//!
//! The two rules treat storage failures differently: `unique` passes when the count query
//! fails, `exist` rejects.

use sea_orm::sea_query::{Alias, Asterisk, Expr, Query, SelectStatement};
use sea_orm::{ConnectionTrait, DbErr, Value};
use serde::Serialize;
use std::fmt;

use crate::errors::ApiError;

/// Validation error with field name and message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Collection of validation errors
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Record the error of a failed check; successful checks are ignored.
    pub fn check(&mut self, result: Result<(), ValidationError>) {
        if let Err(error) = result {
            self.add(error);
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// `Ok(())` when nothing was recorded.
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one error was recorded.
    pub fn result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation failed with {} error(s):", self.errors.len())?;
        for error in &self.errors {
            write!(f, "\n  - {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl From<ValidationError> for ApiError {
    fn from(error: ValidationError) -> Self {
        Self::validation_failed(vec![error.to_string()])
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        Self::validation_failed(errors.errors.iter().map(ToString::to_string).collect())
    }
}

/// `"table.column"` with both parts non-empty.
fn parse_target(rule: &str) -> Option<(String, String)> {
    let mut parts = rule.split('.');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(table), Some(column), None) if !table.is_empty() && !column.is_empty() => {
            Some((table.to_string(), column.to_string()))
        }
        _ => None,
    }
}

/// `SELECT COUNT(*) FROM table WHERE column = value [AND soft_delete IS NULL]`
fn count_statement(
    table: &str,
    column: &str,
    value: Value,
    soft_delete: Option<&str>,
) -> SelectStatement {
    let mut stmt = Query::select();
    stmt.expr(Expr::col(Asterisk).count())
        .from(Alias::new(table))
        .and_where(Expr::col(Alias::new(column)).eq(value));
    if let Some(deleted_at) = soft_delete {
        stmt.and_where(Expr::col(Alias::new(deleted_at)).is_null());
    }
    stmt
}

async fn count_matching<C: ConnectionTrait>(db: &C, stmt: &SelectStatement) -> Result<i64, DbErr> {
    let backend = db.get_database_backend();
    match db.query_one(backend.build(stmt)).await? {
        Some(row) => row.try_get_by_index::<i64>(0),
        None => Ok(0),
    }
}

/// The value must not already be stored in `table.column`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueRule {
    table: String,
    column: String,
    soft_delete: Option<String>,
}

impl UniqueRule {
    /// Parse `"table.column"`. Anything else yields `None`.
    #[must_use]
    pub fn parse(rule: &str) -> Option<Self> {
        parse_target(rule).map(|(table, column)| Self {
            table,
            column,
            soft_delete: None,
        })
    }

    /// Ignore rows whose `column` is set, e.g. `deleted_at`.
    #[must_use]
    pub fn soft_delete(mut self, column: impl Into<String>) -> Self {
        self.soft_delete = Some(column.into());
        self
    }

    /// Whether no live row holds `value`. A failing count query passes.
    pub async fn check<C: ConnectionTrait>(&self, db: &C, value: impl Into<Value>) -> bool {
        let stmt = count_statement(
            &self.table,
            &self.column,
            value.into(),
            self.soft_delete.as_deref(),
        );
        match count_matching(db, &stmt).await {
            Ok(count) => count == 0,
            Err(err) => {
                tracing::warn!(
                    table = %self.table,
                    column = %self.column,
                    error = %err,
                    "Unique check failed, letting value through"
                );
                true
            }
        }
    }

    /// [`check`](Self::check) reported against `field`.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when the value is already taken.
    pub async fn validate<C: ConnectionTrait>(
        &self,
        db: &C,
        field: &str,
        value: impl Into<Value>,
    ) -> Result<(), ValidationError> {
        if self.check(db, value).await {
            Ok(())
        } else {
            Err(ValidationError::new(field, "has already been taken"))
        }
    }
}

/// The value must be present in `table.column`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistRule {
    table: String,
    column: String,
}

impl ExistRule {
    /// Parse `"table.column"`. Anything else yields `None`.
    #[must_use]
    pub fn parse(rule: &str) -> Option<Self> {
        parse_target(rule).map(|(table, column)| Self { table, column })
    }

    /// Whether at least one row holds `value`. A failing count query rejects.
    pub async fn check<C: ConnectionTrait>(&self, db: &C, value: impl Into<Value>) -> bool {
        let stmt = count_statement(&self.table, &self.column, value.into(), None);
        match count_matching(db, &stmt).await {
            Ok(count) => count > 0,
            Err(err) => {
                tracing::warn!(
                    table = %self.table,
                    column = %self.column,
                    error = %err,
                    "Exist check failed, rejecting value"
                );
                false
            }
        }
    }

    /// [`check`](Self::check) reported against `field`.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when no row holds the value.
    pub async fn validate<C: ConnectionTrait>(
        &self,
        db: &C,
        field: &str,
        value: impl Into<Value>,
    ) -> Result<(), ValidationError> {
        if self.check(db, value).await {
            Ok(())
        } else {
            Err(ValidationError::new(field, "does not exist"))
        }
    }
}

/// Check a `"table.column"` unique rule. A malformed rule passes.
pub async fn unique<C: ConnectionTrait>(db: &C, rule: &str, value: impl Into<Value>) -> bool {
    match UniqueRule::parse(rule) {
        Some(rule) => rule.check(db, value).await,
        None => {
            tracing::debug!(rule, "Malformed unique rule, skipping");
            true
        }
    }
}

/// Check a `"table.column"` exist rule. A malformed rule passes.
pub async fn exists<C: ConnectionTrait>(db: &C, rule: &str, value: impl Into<Value>) -> bool {
    match ExistRule::parse(rule) {
        Some(rule) => rule.check(db, value).await,
        None => {
            tracing::debug!(rule, "Malformed exist rule, skipping");
            true
        }
    }
}
