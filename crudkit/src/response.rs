//! JSON envelopes returned by handlers.
//!
//! Single records use [`ApiResponse`], pages use [`ListResponse`], which also carries a
//! `Content-Range` header for clients that page through headers.

use axum::http::header::{CONTENT_RANGE, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::{Json, http::StatusCode};
use sea_orm::EntityTrait;
use serde::Serialize;
use utoipa::ToSchema;

use crate::pagination::Pagination;

/// Page window and total match count of a list response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Meta {
    pub limit: u64,
    pub offset: u64,
    pub total: u64,
}

impl Meta {
    #[must_use]
    pub fn from_pagination<E: EntityTrait>(pagination: &Pagination<E>, total: u64) -> Self {
        Self {
            limit: pagination.limit(),
            offset: pagination.offset(),
            total,
        }
    }
}

/// Single-record envelope: `{status, message, data}`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub status: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip)]
    code: StatusCode,
}

impl<T> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            status: true,
            message: message.into(),
            data: Some(data),
            code: StatusCode::OK,
        }
    }

    /// A 201 response for a freshly created record.
    pub fn created(data: T) -> Self {
        Self {
            code: StatusCode::CREATED,
            ..Self::success("Created", data)
        }
    }

    /// A body-less success, e.g. after a delete.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: true,
            message: message.into(),
            data: None,
            code: StatusCode::OK,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.code, Json(self)).into_response()
    }
}

/// One page of records: `{status, message, data, meta}`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ListResponse<T> {
    pub status: bool,
    pub message: String,
    pub data: Vec<T>,
    pub meta: Meta,
    #[serde(skip)]
    resource: String,
}

impl<T> ListResponse<T> {
    /// `resource` names the records in the `Content-Range` header.
    pub fn new(resource: impl Into<String>, data: Vec<T>, meta: Meta) -> Self {
        Self {
            status: true,
            message: "Success".to_string(),
            data,
            meta,
            resource: resource.into(),
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Convert every record, e.g. from a model into its public view.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> ListResponse<U> {
        ListResponse {
            status: self.status,
            message: self.message,
            data: self.data.into_iter().map(f).collect(),
            meta: self.meta,
            resource: self.resource,
        }
    }
}

impl<T: Serialize> IntoResponse for ListResponse<T> {
    fn into_response(self) -> Response {
        let headers = content_range(&self.resource, &self.meta);
        (StatusCode::OK, headers, Json(self)).into_response()
    }
}

/// Sanitize resource name by removing control characters for HTTP headers
fn sanitize_resource_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii() && !c.is_ascii_control())
        .collect()
}

/// `Content-Range: <resource> <first>-<last>/<total>` for one page, or `<resource> */<total>`
/// when the page holds no rows.
///
/// The resource name is stripped of anything that cannot appear in a header value.
#[must_use]
pub fn content_range(resource: &str, meta: &Meta) -> HeaderMap {
    let range = if meta.limit == 0 || meta.offset >= meta.total {
        format!("*/{}", meta.total)
    } else {
        let last = meta.offset.saturating_add(meta.limit).min(meta.total) - 1;
        format!("{}-{last}/{}", meta.offset, meta.total)
    };

    let safe_name = sanitize_resource_name(resource);
    let value = HeaderValue::from_str(&format!("{safe_name} {range}"))
        .or_else(|_| HeaderValue::from_str(&format!("items {range}")));

    let mut headers = HeaderMap::new();
    if let Ok(value) = value {
        headers.insert(CONTENT_RANGE, value);
    }
    headers
}
