//! The raw query-string multimap handed to [`Pagination::new`](crate::Pagination::new).

use std::collections::{BTreeMap, HashMap};

use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;

use crate::errors::ApiError;

/// Query-string key → every value supplied for it, in arrival order.
///
/// Keys are kept sorted so filters are always applied in the same order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryConditions(BTreeMap<String, Vec<String>>);

impl QueryConditions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `value` to the values of `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.entry(key.into()).or_default().push(value.into());
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.0.get(key).map(Vec::as_slice)
    }

    /// The first value for `key`; later repeats are ignored by the engine.
    #[must_use]
    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key)?.first().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(key, values)| (key.as_str(), values.as_slice()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<HashMap<String, Vec<String>>> for QueryConditions {
    fn from(map: HashMap<String, Vec<String>>) -> Self {
        Self(map.into_iter().collect())
    }
}

impl From<BTreeMap<String, Vec<String>>> for QueryConditions {
    fn from(map: BTreeMap<String, Vec<String>>) -> Self {
        Self(map)
    }
}

impl<K, V> FromIterator<(K, V)> for QueryConditions
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut conditions = Self::new();
        for (key, value) in iter {
            conditions.insert(key, value);
        }
        conditions
    }
}

/// Extracts every `key=value` pair of the request URI, keeping repeated keys.
impl<S> FromRequestParts<S> for QueryConditions
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(&parts.uri)
            .map_err(|err| ApiError::bad_request(format!("Invalid query string: {err}")))?;
        Ok(pairs.into_iter().collect())
    }
}
