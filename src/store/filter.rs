//! Document filters.
//!
//! A [`Filter`] is a small predicate tree over top-level document fields:
//! string equality (a missing field equals null), conjunction and
//! disjunction. Disjunction is what lets callers match an unordered pair by
//! listing both orderings.

use rusqlite::types::Value as SqlValue;
use serde_json::Value;

/// Predicate over the top-level fields of a JSON document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Field equals the value. `None` matches null and missing fields.
    Eq {
        /// Top-level field name.
        field: &'static str,
        /// Expected string value, or `None` for null.
        value: Option<String>,
    },
    /// Every sub-filter matches. An empty list matches everything.
    All(Vec<Filter>),
    /// At least one sub-filter matches. An empty list matches nothing.
    Any(Vec<Filter>),
}

impl Filter {
    /// Field equals `value`.
    #[must_use]
    pub fn eq(field: &'static str, value: impl Into<String>) -> Self {
        Self::Eq {
            field,
            value: Some(value.into()),
        }
    }

    /// Field is null or absent.
    #[must_use]
    pub const fn is_null(field: &'static str) -> Self {
        Self::Eq { field, value: None }
    }

    /// Field equals `value` when given, otherwise field is null or absent.
    #[must_use]
    pub fn eq_opt(field: &'static str, value: Option<&str>) -> Self {
        Self::Eq {
            field,
            value: value.map(str::to_string),
        }
    }

    /// Conjunction of `filters`.
    #[must_use]
    pub fn all(filters: impl IntoIterator<Item = Self>) -> Self {
        Self::All(filters.into_iter().collect())
    }

    /// Disjunction of `filters`.
    #[must_use]
    pub fn any(filters: impl IntoIterator<Item = Self>) -> Self {
        Self::Any(filters.into_iter().collect())
    }

    /// Evaluates the filter against a JSON document.
    ///
    /// Non-object documents have no fields, so every field reads as null.
    #[must_use]
    pub fn matches(&self, document: &Value) -> bool {
        match self {
            Self::Eq { field, value } => {
                let actual = document.get(*field).unwrap_or(&Value::Null);
                match (value, actual) {
                    (None, Value::Null) => true,
                    (Some(expected), Value::String(actual)) => expected == actual,
                    _ => false,
                }
            }
            Self::All(filters) => filters.iter().all(|f| f.matches(document)),
            Self::Any(filters) => filters.iter().any(|f| f.matches(document)),
        }
    }

    /// Compiles the filter into an `SQLite` predicate over a JSON `body`
    /// column, appending bound parameters to `params`.
    pub(crate) fn to_sql(&self, params: &mut Vec<SqlValue>) -> String {
        match self {
            Self::Eq { field, value } => {
                params.push(SqlValue::Text(format!("$.{field}")));
                params.push(value.clone().map_or(SqlValue::Null, SqlValue::Text));
                "json_extract(body, ?) IS ?".to_string()
            }
            Self::All(filters) if filters.is_empty() => "1".to_string(),
            Self::Any(filters) if filters.is_empty() => "0".to_string(),
            Self::All(filters) => Self::join_sql(filters, " AND ", params),
            Self::Any(filters) => Self::join_sql(filters, " OR ", params),
        }
    }

    fn join_sql(filters: &[Self], separator: &str, params: &mut Vec<SqlValue>) -> String {
        let parts: Vec<String> = filters.iter().map(|f| f.to_sql(params)).collect();
        format!("({})", parts.join(separator))
    }
}
