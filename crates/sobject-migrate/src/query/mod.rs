//! Structured representation of object queries.
//!
//! Queries use the `SELECT ... FROM ... [WHERE ...] [ORDER BY ...] [LIMIT n]
//! [OFFSET n]` shape. The [`parser`] turns query text into a [`SoqlQuery`];
//! [`SoqlQuery::compose`] turns it back into canonical text. Field order is
//! preserved in both directions.

mod parser;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use parser::parse;

/// Record identifier field present on every object.
pub const RECORD_ID_FIELD: &str = "Id";

/// Prefix marking a computed composite field (`$$Name$Account__r.Name`).
pub const COMPOSITE_PREFIX: &str = "$$";

/// Errors produced while parsing query text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryParseError {
    #[error("query text is empty")]
    Empty,

    #[error("query must start with SELECT")]
    MissingSelect,

    #[error("query has no FROM clause")]
    MissingFrom,

    #[error("query selects no fields")]
    EmptyFieldList,

    #[error("empty field in select list at position {0}")]
    EmptyField(usize),

    #[error("invalid object name '{0}'")]
    InvalidObject(String),

    #[error("invalid {clause} value '{value}'")]
    InvalidNumber { clause: &'static str, value: String },

    #[error("{0} clause has no content")]
    EmptyClause(&'static str),

    #[error("{0} clause appears more than once")]
    DuplicateClause(&'static str),

    #[error("{0} clause is out of order")]
    ClauseOrder(&'static str),

    #[error("unterminated string literal")]
    UnterminatedQuote,

    #[error("unbalanced parentheses")]
    UnbalancedParens,
}

/// One entry of a select list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldRef {
    /// A plain field on the queried object (`Name`).
    Name(String),
    /// A relationship path (`Account.Name`).
    Relationship(String),
    /// A computed composite of several fields (`$$Name$Email`).
    Composite(Vec<String>),
    /// Any other expression (`TOLABEL(Status)`, sub-selects).
    Expression(String),
}

impl FieldRef {
    /// Build a field reference from select-list text.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if let Some(rest) = text.strip_prefix(COMPOSITE_PREFIX) {
            let parts: Vec<String> = rest
                .split('$')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
            return FieldRef::Composite(parts);
        }
        if text.contains('(') || text.contains(' ') {
            FieldRef::Expression(text.to_string())
        } else if text.contains('.') {
            FieldRef::Relationship(text.to_string())
        } else {
            FieldRef::Name(text.to_string())
        }
    }

    /// Canonical text of the reference, also used as its identity.
    pub fn key(&self) -> String {
        match self {
            FieldRef::Name(n) | FieldRef::Relationship(n) | FieldRef::Expression(n) => n.clone(),
            FieldRef::Composite(parts) => format!("{}{}", COMPOSITE_PREFIX, parts.join("$")),
        }
    }

    /// The field name when this is a plain field on the queried object.
    pub fn simple_name(&self) -> Option<&str> {
        match self {
            FieldRef::Name(n) => Some(n),
            _ => None,
        }
    }

    /// True when the reference names `name` (case-insensitive).
    pub fn is(&self, name: &str) -> bool {
        self.key().eq_ignore_ascii_case(name)
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Parsed query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoqlQuery {
    /// Queried object name.
    pub object: String,

    /// Select list in order.
    pub fields: Vec<FieldRef>,

    /// Filter expression without the `WHERE` keyword.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<String>,

    /// Ordering expression without `ORDER BY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
}

impl SoqlQuery {
    /// Create a query selecting `fields` from `object`.
    pub fn new(object: impl Into<String>, fields: Vec<FieldRef>) -> Self {
        Self {
            object: object.into(),
            fields,
            ..Default::default()
        }
    }

    /// Parse query text.
    pub fn parse(text: &str) -> Result<Self, QueryParseError> {
        parser::parse(text)
    }

    /// Render the canonical query text.
    pub fn compose(&self) -> String {
        let fields = self
            .fields
            .iter()
            .map(FieldRef::key)
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!("SELECT {} FROM {}", fields, self.object);
        if let Some(ref filter) = self.where_clause {
            sql.push_str(" WHERE ");
            sql.push_str(filter);
        }
        if let Some(ref order) = self.order_by {
            sql.push_str(" ORDER BY ");
            sql.push_str(order);
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }
        sql
    }

    /// Check whether the select list already contains `name` (case-insensitive).
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.is(name))
    }

    /// Append a field unless it is already selected. Returns true if added.
    pub fn push_field(&mut self, field: FieldRef) -> bool {
        if self.has_field(&field.key()) {
            return false;
        }
        self.fields.push(field);
        true
    }

    /// Remove duplicate fields, keeping the first occurrence of each name.
    pub fn dedup_fields(&mut self) {
        let mut seen = std::collections::HashSet::new();
        self.fields
            .retain(|f| seen.insert(f.key().to_ascii_lowercase()));
    }

    /// Names of all selected fields in order.
    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(FieldRef::key).collect()
    }
}

impl fmt::Display for SoqlQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.compose())
    }
}
