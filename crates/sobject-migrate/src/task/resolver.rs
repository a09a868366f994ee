//! Shorthand query resolution.
//!
//! Turns the user's query text into a canonical [`SoqlQuery`]: the record id
//! comes first, multiselect keywords are lifted out of the select list into a
//! [`MultiselectPattern`], and repeated fields collapse to one.

use crate::error::{MigrateError, Result};
use crate::query::{self, FieldRef, SoqlQuery, RECORD_ID_FIELD};

use super::expansion::MultiselectPattern;

/// Output of [`resolve`].
#[derive(Debug, Clone)]
pub struct ResolvedQuery {
    /// Canonical query: record id first, no keywords.
    pub query: SoqlQuery,
    /// Keywords found in the select list, if any.
    pub pattern: Option<MultiselectPattern>,
}

impl ResolvedQuery {
    /// Canonical text of the query.
    pub fn text(&self) -> String {
        self.query.compose()
    }
}

/// Resolve raw query text.
///
/// Parse failures become configuration errors naming the object, the
/// offending text and the parser's complaint.
pub fn resolve(raw: &str) -> Result<ResolvedQuery> {
    let parsed = query::parse(raw).map_err(|e| {
        MigrateError::config(
            object_hint(raw),
            format!("malformed query \"{}\": {}", raw.trim(), e),
        )
    })?;

    let mut pattern = MultiselectPattern::default();
    let mut fields = Vec::with_capacity(parsed.fields.len() + 1);
    fields.push(FieldRef::Name(RECORD_ID_FIELD.to_string()));

    for field in parsed.fields {
        if let Some(name) = field.simple_name() {
            if name.eq_ignore_ascii_case(RECORD_ID_FIELD) || pattern.accept_keyword(name) {
                continue;
            }
        }
        fields.push(field);
    }

    let mut query = SoqlQuery { fields, ..parsed };
    query.dedup_fields();

    Ok(ResolvedQuery {
        query,
        pattern: (!pattern.is_empty()).then_some(pattern),
    })
}

/// Best-effort object name for error messages when the query does not parse.
fn object_hint(raw: &str) -> String {
    let mut words = raw.split_whitespace();
    while let Some(word) = words.next() {
        if word.eq_ignore_ascii_case("from") {
            if let Some(object) = words.next() {
                return object.to_string();
            }
        }
    }
    "<unknown>".to_string()
}
