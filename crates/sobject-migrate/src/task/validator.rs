//! Field validation against a schema snapshot.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::schema::SObjectDescribe;
use crate::error::{MigrateError, Result, Side};
use crate::query::{SoqlQuery, RECORD_ID_FIELD};

use super::expansion::FieldNameSet;

/// Objects maintained by the platform itself; their field lists are not checked.
pub const SPECIAL_OBJECTS: &[&str] = &[
    "Group",
    "Organization",
    "Profile",
    "RecordType",
    "User",
    "UserRole",
];

/// Check whether `object` is a platform-reserved special object.
pub fn is_special_object(object: &str) -> bool {
    SPECIAL_OBJECTS
        .iter()
        .any(|special| special.eq_ignore_ascii_case(object))
}

/// Non-fatal condition: a selected field does not exist on one side and was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldWarning {
    pub object: String,
    pub field: String,
    pub side: Side,
}

impl fmt::Display for FieldWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "field {}.{} does not exist on the {} side and was removed from the query",
            self.object, self.field, self.side
        )
    }
}

/// What the validator needs to know about the owning task.
#[derive(Debug, Clone, Copy)]
pub struct ValidationScope<'a> {
    pub object: &'a str,
    pub side: Side,
    /// Fields without which records cannot be correlated.
    pub critical: &'a FieldNameSet,
    /// Skip existence checks (extra objects, special objects).
    pub skip_existence: bool,
}

/// Validate the select list of `query` against `snapshot`.
///
/// Plain fields missing from the snapshot are removed and reported as
/// warnings. A missing critical field fails the task.
pub fn validate_fields(
    query: &mut SoqlQuery,
    snapshot: &SObjectDescribe,
    scope: ValidationScope<'_>,
) -> Result<Vec<FieldWarning>> {
    if query.fields.is_empty() {
        return Err(MigrateError::config(
            scope.object,
            "query selects no fields to process",
        ));
    }

    if scope.skip_existence || is_special_object(scope.object) {
        return Ok(Vec::new());
    }

    let mut missing = Vec::new();
    for field in &query.fields {
        let Some(name) = field.simple_name() else {
            continue;
        };
        if snapshot.has_field(name) {
            continue;
        }
        if scope.critical.contains(name) {
            let role = if name.eq_ignore_ascii_case(RECORD_ID_FIELD) {
                "record id"
            } else {
                "external id"
            };
            return Err(MigrateError::config(
                scope.object,
                format!(
                    "{} field {} is missing on the {} side; records cannot be matched",
                    role, name, scope.side
                ),
            ));
        }
        missing.push(name.to_string());
    }

    let warnings: Vec<FieldWarning> = missing
        .into_iter()
        .map(|field| FieldWarning {
            object: scope.object.to_string(),
            field,
            side: scope.side,
        })
        .collect();

    for warning in &warnings {
        warn!("{}", warning);
    }
    query
        .fields
        .retain(|f| !warnings.iter().any(|w| f.is(&w.field)));

    Ok(warnings)
}
