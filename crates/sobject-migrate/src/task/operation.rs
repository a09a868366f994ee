//! Operation kinds and their configuration forms.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MigrateError, Result};

/// What the migration does with the records of one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    Insert,
    Update,
    Upsert,
    Readonly,
    Delete,
}

impl Operation {
    /// Numeric code used by older job files.
    pub fn code(&self) -> i64 {
        match self {
            Operation::Insert => 0,
            Operation::Update => 1,
            Operation::Upsert => 2,
            Operation::Readonly => 3,
            Operation::Delete => 4,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Operation::Insert),
            1 => Some(Operation::Update),
            2 => Some(Operation::Upsert),
            3 => Some(Operation::Readonly),
            4 => Some(Operation::Delete),
            _ => None,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "insert" => Some(Operation::Insert),
            "update" => Some(Operation::Update),
            "upsert" => Some(Operation::Upsert),
            "readonly" => Some(Operation::Readonly),
            "delete" => Some(Operation::Delete),
            _ => None,
        }
    }

    /// Operations that never match target records by external id.
    pub fn correlates_by_record_id(&self) -> bool {
        matches!(
            self,
            Operation::Insert | Operation::Readonly | Operation::Delete
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Insert => "Insert",
            Operation::Update => "Update",
            Operation::Upsert => "Upsert",
            Operation::Readonly => "Readonly",
            Operation::Delete => "Delete",
        };
        f.write_str(name)
    }
}

/// Operation as written in a job file: a name or a numeric code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OperationValue {
    Code(i64),
    Name(String),
}

impl Default for OperationValue {
    fn default() -> Self {
        OperationValue::Name(Operation::Readonly.to_string())
    }
}

impl From<Operation> for OperationValue {
    fn from(op: Operation) -> Self {
        OperationValue::Name(op.to_string())
    }
}

impl OperationValue {
    /// Normalize into an [`Operation`]; `object` names the owner in errors.
    pub fn normalize(&self, object: &str) -> Result<Operation> {
        let op = match self {
            OperationValue::Code(code) => Operation::from_code(*code),
            OperationValue::Name(name) => Operation::from_name(name),
        };
        op.ok_or_else(|| {
            let shown = match self {
                OperationValue::Code(code) => code.to_string(),
                OperationValue::Name(name) => name.clone(),
            };
            MigrateError::config(object, format!("unknown operation '{}'", shown))
        })
    }
}
