//! Configuration type definitions.

use serde::{Deserialize, Serialize};

use crate::task::OperationValue;

/// Root configuration structure of a migration job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobConfig {
    /// Where records are read from.
    pub source: MediumConfig,

    /// Where records are written to.
    pub target: MediumConfig,

    /// The orgs use person accounts (default: false).
    #[serde(default)]
    pub person_accounts: bool,

    /// Parent objects whose reference fields multiselect expansion never pulls in.
    #[serde(default = "default_excluded_reference_targets")]
    pub excluded_reference_targets: Vec<String>,

    /// One entry per migrated object.
    #[serde(default)]
    pub objects: Vec<ObjectConfig>,
}

/// Kind of system on one side of the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum DataMedium {
    /// A live org that can be described.
    #[default]
    Org,
    /// Flat CSV files; schema is mirrored from the other side.
    CsvFile,
}

impl DataMedium {
    /// Whether schema metadata can be fetched from this medium.
    pub fn is_describable(&self) -> bool {
        matches!(self, DataMedium::Org)
    }
}

/// One side of the job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediumConfig {
    /// Medium kind (default: org).
    #[serde(default)]
    pub medium: DataMedium,

    /// Org alias or directory name, informational.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl MediumConfig {
    pub fn org(name: impl Into<String>) -> Self {
        Self {
            medium: DataMedium::Org,
            name: Some(name.into()),
        }
    }

    pub fn csv_file() -> Self {
        Self {
            medium: DataMedium::CsvFile,
            name: None,
        }
    }
}

/// Per-object configuration. Every field except `query` has a default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectConfig {
    /// Shorthand query selecting the object's fields.
    pub query: String,

    /// Operation name or code (default: Readonly).
    #[serde(default)]
    pub operation: OperationValue,

    /// Field, relationship path or `;`-separated composite used to match records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,

    /// Filter for the delete query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_where: Option<String>,

    /// Fields never selected for this object.
    #[serde(default)]
    pub excluded_fields: Vec<String>,

    /// Delete existing target records before writing.
    #[serde(default)]
    pub delete_old_data: bool,

    #[serde(default)]
    pub update_with_mock_data: bool,

    #[serde(default, rename = "mockCSVData")]
    pub mock_csv_data: bool,

    #[serde(default, rename = "useCSVValuesMapping")]
    pub use_csv_values_mapping: bool,

    /// Process every record rather than only those referenced by other objects (default: true).
    #[serde(default = "default_true")]
    pub all_records: bool,

    /// Skip this object entirely.
    #[serde(default)]
    pub excluded: bool,

    /// Object added implicitly to satisfy a relationship; no field checks apply.
    #[serde(default)]
    pub is_extra_object: bool,

    #[serde(default)]
    pub process_all_source: bool,

    #[serde(default)]
    pub process_all_target: bool,
}

impl Default for ObjectConfig {
    fn default() -> Self {
        Self {
            query: String::new(),
            operation: OperationValue::default(),
            external_id: None,
            delete_where: None,
            excluded_fields: Vec::new(),
            delete_old_data: false,
            update_with_mock_data: false,
            mock_csv_data: false,
            use_csv_values_mapping: false,
            all_records: true,
            excluded: false,
            is_extra_object: false,
            process_all_source: false,
            process_all_target: false,
        }
    }
}

impl ObjectConfig {
    /// Create an object entry with the given query and defaults elsewhere.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_excluded_reference_targets() -> Vec<String> {
    ["Group", "Organization", "Profile", "UserRole"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            source: MediumConfig::default(),
            target: MediumConfig::default(),
            person_accounts: false,
            excluded_reference_targets: default_excluded_reference_targets(),
            objects: Vec::new(),
        }
    }
}
