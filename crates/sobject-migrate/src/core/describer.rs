//! Built-in [`SchemaDescriber`] implementations.
//!
//! - [`StaticDescriber`]: an explicitly populated in-memory registry of snapshots
//! - [`FileDescriber`]: reads `<dir>/<Object>.json` describe documents
//!
//! Both are constructed up front and injected into the job, so tests and the
//! CLI can resolve plans without a live connection.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::{MigrateError, Result};

use super::schema::SObjectDescribe;
use super::traits::SchemaDescriber;

/// In-memory registry of object snapshots.
///
/// # Example
///
/// ```rust,ignore
/// let mut source = StaticDescriber::new("source-org");
/// source.register(SObjectDescribe::new("Account").with_field(FieldDescribe::new("Id", FieldType::Id)));
/// let describe = source.describe_object("Account").await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticDescriber {
    name: String,

    /// Snapshots keyed by lowercased object name.
    objects: HashMap<String, SObjectDescribe>,
}

impl StaticDescriber {
    /// Create an empty registry.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            objects: HashMap::new(),
        }
    }

    /// Register a snapshot, replacing any previous one for the same object.
    pub fn register(&mut self, describe: SObjectDescribe) {
        self.objects
            .insert(describe.name.to_ascii_lowercase(), describe);
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_object(mut self, describe: SObjectDescribe) -> Self {
        self.register(describe);
        self
    }

    /// Check if an object is registered.
    pub fn has_object(&self, object: &str) -> bool {
        self.objects.contains_key(&object.to_ascii_lowercase())
    }
}

#[async_trait]
impl SchemaDescriber for StaticDescriber {
    async fn describe_object(&self, object: &str) -> Result<SObjectDescribe> {
        self.objects
            .get(&object.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| {
                MigrateError::Describe(format!("object {} is not known to {}", object, self.name))
            })
    }

    fn system_name(&self) -> &str {
        &self.name
    }
}

/// Reads describe documents from a directory, one `<Object>.json` per object.
#[derive(Debug, Clone)]
pub struct FileDescriber {
    dir: PathBuf,
    name: String,
}

impl FileDescriber {
    /// Create a describer rooted at `dir`.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref().to_path_buf();
        Self {
            name: dir.display().to_string(),
            dir,
        }
    }

    fn path_for(&self, object: &str) -> PathBuf {
        self.dir.join(format!("{}.json", object))
    }
}

#[async_trait]
impl SchemaDescriber for FileDescriber {
    async fn describe_object(&self, object: &str) -> Result<SObjectDescribe> {
        let path = self.path_for(object);
        debug!("Reading describe document {:?}", path);

        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            MigrateError::Describe(format!("cannot read {}: {}", path.display(), e))
        })?;
        let describe: SObjectDescribe = serde_json::from_str(&content).map_err(|e| {
            MigrateError::Describe(format!("invalid describe document {}: {}", path.display(), e))
        })?;

        if !describe.name.eq_ignore_ascii_case(object) {
            return Err(MigrateError::Describe(format!(
                "{} describes {} instead of {}",
                path.display(),
                describe.name,
                object
            )));
        }
        Ok(describe)
    }

    fn system_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{FieldDescribe, FieldType};
    use std::io::Write;

    #[tokio::test]
    async fn test_static_describer_case_insensitive() {
        let describer = StaticDescriber::new("org").with_object(
            SObjectDescribe::new("Account").with_field(FieldDescribe::new("Id", FieldType::Id)),
        );
        assert!(describer.has_object("ACCOUNT"));
        let describe = describer.describe_object("account").await.unwrap();
        assert_eq!(describe.name, "Account");
        assert_eq!(describer.system_name(), "org");
    }

    #[tokio::test]
    async fn test_static_describer_unknown_object() {
        let describer = StaticDescriber::new("org");
        let err = describer.describe_object("Nope").await.unwrap_err();
        assert!(matches!(err, MigrateError::Describe(_)));
        assert!(!err.is_config());
    }

    #[tokio::test]
    async fn test_file_describer_reads_document() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("Contact.json")).unwrap();
        writeln!(
            file,
            r#"{{"name": "Contact", "fields": [{{"name": "Id", "type": "id"}}, {{"name": "Email", "type": "email", "createable": true}}]}}"#
        )
        .unwrap();

        let describer = FileDescriber::new(dir.path());
        let describe = describer.describe_object("Contact").await.unwrap();
        assert!(describe.has_field("Email"));
    }

    #[tokio::test]
    async fn test_file_describer_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let describer = FileDescriber::new(dir.path());
        let err = describer.describe_object("Contact").await.unwrap_err();
        assert!(matches!(err, MigrateError::Describe(_)));
    }
}
