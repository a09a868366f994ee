//! Core traits for schema resolution.
//!
//! - [`SchemaDescriber`]: fetches an object's schema snapshot from one system
//!
//! Network clients, file loaders and test doubles all sit behind this trait so
//! the task lifecycle never depends on how metadata is obtained.

use async_trait::async_trait;

use crate::error::Result;

use super::schema::SObjectDescribe;

/// Fetch schema metadata from a source or target system.
///
/// Implementations report failures as plain errors; the calling task decides
/// which side failed and wraps them accordingly. Retry policy, if any, belongs
/// to the implementation.
#[async_trait]
pub trait SchemaDescriber: Send + Sync {
    /// Describe a single object by API name.
    async fn describe_object(&self, object: &str) -> Result<SObjectDescribe>;

    /// Human-readable name of the described system (org alias, directory, ...).
    fn system_name(&self) -> &str;
}
