//! Core schema abstractions.
//!
//! - [`schema`]: field and object metadata (field descriptors, schema snapshots)
//! - [`traits`]: the [`SchemaDescriber`] seam for fetching snapshots
//! - [`describer`]: in-memory and file-backed describers

pub mod describer;
pub mod schema;
pub mod traits;

pub use describer::{FileDescriber, StaticDescriber};
pub use schema::{FieldDescribe, FieldType, RelationshipKind, SObjectDescribe};
pub use traits::SchemaDescriber;
