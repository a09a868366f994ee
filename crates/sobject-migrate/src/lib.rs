//! # sobject-migrate
//!
//! Migration task descriptors and query plan compiler for record migrations
//! between orgs (or between an org and CSV files).
//!
//! Each configured object becomes a [`MigrationTask`] that goes through two
//! steps:
//!
//! - **setup** normalizes the operation, resolves shorthand query text and
//!   injects the fields needed to match records (record id, external id,
//!   person-account marker)
//! - **describe** fetches the object's schema on each describable side,
//!   expands multiselect keywords (`all`, `creatable_true`, ...), and drops
//!   fields that do not exist
//!
//! A [`MigrationJob`] owns the tasks, runs both steps with per-object error
//! isolation, and answers relationship questions across tasks.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sobject_migrate::{Describers, FileDescriber, JobConfig, JobPlan, MigrationJob};
//!
//! #[tokio::main]
//! async fn main() -> sobject_migrate::Result<()> {
//!     let config = JobConfig::load("job.yaml")?;
//!     let describers = Describers::new(
//!         Arc::new(FileDescriber::new("metadata/source")),
//!         Arc::new(FileDescriber::new("metadata/target")),
//!     );
//!     let mut job = MigrationJob::new(config, describers)?;
//!     job.prepare().await;
//!     println!("{}", JobPlan::from_job(&job).to_json()?);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod job;
pub mod plan;
pub mod query;
pub mod task;

// Re-exports for convenient access
pub use config::{DataMedium, JobConfig, MediumConfig, ObjectConfig};
pub use crate::core::{
    FieldDescribe, FieldType, FileDescriber, RelationshipKind, SObjectDescribe, SchemaDescriber,
    StaticDescriber,
};
pub use error::{MigrateError, Result, Side};
pub use job::{DependencyEdge, Describers, JobContext, MigrationJob, TaskFailure};
pub use plan::{JobPlan, TaskPlan};
pub use query::{FieldRef, QueryParseError, SoqlQuery};
pub use task::{ExternalId, FieldWarning, MigrationTask, Operation, TaskState};
