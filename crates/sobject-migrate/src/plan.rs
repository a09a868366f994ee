//! Serializable snapshot of a prepared job.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::job::{DependencyEdge, MigrationJob};
use crate::task::{
    ExternalId, FieldWarning, MigrationTask, MultiselectPattern, Operation, RelationshipSummary,
    TaskState,
};

/// Resolved plan for every task of a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPlan {
    /// Unique plan identifier.
    pub plan_id: String,

    /// When the plan was built.
    pub generated_at: DateTime<Utc>,

    /// SHA256 hash of the job configuration.
    pub config_hash: String,

    pub tasks: Vec<TaskPlan>,

    /// Parent/child edges between tasks of the job.
    pub edges: Vec<DependencyEdge>,

    pub failures: Vec<FailurePlan>,
}

/// Resolved state of one task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPlan {
    pub object: String,
    pub state: TaskState,
    pub operation: Operation,
    pub operation_code: i64,
    pub external_id: ExternalId,

    /// Configured external id when it differs from the effective one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_external_id: Option<ExternalId>,

    pub query: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_query: Option<String>,

    pub fields: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<MultiselectPattern>,

    pub relationships: RelationshipSummary,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<FieldWarning>,
}

/// A task that could not be planned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailurePlan {
    pub object: String,
    pub error: String,
    pub exit_code: u8,
}

impl TaskPlan {
    fn from_task(job: &MigrationJob, task: &MigrationTask) -> Self {
        let original = task.original_external_id();
        Self {
            object: task.object_name().to_string(),
            state: task.state(),
            operation: task.operation(),
            operation_code: task.operation().code(),
            external_id: task.external_id().clone(),
            original_external_id: (original != task.external_id()).then(|| original.clone()),
            query: task.query_text().to_string(),
            delete_query: task.delete_query_text().map(str::to_string),
            fields: task.field_names(),
            pattern: task.pattern().cloned(),
            relationships: job
                .relationship_summary(task.object_name())
                .unwrap_or_default(),
            warnings: task.warnings().to_vec(),
        }
    }
}

impl JobPlan {
    /// Build a plan from the healthy tasks and recorded failures of `job`.
    pub fn from_job(job: &MigrationJob) -> Self {
        Self {
            plan_id: uuid::Uuid::new_v4().to_string(),
            generated_at: Utc::now(),
            config_hash: job.config().hash(),
            tasks: job
                .healthy_tasks()
                .map(|task| TaskPlan::from_task(job, task))
                .collect(),
            edges: job.dependency_edges(),
            failures: job
                .failures()
                .iter()
                .map(|f| FailurePlan {
                    object: f.object.clone(),
                    error: f.error.to_string(),
                    exit_code: f.error.exit_code(),
                })
                .collect(),
        }
    }

    /// Total warnings across all tasks.
    pub fn warning_count(&self) -> usize {
        self.tasks.iter().map(|t| t.warnings.len()).sum()
    }

    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the plan as JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
