//! Migration job - owns every task and answers cross-task questions.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::{DataMedium, JobConfig};
use crate::core::schema::{FieldDescribe, RelationshipKind};
use crate::core::traits::SchemaDescriber;
use crate::error::{MigrateError, Result, Side};
use crate::task::{FieldNameSet, MigrationTask, RelationshipSummary, TaskState};

/// Object name to task index. Entries are only ever added.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    by_name: HashMap<String, usize>,
}

impl TaskRegistry {
    /// Register `object` at `index`. Registering the same object twice is a configuration error.
    pub fn register(&mut self, object: &str, index: usize) -> Result<()> {
        let key = object.to_ascii_lowercase();
        if self.by_name.contains_key(&key) {
            return Err(MigrateError::config(
                object,
                "object is listed more than once in the job",
            ));
        }
        self.by_name.insert(key, index);
        Ok(())
    }

    pub fn index_of(&self, object: &str) -> Option<usize> {
        self.by_name.get(&object.to_ascii_lowercase()).copied()
    }

    pub fn contains(&self, object: &str) -> bool {
        self.by_name.contains_key(&object.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Job-wide settings every task reads during setup and describe.
#[derive(Debug, Clone)]
pub struct JobContext {
    source: DataMedium,
    target: DataMedium,
    person_accounts: bool,
    denied_reference_targets: FieldNameSet,
    registry: TaskRegistry,
}

impl JobContext {
    pub fn new(config: &JobConfig) -> Self {
        Self {
            source: config.source.medium,
            target: config.target.medium,
            person_accounts: config.person_accounts,
            denied_reference_targets: FieldNameSet::new(&config.excluded_reference_targets),
            registry: TaskRegistry::default(),
        }
    }

    /// Medium configured for `side`.
    pub fn medium(&self, side: Side) -> DataMedium {
        match side {
            Side::Source => self.source,
            Side::Target => self.target,
        }
    }

    pub fn person_accounts(&self) -> bool {
        self.person_accounts
    }

    /// Parent objects whose reference fields expansion skips.
    pub fn denied_reference_targets(&self) -> &FieldNameSet {
        &self.denied_reference_targets
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }
}

/// Schema describers for both sides of the job.
#[derive(Clone)]
pub struct Describers {
    pub source: Arc<dyn SchemaDescriber>,
    pub target: Arc<dyn SchemaDescriber>,
}

impl Describers {
    pub fn new(source: Arc<dyn SchemaDescriber>, target: Arc<dyn SchemaDescriber>) -> Self {
        Self { source, target }
    }

    pub fn for_side(&self, side: Side) -> &dyn SchemaDescriber {
        match side {
            Side::Source => self.source.as_ref(),
            Side::Target => self.target.as_ref(),
        }
    }
}

/// A task that failed setup or describe.
#[derive(Debug)]
pub struct TaskFailure {
    /// Object name, or the raw query when the task never resolved one.
    pub object: String,
    pub error: MigrateError,
}

/// Parent/child dependency between two tasks of the job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub child: String,
    pub parent: String,
    pub kind: RelationshipKind,
}

/// All tasks of one job plus the shared context.
pub struct MigrationJob {
    config: JobConfig,
    context: JobContext,
    describers: Describers,
    tasks: Vec<MigrationTask>,
    failed: HashSet<usize>,
    failures: Vec<TaskFailure>,
}

impl MigrationJob {
    /// Create a job from validated configuration. Objects marked `excluded` are skipped.
    pub fn new(config: JobConfig, describers: Describers) -> Result<Self> {
        config.validate()?;
        let context = JobContext::new(&config);

        let mut tasks = Vec::with_capacity(config.objects.len());
        for object in &config.objects {
            if object.excluded {
                debug!("Skipping excluded object: {}", object.query);
                continue;
            }
            tasks.push(MigrationTask::new(object.clone()));
        }
        if tasks.is_empty() {
            warn!("Every object in the job is excluded");
        }

        Ok(Self {
            config,
            context,
            describers,
            tasks,
            failed: HashSet::new(),
            failures: Vec::new(),
        })
    }

    /// Set up every task. A task that fails is recorded and left out of describe.
    pub fn setup_all(&mut self) {
        for index in 0..self.tasks.len() {
            if self.failed.contains(&index) {
                continue;
            }
            let task = &mut self.tasks[index];
            let result = task
                .setup(&self.context)
                .and_then(|()| self.context.registry.register(task.object_name(), index));
            if let Err(e) = result {
                let object = if task.object_name().is_empty() {
                    task.config().query.clone()
                } else {
                    task.object_name().to_string()
                };
                self.record_failure(index, object, e);
            }
        }
        info!(
            "Configured {} of {} task(s)",
            self.context.registry.len(),
            self.tasks.len()
        );
    }

    /// Describe every configured task concurrently.
    ///
    /// Each task only touches its own state, so one failing object never
    /// affects another.
    pub async fn describe_all(&mut self) {
        let ctx = &self.context;
        let describers = &self.describers;
        let failed = &self.failed;

        let pending = self
            .tasks
            .iter_mut()
            .enumerate()
            .filter(|(index, task)| {
                !failed.contains(index) && task.state() == TaskState::Configured
            })
            .map(|(index, task)| async move {
                let result = task.describe(ctx, describers).await;
                (index, task.object_name().to_string(), result)
            });
        let results = join_all(pending).await;

        for (index, object, result) in results {
            if let Err(e) = result {
                self.record_failure(index, object, e);
            }
        }
        info!(
            "Described {} of {} task(s)",
            self.described_count(),
            self.tasks.len()
        );
    }

    /// Setup followed by describe.
    pub async fn prepare(&mut self) {
        self.setup_all();
        self.describe_all().await;
    }

    fn record_failure(&mut self, index: usize, object: String, error: MigrateError) {
        error!("Task {} failed: {}", object, error);
        self.failed.insert(index);
        self.failures.push(TaskFailure { object, error });
    }

    fn described_count(&self) -> usize {
        self.tasks
            .iter()
            .filter(|t| t.state() == TaskState::Described)
            .count()
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    pub fn context(&self) -> &JobContext {
        &self.context
    }

    /// All tasks in configuration order, failed ones included.
    pub fn tasks(&self) -> &[MigrationTask] {
        &self.tasks
    }

    /// Tasks that completed every lifecycle step they were asked to run.
    pub fn healthy_tasks(&self) -> impl Iterator<Item = &MigrationTask> {
        self.tasks
            .iter()
            .enumerate()
            .filter(|(index, _)| !self.failed.contains(index))
            .map(|(_, task)| task)
    }

    pub fn failures(&self) -> &[TaskFailure] {
        &self.failures
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Look up a registered task by object name (case-insensitive).
    pub fn task(&self, object: &str) -> Option<&MigrationTask> {
        self.context
            .registry
            .index_of(object)
            .and_then(|index| self.tasks.get(index))
    }

    /// Task migrating the object a reference field points to.
    pub fn parent_task_of(&self, field: &FieldDescribe) -> Option<&MigrationTask> {
        field.reference_target().and_then(|target| self.task(target))
    }

    /// Task owning the field.
    pub fn owner_task_of(&self, field: &FieldDescribe) -> Option<&MigrationTask> {
        field.owner.as_deref().and_then(|owner| self.task(owner))
    }

    /// Whether any other task references `object` through a selected field.
    pub fn has_child_relationships(&self, object: &str) -> bool {
        self.healthy_tasks()
            .filter(|t| !t.object_name().eq_ignore_ascii_case(object))
            .any(|t| t.references(object))
    }

    /// Relationship facts for one registered task.
    pub fn relationship_summary(&self, object: &str) -> Option<RelationshipSummary> {
        let task = self.task(object)?;
        Some(RelationshipSummary {
            parent_lookup_objects: task.parent_lookup_objects(),
            parent_master_detail_objects: task.parent_master_detail_objects(),
            has_parent_relationships: task.has_parent_relationships(),
            has_child_relationships: self.has_child_relationships(task.object_name()),
        })
    }

    /// Edges between registered tasks. Self references and parents outside the job are skipped.
    pub fn dependency_edges(&self) -> Vec<DependencyEdge> {
        let mut seen = HashSet::new();
        let mut edges = Vec::new();
        for task in self.healthy_tasks() {
            for field in task.described_fields() {
                let Some(kind) = field.relationship_kind() else {
                    continue;
                };
                let Some(parent) = self.parent_task_of(field) else {
                    continue;
                };
                if parent.object_name().eq_ignore_ascii_case(task.object_name()) {
                    continue;
                }
                let edge = DependencyEdge {
                    child: task.object_name().to_string(),
                    parent: parent.object_name().to_string(),
                    kind,
                };
                if seen.insert(edge.clone()) {
                    edges.push(edge);
                }
            }
        }
        edges
    }
}
