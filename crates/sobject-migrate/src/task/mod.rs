//! Migration task descriptors.
//!
//! A [`MigrationTask`] owns everything known about one migrated object: the
//! resolved query, the optional delete query, the multiselect pattern and the
//! schema snapshots of both sides. Its lifecycle is
//!
//! ```text
//! Unconfigured --setup()--> Configured --describe()--> Described
//! ```
//!
//! Both transitions run at most once; calling them again is a no-op. Derived
//! views (field map, parent objects) are empty until the task is described.

pub mod expansion;
pub mod operation;
pub mod relationships;
pub mod resolver;
pub mod validator;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ObjectConfig;
use crate::core::schema::{FieldDescribe, RelationshipKind, SObjectDescribe};
use crate::error::{MigrateError, Result, Side};
use crate::job::{Describers, JobContext};
use crate::query::{FieldRef, SoqlQuery, COMPOSITE_PREFIX, RECORD_ID_FIELD};

pub use expansion::{ExpansionRules, FieldNameSet, FieldPredicate, MultiselectPattern};
pub use operation::{Operation, OperationValue};
pub use relationships::RelationshipSummary;
pub use resolver::ResolvedQuery;
pub use validator::FieldWarning;

/// Marker field selected for person-account enabled orgs.
pub const PERSON_ACCOUNT_FIELD: &str = "IsPersonAccount";

/// Default external id for operations that match records by a business key.
pub const DEFAULT_EXTERNAL_ID: &str = "Name";

const PERSON_ACCOUNT_OBJECTS: &[&str] = &["Account", "Contact"];

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Built from configuration; nothing normalized yet.
    Unconfigured,
    /// Query resolved and mandatory fields injected.
    Configured,
    /// Schema snapshots fetched, fields expanded and validated.
    Described,
}

/// Field or `;`-separated composite used to match source records to target records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalId(String);

impl ExternalId {
    /// Normalize user input; `$$A$B` and `A;B` both denote the composite of A and B.
    pub fn new(raw: &str) -> Self {
        let raw = raw.trim();
        let parts: Vec<&str> = match raw.strip_prefix(COMPOSITE_PREFIX) {
            Some(rest) => rest.split('$').collect(),
            None => raw.split(';').collect(),
        };
        let parts: Vec<&str> = parts
            .into_iter()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        ExternalId(parts.join(";"))
    }

    /// The record id field.
    pub fn record_id() -> Self {
        ExternalId(RECORD_ID_FIELD.to_string())
    }

    /// External id used when none is configured.
    pub fn default_for(operation: Operation) -> Self {
        if operation.correlates_by_record_id() {
            Self::record_id()
        } else {
            ExternalId(DEFAULT_EXTERNAL_ID.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Individual field paths making up the id.
    pub fn components(&self) -> Vec<&str> {
        self.0.split(';').collect()
    }

    pub fn is_composite(&self) -> bool {
        self.0.contains(';')
    }

    pub fn is_record_id(&self) -> bool {
        self.0.eq_ignore_ascii_case(RECORD_ID_FIELD)
    }

    /// Select-list entry for the id: a composite expression or a single field.
    pub fn field_ref(&self) -> FieldRef {
        if self.is_composite() {
            FieldRef::Composite(self.components().into_iter().map(String::from).collect())
        } else {
            FieldRef::parse(&self.0)
        }
    }

    /// Select-list entries the id needs: the id itself plus composite components.
    fn required_fields(&self) -> Vec<FieldRef> {
        let mut fields = vec![self.field_ref()];
        if self.is_composite() {
            fields.extend(self.components().into_iter().map(FieldRef::parse));
        }
        fields
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Descriptor of one migrated object.
#[derive(Debug, Clone)]
pub struct MigrationTask {
    config: ObjectConfig,
    state: TaskState,
    object: String,
    operation: Operation,
    external_id: ExternalId,
    original_external_id: ExternalId,
    excluded_fields: FieldNameSet,
    query: SoqlQuery,
    query_text: String,
    delete_query: Option<SoqlQuery>,
    delete_query_text: Option<String>,
    pattern: Option<MultiselectPattern>,
    source_describe: Option<Arc<SObjectDescribe>>,
    target_describe: Option<Arc<SObjectDescribe>>,
    warnings: Vec<FieldWarning>,
}

impl MigrationTask {
    /// Create an unconfigured task from its configuration entry.
    pub fn new(config: ObjectConfig) -> Self {
        Self {
            config,
            state: TaskState::Unconfigured,
            object: String::new(),
            operation: Operation::Readonly,
            external_id: ExternalId::record_id(),
            original_external_id: ExternalId::record_id(),
            excluded_fields: FieldNameSet::default(),
            query: SoqlQuery::default(),
            query_text: String::new(),
            delete_query: None,
            delete_query_text: None,
            pattern: None,
            source_describe: None,
            target_describe: None,
            warnings: Vec::new(),
        }
    }

    /// Resolve the query and inject mandatory fields. Runs once.
    pub fn setup(&mut self, ctx: &JobContext) -> Result<()> {
        if self.state != TaskState::Unconfigured {
            debug!("Task {} already configured", self.object);
            return Ok(());
        }

        let resolved = resolver::resolve(&self.config.query)?;
        let object = resolved.query.object.clone();
        let operation = self.config.operation.normalize(&object)?;

        let configured_id = match self.config.external_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => ExternalId::new(id),
            _ => ExternalId::default_for(operation),
        };
        if configured_id.as_str().is_empty() {
            return Err(MigrateError::config(
                &object,
                format!(
                    "external id '{}' names no field",
                    self.config.external_id.as_deref().unwrap_or_default()
                ),
            ));
        }
        self.external_id = if operation == Operation::Insert {
            ExternalId::record_id()
        } else {
            configured_id.clone()
        };
        self.original_external_id = configured_id;
        self.object = object;
        self.operation = operation;
        self.excluded_fields = FieldNameSet::new(&self.config.excluded_fields);
        self.pattern = resolved.pattern;
        self.query = resolved.query;

        self.inject_mandatory_fields(ctx);

        let mandatory = self.mandatory_fields();
        for name in &self.config.excluded_fields {
            if mandatory.contains(name) {
                warn!(
                    "Field {}.{} is required for matching records and stays selected despite being excluded",
                    self.object, name
                );
            }
        }
        expansion::apply_exclusions(&mut self.query, &self.excluded_fields, &mandatory);
        self.query.dedup_fields();

        if operation == Operation::Delete {
            self.query.fields = vec![FieldRef::Name(RECORD_ID_FIELD.to_string())];
        }
        if operation == Operation::Delete || self.config.delete_old_data {
            self.delete_query = Some(self.build_delete_query());
        }

        self.sync_query_text();
        self.state = TaskState::Configured;
        info!(
            "Configured {} ({}, external id {}): {}",
            self.object, self.operation, self.external_id, self.query_text
        );
        Ok(())
    }

    /// Fetch schema snapshots and expand/validate fields against them. Runs once.
    ///
    /// Describable sides are processed source first, then target. A side backed
    /// by a non-describable medium shares the other side's snapshot.
    pub async fn describe(&mut self, ctx: &JobContext, describers: &Describers) -> Result<()> {
        match self.state {
            TaskState::Unconfigured => {
                return Err(MigrateError::config(
                    self.display_name(),
                    "task must be set up before it is described",
                ))
            }
            TaskState::Described => return Ok(()),
            TaskState::Configured => {}
        }

        let source_describable = ctx.medium(Side::Source).is_describable();
        let target_describable = ctx.medium(Side::Target).is_describable();
        if !source_describable && !target_describable {
            return Err(MigrateError::config(
                &self.object,
                "neither side can be described",
            ));
        }

        if source_describable {
            let snapshot = self.fetch(describers, Side::Source).await?;
            self.apply_snapshot(ctx, &snapshot, Side::Source, None)?;
            self.source_describe = Some(snapshot);
        }
        if target_describable {
            let snapshot = self.fetch(describers, Side::Target).await?;
            let counterpart = self.source_describe.clone();
            self.apply_snapshot(ctx, &snapshot, Side::Target, counterpart.as_deref())?;
            self.target_describe = Some(snapshot);
        }
        if !source_describable {
            self.source_describe = self.target_describe.clone();
        }
        if !target_describable {
            self.target_describe = self.source_describe.clone();
        }

        self.state = TaskState::Described;
        info!(
            "Described {}: {} field(s), {} warning(s)",
            self.object,
            self.query.fields.len(),
            self.warnings.len()
        );
        Ok(())
    }

    async fn fetch(&self, describers: &Describers, side: Side) -> Result<Arc<SObjectDescribe>> {
        let describer = describers.for_side(side);
        debug!(
            "Describing {} on the {} side ({})",
            self.object,
            side,
            describer.system_name()
        );
        let mut snapshot = describer
            .describe_object(&self.object)
            .await
            .map_err(|e| {
                if e.is_config() {
                    e
                } else {
                    MigrateError::metadata(&self.object, side, e.to_string())
                }
            })?;
        snapshot.assign_owner(&self.object);
        Ok(Arc::new(snapshot))
    }

    fn apply_snapshot(
        &mut self,
        ctx: &JobContext,
        snapshot: &SObjectDescribe,
        side: Side,
        counterpart: Option<&SObjectDescribe>,
    ) -> Result<()> {
        if self.operation != Operation::Delete {
            let mandatory = self.mandatory_fields();
            expansion::expand_fields(
                &mut self.query,
                self.pattern.as_ref(),
                snapshot,
                counterpart,
                ExpansionRules {
                    excluded: &self.excluded_fields,
                    mandatory: &mandatory,
                    denied_targets: ctx.denied_reference_targets(),
                },
            );
        }

        let critical = self.critical_fields();
        let warnings = validator::validate_fields(
            &mut self.query,
            snapshot,
            validator::ValidationScope {
                object: &self.object,
                side,
                critical: &critical,
                skip_existence: self.config.is_extra_object,
            },
        )?;
        self.warnings.extend(warnings);
        self.sync_query_text();
        Ok(())
    }

    fn inject_mandatory_fields(&mut self, ctx: &JobContext) {
        let mut required = self.external_id.required_fields();
        if self.original_external_id != self.external_id {
            required.extend(self.original_external_id.required_fields());
        }
        if ctx.person_accounts()
            && PERSON_ACCOUNT_OBJECTS
                .iter()
                .any(|o| o.eq_ignore_ascii_case(&self.object))
        {
            required.push(FieldRef::Name(PERSON_ACCOUNT_FIELD.to_string()));
        }
        for field in required {
            self.query.push_field(field);
        }
    }

    /// Fields that exclusions never remove.
    fn mandatory_fields(&self) -> FieldNameSet {
        let mut names = self.critical_fields();
        for field in self.original_external_id.required_fields() {
            names.insert(&field.key());
        }
        names
    }

    /// Fields whose absence from a schema makes records impossible to match.
    fn critical_fields(&self) -> FieldNameSet {
        let mut names = FieldNameSet::new([RECORD_ID_FIELD]);
        for field in self.external_id.required_fields() {
            names.insert(&field.key());
        }
        names
    }

    fn build_delete_query(&self) -> SoqlQuery {
        let mut delete = SoqlQuery::new(
            &self.object,
            vec![FieldRef::Name(RECORD_ID_FIELD.to_string())],
        );
        delete.where_clause = match self.config.delete_where.as_deref().map(str::trim) {
            Some(filter) if !filter.is_empty() => Some(filter.to_string()),
            _ if self.operation == Operation::Delete => self.query.where_clause.clone(),
            _ => None,
        };
        if self.operation == Operation::Delete {
            delete.limit = self.query.limit;
        }
        delete
    }

    fn sync_query_text(&mut self) {
        self.query_text = self.query.compose();
        self.delete_query_text = self.delete_query.as_ref().map(SoqlQuery::compose);
    }

    fn display_name(&self) -> String {
        if self.object.is_empty() {
            self.config.query.clone()
        } else {
            self.object.clone()
        }
    }

    // ===== Read-only views =====

    pub fn config(&self) -> &ObjectConfig {
        &self.config
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Object name taken from the resolved query; empty before setup.
    pub fn object_name(&self) -> &str {
        &self.object
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn external_id(&self) -> &ExternalId {
        &self.external_id
    }

    /// External id as configured, before `Insert` forced the record id.
    pub fn original_external_id(&self) -> &ExternalId {
        &self.original_external_id
    }

    pub fn query(&self) -> &SoqlQuery {
        &self.query
    }

    /// Canonical query text.
    pub fn query_text(&self) -> &str {
        &self.query_text
    }

    pub fn delete_query(&self) -> Option<&SoqlQuery> {
        self.delete_query.as_ref()
    }

    pub fn delete_query_text(&self) -> Option<&str> {
        self.delete_query_text.as_deref()
    }

    /// Resolved select list.
    pub fn field_names(&self) -> Vec<String> {
        self.query.field_names()
    }

    pub fn pattern(&self) -> Option<&MultiselectPattern> {
        self.pattern.as_ref()
    }

    pub fn source_describe(&self) -> Option<&SObjectDescribe> {
        self.source_describe.as_deref()
    }

    pub fn target_describe(&self) -> Option<&SObjectDescribe> {
        self.target_describe.as_deref()
    }

    /// True when both sides hold the same snapshot instance.
    pub fn shares_describe(&self) -> bool {
        match (&self.source_describe, &self.target_describe) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn warnings(&self) -> &[FieldWarning] {
        &self.warnings
    }

    /// Snapshot used for field lookups: the source side, or the target when only it exists.
    fn primary_describe(&self) -> Option<&SObjectDescribe> {
        self.source_describe
            .as_deref()
            .or(self.target_describe.as_deref())
    }

    /// Descriptors of the selected plain fields, in select-list order.
    pub fn described_fields(&self) -> Vec<&FieldDescribe> {
        let Some(describe) = self.primary_describe() else {
            return Vec::new();
        };
        self.query
            .fields
            .iter()
            .filter_map(FieldRef::simple_name)
            .filter_map(|name| describe.field(name))
            .collect()
    }

    /// Selected field name to descriptor.
    pub fn field_map(&self) -> HashMap<String, &FieldDescribe> {
        self.described_fields()
            .into_iter()
            .map(|f| (f.name.clone(), f))
            .collect()
    }

    /// Objects referenced through selected lookup fields.
    pub fn parent_lookup_objects(&self) -> Vec<String> {
        relationships::parent_objects(self.described_fields(), RelationshipKind::Lookup)
    }

    /// Objects referenced through selected master-detail fields.
    pub fn parent_master_detail_objects(&self) -> Vec<String> {
        relationships::parent_objects(self.described_fields(), RelationshipKind::MasterDetail)
    }

    pub fn has_parent_relationships(&self) -> bool {
        self.described_fields()
            .iter()
            .any(|f| f.relationship_kind().is_some())
    }

    /// Check whether any selected field references `object`.
    pub fn references(&self, object: &str) -> bool {
        self.described_fields()
            .iter()
            .filter_map(|f| f.reference_target())
            .any(|target| target.eq_ignore_ascii_case(object))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{JobConfig, MediumConfig};
    use crate::core::schema::FieldType;
    use crate::core::StaticDescriber;

    fn context(source: MediumConfig, target: MediumConfig, person_accounts: bool) -> JobContext {
        JobContext::new(&JobConfig {
            source,
            target,
            person_accounts,
            ..Default::default()
        })
    }

    fn org_context() -> JobContext {
        context(MediumConfig::org("src"), MediumConfig::org("dst"), false)
    }

    fn make_test_contact() -> SObjectDescribe {
        SObjectDescribe::new("Contact")
            .with_field(FieldDescribe::new("Id", FieldType::Id))
            .with_field(FieldDescribe::new("FirstName", FieldType::String).writable())
            .with_field(FieldDescribe::new("Email", FieldType::Email).writable())
            .with_field(FieldDescribe::new("SystemField", FieldType::String))
            .with_field(FieldDescribe::new("Name", FieldType::String))
            .with_field(
                FieldDescribe::new("AccountId", FieldType::Reference)
                    .writable()
                    .lookup("Account"),
            )
    }

    fn describers(source: StaticDescriber, target: StaticDescriber) -> Describers {
        Describers::new(Arc::new(source), Arc::new(target))
    }

    fn same_on_both_sides(describe: SObjectDescribe) -> Describers {
        describers(
            StaticDescriber::new("src").with_object(describe.clone()),
            StaticDescriber::new("dst").with_object(describe),
        )
    }

    fn configured(config: ObjectConfig, ctx: &JobContext) -> MigrationTask {
        let mut task = MigrationTask::new(config);
        task.setup(ctx).unwrap();
        task
    }

    #[test]
    fn test_insert_scenario() {
        let ctx = org_context();
        let task = configured(
            ObjectConfig {
                operation: Operation::Insert.into(),
                ..ObjectConfig::new("SELECT Name FROM Account")
            },
            &ctx,
        );
        assert_eq!(task.state(), TaskState::Configured);
        assert_eq!(task.object_name(), "Account");
        assert_eq!(task.field_names(), vec!["Id", "Name"]);
        assert!(task.external_id().is_record_id());
        assert_eq!(task.query_text(), "SELECT Id, Name FROM Account");
    }

    #[test]
    fn test_insert_forces_record_id_and_keeps_original() {
        let ctx = org_context();
        let task = configured(
            ObjectConfig {
                operation: Operation::Insert.into(),
                external_id: Some("External_Key__c".into()),
                ..ObjectConfig::new("SELECT Name FROM Account")
            },
            &ctx,
        );
        assert_eq!(task.external_id().as_str(), "Id");
        assert_eq!(task.original_external_id().as_str(), "External_Key__c");
        assert_eq!(task.field_names(), vec!["Id", "Name", "External_Key__c"]);
    }

    #[test]
    fn test_external_id_defaults() {
        let ctx = org_context();
        let upsert = configured(
            ObjectConfig {
                operation: Operation::Upsert.into(),
                ..ObjectConfig::new("SELECT Email FROM Contact")
            },
            &ctx,
        );
        assert_eq!(upsert.external_id().as_str(), "Name");
        assert_eq!(upsert.field_names(), vec!["Id", "Email", "Name"]);

        let readonly = configured(ObjectConfig::new("SELECT Email FROM Contact"), &ctx);
        assert!(readonly.external_id().is_record_id());
    }

    #[test]
    fn test_composite_external_id_injected_once() {
        let ctx = org_context();
        let task = configured(
            ObjectConfig {
                operation: Operation::Upsert.into(),
                external_id: Some("LastName; Account.Name".into()),
                ..ObjectConfig::new("SELECT LastName, $$LastName$Account.Name FROM Contact")
            },
            &ctx,
        );
        assert!(task.external_id().is_composite());
        assert_eq!(
            task.field_names(),
            vec!["Id", "LastName", "$$LastName$Account.Name", "Account.Name"]
        );
    }

    #[test]
    fn test_external_id_without_fields_rejected() {
        let ctx = org_context();
        for raw in [";", "$$", " ; "] {
            let mut task = MigrationTask::new(ObjectConfig {
                operation: Operation::Upsert.into(),
                external_id: Some(raw.into()),
                ..ObjectConfig::new("SELECT Name FROM Account")
            });
            let err = task.setup(&ctx).unwrap_err();
            assert!(err.is_config(), "{}", raw);
            assert!(err.to_string().contains("names no field"), "{}", raw);
            assert_eq!(task.state(), TaskState::Unconfigured);
        }
    }

    #[test]
    fn test_person_account_marker() {
        let ctx = context(MediumConfig::org("a"), MediumConfig::org("b"), true);
        let account = configured(ObjectConfig::new("SELECT Name FROM Account"), &ctx);
        assert!(account.query().has_field(PERSON_ACCOUNT_FIELD));

        let lead = configured(ObjectConfig::new("SELECT Name FROM Lead"), &ctx);
        assert!(!lead.query().has_field(PERSON_ACCOUNT_FIELD));
    }

    #[test]
    fn test_delete_collapses_to_record_id() {
        let ctx = org_context();
        let task = configured(
            ObjectConfig {
                operation: OperationValue::Code(4),
                ..ObjectConfig::new("SELECT Name, Email FROM Contact WHERE Email = null")
            },
            &ctx,
        );
        assert_eq!(task.operation(), Operation::Delete);
        assert_eq!(task.field_names(), vec!["Id"]);
        let delete = task.delete_query().unwrap();
        assert_eq!(delete.field_names(), vec!["Id"]);
        assert_eq!(
            task.delete_query_text(),
            Some("SELECT Id FROM Contact WHERE Email = null")
        );
    }

    #[test]
    fn test_delete_old_data_builds_delete_query() {
        let ctx = org_context();
        let task = configured(
            ObjectConfig {
                operation: Operation::Upsert.into(),
                delete_old_data: true,
                delete_where: Some("CreatedDate < LAST_YEAR".into()),
                ..ObjectConfig::new("SELECT Name FROM Account WHERE Type = 'X'")
            },
            &ctx,
        );
        assert_eq!(task.field_names(), vec!["Id", "Name"]);
        assert_eq!(
            task.delete_query_text(),
            Some("SELECT Id FROM Account WHERE CreatedDate < LAST_YEAR")
        );
    }

    #[test]
    fn test_excluded_fields_removed_but_mandatory_kept() {
        let ctx = org_context();
        let task = configured(
            ObjectConfig {
                operation: Operation::Upsert.into(),
                excluded_fields: vec!["Email".into(), "Name".into(), "Id".into()],
                ..ObjectConfig::new("SELECT Email, Phone FROM Contact")
            },
            &ctx,
        );
        assert_eq!(task.field_names(), vec!["Id", "Phone", "Name"]);
    }

    #[test]
    fn test_setup_is_idempotent() {
        let ctx = org_context();
        let mut task = configured(ObjectConfig::new("SELECT Name FROM Account"), &ctx);
        let before = task.query_text().to_string();
        task.setup(&ctx).unwrap();
        assert_eq!(task.query_text(), before);
        assert_eq!(task.state(), TaskState::Configured);
    }

    #[test]
    fn test_setup_malformed_query_fails() {
        let ctx = org_context();
        let mut task = MigrationTask::new(ObjectConfig::new("SELECT Name Account"));
        let err = task.setup(&ctx).unwrap_err();
        assert!(err.is_config());
        assert_eq!(task.state(), TaskState::Unconfigured);
    }

    #[test]
    fn test_views_empty_before_describe() {
        let ctx = org_context();
        let task = configured(ObjectConfig::new("SELECT AccountId FROM Contact"), &ctx);
        assert!(task.described_fields().is_empty());
        assert!(task.field_map().is_empty());
        assert!(task.parent_lookup_objects().is_empty());
        assert!(!task.has_parent_relationships());
    }

    #[tokio::test]
    async fn test_multiselect_scenario() {
        let ctx = org_context();
        let mut task = configured(ObjectConfig::new("SELECT creatable_true FROM Contact"), &ctx);
        task.describe(&ctx, &same_on_both_sides(make_test_contact()))
            .await
            .unwrap();

        assert_eq!(task.state(), TaskState::Described);
        let names = task.field_names();
        assert!(names.contains(&"Id".to_string()));
        assert!(names.contains(&"FirstName".to_string()));
        assert!(names.contains(&"Email".to_string()));
        assert!(!names.contains(&"SystemField".to_string()));
        assert_eq!(names[0], "Id");
    }

    #[tokio::test]
    async fn test_describe_prunes_missing_fields_with_warning() {
        let ctx = org_context();
        let mut task = configured(
            ObjectConfig::new("SELECT FirstName, Legacy__c FROM Contact"),
            &ctx,
        );
        task.describe(&ctx, &same_on_both_sides(make_test_contact()))
            .await
            .unwrap();

        assert_eq!(task.field_names(), vec!["Id", "FirstName"]);
        assert_eq!(task.warnings().len(), 1);
        assert_eq!(task.warnings()[0].field, "Legacy__c");
        assert_eq!(task.warnings()[0].side, Side::Source);
        assert_eq!(task.query_text(), "SELECT Id, FirstName FROM Contact");
    }

    #[tokio::test]
    async fn test_missing_external_id_on_target_is_fatal() {
        let ctx = org_context();
        let source = make_test_contact().with_field(FieldDescribe::new("Key__c", FieldType::String));
        let mut task = configured(
            ObjectConfig {
                operation: Operation::Upsert.into(),
                external_id: Some("Key__c".into()),
                ..ObjectConfig::new("SELECT FirstName FROM Contact")
            },
            &ctx,
        );
        let err = task
            .describe(
                &ctx,
                &describers(
                    StaticDescriber::new("src").with_object(source),
                    StaticDescriber::new("dst").with_object(make_test_contact()),
                ),
            )
            .await
            .unwrap_err();

        assert!(err.is_config());
        assert!(err.to_string().contains("target side"));
        assert_eq!(task.state(), TaskState::Configured);
    }

    #[tokio::test]
    async fn test_missing_composite_component_is_fatal() {
        let ctx = org_context();
        let mut task = configured(
            ObjectConfig {
                operation: Operation::Upsert.into(),
                external_id: Some("Name;Key__c".into()),
                ..ObjectConfig::new("SELECT FirstName FROM Contact")
            },
            &ctx,
        );
        let err = task
            .describe(&ctx, &same_on_both_sides(make_test_contact()))
            .await
            .unwrap_err();

        match err {
            MigrateError::Config { object, message } => {
                assert_eq!(object, "Contact");
                assert!(message.contains("Key__c"));
                assert!(message.contains("source side"));
            }
            other => panic!("expected config error, got {other:?}"),
        }
        assert_eq!(task.state(), TaskState::Configured);
    }

    #[tokio::test]
    async fn test_fetch_failure_becomes_metadata_error() {
        let ctx = org_context();
        let mut task = configured(ObjectConfig::new("SELECT Name FROM Contact"), &ctx);
        let err = task
            .describe(
                &ctx,
                &describers(
                    StaticDescriber::new("src").with_object(make_test_contact()),
                    StaticDescriber::new("dst"),
                ),
            )
            .await
            .unwrap_err();

        match err {
            MigrateError::Metadata { object, side, .. } => {
                assert_eq!(object, "Contact");
                assert_eq!(side, Side::Target);
            }
            other => panic!("expected metadata error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_csv_source_mirrors_target_snapshot() {
        let ctx = context(MediumConfig::csv_file(), MediumConfig::org("dst"), false);
        let mut task = configured(ObjectConfig::new("SELECT all FROM Contact"), &ctx);
        task.describe(
            &ctx,
            &describers(
                StaticDescriber::new("unused"),
                StaticDescriber::new("dst").with_object(make_test_contact()),
            ),
        )
        .await
        .unwrap();

        assert!(task.shares_describe());
        assert_eq!(task.source_describe().unwrap().name, "Contact");
        assert_eq!(task.field_names().len(), make_test_contact().fields().len());
    }

    #[tokio::test]
    async fn test_target_expansion_limited_to_source_fields() {
        let ctx = org_context();
        let source = SObjectDescribe::new("Contact")
            .with_field(FieldDescribe::new("Id", FieldType::Id))
            .with_field(FieldDescribe::new("Email", FieldType::Email).writable());
        let mut task = configured(ObjectConfig::new("SELECT creatable_true FROM Contact"), &ctx);
        task.describe(
            &ctx,
            &describers(
                StaticDescriber::new("src").with_object(source),
                StaticDescriber::new("dst").with_object(make_test_contact()),
            ),
        )
        .await
        .unwrap();

        assert_eq!(task.field_names(), vec!["Id", "Email"]);
        assert!(task.warnings().is_empty());
    }

    #[tokio::test]
    async fn test_describe_is_idempotent_and_requires_setup() {
        let ctx = org_context();
        let describers = same_on_both_sides(make_test_contact());

        let mut unconfigured = MigrationTask::new(ObjectConfig::new("SELECT Name FROM Contact"));
        assert!(unconfigured.describe(&ctx, &describers).await.unwrap_err().is_config());

        let mut task = configured(ObjectConfig::new("SELECT updateable_true FROM Contact"), &ctx);
        task.describe(&ctx, &describers).await.unwrap();
        let once = task.field_names();
        task.describe(&ctx, &describers).await.unwrap();
        assert_eq!(task.field_names(), once);
    }

    #[tokio::test]
    async fn test_relationship_views_after_describe() {
        let ctx = org_context();
        let mut task = configured(ObjectConfig::new("SELECT AccountId, Email FROM Contact"), &ctx);
        task.describe(&ctx, &same_on_both_sides(make_test_contact()))
            .await
            .unwrap();

        assert_eq!(task.parent_lookup_objects(), vec!["Account"]);
        assert!(task.parent_master_detail_objects().is_empty());
        assert!(task.has_parent_relationships());
        assert!(task.references("account"));
        let map = task.field_map();
        assert_eq!(map["AccountId"].owner.as_deref(), Some("Contact"));
    }
}
