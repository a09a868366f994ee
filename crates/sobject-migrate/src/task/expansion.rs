//! Multiselect patterns and field expansion.
//!
//! A query may select keywords such as `all` or `creatable_true` instead of
//! field names. The resolver collects them into a [`MultiselectPattern`];
//! once a schema snapshot is available, [`expand_fields`] appends every
//! matching field.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::schema::{FieldDescribe, FieldType, SObjectDescribe};
use crate::query::{FieldRef, SoqlQuery};

/// A single recognised `<property>_<value>` condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "property", content = "value", rename_all = "snake_case")]
pub enum FieldPredicate {
    Creatable(bool),
    Updateable(bool),
    Readonly(bool),
    Custom(bool),
    AutoNumber(bool),
    Lookup(bool),
    MasterDetail(bool),
    Type(FieldType),
}

impl FieldPredicate {
    /// Parse a `<property>_<value>` keyword (case-insensitive).
    pub fn from_keyword(token: &str) -> Option<Self> {
        let lower = token.trim().to_ascii_lowercase();
        let (property, value) = lower.split_once('_')?;

        if property == "type" {
            return FieldType::from_name(value).map(FieldPredicate::Type);
        }

        let flag = match value {
            "true" => true,
            "false" => false,
            _ => return None,
        };
        let predicate = match property {
            "creatable" | "createable" => FieldPredicate::Creatable(flag),
            "updateable" | "updatable" => FieldPredicate::Updateable(flag),
            "readonly" => FieldPredicate::Readonly(flag),
            "custom" => FieldPredicate::Custom(flag),
            "autonumber" => FieldPredicate::AutoNumber(flag),
            "lookup" => FieldPredicate::Lookup(flag),
            "masterdetail" => FieldPredicate::MasterDetail(flag),
            _ => return None,
        };
        Some(predicate)
    }

    pub fn matches(&self, field: &FieldDescribe) -> bool {
        match *self {
            FieldPredicate::Creatable(v) => field.createable == v,
            FieldPredicate::Updateable(v) => field.updateable == v,
            FieldPredicate::Readonly(v) => field.is_readonly() == v,
            FieldPredicate::Custom(v) => field.custom == v,
            FieldPredicate::AutoNumber(v) => field.auto_number == v,
            FieldPredicate::Lookup(v) => field.is_lookup() == v,
            FieldPredicate::MasterDetail(v) => field.is_master_detail() == v,
            FieldPredicate::Type(ty) => field.field_type == ty,
        }
    }
}

/// Conditions a field must satisfy to be pulled in by expansion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiselectPattern {
    /// `all` keyword: every field matches.
    pub all: bool,

    /// Every predicate must hold.
    pub predicates: Vec<FieldPredicate>,
}

impl MultiselectPattern {
    /// Record `token` if it is a multiselect keyword. Returns false for ordinary field names.
    pub fn accept_keyword(&mut self, token: &str) -> bool {
        if token.trim().eq_ignore_ascii_case("all") {
            self.all = true;
            return true;
        }
        match FieldPredicate::from_keyword(token) {
            Some(predicate) => {
                if !self.predicates.contains(&predicate) {
                    self.predicates.push(predicate);
                }
                true
            }
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.all && self.predicates.is_empty()
    }

    pub fn matches(&self, field: &FieldDescribe) -> bool {
        if self.all {
            return true;
        }
        !self.predicates.is_empty() && self.predicates.iter().all(|p| p.matches(field))
    }
}

/// Case-insensitive set of field names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldNameSet {
    names: HashSet<String>,
}

impl FieldNameSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            names: names
                .into_iter()
                .map(|n| n.as_ref().trim().to_ascii_lowercase())
                .filter(|n| !n.is_empty())
                .collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(&name.to_ascii_lowercase())
    }

    pub fn insert(&mut self, name: &str) {
        self.names.insert(name.to_ascii_lowercase());
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Inputs to one expansion pass.
#[derive(Debug, Clone, Copy)]
pub struct ExpansionRules<'a> {
    /// Fields never selected.
    pub excluded: &'a FieldNameSet,
    /// Fields exclusions never remove.
    pub mandatory: &'a FieldNameSet,
    /// Parent objects whose reference fields are never pulled in.
    pub denied_targets: &'a FieldNameSet,
}

/// Append every field of `snapshot` matching `pattern`, then apply exclusions and dedupe.
///
/// When `counterpart` is given (the other side's snapshot), only fields that
/// also exist there are added. Returns the number of fields added.
pub fn expand_fields(
    query: &mut SoqlQuery,
    pattern: Option<&MultiselectPattern>,
    snapshot: &SObjectDescribe,
    counterpart: Option<&SObjectDescribe>,
    rules: ExpansionRules<'_>,
) -> usize {
    let mut added = 0;

    if let Some(pattern) = pattern.filter(|p| !p.is_empty()) {
        for field in snapshot.fields() {
            if !pattern.matches(field)
                || query.has_field(&field.name)
                || rules.excluded.contains(&field.name)
            {
                continue;
            }
            if field
                .reference_target()
                .is_some_and(|target| rules.denied_targets.contains(target))
            {
                continue;
            }
            if counterpart.is_some_and(|other| !other.has_field(&field.name)) {
                continue;
            }
            query.fields.push(FieldRef::Name(field.name.clone()));
            added += 1;
        }
        debug!(
            "Expanded {} field(s) for {} from {} snapshot fields",
            added,
            query.object,
            snapshot.fields().len()
        );
    }

    apply_exclusions(query, rules.excluded, rules.mandatory);
    query.dedup_fields();
    added
}

/// Drop excluded fields, never removing a mandatory one.
pub fn apply_exclusions(query: &mut SoqlQuery, excluded: &FieldNameSet, mandatory: &FieldNameSet) {
    if excluded.is_empty() {
        return;
    }
    query.fields.retain(|f| {
        let key = f.key();
        !excluded.contains(&key) || mandatory.contains(&key)
    });
}
