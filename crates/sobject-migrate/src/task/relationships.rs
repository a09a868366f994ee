//! Parent relationship extraction from resolved fields.

use serde::{Deserialize, Serialize};

use crate::core::schema::{FieldDescribe, RelationshipKind};

/// Parent objects referenced through fields of `kind`, deduplicated by name in first-seen order.
pub fn parent_objects<'a, I>(fields: I, kind: RelationshipKind) -> Vec<String>
where
    I: IntoIterator<Item = &'a FieldDescribe>,
{
    let mut parents: Vec<String> = Vec::new();
    for field in fields {
        if field.relationship_kind() != Some(kind) {
            continue;
        }
        let Some(target) = field.reference_target() else {
            continue;
        };
        if !parents.iter().any(|p| p.eq_ignore_ascii_case(target)) {
            parents.push(target.to_string());
        }
    }
    parents
}

/// Relationship facts the scheduler uses to decide processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipSummary {
    pub parent_lookup_objects: Vec<String>,
    pub parent_master_detail_objects: Vec<String>,
    pub has_parent_relationships: bool,
    pub has_child_relationships: bool,
}

impl RelationshipSummary {
    /// The object can be processed on its own.
    pub fn has_no_relationships(&self) -> bool {
        !self.has_parent_relationships && !self.has_child_relationships
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::FieldType;

    fn fields() -> Vec<FieldDescribe> {
        vec![
            FieldDescribe::new("Id", FieldType::Id),
            FieldDescribe::new("AccountId", FieldType::Reference).lookup("Account"),
            FieldDescribe::new("OwnerId", FieldType::Reference).lookup("User"),
            FieldDescribe::new("Billing_Account__c", FieldType::Reference).lookup("Account"),
            FieldDescribe::new("Household__c", FieldType::Reference).master_detail("Household__c"),
        ]
    }

    #[test]
    fn test_lookup_parents_deduped_in_order() {
        let fields = fields();
        assert_eq!(
            parent_objects(&fields, RelationshipKind::Lookup),
            vec!["Account", "User"]
        );
    }

    #[test]
    fn test_master_detail_parents() {
        let fields = fields();
        assert_eq!(
            parent_objects(&fields, RelationshipKind::MasterDetail),
            vec!["Household__c"]
        );
    }

    #[test]
    fn test_summary_independence() {
        let summary = RelationshipSummary::default();
        assert!(summary.has_no_relationships());

        let summary = RelationshipSummary {
            has_child_relationships: true,
            ..Default::default()
        };
        assert!(!summary.has_no_relationships());
    }
}
