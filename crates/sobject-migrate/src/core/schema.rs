//! Schema metadata types for objects and their fields.
//!
//! These types mirror the shape of an object describe result so snapshots can
//! be loaded straight from describe JSON.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Declared data type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Id,
    Reference,
    #[default]
    String,
    Boolean,
    Int,
    Double,
    Currency,
    Percent,
    Date,
    Datetime,
    Time,
    Picklist,
    Multipicklist,
    Combobox,
    Textarea,
    Email,
    Phone,
    Url,
    Address,
    Location,
    Base64,
    #[serde(other)]
    Other,
}

impl FieldType {
    /// Look up a type by its lowercase describe name.
    pub fn from_name(name: &str) -> Option<Self> {
        let ty = match name.to_ascii_lowercase().as_str() {
            "id" => FieldType::Id,
            "reference" => FieldType::Reference,
            "string" => FieldType::String,
            "boolean" => FieldType::Boolean,
            "int" => FieldType::Int,
            "double" => FieldType::Double,
            "currency" => FieldType::Currency,
            "percent" => FieldType::Percent,
            "date" => FieldType::Date,
            "datetime" => FieldType::Datetime,
            "time" => FieldType::Time,
            "picklist" => FieldType::Picklist,
            "multipicklist" => FieldType::Multipicklist,
            "combobox" => FieldType::Combobox,
            "textarea" => FieldType::Textarea,
            "email" => FieldType::Email,
            "phone" => FieldType::Phone,
            "url" => FieldType::Url,
            "address" => FieldType::Address,
            "location" => FieldType::Location,
            "base64" => FieldType::Base64,
            _ => return None,
        };
        Some(ty)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Id => "id",
            FieldType::Reference => "reference",
            FieldType::String => "string",
            FieldType::Boolean => "boolean",
            FieldType::Int => "int",
            FieldType::Double => "double",
            FieldType::Currency => "currency",
            FieldType::Percent => "percent",
            FieldType::Date => "date",
            FieldType::Datetime => "datetime",
            FieldType::Time => "time",
            FieldType::Picklist => "picklist",
            FieldType::Multipicklist => "multipicklist",
            FieldType::Combobox => "combobox",
            FieldType::Textarea => "textarea",
            FieldType::Email => "email",
            FieldType::Phone => "phone",
            FieldType::Url => "url",
            FieldType::Address => "address",
            FieldType::Location => "location",
            FieldType::Base64 => "base64",
            FieldType::Other => "other",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a reference field relates to its parent object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    /// Plain lookup; the child can exist without the parent.
    Lookup,
    /// Master-detail; the parent owns the child and deletes cascade.
    MasterDetail,
}

/// Field metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescribe {
    /// API name of the field.
    pub name: String,

    #[serde(default)]
    pub label: String,

    /// Declared type.
    #[serde(rename = "type", default)]
    pub field_type: FieldType,

    /// Field can be set on insert.
    #[serde(default, alias = "creatable")]
    pub createable: bool,

    /// Field can be set on update.
    #[serde(default)]
    pub updateable: bool,

    /// Formula or roll-up field.
    #[serde(default)]
    pub calculated: bool,

    #[serde(default)]
    pub auto_number: bool,

    /// Custom (`__c`) field.
    #[serde(default)]
    pub custom: bool,

    /// Parent objects for reference fields. Polymorphic lookups list several.
    #[serde(default)]
    pub reference_to: Vec<String>,

    /// Relationship name used in paths (`Account` for `AccountId`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_name: Option<String>,

    /// Set on master-detail fields.
    #[serde(default)]
    pub cascade_delete: bool,

    /// Name of the object whose snapshot holds this field. Assigned after fetch.
    #[serde(skip)]
    pub owner: Option<String>,
}

impl FieldDescribe {
    /// Create a plain field of the given type.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            field_type,
            ..Default::default()
        }
    }

    /// Mark the field as writable on insert and update.
    pub fn writable(mut self) -> Self {
        self.createable = true;
        self.updateable = true;
        self
    }

    /// Turn the field into a lookup to `parent`.
    pub fn lookup(mut self, parent: impl Into<String>) -> Self {
        self.field_type = FieldType::Reference;
        self.reference_to = vec![parent.into()];
        self
    }

    /// Turn the field into a master-detail reference to `parent`.
    pub fn master_detail(self, parent: impl Into<String>) -> Self {
        let mut field = self.lookup(parent);
        field.cascade_delete = true;
        field
    }

    /// Neither creatable nor updateable.
    pub fn is_readonly(&self) -> bool {
        !self.createable && !self.updateable
    }

    /// Primary parent object of a reference field.
    pub fn reference_target(&self) -> Option<&str> {
        self.reference_to.first().map(String::as_str)
    }

    /// Relationship kind, or `None` for non-reference fields.
    pub fn relationship_kind(&self) -> Option<RelationshipKind> {
        self.reference_target()?;
        if self.cascade_delete {
            Some(RelationshipKind::MasterDetail)
        } else {
            Some(RelationshipKind::Lookup)
        }
    }

    pub fn is_lookup(&self) -> bool {
        self.relationship_kind() == Some(RelationshipKind::Lookup)
    }

    pub fn is_master_detail(&self) -> bool {
        self.relationship_kind() == Some(RelationshipKind::MasterDetail)
    }
}

/// Describe file layout; converted into [`SObjectDescribe`] to build the name index.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeDocument {
    name: String,
    #[serde(default)]
    label: String,
    #[serde(default)]
    custom: bool,
    #[serde(default)]
    fields: Vec<FieldDescribe>,
}

impl From<DescribeDocument> for SObjectDescribe {
    fn from(doc: DescribeDocument) -> Self {
        let mut describe = SObjectDescribe::new(doc.name);
        describe.label = doc.label;
        describe.custom = doc.custom;
        for field in doc.fields {
            describe.add_field(field);
        }
        describe
    }
}

/// Schema snapshot of one object in one system.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "DescribeDocument", rename_all = "camelCase")]
pub struct SObjectDescribe {
    /// Object API name.
    pub name: String,

    pub label: String,

    pub custom: bool,

    /// Fields in describe order.
    fields: Vec<FieldDescribe>,

    /// Lowercased field name to position in `fields`.
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl SObjectDescribe {
    /// Create an empty snapshot.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            custom: false,
            fields: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Add a field, replacing any field with the same name.
    pub fn add_field(&mut self, field: FieldDescribe) {
        let key = field.name.to_ascii_lowercase();
        match self.index.get(&key) {
            Some(&pos) => self.fields[pos] = field,
            None => {
                self.index.insert(key, self.fields.len());
                self.fields.push(field);
            }
        }
    }

    /// Builder-style [`add_field`](Self::add_field).
    pub fn with_field(mut self, field: FieldDescribe) -> Self {
        self.add_field(field);
        self
    }

    /// Look up a field by name (case-insensitive).
    pub fn field(&self, name: &str) -> Option<&FieldDescribe> {
        self.index
            .get(&name.to_ascii_lowercase())
            .map(|&pos| &self.fields[pos])
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.index.contains_key(&name.to_ascii_lowercase())
    }

    /// Fields in describe order.
    pub fn fields(&self) -> &[FieldDescribe] {
        &self.fields
    }

    /// Record which object owns the fields of this snapshot.
    pub fn assign_owner(&mut self, owner: &str) {
        for field in &mut self.fields {
            field.owner = Some(owner.to_string());
        }
    }
}
