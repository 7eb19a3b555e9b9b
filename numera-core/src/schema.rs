//! Entity schema descriptors
//!
//! Templates reference fields by name; the engine asks a [`SchemaProvider`]
//! what fields an entity type declares instead of probing records dynamically.

use crate::FieldCategory;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Declaration of one field on an entity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    /// Human-readable label
    pub label: String,
    pub category: FieldCategory,
    /// Target entity type for relation fields
    pub related_entity: Option<String>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, category: FieldCategory) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            category,
            related_entity: None,
        }
    }

    /// Declare a single-valued relation to `entity`.
    pub fn relation(name: impl Into<String>, entity: impl Into<String>) -> Self {
        Self::new(name, FieldCategory::Relation).with_related_entity(entity)
    }

    /// Declare a multi-valued relation to `entity`.
    pub fn multi_relation(name: impl Into<String>, entity: impl Into<String>) -> Self {
        Self::new(name, FieldCategory::MultiRelation).with_related_entity(entity)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_related_entity(mut self, entity: impl Into<String>) -> Self {
        self.related_entity = Some(entity.into());
        self
    }
}

/// Field declarations for one entity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySchema {
    /// Technical name, e.g. `account.move`
    pub name: String,
    /// Display description used in error messages
    pub description: String,
    pub fields: BTreeMap<String, FieldDescriptor>,
}

impl EntitySchema {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }
}

/// Record schema service consumed by the resolver.
pub trait SchemaProvider: Send + Sync {
    /// Look up the schema of an entity type by technical name.
    fn schema(&self, entity: &str) -> Option<Arc<EntitySchema>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_builder_registers_fields() {
        let schema = EntitySchema::new("res.partner", "Contact")
            .with_field(FieldDescriptor::new("name", FieldCategory::Text).with_label("Name"))
            .with_field(FieldDescriptor::relation("country", "res.country"));

        assert!(schema.has_field("name"));
        assert_eq!(schema.field("name").unwrap().label, "Name");
        let country = schema.field("country").unwrap();
        assert_eq!(country.category, FieldCategory::Relation);
        assert_eq!(country.related_entity.as_deref(), Some("res.country"));
        assert!(schema.field("missing").is_none());
    }

    #[test]
    fn test_label_defaults_to_name() {
        let field = FieldDescriptor::new("year", FieldCategory::Integer);
        assert_eq!(field.label, "year");
    }
}
