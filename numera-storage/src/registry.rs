//! In-memory schema registry and record lookup.

use numera_core::{
    EntitySchema, NumeraResult, RecordRef, RecordResolver, RecordSnapshot, SchemaProvider,
    StorageError, ValidationError,
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// [`SchemaProvider`] backed by a map of registered schemas.
#[derive(Debug, Default)]
pub struct InMemorySchemaRegistry {
    schemas: RwLock<HashMap<String, Arc<EntitySchema>>>,
}

impl InMemorySchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace the schema for `schema.name`.
    pub fn register(&self, schema: EntitySchema) -> NumeraResult<Arc<EntitySchema>> {
        let schema = Arc::new(schema);
        self.schemas
            .write()
            .map_err(|_| StorageError::LockPoisoned)?
            .insert(schema.name.clone(), Arc::clone(&schema));
        Ok(schema)
    }

    /// Builder form of [`Self::register`].
    pub fn with_schema(self, schema: EntitySchema) -> NumeraResult<Self> {
        self.register(schema)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.schemas.read().map(|s| s.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SchemaProvider for InMemorySchemaRegistry {
    fn schema(&self, entity: &str) -> Option<Arc<EntitySchema>> {
        self.schemas.read().ok()?.get(entity).cloned()
    }
}

/// [`RecordResolver`] over records stored by entity and id.
#[derive(Debug, Default)]
pub struct InMemoryRecords {
    records: RwLock<HashMap<RecordRef, RecordSnapshot>>,
}

impl InMemoryRecords {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `snapshot` as a record of `entity`. The snapshot must carry an id.
    pub fn insert(&self, entity: &str, snapshot: RecordSnapshot) -> NumeraResult<RecordRef> {
        let id = snapshot
            .id
            .clone()
            .ok_or_else(|| ValidationError::RequiredFieldMissing {
                field: "id".to_string(),
            })?;
        let reference = RecordRef::new(entity, id);
        self.records
            .write()
            .map_err(|_| StorageError::LockPoisoned)?
            .insert(reference.clone(), snapshot);
        Ok(reference)
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecordResolver for InMemoryRecords {
    fn resolve(&self, reference: &RecordRef) -> NumeraResult<Option<RecordSnapshot>> {
        let records = self
            .records
            .read()
            .map_err(|_| StorageError::LockPoisoned)?;
        Ok(records.get(reference).cloned())
    }
}
