//! Field path resolution
//!
//! Walks a dotted path through a record snapshot, one relation hop per
//! segment, checking every segment against the schema and the slot's
//! [`FieldPolicy`].

use crate::template::FieldPath;
use numera_core::{
    format_number, EntitySchema, FieldDescriptor, FieldPolicy, FieldValue, NumeraResult,
    RecordResolver, RecordSnapshot, SchemaProvider, TemplateError, TemplateSlot,
    ValidationError,
};
use std::borrow::Cow;
use std::sync::Arc;

/// Outcome of resolving one field reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    Value(String),
    /// A segment was null, empty, or pointed at a missing record.
    Absent { field: String },
}

impl Resolved {
    pub fn into_value(self) -> Option<String> {
        match self {
            Resolved::Value(value) => Some(value),
            Resolved::Absent { .. } => None,
        }
    }
}

/// Resolves field paths against snapshots using the schema service and
/// record lookup collaborators.
#[derive(Clone, Copy)]
pub struct FieldResolver<'a> {
    schemas: &'a dyn SchemaProvider,
    records: &'a dyn RecordResolver,
}

impl<'a> FieldResolver<'a> {
    pub fn new(schemas: &'a dyn SchemaProvider, records: &'a dyn RecordResolver) -> Self {
        Self { schemas, records }
    }

    pub fn schemas(&self) -> &'a dyn SchemaProvider {
        self.schemas
    }

    /// Schema for `entity`, or `UnknownEntity`.
    pub fn schema_for(&self, entity: &str) -> NumeraResult<Arc<EntitySchema>> {
        self.schemas.schema(entity).ok_or_else(|| {
            TemplateError::UnknownEntity {
                entity: entity.to_string(),
            }
            .into()
        })
    }

    /// Resolve `path` on `record`, an instance of `schema`.
    pub fn resolve(
        &self,
        schema: &Arc<EntitySchema>,
        record: &RecordSnapshot,
        path: &FieldPath,
        policy: FieldPolicy,
        slot: TemplateSlot,
    ) -> NumeraResult<Resolved> {
        let mut current_schema = Arc::clone(schema);
        let mut current_record: Cow<'_, RecordSnapshot> = Cow::Borrowed(record);
        let last = path.segments.len().saturating_sub(1);

        for (depth, segment) in path.segments.iter().enumerate() {
            let descriptor = authorize(&current_schema, segment, policy, slot)?;
            let value = current_record.get(segment).unwrap_or(&FieldValue::Null);

            if value.is_absent() {
                tracing::trace!(field = %path, segment = %segment, "field value absent");
                return Ok(Resolved::Absent {
                    field: segment.clone(),
                });
            }

            if depth == last {
                return render_terminal(descriptor, value, path, slot).map(Resolved::Value);
            }

            if !descriptor.category.is_relation() {
                return Err(TemplateError::TypeNotAuthorized {
                    field: path.dotted(),
                    category: descriptor.category,
                    slot,
                }
                .into());
            }

            let next_record = match value {
                FieldValue::Record(snapshot) => (**snapshot).clone(),
                FieldValue::Reference(reference) => match self.records.resolve(reference)? {
                    Some(snapshot) => snapshot,
                    None => {
                        tracing::debug!(
                            field = %path,
                            entity = %reference.entity,
                            id = %reference.id,
                            "related record not found"
                        );
                        return Ok(Resolved::Absent {
                            field: segment.clone(),
                        });
                    }
                },
                _ => {
                    return Err(ValidationError::InvalidValue {
                        field: segment.clone(),
                        reason: "expected a related record".to_string(),
                    }
                    .into())
                }
            };

            let related = descriptor.related_entity.as_deref().ok_or_else(|| {
                ValidationError::InvalidValue {
                    field: segment.clone(),
                    reason: "relation declares no related entity".to_string(),
                }
            })?;

            current_schema = self.schema_for(related)?;
            current_record = Cow::Owned(next_record);
        }

        Ok(Resolved::Absent {
            field: path.dotted(),
        })
    }
}

/// Look up `segment` on `schema` and check it against the slot policy.
pub(crate) fn authorize<'s>(
    schema: &'s EntitySchema,
    segment: &str,
    policy: FieldPolicy,
    slot: TemplateSlot,
) -> Result<&'s FieldDescriptor, TemplateError> {
    let descriptor = schema
        .field(segment)
        .ok_or_else(|| TemplateError::FieldNotFound {
            field: segment.to_string(),
            entity: schema.description.clone(),
        })?;

    if !policy.allows(descriptor.category) {
        return Err(TemplateError::TypeNotAuthorized {
            field: segment.to_string(),
            category: descriptor.category,
            slot,
        });
    }

    Ok(descriptor)
}

fn render_terminal(
    descriptor: &FieldDescriptor,
    value: &FieldValue,
    path: &FieldPath,
    slot: TemplateSlot,
) -> NumeraResult<String> {
    let rendered = match value {
        FieldValue::Integer(i) => match path.width() {
            Some(width) => Some(format_number(*i, width)),
            None => Some(i.to_string()),
        },
        FieldValue::Record(snapshot) => Some(snapshot.id.clone().unwrap_or_default()),
        FieldValue::Reference(reference) => Some(reference.id.clone()),
        other => other.to_canonical_string(),
    };

    rendered.ok_or_else(|| {
        TemplateError::TypeNotAuthorized {
            field: path.dotted(),
            category: descriptor.category,
            slot,
        }
        .into()
    })
}
