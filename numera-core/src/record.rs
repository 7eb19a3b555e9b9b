//! Record value snapshots
//!
//! A snapshot is the field-name → value mapping of one business record, as
//! supplied by the caller for a single generation request. Relation fields hold
//! either a nested snapshot or a [`RecordRef`] handle that a [`RecordResolver`]
//! turns into one.

use crate::{BusinessDate, NumeraResult, ValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lookup handle for a record stored elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordRef {
    pub entity: String,
    pub id: String,
}

impl RecordRef {
    pub fn new(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

/// Runtime value of one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Null,
    Text(String),
    Integer(i64),
    Decimal(f64),
    Boolean(bool),
    Date(BusinessDate),
    /// Related record carried inline
    Record(Box<RecordSnapshot>),
    /// Related record to be resolved through a [`RecordResolver`]
    Reference(RecordRef),
    /// Multi-valued relation
    Many(Vec<FieldValue>),
}

impl FieldValue {
    /// Null and empty text carry no usable value.
    pub fn is_absent(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Canonical string form of a scalar; `None` for relations.
    pub fn to_canonical_string(&self) -> Option<String> {
        match self {
            FieldValue::Null => Some(String::new()),
            FieldValue::Text(s) => Some(s.clone()),
            FieldValue::Integer(i) => Some(i.to_string()),
            FieldValue::Decimal(d) => Some(d.to_string()),
            FieldValue::Boolean(b) => Some(b.to_string()),
            FieldValue::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
            FieldValue::Record(_) | FieldValue::Reference(_) | FieldValue::Many(_) => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Integer(i64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Decimal(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(value: NaiveDate) -> Self {
        FieldValue::Date(value)
    }
}

impl From<RecordSnapshot> for FieldValue {
    fn from(value: RecordSnapshot) -> Self {
        FieldValue::Record(Box::new(value))
    }
}

impl From<RecordRef> for FieldValue {
    fn from(value: RecordRef) -> Self {
        FieldValue::Reference(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

/// Field values of one record instance.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecordSnapshot {
    /// Identifier of the record, when known
    pub id: Option<String>,
    pub values: BTreeMap<String, FieldValue>,
}

impl RecordSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.values.insert(field.into(), value.into());
        self
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.values.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Build a snapshot from a JSON object.
    ///
    /// Nested objects become nested snapshots (an `id` member doubles as the
    /// record id), arrays become multi-valued relations and
    /// `{"$ref": {"entity": .., "id": ..}}` becomes a lookup handle.
    pub fn from_json(value: &serde_json::Value) -> NumeraResult<Self> {
        let object = value.as_object().ok_or_else(|| ValidationError::InvalidValue {
            field: "record".to_string(),
            reason: "record snapshot must be a JSON object".to_string(),
        })?;

        let mut snapshot = RecordSnapshot::new();
        for (name, raw) in object {
            if name == "id" {
                snapshot.id = match raw {
                    serde_json::Value::String(s) => Some(s.clone()),
                    serde_json::Value::Number(n) => Some(n.to_string()),
                    _ => None,
                };
            }
            snapshot.set(name.clone(), json_to_value(raw)?);
        }
        Ok(snapshot)
    }
}

fn json_to_value(raw: &serde_json::Value) -> NumeraResult<FieldValue> {
    use serde_json::Value;

    Ok(match raw {
        Value::Null => FieldValue::Null,
        Value::Bool(b) => FieldValue::Boolean(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => FieldValue::Integer(i),
            None => FieldValue::Decimal(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => FieldValue::Text(s.clone()),
        Value::Array(items) => FieldValue::Many(
            items
                .iter()
                .map(json_to_value)
                .collect::<NumeraResult<Vec<_>>>()?,
        ),
        Value::Object(map) => match map.get("$ref") {
            Some(reference) => {
                let reference: RecordRef = serde_json::from_value(reference.clone())
                    .map_err(|e| ValidationError::InvalidValue {
                        field: "$ref".to_string(),
                        reason: e.to_string(),
                    })?;
                FieldValue::Reference(reference)
            }
            None => FieldValue::Record(Box::new(RecordSnapshot::from_json(raw)?)),
        },
    })
}

/// Resolves record handles into snapshots (one relation hop).
pub trait RecordResolver: Send + Sync {
    /// Fetch the referenced record, `None` when it does not exist.
    fn resolve(&self, reference: &RecordRef) -> NumeraResult<Option<RecordSnapshot>>;
}
