//! Numera Core - Entity Types
//!
//! Data structures shared by every numera crate: identifiers, schema
//! descriptors, record snapshots, sequence definitions, errors and
//! configuration. Collaborator interfaces (schema service, record lookup)
//! are declared here so the template layer and the store can both depend on
//! them without depending on each other.

pub mod config;
pub mod enums;
pub mod error;
pub mod identity;
pub mod record;
pub mod schema;
pub mod sequence;

pub use config::{ComponentOrder, CompositionConfig, NumeraConfig};
pub use enums::{EnumParseError, FieldCategory, FieldPolicy, SequenceKind, TemplateSlot};
pub use error::{
    ConfigError, GenerationError, NumeraError, NumeraResult, StorageError, TemplateError,
    ValidationError,
};
pub use identity::{today, BusinessDate, SequenceId, TenantId, Timestamp};
pub use record::{FieldValue, RecordRef, RecordResolver, RecordSnapshot};
pub use schema::{EntitySchema, FieldDescriptor, SchemaProvider};
pub use sequence::{format_number, CounterKey, DateRange, NumberingConfig, SequenceDefinition};
