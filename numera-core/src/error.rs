//! Error types for numera operations

use crate::{FieldCategory, SequenceId, TemplateSlot};
use thiserror::Error;

/// Template grammar and schema errors. Never retried: the author must fix the template.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Invalid syntax in template '{template}' at {position}: {message}")]
    Syntax {
        template: String,
        position: usize,
        message: String,
    },

    #[error("No field {field} detected in model {entity}")]
    FieldNotFound { field: String, entity: String },

    #[error("Field {field} of type {category} is not authorized in a {slot} template")]
    TypeNotAuthorized {
        field: String,
        category: FieldCategory,
        slot: TemplateSlot,
    },

    #[error("Unknown entity type: {entity}")]
    UnknownEntity { entity: String },
}

/// Errors raised while computing a code for a definition.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("No value found for {slot} of '{definition}', can't generate code")]
    IncompleteGenerationInput {
        definition: String,
        slot: TemplateSlot,
    },

    #[error("Sequence definition not found: {id}")]
    DefinitionNotFound { id: SequenceId },

    #[error("No sequence definition with code '{code}'")]
    CodeNotFound { code: String },

    #[error("Fallback chain loops back on itself: {chain:?}")]
    FallbackCycle { chain: Vec<SequenceId> },
}

/// Counter store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Sequence not found: {id}")]
    NotFound { id: SequenceId },

    #[error("Insert failed for sequence {id}: {reason}")]
    InsertFailed { id: SequenceId, reason: String },

    /// Another writer committed a counter under the same key first.
    #[error("Unique constraint violated for counter key {key}")]
    UniqueViolation { key: String },

    #[error("Could not provision counter {key} after {attempts} attempts")]
    ProvisioningConflict { key: String, attempts: u32 },

    #[error("Invalid counter state for {id}: {reason}")]
    InvalidState { id: SequenceId, reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Definition authoring errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Constraint violation on {constraint}: {reason}")]
    ConstraintViolation { constraint: String, reason: String },

    #[error("Circular reference detected in fallback chain: {ids:?}")]
    CircularReference { ids: Vec<SequenceId> },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Config parse error: {reason}")]
    Parse { reason: String },

    #[error("Telemetry initialization failed: {reason}")]
    Telemetry { reason: String },
}

/// Master error type for all numera errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NumeraError {
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for numera operations.
pub type NumeraResult<T> = Result<T, NumeraError>;

// =============================================================================
// TESTS
// =============================================================================
