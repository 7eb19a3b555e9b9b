//! Numera Engine - Dynamic Code Generation
//!
//! Turns a sequence definition plus a record snapshot into the next code:
//! templates render their prefix and generator key from record fields, the
//! rendered key selects (or lazily provisions) a counter, and the counter's
//! next value is composed with the rendered parts.
//!
//! ```no_run
//! use numera_core::{EntitySchema, FieldCategory, FieldDescriptor, RecordSnapshot, SequenceDefinition};
//! use numera_engine::{GenerationRequest, NumeraEngine};
//! use numera_storage::{InMemoryCounterStore, InMemoryRecords, InMemorySchemaRegistry};
//! use std::sync::Arc;
//!
//! # fn main() -> numera_core::NumeraResult<()> {
//! let schemas = InMemorySchemaRegistry::new().with_schema(
//!     EntitySchema::new("invoice", "Customer Invoice")
//!         .with_field(FieldDescriptor::new("year", FieldCategory::Integer)),
//! )?;
//! let engine = NumeraEngine::new(
//!     Arc::new(InMemoryCounterStore::new()),
//!     Arc::new(schemas),
//!     Arc::new(InMemoryRecords::new()),
//! );
//!
//! let id = engine.register_definition(
//!     SequenceDefinition::template("Invoices", "invoice")
//!         .with_prefix_template("%(**INV-,year)")
//!         .with_padding(4),
//! )?;
//! let request = GenerationRequest::new(id).with_record(RecordSnapshot::new().with("year", 2024));
//! assert_eq!(engine.generate_next(&request)?, "INV-20240001");
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod request;
pub mod telemetry;

pub use engine::NumeraEngine;
pub use request::{CodeRequest, GenerationRequest};
pub use telemetry::{init_tracing, LogFormat, TelemetryConfig};
