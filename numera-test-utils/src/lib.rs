//! Numera Test Utilities
//!
//! Shared test infrastructure for the numera workspace:
//! - Proptest generators for templates, keys and dates
//! - Fixtures: an invoice/partner/country schema set, sample records and
//!   definitions, a pre-seeded harness of in-memory collaborators
//! - Assertions on numera error variants

pub use numera_storage::{InMemoryCounterStore, InMemoryRecords, InMemorySchemaRegistry};

pub use numera_core::{
    BusinessDate, CounterKey, DateRange, EntitySchema, FieldCategory, FieldDescriptor,
    GenerationError, NumeraError, NumeraResult, RecordRef, RecordSnapshot, SequenceDefinition,
    StorageError, TemplateError, ValidationError,
};

use chrono::NaiveDate;
use std::sync::Arc;

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for template strings and counter inputs.

    use super::*;
    use proptest::prelude::*;

    /// Field or relation name.
    pub fn arb_identifier() -> impl Strategy<Value = String> {
        "[a-z_][a-z0-9_]{0,10}"
    }

    /// Dotted field path, one to three segments.
    pub fn arb_field_path() -> impl Strategy<Value = String> {
        prop::collection::vec(arb_identifier(), 1..4).prop_map(|segments| segments.join("."))
    }

    /// `**`-marked literal free of grammar characters.
    pub fn arb_static_token() -> impl Strategy<Value = String> {
        "[A-Za-z0-9 _/#.:-]{0,8}".prop_map(|s| format!("**{}", s))
    }

    /// Field token with optional padding, digits possibly zero-led.
    pub fn arb_field_token() -> impl Strategy<Value = String> {
        (arb_field_path(), prop::option::of("[0-9]{1,3}")).prop_map(|(path, padding)| {
            match padding {
                Some(digits) => format!("{}[{}]", path, digits),
                None => path,
            }
        })
    }

    /// Any well-formed token.
    pub fn arb_template_token() -> impl Strategy<Value = String> {
        prop_oneof![arb_static_token(), arb_field_token()]
    }

    /// Well-formed template string.
    pub fn arb_template() -> impl Strategy<Value = String> {
        prop::collection::vec(arb_template_token(), 1..6)
            .prop_map(|tokens| format!("%({})", tokens.join(",")))
    }

    /// Template over the fields of [`fixtures::invoice_schema`] only.
    pub fn arb_invoice_template() -> impl Strategy<Value = String> {
        let token = prop_oneof![
            arb_static_token(),
            Just("year".to_string()),
            Just("year[4]".to_string()),
            Just("journal".to_string()),
            Just("reference".to_string()),
            Just("partner.code".to_string()),
            Just("partner.country.code".to_string()),
        ];
        prop::collection::vec(token, 1..5).prop_map(|tokens| format!("%({})", tokens.join(",")))
    }

    /// Rendered counter key.
    pub fn arb_counter_key() -> impl Strategy<Value = CounterKey> {
        (
            "[A-Z]{0,4}-?[0-9]{0,4}",
            prop::option::of("[A-Z]{2}"),
            prop::option::of("[A-Z]{3}"),
        )
            .prop_map(|(prefix, generator_key, code)| {
                CounterKey::new(prefix)
                    .with_generator_key(generator_key)
                    .with_code(code)
            })
    }

    /// Business date between 2000 and 2099.
    pub fn arb_business_date() -> impl Strategy<Value = BusinessDate> {
        (2000i32..2100, 1u32..=12, 1u32..=28)
            .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default())
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built schemas, records and definitions.

    use super::*;

    pub const INVOICE: &str = "invoice";
    pub const PARTNER: &str = "partner";
    pub const COUNTRY: &str = "country";

    /// Invoice schema: scalars of every category plus relations.
    pub fn invoice_schema() -> EntitySchema {
        EntitySchema::new(INVOICE, "Customer Invoice")
            .with_field(FieldDescriptor::new("year", FieldCategory::Integer).with_label("Year"))
            .with_field(FieldDescriptor::new("journal", FieldCategory::Text).with_label("Journal"))
            .with_field(FieldDescriptor::new("reference", FieldCategory::Text))
            .with_field(FieldDescriptor::new("amount", FieldCategory::Decimal))
            .with_field(FieldDescriptor::new("posted", FieldCategory::Boolean))
            .with_field(FieldDescriptor::new("date", FieldCategory::Date))
            .with_field(FieldDescriptor::relation("partner", PARTNER).with_label("Customer"))
            .with_field(FieldDescriptor::multi_relation("lines", "invoice.line"))
    }

    pub fn partner_schema() -> EntitySchema {
        EntitySchema::new(PARTNER, "Contact")
            .with_field(FieldDescriptor::new("name", FieldCategory::Text))
            .with_field(FieldDescriptor::new("code", FieldCategory::Text))
            .with_field(FieldDescriptor::relation("country", COUNTRY))
    }

    pub fn country_schema() -> EntitySchema {
        EntitySchema::new(COUNTRY, "Country")
            .with_field(FieldDescriptor::new("code", FieldCategory::Text))
            .with_field(FieldDescriptor::new("name", FieldCategory::Text))
    }

    /// `YYYY-MM-DD` date; panics on an invalid date.
    pub fn date(y: i32, m: u32, d: u32) -> BusinessDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid fixture date")
    }

    /// Invoice snapshot with only `year` set.
    pub fn invoice_record(year: i64) -> RecordSnapshot {
        RecordSnapshot::new().with("year", year)
    }

    /// Reference to the stored partner `p-acme` (country `fr`).
    pub fn acme_ref() -> RecordRef {
        RecordRef::new(PARTNER, "p-acme")
    }

    /// Template numbering invoices as `INV-<year><4-digit number>`.
    pub fn invoice_template() -> SequenceDefinition {
        SequenceDefinition::template("Customer Invoices", INVOICE)
            .with_prefix_template("%(**INV-,year)")
            .with_padding(4)
    }

    /// Plain counter padded to four digits.
    pub fn plain_counter(name: &str) -> SequenceDefinition {
        SequenceDefinition::counter(name).with_padding(4)
    }

    /// In-memory collaborators seeded with the fixture schemas and records.
    pub struct Harness {
        pub store: Arc<InMemoryCounterStore>,
        pub schemas: Arc<InMemorySchemaRegistry>,
        pub records: Arc<InMemoryRecords>,
    }

    /// Build a [`Harness`]. Stored records: partner `p-acme` (code `ACME`,
    /// country ref `fr`), partner `p-nowhere` (no country), country `fr`.
    pub fn harness() -> Harness {
        let schemas = InMemorySchemaRegistry::new();
        for schema in [invoice_schema(), partner_schema(), country_schema()] {
            schemas.register(schema).expect("register fixture schema");
        }

        let records = InMemoryRecords::new();
        records
            .insert(
                COUNTRY,
                RecordSnapshot::new()
                    .with_id("fr")
                    .with("code", "FR")
                    .with("name", "France"),
            )
            .expect("insert country");
        records
            .insert(
                PARTNER,
                RecordSnapshot::new()
                    .with_id("p-acme")
                    .with("name", "Acme")
                    .with("code", "ACME")
                    .with("country", RecordRef::new(COUNTRY, "fr")),
            )
            .expect("insert partner");
        records
            .insert(
                PARTNER,
                RecordSnapshot::new()
                    .with_id("p-nowhere")
                    .with("name", "Nowhere Ltd")
                    .with("code", "NOW"),
            )
            .expect("insert partner");

        Harness {
            store: Arc::new(InMemoryCounterStore::new()),
            schemas: Arc::new(schemas),
            records: Arc::new(records),
        }
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions on numera error variants.

    use super::*;

    /// Assert that a result is Ok.
    #[track_caller]
    pub fn assert_ok<T: std::fmt::Debug>(result: &NumeraResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result);
    }

    /// Assert that a result is a template error.
    #[track_caller]
    pub fn assert_template_error<T: std::fmt::Debug>(result: &NumeraResult<T>) {
        match result {
            Err(NumeraError::Template(_)) => {}
            other => panic!("Expected Template error, got: {:?}", other),
        }
    }

    /// Assert that a result is a syntax error.
    #[track_caller]
    pub fn assert_syntax_error<T: std::fmt::Debug>(result: &NumeraResult<T>) {
        match result {
            Err(NumeraError::Template(TemplateError::Syntax { .. })) => {}
            other => panic!("Expected Syntax error, got: {:?}", other),
        }
    }

    /// Assert that a result is `FieldNotFound` for `field`.
    #[track_caller]
    pub fn assert_field_not_found<T: std::fmt::Debug>(result: &NumeraResult<T>, field: &str) {
        match result {
            Err(NumeraError::Template(TemplateError::FieldNotFound { field: f, .. })) => {
                assert_eq!(f, field, "Wrong field in FieldNotFound error");
            }
            other => panic!("Expected FieldNotFound for {}, got: {:?}", field, other),
        }
    }

    /// Assert that a result is `TypeNotAuthorized`.
    #[track_caller]
    pub fn assert_type_not_authorized<T: std::fmt::Debug>(result: &NumeraResult<T>) {
        match result {
            Err(NumeraError::Template(TemplateError::TypeNotAuthorized { .. })) => {}
            other => panic!("Expected TypeNotAuthorized error, got: {:?}", other),
        }
    }

    /// Assert that a result is `IncompleteGenerationInput`.
    #[track_caller]
    pub fn assert_incomplete_input<T: std::fmt::Debug>(result: &NumeraResult<T>) {
        match result {
            Err(NumeraError::Generation(GenerationError::IncompleteGenerationInput { .. })) => {}
            other => panic!("Expected IncompleteGenerationInput error, got: {:?}", other),
        }
    }

    /// Assert that a result is a validation error.
    #[track_caller]
    pub fn assert_validation_error<T: std::fmt::Debug>(result: &NumeraResult<T>) {
        match result {
            Err(NumeraError::Validation(_)) => {}
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }
}
