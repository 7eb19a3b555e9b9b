//! Numera Storage - Counter Store Trait and In-Memory Implementation
//!
//! Defines the persistence abstraction for sequence definitions and their
//! provisioned counters, plus in-memory collaborators (schema registry,
//! record lookup) for tests and embedded use.

pub mod memory;
pub mod registry;
pub mod scoped_key;

pub use memory::InMemoryCounterStore;
pub use registry::{InMemoryRecords, InMemorySchemaRegistry};
pub use scoped_key::TenantScopedCounterKey;

use numera_core::{
    format_number, BusinessDate, CounterKey, NumeraError, NumeraResult, SequenceDefinition,
    SequenceId, StorageError, TenantId,
};

// ============================================================================
// COUNTER STORE TRAIT
// ============================================================================

/// Persistence for sequence definitions and counter state.
///
/// Implementations must make [`CounterStore::next_value`] atomic per counter
/// and must reject a second provisioned counter with the same tenant scope
/// and [`CounterKey`] with [`StorageError::UniqueViolation`].
pub trait CounterStore: Send + Sync {
    // === Definition Operations ===

    /// Insert a template or counter definition.
    fn definition_insert(&self, definition: &SequenceDefinition) -> NumeraResult<()>;

    /// Get a definition by ID.
    fn definition_get(&self, id: SequenceId) -> NumeraResult<Option<SequenceDefinition>>;

    /// All definitions carrying `code`, any kind, any tenant.
    fn definition_find_by_code(&self, code: &str) -> NumeraResult<Vec<SequenceDefinition>>;

    /// Counters provisioned from the template `parent_id`.
    fn definition_list_children(&self, parent_id: SequenceId)
        -> NumeraResult<Vec<SequenceDefinition>>;

    // === Counter Operations ===

    /// Find the provisioned counter for `key`, preferring one owned by
    /// `tenant_id` over a global one.
    fn counter_find(
        &self,
        tenant_id: Option<TenantId>,
        key: &CounterKey,
    ) -> NumeraResult<Option<SequenceDefinition>>;

    /// Atomically take the counter's next value for `as_of` and advance it
    /// by its increment. Returns the value before the increment.
    fn next_value(&self, id: SequenceId, as_of: BusinessDate) -> NumeraResult<i64>;

    // === Provided Operations ===

    /// Return the counter for `key` under `template`, creating it if absent.
    ///
    /// A concurrent creator winning the insert surfaces as
    /// `UniqueViolation`; the lookup is then retried, up to `retry_limit`
    /// attempts in total.
    fn find_or_provision(
        &self,
        template: &SequenceDefinition,
        key: &CounterKey,
        retry_limit: u32,
    ) -> NumeraResult<SequenceDefinition> {
        let attempts = retry_limit.max(1);

        for attempt in 1..=attempts {
            if let Some(counter) = self.counter_find(template.tenant_id, key)? {
                tracing::debug!(
                    template = %template.sequence_id,
                    counter = %counter.sequence_id,
                    key = %key,
                    "counter found"
                );
                return Ok(counter);
            }

            let counter = template.spawn_counter(key);
            match self.definition_insert(&counter) {
                Ok(()) => {
                    tracing::info!(
                        template = %template.sequence_id,
                        counter = %counter.sequence_id,
                        key = %key,
                        "counter provisioned"
                    );
                    return Ok(counter);
                }
                Err(NumeraError::Storage(StorageError::UniqueViolation { .. })) => {
                    tracing::warn!(
                        template = %template.sequence_id,
                        key = %key,
                        attempt,
                        "lost counter provisioning race, retrying lookup"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Err(StorageError::ProvisioningConflict {
            key: key.to_string(),
            attempts,
        }
        .into())
    }

    /// Take the counter's next value rendered with its padding.
    fn next(&self, counter: &SequenceDefinition, as_of: BusinessDate) -> NumeraResult<String> {
        let value = self.next_value(counter.sequence_id, as_of)?;
        Ok(format_number(value, counter.numbering.padding))
    }
}
