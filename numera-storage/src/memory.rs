//! In-memory counter store.

use crate::scoped_key::TenantScopedCounterKey;
use crate::CounterStore;
use chrono::Utc;
use numera_core::{
    BusinessDate, CounterKey, DateRange, NumeraResult, SequenceDefinition, SequenceId,
    StorageError, TenantId,
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory [`CounterStore`].
///
/// Lock order is `counter_index` before `definitions` wherever both are held.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCounterStore {
    definitions: Arc<RwLock<HashMap<SequenceId, SequenceDefinition>>>,
    counter_index: Arc<RwLock<HashMap<TenantScopedCounterKey, SequenceId>>>,
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>, StorageError> {
    lock.read().map_err(|_| StorageError::LockPoisoned)
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>, StorageError> {
    lock.write().map_err(|_| StorageError::LockPoisoned)
}

impl InMemoryCounterStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove every definition and counter.
    pub fn clear(&self) -> NumeraResult<()> {
        let mut index = write(&self.counter_index)?;
        let mut definitions = write(&self.definitions)?;
        index.clear();
        definitions.clear();
        Ok(())
    }

    /// Number of stored definitions, templates and counters alike.
    pub fn definition_count(&self) -> NumeraResult<usize> {
        Ok(read(&self.definitions)?.len())
    }

    /// Number of provisioned counters.
    pub fn counter_count(&self) -> NumeraResult<usize> {
        Ok(read(&self.counter_index)?.len())
    }
}

impl CounterStore for InMemoryCounterStore {
    fn definition_insert(&self, definition: &SequenceDefinition) -> NumeraResult<()> {
        let mut index = write(&self.counter_index)?;
        let mut definitions = write(&self.definitions)?;

        if definitions.contains_key(&definition.sequence_id) {
            return Err(StorageError::InsertFailed {
                id: definition.sequence_id,
                reason: "already exists".to_string(),
            }
            .into());
        }

        if let Some(key) = definition.counter_key() {
            let scoped = TenantScopedCounterKey::new(definition.tenant_id, key);
            if index.contains_key(&scoped) {
                return Err(StorageError::UniqueViolation {
                    key: scoped.to_string(),
                }
                .into());
            }
            index.insert(scoped, definition.sequence_id);
        }

        definitions.insert(definition.sequence_id, definition.clone());
        Ok(())
    }

    fn definition_get(&self, id: SequenceId) -> NumeraResult<Option<SequenceDefinition>> {
        let definitions = read(&self.definitions)?;
        Ok(definitions.get(&id).cloned())
    }

    fn definition_find_by_code(&self, code: &str) -> NumeraResult<Vec<SequenceDefinition>> {
        let definitions = read(&self.definitions)?;
        let mut found: Vec<_> = definitions
            .values()
            .filter(|d| d.code.as_deref() == Some(code))
            .cloned()
            .collect();
        found.sort_by_key(|d| d.sequence_id);
        Ok(found)
    }

    fn definition_list_children(
        &self,
        parent_id: SequenceId,
    ) -> NumeraResult<Vec<SequenceDefinition>> {
        let definitions = read(&self.definitions)?;
        let mut children: Vec<_> = definitions
            .values()
            .filter(|d| d.parent_id == Some(parent_id))
            .cloned()
            .collect();
        children.sort_by_key(|d| d.sequence_id);
        Ok(children)
    }

    fn counter_find(
        &self,
        tenant_id: Option<TenantId>,
        key: &CounterKey,
    ) -> NumeraResult<Option<SequenceDefinition>> {
        let index = read(&self.counter_index)?;
        let definitions = read(&self.definitions)?;

        Ok(TenantScopedCounterKey::lookup_order(tenant_id, key)
            .iter()
            .find_map(|scoped| index.get(scoped))
            .and_then(|id| definitions.get(id))
            .cloned())
    }

    fn next_value(&self, id: SequenceId, as_of: BusinessDate) -> NumeraResult<i64> {
        let mut definitions = write(&self.definitions)?;
        let counter = definitions
            .get_mut(&id)
            .ok_or(StorageError::NotFound { id })?;

        if counter.is_template() {
            return Err(StorageError::InvalidState {
                id,
                reason: "templates carry no numbering state".to_string(),
            }
            .into());
        }

        let increment = counter.numbering.increment;
        let slot = if counter.numbering.use_date_range {
            let position = match counter.date_ranges.iter().position(|r| r.contains(as_of)) {
                Some(position) => position,
                None => {
                    let range = DateRange::year_partition(as_of, &counter.date_ranges);
                    tracing::info!(
                        counter = %id,
                        date_from = %range.date_from,
                        date_to = %range.date_to,
                        "date range created"
                    );
                    counter.date_ranges.push(range);
                    counter.date_ranges.len() - 1
                }
            };
            &mut counter.date_ranges[position].number_next
        } else {
            &mut counter.numbering.number_next
        };

        let value = *slot;
        *slot = value.checked_add(increment).ok_or_else(|| StorageError::InvalidState {
            id,
            reason: "counter overflow".to_string(),
        })?;
        counter.updated_at = Utc::now();

        tracing::debug!(counter = %id, value, %as_of, "counter advanced");
        Ok(value)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use numera_core::{NumeraError, SequenceDefinition};
    use std::sync::Barrier;
    use std::thread;

    fn date(y: i32, m: u32, d: u32) -> BusinessDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn make_template() -> SequenceDefinition {
        SequenceDefinition::template("Invoices", "invoice")
            .with_prefix_template("%(**INV-,year)")
            .with_padding(4)
    }

    #[test]
    fn test_definition_insert_get() {
        let store = InMemoryCounterStore::new();
        let template = make_template();
        store.definition_insert(&template).unwrap();

        let found = store.definition_get(template.sequence_id).unwrap();
        assert_eq!(found, Some(template));
        assert_eq!(store.definition_count().unwrap(), 1);
        assert_eq!(store.counter_count().unwrap(), 0);
    }

    #[test]
    fn test_definition_insert_duplicate() {
        let store = InMemoryCounterStore::new();
        let template = make_template();
        store.definition_insert(&template).unwrap();
        let err = store.definition_insert(&template).unwrap_err();
        assert!(matches!(err, NumeraError::Storage(StorageError::InsertFailed { .. })));
    }

    #[test]
    fn test_counter_key_uniqueness() {
        let store = InMemoryCounterStore::new();
        let template = make_template();
        let key = CounterKey::new("INV-2024");

        store.definition_insert(&template.spawn_counter(&key)).unwrap();
        let err = store
            .definition_insert(&template.spawn_counter(&key))
            .unwrap_err();
        assert!(matches!(err, NumeraError::Storage(StorageError::UniqueViolation { .. })));

        let other = CounterKey::new("INV-2024").with_code(Some("X".to_string()));
        store.definition_insert(&template.spawn_counter(&other)).unwrap();
        assert_eq!(store.counter_count().unwrap(), 2);
    }

    #[test]
    fn test_standalone_counters_are_not_indexed() {
        let store = InMemoryCounterStore::new();
        store
            .definition_insert(&SequenceDefinition::counter("A").with_prefix("X"))
            .unwrap();
        store
            .definition_insert(&SequenceDefinition::counter("B").with_prefix("X"))
            .unwrap();
        assert_eq!(store.counter_count().unwrap(), 0);
        assert!(store
            .counter_find(None, &CounterKey::new("X"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_counter_find_prefers_tenant_owned() {
        let store = InMemoryCounterStore::new();
        let tenant = TenantId::now_v7();
        let key = CounterKey::new("INV-2024");

        let global = make_template().spawn_counter(&key);
        store.definition_insert(&global).unwrap();

        let found = store.counter_find(Some(tenant), &key).unwrap().unwrap();
        assert_eq!(found.sequence_id, global.sequence_id);

        let owned = make_template().with_tenant(tenant).spawn_counter(&key);
        store.definition_insert(&owned).unwrap();

        let found = store.counter_find(Some(tenant), &key).unwrap().unwrap();
        assert_eq!(found.sequence_id, owned.sequence_id);

        let found = store.counter_find(None, &key).unwrap().unwrap();
        assert_eq!(found.sequence_id, global.sequence_id);

        let other_tenant = TenantId::now_v7();
        let found = store.counter_find(Some(other_tenant), &key).unwrap().unwrap();
        assert_eq!(found.sequence_id, global.sequence_id);
    }

    #[test]
    fn test_find_or_provision_creates_once() {
        let store = InMemoryCounterStore::new();
        let template = make_template();
        store.definition_insert(&template).unwrap();
        let key = CounterKey::new("INV-2024");

        let first = store.find_or_provision(&template, &key, 3).unwrap();
        let second = store.find_or_provision(&template, &key, 3).unwrap();
        assert_eq!(first.sequence_id, second.sequence_id);
        assert_eq!(first.parent_id, Some(template.sequence_id));
        assert_eq!(first.prefix.as_deref(), Some("INV-2024"));
        assert_eq!(first.numbering.padding, 4);

        let children = store.definition_list_children(template.sequence_id).unwrap();
        assert_eq!(children.len(), 1);
    }

    #[test]
    fn test_next_increments_and_pads() {
        let store = InMemoryCounterStore::new();
        let template = make_template().with_increment(5);
        let counter = store
            .find_or_provision(&template, &CounterKey::new("INV-"), 3)
            .unwrap();

        let today = date(2024, 5, 1);
        assert_eq!(store.next(&counter, today).unwrap(), "0001");
        assert_eq!(store.next(&counter, today).unwrap(), "0006");
        assert_eq!(store.next_value(counter.sequence_id, today).unwrap(), 11);
    }

    #[test]
    fn test_unknown_definition_is_absent() {
        let store = InMemoryCounterStore::new();
        assert!(store.definition_get(SequenceId::now_v7()).unwrap().is_none());
        assert!(store
            .definition_list_children(SequenceId::now_v7())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_next_value_on_template_is_invalid() {
        let store = InMemoryCounterStore::new();
        let template = make_template();
        store.definition_insert(&template).unwrap();
        let err = store
            .next_value(template.sequence_id, date(2024, 1, 1))
            .unwrap_err();
        assert!(matches!(err, NumeraError::Storage(StorageError::InvalidState { .. })));
    }

    #[test]
    fn test_next_value_unknown_counter() {
        let store = InMemoryCounterStore::new();
        let id = SequenceId::now_v7();
        let err = store.next_value(id, date(2024, 1, 1)).unwrap_err();
        assert_eq!(err, NumeraError::Storage(StorageError::NotFound { id }));
    }

    #[test]
    fn test_date_ranges_number_independently() {
        let store = InMemoryCounterStore::new();
        let template = make_template().with_date_ranges(vec![DateRange::new(
            date(2024, 1, 1),
            date(2024, 12, 31),
        )]);
        let counter = store
            .find_or_provision(&template, &CounterKey::new("INV-"), 3)
            .unwrap();

        assert_eq!(store.next(&counter, date(2024, 3, 1)).unwrap(), "0001");
        assert_eq!(store.next(&counter, date(2024, 4, 1)).unwrap(), "0002");
        assert_eq!(store.next(&counter, date(2025, 1, 2)).unwrap(), "0001");
        assert_eq!(store.next(&counter, date(2024, 5, 1)).unwrap(), "0003");

        let stored = store.definition_get(counter.sequence_id).unwrap().unwrap();
        assert_eq!(stored.date_ranges.len(), 2);
        assert_eq!(stored.date_ranges[1].date_from, date(2025, 1, 1));
        assert_eq!(stored.date_ranges[1].date_to, date(2025, 12, 31));
    }

    #[test]
    fn test_find_by_code() {
        let store = InMemoryCounterStore::new();
        let a = make_template().with_code("INV");
        let b = SequenceDefinition::counter("Fallback").with_code("INV");
        store.definition_insert(&a).unwrap();
        store.definition_insert(&b).unwrap();
        store.definition_insert(&make_template()).unwrap();

        let found = store.definition_find_by_code("INV").unwrap();
        assert_eq!(found.len(), 2);
        assert!(store.definition_find_by_code("NOPE").unwrap().is_empty());
    }

    #[test]
    fn test_clear() {
        let store = InMemoryCounterStore::new();
        let template = make_template();
        store.find_or_provision(&template, &CounterKey::new("A"), 1).unwrap();
        store.clear().unwrap();
        assert_eq!(store.definition_count().unwrap(), 0);
        assert_eq!(store.counter_count().unwrap(), 0);
    }

    #[test]
    fn test_concurrent_next_yields_distinct_values() {
        let store = InMemoryCounterStore::new();
        let counter = store
            .find_or_provision(&make_template(), &CounterKey::new("INV-"), 3)
            .unwrap();

        let threads = 8;
        let per_thread = 50;
        let barrier = Arc::new(Barrier::new(threads));
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let store = store.clone();
                let barrier = Arc::clone(&barrier);
                let id = counter.sequence_id;
                thread::spawn(move || {
                    barrier.wait();
                    (0..per_thread)
                        .map(|_| store.next_value(id, date(2024, 1, 1)).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut values: Vec<i64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        values.sort_unstable();
        let expected: Vec<i64> = (1..=(threads * per_thread) as i64).collect();
        assert_eq!(values, expected);
    }

    #[test]
    fn test_concurrent_provisioning_creates_one_counter() {
        let store = InMemoryCounterStore::new();
        let template = make_template();
        store.definition_insert(&template).unwrap();

        let threads = 8;
        let barrier = Arc::new(Barrier::new(threads));
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let store = store.clone();
                let template = template.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    store
                        .find_or_provision(&template, &CounterKey::new("INV-2024"), 3)
                        .unwrap()
                        .sequence_id
                })
            })
            .collect();

        let ids: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(ids.iter().all(|id| *id == ids[0]));
        assert_eq!(store.counter_count().unwrap(), 1);
    }
}

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================

#[cfg(test)]
mod prop_tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Successive values step by the increment from the starting value.
        #[test]
        fn prop_next_value_steps_by_increment(
            start in 0i64..1_000,
            increment in 1i64..50,
            draws in 1usize..20,
        ) {
            let store = InMemoryCounterStore::new();
            let counter = SequenceDefinition::counter("C")
                .with_number_next(start)
                .with_increment(increment);
            store.definition_insert(&counter).unwrap();
            let as_of = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

            for i in 0..draws {
                let value = store.next_value(counter.sequence_id, as_of).unwrap();
                prop_assert_eq!(value, start + increment * i as i64);
            }
        }

        /// A key provisions at most one counter no matter how often it is requested.
        #[test]
        fn prop_provisioning_is_idempotent(
            prefixes in prop::collection::vec("[A-Z]{1,3}", 1..10),
        ) {
            let store = InMemoryCounterStore::new();
            let template = SequenceDefinition::template("T", "invoice")
                .with_prefix_template("%(**X)");

            for prefix in &prefixes {
                store.find_or_provision(&template, &CounterKey::new(prefix.clone()), 1).unwrap();
            }

            let distinct: std::collections::HashSet<_> = prefixes.iter().collect();
            prop_assert_eq!(store.counter_count().unwrap(), distinct.len());
        }
    }
}
