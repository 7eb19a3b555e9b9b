//! Property tests over counter keys and date-range partitions.

use chrono::{Datelike, NaiveDate};
use numera_core::{SequenceDefinition, TenantId};
use numera_engine::{GenerationRequest, NumeraEngine};
use numera_storage::{CounterStore, InMemoryCounterStore, TenantScopedCounterKey};
use numera_test_utils::fixtures::*;
use numera_test_utils::generators::{arb_business_date, arb_counter_key};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// A provisioned counter is found again under its key, from any tenant.
    #[test]
    fn prop_provisioned_counter_is_found_by_key(key in arb_counter_key()) {
        let store = InMemoryCounterStore::new();
        let template = invoice_template();

        let counter = store.find_or_provision(&template, &key, 1).unwrap();
        prop_assert_eq!(counter.counter_key(), Some(key.clone()));

        let again = store.find_or_provision(&template, &key, 1).unwrap();
        prop_assert_eq!(again.sequence_id, counter.sequence_id);

        let scoped = TenantScopedCounterKey::global(key.clone());
        prop_assert_eq!(scoped.key(), &key);
        let from_tenant = store.counter_find(Some(TenantId::now_v7()), scoped.key()).unwrap();
        prop_assert_eq!(from_tenant.map(|c| c.sequence_id), Some(counter.sequence_id));
        prop_assert_eq!(store.counter_count().unwrap(), 1);
    }

    /// Date-ranged counters number each calendar year from 1.
    #[test]
    fn prop_date_ranged_counter_restarts_each_year(as_of in arb_business_date()) {
        let harness = harness();
        let engine = NumeraEngine::new(
            harness.store.clone(),
            harness.schemas.clone(),
            harness.records.clone(),
        );
        let id = engine
            .register_definition(
                SequenceDefinition::template("Yearly", INVOICE)
                    .with_prefix_template("%(**DR-)")
                    .with_padding(4)
                    .with_date_ranges(Vec::new()),
            )
            .unwrap();

        let next_year = NaiveDate::from_ymd_opt(as_of.year() + 1, as_of.month(), as_of.day())
            .unwrap();
        let draw = |date| engine.generate_next(&GenerationRequest::new(id).as_of(date)).unwrap();

        prop_assert_eq!(draw(as_of), "DR-0001");
        prop_assert_eq!(draw(as_of), "DR-0002");
        prop_assert_eq!(draw(next_year), "DR-0001");

        let counter = engine.children_of(id).unwrap().remove(0);
        prop_assert_eq!(counter.date_ranges.len(), 2);
        prop_assert!(counter.date_ranges[0].contains(as_of));
        prop_assert_eq!(
            counter.date_ranges[0].date_from,
            NaiveDate::from_ymd_opt(as_of.year(), 1, 1).unwrap()
        );
    }
}
