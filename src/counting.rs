//! The count accumulator: per-patient and total event tallies with a merge
//! helper, so per-download counts can be combined in any completion order.

use crate::row::Row;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mergeable running counts: patient -> event_type -> count, plus
/// event_type -> total across all patients.
///
/// `merge` makes this a commutative monoid with the empty value as identity,
/// which is what lets downloads be processed concurrently and merged in
/// whatever order they finish. BTreeMap keys keep the serialized output
/// byte-stable across runs on the same input.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCounts {
    pub patients: BTreeMap<String, BTreeMap<String, u64>>,
    pub totals: BTreeMap<String, u64>,
}

impl EventCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one validated row: bumps the (patient, event_type) count and
    /// the event_type total by 1.
    pub fn update(&mut self, row: &Row) {
        *self
            .patients
            .entry(row.patient_id.clone())
            .or_default()
            .entry(row.event_type.clone())
            .or_insert(0) += 1;
        *self.totals.entry(row.event_type.clone()).or_insert(0) += 1;
    }

    /// Elementwise sum of `other` into `self`.
    pub fn merge(&mut self, other: EventCounts) {
        for (patient, by_type) in other.patients {
            let slot = self.patients.entry(patient).or_default();
            for (event_type, n) in by_type {
                *slot.entry(event_type).or_insert(0) += n;
            }
        }
        for (event_type, n) in other.totals {
            *self.totals.entry(event_type).or_insert(0) += n;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.patients.is_empty() && self.totals.is_empty()
    }

    /// Total number of events across all event types.
    pub fn total_events(&self) -> u64 {
        self.totals.values().sum()
    }
}
