//! Aggregate root traits for the state-stored domain records.

use crate::error::{DomainError, DomainResult};

/// Aggregate root marker + minimal interface.
///
/// Records are persisted as snapshots; the store tracks a revision per record
/// rather than the aggregate itself.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;
}

/// Optimistic concurrency expectation for a stored record.
///
/// Revision `0` means "not stored yet", so `Exact(0)` asserts absence.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip revision checking (wholesale restores, settings writes).
    Any,
    /// Require the record to be at an exact revision.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }

    pub fn check(self, actual: u64) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "optimistic concurrency check failed (expected: {self:?}, actual: {actual})"
            )))
        }
    }
}

/// Aggregate execution semantics (pure, deterministic).
///
/// - **Decision logic**: `handle(&self, cmd)` returns events.
/// - **State mutation**: `apply(&mut self, event)` evolves state.
///
/// Aggregates must not perform IO. The ledger poster loads a snapshot, runs
/// `handle` + `apply`, and writes the new snapshot back in one batch.
pub trait Aggregate: AggregateRoot {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    /// Evolve in-memory state from a single event.
    fn apply(&mut self, event: &Self::Event);

    /// Decide which events to emit given the current state and a command.
    ///
    /// This must not mutate state. State evolution is done through `apply`.
    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;

    /// Handle a command and immediately apply the resulting events.
    fn execute(&mut self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        let events = self.handle(command)?;
        for event in &events {
            self.apply(event);
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_zero_asserts_absence() {
        assert!(ExpectedVersion::Exact(0).matches(0));
        assert!(!ExpectedVersion::Exact(0).matches(1));
    }

    #[test]
    fn any_matches_every_revision() {
        for rev in [0, 1, 42] {
            assert!(ExpectedVersion::Any.matches(rev));
        }
    }

    #[test]
    fn check_reports_conflict() {
        let err = ExpectedVersion::Exact(2).check(3).unwrap_err();
        match err {
            DomainError::Conflict(msg) => assert!(msg.contains("actual: 3")),
            other => panic!("expected conflict, got {other:?}"),
        }
    }
}
