use accord_core::{Record, RecordId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PutOutcome {
    Inserted,
    /// An identical record with the same id was already stored; nothing changed.
    AlreadyPresent,
}

#[derive(Debug, thiserror::Error)]
#[error("record {id} already stored with different content")]
pub struct ConflictingRecord {
    pub id: RecordId,
}

/// Finalized records visible to one party. Records are written once per id and never mutated.
pub trait RecordStore: Send + Sync {
    /// Every stored record, in insertion order.
    fn query(&self) -> anyhow::Result<Vec<Record>>;

    fn get(&self, id: &RecordId) -> anyhow::Result<Option<Record>>;

    /// Idempotent on `record.id`. A different record under an existing id fails with
    /// [`ConflictingRecord`].
    fn put(&self, record: &Record) -> anyhow::Result<PutOutcome>;

    /// Withdraws a record whose transaction failed to commit. Returns whether it was present.
    fn remove(&self, id: &RecordId) -> anyhow::Result<bool>;
}
