use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use accord_core::{Record, RecordId};
use anyhow::anyhow;

use crate::traits::{ConflictingRecord, PutOutcome, RecordStore};

/// In-memory store for tests and single-process networks. Not durable.
#[derive(Default)]
pub struct InMemoryRecordStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    order: Vec<RecordId>,
    records: HashMap<RecordId, Record>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> anyhow::Result<MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|_| anyhow!("record store lock poisoned"))
    }
}

impl RecordStore for InMemoryRecordStore {
    fn query(&self) -> anyhow::Result<Vec<Record>> {
        let inner = self.lock()?;
        Ok(inner
            .order
            .iter()
            .filter_map(|id| inner.records.get(id).cloned())
            .collect())
    }

    fn get(&self, id: &RecordId) -> anyhow::Result<Option<Record>> {
        Ok(self.lock()?.records.get(id).cloned())
    }

    fn put(&self, record: &Record) -> anyhow::Result<PutOutcome> {
        let mut inner = self.lock()?;
        if let Some(existing) = inner.records.get(&record.id) {
            if existing == record {
                return Ok(PutOutcome::AlreadyPresent);
            }
            return Err(ConflictingRecord { id: record.id.clone() }.into());
        }
        inner.order.push(record.id.clone());
        inner.records.insert(record.id.clone(), record.clone());
        Ok(PutOutcome::Inserted)
    }

    fn remove(&self, id: &RecordId) -> anyhow::Result<bool> {
        let mut inner = self.lock()?;
        if inner.records.remove(id).is_none() {
            return Ok(false);
        }
        inner.order.retain(|o| o != id);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accord_core::{Party, PartyKey, PartyName, RecordFields};

    fn record() -> Record {
        Record::new(
            RecordFields {
                challenge_name: "Boston Marathon".to_string(),
                challenge_year: 2023,
                place_city: 5,
                place_gender: 2,
                bib_number: 1002,
                first_name: "Ana".to_string(),
                last_name: "Diaz".to_string(),
                time: 9350.5,
                gender: "F".to_string(),
            },
            Party::new(PartyName::new("O=A"), PartyKey("aa".to_string())),
            Party::new(PartyName::new("O=B"), PartyKey("bb".to_string())),
        )
    }

    #[test]
    fn test_new_store_is_empty() {
        let store = InMemoryRecordStore::new();
        assert!(store.query().unwrap().is_empty());
    }

    #[test]
    fn test_put_and_get() {
        let store = InMemoryRecordStore::new();
        let r = record();
        assert_eq!(store.put(&r).unwrap(), PutOutcome::Inserted);
        assert_eq!(store.get(&r.id).unwrap(), Some(r.clone()));
        assert_eq!(store.get(&RecordId::new()).unwrap(), None);
    }

    #[test]
    fn test_put_twice_is_idempotent() {
        let store = InMemoryRecordStore::new();
        let r = record();
        store.put(&r).unwrap();
        let once = store.query().unwrap();
        assert_eq!(store.put(&r).unwrap(), PutOutcome::AlreadyPresent);
        assert_eq!(store.query().unwrap(), once);
    }

    #[test]
    fn test_conflicting_put_rejected() {
        let store = InMemoryRecordStore::new();
        let r = record();
        store.put(&r).unwrap();
        let mut other = r.clone();
        other.fields.bib_number = 1;
        let err = store.put(&other).unwrap_err();
        assert!(err.downcast_ref::<ConflictingRecord>().is_some());
        assert_eq!(store.get(&r.id).unwrap(), Some(r));
    }

    #[test]
    fn test_query_keeps_insertion_order() {
        let store = InMemoryRecordStore::new();
        let a = record();
        let b = record();
        store.put(&a).unwrap();
        store.put(&b).unwrap();
        let ids: Vec<_> = store.query().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);
    }

    #[test]
    fn test_remove_withdraws_record() {
        let store = InMemoryRecordStore::new();
        let a = record();
        let b = record();
        store.put(&a).unwrap();
        store.put(&b).unwrap();
        assert!(store.remove(&a.id).unwrap());
        assert!(!store.remove(&a.id).unwrap());
        assert_eq!(store.get(&a.id).unwrap(), None);
        assert_eq!(store.query().unwrap(), vec![b]);
    }
}
