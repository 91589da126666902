use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use accord_core::{Record, RecordId};
use accord_storage::{ConflictingRecord, PutOutcome, RecordStore};
use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

/// Durable record store. Each row keeps the record's JSON body; the party
/// columns exist for ad-hoc inspection only.
pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
}

impl SqliteRecordStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        let conn = Connection::open(db_path).with_context(|| format!("open sqlite db {}", db_path.display()))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory().context("open in-memory sqlite db")?)
    }

    fn init(conn: Connection) -> Result<Self> {
        let init_sql = include_str!("../migrations/0001_init.sql");
        conn.execute_batch(init_sql).context("apply migrations")?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| anyhow!("sqlite connection lock poisoned"))
    }

    fn decode(body: &str) -> Result<Record> {
        serde_json::from_str(body).context("decode stored record")
    }
}

impl RecordStore for SqliteRecordStore {
    fn query(&self) -> Result<Vec<Record>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT body_json FROM records ORDER BY seq")?;
        let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;
        let mut out = vec![];
        for row in rows {
            out.push(Self::decode(&row?)?);
        }
        Ok(out)
    }

    fn get(&self, id: &RecordId) -> Result<Option<Record>> {
        let conn = self.lock()?;
        let body: Option<String> = conn
            .query_row("SELECT body_json FROM records WHERE id=?1", params![id.as_str()], |r| r.get(0))
            .optional()?;
        body.map(|b| Self::decode(&b)).transpose()
    }

    fn put(&self, record: &Record) -> Result<PutOutcome> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        let existing: Option<String> = tx
            .query_row("SELECT body_json FROM records WHERE id=?1", params![record.id.as_str()], |r| {
                r.get(0)
            })
            .optional()?;
        if let Some(body) = existing {
            tx.commit()?;
            if &Self::decode(&body)? == record {
                return Ok(PutOutcome::AlreadyPresent);
            }
            return Err(ConflictingRecord { id: record.id.clone() }.into());
        }

        let body = serde_json::to_string(record).context("encode record")?;
        tx.execute(
            "INSERT INTO records(id, lender, borrower, body_json, stored_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.id.as_str(),
                record.lender.name.as_str(),
                record.borrower.name.as_str(),
                body,
                now_unix()
            ],
        )?;
        tx.commit()?;
        Ok(PutOutcome::Inserted)
    }

    fn remove(&self, id: &RecordId) -> Result<bool> {
        let conn = self.lock()?;
        let n = conn.execute("DELETE FROM records WHERE id=?1", params![id.as_str()])?;
        Ok(n > 0)
    }
}

pub fn now_unix() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use accord_core::{Party, PartyKey, PartyName, RecordFields};
    use tempfile::tempdir;

    fn record() -> Record {
        Record::new(
            RecordFields {
                challenge_name: "Boston Marathon".into(),
                challenge_year: 2023,
                place_city: 5,
                place_gender: 2,
                bib_number: 1002,
                first_name: "Ana".into(),
                last_name: "Diaz".into(),
                time: 9350.5,
                gender: "F".into(),
            },
            Party::new(PartyName::new("O=PartyA"), PartyKey("aa".into())),
            Party::new(PartyName::new("O=PartyB"), PartyKey("bb".into())),
        )
    }

    #[test]
    fn sqlite_open_and_migrate() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("records.db");
        let _ = SqliteRecordStore::open(&db_path).unwrap();
        // reopening applies the migration again without error
        let store = SqliteRecordStore::open(&db_path).unwrap();
        assert!(store.query().unwrap().is_empty());
    }

    #[test]
    fn put_survives_reopen() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("records.db");
        let r = record();
        {
            let store = SqliteRecordStore::open(&db_path).unwrap();
            assert_eq!(store.put(&r).unwrap(), PutOutcome::Inserted);
        }
        let store = SqliteRecordStore::open(&db_path).unwrap();
        assert_eq!(store.query().unwrap(), vec![r.clone()]);
        assert_eq!(store.get(&r.id).unwrap(), Some(r));
    }

    #[test]
    fn duplicate_put_is_a_no_op() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        let r = record();
        store.put(&r).unwrap();
        assert_eq!(store.put(&r).unwrap(), PutOutcome::AlreadyPresent);
        assert_eq!(store.query().unwrap().len(), 1);
    }

    #[test]
    fn conflicting_put_is_refused() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        let r = record();
        store.put(&r).unwrap();
        let mut changed = r.clone();
        changed.fields.time = 1.0;
        assert!(store.put(&changed).unwrap_err().downcast_ref::<ConflictingRecord>().is_some());
        assert_eq!(store.query().unwrap(), vec![r]);
    }

    #[test]
    fn remove_deletes_row() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        let r = record();
        store.put(&r).unwrap();
        assert!(store.remove(&r.id).unwrap());
        assert!(!store.remove(&r.id).unwrap());
        assert!(store.query().unwrap().is_empty());
        // the id can be recorded again once withdrawn
        assert_eq!(store.put(&r).unwrap(), PutOutcome::Inserted);
    }
}
