//! # Persistent Configuration Store
//!
//! Configurations live in a single redb table keyed by pid. Property maps are
//! stored as postcard bytes.
//!
//! redb gives us:
//! - ACID transactions, so a bulk update is all-or-nothing
//! - MVCC, so readers never block the single writer

use super::{ChangeFn, ConfigAdmin, ConfigError, ConfigResult, Properties, storage};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use std::path::Path;

const CONFIGURATIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("configurations");

fn apply_change(txn: &WriteTransaction, pid: &str, change: &mut ChangeFn<'_>) -> ConfigResult<()> {
    let mut table = txn.open_table(CONFIGURATIONS).map_err(storage)?;
    let mut properties: Properties = {
        let Some(bytes) = table.get(pid).map_err(storage)? else {
            return Err(ConfigError::NotFound(pid.to_string()));
        };
        postcard::from_bytes(bytes.value()).map_err(storage)?
    };
    change(&mut properties)?;
    let bytes = postcard::to_allocvec(&properties).map_err(storage)?;
    table.insert(pid, bytes.as_slice()).map_err(storage)?;
    Ok(())
}

/// A [`ConfigAdmin`] backed by a redb database file.
pub struct RedbConfigAdmin {
    db: Database,
}

impl std::fmt::Debug for RedbConfigAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbConfigAdmin").finish_non_exhaustive()
    }
}

impl RedbConfigAdmin {
    /// Open the store at `path`, creating it if needed.
    pub fn open(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let db = Database::create(path.as_ref()).map_err(storage)?;

        // Create the table up front so readers never see it missing.
        let txn = db.begin_write().map_err(storage)?;
        txn.open_table(CONFIGURATIONS).map_err(storage)?;
        txn.commit().map_err(storage)?;

        Ok(Self { db })
    }
}

impl ConfigAdmin for RedbConfigAdmin {
    fn list(&self) -> ConfigResult<Vec<String>> {
        let txn = self.db.begin_read().map_err(storage)?;
        let table = txn.open_table(CONFIGURATIONS).map_err(storage)?;
        let mut pids = Vec::new();
        for entry in table.iter().map_err(storage)? {
            let (key, _) = entry.map_err(storage)?;
            pids.push(key.value().to_string());
        }
        Ok(pids)
    }

    fn get(&self, pid: &str) -> ConfigResult<Option<Properties>> {
        let txn = self.db.begin_read().map_err(storage)?;
        let table = txn.open_table(CONFIGURATIONS).map_err(storage)?;
        let Some(bytes) = table.get(pid).map_err(storage)? else {
            return Ok(None);
        };
        let properties = postcard::from_bytes(bytes.value()).map_err(storage)?;
        Ok(Some(properties))
    }

    fn update(&self, pid: &str, properties: Properties) -> ConfigResult<()> {
        let bytes = postcard::to_allocvec(&properties).map_err(storage)?;
        let txn = self.db.begin_write().map_err(storage)?;
        {
            let mut table = txn.open_table(CONFIGURATIONS).map_err(storage)?;
            table.insert(pid, bytes.as_slice()).map_err(storage)?;
        }
        txn.commit().map_err(storage)
    }

    fn delete(&self, pid: &str) -> ConfigResult<bool> {
        let txn = self.db.begin_write().map_err(storage)?;
        let existed = {
            let mut table = txn.open_table(CONFIGURATIONS).map_err(storage)?;
            let removed = table.remove(pid).map_err(storage)?;
            removed.is_some()
        };
        txn.commit().map_err(storage)?;
        Ok(existed)
    }

    fn modify(&self, pid: &str, change: &mut ChangeFn<'_>) -> ConfigResult<()> {
        // The read happens inside the write transaction, so concurrent
        // writers queue behind it.
        let txn = self.db.begin_write().map_err(storage)?;
        let outcome = apply_change(&txn, pid, change);

        match outcome {
            Ok(()) => txn.commit().map_err(storage),
            Err(err) => {
                txn.abort().map_err(storage)?;
                Err(err)
            }
        }
    }

    fn insert_new(&self, pid: &str, properties: Properties) -> ConfigResult<bool> {
        let bytes = postcard::to_allocvec(&properties).map_err(storage)?;
        let txn = self.db.begin_write().map_err(storage)?;
        let inserted = {
            let mut table = txn.open_table(CONFIGURATIONS).map_err(storage)?;
            let exists = table.get(pid).map_err(storage)?.is_some();
            if !exists {
                table.insert(pid, bytes.as_slice()).map_err(storage)?;
            }
            !exists
        };
        txn.commit().map_err(storage)?;
        Ok(inserted)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PropertyValue;
    use tempfile::TempDir;

    fn sample() -> Properties {
        Properties::from([
            ("enabled".to_string(), PropertyValue::Boolean(true)),
            ("hosts".to_string(), PropertyValue::List(vec!["a".into(), "b".into()])),
            ("name".to_string(), PropertyValue::from("web")),
            ("port".to_string(), PropertyValue::Long(8181)),
        ])
    }

    #[test]
    fn stores_and_reads_typed_properties() {
        let dir = TempDir::new().unwrap();
        let admin = RedbConfigAdmin::open(dir.path().join("config.redb")).unwrap();

        admin.update("org.web", sample()).unwrap();
        assert_eq!(admin.get("org.web").unwrap(), Some(sample()));
        assert!(admin.get("missing").unwrap().is_none());
    }

    #[test]
    fn survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.redb");
        {
            let admin = RedbConfigAdmin::open(&path).unwrap();
            admin.update("b.pid", Properties::new()).unwrap();
            admin.update("a.pid", sample()).unwrap();
        }

        let admin = RedbConfigAdmin::open(&path).unwrap();
        assert_eq!(admin.list().unwrap(), vec!["a.pid", "b.pid"]);
        assert_eq!(admin.get("a.pid").unwrap(), Some(sample()));
    }

    #[test]
    fn delete_reports_existence() {
        let dir = TempDir::new().unwrap();
        let admin = RedbConfigAdmin::open(dir.path().join("config.redb")).unwrap();
        admin.update("org.web", sample()).unwrap();

        assert!(admin.delete("org.web").unwrap());
        assert!(!admin.delete("org.web").unwrap());
        assert!(admin.list().unwrap().is_empty());
    }

    #[test]
    fn failed_change_is_rolled_back() {
        let dir = TempDir::new().unwrap();
        let admin = RedbConfigAdmin::open(dir.path().join("config.redb")).unwrap();
        admin.update("org.web", sample()).unwrap();

        let result = admin.modify("org.web", &mut |properties: &mut Properties| {
            properties.clear();
            Err(ConfigError::InvalidState("rejected".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(admin.get("org.web").unwrap(), Some(sample()));

        let missing = admin.modify("nope", &mut |_: &mut Properties| Ok(()));
        assert_eq!(missing, Err(ConfigError::NotFound("nope".to_string())));
    }

    #[test]
    fn concurrent_changes_are_all_kept() {
        let dir = TempDir::new().unwrap();
        let admin = RedbConfigAdmin::open(dir.path().join("config.redb")).unwrap();
        admin.update("org.web", Properties::new()).unwrap();

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..50 {
                        admin
                            .modify("org.web", &mut |properties: &mut Properties| {
                                let count = match properties.get("count") {
                                    Some(PropertyValue::Long(n)) => *n,
                                    _ => 0,
                                };
                                properties.insert("count".to_string(), PropertyValue::Long(count + 1));
                                Ok(())
                            })
                            .unwrap();
                    }
                });
            }
        });

        let stored = admin.get("org.web").unwrap().unwrap();
        assert_eq!(stored.get("count"), Some(&PropertyValue::Long(200)));
    }

    #[test]
    fn insert_new_does_not_overwrite() {
        let dir = TempDir::new().unwrap();
        let admin = RedbConfigAdmin::open(dir.path().join("config.redb")).unwrap();

        assert!(admin.insert_new("org.web", sample()).unwrap());
        assert!(!admin.insert_new("org.web", Properties::new()).unwrap());
        assert_eq!(admin.get("org.web").unwrap(), Some(sample()));
    }
}
