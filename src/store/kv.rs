use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, trace};

use super::record::Record;
use crate::config::{AppConfig, DEFAULT_CAPACITY};
use crate::error::{Result, StoreError};

/// Thread-safe in-memory store of string records.
///
/// Writes take the exclusive lock. Point lookups and every full traversal
/// take the shared lock, and traversals keep it until the result is fully
/// materialized. Nothing returned borrows from the store.
#[derive(Debug, Default)]
pub struct Store {
    data: RwLock<HashMap<String, Record>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: RwLock::new(HashMap::with_capacity(capacity)),
        }
    }

    /// Builds a pre-sized store and loads the `[[seed]]` entries into it.
    pub fn from_config(config: &AppConfig) -> Self {
        let capacity = config.store.initial_capacity.unwrap_or(DEFAULT_CAPACITY);
        let store = Self::with_capacity(capacity.max(config.seed.len()));

        for entry in &config.seed {
            store.set(entry.key.as_str(), entry.value.as_str());
        }

        info!(
            "Store initialized with capacity {}, {} seeded keys",
            capacity,
            config.seed.len()
        );
        store
    }

    // Records are replaced whole under the write lock, so a poisoned lock
    // still guards a consistent map.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Record>> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Record>> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts `value` under `key`, silently replacing any previous record.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        debug!("Set key {:?}", key);

        let record = Record::new(key.clone(), value);
        self.write().insert(key, record);
    }

    pub fn get(&self, key: &str) -> Result<Record> {
        match self.read().get(key) {
            Some(record) => Ok(record.clone()),
            None => {
                debug!("Key not found: {:?}", key);
                Err(StoreError::NotFound(key.to_string()))
            }
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Returns every record, in no particular order.
    pub fn get_all(&self) -> Vec<Record> {
        self.scan("get_all", "", |_| true)
    }

    /// Returns an independent copy of the whole key to record mapping.
    pub fn snapshot(&self) -> HashMap<String, Record> {
        let data = self.read();
        trace!("snapshot copied {} keys", data.len());
        data.clone()
    }

    /// Records whose key starts with `prefix`. The empty prefix matches all.
    pub fn get_with_prefix(&self, prefix: &str) -> Vec<Record> {
        self.scan("get_with_prefix", prefix, |record| record.key().starts_with(prefix))
    }

    /// Records whose key contains `substr`.
    pub fn get_keys_containing(&self, substr: &str) -> Vec<Record> {
        self.scan("get_keys_containing", substr, |record| record.key().contains(substr))
    }

    /// Records whose value contains `substr`.
    pub fn get_values_containing(&self, substr: &str) -> Vec<Record> {
        self.scan("get_values_containing", substr, |record| record.value().contains(substr))
    }

    fn scan<F>(&self, op: &str, pattern: &str, matches: F) -> Vec<Record>
    where
        F: Fn(&Record) -> bool,
    {
        let data = self.read();
        let found: Vec<Record> = data
            .values()
            .filter(|record| matches(record))
            .cloned()
            .collect();

        trace!("{} {:?} matched {} of {} keys", op, pattern, found.len(), data.len());
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{load_config_from, SeedEntry};
    use ::config::{File, FileFormat};

    fn sorted(mut records: Vec<Record>) -> Vec<Record> {
        records.sort_by(|a, b| a.key().cmp(b.key()));
        records
    }

    #[test]
    fn test_set() {
        let store = Store::new();
        store.set("foo", "bar");

        assert_eq!(store.read().get("foo").map(Record::value), Some("bar"));
    }

    #[test]
    fn test_set_overwrites() {
        let store = Store::new();
        store.set("foo", "bar");
        store.set("foo", "baz");

        assert_eq!(store.get("foo"), Ok(Record::new("foo", "baz")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get() {
        let store = Store::new();
        store.set("foo", "bar");

        let record = store.get("foo").unwrap();
        assert_eq!(record.key(), "foo");
        assert_eq!(record.value(), "bar");

        assert_eq!(store.get("baz"), Err(StoreError::NotFound("baz".to_string())));
    }

    #[test]
    fn test_get_all_empty() {
        let store = Store::new();
        assert!(store.get_all().is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn test_snapshot_is_independent() {
        let store = Store::new();
        store.set("foo", "baz");

        let mut snapshot = store.snapshot();
        snapshot.insert("foo".to_string(), Record::new("bar", "bar"));
        snapshot.insert("extra".to_string(), Record::new("extra", "1"));

        assert_eq!(store.get("foo"), Ok(Record::new("foo", "baz")));
        assert!(!store.contains_key("extra"));

        store.set("foo", "qux");
        assert_eq!(snapshot["foo"], Record::new("bar", "bar"));
    }

    #[test]
    fn test_scans() {
        let store = Store::new();
        let pairs = [
            ("pre-foo", "1"),
            ("pre-bar", "2"),
            ("foo-bar", "4"),
            ("bazbar", "5"),
        ];
        for (key, value) in pairs {
            store.set(key, value);
        }

        assert_eq!(
            sorted(store.get_with_prefix("pre")),
            vec![Record::new("pre-bar", "2"), Record::new("pre-foo", "1")]
        );
        assert_eq!(store.get_with_prefix("").len(), 4);
        assert_eq!(store.get_keys_containing("bar").len(), 3);
        assert_eq!(store.get_values_containing("4"), vec![Record::new("foo-bar", "4")]);
        assert!(store.get_keys_containing("nope").is_empty());
    }

    #[test]
    fn test_from_config_seeds_store() {
        let mut config = AppConfig::default();
        for (key, value) in [("foo", "bar"), ("baz", "doe")] {
            config.seed.push(SeedEntry {
                key: key.to_string(),
                value: value.to_string(),
            });
        }

        let store = Store::from_config(&config);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("baz"), Ok(Record::new("baz", "doe")));
    }

    #[test]
    fn test_from_config_keeps_key_case() -> anyhow::Result<()> {
        let toml = r#"
            [[seed]]
            key = "MixedCase"
            value = "1"
        "#;
        let config = load_config_from(File::from_str(toml, FileFormat::Toml))?;

        let store = Store::from_config(&config);
        assert_eq!(store.get("MixedCase"), Ok(Record::new("MixedCase", "1")));
        assert!(!store.contains_key("mixedcase"));
        Ok(())
    }
}
