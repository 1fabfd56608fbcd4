//! Core proxy pool registry.

use crate::config::RegistryConfig;
use crate::error::{RegistryError, Result};
use crate::persist::{MemoryPersister, Persister, YamlFilePersister};
use crate::proxy::{ProxyPoolEntry, ProxyPoolPatch};
use crate::resolver::PoolLookup;
use crate::utils::mask_proxy_url;

use log::{info, warn};
use parking_lot::Mutex;
use std::collections::HashSet;

/// Ordered registry of proxy pool entries keyed by id.
///
/// One mutex guards the entries for reads and writes alike. Mutations hold it
/// through validation, the in-memory change and the persister call, so a
/// mutation that fails to persist is rolled back before anyone can observe it.
pub struct ProxyPoolStore {
    /// Entries in insertion order.
    entries: Mutex<Vec<ProxyPoolEntry>>,
    /// Configuration for the registry.
    pub config: RegistryConfig,
    /// Where committed mutations are written.
    persister: Box<dyn Persister>,
}

impl ProxyPoolStore {
    /// Open the registry described by `config`.
    ///
    /// With a `config_path` the pool is loaded from that YAML file and every
    /// mutation is written back to it; without one the pool is memory-only.
    pub fn open(config: RegistryConfig) -> Result<Self> {
        match config.config_path.clone() {
            Some(path) => {
                let persister = YamlFilePersister::new(path);
                let entries = persister.load()?;
                info!(
                    "Loaded {} proxy pool entries from {}",
                    entries.len(),
                    persister.path().display()
                );
                Self::with_persister(config, entries, Box::new(persister))
            }
            None => Self::with_persister(config, Vec::new(), Box::new(MemoryPersister)),
        }
    }

    /// Build a registry from `entries` that persists through `persister`.
    ///
    /// Entries are checked with the same rules as [`insert`](Self::insert).
    pub fn with_persister(
        config: RegistryConfig,
        mut entries: Vec<ProxyPoolEntry>,
        persister: Box<dyn Persister>,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        for entry in &mut entries {
            entry.normalize();
            entry.validate(&config)?;
            if !seen.insert(entry.id.clone()) {
                return Err(RegistryError::Conflict {
                    id: entry.id.clone(),
                });
            }
        }

        Ok(Self {
            entries: Mutex::new(entries),
            config,
            persister,
        })
    }

    /// In-memory registry with default configuration.
    pub fn in_memory() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            config: RegistryConfig::default(),
            persister: Box::new(MemoryPersister),
        }
    }

    /// All entries in insertion order.
    pub fn list(&self) -> Vec<ProxyPoolEntry> {
        self.entries.lock().clone()
    }

    /// Look up an entry by id.
    pub fn get(&self, id: &str) -> Option<ProxyPoolEntry> {
        self.entries.lock().iter().find(|e| e.id == id).cloned()
    }

    /// URL of the entry with `id`, if any.
    pub fn proxy_url_for(&self, id: &str) -> Option<String> {
        self.entries
            .lock()
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.proxy_url.clone())
    }

    /// Number of entries in the pool.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the pool has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Add a new entry at the end of the pool.
    pub fn insert(&self, mut entry: ProxyPoolEntry) -> Result<ProxyPoolEntry> {
        entry.normalize();
        entry.validate(&self.config)?;

        let mut entries = self.entries.lock();
        if entries.iter().any(|e| e.id == entry.id) {
            return Err(RegistryError::Conflict { id: entry.id });
        }

        entries.push(entry.clone());
        if let Err(e) = self.persister.save(&entries) {
            entries.pop();
            warn!("Rolled back insert of proxy {}: {}", entry.id, e);
            return Err(e.into());
        }

        info!(
            "Added proxy {} ({}), pool size {}",
            entry.id,
            mask_proxy_url(&entry.proxy_url),
            entries.len()
        );
        Ok(entry)
    }

    /// Replace the URL and any supplied metadata of an existing entry.
    pub fn update(&self, id: &str, patch: ProxyPoolPatch) -> Result<ProxyPoolEntry> {
        patch.validate(&self.config)?;

        let mut entries = self.entries.lock();
        let idx = entries
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| RegistryError::proxy_not_found(id))?;

        let previous = entries[idx].clone();
        patch.apply(&mut entries[idx], &self.config)?;

        if let Err(e) = self.persister.save(&entries) {
            entries[idx] = previous;
            warn!("Rolled back update of proxy {}: {}", id, e);
            return Err(e.into());
        }

        let updated = entries[idx].clone();
        info!(
            "Updated proxy {}: {} -> {}",
            id,
            mask_proxy_url(&previous.proxy_url),
            mask_proxy_url(&updated.proxy_url)
        );
        Ok(updated)
    }

    /// Remove an entry, keeping the order of the rest.
    pub fn delete(&self, id: &str) -> Result<ProxyPoolEntry> {
        let mut entries = self.entries.lock();
        let idx = entries
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| RegistryError::proxy_not_found(id))?;

        let removed = entries.remove(idx);
        if let Err(e) = self.persister.save(&entries) {
            entries.insert(idx, removed);
            warn!("Rolled back delete of proxy {}: {}", id, e);
            return Err(e.into());
        }

        info!("Deleted proxy {}, pool size {}", id, entries.len());
        Ok(removed)
    }
}

impl PoolLookup for ProxyPoolStore {
    fn proxy_url_for(&self, pool_id: &str) -> Option<String> {
        ProxyPoolStore::proxy_url_for(self, pool_id)
    }
}

impl Default for ProxyPoolStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::PersistError;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Persister whose saves can be made to fail on demand.
    #[derive(Default)]
    pub(crate) struct FlakyPersister {
        pub(crate) fail: AtomicBool,
        pub(crate) saves: AtomicUsize,
    }

    impl Persister for Arc<FlakyPersister> {
        fn save(&self, _entries: &[ProxyPoolEntry]) -> std::result::Result<(), PersistError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(PersistError::Io(std::io::Error::other("disk full")));
            }
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    pub(crate) fn flaky_store() -> (ProxyPoolStore, Arc<FlakyPersister>) {
        let persister = Arc::new(FlakyPersister::default());
        let store = ProxyPoolStore::with_persister(
            RegistryConfig::default(),
            Vec::new(),
            Box::new(Arc::clone(&persister)),
        )
        .unwrap();
        (store, persister)
    }

    fn ids(store: &ProxyPoolStore) -> Vec<String> {
        store.list().into_iter().map(|e| e.id).collect()
    }

    #[test]
    fn test_insert_and_list_in_order() {
        let store = ProxyPoolStore::in_memory();
        for id in ["a", "b", "c"] {
            store
                .insert(ProxyPoolEntry::new(id, format!("http://{id}:8080")))
                .unwrap();
        }
        assert_eq!(ids(&store), ["a", "b", "c"]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_insert_trims_and_returns_stored_entry() {
        let store = ProxyPoolStore::in_memory();
        let stored = store
            .insert(ProxyPoolEntry::new(" p1 ", " http://h:8080 ").with_name(" n "))
            .unwrap();
        assert_eq!(stored, ProxyPoolEntry::new("p1", "http://h:8080").with_name("n"));
        assert_eq!(store.get("p1"), Some(stored));
    }

    #[test]
    fn test_insert_duplicate_conflicts_and_leaves_store_unchanged() {
        let store = ProxyPoolStore::in_memory();
        store.insert(ProxyPoolEntry::new("p1", "http://h:8080")).unwrap();

        let err = store
            .insert(ProxyPoolEntry::new("p1", "http://other:1"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::Conflict { ref id } if id == "p1"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.proxy_url_for("p1").as_deref(), Some("http://h:8080"));
    }

    #[test]
    fn test_insert_rejects_blank_fields() {
        let store = ProxyPoolStore::in_memory();
        assert!(matches!(
            store.insert(ProxyPoolEntry::new("  ", "http://h:8080")),
            Err(RegistryError::Validation(_))
        ));
        assert!(matches!(
            store.insert(ProxyPoolEntry::new("p1", " \t ")),
            Err(RegistryError::Validation(_))
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_unknown_ids_are_not_found() {
        let store = ProxyPoolStore::in_memory();
        assert!(store.get("ghost").is_none());
        assert!(matches!(
            store.update("ghost", ProxyPoolPatch::url("http://h:1")),
            Err(RegistryError::NotFound { .. })
        ));
        assert!(matches!(
            store.delete("ghost"),
            Err(RegistryError::NotFound { .. })
        ));
    }

    #[test]
    fn test_update_in_place() {
        let store = ProxyPoolStore::in_memory();
        store
            .insert(ProxyPoolEntry::new("a", "http://a:1").with_description("keep me"))
            .unwrap();
        store.insert(ProxyPoolEntry::new("b", "http://b:1")).unwrap();

        let updated = store.update("a", ProxyPoolPatch::url("http://a:2")).unwrap();
        assert_eq!(updated.id, "a");
        assert_eq!(updated.proxy_url, "http://a:2");
        assert_eq!(updated.description, "keep me");
        assert_eq!(ids(&store), ["a", "b"]);

        assert!(matches!(
            store.update("a", ProxyPoolPatch::url("")),
            Err(RegistryError::Validation(_))
        ));
        assert_eq!(store.proxy_url_for("a").as_deref(), Some("http://a:2"));
    }

    #[test]
    fn test_update_checks_url_before_id() {
        let store = ProxyPoolStore::in_memory();
        let err = store.update("ghost", ProxyPoolPatch::url("  ")).unwrap_err();
        assert!(matches!(err, RegistryError::Validation(_)));
        assert_eq!(err.to_string(), "proxy URL is required");
    }

    #[test]
    fn test_delete_preserves_order() {
        let store = ProxyPoolStore::in_memory();
        for id in ["a", "b", "c", "d"] {
            store.insert(ProxyPoolEntry::new(id, "http://h:1")).unwrap();
        }
        let removed = store.delete("b").unwrap();
        assert_eq!(removed.id, "b");
        assert!(store.get("b").is_none());
        assert_eq!(ids(&store), ["a", "c", "d"]);
    }

    #[test]
    fn test_persistence_failure_rolls_back() {
        let (store, persister) = flaky_store();
        store.insert(ProxyPoolEntry::new("a", "http://a:1")).unwrap();
        store.insert(ProxyPoolEntry::new("b", "http://b:1")).unwrap();
        persister.fail.store(true, Ordering::SeqCst);

        let err = store.insert(ProxyPoolEntry::new("c", "http://c:1")).unwrap_err();
        assert!(matches!(err, RegistryError::Persistence(_)));
        assert!(store.get("c").is_none());

        assert!(store.update("a", ProxyPoolPatch::url("http://a:2")).is_err());
        assert_eq!(store.proxy_url_for("a").as_deref(), Some("http://a:1"));

        assert!(store.delete("a").is_err());
        assert_eq!(ids(&store), ["a", "b"]);

        persister.fail.store(false, Ordering::SeqCst);
        store.delete("a").unwrap();
        assert_eq!(ids(&store), ["b"]);
        assert_eq!(persister.saves.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_with_persister_rejects_bad_seed() {
        let dupes = vec![
            ProxyPoolEntry::new("p1", "http://a:1"),
            ProxyPoolEntry::new("p1", "http://b:1"),
        ];
        assert!(matches!(
            ProxyPoolStore::with_persister(RegistryConfig::default(), dupes, Box::new(MemoryPersister)),
            Err(RegistryError::Conflict { .. })
        ));

        let blank = vec![ProxyPoolEntry::new("p1", "")];
        assert!(matches!(
            ProxyPoolStore::with_persister(RegistryConfig::default(), blank, Box::new(MemoryPersister)),
            Err(RegistryError::Validation(_))
        ));
    }

    #[test]
    fn test_open_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = RegistryConfig::builder()
            .config_path(dir.path().join("config.yaml"))
            .build();

        let store = ProxyPoolStore::open(config.clone()).unwrap();
        assert!(store.is_empty());
        store
            .insert(ProxyPoolEntry::new("p1", "socks5://u:p@h:1080").with_name("tokyo"))
            .unwrap();
        store.insert(ProxyPoolEntry::new("p2", "http://h:8080")).unwrap();
        store.delete("p2").unwrap();
        drop(store);

        let reopened = ProxyPoolStore::open(config).unwrap();
        assert_eq!(
            reopened.list(),
            vec![ProxyPoolEntry::new("p1", "socks5://u:p@h:1080").with_name("tokyo")]
        );
    }

    #[test]
    fn test_concurrent_inserts_keep_ids_unique() {
        let store = Arc::new(ProxyPoolStore::in_memory());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let mut won = 0;
                    for i in 0..50 {
                        let id = format!("p{}", (t + i) % 20);
                        if store.insert(ProxyPoolEntry::new(id, "http://h:1")).is_ok() {
                            won += 1;
                        }
                    }
                    won
                })
            })
            .collect();

        let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 20);
        assert_eq!(store.len(), 20);
    }
}
