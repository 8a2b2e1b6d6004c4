//! Container registry and durable record persistence.

use std::sync::Arc;

use dashmap::DashMap;

use krug_common::{KrugError, KrugPaths, KrugResult};

use crate::container::{Container, ContainerRecord};

/// Owns every container record; operations borrow handles from it.
#[derive(Debug, Default)]
pub struct ContainerStore {
    paths: KrugPaths,
    containers: DashMap<String, Arc<Container>>,
}

impl ContainerStore {
    /// Create a store rooted at the given paths.
    #[must_use]
    pub fn new(paths: KrugPaths) -> Self {
        Self {
            paths,
            containers: DashMap::new(),
        }
    }

    /// The filesystem layout this store persists under.
    #[must_use]
    pub fn paths(&self) -> &KrugPaths {
        &self.paths
    }

    /// Register a container handle.
    pub fn insert(&self, container: Arc<Container>) {
        self.containers
            .insert(container.id().to_string(), container);
    }

    /// Look up a container by ID.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<Container>> {
        self.containers.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Drop a container from the registry.
    pub fn remove(&self, id: &str) {
        self.containers.remove(id);
    }

    /// Persist a container record to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the record directory cannot be created or the
    /// write fails.
    pub fn save(&self, record: &ContainerRecord) -> KrugResult<()> {
        let path = self.paths.container_record(&record.id);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(record)?;
        std::fs::write(&path, json)?;

        tracing::debug!(
            container_id = %record.id,
            path = %path.display(),
            "Saved container record"
        );

        Ok(())
    }

    /// Load a container record from durable storage.
    ///
    /// # Errors
    ///
    /// Returns [`KrugError::ContainerNotFound`] when no record exists, or a
    /// deserialization/I/O error otherwise.
    pub fn load(&self, id: &str) -> KrugResult<ContainerRecord> {
        let path = self.paths.container_record(id);

        if !path.exists() {
            return Err(KrugError::ContainerNotFound { id: id.to_string() });
        }

        let json = std::fs::read_to_string(&path)?;
        let record: ContainerRecord = serde_json::from_str(&json)?;
        Ok(record)
    }

    /// Whether a record exists on disk.
    #[must_use]
    pub fn exists_on_disk(&self, id: &str) -> bool {
        self.paths.container_record(id).exists()
    }

    /// IDs of every container with a persisted record.
    ///
    /// # Errors
    ///
    /// Returns an error if the containers directory cannot be read.
    pub fn list(&self) -> KrugResult<Vec<String>> {
        let mut ids = Vec::new();
        let dir = self.paths.containers();

        if !dir.exists() {
            return Ok(ids);
        }

        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if entry.path().join("netconf.json").exists() {
                    ids.push(name.to_string());
                }
            }
        }

        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use krug_common::ContainerId;
    use krug_network::HostNetworkSpec;
    use tempfile::tempdir;

    fn store_in(dir: &std::path::Path) -> ContainerStore {
        ContainerStore::new(KrugPaths::with_root(dir))
    }

    #[test]
    fn registry_lookup() {
        let temp = tempdir().unwrap();
        let store = store_in(temp.path());

        let id = ContainerId::new("abc123").unwrap();
        store.insert(Arc::new(Container::new(id, "web", HostNetworkSpec::default())));

        assert!(store.get("abc123").is_some());
        assert!(store.get("missing").is_none());

        store.remove("abc123");
        assert!(store.get("abc123").is_none());
    }

    #[test]
    fn save_and_load_record() {
        let temp = tempdir().unwrap();
        let store = store_in(temp.path());

        let id = ContainerId::new("abc123").unwrap();
        let record = ContainerRecord::new(&id, "web");
        store.save(&record).unwrap();

        let loaded = store.load("abc123").unwrap();
        assert_eq!(loaded.id, "abc123");
        assert_eq!(loaded.name, "web");
    }

    #[test]
    fn load_missing_record() {
        let temp = tempdir().unwrap();
        let store = store_in(temp.path());

        let err = store.load("nope").unwrap_err();
        assert!(matches!(err, KrugError::ContainerNotFound { .. }));
    }

    #[test]
    fn list_persisted_records() {
        let temp = tempdir().unwrap();
        let store = store_in(temp.path());

        for id in ["one", "two"] {
            let cid = ContainerId::new(id).unwrap();
            store.save(&ContainerRecord::new(&cid, id)).unwrap();
        }

        let mut ids = store.list().unwrap();
        ids.sort();
        assert_eq!(ids, vec!["one".to_string(), "two".to_string()]);
        assert!(store.exists_on_disk("one"));
        assert!(!store.exists_on_disk("three"));
    }
}
