use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::error::Error;
use crate::state::MarketState;

pub const DEFAULT_NAMESPACE: &str = "loan-market-storage";

/// Where the ledger's state blob lives. Read once on open, written after
/// every mutation.
pub trait Persistence {
    fn load(&self) -> Result<Option<MarketState>, Error>;
    fn save(&self, state: &MarketState) -> Result<(), Error>;
}

impl<T: Persistence + ?Sized> Persistence for Box<T> {
    fn load(&self) -> Result<Option<MarketState>, Error> {
        (**self).load()
    }

    fn save(&self, state: &MarketState) -> Result<(), Error> {
        (**self).save(state)
    }
}

/// In-process key/value store holding serialized blobs per namespace.
/// Clones share the same backing map.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    namespace: String,
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// A store over the same backing map under another namespace.
    pub fn with_namespace(&self, namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            entries: Arc::clone(&self.entries),
        }
    }

    pub fn raw(&self) -> Option<String> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(&self.namespace).cloned())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

impl Persistence for MemoryStore {
    fn load(&self) -> Result<Option<MarketState>, Error> {
        match self.raw() {
            Some(blob) => Ok(Some(serde_json::from_str(&blob)?)),
            None => Ok(None),
        }
    }

    fn save(&self, state: &MarketState) -> Result<(), Error> {
        let blob = serde_json::to_string(state)?;
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))?;
        entries.insert(self.namespace.clone(), blob);
        debug!(namespace = %self.namespace, "state saved");
        Ok(())
    }
}

/// One JSON file per namespace under a directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(directory: impl Into<PathBuf>, namespace: &str) -> Self {
        Self {
            path: directory.into().join(format!("{namespace}.json")),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl Persistence for JsonFileStore {
    fn load(&self) -> Result<Option<MarketState>, Error> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn save(&self, state: &MarketState) -> Result<(), Error> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        // Write-then-rename so a crash never leaves a truncated blob.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(state)?)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "state saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use rust_decimal_macros::dec;

    fn sample() -> MarketState {
        MarketState::new(
            Catalog::default_listings().listings().to_vec(),
            Vec::new(),
            dec!(1000),
        )
    }

    #[test]
    fn memory_store_namespaces_are_isolated() {
        let store = MemoryStore::default();
        let other = store.with_namespace("other");
        store.save(&sample()).unwrap();

        assert_eq!(store.load().unwrap(), Some(sample()));
        assert_eq!(other.load().unwrap(), None);
    }

    #[test]
    fn file_store_round_trip() {
        let dir = std::env::temp_dir().join(format!(
            "loan-market-ledger-test-{}",
            std::process::id()
        ));
        let store = JsonFileStore::new(&dir, "file-store-round-trip");
        assert_eq!(store.load().unwrap(), None);

        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), Some(sample()));

        fs::remove_file(store.path()).unwrap();
    }

    #[test]
    fn corrupt_blob_is_an_error() {
        let store = MemoryStore::new("corrupt");
        store
            .entries
            .lock()
            .unwrap()
            .insert("corrupt".into(), "{".into());
        assert!(matches!(store.load(), Err(Error::Json(_))));
    }
}
