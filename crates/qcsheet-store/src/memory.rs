use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::{ByteStore, Result};

/// Process-local store. Contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryByteStore {
    entries: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryByteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("byte store mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ByteStore for MemoryByteStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let entries = self.entries.lock().expect("byte store mutex poisoned");
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let mut entries = self.entries.lock().expect("byte store mutex poisoned");
        entries.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let mut entries = self.entries.lock().expect("byte store mutex poisoned");
        Ok(entries.remove(key).is_some())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let entries = self.entries.lock().expect("byte store mutex poisoned");
        Ok(entries.keys().cloned().collect())
    }
}
