use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use crate::cache::{ResourceCache, Result};
use crate::request::{Request, Response};

type Namespace = HashMap<(String, String), Response>;

/// Process-local resource cache.
#[derive(Debug, Default)]
pub struct MemoryResourceCache {
    namespaces: Mutex<BTreeMap<String, Namespace>>,
}

impl MemoryResourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries in `namespace` (0 when it does not exist).
    pub fn entry_count(&self, namespace: &str) -> usize {
        self.namespaces
            .lock()
            .expect("resource cache mutex poisoned")
            .get(namespace)
            .map_or(0, HashMap::len)
    }
}

fn key(request: &Request) -> (String, String) {
    (request.method.to_string(), request.url.to_string())
}

impl ResourceCache for MemoryResourceCache {
    fn open_namespace(&self, name: &str) -> Result<()> {
        self.namespaces
            .lock()
            .expect("resource cache mutex poisoned")
            .entry(name.to_string())
            .or_default();
        Ok(())
    }

    fn list_namespaces(&self) -> Result<Vec<String>> {
        let namespaces = self.namespaces.lock().expect("resource cache mutex poisoned");
        Ok(namespaces.keys().cloned().collect())
    }

    fn delete_namespace(&self, name: &str) -> Result<bool> {
        let mut namespaces = self.namespaces.lock().expect("resource cache mutex poisoned");
        Ok(namespaces.remove(name).is_some())
    }

    fn match_request(&self, namespace: &str, request: &Request) -> Result<Option<Response>> {
        let namespaces = self.namespaces.lock().expect("resource cache mutex poisoned");
        Ok(namespaces
            .get(namespace)
            .and_then(|entries| entries.get(&key(request)))
            .cloned())
    }

    fn put(&self, namespace: &str, request: &Request, response: &Response) -> Result<()> {
        let mut namespaces = self.namespaces.lock().expect("resource cache mutex poisoned");
        namespaces
            .entry(namespace.to_string())
            .or_default()
            .insert(key(request), response.clone());
        Ok(())
    }
}
