use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use super::Response;

type Entries = HashMap<String, Response>;

/// Named response caches keyed by absolute URL. Cloning shares the storage.
#[derive(Debug, Clone, Default)]
pub struct CacheStorage {
    inner: Arc<Mutex<HashMap<String, Entries>>>,
}

impl CacheStorage {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entries>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn put(&self, cache: &str, url: &str, response: Response) {
        self.lock()
            .entry(cache.to_owned())
            .or_default()
            .insert(url.to_owned(), response);
    }

    /// Stores every entry under one lock, so readers never see a partial
    /// precache.
    pub fn put_all(&self, cache: &str, entries: Vec<(String, Response)>) {
        let mut caches = self.lock();
        let target = caches.entry(cache.to_owned()).or_default();
        for (url, response) in entries {
            target.insert(url, response);
        }
    }

    /// Looks `url` up across every cache.
    pub fn match_url(&self, url: &str) -> Option<Response> {
        self.lock()
            .values()
            .find_map(|entries| entries.get(url))
            .cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn delete(&self, cache: &str) -> bool {
        self.lock().remove(cache).is_some()
    }

    /// Deletes every cache but `current` and returns the deleted names.
    pub fn delete_except(&self, current: &str) -> Vec<String> {
        let stale: Vec<String> =
            self.keys().into_iter().filter(|name| name != current).collect();
        for name in &stale {
            self.delete(name);
        }
        stale
    }
}
