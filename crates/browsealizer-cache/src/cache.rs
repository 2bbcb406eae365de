use std::collections::HashMap;
use std::hash::Hash;
use tracing::debug;

/// Anything the cache can hold needs a stable identity
pub trait Cacheable: Clone {
    type Id: Eq + Hash + Clone;

    fn cache_id(&self) -> Self::Id;
}

/// Session-long store of fetched items keyed by identity.
///
/// Nothing is ever evicted. Upserting an identity twice keeps the latest copy.
#[derive(Debug, Clone)]
pub struct ResultCache<T: Cacheable> {
    entries: HashMap<T::Id, T>,
}

impl<T: Cacheable> ResultCache<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn put(&mut self, item: T) {
        self.entries.insert(item.cache_id(), item);
    }

    pub fn extend<I: IntoIterator<Item = T>>(&mut self, items: I) {
        let before = self.entries.len();
        for item in items {
            self.put(item);
        }
        debug!(
            "Result cache grew from {} to {} entries",
            before,
            self.entries.len()
        );
    }

    pub fn get(&self, id: &T::Id) -> Option<&T> {
        self.entries.get(id)
    }

    /// Snapshot of everything cached. Order is unspecified.
    pub fn get_all(&self) -> Vec<T> {
        self.entries.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Cacheable> Default for ResultCache<T> {
    fn default() -> Self {
        Self::new()
    }
}
