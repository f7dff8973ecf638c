//! Id-keyed record storage shared by the node and edge state stores.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

/// Insertion-ordered records, shared between clones.
///
/// Records are cloned out before use so no lock is held while a caller
/// reads reactive values through them.
pub(crate) struct Records<S> {
    inner: Arc<RwLock<IndexMap<String, S>>>,
}

impl<S: Clone> Records<S> {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(IndexMap::new())),
        }
    }

    /// Insert the record `build` produces unless `id` is taken.
    ///
    /// The record is fully built before it becomes visible.
    pub(crate) fn insert_with(&self, id: &str, build: impl FnOnce() -> S) -> bool {
        if self.contains(id) {
            return false;
        }
        let record = build();
        self.inner.write().insert(id.to_owned(), record);
        true
    }

    pub(crate) fn remove(&self, id: &str) -> Option<S> {
        self.inner.write().shift_remove(id)
    }

    pub(crate) fn get(&self, id: &str) -> Option<S> {
        self.inner.read().get(id).cloned()
    }

    pub(crate) fn contains(&self, id: &str) -> bool {
        self.inner.read().contains_key(id)
    }

    pub(crate) fn ids(&self) -> Vec<String> {
        self.inner.read().keys().cloned().collect()
    }

    pub(crate) fn values(&self) -> Vec<S> {
        self.inner.read().values().cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.read().len()
    }
}

impl<S> Clone for Records<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
