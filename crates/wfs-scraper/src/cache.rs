use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use tokio::sync::OnceCell;

/// Process-lifetime memo keyed by URL (exact, case-sensitive match).
///
/// Entries are never evicted or expired. A write replaces the whole value
/// for its key under the write lock, so readers never observe a partially
/// written entry.
#[derive(Debug)]
pub struct Cache<T> {
    map: RwLock<HashMap<String, T>>,
}

impl<T: Clone> Cache<T> {
    pub fn new() -> Self {
        Self {
            map: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, url: &str) -> Option<T> {
        self.map.read().unwrap().get(url).cloned()
    }

    pub fn set(&self, url: &str, value: T) {
        self.map.write().unwrap().insert(url.to_string(), value);
    }

    pub fn len(&self) -> usize {
        self.map.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.read().unwrap().is_empty()
    }
}

impl<T: Clone> Default for Cache<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Coalesces concurrent computations for the same URL into one in-flight
/// operation: the first task to reach a key runs the initializer, later
/// tasks await the same cell. A failed initialization leaves the cell
/// empty, so a subsequent task retries instead of observing a cached
/// failure.
#[derive(Debug)]
pub(crate) struct Inflight<T> {
    cells: Mutex<HashMap<String, Arc<OnceCell<T>>>>,
}

impl<T> Inflight<T> {
    pub fn new() -> Self {
        Self {
            cells: Mutex::new(HashMap::new()),
        }
    }

    pub fn cell(&self, url: &str) -> Arc<OnceCell<T>> {
        self.cells
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .clone()
    }
}
