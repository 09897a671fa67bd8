//! Process-local configuration overlay.

use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value;

use crate::application::overlay::ConfigOverlay;

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "infra::overlay";

#[derive(Debug, Default)]
pub struct InMemoryOverlay {
    entries: RwLock<HashMap<String, Value>>,
}

impl InMemoryOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the overlay, typically from the `overlay.defaults` configuration table.
    pub fn with_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(|(key, value)| (key.into(), value))
            .collect();
        Self {
            entries: RwLock::new(entries),
        }
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ConfigOverlay for InMemoryOverlay {
    fn get(&self, key: &str) -> Option<Value> {
        rw_read(&self.entries, SOURCE, "get").get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) {
        rw_write(&self.entries, SOURCE, "set").insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        rw_write(&self.entries, SOURCE, "remove").remove(key);
    }
}
