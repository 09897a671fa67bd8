//! The global key/value registry the settings store mirrors into.

use serde_json::Value;

/// A string-keyed registry shared with the host application.
///
/// The store writes every value it loads or sets under the full setting key,
/// and reads it back when a key is missing from its own cache.
pub trait ConfigOverlay: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;

    fn set(&self, key: &str, value: Value);

    fn remove(&self, key: &str);
}
