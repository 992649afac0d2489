//! Key-value fact memory shared by every session in the process

use parking_lot::RwLock;
use std::collections::BTreeMap;
use tracing::debug;

/// Process-lifetime key/value store
///
/// Keys are kept exactly as written. Reads through [`MemoryStore::lookup`] and
/// [`MemoryStore::find_mentioned`] compare case-insensitively.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a fact
    pub fn write(&self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        debug!(key = %key, "Writing memory");
        self.entries.write().insert(key, value);
    }

    /// Exact-key read
    pub fn read(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    /// Consistent snapshot of every fact, ordered by key
    pub fn all(&self) -> BTreeMap<String, String> {
        self.entries.read().clone()
    }

    /// Case-insensitive key read
    pub fn lookup(&self, key: &str) -> Option<(String, String)> {
        let wanted = key.trim().to_lowercase();
        self.entries
            .read()
            .iter()
            .find(|(k, _)| k.to_lowercase() == wanted)
            .map(|(k, v)| (k.clone(), v.clone()))
    }

    /// Find the fact whose key appears inside `text`
    ///
    /// When several keys match, the longest key wins; equal lengths fall back
    /// to key order.
    pub fn find_mentioned(&self, text: &str) -> Option<(String, String)> {
        let haystack = text.to_lowercase();
        let entries = self.entries.read();

        let mut best: Option<(&String, &String)> = None;
        for (key, value) in entries.iter() {
            let needle = key.to_lowercase();
            if needle.is_empty() || !haystack.contains(&needle) {
                continue;
            }
            if best.map_or(true, |(k, _)| key.len() > k.len()) {
                best = Some((key, value));
            }
        }

        best.map(|(k, v)| (k.clone(), v.clone()))
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
