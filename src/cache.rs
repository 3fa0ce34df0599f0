use indexmap::IndexMap;
use std::collections::HashMap;

/// Flat name → outcome mapping, as exported and imported.
pub type Snapshot = IndexMap<String, bool>;

/// Remembered outcomes of evaluated features.
#[derive(Debug, Clone, Default)]
pub struct ResultCache {
    results: HashMap<String, bool>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<bool> {
        self.results.get(name).copied()
    }

    pub fn insert(&mut self, name: impl Into<String>, result: bool) {
        self.results.insert(name.into(), result);
    }

    pub fn remove(&mut self, name: &str) -> Option<bool> {
        self.results.remove(name)
    }

    /// Later entries win over what is already cached.
    pub fn merge<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (String, bool)>,
    {
        self.results.extend(entries);
    }

    pub fn clear(&mut self) {
        self.results.clear();
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_overwrites() {
        let mut cache = ResultCache::new();
        cache.insert("a", true);
        cache.merge([("a".to_string(), false), ("b".to_string(), true)]);
        assert_eq!(cache.get("a"), Some(false));
        assert_eq!(cache.get("b"), Some(true));
        assert_eq!(cache.remove("a"), Some(false));
        assert_eq!(cache.len(), 1);
    }
}
