use indexmap::IndexMap;
use std::sync::Arc;
use tracing::debug;

use crate::errors::{Result, ToggleError};
use crate::feature::Feature;

/// Name → definition map, kept in registration order.
///
/// Definitions sit behind `Arc` so cloned stores share them until one side
/// mutates a feature.
#[derive(Debug, Clone, Default)]
pub struct FeatureStore {
    features: IndexMap<String, Arc<Feature>>,
}

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ToggleError::InvalidDefinition(
            "feature name must be a non-empty string".into(),
        ));
    }
    Ok(())
}

impl FeatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, feature: Feature) -> Result<()> {
        let name = name.into();
        check_name(&name)?;
        if self.features.contains_key(&name) {
            return Err(ToggleError::DuplicateName(name));
        }
        debug!(feature = %name, "registered feature");
        self.features.insert(name, Arc::new(feature));
        Ok(())
    }

    /// Insert or overwrite without the duplicate check.
    pub fn replace(&mut self, name: impl Into<String>, feature: Feature) -> Result<()> {
        let name = name.into();
        check_name(&name)?;
        self.features.insert(name, Arc::new(feature));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&Feature> {
        self.lookup(name)
            .ok_or_else(|| ToggleError::NotFound(name.to_string()))
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut Feature> {
        self.features
            .get_mut(name)
            .map(Arc::make_mut)
            .ok_or_else(|| ToggleError::NotFound(name.to_string()))
    }

    pub(crate) fn lookup(&self, name: &str) -> Option<&Feature> {
        self.features.get(name).map(|f| f.as_ref())
    }

    pub fn exists(&self, name: &str) -> bool {
        self.features.contains_key(name)
    }

    /// Returns whether anything was removed; missing names are not an error.
    pub fn remove(&mut self, name: &str) -> bool {
        self.features.shift_remove(name).is_some()
    }

    pub fn names(&self) -> Vec<String> {
        self.features.keys().cloned().collect()
    }

    pub fn all(&self) -> IndexMap<String, Feature> {
        self.features
            .iter()
            .map(|(name, f)| (name.clone(), Feature::clone(f)))
            .collect()
    }

    pub fn flush(&mut self) {
        self.features.clear();
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
