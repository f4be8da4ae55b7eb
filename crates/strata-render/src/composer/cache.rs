//! Stage cache
//!
//! Pipeline assembly for the same owner reuses the same stage objects. A hit
//! returns the cached instance as-is; the arguments of later calls are not
//! reapplied.

use crate::stages::{StageArgs, StageRef, StageRegistry};
use crate::Result;
use std::collections::HashMap;
use std::fmt;

/// Key for stage cache lookup
#[derive(Hash, Eq, PartialEq, Clone, Debug)]
pub struct CacheKey {
    pub owner: String,
    pub kind: String,
}

impl CacheKey {
    pub fn new(owner: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            kind: kind.into(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.owner, self.kind)
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheStats {
    /// Hit rate (0.0 - 1.0)
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

/// Stage instances by (owner, kind). Nothing is removed unless an owner is
/// evicted explicitly.
#[derive(Default)]
pub struct StageCache {
    stages: HashMap<CacheKey, StageRef>,
    stats: CacheStats,
}

impl StageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create a stage
    pub fn get_or_create(
        &mut self,
        registry: &StageRegistry,
        owner: &str,
        kind: &str,
        args: StageArgs,
    ) -> Result<StageRef> {
        let key = CacheKey::new(owner, kind);

        if let Some(stage) = self.stages.get(&key) {
            log::trace!("Using cached stage: {}", key);
            self.stats.hits += 1;
            return Ok(stage.clone());
        }

        let stage = registry.create(kind, args)?;
        log::info!("Created stage: {}", key);
        self.stats.misses += 1;
        self.stages.insert(key, stage.clone());
        Ok(stage)
    }

    pub fn get(&self, owner: &str, kind: &str) -> Option<&StageRef> {
        self.stages.get(&CacheKey::new(owner, kind))
    }

    pub fn contains(&self, owner: &str, kind: &str) -> bool {
        self.get(owner, kind).is_some()
    }

    /// Drop every entry of one owner. Returns how many were removed.
    pub fn evict_owner(&mut self, owner: &str) -> usize {
        let before = self.stages.len();
        self.stages.retain(|key, _| key.owner != owner);
        let evicted = before - self.stages.len();
        if evicted > 0 {
            log::debug!("Evicted {} stages of '{}'", evicted, owner);
        }
        self.stats.evictions += evicted as u64;
        evicted
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::FxaaStage;
    use std::sync::Arc;
    use strata_core::Extent;

    #[test]
    fn test_hit_returns_same_instance_ignoring_args() {
        let registry = StageRegistry::new();
        let mut cache = StageCache::new();

        let first = cache
            .get_or_create(&registry, "layer", "Fxaa", StageArgs::viewport(Extent::new(100, 50)))
            .unwrap();
        let second = cache
            .get_or_create(&registry, "layer", "Fxaa", StageArgs::viewport(Extent::new(7, 7)).enabled(false))
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        let guard = second.lock();
        assert!(guard.is_enabled());
        let fxaa = guard.as_any().downcast_ref::<FxaaStage>().unwrap();
        assert_eq!(fxaa.inverse_resolution().x, 1.0 / 100.0);
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1, evictions: 0 });
    }

    #[test]
    fn test_owners_get_independent_instances() {
        let registry = StageRegistry::new();
        let mut cache = StageCache::new();
        let a = cache.get_or_create(&registry, "a", "Fxaa", StageArgs::none()).unwrap();
        let b = cache.get_or_create(&registry, "b", "Fxaa", StageArgs::none()).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_failed_construction_is_not_cached() {
        let registry = StageRegistry::new();
        let mut cache = StageCache::new();
        assert!(cache.get_or_create(&registry, "a", "Bokeh", StageArgs::none()).is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_evict_owner() {
        let registry = StageRegistry::new();
        let mut cache = StageCache::new();
        cache.get_or_create(&registry, "a", "Fxaa", StageArgs::none()).unwrap();
        cache
            .get_or_create(&registry, "a", "InitialBloom", StageArgs::viewport(Extent::new(4, 4)))
            .unwrap();
        cache.get_or_create(&registry, "b", "Fxaa", StageArgs::none()).unwrap();

        assert_eq!(cache.evict_owner("a"), 2);
        assert!(!cache.contains("a", "Fxaa"));
        assert!(cache.contains("b", "Fxaa"));
        assert_eq!(cache.stats().evictions, 2);
        assert_eq!(CacheKey::new("b", "Fxaa").to_string(), "b-Fxaa");
    }
}
