//! A two-level `src -> (dst -> Path)` cache layered over the topology graph.
//!
//! Split into two lock levels on purpose: once a source address has been queried once, every
//! subsequent lookup for a *different* destination from that same source only takes the inner
//! lock, so concurrent readers fanning out from many different sources never serialize on a
//! single cache-wide lock. The cache only grows; it is cleared only by an explicit
//! [`Topology::clear_path_cache`](crate::topology::Topology::clear_path_cache) call or by being
//! dropped.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::ids::AddressId;
use crate::topology::path::Path;

#[derive(Default)]
pub struct PathCache {
    outer: RwLock<HashMap<AddressId, RwLock<HashMap<AddressId, Path>>>>,
}

impl PathCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, src: AddressId, dst: AddressId) -> Option<Path> {
        let outer = self.outer.read().unwrap();
        outer
            .get(&src)
            .and_then(|inner| inner.read().unwrap().get(&dst).copied())
    }

    pub fn insert(&self, src: AddressId, dst: AddressId, path: Path) {
        // Fast path: the inner map for this source already exists, so we only need its lock.
        {
            let outer = self.outer.read().unwrap();
            if let Some(inner) = outer.get(&src) {
                inner.write().unwrap().insert(dst, path);
                return;
            }
        }

        // Slow path: no inner map yet for this source. Last-writer-wins is fine here since two
        // racing inserts for the same (src, dst) always compute functionally equal paths.
        let mut outer = self.outer.write().unwrap();
        outer
            .entry(src)
            .or_insert_with(|| RwLock::new(HashMap::new()))
            .write()
            .unwrap()
            .insert(dst, path);
    }

    pub fn clear(&self) {
        self.outer.write().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_then_hit() {
        let cache = PathCache::new();
        let a = AddressId::new(1);
        let b = AddressId::new(2);
        assert!(cache.get(a, b).is_none());
        cache.insert(a, b, Path::new(50.0, 1.0));
        assert_eq!(cache.get(a, b), Some(Path::new(50.0, 1.0)));
    }

    #[test]
    fn clear_drops_everything() {
        let cache = PathCache::new();
        let a = AddressId::new(1);
        let b = AddressId::new(2);
        cache.insert(a, b, Path::new(10.0, 0.5));
        cache.clear();
        assert!(cache.get(a, b).is_none());
    }
}
