//! Typed storage for the handful of shared, engine-owned object classes hosts look up by ID:
//! installed software, CDF tables, and plugin search paths. The engine just owns the map; it
//! never interprets what's inside.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Which class of shared object a registry entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryKind {
    Software,
    Cdfs,
    PluginPaths,
}

#[derive(Default)]
pub struct Registry {
    items: HashMap<(RegistryKind, u64), Arc<dyn Any + Send + Sync>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put<T: Any + Send + Sync>(&mut self, kind: RegistryKind, id: u64, item: T) {
        self.items.insert((kind, id), Arc::new(item));
    }

    pub fn get<T: Any + Send + Sync>(&self, kind: RegistryKind, id: u64) -> Option<Arc<T>> {
        self.items
            .get(&(kind, id))
            .cloned()
            .and_then(|item| item.downcast::<T>().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_and_get_round_trips_by_kind_and_id() {
        let mut registry = Registry::new();
        registry.put(RegistryKind::Software, 1, "nginx".to_string());
        registry.put(RegistryKind::Cdfs, 1, vec![1.0_f64, 2.0]);

        assert_eq!(
            *registry.get::<String>(RegistryKind::Software, 1).unwrap(),
            "nginx"
        );
        assert!(registry.get::<String>(RegistryKind::Cdfs, 1).is_none());
        assert!(registry.get::<String>(RegistryKind::Software, 2).is_none());
    }
}
