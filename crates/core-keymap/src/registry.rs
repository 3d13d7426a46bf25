//! Named key-map registry.
//!
//! The line reader holds one registry and a current-map name; switching
//! between `emacs` and `vi-*` maps at runtime is a rename, not a rebuild.

use crate::KeyMap;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct KeymapRegistry {
    maps: HashMap<String, KeyMap>,
}

impl KeymapRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) a map under its own name.
    pub fn insert(&mut self, map: KeyMap) {
        debug!(target: "keymap.registry", name = map.name(), "map registered");
        self.maps.insert(map.name().to_string(), map);
    }

    pub fn get(&self, name: &str) -> Option<&KeyMap> {
        self.maps.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut KeyMap> {
        self.maps.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.maps.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.maps.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::standard_registry;

    #[test]
    fn standard_names_present() {
        let reg = standard_registry();
        for name in ["emacs", "emacs-meta", "emacs-ctlx", "vi-insert", "vi-command"] {
            assert!(reg.contains(name), "missing map {name}");
        }
    }

    #[test]
    fn replace_updates_in_place() {
        let mut reg = standard_registry();
        let fresh = KeyMap::new("emacs");
        reg.insert(fresh);
        // The replacement is empty: no binding for C-a anymore.
        assert!(matches!(
            reg.get("emacs").unwrap().lookup(&[0x01]),
            crate::Lookup::Missing
        ));
    }
}
