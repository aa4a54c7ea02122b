//! In-memory registry backend.
//!
//! Thread-safe implementation of `EngineRegistry`. It is the backend the
//! service uses by default and the reference implementation for tests.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::engine::{Engine, EngineId};
use crate::error::RegistryError;

use super::traits::EngineRegistry;

fn lock_err(context: &'static str) -> RegistryError {
    RegistryError::BackendError(format!("poisoned lock: {context}"))
}

fn normalize_name(s: &str) -> String {
    s.trim().to_ascii_lowercase()
}

#[derive(Debug, Default)]
struct RegistryState {
    by_id: HashMap<EngineId, Engine>,
    by_name: HashMap<String, EngineId>,
    order: Vec<EngineId>,
}

impl RegistryState {
    fn insert(&mut self, engine: Engine) -> Result<(), RegistryError> {
        if self.by_id.contains_key(&engine.id) {
            return Err(RegistryError::DuplicateKey(engine.id.to_string()));
        }
        let name_key = normalize_name(&engine.name);
        if self.by_name.contains_key(&name_key) {
            return Err(RegistryError::DuplicateKey(engine.name.clone()));
        }
        self.by_name.insert(name_key, engine.id.clone());
        self.order.push(engine.id.clone());
        self.by_id.insert(engine.id.clone(), engine);
        Ok(())
    }
}

/// In-memory engine registry preserving insertion order.
#[derive(Debug, Default)]
pub struct InMemoryEngineRegistry {
    state: RwLock<RegistryState>,
}

impl InMemoryEngineRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-populated with engines, in order.
    ///
    /// # Errors
    /// Returns `DuplicateKey` if two engines share an id or name.
    pub fn with_engines(engines: Vec<Engine>) -> Result<Self, RegistryError> {
        let registry = Self::new();
        registry.replace_all(engines)?;
        Ok(registry)
    }
}

impl EngineRegistry for InMemoryEngineRegistry {
    fn insert(&self, engine: Engine) -> Result<(), RegistryError> {
        let mut state = self.state.write().map_err(|_| lock_err("registry.insert"))?;
        state.insert(engine)
    }

    fn get(&self, id: &EngineId) -> Result<Option<Engine>, RegistryError> {
        let state = self.state.read().map_err(|_| lock_err("registry.get"))?;
        Ok(state.by_id.get(id).cloned())
    }

    fn find_by_name(&self, name: &str) -> Result<Option<Engine>, RegistryError> {
        let state = self.state.read().map_err(|_| lock_err("registry.find_by_name"))?;
        Ok(state
            .by_name
            .get(&normalize_name(name))
            .and_then(|id| state.by_id.get(id))
            .cloned())
    }

    fn set_hidden(&self, id: &EngineId, hidden: bool) -> Result<bool, RegistryError> {
        let mut state = self.state.write().map_err(|_| lock_err("registry.set_hidden"))?;
        let engine = state
            .by_id
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))?;
        if engine.hidden == hidden {
            return Ok(false);
        }
        engine.hidden = hidden;
        Ok(true)
    }

    fn delete(&self, id: &EngineId) -> Result<Engine, RegistryError> {
        let mut state = self.state.write().map_err(|_| lock_err("registry.delete"))?;
        let engine = state
            .by_id
            .remove(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))?;
        state.by_name.remove(&normalize_name(&engine.name));
        state.order.retain(|x| x != id);
        Ok(engine)
    }

    fn list(&self) -> Result<Vec<Engine>, RegistryError> {
        let state = self.state.read().map_err(|_| lock_err("registry.list"))?;
        Ok(state
            .order
            .iter()
            .filter_map(|id| state.by_id.get(id).cloned())
            .collect())
    }

    fn replace_all(&self, engines: Vec<Engine>) -> Result<(), RegistryError> {
        // Build the new state first so a duplicate leaves the old contents intact.
        let mut fresh = RegistryState::default();
        for engine in engines {
            fresh.insert(engine)?;
        }
        let mut state = self.state.write().map_err(|_| lock_err("registry.replace_all"))?;
        *state = fresh;
        Ok(())
    }
}
