//! Abstract registry trait.

use crate::engine::{Engine, EngineId};
use crate::error::RegistryError;

/// Storage contract for the engine set.
///
/// # Ordering
/// `list` returns engines in insertion order. `replace_all` establishes a
/// new order. Fallback tie-breaks depend on this order, so implementations
/// must preserve it exactly.
pub trait EngineRegistry: Send + Sync {
    /// Insert a new engine at the end. Returns error if the id or name exists.
    fn insert(&self, engine: Engine) -> Result<(), RegistryError>;

    /// Get an engine by id.
    fn get(&self, id: &EngineId) -> Result<Option<Engine>, RegistryError>;

    /// Find an engine by name, ignoring ASCII case.
    fn find_by_name(&self, name: &str) -> Result<Option<Engine>, RegistryError>;

    /// Set the hidden flag. Returns true if the flag changed.
    fn set_hidden(&self, id: &EngineId, hidden: bool) -> Result<bool, RegistryError>;

    /// Delete an engine, returning it. Returns error if not found.
    fn delete(&self, id: &EngineId) -> Result<Engine, RegistryError>;

    /// All engines in order, hidden ones included.
    fn list(&self) -> Result<Vec<Engine>, RegistryError>;

    /// Replace the whole contents, keeping the given order.
    fn replace_all(&self, engines: Vec<Engine>) -> Result<(), RegistryError>;

    /// Visible engines in order.
    fn list_visible(&self) -> Result<Vec<Engine>, RegistryError> {
        Ok(self.list()?.into_iter().filter(Engine::is_visible).collect())
    }
}
