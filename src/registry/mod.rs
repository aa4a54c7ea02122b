//! Engine registry.
//!
//! The registry holds every known engine in insertion order, together with
//! its visibility. The service is the only writer; the trait exists so that
//! embedders can back the registry with their own storage.

mod memory;
mod traits;

pub use memory::InMemoryEngineRegistry;
pub use traits::EngineRegistry;
