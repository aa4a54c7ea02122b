//! # search-defaults
//!
//! Keeps track of the installed search engines and of which engine is the
//! default for normal and for private browsing, falling back
//! deterministically whenever the current default is removed or hidden.
//!
//! ## Core Concepts
//!
//! - **Engine**: a search provider, either application-provided (removing it
//!   hides it) or user-installed (removing it deletes it)
//! - **Region default**: the configured baseline default per browsing context
//! - **Fallback**: region default, then first visible `general` engine, then
//!   first visible engine, then unhide the region default
//! - **Notifications**: ordered `EngineModified` records per operation
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use search_defaults::{
//!     BrowsingContext, ChangeReason, CollectingSink, EngineId, SearchConfig, SearchService,
//! };
//!
//! let config = SearchConfig::from_json(r#"[
//!     { "identifier": "default", "base": { "classification": "unknown" } },
//!     { "identifier": "generalEngine", "base": { "classification": "general" } },
//!     { "identifier": "otherEngine", "base": { "classification": "unknown" } },
//!     { "globalDefault": "default" }
//! ]"#)?;
//!
//! let sink = Arc::new(CollectingSink::new());
//! let service = SearchService::in_memory(config, sink.clone())?;
//!
//! let other = EngineId::new("otherEngine");
//! service.set_default(BrowsingContext::Normal, &other, ChangeReason::UserSetting)?;
//! service.remove_engine(&other)?;
//!
//! assert_eq!(service.get_default(BrowsingContext::Normal)?.name, "default");
//! # Ok::<(), search_defaults::SearchError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod notify;
pub mod registry;
pub mod resolver;
pub mod service;
pub mod settings;

// Re-export primary types at crate root for convenience
pub use config::{SearchConfig, ServiceConfig};
pub use context::{BrowsingContext, ChangeReason};
pub use engine::{Classification, Engine, EngineDefinition, EngineId, Provenance, Removal};
pub use error::{
    ConfigurationError, ExecutionError, RegistryError, SearchError, SearchResult, SettingsError,
};
pub use notify::{
    ChannelSink, CollectingSink, EngineModified, ModifiedType, NotificationSink,
    NotificationStream, NullSink, Observers, SubscriptionId,
};
pub use registry::{EngineRegistry, InMemoryEngineRegistry};
pub use resolver::{find_fallback, FallbackTier, Resolution};
pub use service::{DefaultState, SearchService};
pub use settings::{verification_hash, SearchSettings, SETTINGS_VERSION};
