//! The search service.
//!
//! `SearchService` owns the default slots, applies every mutation to the
//! registry, runs fallback resolution when a default goes away and emits the
//! resulting notifications.
//!
//! # Atomicity
//!
//! Each public operation holds the service lock from validation to
//! notification delivery. Validation (including fallback resolution, which
//! is pure) happens before the first write, so a failed operation leaves no
//! trace.
//!
//! # Notification order for `remove_engine`
//!
//! 1. `CHANGED` for each engine unhidden by a last-resort fallback
//! 2. `DEFAULT`, then `DEFAULT_PRIVATE`, for reassigned slots
//! 3. `CHANGED` for the hide (application-provided engines only), then `REMOVED`

use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{SearchConfig, ServiceConfig};
use crate::context::{BrowsingContext, ChangeReason};
use crate::engine::{Engine, EngineDefinition, EngineId, Removal};
use crate::error::{ConfigurationError, ExecutionError, SearchError, SearchResult};
use crate::notify::{EngineModified, ModifiedType, NotificationSink, NullSink};
use crate::registry::{EngineRegistry, InMemoryEngineRegistry};
use crate::resolver::{find_fallback, Resolution};

/// The two default slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultState {
    /// Default engine for normal browsing.
    pub default_engine: EngineId,
    /// Default engine for private browsing.
    pub default_private_engine: EngineId,
}

impl DefaultState {
    /// Both slots set to the configured region defaults.
    #[must_use]
    pub fn baseline(config: &SearchConfig) -> Self {
        Self {
            default_engine: config.app_default(BrowsingContext::Normal).clone(),
            default_private_engine: config.app_default(BrowsingContext::Private).clone(),
        }
    }

    /// The slot for a context.
    #[must_use]
    pub const fn get(&self, context: BrowsingContext) -> &EngineId {
        match context {
            BrowsingContext::Normal => &self.default_engine,
            BrowsingContext::Private => &self.default_private_engine,
        }
    }

    pub(crate) fn set(&mut self, context: BrowsingContext, id: EngineId) {
        match context {
            BrowsingContext::Normal => self.default_engine = id,
            BrowsingContext::Private => self.default_private_engine = id,
        }
    }
}

#[derive(Debug)]
pub(crate) struct ServiceState {
    pub(crate) defaults: DefaultState,
    pub(crate) separate_private_default: bool,
}

impl ServiceState {
    /// The slot that actually answers queries for `context`.
    fn effective(&self, context: BrowsingContext) -> &EngineId {
        if context.is_private() && !self.separate_private_default {
            self.defaults.get(BrowsingContext::Normal)
        } else {
            self.defaults.get(context)
        }
    }

    fn notifies(&self, context: BrowsingContext) -> bool {
        !context.is_private() || self.separate_private_default
    }
}

/// Default search engine service.
pub struct SearchService {
    pub(crate) config: SearchConfig,
    pub(crate) settings_salt: String,
    pub(crate) registry: Arc<dyn EngineRegistry>,
    sink: Arc<dyn NotificationSink>,
    pub(crate) state: Mutex<ServiceState>,
}

impl std::fmt::Debug for SearchService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchService")
            .field("config", &self.config)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl SearchService {
    /// Create a service over `registry`, resetting it to the configured baseline.
    ///
    /// # Errors
    /// Returns a registry error if the baseline cannot be written.
    pub fn new(
        config: SearchConfig,
        service_config: ServiceConfig,
        registry: Arc<dyn EngineRegistry>,
        sink: Arc<dyn NotificationSink>,
    ) -> SearchResult<Self> {
        registry.replace_all(config.engines().to_vec())?;
        let defaults = DefaultState::baseline(&config);
        info!(
            engines = config.engines().len(),
            default = %defaults.default_engine,
            default_private = %defaults.default_private_engine,
            "search service initialized"
        );
        Ok(Self {
            config,
            settings_salt: service_config.settings_salt,
            registry,
            sink,
            state: Mutex::new(ServiceState {
                defaults,
                separate_private_default: service_config.separate_private_default,
            }),
        })
    }

    /// Create a service backed by an in-memory registry.
    ///
    /// # Errors
    /// See [`SearchService::new`].
    pub fn in_memory(config: SearchConfig, sink: Arc<dyn NotificationSink>) -> SearchResult<Self> {
        Self::new(
            config,
            ServiceConfig::default(),
            Arc::new(InMemoryEngineRegistry::new()),
            sink,
        )
    }

    /// Create an in-memory service that discards notifications.
    ///
    /// # Errors
    /// See [`SearchService::new`].
    pub fn detached(config: SearchConfig) -> SearchResult<Self> {
        Self::in_memory(config, Arc::new(NullSink))
    }

    pub(crate) fn lock(&self) -> SearchResult<MutexGuard<'_, ServiceState>> {
        self.state
            .lock()
            .map_err(|_| SearchError::internal("search service lock poisoned"))
    }

    fn require(&self, id: &EngineId) -> SearchResult<Engine> {
        self.registry
            .get(id)?
            .ok_or_else(|| SearchError::engine_not_found(id.clone()))
    }

    fn publish(&self, events: &[EngineModified]) {
        if !events.is_empty() {
            self.sink.deliver(events);
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// The baseline configuration.
    #[must_use]
    pub const fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// The current default engine for a context.
    ///
    /// # Errors
    /// Internal error if the slot refers to an engine missing from the registry.
    pub fn get_default(&self, context: BrowsingContext) -> SearchResult<Engine> {
        let state = self.lock()?;
        let id = state.effective(context);
        self.registry
            .get(id)?
            .ok_or_else(|| {
                SearchError::internal(format!("{context} default '{id}' is not registered"))
            })
    }

    /// The current private-browsing default engine.
    ///
    /// # Errors
    /// See [`SearchService::get_default`].
    pub fn get_default_private(&self) -> SearchResult<Engine> {
        self.get_default(BrowsingContext::Private)
    }

    /// A copy of both default slots.
    ///
    /// # Errors
    /// Internal error if the service lock is poisoned.
    pub fn default_state(&self) -> SearchResult<DefaultState> {
        Ok(self.lock()?.defaults.clone())
    }

    /// The configured region/locale default engine for a context.
    ///
    /// # Errors
    /// Not found if the registry lost the engine.
    pub fn app_default(&self, context: BrowsingContext) -> SearchResult<Engine> {
        let _state = self.lock()?;
        self.require(self.config.app_default(context))
    }

    /// Visible engines in registry order.
    ///
    /// # Errors
    /// Registry errors.
    pub fn get_visible_engines(&self) -> SearchResult<Vec<Engine>> {
        let _state = self.lock()?;
        Ok(self.registry.list_visible()?)
    }

    /// All engines in registry order, hidden ones included.
    ///
    /// # Errors
    /// Registry errors.
    pub fn get_engines(&self) -> SearchResult<Vec<Engine>> {
        let _state = self.lock()?;
        Ok(self.registry.list()?)
    }

    /// Look up an engine by id.
    ///
    /// # Errors
    /// Registry errors.
    pub fn get_engine(&self, id: &EngineId) -> SearchResult<Option<Engine>> {
        let _state = self.lock()?;
        Ok(self.registry.get(id)?)
    }

    /// Look up an engine by name, ignoring ASCII case.
    ///
    /// # Errors
    /// Registry errors.
    pub fn get_engine_by_name(&self, name: &str) -> SearchResult<Option<Engine>> {
        let _state = self.lock()?;
        Ok(self.registry.find_by_name(name)?)
    }

    /// Whether private browsing has its own default.
    ///
    /// # Errors
    /// Internal error if the service lock is poisoned.
    pub fn separate_private_default(&self) -> SearchResult<bool> {
        Ok(self.lock()?.separate_private_default)
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Set the default engine for a context.
    ///
    /// Visibility is left untouched. Setting the engine a slot already holds
    /// is a no-op.
    ///
    /// # Errors
    /// `EngineNotFound` if `id` is unknown; nothing is changed.
    pub fn set_default(
        &self,
        context: BrowsingContext,
        id: &EngineId,
        reason: ChangeReason,
    ) -> SearchResult<Vec<EngineModified>> {
        let mut state = self.lock()?;
        let engine = self.require(id)?;

        if state.defaults.get(context) == id {
            debug!(%context, engine = %id, "default unchanged");
            return Ok(Vec::new());
        }

        state.defaults.set(context, id.clone());
        info!(%context, engine = %id, ?reason, "default engine set");

        let mut events = Vec::new();
        if state.notifies(context) {
            events.push(EngineModified::default_changed(context, engine, reason));
        }
        self.publish(&events);
        Ok(events)
    }

    /// Remove an engine.
    ///
    /// Application-provided engines are hidden, user-installed engines are
    /// deleted. Default slots pointing at the engine fall back as described
    /// in [`crate::resolver`].
    ///
    /// # Errors
    /// `EngineNotFound` if `id` is unknown, `NoFallbackCandidate` if a
    /// default slot would be left without any engine. Nothing is changed on
    /// error.
    pub fn remove_engine(&self, id: &EngineId) -> SearchResult<Vec<EngineModified>> {
        let mut state = self.lock()?;
        let engine = self.require(id)?;
        let removal = engine.removal();
        let already_removed = removal == Removal::Hide && engine.hidden;

        // Resolve both slots before any write. Engines restored for the
        // first slot are offered to the second.
        let snapshot = self.registry.list()?;
        let mut reassigned: Vec<(BrowsingContext, Resolution)> = Vec::new();
        let mut restored: Vec<EngineId> = Vec::new();
        for context in BrowsingContext::ALL {
            if state.defaults.get(context) != id {
                continue;
            }
            let region = self.config.app_default(context);
            let resolution = find_fallback(&snapshot, context, region, id, &restored)
                .ok_or(ConfigurationError::NoFallbackCandidate { context })?;
            if resolution.unhide {
                restored.push(resolution.engine.clone());
            }
            reassigned.push((context, resolution));
        }

        if already_removed && reassigned.is_empty() {
            debug!(engine = %id, "engine already hidden");
            return Ok(Vec::new());
        }

        let mut events = Vec::new();

        for engine in &restored {
            if self.registry.set_hidden(engine, false)? {
                info!(engine = %engine, "unhid engine as last-resort default");
                events.push(EngineModified::new(ModifiedType::Changed, self.require(engine)?));
            }
        }

        for (context, resolution) in &reassigned {
            state.defaults.set(*context, resolution.engine.clone());
            info!(
                %context,
                removed = %id,
                engine = %resolution.engine,
                tier = %resolution.tier,
                "default engine fell back"
            );
            if state.notifies(*context) {
                events.push(EngineModified::default_changed(
                    *context,
                    self.require(&resolution.engine)?,
                    ChangeReason::EngineRemoved,
                ));
            }
        }

        if !already_removed {
            match removal {
                Removal::Hide => {
                    self.registry.set_hidden(id, true)?;
                    let hidden = self.require(id)?;
                    events.push(EngineModified::new(ModifiedType::Changed, hidden.clone()));
                    events.push(EngineModified::new(ModifiedType::Removed, hidden));
                }
                Removal::Delete => {
                    let deleted = self.registry.delete(id)?;
                    events.push(EngineModified::new(ModifiedType::Removed, deleted));
                }
            }
            info!(engine = %id, ?removal, "engine removed");
        }

        self.publish(&events);
        Ok(events)
    }

    /// Reset engines and defaults to the configured baseline.
    ///
    /// Unhides every application-provided engine, deletes user-installed
    /// engines and points both slots at the region defaults. Calling it on
    /// the baseline emits nothing.
    ///
    /// # Errors
    /// Registry errors.
    pub fn restore_default_engines(&self) -> SearchResult<Vec<EngineModified>> {
        let mut state = self.lock()?;
        let current = self.registry.list()?;
        let baseline = DefaultState::baseline(&self.config);

        self.registry.replace_all(self.config.engines().to_vec())?;

        let mut events = Vec::new();
        for engine in current.iter().filter(|e| e.is_app_provided() && e.hidden) {
            events.push(EngineModified::new(
                ModifiedType::Changed,
                self.require(&engine.id)?,
            ));
        }

        for context in BrowsingContext::ALL {
            let target = baseline.get(context);
            if state.defaults.get(context) == target {
                continue;
            }
            state.defaults.set(context, target.clone());
            if state.notifies(context) {
                events.push(EngineModified::default_changed(
                    context,
                    self.require(target)?,
                    ChangeReason::RestoreDefaults,
                ));
            }
        }

        for engine in current.into_iter().filter(|e| !e.is_app_provided()) {
            events.push(EngineModified::new(ModifiedType::Removed, engine));
        }

        if events.is_empty() {
            debug!("engines already at baseline");
        } else {
            info!(changes = events.len(), "restored default engines");
        }
        self.publish(&events);
        Ok(events)
    }

    /// Install a user engine at the end of the registry.
    ///
    /// # Errors
    /// `Validation` for a blank name, `EngineAlreadyExists` if the name is taken.
    pub fn add_engine(&self, definition: EngineDefinition) -> SearchResult<Engine> {
        let name = definition.name.trim();
        if name.is_empty() {
            return Err(ExecutionError::Validation {
                reason: "engine name cannot be empty".to_string(),
            }
            .into());
        }

        let _state = self.lock()?;
        if self.registry.find_by_name(name)?.is_some() {
            return Err(ExecutionError::EngineAlreadyExists {
                name: name.to_string(),
            }
            .into());
        }

        let engine = Engine::user_installed(name, definition.classification);
        self.registry.insert(engine.clone())?;
        info!(engine = %engine.id, name = %engine.name, "user engine added");

        self.publish(&[EngineModified::new(ModifiedType::Added, engine.clone())]);
        Ok(engine)
    }

    /// Enable or disable a separate private-browsing default.
    ///
    /// Emits `DEFAULT_PRIVATE` when the engine answering private queries changes.
    ///
    /// # Errors
    /// Registry errors.
    pub fn set_separate_private_default(&self, enabled: bool) -> SearchResult<Vec<EngineModified>> {
        let mut state = self.lock()?;
        if state.separate_private_default == enabled {
            return Ok(Vec::new());
        }

        let before = state.effective(BrowsingContext::Private).clone();
        state.separate_private_default = enabled;
        let after = state.effective(BrowsingContext::Private).clone();
        info!(enabled, "separate private default toggled");

        let mut events = Vec::new();
        if before != after {
            events.push(EngineModified::default_changed(
                BrowsingContext::Private,
                self.require(&after)?,
                ChangeReason::UserPrivateSplit,
            ));
        }
        self.publish(&events);
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::notify::CollectingSink;

    const CONFIG: &str = r#"[
        { "identifier": "default", "base": { "classification": "unknown" } },
        { "identifier": "defaultPrivate", "base": { "classification": "unknown" } },
        { "identifier": "generalEngine", "base": { "classification": "general" } },
        { "identifier": "otherEngine", "base": { "classification": "unknown" } },
        { "globalDefault": "default", "globalDefaultPrivate": "defaultPrivate" }
    ]"#;

    fn service() -> (SearchService, Arc<CollectingSink>) {
        let sink = Arc::new(CollectingSink::new());
        let config = SearchConfig::from_json(CONFIG).unwrap();
        let service = SearchService::in_memory(config, sink.clone()).unwrap();
        (service, sink)
    }

    fn id(s: &str) -> EngineId {
        EngineId::new(s)
    }

    fn kinds(events: &[EngineModified]) -> Vec<(ModifiedType, String)> {
        events
            .iter()
            .map(|e| (e.kind, e.engine.id.to_string()))
            .collect()
    }

    #[test]
    fn starts_at_region_defaults() {
        let (service, sink) = service();
        assert_eq!(service.get_default(BrowsingContext::Normal).unwrap().name, "default");
        assert_eq!(service.get_default_private().unwrap().name, "defaultPrivate");
        assert_eq!(service.get_visible_engines().unwrap().len(), 4);
        assert!(sink.is_empty());
    }

    #[test]
    fn set_default_unknown_engine_fails_without_change() {
        let (service, sink) = service();
        let err = service
            .set_default(BrowsingContext::Normal, &id("nope"), ChangeReason::Unknown)
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(service.get_default(BrowsingContext::Normal).unwrap().name, "default");
        assert!(sink.is_empty());
    }

    #[test]
    fn set_default_emits_once_and_noop_when_same() {
        let (service, sink) = service();
        let events = service
            .set_default(BrowsingContext::Private, &id("otherEngine"), ChangeReason::UserSetting)
            .unwrap();
        assert_eq!(
            kinds(&events),
            [(ModifiedType::DefaultPrivate, "otherEngine".to_string())]
        );
        assert_eq!(events[0].reason, Some(ChangeReason::UserSetting));
        assert_eq!(sink.take().len(), 1);

        let again = service
            .set_default(BrowsingContext::Private, &id("otherEngine"), ChangeReason::UserSetting)
            .unwrap();
        assert!(again.is_empty());
        assert!(sink.is_empty());
    }

    #[test]
    fn set_default_does_not_touch_visibility() {
        let (service, _sink) = service();
        service.remove_engine(&id("otherEngine")).unwrap();
        service
            .set_default(BrowsingContext::Normal, &id("otherEngine"), ChangeReason::Unknown)
            .unwrap();
        let engine = service.get_default(BrowsingContext::Normal).unwrap();
        assert_eq!(engine.name, "otherEngine");
        assert!(engine.hidden);
    }

    #[test]
    fn removing_non_default_emits_hide_and_remove_only() {
        let (service, _sink) = service();
        let events = service.remove_engine(&id("generalEngine")).unwrap();
        assert_eq!(
            kinds(&events),
            [
                (ModifiedType::Changed, "generalEngine".to_string()),
                (ModifiedType::Removed, "generalEngine".to_string()),
            ]
        );
        assert!(events[0].engine.hidden);
    }

    #[test]
    fn removing_hidden_engine_again_is_a_noop() {
        let (service, _sink) = service();
        service.remove_engine(&id("generalEngine")).unwrap();
        assert!(service.remove_engine(&id("generalEngine")).unwrap().is_empty());
    }

    #[test]
    fn removing_unknown_engine_fails() {
        let (service, _sink) = service();
        assert!(service.remove_engine(&id("nope")).unwrap_err().is_not_found());
    }

    #[test]
    fn removing_shared_default_resolves_both_slots() {
        let (service, _sink) = service();
        service
            .set_default(BrowsingContext::Private, &id("otherEngine"), ChangeReason::Unknown)
            .unwrap();
        service
            .set_default(BrowsingContext::Normal, &id("otherEngine"), ChangeReason::Unknown)
            .unwrap();

        let events = service.remove_engine(&id("otherEngine")).unwrap();
        assert_eq!(
            kinds(&events),
            [
                (ModifiedType::Default, "default".to_string()),
                (ModifiedType::DefaultPrivate, "defaultPrivate".to_string()),
                (ModifiedType::Changed, "otherEngine".to_string()),
                (ModifiedType::Removed, "otherEngine".to_string()),
            ]
        );
        assert!(events[..2]
            .iter()
            .all(|e| e.reason == Some(ChangeReason::EngineRemoved)));
    }

    #[test]
    fn hidden_default_is_reresolved_without_remove_events() {
        let (service, _sink) = service();
        service.remove_engine(&id("otherEngine")).unwrap();
        service
            .set_default(BrowsingContext::Normal, &id("otherEngine"), ChangeReason::Unknown)
            .unwrap();
        let events = service.remove_engine(&id("otherEngine")).unwrap();
        assert_eq!(kinds(&events), [(ModifiedType::Default, "default".to_string())]);
    }

    #[test]
    fn cannot_remove_the_only_engine_while_default() {
        let config = SearchConfig::from_json(
            r#"[{ "identifier": "solo" }, { "globalDefault": "solo" }]"#,
        )
        .unwrap();
        let service = SearchService::detached(config).unwrap();
        let err = service.remove_engine(&id("solo")).unwrap_err();
        assert!(err.is_configuration());
        assert!(service.get_default(BrowsingContext::Normal).unwrap().is_visible());
    }

    #[test]
    fn add_engine_appends_and_rejects_duplicates() {
        let (service, sink) = service();
        let engine = service
            .add_engine(EngineDefinition::new("  My Search "))
            .unwrap();
        assert_eq!(engine.name, "My Search");
        assert!(!engine.is_app_provided());
        assert_eq!(
            service.get_engines().unwrap().last().map(|e| e.id.clone()),
            Some(engine.id.clone())
        );
        assert_eq!(kinds(&sink.take()), [(ModifiedType::Added, engine.id.to_string())]);

        let err = service.add_engine(EngineDefinition::new("my search")).unwrap_err();
        assert!(matches!(
            err,
            SearchError::Execution(ExecutionError::EngineAlreadyExists { .. })
        ));
        let err = service.add_engine(EngineDefinition::new("   ")).unwrap_err();
        assert!(matches!(
            err,
            SearchError::Execution(ExecutionError::Validation { .. })
        ));
    }

    #[test]
    fn user_engine_removal_deletes_without_changed() {
        let (service, _sink) = service();
        let engine = service.add_engine(EngineDefinition::new("Added")).unwrap();
        service
            .set_default(BrowsingContext::Normal, &engine.id, ChangeReason::Unknown)
            .unwrap();
        let events = service.remove_engine(&engine.id).unwrap();
        assert_eq!(
            kinds(&events),
            [
                (ModifiedType::Default, "default".to_string()),
                (ModifiedType::Removed, engine.id.to_string()),
            ]
        );
        assert!(service.get_engine(&engine.id).unwrap().is_none());
    }

    #[test]
    fn restore_is_idempotent() {
        let (service, _sink) = service();
        service.add_engine(EngineDefinition::new("Added")).unwrap();
        service.remove_engine(&id("default")).unwrap();
        service
            .set_default(BrowsingContext::Private, &id("otherEngine"), ChangeReason::Unknown)
            .unwrap();

        let events = service.restore_default_engines().unwrap();
        let got: Vec<ModifiedType> = events.iter().map(|e| e.kind).collect();
        assert_eq!(
            got,
            [
                ModifiedType::Changed,
                ModifiedType::Default,
                ModifiedType::DefaultPrivate,
                ModifiedType::Removed,
            ]
        );
        assert_eq!(service.get_engines().unwrap(), service.config().engines());
        assert_eq!(
            service.default_state().unwrap(),
            DefaultState::baseline(service.config())
        );
        assert!(service.restore_default_engines().unwrap().is_empty());
    }

    #[test]
    fn private_follows_normal_when_not_separate() {
        let (service, sink) = service();
        let events = service.set_separate_private_default(false).unwrap();
        assert_eq!(kinds(&events), [(ModifiedType::DefaultPrivate, "default".to_string())]);
        assert_eq!(service.get_default_private().unwrap().name, "default");
        sink.take();

        // Private slot changes are tracked silently.
        let events = service
            .set_default(BrowsingContext::Private, &id("otherEngine"), ChangeReason::Unknown)
            .unwrap();
        assert!(events.is_empty());
        assert_eq!(service.get_default_private().unwrap().name, "default");

        let events = service.set_separate_private_default(true).unwrap();
        assert_eq!(
            kinds(&events),
            [(ModifiedType::DefaultPrivate, "otherEngine".to_string())]
        );
        assert!(service.set_separate_private_default(true).unwrap().is_empty());
    }
}
