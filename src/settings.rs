//! Persisted user settings.
//!
//! Only user modifications are stored: the two default ids, hidden
//! application engines and user-installed engines. Each default id carries a
//! blake3 verification hash salted with the profile-specific
//! `ServiceConfig::settings_salt`, so a default planted by editing the file
//! on disk is detected and ignored on load.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{SearchConfig, ServiceConfig};
use crate::context::BrowsingContext;
use crate::engine::{Engine, EngineId, Provenance};
use crate::error::{SearchResult, SettingsError};
use crate::notify::NotificationSink;
use crate::registry::EngineRegistry;
use crate::service::SearchService;

/// Current on-disk format version.
pub const SETTINGS_VERSION: u32 = 1;

/// Verification hash for a default engine id.
#[must_use]
pub fn verification_hash(salt: &str, id: &EngineId) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(salt.as_bytes());
    hasher.update(&[0]);
    hasher.update(id.as_str().as_bytes());
    hasher.finalize().to_hex().to_string()
}

/// Snapshot of user modifications.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSettings {
    pub version: u32,
    pub default_engine_id: EngineId,
    pub default_engine_id_hash: String,
    pub private_default_engine_id: EngineId,
    pub private_default_engine_id_hash: String,
    #[serde(default)]
    pub hidden_engines: Vec<EngineId>,
    #[serde(default)]
    pub user_engines: Vec<Engine>,
}

impl SearchSettings {
    /// The stored id for a context.
    #[must_use]
    pub const fn default_id(&self, context: BrowsingContext) -> &EngineId {
        match context {
            BrowsingContext::Normal => &self.default_engine_id,
            BrowsingContext::Private => &self.private_default_engine_id,
        }
    }

    /// Returns true if the stored id for `context` matches its hash.
    #[must_use]
    pub fn verify(&self, salt: &str, context: BrowsingContext) -> bool {
        let hash = match context {
            BrowsingContext::Normal => &self.default_engine_id_hash,
            BrowsingContext::Private => &self.private_default_engine_id_hash,
        };
        verification_hash(salt, self.default_id(context)) == *hash
    }

    /// Write as pretty JSON, replacing the file atomically.
    ///
    /// # Errors
    /// I/O or serialization failures.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let path = path.as_ref();
        let bytes = serde_json::to_vec_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        {
            let mut file = File::create(&tmp)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, path)?;
        debug!(path = %path.display(), "search settings saved");
        Ok(())
    }

    /// Read settings written by [`SearchSettings::save`].
    ///
    /// # Errors
    /// I/O or parse failures, or `UnsupportedVersion`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let bytes = fs::read(path.as_ref())?;
        let settings: Self = serde_json::from_slice(&bytes)?;
        settings.check_version()?;
        Ok(settings)
    }

    fn check_version(&self) -> Result<(), SettingsError> {
        if self.version == SETTINGS_VERSION {
            Ok(())
        } else {
            Err(SettingsError::UnsupportedVersion {
                found: self.version,
                expected: SETTINGS_VERSION,
            })
        }
    }
}

impl SearchService {
    /// Snapshot the current user modifications.
    ///
    /// # Errors
    /// Registry errors.
    pub fn settings(&self) -> SearchResult<SearchSettings> {
        let state = self.lock()?;
        let engines = self.registry.list()?;
        let defaults = &state.defaults;

        Ok(SearchSettings {
            version: SETTINGS_VERSION,
            default_engine_id: defaults.default_engine.clone(),
            default_engine_id_hash: verification_hash(
                &self.settings_salt,
                &defaults.default_engine,
            ),
            private_default_engine_id: defaults.default_private_engine.clone(),
            private_default_engine_id_hash: verification_hash(
                &self.settings_salt,
                &defaults.default_private_engine,
            ),
            hidden_engines: engines
                .iter()
                .filter(|e| e.is_app_provided() && e.hidden)
                .map(|e| e.id.clone())
                .collect(),
            user_engines: engines.into_iter().filter(|e| !e.is_app_provided()).collect(),
        })
    }

    /// Create a service and re-apply persisted settings on top of the baseline.
    ///
    /// Entries that no longer make sense are skipped with a warning: user
    /// engines whose name is taken, unknown hidden ids, and defaults that
    /// fail verification or name a missing engine. A verified default is kept
    /// even if its engine is hidden, as [`SearchService::set_default`] allows.
    /// No notifications are emitted.
    ///
    /// # Errors
    /// `UnsupportedVersion`, or registry errors.
    pub fn with_settings(
        config: SearchConfig,
        service_config: ServiceConfig,
        registry: Arc<dyn EngineRegistry>,
        sink: Arc<dyn NotificationSink>,
        settings: &SearchSettings,
    ) -> SearchResult<Self> {
        settings.check_version()?;
        let service = Self::new(config, service_config, registry, sink)?;

        {
            let mut state = service.lock()?;

            for engine in &settings.user_engines {
                let mut engine = engine.clone();
                engine.provenance = Provenance::UserInstalled;
                engine.hidden = false;
                if service.registry.find_by_name(&engine.name)?.is_some()
                    || service.registry.get(&engine.id)?.is_some()
                {
                    warn!(
                        engine = %engine.id,
                        name = %engine.name,
                        "skipping persisted engine that collides with an existing engine"
                    );
                    continue;
                }
                service.registry.insert(engine)?;
            }

            for id in &settings.hidden_engines {
                match service.registry.get(id)? {
                    Some(engine) if engine.is_app_provided() => {
                        service.registry.set_hidden(id, true)?;
                    }
                    _ => warn!(engine = %id, "ignoring unknown hidden engine in settings"),
                }
            }

            for context in BrowsingContext::ALL {
                let id = settings.default_id(context);
                if !settings.verify(&service.settings_salt, context) {
                    warn!(
                        %context,
                        engine = %id,
                        "default engine failed verification, using region default"
                    );
                    continue;
                }
                if service.registry.get(id)?.is_none() {
                    warn!(%context, engine = %id, "persisted default engine no longer exists");
                    continue;
                }
                state.defaults.set(context, id.clone());
            }

            info!(
                default = %state.defaults.default_engine,
                default_private = %state.defaults.default_private_engine,
                "search settings restored"
            );
        }

        Ok(service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_depends_on_salt_and_id() {
        let id = EngineId::new("default");
        let a = verification_hash("profile-a", &id);
        assert_eq!(a, verification_hash("profile-a", &id));
        assert_ne!(a, verification_hash("profile-b", &id));
        assert_ne!(a, verification_hash("profile-a", &EngineId::new("other")));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn salt_and_id_boundary_is_unambiguous() {
        assert_ne!(
            verification_hash("ab", &EngineId::new("c")),
            verification_hash("a", &EngineId::new("bc"))
        );
    }

    fn settings(salt: &str) -> SearchSettings {
        let normal = EngineId::new("a");
        let private = EngineId::new("b");
        SearchSettings {
            version: SETTINGS_VERSION,
            default_engine_id_hash: verification_hash(salt, &normal),
            default_engine_id: normal,
            private_default_engine_id_hash: verification_hash(salt, &private),
            private_default_engine_id: private,
            hidden_engines: Vec::new(),
            user_engines: Vec::new(),
        }
    }

    #[test]
    fn verify_detects_tampering() {
        let mut s = settings("salt");
        assert!(s.verify("salt", BrowsingContext::Normal));
        assert!(s.verify("salt", BrowsingContext::Private));
        assert!(!s.verify("other", BrowsingContext::Normal));

        s.private_default_engine_id = EngineId::new("planted");
        assert!(!s.verify("salt", BrowsingContext::Private));
        assert!(s.verify("salt", BrowsingContext::Normal));
    }

    #[test]
    fn version_check() {
        let mut s = settings("");
        assert!(s.check_version().is_ok());
        s.version = 7;
        assert!(matches!(
            s.check_version(),
            Err(SettingsError::UnsupportedVersion { found: 7, expected: 1 })
        ));
    }

    #[test]
    fn json_uses_camel_case() {
        let value = serde_json::to_value(settings("")).unwrap();
        assert!(value.get("defaultEngineIdHash").is_some());
        assert!(value.get("privateDefaultEngineId").is_some());
        assert!(value.get("userEngines").is_some());
    }
}
