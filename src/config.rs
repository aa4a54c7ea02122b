//! Baseline engine configuration and service knobs.
//!
//! The baseline is read from a JSON array of records in the remote-settings
//! layout: one record per engine plus a single defaults record.
//!
//! ```json
//! [
//!   { "identifier": "default", "base": { "classification": "unknown" } },
//!   { "identifier": "generalEngine", "base": { "classification": "general" } },
//!   { "globalDefault": "default", "globalDefaultPrivate": "generalEngine" }
//! ]
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::context::BrowsingContext;
use crate::engine::{Classification, Engine, EngineId};
use crate::error::ConfigurationError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct EngineBase {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default)]
    classification: Classification,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EngineRecord {
    identifier: String,
    #[serde(default)]
    base: EngineBase,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DefaultsRecord {
    global_default: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    global_default_private: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum ConfigRecord {
    Engine(EngineRecord),
    Defaults(DefaultsRecord),
}

/// Validated baseline configuration.
///
/// Engine order is the configuration order and is canonical for every
/// "first engine" tie-break.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    engines: Vec<Engine>,
    global_default: EngineId,
    global_default_private: EngineId,
}

impl SearchConfig {
    /// Builds and validates a configuration.
    ///
    /// `global_default_private` defaults to `global_default` when `None`.
    /// Every engine is treated as application-provided and visible.
    ///
    /// # Errors
    /// Returns a `ConfigurationError` if the engine list is empty, contains
    /// blank or duplicate identifiers/names, or the globals are unknown.
    pub fn new(
        engines: Vec<Engine>,
        global_default: impl Into<EngineId>,
        global_default_private: Option<EngineId>,
    ) -> Result<Self, ConfigurationError> {
        let global_default = global_default.into();
        let global_default_private =
            global_default_private.unwrap_or_else(|| global_default.clone());

        if engines.is_empty() {
            return Err(ConfigurationError::NoEngines);
        }

        let mut ids = HashSet::new();
        let mut names = HashSet::new();
        let engines: Vec<Engine> = engines
            .into_iter()
            .map(|mut engine| {
                engine.hidden = false;
                engine.provenance = crate::engine::Provenance::ApplicationProvided;
                engine
            })
            .collect();

        for engine in &engines {
            if engine.id.as_str().trim().is_empty() {
                return Err(ConfigurationError::EmptyIdentifier);
            }
            if !ids.insert(engine.id.clone()) {
                return Err(ConfigurationError::DuplicateIdentifier {
                    id: engine.id.to_string(),
                });
            }
            if !names.insert(engine.name.to_ascii_lowercase()) {
                return Err(ConfigurationError::DuplicateName {
                    name: engine.name.clone(),
                });
            }
        }

        for (context, id) in [
            (BrowsingContext::Normal, &global_default),
            (BrowsingContext::Private, &global_default_private),
        ] {
            if !ids.contains(id) {
                return Err(ConfigurationError::UnknownGlobalDefault {
                    id: id.to_string(),
                    context,
                });
            }
        }

        Ok(Self {
            engines,
            global_default,
            global_default_private,
        })
    }

    /// Parses the remote-settings JSON record array.
    ///
    /// # Errors
    /// Returns `ConfigurationError::Malformed` for invalid JSON, and the
    /// validation errors of [`SearchConfig::new`].
    pub fn from_json(json: &str) -> Result<Self, ConfigurationError> {
        let records: Vec<ConfigRecord> =
            serde_json::from_str(json).map_err(|e| ConfigurationError::Malformed {
                message: e.to_string(),
            })?;

        let mut engines = Vec::new();
        let mut defaults: Option<DefaultsRecord> = None;

        for record in records {
            match record {
                ConfigRecord::Engine(rec) => {
                    let mut engine = Engine::app_provided(rec.identifier, rec.base.classification);
                    if let Some(name) = rec.base.name {
                        engine = engine.with_name(name);
                    }
                    engines.push(engine);
                }
                ConfigRecord::Defaults(rec) => {
                    if defaults.replace(rec).is_some() {
                        return Err(ConfigurationError::MultipleDefaultsRecords);
                    }
                }
            }
        }

        let defaults = defaults.ok_or(ConfigurationError::MissingGlobalDefault)?;
        Self::new(
            engines,
            defaults.global_default,
            defaults.global_default_private.map(EngineId::from),
        )
    }

    /// Serializes back to the remote-settings record layout.
    ///
    /// # Errors
    /// Returns `ConfigurationError::Malformed` if serialization fails.
    pub fn to_json(&self) -> Result<String, ConfigurationError> {
        let mut records: Vec<ConfigRecord> = self
            .engines
            .iter()
            .map(|engine| {
                ConfigRecord::Engine(EngineRecord {
                    identifier: engine.id.to_string(),
                    base: EngineBase {
                        name: (engine.name != engine.id.as_str()).then(|| engine.name.clone()),
                        classification: engine.classification.clone(),
                    },
                })
            })
            .collect();
        records.push(ConfigRecord::Defaults(DefaultsRecord {
            global_default: self.global_default.to_string(),
            global_default_private: (self.global_default_private != self.global_default)
                .then(|| self.global_default_private.to_string()),
        }));
        serde_json::to_string_pretty(&records).map_err(|e| ConfigurationError::Malformed {
            message: e.to_string(),
        })
    }

    /// Baseline engines in configuration order.
    #[must_use]
    pub fn engines(&self) -> &[Engine] {
        &self.engines
    }

    /// The region/locale default engine for a browsing context.
    #[must_use]
    pub fn app_default(&self, context: BrowsingContext) -> &EngineId {
        match context {
            BrowsingContext::Normal => &self.global_default,
            BrowsingContext::Private => &self.global_default_private,
        }
    }

    /// Returns true if the id names a configured engine.
    #[must_use]
    pub fn contains(&self, id: &EngineId) -> bool {
        self.engines.iter().any(|e| &e.id == id)
    }
}

/// Runtime knobs for `SearchService`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// When false, private browsing uses the normal default engine.
    pub separate_private_default: bool,
    /// Salt mixed into settings verification hashes (typically the profile name).
    pub settings_salt: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            separate_private_default: true,
            settings_salt: String::new(),
        }
    }
}
