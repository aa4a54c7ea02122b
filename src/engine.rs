//! Search engine types.
//!
//! An `Engine` is a named search provider with a classification, a
//! visibility flag and a provenance. Provenance decides what "removing" the
//! engine means: application-provided engines are only ever hidden, while
//! user-installed engines are deleted outright.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable engine identifier.
///
/// Application-provided engines use their configuration identifier.
/// User-installed engines receive a random UUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EngineId(String);

impl EngineId {
    /// Wraps an identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Creates a new random identifier for a user-installed engine.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EngineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EngineId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for EngineId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for EngineId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Configuration-assigned engine category.
///
/// `General` engines are preferred by the fallback over everything else.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Classification {
    /// A broad-purpose web search engine.
    General,
    /// No classification given.
    Unknown,
    /// Any other named category (shopping, reference, ...).
    Other(String),
}

impl Classification {
    /// Returns true for general-purpose engines.
    #[must_use]
    pub const fn is_general(&self) -> bool {
        matches!(self, Self::General)
    }
}

impl Default for Classification {
    fn default() -> Self {
        Self::Unknown
    }
}

impl TryFrom<String> for Classification {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let value = value.trim();
        if value.is_empty() {
            return Err("classification cannot be empty".to_string());
        }
        Ok(if value.eq_ignore_ascii_case("general") {
            Self::General
        } else if value.eq_ignore_ascii_case("unknown") {
            Self::Unknown
        } else {
            Self::Other(value.to_ascii_lowercase())
        })
    }
}

impl From<Classification> for String {
    fn from(value: Classification) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::General => f.write_str("general"),
            Self::Unknown => f.write_str("unknown"),
            Self::Other(name) => f.write_str(name),
        }
    }
}

/// Where an engine came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    /// Shipped by the application configuration.
    ApplicationProvided,
    /// Installed by the user (e.g. from an OpenSearch description).
    UserInstalled,
}

/// What removing an engine does to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// Keep the engine but mark it hidden.
    Hide,
    /// Delete the engine from the registry.
    Delete,
}

impl Removal {
    /// Selects the removal strategy for an engine's provenance.
    #[must_use]
    pub const fn for_provenance(provenance: Provenance) -> Self {
        match provenance {
            Provenance::ApplicationProvided => Self::Hide,
            Provenance::UserInstalled => Self::Delete,
        }
    }
}

/// A search engine known to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engine {
    /// Unique identifier.
    pub id: EngineId,
    /// Display name, unique ignoring ASCII case.
    pub name: String,
    /// Category used by the fallback.
    #[serde(default)]
    pub classification: Classification,
    /// Hidden engines are excluded from user-facing lists and fallback candidacy.
    #[serde(default)]
    pub hidden: bool,
    /// Where the engine came from.
    pub provenance: Provenance,
}

impl Engine {
    /// Creates a visible application-provided engine named after its identifier.
    #[must_use]
    pub fn app_provided(id: impl Into<String>, classification: Classification) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id: EngineId(id),
            classification,
            hidden: false,
            provenance: Provenance::ApplicationProvided,
        }
    }

    /// Creates a visible user-installed engine with a random identifier.
    #[must_use]
    pub fn user_installed(name: impl Into<String>, classification: Classification) -> Self {
        Self {
            id: EngineId::random(),
            name: name.into(),
            classification,
            hidden: false,
            provenance: Provenance::UserInstalled,
        }
    }

    /// Overrides the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Returns true if the engine is not hidden.
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        !self.hidden
    }

    /// Returns true for application-provided engines.
    #[must_use]
    pub const fn is_app_provided(&self) -> bool {
        matches!(self.provenance, Provenance::ApplicationProvided)
    }

    /// Returns how this engine is removed.
    #[must_use]
    pub const fn removal(&self) -> Removal {
        Removal::for_provenance(self.provenance)
    }
}

/// Caller-supplied definition for a user-installed engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineDefinition {
    /// Display name.
    pub name: String,
    /// Category, `unknown` when not given.
    #[serde(default)]
    pub classification: Classification,
}

impl EngineDefinition {
    /// Creates an unclassified definition.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            classification: Classification::Unknown,
        }
    }

    /// Sets the classification.
    #[must_use]
    pub fn classification(mut self, classification: Classification) -> Self {
        self.classification = classification;
        self
    }
}
