//! Notification records.
//!
//! These types are serializable so they can be forwarded to out-of-process
//! listeners unchanged.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::{BrowsingContext, ChangeReason};
use crate::engine::Engine;

/// Kind of modification an `EngineModified` record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModifiedType {
    /// A user-installed engine was added.
    Added,
    /// An engine's visibility changed (hidden or unhidden).
    Changed,
    /// An engine was removed (hidden or deleted).
    Removed,
    /// The normal-browsing default changed.
    Default,
    /// The private-browsing default changed.
    DefaultPrivate,
}

impl ModifiedType {
    /// The default-change kind for a browsing context.
    #[must_use]
    pub const fn default_for(context: BrowsingContext) -> Self {
        match context {
            BrowsingContext::Normal => Self::Default,
            BrowsingContext::Private => Self::DefaultPrivate,
        }
    }

    /// Returns true for `DEFAULT` and `DEFAULT_PRIVATE`.
    #[must_use]
    pub const fn is_default_change(self) -> bool {
        matches!(self, Self::Default | Self::DefaultPrivate)
    }
}

impl fmt::Display for ModifiedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Added => "ADDED",
            Self::Changed => "CHANGED",
            Self::Removed => "REMOVED",
            Self::Default => "DEFAULT",
            Self::DefaultPrivate => "DEFAULT_PRIVATE",
        };
        f.write_str(s)
    }
}

/// A single engine modification notification.
///
/// `engine` is a snapshot of the engine taken right after the change.
#[allow(missing_docs)]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineModified {
    pub event_id: Uuid,
    pub kind: ModifiedType,
    pub engine: Engine,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<ChangeReason>,
    pub timestamp: DateTime<Utc>,
}

impl EngineModified {
    /// Creates a record without a change reason.
    #[must_use]
    pub fn new(kind: ModifiedType, engine: Engine) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            kind,
            engine,
            reason: None,
            timestamp: Utc::now(),
        }
    }

    /// Creates a `DEFAULT`/`DEFAULT_PRIVATE` record for a context.
    #[must_use]
    pub fn default_changed(context: BrowsingContext, engine: Engine, reason: ChangeReason) -> Self {
        Self {
            reason: Some(reason),
            ..Self::new(ModifiedType::default_for(context), engine)
        }
    }

    /// The engine's name, for listener convenience.
    #[must_use]
    pub fn engine_name(&self) -> &str {
        &self.engine.name
    }
}
