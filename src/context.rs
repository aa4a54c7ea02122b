//! Browsing contexts and default-change reasons.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The browsing context a default engine applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrowsingContext {
    /// Normal (non-private) browsing.
    Normal,
    /// Private browsing.
    Private,
}

impl BrowsingContext {
    /// Both contexts, normal first. Resolution and notification order follow this.
    pub const ALL: [Self; 2] = [Self::Normal, Self::Private];

    /// Returns true for the private-browsing context.
    #[must_use]
    pub const fn is_private(self) -> bool {
        matches!(self, Self::Private)
    }

    /// Returns the lowercase name of the context.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Private => "private",
        }
    }
}

impl fmt::Display for BrowsingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a default engine changed.
///
/// Attached to `DEFAULT` and `DEFAULT_PRIVATE` notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeReason {
    /// No specific reason supplied by the caller.
    Unknown,
    /// The user picked a new default in preferences.
    UserSetting,
    /// The user enabled or disabled a separate private default.
    UserPrivateSplit,
    /// The previous default was removed or hidden and a fallback was chosen.
    EngineRemoved,
    /// Defaults were reset to the configured baseline.
    RestoreDefaults,
    /// Defaults were restored from persisted settings.
    SettingsRestore,
}

impl Default for ChangeReason {
    fn default() -> Self {
        Self::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_display() {
        assert_eq!(BrowsingContext::Normal.to_string(), "normal");
        assert_eq!(BrowsingContext::Private.to_string(), "private");
        assert!(BrowsingContext::Private.is_private());
        assert!(!BrowsingContext::Normal.is_private());
    }

    #[test]
    fn test_all_is_normal_first() {
        assert_eq!(BrowsingContext::ALL[0], BrowsingContext::Normal);
        assert_eq!(BrowsingContext::ALL[1], BrowsingContext::Private);
    }

    #[test]
    fn test_reason_serde() {
        let json = serde_json::to_string(&ChangeReason::EngineRemoved).unwrap();
        assert_eq!(json, "\"engine_removed\"");
        let back: ChangeReason = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ChangeReason::EngineRemoved);
        assert_eq!(ChangeReason::default(), ChangeReason::Unknown);
    }
}
