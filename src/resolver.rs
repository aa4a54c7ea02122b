//! Default engine fallback resolution.
//!
//! When the engine held by a default slot is removed or hidden, a
//! replacement is chosen by trying, in order:
//!
//! | Tier | Candidate |
//! |------|-----------|
//! | 1 | The region/locale default for the context, if visible |
//! | 2 | The first visible engine classified `general` |
//! | 3 | The first visible engine of any classification |
//! | 4 | Nothing is visible: unhide the region default and use it |
//!
//! The engine being removed is excluded from every tier. If tier 4 finds
//! that the region default is the excluded engine, it unhides the first
//! `general` engine in registry order, or failing that the first engine.
//!
//! Resolution is pure: it reads a snapshot and reports which engine to
//! select and whether it must be unhidden. When one removal reassigns both
//! slots, engines already restored by tier 4 for the first slot count as
//! visible for tiers 1 and 2 of the second, but not for tier 3.

use std::fmt;

use tracing::debug;

use crate::context::BrowsingContext;
use crate::engine::{Engine, EngineId};

/// Which fallback tier produced a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FallbackTier {
    /// The visible region/locale default.
    RegionDefault,
    /// The first visible `general` engine.
    FirstGeneral,
    /// The first visible engine.
    FirstVisible,
    /// A hidden engine brought back because nothing was visible.
    Restored,
}

impl fmt::Display for FallbackTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::RegionDefault => "region-default",
            Self::FirstGeneral => "first-general",
            Self::FirstVisible => "first-visible",
            Self::Restored => "restored",
        };
        f.write_str(s)
    }
}

/// Outcome of resolving one default slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Engine to assign to the slot.
    pub engine: EngineId,
    /// Tier that produced it.
    pub tier: FallbackTier,
    /// True if the engine is hidden and not yet restored by this operation.
    pub unhide: bool,
}

/// Resolve a replacement default for `context`.
///
/// `engines` is the registry snapshot in registry order, `region_default`
/// the configured default for the context and `excluded` the engine that is
/// going away. `restored` lists engines this operation has already
/// unhidden; they are hidden in the snapshot but preferred by tiers 1 and 2.
/// Returns `None` only when `excluded` is the sole engine.
#[must_use]
pub fn find_fallback(
    engines: &[Engine],
    context: BrowsingContext,
    region_default: &EngineId,
    excluded: &EngineId,
    restored: &[EngineId],
) -> Option<Resolution> {
    let candidates = move || engines.iter().filter(move |e| &e.id != excluded);
    let preferred = |e: &Engine| e.is_visible() || restored.contains(&e.id);
    let region = candidates().find(|e| &e.id == region_default);

    let picked = region
        .filter(|e| preferred(e))
        .map(|e| (e, FallbackTier::RegionDefault))
        .or_else(|| {
            candidates()
                .find(|e| preferred(e) && e.classification.is_general())
                .map(|e| (e, FallbackTier::FirstGeneral))
        })
        .or_else(|| {
            candidates()
                .find(|e| e.is_visible())
                .map(|e| (e, FallbackTier::FirstVisible))
        })
        .or_else(|| {
            region
                .or_else(|| candidates().find(|e| e.classification.is_general()))
                .or_else(|| candidates().next())
                .map(|e| (e, FallbackTier::Restored))
        });

    let (engine, tier) = picked?;
    debug!(
        %context,
        %excluded,
        engine = %engine.id,
        %tier,
        "resolved fallback default"
    );
    Some(Resolution {
        engine: engine.id.clone(),
        tier,
        unhide: engine.hidden && !restored.contains(&engine.id),
    })
}
