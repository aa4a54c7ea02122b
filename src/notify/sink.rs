//! Notification sinks.
//!
//! The service hands each completed operation's ordered batch of records to
//! a `NotificationSink`. Sinks are called while the service holds its
//! operation lock, so they must never block.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crossbeam_channel::{Sender, TrySendError};
use tracing::warn;

use super::event::EngineModified;

/// Receives ordered notification batches.
pub trait NotificationSink: Send + Sync {
    /// Deliver one operation's records, in order.
    fn deliver(&self, batch: &[EngineModified]);
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn deliver(&self, _batch: &[EngineModified]) {}
}

/// Sink that keeps every record in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<EngineModified>>,
}

impl CollectingSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything collected so far.
    #[must_use]
    pub fn take(&self) -> Vec<EngineModified> {
        match self.events.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    /// Number of records collected and not yet taken.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().map_or(0, |guard| guard.len())
    }

    /// Returns true if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl NotificationSink for CollectingSink {
    fn deliver(&self, batch: &[EngineModified]) {
        if let Ok(mut guard) = self.events.lock() {
            guard.extend_from_slice(batch);
        }
    }
}

/// Sink that forwards records into a bounded crossbeam channel.
///
/// Never blocks: if the receiver is full or gone the record is counted as
/// dropped.
#[derive(Debug)]
pub struct ChannelSink {
    tx: Sender<EngineModified>,
    dropped: AtomicU64,
}

impl ChannelSink {
    /// Wrap a sender.
    #[must_use]
    pub const fn new(tx: Sender<EngineModified>) -> Self {
        Self {
            tx,
            dropped: AtomicU64::new(0),
        }
    }

    /// Records that could not be delivered.
    #[must_use]
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl NotificationSink for ChannelSink {
    fn deliver(&self, batch: &[EngineModified]) {
        for event in batch {
            match self.tx.try_send(event.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(ev) | TrySendError::Disconnected(ev)) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    warn!(kind = %ev.kind, engine = %ev.engine.id, "dropped engine notification");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crossbeam_channel::bounded;

    use crate::engine::{Classification, Engine};
    use crate::notify::event::ModifiedType;

    fn event(kind: ModifiedType, id: &str) -> EngineModified {
        EngineModified::new(kind, Engine::app_provided(id, Classification::Unknown))
    }

    #[test]
    fn collecting_sink_keeps_order() {
        let sink = CollectingSink::new();
        sink.deliver(&[event(ModifiedType::Changed, "a"), event(ModifiedType::Removed, "a")]);
        sink.deliver(&[event(ModifiedType::Default, "b")]);
        assert_eq!(sink.len(), 3);

        let kinds: Vec<ModifiedType> = sink.take().into_iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            [ModifiedType::Changed, ModifiedType::Removed, ModifiedType::Default]
        );
        assert!(sink.is_empty());
    }

    #[test]
    fn channel_sink_counts_drops_when_full() {
        let (tx, rx) = bounded(1);
        let sink = ChannelSink::new(tx);
        sink.deliver(&[event(ModifiedType::Changed, "a"), event(ModifiedType::Removed, "a")]);
        assert_eq!(sink.dropped_events(), 1);
        assert_eq!(rx.try_recv().unwrap().kind, ModifiedType::Changed);
    }

    #[test]
    fn channel_sink_counts_drops_when_disconnected() {
        let (tx, rx) = bounded(4);
        drop(rx);
        let sink = ChannelSink::new(tx);
        sink.deliver(&[event(ModifiedType::Default, "a")]);
        assert_eq!(sink.dropped_events(), 1);
    }

    #[test]
    fn null_sink_accepts_anything() {
        NullSink.deliver(&[event(ModifiedType::Added, "a")]);
    }
}
