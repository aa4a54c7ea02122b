use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{ExecutionError, SearchError, SearchResult};

use super::event::EngineModified;
use super::sink::NotificationSink;

/// Unique identifier for a subscription.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Create a new random subscription id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

type Subscribers = Mutex<HashMap<SubscriptionId, Sender<EngineModified>>>;

/// Fan-out sink: every subscriber gets its own bounded stream.
///
/// Slow subscribers lose records rather than stall the service.
#[derive(Debug)]
pub struct Observers {
    stream_capacity: usize,
    subscribers: Arc<Subscribers>,
    dropped_events: AtomicU64,
}

impl Observers {
    /// Create a fan-out sink with a per-subscriber buffer capacity.
    #[must_use]
    pub fn new(stream_capacity: usize) -> Self {
        Self {
            stream_capacity: stream_capacity.max(1),
            subscribers: Arc::new(Mutex::new(HashMap::new())),
            dropped_events: AtomicU64::new(0),
        }
    }

    /// Register a new subscriber.
    pub fn subscribe(&self) -> NotificationStream {
        let subscription_id = SubscriptionId::new();
        let (tx, rx) = bounded(self.stream_capacity);
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.insert(subscription_id, tx);
        }
        debug!(subscription = %subscription_id, "notification subscriber registered");
        NotificationStream {
            subscription_id,
            rx,
            subscribers: Arc::downgrade(&self.subscribers),
        }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map_or(0, |subs| subs.len())
    }

    /// Records dropped because a subscriber was full.
    #[must_use]
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }
}

impl Default for Observers {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl NotificationSink for Observers {
    fn deliver(&self, batch: &[EngineModified]) {
        let Ok(mut subs) = self.subscribers.lock() else {
            return;
        };
        subs.retain(|id, tx| {
            for event in batch {
                match tx.try_send(event.clone()) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        self.dropped_events.fetch_add(1, Ordering::Relaxed);
                        warn!(
                            subscription = %id,
                            kind = %event.kind,
                            "subscriber full, dropped notification"
                        );
                    }
                    Err(TrySendError::Disconnected(_)) => return false,
                }
            }
            true
        });
    }
}

/// A subscription stream of engine notifications.
///
/// Dropping the stream unsubscribes.
#[derive(Debug)]
pub struct NotificationStream {
    subscription_id: SubscriptionId,
    rx: Receiver<EngineModified>,
    subscribers: Weak<Subscribers>,
}

impl NotificationStream {
    /// The subscription id backing this stream.
    #[must_use]
    pub const fn subscription_id(&self) -> SubscriptionId {
        self.subscription_id
    }

    /// Receive the next record (blocking).
    ///
    /// # Errors
    /// `Disconnected` once the sink is gone and the buffer is drained.
    pub fn recv(&self) -> SearchResult<EngineModified> {
        self.rx.recv().map_err(|_| {
            SearchError::Execution(ExecutionError::Disconnected {
                path: "notification_stream".to_string(),
            })
        })
    }

    /// Receive the next record with a timeout.
    ///
    /// # Errors
    /// `Timeout` if nothing arrives in time, `Disconnected` if the sink is gone.
    pub fn recv_timeout(&self, timeout: Duration) -> SearchResult<EngineModified> {
        self.rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => SearchError::Execution(ExecutionError::Timeout {
                duration_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }),
            RecvTimeoutError::Disconnected => SearchError::Execution(ExecutionError::Disconnected {
                path: "notification_stream".to_string(),
            }),
        })
    }

    /// Everything currently buffered, without blocking.
    #[must_use]
    pub fn drain(&self) -> Vec<EngineModified> {
        self.rx.try_iter().collect()
    }
}

impl Drop for NotificationStream {
    fn drop(&mut self) {
        if let Some(subs) = self.subscribers.upgrade() {
            if let Ok(mut guard) = subs.lock() {
                guard.remove(&self.subscription_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::engine::{Classification, Engine};
    use crate::notify::event::ModifiedType;

    fn event(kind: ModifiedType) -> EngineModified {
        EngineModified::new(kind, Engine::app_provided("e", Classification::Unknown))
    }

    #[test]
    fn every_subscriber_sees_the_batch_in_order() {
        let observers = Observers::new(8);
        let a = observers.subscribe();
        let b = observers.subscribe();
        assert_eq!(observers.subscriber_count(), 2);

        observers.deliver(&[event(ModifiedType::Default), event(ModifiedType::Removed)]);

        for stream in [&a, &b] {
            let kinds: Vec<ModifiedType> = stream.drain().into_iter().map(|e| e.kind).collect();
            assert_eq!(kinds, [ModifiedType::Default, ModifiedType::Removed]);
        }
    }

    #[test]
    fn dropping_stream_unsubscribes() {
        let observers = Observers::new(8);
        let stream = observers.subscribe();
        assert_eq!(observers.subscriber_count(), 1);
        drop(stream);
        assert_eq!(observers.subscriber_count(), 0);
    }

    #[test]
    fn full_subscriber_drops_instead_of_blocking() {
        let observers = Observers::new(1);
        let stream = observers.subscribe();
        observers.deliver(&[event(ModifiedType::Changed), event(ModifiedType::Removed)]);
        assert_eq!(observers.dropped_events(), 1);
        assert_eq!(stream.recv().unwrap().kind, ModifiedType::Changed);
    }

    #[test]
    fn recv_timeout_reports_timeout() {
        let observers = Observers::new(1);
        let stream = observers.subscribe();
        let err = stream.recv_timeout(Duration::from_millis(5)).unwrap_err();
        assert!(matches!(
            err,
            SearchError::Execution(ExecutionError::Timeout { duration_ms: 5 })
        ));
    }

    #[test]
    fn stream_disconnects_when_sink_dropped() {
        let observers = Observers::new(1);
        let stream = observers.subscribe();
        drop(observers);
        assert!(matches!(
            stream.recv(),
            Err(SearchError::Execution(ExecutionError::Disconnected { .. }))
        ));
    }
}
