//! Change notifications.
//!
//! Every mutating service operation produces an ordered batch of
//! `EngineModified` records. The batch is returned to the caller and handed
//! to the service's `NotificationSink` once the operation has completed.
//! There is no global event bus: sinks are passed in explicitly.

/// Notification record types.
pub mod event;
/// Sink trait and simple sinks.
pub mod sink;
/// Fan-out subscriptions.
pub mod stream;

pub use event::{EngineModified, ModifiedType};
pub use sink::{ChannelSink, CollectingSink, NotificationSink, NullSink};
pub use stream::{NotificationStream, Observers, SubscriptionId};
