//! "Arguments applied" notifications.
//!
//! Observability hook only: publishing never affects compilation.

use tokio::sync::mpsc;

use crate::routing::binder::Properties;
use crate::routing::registry::FactoryKind;

/// Emitted after a declaration's arguments were bound.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgsAppliedEvent {
    pub kind: FactoryKind,
    pub route_id: String,
    pub name: String,
    pub properties: Properties,
}

/// Sink for [`ArgsAppliedEvent`]s.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: ArgsAppliedEvent);
}

/// Publishes events onto an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    tx: mpsc::UnboundedSender<ArgsAppliedEvent>,
}

impl ChannelPublisher {
    /// Create a publisher and the receiver its events arrive on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ArgsAppliedEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventPublisher for ChannelPublisher {
    fn publish(&self, event: ArgsAppliedEvent) {
        // A dropped receiver just disables the hook.
        let _ = self.tx.send(event);
    }
}

/// Logs every event at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingPublisher;

impl EventPublisher for LoggingPublisher {
    fn publish(&self, event: ArgsAppliedEvent) {
        tracing::debug!(
            kind = %event.kind,
            route_id = %event.route_id,
            name = %event.name,
            properties = %serde_json::Value::Object(event.properties),
            "Arguments applied"
        );
    }
}
