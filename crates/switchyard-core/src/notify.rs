//! Notification sinks for operator-visible router status

use tokio::sync::mpsc;
use tracing::info;

/// Fire-and-forget sink for human-readable status messages
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Logs notifications through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, message: &str) {
        info!(target: "switchyard::notify", "{}", message);
    }
}

/// Discards notifications
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _message: &str) {}
}

/// Forwards notifications into an unbounded channel, for UIs
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelNotifier {
    /// Create a notifier and the receiver that observes it
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, message: &str) {
        // A closed receiver just means nobody is listening anymore.
        let _ = self.tx.send(message.to_string());
    }
}
