//! Progress and diagnostic feedback.
//!
//! Every phase of a conversion reports through a [`Feedback`] handle. Each
//! message is logged through `tracing` and then handed to the registered
//! [`FeedbackObserver`]s in emission order.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Severity of a feedback message, also used as the terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfoType {
    Information,
    Warning,
    Error,
}

impl InfoType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InfoType::Information => "information",
            InfoType::Warning => "warning",
            InfoType::Error => "error",
        }
    }
}

impl fmt::Display for InfoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One feedback event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackInfo {
    pub info_type: InfoType,
    pub message: String,
    /// Component that produced the message (`translate`, `schema`, `data`, ...).
    pub owner: String,
}

/// Receiver of feedback events.
pub trait FeedbackObserver: Send + Sync {
    fn notify(&self, info: &FeedbackInfo);
}

/// Observer that forwards events into an unbounded channel.
///
/// The sender never blocks, so a slow consumer cannot stall the conversion.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<FeedbackInfo>,
}

impl ChannelObserver {
    /// Create an observer and the receiving end of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<FeedbackInfo>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl FeedbackObserver for ChannelObserver {
    fn notify(&self, info: &FeedbackInfo) {
        // A dropped receiver only means nobody is listening any more.
        let _ = self.tx.send(info.clone());
    }
}

/// Handle used by the engine and orchestrator to report progress.
#[derive(Clone, Default)]
pub struct Feedback {
    observers: Vec<Arc<dyn FeedbackObserver>>,
}

impl fmt::Debug for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Feedback")
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Feedback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer. Observers are notified in registration order.
    pub fn subscribe(&mut self, observer: Arc<dyn FeedbackObserver>) {
        self.observers.push(observer);
    }

    pub fn with_observer(mut self, observer: Arc<dyn FeedbackObserver>) -> Self {
        self.subscribe(observer);
        self
    }

    pub fn send(&self, info_type: InfoType, owner: &str, message: impl Into<String>) {
        let info = FeedbackInfo {
            info_type,
            message: message.into(),
            owner: owner.to_string(),
        };
        match info_type {
            InfoType::Information => info!(owner = %info.owner, "{}", info.message),
            InfoType::Warning => warn!(owner = %info.owner, "{}", info.message),
            InfoType::Error => error!(owner = %info.owner, "{}", info.message),
        }
        for observer in &self.observers {
            observer.notify(&info);
        }
    }

    pub fn info(&self, owner: &str, message: impl Into<String>) {
        self.send(InfoType::Information, owner, message);
    }

    pub fn warning(&self, owner: &str, message: impl Into<String>) {
        self.send(InfoType::Warning, owner, message);
    }

    pub fn error(&self, owner: &str, message: impl Into<String>) {
        self.send(InfoType::Error, owner, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_observer_preserves_order() {
        let (observer, mut rx) = ChannelObserver::new();
        let feedback = Feedback::new().with_observer(Arc::new(observer));
        feedback.info("schema", "first");
        feedback.warning("data", "second");
        feedback.error("translate", "third");

        let received: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        let messages: Vec<_> = received.iter().map(|i| i.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second", "third"]);
        assert_eq!(received[1].info_type, InfoType::Warning);
        assert_eq!(received[2].owner, "translate");
    }

    #[test]
    fn test_send_without_listener_is_harmless() {
        let (observer, rx) = ChannelObserver::new();
        drop(rx);
        Feedback::new().with_observer(Arc::new(observer)).info("data", "ignored");
    }

    #[test]
    fn test_info_type_ordering_and_names() {
        assert!(InfoType::Error > InfoType::Warning);
        assert!(InfoType::Warning > InfoType::Information);
        assert_eq!(InfoType::Warning.to_string(), "warning");
    }
}
