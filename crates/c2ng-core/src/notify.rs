//! Peer notification fabric.
//!
//! Each `(UasID, Segment)` pair holds at most one live notification channel;
//! a new subscription silently replaces the previous one. Delivery is
//! best-effort: a dead channel is logged and dropped, never retried.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Events pushed to a subscribed peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    #[serde(rename = "peer-address-changed")]
    PeerAddressChanged,
    #[serde(rename = "peer-credentials-changed")]
    PeerCredentialsChanged,
    /// Reserved for server-initiated session refresh; never emitted.
    #[serde(rename = "request-own-session")]
    RequestOwnSession,
}

/// Error codes sent over an open socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameError {
    #[serde(rename = "access_denied")]
    AccessDenied,
    #[serde(rename = "bad_request")]
    BadRequest,
}

/// Server-to-client frames, dispatched on the `Action` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "Action")]
pub enum OutboundFrame {
    #[serde(rename = "subscribed")]
    Subscribed,
    #[serde(rename = "notification")]
    Notification {
        #[serde(rename = "Event")]
        event: Event,
    },
    #[serde(rename = "error")]
    Error {
        #[serde(rename = "Error")]
        error: FrameError,
        #[serde(rename = "Message")]
        message: String,
    },
}

pub type NotificationSender = mpsc::UnboundedSender<OutboundFrame>;

/// Live notification channels keyed by `{uasid}::{segment}`.
#[derive(Debug, Default)]
pub struct SubscriberRegistry {
    subscribers: DashMap<String, NotificationSender>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(uasid: &str, segment: &str) -> String {
        format!("{uasid}::{segment}")
    }

    /// Register a channel for the pair (last subscribe wins) and
    /// acknowledge through it.
    pub fn subscribe(&self, uasid: &str, segment: &str, sender: NotificationSender) {
        let key = Self::key(uasid, segment);
        tracing::info!(key, "Subscribing to notifications");

        if sender.send(OutboundFrame::Subscribed).is_err() {
            tracing::warn!(key, "Subscriber channel closed before acknowledge");
            return;
        }

        self.subscribers.insert(key, sender);
    }

    /// Drop the subscription if present; missing entries are tolerated.
    pub fn unsubscribe(&self, uasid: &str, segment: &str) {
        let key = Self::key(uasid, segment);

        if self.subscribers.remove(&key).is_some() {
            tracing::info!(key, "Unsubscribed from notifications");
        } else {
            tracing::info!(key, "No subscriber to unsubscribe");
        }
    }

    /// Push an event to the subscriber of the pair, if any.
    pub fn notify(&self, uasid: &str, segment: &str, event: Event) {
        let key = Self::key(uasid, segment);

        if let Some(sender) = self.subscribers.get(&key) {
            tracing::info!(key, ?event, "Notifying subscriber");

            if sender.send(OutboundFrame::Notification { event }).is_err() {
                tracing::warn!(key, "Subscriber channel closed, dropping notification");
            }
        } else {
            tracing::info!(key, ?event, "No subscriber for notification");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribe_acknowledges_through_the_channel() {
        let registry = SubscriberRegistry::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        registry.subscribe("drone-1", "adx", tx);
        assert_eq!(rx.recv().await, Some(OutboundFrame::Subscribed));
    }

    #[tokio::test]
    async fn notify_reaches_the_subscriber() {
        let registry = SubscriberRegistry::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.subscribe("drone-1", "adx", tx);
        rx.recv().await;

        registry.notify("drone-1", "adx", Event::PeerAddressChanged);
        assert_eq!(
            rx.recv().await,
            Some(OutboundFrame::Notification {
                event: Event::PeerAddressChanged
            })
        );
    }

    #[tokio::test]
    async fn last_subscriber_wins() {
        let registry = SubscriberRegistry::new();
        let (first_tx, mut first_rx) = mpsc::unbounded_channel();
        let (second_tx, mut second_rx) = mpsc::unbounded_channel();

        registry.subscribe("drone-1", "ua", first_tx);
        registry.subscribe("drone-1", "ua", second_tx);
        first_rx.recv().await;
        second_rx.recv().await;

        registry.notify("drone-1", "ua", Event::PeerCredentialsChanged);

        assert_eq!(
            second_rx.recv().await,
            Some(OutboundFrame::Notification {
                event: Event::PeerCredentialsChanged
            })
        );
        assert!(first_rx.try_recv().is_err());
    }

    #[test]
    fn notify_without_subscriber_is_a_noop() {
        let registry = SubscriberRegistry::new();
        registry.notify("drone-1", "ua", Event::PeerAddressChanged);
        registry.unsubscribe("drone-1", "ua");
    }

    #[test]
    fn frame_wire_format() {
        let frame = OutboundFrame::Notification {
            event: Event::PeerAddressChanged,
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["Action"], "notification");
        assert_eq!(json["Event"], "peer-address-changed");

        let error = OutboundFrame::Error {
            error: FrameError::AccessDenied,
            message: "bad ticket".to_string(),
        };
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["Action"], "error");
        assert_eq!(json["Error"], "access_denied");
    }
}
