//! In-process push notification hub.
//!
//! Events are published on named channels (`surveys`, `survey-{id}`) with an
//! event name. A `Subscription` receives only its own channel and event, and
//! stops receiving as soon as it is dropped.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

/// Channel carrying survey lifecycle events.
pub const SURVEYS_CHANNEL: &str = "surveys";

/// A response was submitted.
pub const NEW_RESPONSE: &str = "new-response";
pub const SURVEY_UPDATED: &str = "survey-updated";
pub const SURVEY_DELETED: &str = "survey-deleted";

/// Default number of events buffered per subscriber.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Channel carrying the responses of one survey.
pub fn survey_channel(survey_id: &str) -> String {
    format!("survey-{}", survey_id)
}

/// A notification as delivered by the push service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushEvent {
    pub channel: String,
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl PushEvent {
    /// Survey id carried in the payload (`surveyId` or `id`).
    pub fn survey_id(&self) -> Option<&str> {
        self.data
            .get("surveyId")
            .or_else(|| self.data.get("id"))
            .and_then(Value::as_str)
    }
}

/// Publisher side of the hub.
#[derive(Debug)]
pub struct EventHub {
    sender: broadcast::Sender<PushEvent>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event; returns how many subscriptions were listening.
    pub fn publish(&self, event: PushEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Subscribe to one event name on one channel.
    pub fn subscribe(&self, channel: impl Into<String>, event: impl Into<String>) -> Subscription {
        let subscription = Subscription {
            channel: channel.into(),
            event: event.into(),
            receiver: self.sender.subscribe(),
            lagged: false,
        };
        debug!(
            "Subscribed to channel {}, event {}",
            subscription.channel, subscription.event
        );
        subscription
    }
}

/// Receiving side for one channel and event name.
#[derive(Debug)]
pub struct Subscription {
    channel: String,
    event: String,
    receiver: broadcast::Receiver<PushEvent>,
    lagged: bool,
}

impl Subscription {
    /// Wait for the next matching event.
    ///
    /// Returns `None` once the hub is gone and every buffered event has been
    /// delivered.
    pub async fn next(&mut self) -> Option<PushEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.channel == self.channel && event.event == self.event => {
                    return Some(event)
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(
                        "Subscription {}/{} fell behind, {} events dropped",
                        self.channel, self.event, skipped
                    );
                    self.lagged = true;
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Whether events were dropped since the last call.
    pub fn take_lagged(&mut self) -> bool {
        std::mem::take(&mut self.lagged)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        debug!(
            "Unsubscribed from channel {}, event {}",
            self.channel, self.event
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(channel: &str, name: &str, data: Value) -> PushEvent {
        PushEvent {
            channel: channel.to_string(),
            event: name.to_string(),
            data,
        }
    }

    #[tokio::test]
    async fn test_delivers_matching_events_only() {
        let hub = EventHub::default();
        let mut responses = hub.subscribe(survey_channel("s1"), NEW_RESPONSE);

        hub.publish(event("survey-s2", NEW_RESPONSE, json!({ "n": 1 })));
        hub.publish(event("survey-s1", SURVEY_UPDATED, json!({ "n": 2 })));
        hub.publish(event("survey-s1", NEW_RESPONSE, json!({ "n": 3 })));

        let received = responses.next().await.unwrap();
        assert_eq!(received.data["n"], 3);
        assert_eq!(received.channel, "survey-s1");
    }

    #[tokio::test]
    async fn test_closed_hub_drains_then_ends() {
        let hub = EventHub::default();
        let mut subscription = hub.subscribe(SURVEYS_CHANNEL, SURVEY_DELETED);

        hub.publish(event(SURVEYS_CHANNEL, SURVEY_DELETED, json!({ "id": "s1" })));
        drop(hub);

        let received = subscription.next().await.unwrap();
        assert_eq!(received.survey_id(), Some("s1"));
        assert!(subscription.next().await.is_none());
    }

    #[test]
    fn test_drop_unsubscribes() {
        let hub = EventHub::default();
        let subscription = hub.subscribe(SURVEYS_CHANNEL, SURVEY_UPDATED);
        assert_eq!(hub.subscriber_count(), 1);

        drop(subscription);
        assert_eq!(hub.subscriber_count(), 0);
        assert_eq!(
            hub.publish(event(SURVEYS_CHANNEL, SURVEY_UPDATED, json!({}))),
            0
        );
    }

    #[test]
    fn test_lag_is_reported() {
        let hub = EventHub::new(2);
        let mut subscription = hub.subscribe("survey-s1", NEW_RESPONSE);

        for n in 0..5 {
            hub.publish(event("survey-s1", NEW_RESPONSE, json!({ "n": n })));
        }

        let received = tokio_test::block_on(subscription.next()).unwrap();
        assert!(subscription.take_lagged());
        assert!(!subscription.take_lagged());
        assert_eq!(received.data["n"], 3);
    }

    #[test]
    fn test_event_parsing() {
        let parsed: PushEvent = serde_json::from_str(
            r#"{ "channel": "survey-s1", "event": "new-response", "data": { "surveyId": "s1" } }"#,
        )
        .unwrap();
        assert_eq!(parsed.survey_id(), Some("s1"));

        let bare: PushEvent =
            serde_json::from_str(r#"{ "channel": "surveys", "event": "survey-updated" }"#).unwrap();
        assert_eq!(bare.data, Value::Null);
        assert_eq!(bare.survey_id(), None);
    }
}
