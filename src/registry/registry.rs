//! Subscription and advertisement bookkeeping
//!
//! The registry maps topic names to the callback that consumes them and to
//! the message type this client has declared itself a publisher for. Topic
//! keys are unique within each map independently; repeated adds replace the
//! existing entry rather than duplicating it.
//!
//! Concurrency note: the registry does no locking of its own. The bridge
//! keeps it behind its state lock and clones callbacks out before invoking
//! them, so user code never runs while the lock is held.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// Consumer of inbound message bodies for one topic.
pub type Callback = Arc<dyn Fn(Value) + Send + Sync>;

#[derive(Clone)]
pub struct Subscription {
    pub topic: String,
    pub message_type: String,
    pub callback: Callback,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.topic)
            .field("message_type", &self.message_type)
            .field("callback", &"Fn(Value)")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    pub topic: String,
    pub message_type: String,
}

#[derive(Debug, Default)]
pub struct Registry {
    subscriptions: HashMap<String, Subscription>,
    advertisements: HashMap<String, Advertisement>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for `topic`. Returns `true` when an earlier
    /// subscription for the same topic was replaced.
    pub fn add_subscription(&mut self, topic: &str, message_type: &str, callback: Callback) -> bool {
        self.subscriptions
            .insert(
                topic.to_string(),
                Subscription {
                    topic: topic.to_string(),
                    message_type: message_type.to_string(),
                    callback,
                },
            )
            .is_some()
    }

    pub fn remove_subscription(&mut self, topic: &str) -> Option<Subscription> {
        self.subscriptions.remove(topic)
    }

    pub fn find_subscription(&self, topic: &str) -> Option<Callback> {
        self.subscriptions.get(topic).map(|s| s.callback.clone())
    }

    /// Returns `true` when an earlier advertisement for the topic was replaced.
    pub fn add_advertisement(&mut self, topic: &str, message_type: &str) -> bool {
        self.advertisements
            .insert(
                topic.to_string(),
                Advertisement {
                    topic: topic.to_string(),
                    message_type: message_type.to_string(),
                },
            )
            .is_some()
    }

    pub fn remove_advertisement(&mut self, topic: &str) -> Option<Advertisement> {
        self.advertisements.remove(topic)
    }

    pub fn find_advertisement(&self, topic: &str) -> Option<&Advertisement> {
        self.advertisements.get(topic)
    }

    pub fn subscriptions(&self) -> impl Iterator<Item = &Subscription> {
        self.subscriptions.values()
    }

    pub fn advertisements(&self) -> impl Iterator<Item = &Advertisement> {
        self.advertisements.values()
    }

    /// Subscribed topic names, sorted.
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.subscriptions.keys().cloned().collect();
        topics.sort();
        topics
    }
}
