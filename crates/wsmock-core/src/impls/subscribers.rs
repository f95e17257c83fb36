//! SubscriberRegistry - in-memory な購読者管理
//!
//! # 実装詳細
//! - 接続ごとに `mpsc::UnboundedSender<String>` を登録
//! - broadcast 時は payload を一度だけ JSON 文字列にして、channel が一致する全員に送る
//! - 受信側が落ちている sender はその場で取り除く

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::domain::normalize_channel;
use crate::ports::Broadcaster;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

struct Subscriber {
    channel: String,
    tx: mpsc::UnboundedSender<String>,
}

/// One connection's view of the registry: its id and the outbound frames.
pub struct Subscription {
    pub id: SubscriberId,
    pub frames: mpsc::UnboundedReceiver<String>,
}

#[derive(Default)]
pub struct SubscriberRegistry {
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<SubscriberId, Subscriber>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection on `channel` (path or spec key).
    pub fn subscribe(&self, channel: &str) -> Subscription {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, frames) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                id,
                Subscriber {
                    channel: normalize_channel(channel),
                    tx,
                },
            );
        debug!(subscriber = id.0, channel, "new client joined");
        Subscription { id, frames }
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        let removed = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        if removed.is_some() {
            debug!(subscriber = id.0, "client has disconnected");
        }
    }

    pub fn subscriber_count(&self, channel: &str) -> usize {
        let channel = normalize_channel(channel);
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|s| s.channel == channel)
            .count()
    }
}

#[async_trait]
impl Broadcaster for SubscriberRegistry {
    async fn broadcast(&self, channel: &str, payload: &Value) {
        let text = payload.to_string();
        let channel = normalize_channel(channel);

        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        let mut sent = 0usize;
        subscribers.retain(|id, subscriber| {
            if subscriber.channel != channel {
                return true;
            }
            match subscriber.tx.send(text.clone()) {
                Ok(()) => {
                    sent += 1;
                    true
                }
                Err(_) => {
                    warn!(subscriber = id.0, "dropping subscriber whose connection is gone");
                    false
                }
            }
        });
        debug!(channel, sent, "broadcast payload");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn broadcast_reaches_every_subscriber_of_the_channel() {
        let registry = SubscriberRegistry::new();
        let mut a = registry.subscribe("/chat");
        let mut b = registry.subscribe("chat");
        let mut other = registry.subscribe("/lobby");

        registry.broadcast("chat", &json!({ "text": "hi" })).await;

        assert_eq!(a.frames.recv().await.unwrap(), r#"{"text":"hi"}"#);
        assert_eq!(b.frames.recv().await.unwrap(), r#"{"text":"hi"}"#);
        assert!(other.frames.try_recv().is_err());
    }

    #[tokio::test]
    async fn unsubscribed_connections_receive_nothing() {
        let registry = SubscriberRegistry::new();
        let mut a = registry.subscribe("/chat");
        registry.unsubscribe(a.id);

        registry.broadcast("/chat", &json!(1)).await;

        assert!(a.frames.try_recv().is_err());
        assert_eq!(registry.subscriber_count("/chat"), 0);
    }

    #[tokio::test]
    async fn closed_receivers_are_pruned() {
        let registry = SubscriberRegistry::new();
        let a = registry.subscribe("/chat");
        let _b = registry.subscribe("/chat");
        drop(a);

        registry.broadcast("/chat", &json!("x")).await;
        assert_eq!(registry.subscriber_count("/chat"), 1);
    }

    #[test]
    fn ids_are_unique() {
        let registry = SubscriberRegistry::new();
        let a = registry.subscribe("/chat");
        let b = registry.subscribe("/chat");
        assert_ne!(a.id, b.id);
    }
}
