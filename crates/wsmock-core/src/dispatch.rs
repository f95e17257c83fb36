//! Dispatcher - 受信 payload から command chain を起動するまで
//!
//! # フロー
//! 1. 接続パスから仕様上の channel キーを引く
//! 2. `publish.message` に対してマッチング
//! 3. 一つもマッチしなければ strict: 終了要求 / lenient: 警告
//! 4. マッチした message 名ごとにイベントを引き、chain を fire-and-forget で起動

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::domain::{ChainId, SpecDocument, Trigger};
use crate::engine::CommandEngine;
use crate::events::EventIndex;
use crate::fatal::{ExitStatus, Fatal, FatalSender};
use crate::schema::{MatchedMessages, SchemaError, match_message};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("channel {0} is not defined in the specification")]
    UnknownChannel(String),

    #[error("channel {0} has no publish configuration")]
    NoPublishConfiguration(String),

    #[error("message received on {channel} did not match any message specification")]
    NoMatchingMessage { channel: String },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl DispatchError {
    /// Whether the connection that sent the payload should be closed.
    pub fn is_connection_fatal(&self) -> bool {
        matches!(
            self,
            DispatchError::UnknownChannel(_) | DispatchError::NoPublishConfiguration(_)
        )
    }
}

/// Result of a successful dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatched {
    pub matched: MatchedMessages,
    pub chains: Vec<ChainId>,
}

#[derive(Clone)]
pub struct Dispatcher {
    document: SpecDocument,
    events: Arc<EventIndex>,
    engine: CommandEngine,
    strict: bool,
    fatal: FatalSender,
}

impl Dispatcher {
    pub fn new(events: EventIndex, engine: CommandEngine) -> Self {
        let ctx = engine.context();
        let document = ctx.document.clone();
        for event in events.events() {
            if document.resolve_channel(&event.channel).is_none() {
                warn!(
                    channel = %event.channel,
                    message_name = %event.message_name,
                    "event refers to a channel that is not in the specification and will never fire"
                );
            }
        }
        Self {
            document,
            events: Arc::new(events),
            strict: ctx.strict,
            fatal: ctx.fatal.clone(),
            engine,
        }
    }

    pub fn document(&self) -> &SpecDocument {
        &self.document
    }

    pub fn engine(&self) -> &CommandEngine {
        &self.engine
    }

    /// Handle one decoded payload received on `channel_id` (a connection path).
    pub fn on_payload(&self, channel_id: &str, value: &Value) -> Result<Dispatched, DispatchError> {
        let key = self
            .document
            .resolve_channel(channel_id)
            .ok_or_else(|| DispatchError::UnknownChannel(channel_id.to_string()))?;

        let Some(publish) = self.document.publish_message(key) else {
            if self.strict {
                self.fatal.signal(Fatal::new(
                    ExitStatus::UnmatchedMessage,
                    format!("message {value} received on {key}, which has no publish configuration"),
                ));
            } else {
                error!(channel = key, "channel has no publish configuration");
            }
            return Err(DispatchError::NoPublishConfiguration(key.to_string()));
        };

        let matched = match match_message(value, publish, self.document.root()) {
            Ok(matched) => matched,
            Err(err) => {
                error!(
                    channel = key,
                    payload = %value,
                    error = %err,
                    "message could not be matched, the specification is broken or unsupported"
                );
                return Err(err.into());
            }
        };
        if matched.is_empty() {
            if self.strict {
                self.fatal.signal(Fatal::new(
                    ExitStatus::UnmatchedMessage,
                    format!("message {value} received on {key} did not match any message specification"),
                ));
            } else {
                warn!(
                    channel = key,
                    payload = %value,
                    "received message does not match any message specification (use --strict to enforce)"
                );
            }
            return Err(DispatchError::NoMatchingMessage {
                channel: key.to_string(),
            });
        }

        info!(channel = key, matched = ?matched, "received message matched");

        let chains = self
            .events
            .find(key, Trigger::MessageReceived, &matched)
            .into_iter()
            .map(|commands| self.engine.spawn(commands))
            .collect();

        Ok(Dispatched { matched, chains })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChainState, EventDocument};
    use crate::schema::SchemaError;
    use crate::engine::chain::tests::{RecordingBroadcaster, context};
    use crate::ports::{SystemClock, UlidGenerator};
    use serde_json::json;

    fn events() -> EventIndex {
        let document: EventDocument = serde_json::from_value(json!({
            "events": [
                {
                    "channel": "chat",
                    "when": "message_received",
                    "message_name": "PersonMessage",
                    "do": [
                        { "wait": { "seconds": 1 } },
                        { "broadcast_example": { "example_ref": "#/components/examples/hello", "channel": "chat" } }
                    ]
                },
                {
                    "channel": "nowhere",
                    "when": "message_received",
                    "message_name": "PersonMessage",
                    "do": []
                }
            ]
        }))
        .unwrap();
        EventIndex::new(document)
    }

    fn dispatcher(
        broadcaster: Arc<RecordingBroadcaster>,
        strict: bool,
    ) -> (Dispatcher, crate::fatal::FatalReceiver) {
        let (ctx, fatal) = context(broadcaster, strict);
        let engine = CommandEngine::new(ctx, Arc::new(UlidGenerator::new(SystemClock)));
        (Dispatcher::new(events(), engine), fatal)
    }

    #[tokio::test(start_paused = true)]
    async fn matching_message_runs_its_chain() {
        let broadcaster = Arc::new(RecordingBroadcaster::default());
        let (dispatcher, _fatal) = dispatcher(broadcaster.clone(), true);

        let dispatched = dispatcher
            .on_payload("/chat", &json!({ "name": "Ada", "age": 36 }))
            .unwrap();

        assert!(dispatched.matched.contains("PersonMessage"));
        assert_eq!(dispatched.chains.len(), 1);

        let reports = dispatcher.engine().supervisor().join_all().await;
        assert_eq!(reports[0].outcome.state(), ChainState::Completed);
        assert_eq!(
            broadcaster.sent(),
            vec![("chat".to_string(), json!({ "text": "hello" }))]
        );
    }

    #[tokio::test]
    async fn unmatched_message_in_lenient_mode_only_warns() {
        let broadcaster = Arc::new(RecordingBroadcaster::default());
        let (dispatcher, mut fatal) = dispatcher(broadcaster.clone(), false);

        let err = dispatcher.on_payload("chat", &json!("not an object")).unwrap_err();

        assert!(matches!(err, DispatchError::NoMatchingMessage { .. }));
        assert!(!err.is_connection_fatal());
        assert!(fatal.try_recv().is_err());
        assert_eq!(dispatcher.engine().supervisor().in_flight(), 0);
    }

    #[tokio::test]
    async fn unmatched_message_in_strict_mode_requests_termination() {
        let broadcaster = Arc::new(RecordingBroadcaster::default());
        let (dispatcher, mut fatal) = dispatcher(broadcaster, true);

        let err = dispatcher
            .on_payload("/chat", &json!({ "name": "Ada", "age": "old" }))
            .unwrap_err();

        assert!(matches!(err, DispatchError::NoMatchingMessage { .. }));
        assert_eq!(fatal.try_recv().unwrap().status, ExitStatus::UnmatchedMessage);
    }

    #[tokio::test]
    async fn channel_without_publish_closes_the_connection() {
        let broadcaster = Arc::new(RecordingBroadcaster::default());
        let (dispatcher, _fatal) = dispatcher(broadcaster, false);

        let err = dispatcher.on_payload("/silent", &json!({})).unwrap_err();

        assert!(matches!(err, DispatchError::NoPublishConfiguration(_)));
        assert!(err.is_connection_fatal());
    }

    #[tokio::test]
    async fn channel_without_publish_in_strict_mode_requests_termination() {
        let broadcaster = Arc::new(RecordingBroadcaster::default());
        let (dispatcher, mut fatal) = dispatcher(broadcaster, true);

        assert!(dispatcher.on_payload("silent", &json!({})).is_err());
        assert_eq!(fatal.try_recv().unwrap().status, ExitStatus::UnmatchedMessage);
    }

    #[tokio::test]
    async fn unsupported_publish_schema_is_a_hard_error() {
        let broadcaster = Arc::new(RecordingBroadcaster::default());
        let (mut ctx, mut fatal) = context(broadcaster, true);
        ctx.document = SpecDocument::new(json!({
            "channels": {
                "list": {
                    "publish": { "message": { "$ref": "#/components/messages/list" } }
                }
            },
            "components": {
                "messages": {
                    "list": { "name": "ListMessage", "payload": { "type": "array" } }
                }
            }
        }));
        let engine = CommandEngine::new(ctx, Arc::new(UlidGenerator::new(SystemClock)));
        let dispatcher = Dispatcher::new(events(), engine);

        let err = dispatcher.on_payload("/list", &json!([1, 2])).unwrap_err();

        assert!(matches!(
            err,
            DispatchError::Schema(SchemaError::UnsupportedType { .. })
        ));
        assert!(!err.is_connection_fatal());
        assert!(fatal.try_recv().is_err());
        assert_eq!(dispatcher.engine().supervisor().in_flight(), 0);
    }

    #[tokio::test]
    async fn unknown_channel_is_rejected() {
        let broadcaster = Arc::new(RecordingBroadcaster::default());
        let (dispatcher, _fatal) = dispatcher(broadcaster, false);

        let err = dispatcher.on_payload("/lobby", &json!({})).unwrap_err();
        assert!(matches!(err, DispatchError::UnknownChannel(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_messages_spawn_independent_chains() {
        let broadcaster = Arc::new(RecordingBroadcaster::default());
        let (dispatcher, _fatal) = dispatcher(broadcaster.clone(), false);
        let payload = json!({ "name": "Ada", "age": 36 });

        let first = dispatcher.on_payload("/chat", &payload).unwrap();
        let second = dispatcher.on_payload("/chat", &payload).unwrap();
        assert_ne!(first.chains, second.chains);

        dispatcher.engine().supervisor().join_all().await;
        assert_eq!(broadcaster.sent().len(), 2);
    }
}
