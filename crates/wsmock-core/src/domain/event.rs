//! Event - 受信 message と command chain の紐付け

use serde::Deserialize;
use std::sync::Arc;

use super::command::Command;

/// What makes an event fire. Only inbound messages are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    MessageReceived,
}

/// Binding from (channel, trigger, matched message name) to a command chain.
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub channel: String,
    pub when: Trigger,
    pub message_name: String,
    #[serde(rename = "do")]
    pub commands: Arc<[Command]>,
}

/// The whole event document (`events:` sequence, in document order).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventDocument {
    #[serde(default)]
    pub events: Vec<Event>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_document_roundtrip_from_json() {
        let doc: EventDocument = serde_json::from_value(json!({
            "events": [{
                "channel": "/chat",
                "when": "message_received",
                "message_name": "PersonMessage",
                "do": [
                    { "wait": { "seconds": 0.5 } },
                    { "stop_command_chains": {} }
                ]
            }]
        }))
        .unwrap();

        assert_eq!(doc.events.len(), 1);
        let event = &doc.events[0];
        assert_eq!(event.when, Trigger::MessageReceived);
        assert_eq!(event.message_name, "PersonMessage");
        assert_eq!(event.commands.len(), 2);
    }

    #[test]
    fn missing_events_key_means_no_events() {
        let doc: EventDocument = serde_json::from_value(json!({})).unwrap();
        assert!(doc.events.is_empty());
    }

    #[test]
    fn unsupported_trigger_is_rejected() {
        let result: Result<Event, _> = serde_json::from_value(json!({
            "channel": "chat",
            "when": "connection_opened",
            "message_name": "X",
            "do": []
        }));
        assert!(result.is_err());
    }
}
