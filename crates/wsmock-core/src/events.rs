//! EventIndex - (channel, trigger, message 名) から command chain を引く
//!
//! イベント数は小さい前提なので線形スキャン。ドキュメント順を保つ。

use std::sync::Arc;

use crate::domain::{Command, Event, EventDocument, Trigger, normalize_channel};
use crate::schema::MatchedMessages;

#[derive(Debug, Clone, Default)]
pub struct EventIndex {
    events: Vec<Event>,
}

impl EventIndex {
    pub fn new(document: EventDocument) -> Self {
        Self {
            events: document.events,
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Every chain whose event fires for `channel` and one of `matched`.
    ///
    /// Each matching event contributes its own chain, in document order.
    pub fn find(
        &self,
        channel: &str,
        trigger: Trigger,
        matched: &MatchedMessages,
    ) -> Vec<Arc<[Command]>> {
        let channel = normalize_channel(channel);
        self.events
            .iter()
            .filter(|event| event.when == trigger)
            .filter(|event| normalize_channel(&event.channel) == channel)
            .filter(|event| matched.contains(&event.message_name))
            .map(|event| Arc::clone(&event.commands))
            .collect()
    }
}

impl From<EventDocument> for EventIndex {
    fn from(document: EventDocument) -> Self {
        Self::new(document)
    }
}
