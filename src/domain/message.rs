use serde::Serialize;

use super::{conversation::ConversationId, user::UserId};

/// Identity of a message in the local window.
///
/// Server messages carry the backend id; optimistic messages carry an id that
/// only exists inside this session until the refresh replaces them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MessageId {
    Confirmed(i64),
    Pending(u64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    pub created_at_ms: i64,
    pub seen: bool,
}

impl Message {
    pub fn is_pending(&self) -> bool {
        matches!(self.id, MessageId::Pending(_))
    }

    pub fn is_outgoing(&self, viewer: UserId) -> bool {
        self.sender_id == viewer
    }

    /// Flips `seen` on. Never clears it.
    pub fn mark_seen(&mut self) {
        self.seen = true;
    }

    /// Window ordering key: creation time, then id for equal timestamps.
    pub fn sort_key(&self) -> (i64, MessageId) {
        (self.created_at_ms, self.id)
    }
}

/// Payload published on the realtime channel for a new message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
}

/// One page of history as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagePage {
    pub messages: Vec<Message>,
    pub total_elements: usize,
}
