use super::user::{display_name_or_fallback, UserId};

pub type ConversationId = i64;

/// A one-to-one conversation between two marketplace users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub id: ConversationId,
    pub user_a_id: UserId,
    pub user_b_id: UserId,
    pub user_a_name: Option<String>,
    pub user_b_name: Option<String>,
    pub last_message_preview: Option<String>,
    pub last_message_unix_ms: Option<i64>,
}

impl Conversation {
    pub fn involves(&self, user_id: UserId) -> bool {
        self.user_a_id == user_id || self.user_b_id == user_id
    }

    /// True when the conversation links exactly these two users, in either order.
    pub fn is_between(&self, first: UserId, second: UserId) -> bool {
        (self.user_a_id == first && self.user_b_id == second)
            || (self.user_a_id == second && self.user_b_id == first)
    }

    /// The participant that is not `viewer`, or `None` if the viewer is not a participant.
    pub fn partner_id(&self, viewer: UserId) -> Option<UserId> {
        if self.user_a_id == viewer {
            Some(self.user_b_id)
        } else if self.user_b_id == viewer {
            Some(self.user_a_id)
        } else {
            None
        }
    }

    pub fn partner_name(&self, viewer: UserId) -> String {
        let (partner_id, partner_name) = if self.user_a_id == viewer {
            (self.user_b_id, self.user_b_name.as_deref())
        } else {
            (self.user_a_id, self.user_a_name.as_deref())
        };

        display_name_or_fallback(partner_name.unwrap_or_default(), partner_id)
    }
}
