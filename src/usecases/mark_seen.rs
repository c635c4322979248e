use crate::domain::{conversation::ConversationId, user::UserId};

use super::contracts::SourceError;

pub trait SeenMarker {
    /// Tells the backend `user_id` has read `conversation_id` up to now.
    fn mark_seen(&self, conversation_id: ConversationId, user_id: UserId) -> Result<(), SourceError>;
}
