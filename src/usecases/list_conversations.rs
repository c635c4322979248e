use crate::domain::{conversation::Conversation, user::UserId};

use super::contracts::SourceError;

pub trait ConversationsSource {
    fn list_conversations(&self, user_id: UserId) -> Result<Vec<Conversation>, SourceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListConversationsQuery {
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListConversationsOutput {
    pub conversations: Vec<Conversation>,
}

/// Fetches the viewer's conversations in the order the backend returned them.
///
/// Entries the viewer does not take part in are dropped; the rest of the list
/// is kept as-is.
pub fn list_conversations(
    source: &dyn ConversationsSource,
    query: ListConversationsQuery,
) -> Result<ListConversationsOutput, SourceError> {
    let fetched = source.list_conversations(query.user_id)?;
    let fetched_count = fetched.len();

    let conversations: Vec<Conversation> = fetched
        .into_iter()
        .filter(|conversation| conversation.involves(query.user_id))
        .collect();

    if conversations.len() != fetched_count {
        tracing::warn!(
            code = "CHAT_LIST_FOREIGN_ENTRIES",
            dropped = fetched_count - conversations.len(),
            "conversation list contained entries without the viewer"
        );
    }

    Ok(ListConversationsOutput { conversations })
}
