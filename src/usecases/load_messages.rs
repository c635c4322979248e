use crate::domain::{conversation::ConversationId, message::MessagePage};

use super::contracts::SourceError;

pub const DEFAULT_MESSAGES_PAGE_SIZE: usize = 20;
const MAX_MESSAGES_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadMessagesQuery {
    pub conversation_id: ConversationId,
    /// Zero-based page index counted backwards from the newest message.
    pub page: usize,
    pub size: usize,
}

impl LoadMessagesQuery {
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn newest(conversation_id: ConversationId, size: usize) -> Self {
        Self {
            conversation_id,
            page: 0,
            size,
        }
    }

    pub fn normalized_size(&self) -> usize {
        normalize_page_size(self.size)
    }
}

pub fn normalize_page_size(size: usize) -> usize {
    match size {
        0 => DEFAULT_MESSAGES_PAGE_SIZE,
        value if value > MAX_MESSAGES_PAGE_SIZE => MAX_MESSAGES_PAGE_SIZE,
        value => value,
    }
}

pub trait MessagesSource {
    fn list_messages(
        &self,
        conversation_id: ConversationId,
        page: usize,
        size: usize,
    ) -> Result<MessagePage, SourceError>;
}

/// Loads one page of history, oldest-first, restricted to the requested conversation.
pub fn load_messages(
    source: &dyn MessagesSource,
    query: LoadMessagesQuery,
) -> Result<MessagePage, SourceError> {
    let size = query.normalized_size();
    let mut page = source.list_messages(query.conversation_id, query.page, size)?;

    let fetched_count = page.messages.len();
    page.messages
        .retain(|message| message.conversation_id == query.conversation_id);
    if page.messages.len() != fetched_count {
        tracing::warn!(
            code = "CHAT_PAGE_FOREIGN_MESSAGES",
            conversation_id = query.conversation_id,
            dropped = fetched_count - page.messages.len(),
            "message page contained messages from another conversation"
        );
    }

    page.messages.sort_by_key(|message| message.sort_key());
    Ok(page)
}
