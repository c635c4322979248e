use super::{
    conversation_list_state::ConversationListState, events::ConnectivityStatus,
    open_conversation_state::OpenConversationState, user::UserSummary,
};

/// Everything a chat session shows: list, open window, connectivity and search results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub conversations: ConversationListState,
    pub open: OpenConversationState,
    pub connectivity: ConnectivityStatus,
    pub search_query: String,
    pub search_results: Vec<UserSummary>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            conversations: ConversationListState::default(),
            open: OpenConversationState::default(),
            connectivity: ConnectivityStatus::Disconnected,
            search_query: String::new(),
            search_results: Vec::new(),
        }
    }
}
