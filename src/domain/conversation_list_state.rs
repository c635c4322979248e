use super::{
    conversation::{Conversation, ConversationId},
    user::UserId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationListUiState {
    Loading,
    Ready,
    Empty,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationListState {
    ui_state: ConversationListUiState,
    conversations: Vec<Conversation>,
    selected_index: Option<usize>,
}

impl Default for ConversationListState {
    fn default() -> Self {
        Self {
            ui_state: ConversationListUiState::Loading,
            conversations: Vec::new(),
            selected_index: None,
        }
    }
}

impl ConversationListState {
    pub fn ui_state(&self) -> ConversationListUiState {
        self.ui_state
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected_index
    }

    pub fn selected_conversation(&self) -> Option<&Conversation> {
        self.selected_index
            .and_then(|index| self.conversations.get(index))
    }

    pub fn get(&self, conversation_id: ConversationId) -> Option<&Conversation> {
        self.conversations
            .iter()
            .find(|conversation| conversation.id == conversation_id)
    }

    pub fn find_between(&self, first: UserId, second: UserId) -> Option<&Conversation> {
        self.conversations
            .iter()
            .find(|conversation| conversation.is_between(first, second))
    }

    /// Replaces the whole list. The latest completed fetch always wins.
    pub fn set_ready(&mut self, conversations: Vec<Conversation>) {
        if conversations.is_empty() {
            self.ui_state = ConversationListUiState::Empty;
            self.conversations.clear();
            self.selected_index = None;
            return;
        }

        let previous_selected_id = self.selected_conversation().map(|item| item.id);
        self.ui_state = ConversationListUiState::Ready;
        self.conversations = conversations;
        self.selected_index = resolve_selection_index(&self.conversations, previous_selected_id);
    }

    /// Records a failed fetch. A list that was already loaded stays on screen.
    pub fn set_error(&mut self) {
        if self.ui_state == ConversationListUiState::Loading {
            self.ui_state = ConversationListUiState::Error;
        }
    }

    pub fn select(&mut self, conversation_id: ConversationId) {
        if let Some(index) = self
            .conversations
            .iter()
            .position(|conversation| conversation.id == conversation_id)
        {
            self.selected_index = Some(index);
        }
    }

    pub fn select_next(&mut self) {
        let Some(index) = self.selected_index else {
            return;
        };

        let last_index = self.conversations.len().saturating_sub(1);
        self.selected_index = Some(std::cmp::min(index.saturating_add(1), last_index));
    }

    pub fn select_previous(&mut self) {
        let Some(index) = self.selected_index else {
            return;
        };

        self.selected_index = Some(index.saturating_sub(1));
    }
}

fn resolve_selection_index(
    conversations: &[Conversation],
    previous_selected_id: Option<ConversationId>,
) -> Option<usize> {
    if conversations.is_empty() {
        return None;
    }

    previous_selected_id
        .and_then(|id| conversations.iter().position(|item| item.id == id))
        .or(Some(0))
}
