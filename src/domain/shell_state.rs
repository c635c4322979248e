use super::{message_input_state::MessageInputState, notice::Notice};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivePane {
    Conversations,
    Messages,
    MessageInput,
    Search,
}

/// Terminal-only state: focus, input buffers and the last notice shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellState {
    running: bool,
    active_pane: ActivePane,
    message_input: MessageInputState,
    search_input: MessageInputState,
    search_selected: usize,
    last_notice: Option<Notice>,
}

impl Default for ShellState {
    fn default() -> Self {
        Self {
            running: true,
            active_pane: ActivePane::Conversations,
            message_input: MessageInputState::default(),
            search_input: MessageInputState::default(),
            search_selected: 0,
            last_notice: None,
        }
    }
}

impl ShellState {
    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn active_pane(&self) -> ActivePane {
        self.active_pane
    }

    pub fn set_active_pane(&mut self, pane: ActivePane) {
        self.active_pane = pane;
    }

    pub fn message_input(&self) -> &MessageInputState {
        &self.message_input
    }

    pub fn message_input_mut(&mut self) -> &mut MessageInputState {
        &mut self.message_input
    }

    pub fn search_input(&self) -> &MessageInputState {
        &self.search_input
    }

    pub fn search_input_mut(&mut self) -> &mut MessageInputState {
        &mut self.search_input
    }

    pub fn search_selected(&self) -> usize {
        self.search_selected
    }

    pub fn set_search_selected(&mut self, index: usize) {
        self.search_selected = index;
    }

    pub fn last_notice(&self) -> Option<&Notice> {
        self.last_notice.as_ref()
    }

    pub fn show_notice(&mut self, notice: Notice) {
        self.last_notice = Some(notice);
    }
}
