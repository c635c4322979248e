use std::collections::HashSet;

use super::{
    conversation::ConversationId,
    message::{Message, MessageId, MessagePage},
    user::UserId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenConversationUiState {
    Empty,
    Loading,
    Ready,
    Error,
}

/// Identifies the window a page request was issued for.
///
/// The epoch changes every time a conversation is opened, so a result for
/// a conversation that was closed and reopened in between is still stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageTicket {
    pub conversation_id: ConversationId,
    pub epoch: u64,
}

/// Scroll margin - number of items to keep visible above/below cursor before scrolling.
const SCROLL_MARGIN: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenConversationState {
    conversation_id: Option<ConversationId>,
    title: String,
    epoch: u64,
    messages: Vec<Message>,
    total_elements: usize,
    ui_state: OpenConversationUiState,
    older_in_flight: bool,
    selected_index: Option<usize>,
    scroll_offset: usize,
}

impl Default for OpenConversationState {
    fn default() -> Self {
        Self {
            conversation_id: None,
            title: String::new(),
            epoch: 0,
            messages: Vec::new(),
            total_elements: 0,
            ui_state: OpenConversationUiState::Empty,
            older_in_flight: false,
            selected_index: None,
            scroll_offset: 0,
        }
    }
}

impl OpenConversationState {
    pub fn conversation_id(&self) -> Option<ConversationId> {
        self.conversation_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn ui_state(&self) -> OpenConversationUiState {
        self.ui_state
    }

    pub fn is_open(&self) -> bool {
        self.conversation_id.is_some()
    }

    pub fn total_elements(&self) -> usize {
        self.total_elements
    }

    pub fn is_loading_older(&self) -> bool {
        self.older_in_flight
    }

    /// Number of server-confirmed messages in the window.
    pub fn confirmed_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|message| !message.is_pending())
            .count()
    }

    pub fn has_older(&self) -> bool {
        self.confirmed_count() < self.total_elements
    }

    /// Returns the selected message index for scroll positioning.
    pub fn selected_index(&self) -> Option<usize> {
        self.selected_index
    }

    /// Returns the current scroll offset for the messages list.
    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    pub fn ticket(&self) -> Option<PageTicket> {
        self.conversation_id.map(|conversation_id| PageTicket {
            conversation_id,
            epoch: self.epoch,
        })
    }

    /// True when a result issued under `ticket` still belongs to this window.
    pub fn accepts(&self, ticket: PageTicket) -> bool {
        self.conversation_id == Some(ticket.conversation_id) && self.epoch == ticket.epoch
    }

    /// Opens a new window, discarding the previous one entirely.
    pub fn begin(&mut self, conversation_id: ConversationId, title: String) -> PageTicket {
        self.epoch = self.epoch.wrapping_add(1);
        self.conversation_id = Some(conversation_id);
        self.title = title;
        self.messages.clear();
        self.total_elements = 0;
        self.ui_state = OpenConversationUiState::Loading;
        self.older_in_flight = false;
        self.selected_index = None;
        self.scroll_offset = 0;

        PageTicket {
            conversation_id,
            epoch: self.epoch,
        }
    }

    pub fn set_title(&mut self, title: String) {
        self.title = title;
    }

    /// Applies the newest page. Pending messages sent while loading are kept.
    pub fn apply_first_page(&mut self, page: MessagePage) {
        let pending: Vec<Message> = self
            .messages
            .drain(..)
            .filter(Message::is_pending)
            .collect();

        let mut seen_ids = HashSet::new();
        self.messages = page
            .messages
            .into_iter()
            .filter(|message| seen_ids.insert(message.id))
            .collect();
        self.messages.extend(pending);
        self.sort_messages();

        self.total_elements = page.total_elements;
        self.ui_state = OpenConversationUiState::Ready;
        self.selected_index = self.messages.len().checked_sub(1);
    }

    /// Reserves the next older page. Returns the zero-based page index to
    /// request, or `None` when nothing older remains or a request is already out.
    ///
    /// The index is derived from the confirmed count, which relies on the window
    /// being an unbroken run of the newest messages; `apply_refresh` keeps it so.
    pub fn begin_older(&mut self, page_size: usize) -> Option<usize> {
        if self.ui_state != OpenConversationUiState::Ready
            || self.older_in_flight
            || !self.has_older()
            || page_size == 0
        {
            return None;
        }

        self.older_in_flight = true;
        Some(self.confirmed_count() / page_size)
    }

    /// Prepends an older page, skipping boundary messages already loaded.
    ///
    /// A page that adds nothing means history has ended, whatever the reported
    /// total says.
    pub fn apply_older_page(&mut self, page: MessagePage) -> usize {
        self.older_in_flight = false;
        self.total_elements = page.total_elements;

        let known: HashSet<MessageId> = self.messages.iter().map(|message| message.id).collect();
        let mut older: Vec<Message> = page
            .messages
            .into_iter()
            .filter(|message| !known.contains(&message.id))
            .collect();
        let added = older.len();

        older.append(&mut self.messages);
        self.messages = older;
        self.sort_messages();

        if added == 0 {
            self.total_elements = self.confirmed_count();
        }

        self.selected_index = self.selected_index.map(|index| index + added);
        self.scroll_offset = self.scroll_offset.saturating_add(added);
        added
    }

    pub fn older_failed(&mut self) {
        self.older_in_flight = false;
    }

    /// Merges a re-fetched newest page into the window.
    ///
    /// Newly confirmed messages replace the pending entries they correspond to
    /// (same sender, same content), so a sent message is shown exactly once.
    ///
    /// A page sharing no message with the window means more than a page
    /// arrived in between. The window then restarts from that page so it stays
    /// contiguous, and tickets issued before the restart stop being accepted.
    /// Older history is paged in again.
    pub fn apply_refresh(&mut self, page: MessagePage) {
        if self.ui_state != OpenConversationUiState::Ready {
            self.apply_first_page(page);
            return;
        }

        let mut was_at_bottom = self
            .selected_index
            .map_or(true, |index| index + 1 >= self.messages.len());

        if self.leaves_gap(&page) {
            self.epoch = self.epoch.wrapping_add(1);
            self.older_in_flight = false;
            self.messages.retain(Message::is_pending);
            self.total_elements = 0;
            self.scroll_offset = 0;
            was_at_bottom = true;
        }

        let mut new_confirmed = Vec::new();
        for incoming in page.messages {
            match self
                .messages
                .iter_mut()
                .find(|existing| existing.id == incoming.id)
            {
                Some(existing) => {
                    if incoming.seen {
                        existing.mark_seen();
                    }
                }
                None => new_confirmed.push(incoming),
            }
        }

        let mut claimed = vec![false; new_confirmed.len()];
        self.messages.retain(|message| {
            if !message.is_pending() {
                return true;
            }

            let matched = new_confirmed.iter().enumerate().position(|(index, confirmed)| {
                !claimed[index]
                    && confirmed.sender_id == message.sender_id
                    && confirmed.content == message.content
            });

            match matched {
                Some(index) => {
                    claimed[index] = true;
                    false
                }
                None => true,
            }
        });

        self.messages.extend(new_confirmed);
        self.sort_messages();
        self.total_elements = self.total_elements.max(page.total_elements);

        if was_at_bottom {
            self.selected_index = self.messages.len().checked_sub(1);
        }
    }

    pub fn insert_pending(&mut self, message: Message) {
        self.messages.push(message);
        self.sort_messages();
        self.selected_index = self.messages.len().checked_sub(1);
    }

    /// Removes an optimistic message that could not be published.
    pub fn remove_pending(&mut self, id: MessageId) -> bool {
        let before = self.messages.len();
        self.messages
            .retain(|message| !(message.is_pending() && message.id == id));
        let removed = self.messages.len() != before;

        if removed {
            self.selected_index = match self.selected_index {
                Some(index) if index >= self.messages.len() => self.messages.len().checked_sub(1),
                other => other,
            };
        }

        removed
    }

    /// Marks every message addressed to `viewer` as seen. Returns how many flipped.
    pub fn mark_seen_for(&mut self, viewer: UserId) -> usize {
        let mut flipped = 0;
        for message in &mut self.messages {
            if message.receiver_id == viewer && !message.seen {
                message.mark_seen();
                flipped += 1;
            }
        }
        flipped
    }

    /// Records a failed first load. A window that already shows messages is kept.
    pub fn set_error(&mut self) {
        if self.ui_state == OpenConversationUiState::Loading {
            self.ui_state = OpenConversationUiState::Error;
        }
    }

    pub fn clear(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
        self.conversation_id = None;
        self.title.clear();
        self.messages.clear();
        self.total_elements = 0;
        self.ui_state = OpenConversationUiState::Empty;
        self.older_in_flight = false;
        self.selected_index = None;
        self.scroll_offset = 0;
    }

    /// Selects the next message (moves down in the list).
    pub fn select_next(&mut self) {
        if self.messages.is_empty() {
            return;
        }

        self.selected_index = match self.selected_index {
            None => Some(0),
            Some(idx) if idx + 1 < self.messages.len() => Some(idx + 1),
            Some(idx) => Some(idx),
        };
    }

    /// Selects the previous message (moves up in the list).
    pub fn select_previous(&mut self) {
        if self.messages.is_empty() {
            return;
        }

        self.selected_index = match self.selected_index {
            None => Some(self.messages.len() - 1),
            Some(idx) => Some(idx.saturating_sub(1)),
        };
    }

    pub fn is_at_top(&self) -> bool {
        self.selected_index == Some(0)
    }

    /// Keeps the cursor visible with `SCROLL_MARGIN` rows above and below.
    ///
    /// `element_index` is the visual index in the list (date separators included).
    pub fn update_scroll_offset(&mut self, element_index: usize, viewport_height: usize) {
        if viewport_height == 0 {
            return;
        }

        let effective_margin = SCROLL_MARGIN.min(viewport_height / 2);

        if element_index < self.scroll_offset + effective_margin {
            self.scroll_offset = element_index.saturating_sub(effective_margin);
        }

        let visible_bottom = self.scroll_offset + viewport_height;
        if element_index + effective_margin >= visible_bottom {
            self.scroll_offset =
                (element_index + effective_margin + 1).saturating_sub(viewport_height);
        }
    }

    fn leaves_gap(&self, page: &MessagePage) -> bool {
        if page.messages.is_empty() || self.confirmed_count() == 0 {
            return false;
        }

        let known: HashSet<MessageId> = self
            .messages
            .iter()
            .filter(|message| !message.is_pending())
            .map(|message| message.id)
            .collect();
        !page.messages.iter().any(|message| known.contains(&message.id))
    }

    fn sort_messages(&mut self) {
        self.messages.sort_by_key(Message::sort_key);
    }
}
