use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::domain::{
    conversation::Conversation,
    conversation_list_state::ConversationListUiState,
    open_conversation_state::{OpenConversationState, OpenConversationUiState},
    session_state::SessionState,
    shell_state::{ActivePane, ShellState},
    user::{UserId, UserSummary},
};

use super::message_input::{render_input, InputField};
use super::message_rendering::{
    build_message_list_elements, element_to_list_item, message_index_to_element_index,
};
use super::styles;

pub fn render(frame: &mut Frame<'_>, viewer: UserId, shell: &ShellState, session: &mut SessionState) {
    let [content_area, status_area] = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .areas(frame.area());

    let [left_area, right_area] = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .areas(content_area);

    // 3 rows for input: border, text, border.
    let [messages_area, input_area] = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)])
        .areas(right_area);

    let active_pane = shell.active_pane();
    if active_pane == ActivePane::Search {
        render_search_panel(frame, left_area, shell, session);
    } else {
        render_conversation_list_panel(frame, left_area, viewer, session, active_pane);
    }
    render_messages_panel(frame, messages_area, viewer, session, active_pane);
    render_input(
        frame,
        input_area,
        InputField {
            title: "",
            placeholder: "Press 'i' to type a message...",
            state: shell.message_input(),
            focused: active_pane == ActivePane::MessageInput,
        },
    );

    frame.render_widget(Paragraph::new(status_line(shell, session)), status_area);
}

fn border_style(is_active: bool) -> Style {
    if is_active {
        styles::active_panel_border_style()
    } else {
        styles::inactive_panel_border_style()
    }
}

fn panel(title: impl Into<Line<'static>>, is_active: bool) -> Block<'static> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style(is_active))
}

fn render_conversation_list_panel(
    frame: &mut Frame<'_>,
    area: Rect,
    viewer: UserId,
    session: &SessionState,
    active_pane: ActivePane,
) {
    let is_active = active_pane == ActivePane::Conversations;
    let list_state = &session.conversations;

    let placeholder = match list_state.ui_state() {
        ConversationListUiState::Loading => Some("Loading conversations..."),
        ConversationListUiState::Empty => Some("No conversations yet. Press / to find someone."),
        ConversationListUiState::Error => Some("Failed to load conversations. Press r to retry."),
        ConversationListUiState::Ready => None,
    };
    if let Some(text) = placeholder {
        frame.render_widget(Paragraph::new(text).block(panel("Conversations", is_active)), area);
        return;
    }

    let conversations = list_state.conversations();
    let inner_width = area.width.saturating_sub(2) as usize;
    let items: Vec<ListItem<'static>> = conversations
        .iter()
        .map(|conversation| ListItem::new(conversation_line(conversation, viewer, inner_width)))
        .collect();

    let list = List::new(items)
        .block(panel(format!("Conversations ({})", conversations.len()), is_active))
        .highlight_style(styles::highlight_style());

    let mut state = ListState::default();
    state.select(list_state.selected_index());
    frame.render_stateful_widget(list, area, &mut state);
}

fn conversation_line(conversation: &Conversation, viewer: UserId, width: usize) -> Line<'static> {
    let timestamp = conversation
        .last_message_unix_ms
        .map(format_list_timestamp)
        .unwrap_or_else(|| "     ".to_owned());
    let name = conversation.partner_name(viewer);

    let preview = conversation
        .last_message_preview
        .as_deref()
        .map(normalize_preview)
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| "No messages yet".to_owned());

    // timestamp (5) + " | " (3) + name + " "
    let used = 8 + name.chars().count() + 1;
    let available = width.saturating_sub(used);
    let preview = truncate_with_ellipsis(&preview, available);

    Line::from(vec![
        Span::styled(format!("{timestamp:>5}"), styles::timestamp_style()),
        Span::styled(" | ", styles::separator_style()),
        Span::styled(name, styles::partner_name_style()),
        Span::raw(" "),
        Span::styled(preview, styles::conversation_preview_style()),
    ])
}

fn truncate_with_ellipsis(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_owned();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

fn normalize_preview(preview: &str) -> String {
    preview.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn format_list_timestamp(timestamp_ms: i64) -> String {
    use chrono::{Local, TimeZone};

    let datetime = match Local.timestamp_millis_opt(timestamp_ms) {
        chrono::LocalResult::Single(dt) => dt,
        chrono::LocalResult::Ambiguous(dt, _) => dt,
        chrono::LocalResult::None => return "     ".to_owned(),
    };

    if datetime.date_naive() == Local::now().date_naive() {
        datetime.format("%H:%M").to_string()
    } else {
        datetime.format("%d.%m").to_string()
    }
}

fn render_search_panel(frame: &mut Frame<'_>, area: Rect, shell: &ShellState, session: &SessionState) {
    let [input_area, results_area] = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1)])
        .areas(area);

    render_input(
        frame,
        input_area,
        InputField {
            title: "Find user",
            placeholder: "name or email",
            state: shell.search_input(),
            focused: true,
        },
    );

    if session.search_results.is_empty() {
        let text = if shell.search_input().text().trim().is_empty() {
            "Type to search. Enter starts a chat, Esc goes back."
        } else {
            "No users found."
        };
        frame.render_widget(Paragraph::new(text).block(panel("Results", true)), results_area);
        return;
    }

    let items: Vec<ListItem<'static>> = session
        .search_results
        .iter()
        .map(|user| ListItem::new(search_result_line(user)))
        .collect();
    let list = List::new(items)
        .block(panel("Results", true))
        .highlight_style(styles::highlight_style());

    let mut state = ListState::default();
    state.select(Some(shell.search_selected().min(session.search_results.len() - 1)));
    frame.render_stateful_widget(list, results_area, &mut state);
}

fn search_result_line(user: &UserSummary) -> Line<'static> {
    let mut spans = vec![Span::styled(user.display_name(), styles::partner_name_style())];
    if let Some(email) = &user.email {
        spans.push(Span::styled(format!(" <{email}>"), styles::conversation_preview_style()));
    }
    Line::from(spans)
}

fn render_messages_panel(
    frame: &mut Frame<'_>,
    area: Rect,
    viewer: UserId,
    session: &mut SessionState,
    active_pane: ActivePane,
) {
    let is_active = active_pane == ActivePane::Messages;
    let title = open_conversation_title(&session.open);

    let placeholder = match session.open.ui_state() {
        OpenConversationUiState::Empty => Some("Select a conversation to view messages"),
        OpenConversationUiState::Loading => Some("Loading messages..."),
        OpenConversationUiState::Error => Some("Failed to load messages. Press Enter to retry."),
        OpenConversationUiState::Ready if session.open.messages().is_empty() => {
            Some("No messages yet. Say hello!")
        }
        OpenConversationUiState::Ready => None,
    };
    if let Some(text) = placeholder {
        frame.render_widget(Paragraph::new(text).block(panel(title, is_active)), area);
        return;
    }

    let elements =
        build_message_list_elements(session.open.messages(), viewer, session.open.title());
    let items: Vec<ListItem<'static>> = elements.iter().map(element_to_list_item).collect();

    let viewport_height = area.height.saturating_sub(2) as usize;
    let element_index = session
        .open
        .selected_index()
        .and_then(|message_index| message_index_to_element_index(&elements, message_index));
    if let Some(index) = element_index {
        session.open.update_scroll_offset(index, viewport_height);
    }

    let list = List::new(items)
        .block(panel(title, is_active))
        .highlight_style(styles::highlight_style());

    let mut list_state = ListState::default();
    list_state.select(element_index);
    *list_state.offset_mut() = session.open.scroll_offset();
    frame.render_stateful_widget(list, area, &mut list_state);
}

fn open_conversation_title(open: &OpenConversationState) -> String {
    if !open.is_open() {
        return "Messages".to_owned();
    }

    let mut title = format!("Messages: {}", open.title());
    if open.is_loading_older() {
        title.push_str(" (loading older...)");
    } else if open.has_older() {
        title.push_str(&format!(" ({} of {})", open.confirmed_count(), open.total_elements()));
    }
    title
}

fn status_line(shell: &ShellState, session: &SessionState) -> Line<'static> {
    let connectivity = session.connectivity;
    let nav_hint = match shell.active_pane() {
        ActivePane::Conversations => "j/k: navigate | Enter: open | /: find user | r: refresh | q: quit",
        ActivePane::Messages => "j/k: scroll | k at top: older | i: compose | h/Esc: back | q: quit",
        ActivePane::MessageInput => "Enter: send | Esc: messages | Tab: conversations",
        ActivePane::Search => "type to search | Up/Down: select | Enter: chat | Esc: back",
    };

    let mut spans = vec![Span::styled(
        format!("[{}]", connectivity.as_label()),
        styles::connectivity_style(connectivity),
    )];
    if let Some(notice) = shell.last_notice() {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            format!("{}: {}", notice.code, notice.text),
            styles::notice_style(notice.level),
        ));
    }
    spans.push(Span::raw(format!(" | {nav_hint}")));
    Line::from(spans)
}
