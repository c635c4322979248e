//! Message list rendering logic.
//!
//! Handles visual formatting of messages including:
//! - Sender grouping (consecutive messages from one sender show the name once)
//! - Date separators between messages from different days
//! - Pending and seen markers on outgoing messages

use chrono::{Local, TimeZone};
use ratatui::{
    layout::Alignment,
    style::Style,
    text::{Line, Span},
    widgets::ListItem,
};

use crate::domain::{message::Message, user::UserId};

use super::styles;

const INDENT: &str = "      ";
const PENDING_MARKER: &str = " \u{2026}";
const SEEN_MARKER: &str = " \u{2713}";

/// Represents a visual element in the messages list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageListElement {
    /// Date separator line (e.g., "——— 14 Feb 2026 ———").
    DateSeparator(String),
    Message {
        time: String,
        sender: Option<String>,
        content: String,
        status: DeliveryStatus,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    /// Incoming, or outgoing and not seen yet.
    Plain,
    Pending,
    Seen,
}

/// Builds the visual elements for the open window, oldest first.
pub fn build_message_list_elements(
    messages: &[Message],
    viewer: UserId,
    partner_name: &str,
) -> Vec<MessageListElement> {
    let mut elements = Vec::new();
    let mut prev_date: Option<chrono::NaiveDate> = None;
    let mut prev_sender: Option<UserId> = None;

    for message in messages {
        let msg_date = timestamp_to_date(message.created_at_ms);

        if prev_date != Some(msg_date) {
            elements.push(MessageListElement::DateSeparator(format_date(msg_date)));
            prev_sender = None;
        }

        let outgoing = message.is_outgoing(viewer);
        let sender = (prev_sender != Some(message.sender_id)).then(|| {
            if outgoing {
                "You".to_owned()
            } else {
                partner_name.to_owned()
            }
        });

        let status = if message.is_pending() {
            DeliveryStatus::Pending
        } else if outgoing && message.seen {
            DeliveryStatus::Seen
        } else {
            DeliveryStatus::Plain
        };

        elements.push(MessageListElement::Message {
            time: format_time(message.created_at_ms),
            sender,
            content: message.content.clone(),
            status,
        });

        prev_date = Some(msg_date);
        prev_sender = Some(message.sender_id);
    }

    elements
}

/// Finds the element index of the `message_index`-th message, skipping separators.
pub fn message_index_to_element_index(
    elements: &[MessageListElement],
    message_index: usize,
) -> Option<usize> {
    elements
        .iter()
        .enumerate()
        .filter(|(_, element)| matches!(element, MessageListElement::Message { .. }))
        .nth(message_index)
        .map(|(element_index, _)| element_index)
}

pub fn element_to_list_item(element: &MessageListElement) -> ListItem<'static> {
    match element {
        MessageListElement::DateSeparator(date) => date_separator_item(date),
        MessageListElement::Message {
            time,
            sender,
            content,
            status,
        } => message_item(time, sender.as_deref(), content, *status),
    }
}

fn date_separator_item(date: &str) -> ListItem<'static> {
    let separator = format!("——— {date} ———");
    let line = Line::from(vec![Span::styled(
        separator,
        styles::date_separator_style(),
    )])
    .alignment(Alignment::Center);
    ListItem::new(vec![Line::default(), line, Line::default()])
}

fn message_item(
    time: &str,
    sender: Option<&str>,
    content: &str,
    status: DeliveryStatus,
) -> ListItem<'static> {
    let text_style = match status {
        DeliveryStatus::Pending => styles::pending_message_style(),
        _ => styles::message_text_style(),
    };
    let time_span = Span::styled(format!("{time:>5} "), styles::message_time_style());

    let mut lines = Vec::new();
    let mut content_lines = content.lines();

    if let Some(name) = sender {
        lines.push(Line::from(vec![
            time_span,
            Span::styled(format!("{name}:"), styles::message_sender_style()),
        ]));
    } else if let Some(first_line) = content_lines.next() {
        // Grouped message: time and first content line share a row.
        lines.push(Line::from(vec![
            time_span,
            Span::styled(first_line.to_owned(), text_style),
        ]));
    }

    for text_line in content_lines {
        lines.push(indented(text_line, text_style));
    }

    if let Some(last) = lines.last_mut() {
        match status {
            DeliveryStatus::Pending => last.spans.push(Span::styled(
                PENDING_MARKER,
                styles::pending_message_style(),
            )),
            DeliveryStatus::Seen => last
                .spans
                .push(Span::styled(SEEN_MARKER, styles::seen_marker_style())),
            DeliveryStatus::Plain => {}
        }
    }

    ListItem::new(lines)
}

fn indented(text: &str, style: Style) -> Line<'static> {
    Line::from(vec![
        Span::raw(INDENT),
        Span::styled(text.to_owned(), style),
    ])
}

fn timestamp_to_date(timestamp_ms: i64) -> chrono::NaiveDate {
    match Local.timestamp_millis_opt(timestamp_ms) {
        chrono::LocalResult::Single(dt) => dt.date_naive(),
        chrono::LocalResult::Ambiguous(dt, _) => dt.date_naive(),
        chrono::LocalResult::None => Local::now().date_naive(),
    }
}

fn format_date(date: chrono::NaiveDate) -> String {
    date.format("%-d %b %Y").to_string()
}

fn format_time(timestamp_ms: i64) -> String {
    match Local.timestamp_millis_opt(timestamp_ms) {
        chrono::LocalResult::Single(dt) => dt.format("%H:%M").to_string(),
        chrono::LocalResult::Ambiguous(dt, _) => dt.format("%H:%M").to_string(),
        chrono::LocalResult::None => "??:??".to_owned(),
    }
}
