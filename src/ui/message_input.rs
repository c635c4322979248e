//! Single-line input field rendering, shared by the composer and user search.

use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::domain::message_input_state::MessageInputState;

use super::styles;

const PROMPT_SYMBOL: &str = "> ";

pub struct InputField<'a> {
    pub title: &'a str,
    pub placeholder: &'a str,
    pub state: &'a MessageInputState,
    pub focused: bool,
}

pub fn render_input(frame: &mut Frame<'_>, area: Rect, field: InputField<'_>) {
    let border_style = if field.focused {
        styles::active_panel_border_style()
    } else {
        styles::inactive_panel_border_style()
    };

    let paragraph = Paragraph::new(build_input_line(field.state, field.placeholder, field.focused))
        .block(
            Block::default()
                .title(field.title.to_owned())
                .borders(Borders::ALL)
                .border_style(border_style),
        );
    frame.render_widget(paragraph, area);

    if field.focused {
        let cursor_x = area
            .x
            .saturating_add(1)
            .saturating_add(PROMPT_SYMBOL.len() as u16)
            .saturating_add(cursor_column(field.state).min(u16::MAX as usize) as u16);
        frame.set_cursor_position((cursor_x, area.y.saturating_add(1)));
    }
}

/// Display width of the text left of the cursor.
fn cursor_column(state: &MessageInputState) -> usize {
    let before: String = state.text().chars().take(state.cursor_position()).collect();
    before.width()
}

fn build_input_line(state: &MessageInputState, placeholder: &str, focused: bool) -> Line<'static> {
    let prompt = Span::styled(PROMPT_SYMBOL.to_owned(), styles::input_prompt_style());

    if !focused && state.is_empty() {
        Line::from(vec![
            prompt,
            Span::styled(placeholder.to_owned(), styles::input_placeholder_style()),
        ])
    } else {
        Line::from(vec![
            prompt,
            Span::styled(state.text().to_owned(), styles::input_text_style()),
        ])
    }
}
