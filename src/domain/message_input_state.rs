//! Editable single-line text buffer used by the compose and search inputs.

/// Upper bound on a composed message, in characters.
const MAX_INPUT_LENGTH: usize = 2000;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MessageInputState {
    text: String,
    /// Cursor position as a character index, not a byte index.
    cursor_position: usize,
}

impl MessageInputState {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor_position(&self) -> usize {
        self.cursor_position
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Returns false when the buffer is full and the character was dropped.
    pub fn insert_char(&mut self, ch: char) -> bool {
        if self.text.chars().count() >= MAX_INPUT_LENGTH {
            return false;
        }

        let byte_idx = self.byte_index(self.cursor_position);
        self.text.insert(byte_idx, ch);
        self.cursor_position += 1;
        true
    }

    pub fn backspace(&mut self) {
        if self.cursor_position == 0 {
            return;
        }

        self.cursor_position -= 1;
        self.remove_at_cursor();
    }

    pub fn delete(&mut self) {
        if self.cursor_position < self.text.chars().count() {
            self.remove_at_cursor();
        }
    }

    pub fn move_left(&mut self) {
        self.cursor_position = self.cursor_position.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor_position = (self.cursor_position + 1).min(self.text.chars().count());
    }

    pub fn move_home(&mut self) {
        self.cursor_position = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor_position = self.text.chars().count();
    }

    /// Takes the buffer content and leaves the input empty.
    pub fn take_text(&mut self) -> String {
        self.cursor_position = 0;
        std::mem::take(&mut self.text)
    }

    /// Puts text back, e.g. after a refused send, with the cursor at the end.
    pub fn restore(&mut self, text: String) {
        self.text = text;
        self.move_end();
    }

    fn remove_at_cursor(&mut self) {
        let start = self.byte_index(self.cursor_position);
        let end = self.byte_index(self.cursor_position + 1);
        self.text.drain(start..end);
    }

    fn byte_index(&self, char_idx: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_idx)
            .map(|(byte_idx, _)| byte_idx)
            .unwrap_or(self.text.len())
    }
}
