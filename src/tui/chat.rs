use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub const TITLE: &str = "💬 User Prompt";
pub const HELP_TEXT: &str =
    "Enter your prompt below. Ctrl+S to generate XML prompt, Ctrl+Y to copy";
pub const PLACEHOLDER: &str = "Enter your prompt for the LLM here...";

/// Multi-line text input. The cursor is a byte offset on a char boundary.
#[derive(Debug, Default)]
pub struct ChatPanel {
    text: String,
    cursor: usize,
}

impl ChatPanel {
    pub fn new(initial: &str) -> Self {
        Self {
            text: initial.to_string(),
            cursor: initial.len(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Applies an editing key. Returns whether the text changed.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
        {
            return false;
        }
        match key.code {
            KeyCode::Char(c) => {
                self.text.insert(self.cursor, c);
                self.cursor += c.len_utf8();
                true
            }
            KeyCode::Enter => {
                self.text.insert(self.cursor, '\n');
                self.cursor += 1;
                true
            }
            KeyCode::Backspace => match self.prev_boundary() {
                Some(prev) => {
                    self.text.replace_range(prev..self.cursor, "");
                    self.cursor = prev;
                    true
                }
                None => false,
            },
            KeyCode::Delete => match self.next_boundary() {
                Some(next) => {
                    self.text.replace_range(self.cursor..next, "");
                    true
                }
                None => false,
            },
            KeyCode::Left => {
                if let Some(prev) = self.prev_boundary() {
                    self.cursor = prev;
                }
                false
            }
            KeyCode::Right => {
                if let Some(next) = self.next_boundary() {
                    self.cursor = next;
                }
                false
            }
            KeyCode::Home => {
                self.cursor = self.line_start();
                false
            }
            KeyCode::End => {
                self.cursor = self.line_end();
                false
            }
            KeyCode::Up => {
                self.move_vertically(-1);
                false
            }
            KeyCode::Down => {
                self.move_vertically(1);
                false
            }
            _ => false,
        }
    }

    fn prev_boundary(&self) -> Option<usize> {
        self.text[..self.cursor].char_indices().next_back().map(|(i, _)| i)
    }

    fn next_boundary(&self) -> Option<usize> {
        self.text[self.cursor..]
            .chars()
            .next()
            .map(|c| self.cursor + c.len_utf8())
    }

    fn line_start(&self) -> usize {
        self.text[..self.cursor].rfind('\n').map_or(0, |i| i + 1)
    }

    fn line_end(&self) -> usize {
        self.text[self.cursor..]
            .find('\n')
            .map_or(self.text.len(), |i| self.cursor + i)
    }

    fn move_vertically(&mut self, delta: isize) {
        let (row, col) = self.cursor_position();
        let Some(target_row) = row.checked_add_signed(delta) else {
            return;
        };
        let mut offset = 0;
        for (i, line) in self.text.split('\n').enumerate() {
            if i == target_row {
                let mut width = 0;
                let mut byte = line.len();
                for (idx, ch) in line.char_indices() {
                    if width >= col {
                        byte = idx;
                        break;
                    }
                    width += ch.width().unwrap_or(0);
                }
                self.cursor = offset + byte;
                return;
            }
            offset += line.len() + 1;
        }
    }

    /// Zero-based (row, display column) of the cursor.
    pub fn cursor_position(&self) -> (usize, usize) {
        let before = &self.text[..self.cursor];
        let row = before.matches('\n').count();
        let line = &before[self.line_start()..];
        (row, line.width())
    }
}
