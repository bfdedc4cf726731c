use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, BorderType, Clear, Paragraph};
use unicode_width::UnicodeWidthChar;

/// Border plus one cell of padding on every side.
const DIALOG_CHROME: u16 = 4;
/// Row reserved under the content for the help line.
const HELP_ROWS: u16 = 1;

pub const PROMPT_DIALOG_TITLE: &str = "Generated Prompt";
pub const PERSONA_DIALOG_TITLE: &str = "Select Active Personas";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub label: String,
    pub selected: bool,
}

impl ListEntry {
    pub fn new(label: impl Into<String>, selected: bool) -> Self {
        Self {
            label: label.into(),
            selected,
        }
    }
}

/// What a dialog asks its owner to do after handling a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogEvent {
    Close,
    Copy,
    Selected(Vec<ListEntry>),
}

/// Something that can live inside a [`Dialog`].
pub trait DialogContent {
    fn render(&self, frame: &mut Frame, area: Rect);
    fn update(&mut self, key: KeyEvent) -> Option<DialogEvent>;
    fn init(&mut self);
    /// Size of the content area, not the whole dialog.
    fn set_size(&mut self, width: u16, height: u16);
    fn on_show(&mut self);
    fn on_hide(&mut self);
}

#[derive(Debug, Clone)]
pub struct DialogConfig {
    pub title: String,
    /// Share of the screen, in percent.
    pub width_percent: u16,
    pub height_percent: u16,
    /// Whether `esc` closes the dialog.
    pub dismissible: bool,
    pub help_text: String,
}

impl Default for DialogConfig {
    fn default() -> Self {
        Self {
            title: String::new(),
            width_percent: 60,
            height_percent: 60,
            dismissible: true,
            help_text: "esc: close".to_string(),
        }
    }
}

/// Modal wrapper: visibility, centering and chrome around some content.
#[derive(Debug)]
pub struct Dialog<C> {
    config: DialogConfig,
    content: C,
    visible: bool,
}

impl<C: DialogContent> Dialog<C> {
    pub fn new(config: DialogConfig, content: C) -> Self {
        Self {
            config,
            content,
            visible: false,
        }
    }

    pub fn init(&mut self) {
        self.content.init();
    }

    pub fn content(&self) -> &C {
        &self.content
    }

    pub fn content_mut(&mut self) -> &mut C {
        &mut self.content
    }

    pub fn show(&mut self) {
        self.visible = true;
        self.content.on_show();
    }

    pub fn hide(&mut self) {
        if self.visible {
            self.visible = false;
            self.content.on_hide();
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Takes the terminal size and hands the derived content size down.
    pub fn set_size(&mut self, width: u16, height: u16) {
        let area = self.area(Rect::new(0, 0, width, height));
        self.content.set_size(
            area.width.saturating_sub(DIALOG_CHROME),
            area.height.saturating_sub(DIALOG_CHROME + HELP_ROWS),
        );
    }

    /// Hidden dialogs ignore input. `Close` from either side hides the dialog.
    pub fn update(&mut self, key: KeyEvent) -> Option<DialogEvent> {
        if !self.visible {
            return None;
        }
        if key.code == KeyCode::Esc && self.config.dismissible {
            self.hide();
            return Some(DialogEvent::Close);
        }
        let event = self.content.update(key);
        if event == Some(DialogEvent::Close) {
            self.hide();
        }
        event
    }

    /// The dialog rectangle centered in `screen`.
    pub fn area(&self, screen: Rect) -> Rect {
        let width = (u32::from(screen.width) * u32::from(self.config.width_percent) / 100) as u16;
        let height =
            (u32::from(screen.height) * u32::from(self.config.height_percent) / 100) as u16;
        Rect::new(
            screen.x + (screen.width - width) / 2,
            screen.y + (screen.height - height) / 2,
            width,
            height,
        )
    }

    pub fn render(&self, frame: &mut Frame) {
        if !self.visible {
            return;
        }
        let area = self.area(frame.area());
        frame.render_widget(Clear, area);

        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::Cyan))
            .title(format!(" {} ", self.config.title));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let padded = Rect::new(
            inner.x + 1,
            inner.y + 1,
            inner.width.saturating_sub(2),
            inner.height.saturating_sub(2),
        );
        let content_height = padded.height.saturating_sub(HELP_ROWS);
        self.content.render(
            frame,
            Rect::new(padded.x, padded.y, padded.width, content_height),
        );

        if padded.height > content_height {
            let help = Paragraph::new(self.config.help_text.as_str())
                .style(Style::default().fg(Color::DarkGray));
            frame.render_widget(
                help,
                Rect::new(padded.x, padded.y + content_height, padded.width, HELP_ROWS),
            );
        }
    }
}

/// Read-only scrollable text.
#[derive(Debug, Default)]
pub struct TextContent {
    text: String,
    lines: Vec<String>,
    offset: usize,
    width: u16,
    height: u16,
}

impl TextContent {
    pub fn new(text: &str) -> Self {
        let mut content = Self::default();
        content.set_text(text);
        content
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replaces the text and scrolls back to the top.
    pub fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
        self.offset = 0;
        self.rewrap();
    }

    #[cfg(test)]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[cfg(test)]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    fn rewrap(&mut self) {
        let width = usize::from(self.width);
        self.lines = self
            .text
            .split('\n')
            .flat_map(|line| hard_wrap(line, width))
            .collect();
        self.offset = self.offset.min(self.max_offset());
    }

    fn max_offset(&self) -> usize {
        self.lines
            .len()
            .saturating_sub(usize::from(self.height).max(1))
    }

    fn scroll(&mut self, delta: isize) {
        self.offset = self
            .offset
            .saturating_add_signed(delta)
            .min(self.max_offset());
    }

    /// How far down the text the view is, 0..=100.
    pub fn scroll_percent(&self) -> usize {
        match self.max_offset() {
            0 => 100,
            max => self.offset * 100 / max,
        }
    }
}

/// Splits on display width without touching whitespace, so indentation survives.
fn hard_wrap(line: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![line.to_string()];
    }
    let mut rows = Vec::new();
    let mut current = String::new();
    let mut current_width = 0;
    for ch in line.chars() {
        let w = ch.width().unwrap_or(0);
        if current_width + w > width && !current.is_empty() {
            rows.push(std::mem::take(&mut current));
            current_width = 0;
        }
        current.push(ch);
        current_width += w;
    }
    rows.push(current);
    rows
}

impl DialogContent for TextContent {
    fn render(&self, frame: &mut Frame, area: Rect) {
        if area.height == 0 {
            return;
        }
        let body_height = area.height.saturating_sub(1);
        let end = (self.offset + usize::from(body_height)).min(self.lines.len());
        let visible: Vec<Line> = self.lines[self.offset.min(end)..end]
            .iter()
            .map(|l| Line::raw(l.as_str()))
            .collect();
        frame.render_widget(
            Paragraph::new(visible),
            Rect::new(area.x, area.y, area.width, body_height),
        );

        let indicator = Paragraph::new(format!("{}%", self.scroll_percent()))
            .alignment(Alignment::Right)
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(
            indicator,
            Rect::new(area.x, area.y + body_height, area.width, 1),
        );
    }

    fn update(&mut self, key: KeyEvent) -> Option<DialogEvent> {
        let page = self.height.max(1) as isize;
        match key.code {
            KeyCode::Char('y') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Some(DialogEvent::Copy);
            }
            KeyCode::Char('q') | KeyCode::Enter => return Some(DialogEvent::Close),
            KeyCode::Up | KeyCode::Char('k') => self.scroll(-1),
            KeyCode::Down | KeyCode::Char('j') => self.scroll(1),
            KeyCode::PageUp => self.scroll(-page),
            KeyCode::PageDown => self.scroll(page),
            KeyCode::Home | KeyCode::Char('g') => self.offset = 0,
            KeyCode::End | KeyCode::Char('G') => self.offset = self.max_offset(),
            _ => {}
        }
        None
    }

    fn init(&mut self) {
        self.rewrap();
    }

    fn set_size(&mut self, width: u16, height: u16) {
        self.width = width;
        // One row is taken by the scroll indicator.
        self.height = height.saturating_sub(1);
        self.rewrap();
    }

    fn on_show(&mut self) {
        self.offset = 0;
    }

    fn on_hide(&mut self) {}
}

/// Cursor-driven list, optionally with checkboxes.
#[derive(Debug, Default)]
pub struct ListContent {
    entries: Vec<ListEntry>,
    cursor: usize,
    multi_select: bool,
}

impl ListContent {
    pub fn new(entries: Vec<ListEntry>, multi_select: bool) -> Self {
        Self {
            entries,
            multi_select,
            ..Self::default()
        }
    }

    #[cfg(test)]
    pub fn entries(&self) -> &[ListEntry] {
        &self.entries
    }

    pub fn set_entries(&mut self, entries: Vec<ListEntry>) {
        self.entries = entries;
        self.cursor = self.cursor.min(self.entries.len().saturating_sub(1));
    }

    #[cfg(test)]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn selected_entries(&self) -> Vec<ListEntry> {
        self.entries.iter().filter(|e| e.selected).cloned().collect()
    }

    fn move_cursor(&mut self, forward: bool) {
        let len = self.entries.len();
        if len == 0 {
            return;
        }
        self.cursor = if forward {
            (self.cursor + 1) % len
        } else {
            (self.cursor + len - 1) % len
        };
    }
}

impl DialogContent for ListContent {
    fn render(&self, frame: &mut Frame, area: Rect) {
        if self.entries.is_empty() {
            frame.render_widget(
                Paragraph::new("Nothing to choose from")
                    .style(Style::default().fg(Color::DarkGray)),
                area,
            );
            return;
        }
        let height = usize::from(area.height.max(1));
        let start = (self.cursor + 1).saturating_sub(height);
        let lines: Vec<Line> = self
            .entries
            .iter()
            .enumerate()
            .skip(start)
            .take(height)
            .map(|(i, entry)| {
                let marker = if i == self.cursor { "▶ " } else { "  " };
                let checkbox = match (self.multi_select, entry.selected) {
                    (false, _) => "",
                    (true, true) => "☑ ",
                    (true, false) => "☐ ",
                };
                let line = Line::raw(format!("{marker}{checkbox}{}", entry.label));
                if i == self.cursor {
                    line.style(Style::default().add_modifier(Modifier::BOLD))
                } else {
                    line
                }
            })
            .collect();
        frame.render_widget(Paragraph::new(lines), area);
    }

    fn update(&mut self, key: KeyEvent) -> Option<DialogEvent> {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.move_cursor(false),
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor(true),
            KeyCode::Char(' ') if self.multi_select => {
                if let Some(entry) = self.entries.get_mut(self.cursor) {
                    entry.selected = !entry.selected;
                }
            }
            KeyCode::Enter => {
                let chosen = if self.multi_select {
                    self.selected_entries()
                } else {
                    self.entries.get(self.cursor).cloned().into_iter().collect()
                };
                return Some(DialogEvent::Selected(chosen));
            }
            _ => {}
        }
        None
    }

    fn init(&mut self) {
        self.cursor = 0;
    }

    // Rows come from the render area.
    fn set_size(&mut self, _width: u16, _height: u16) {}

    fn on_show(&mut self) {
        self.cursor = 0;
    }

    fn on_hide(&mut self) {}
}

pub fn prompt_dialog() -> Dialog<TextContent> {
    Dialog::new(
        DialogConfig {
            title: PROMPT_DIALOG_TITLE.to_string(),
            width_percent: 80,
            height_percent: 80,
            dismissible: true,
            help_text: "↑/↓: scroll, ctrl+y: copy, q/esc: close".to_string(),
        },
        TextContent::new(""),
    )
}

pub fn persona_dialog() -> Dialog<ListContent> {
    Dialog::new(
        DialogConfig {
            title: PERSONA_DIALOG_TITLE.to_string(),
            width_percent: 50,
            height_percent: 50,
            dismissible: true,
            help_text: "space: toggle, enter: apply, esc: cancel".to_string(),
        },
        ListContent::new(Vec::new(), true),
    )
}
