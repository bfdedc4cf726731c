use super::app_state::AppMsg;
use crate::error::Result;
use crate::file_scanner::{FileNode, scan_directory};
use crate::tree_builder::{FileTreeItem, flatten_children};
use crate::utils::wrap_text;
use crossterm::event::{KeyCode, KeyEvent};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const TITLE: &str = "📁 File Tree";
pub const HELP_TEXT: &str = "↑/↓: navigate, Enter: expand/collapse, Space: select file";

/// Browsable tree of the workspace. Owns the authoritative selection map.
#[derive(Debug, Default)]
pub struct FileTreePanel {
    root: Option<FileNode>,
    items: Vec<FileTreeItem>,
    expanded: HashMap<PathBuf, bool>,
    selected: HashMap<PathBuf, bool>,
    cursor: usize,
    offset: usize,
    width: u16,
    viewport_height: usize,
}

impl FileTreePanel {
    /// Starts with the given paths pre-selected; nothing is shown until
    /// [`load`](Self::load) or [`set_tree`](Self::set_tree).
    pub fn new(selected: &[PathBuf]) -> Self {
        Self {
            selected: selected.iter().map(|p| (p.clone(), true)).collect(),
            viewport_height: 1,
            ..Self::default()
        }
    }

    pub fn load(&mut self, root: &Path) -> Result<()> {
        let tree = scan_directory(root)?;
        debug!(root = %root.display(), entries = tree.descendant_count(), "workspace scanned");
        self.set_tree(tree);
        Ok(())
    }

    pub fn set_tree(&mut self, tree: FileNode) {
        self.root = Some(tree);
        self.refresh_items();
    }

    fn refresh_items(&mut self) {
        self.items = match &self.root {
            Some(root) => flatten_children(root, &self.expanded),
            None => Vec::new(),
        };
        for item in &mut self.items {
            item.selected = self.selected.get(&item.path).copied().unwrap_or(false);
        }
        self.ensure_visible();
    }

    pub fn items(&self) -> &[FileTreeItem] {
        &self.items
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    #[cfg(test)]
    pub fn viewport_height(&self) -> usize {
        self.viewport_height
    }

    pub fn selection(&self) -> &HashMap<PathBuf, bool> {
        &self.selected
    }

    /// Title and help text wrapped to the panel width, each followed by a blank line.
    pub fn header_lines(&self) -> Vec<String> {
        let width = usize::from(self.width);
        let mut lines = wrap_text(TITLE, width);
        lines.push(String::new());
        lines.extend(wrap_text(HELP_TEXT, width));
        lines.push(String::new());
        lines
    }

    pub fn set_size(&mut self, width: u16, height: u16) {
        self.width = width;
        let header = self.header_lines().len();
        self.viewport_height = usize::from(height).saturating_sub(header).max(1);
        self.ensure_visible();
    }

    /// The rows currently inside the viewport.
    pub fn visible_items(&self) -> &[FileTreeItem] {
        let end = (self.offset + self.viewport_height).min(self.items.len());
        self.items.get(self.offset..end).unwrap_or(&[])
    }

    /// Clamps the cursor into the list and scrolls just enough to show it.
    fn ensure_visible(&mut self) {
        if self.items.is_empty() {
            self.cursor = 0;
            self.offset = 0;
            return;
        }
        self.cursor = self.cursor.min(self.items.len() - 1);
        let height = self.viewport_height.max(1);
        if self.cursor < self.offset {
            self.offset = self.cursor;
        } else if self.cursor >= self.offset + height {
            self.offset = self.cursor + 1 - height;
        }
        self.offset = self.offset.min(self.items.len().saturating_sub(height));
    }

    fn move_cursor(&mut self, delta: isize) {
        self.cursor = self.cursor.saturating_add_signed(delta);
        self.ensure_visible();
    }

    fn snapshot(&self) -> AppMsg {
        AppMsg::FileSelection(self.selected.clone())
    }

    /// Flips the directory under the cursor between collapsed and expanded.
    pub fn toggle_expansion(&mut self) -> Option<AppMsg> {
        let item = self.items.get(self.cursor).filter(|item| item.is_dir)?;
        let path = item.path.clone();
        let open = self.expanded.get(&path).copied().unwrap_or(false);
        self.expanded.insert(path, !open);
        self.refresh_items();
        Some(self.snapshot())
    }

    /// Flips the selection of the file under the cursor. Directories are not selectable.
    pub fn toggle_selection(&mut self) -> Option<AppMsg> {
        let item = self.items.get(self.cursor).filter(|item| !item.is_dir)?;
        let path = item.path.clone();
        let selected = self.selected.get(&path).copied().unwrap_or(false);
        self.selected.insert(path, !selected);
        self.refresh_items();
        Some(self.snapshot())
    }

    pub fn set_selected(&mut self, path: &Path, selected: bool) {
        self.selected.insert(path.to_path_buf(), selected);
        self.refresh_items();
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<AppMsg> {
        let page = self.viewport_height.max(1) as isize;
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.move_cursor(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor(1),
            KeyCode::PageUp => self.move_cursor(-page),
            KeyCode::PageDown => self.move_cursor(page),
            KeyCode::Home | KeyCode::Char('g') => {
                self.cursor = 0;
                self.ensure_visible();
            }
            KeyCode::End | KeyCode::Char('G') => {
                self.cursor = self.items.len().saturating_sub(1);
                self.ensure_visible();
            }
            KeyCode::Enter => return self.toggle_expansion(),
            KeyCode::Char(' ') => return self.toggle_selection(),
            _ => {}
        }
        None
    }
}
