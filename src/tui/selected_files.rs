use super::app_state::AppMsg;
use crate::config::keys::{binding_matches, display_binding};
use crossterm::event::{KeyCode, KeyEvent};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const TITLE: &str = "✅ Selected Files";
pub const EMPTY_TEXT: &str = "No files selected";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub path: PathBuf,
}

impl SelectedFile {
    fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            name,
            path: path.to_path_buf(),
        }
    }
}

/// Ordered view of the current selection, derived from the tree's map.
#[derive(Debug, Default)]
pub struct SelectedFilesPanel {
    files: Vec<SelectedFile>,
    cursor: usize,
}

impl SelectedFilesPanel {
    pub fn files(&self) -> &[SelectedFile] {
        &self.files
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Rebuilds the list from a selection snapshot, sorted by path.
    pub fn sync_from_selection(&mut self, selection: &HashMap<PathBuf, bool>) {
        let mut paths: Vec<&PathBuf> = selection
            .iter()
            .filter(|(_, selected)| **selected)
            .map(|(path, _)| path)
            .collect();
        paths.sort();
        self.files = paths.into_iter().map(|p| SelectedFile::from_path(p)).collect();
        self.clamp_cursor();
    }

    pub fn remove_file(&mut self, path: &Path) {
        self.files.retain(|f| f.path != path);
        self.clamp_cursor();
    }

    fn clamp_cursor(&mut self) {
        self.cursor = self.cursor.min(self.files.len().saturating_sub(1));
    }

    /// `"↑/↓: navigate, d/del/backspace: remove file"`, or the empty-state text.
    pub fn help_text(&self, removal_keys: &[String]) -> String {
        if self.files.is_empty() {
            return EMPTY_TEXT.to_string();
        }
        let keys: Vec<String> = removal_keys.iter().map(|k| display_binding(k)).collect();
        format!("↑/↓: navigate, {}: remove file", keys.join("/"))
    }

    pub fn total_text(&self) -> String {
        format!("Total: {} files", self.files.len())
    }

    /// Removing the file under the cursor yields a deselection for the tree.
    pub fn handle_key(&mut self, key: KeyEvent, removal_keys: &[String]) -> Option<AppMsg> {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.cursor = self.cursor.saturating_sub(1);
                None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.cursor + 1 < self.files.len() {
                    self.cursor += 1;
                }
                None
            }
            _ if removal_keys.iter().any(|k| binding_matches(k, &key)) => {
                let removed = self.files.get(self.cursor)?.path.clone();
                self.remove_file(&removed);
                Some(AppMsg::FileDeselection(removed))
            }
            _ => None,
        }
    }
}
