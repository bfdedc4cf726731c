use crossterm::event::{KeyEvent, MouseEvent};
use std::collections::HashMap;
use std::path::PathBuf;

/// The four focusable panels, in tab order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FocusedPanel {
    FileTree,
    SelectedFiles,
    Chat,
    FooterMenu,
}

impl FocusedPanel {
    pub const ALL: [FocusedPanel; 4] = [
        FocusedPanel::FileTree,
        FocusedPanel::SelectedFiles,
        FocusedPanel::Chat,
        FocusedPanel::FooterMenu,
    ];

    pub fn index(self) -> i32 {
        match self {
            FocusedPanel::FileTree => 0,
            FocusedPanel::SelectedFiles => 1,
            FocusedPanel::Chat => 2,
            FocusedPanel::FooterMenu => 3,
        }
    }

    pub fn from_index(raw: i32) -> Option<Self> {
        usize::try_from(raw)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() as usize + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.index() as usize + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Every message the application reacts to.
///
/// The first four variants are state changes and go through the app's
/// single state-change handler. The rest are content updates or raw input.
#[derive(Debug, Clone, PartialEq)]
pub enum AppMsg {
    /// Raw panel index; out-of-range values are rejected, not clamped.
    FocusChange(i32),
    MenuModeChange(bool),
    DebugModeChange(bool),
    LayoutChange { width: i32, height: i32 },
    /// Full copy of the tree's path → selected map.
    FileSelection(HashMap<PathBuf, bool>),
    FileDeselection(PathBuf),
    ChatInput(String),
    PersonaSelection(Vec<String>),
    SettingsReloaded,
    Key(KeyEvent),
    Mouse(MouseEvent),
    Tick,
}

impl AppMsg {
    pub fn focus(panel: FocusedPanel) -> Self {
        AppMsg::FocusChange(panel.index())
    }
}

/// Result of offering a message to the state-change handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateOutcome {
    /// Not a state-change message.
    NotStateChange,
    Applied,
    /// Valid, but equal to the current state.
    Unchanged,
    Rejected(String),
}
