use super::app_state::{AppMsg, FocusedPanel, StateOutcome};
use super::chat::ChatPanel;
use super::dialog::{
    Dialog, DialogEvent, ListContent, ListEntry, TextContent, persona_dialog, prompt_dialog,
};
use super::file_tree::FileTreePanel;
use super::layout::{file_tree_content_size, panel_at};
use super::notification::Notifications;
use super::selected_files::SelectedFilesPanel;
use crate::clipboard::copy_to_clipboard;
use crate::config::keys::{binding_matches, describe_key};
use crate::config::{ConfigManager, SettingsManager, UserSettings, WorkspaceState};
use crate::error::Result;
use crate::persona::{DEFAULT_PERSONA, PersonaManager, persona_label};
use crate::prompt_builder::{self, PromptRequest};
use crate::utils::approx_tokens;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

/// A broken cross-field invariant. Seeing one means a handler is buggy.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("focus index {0} is not a panel")]
    InvalidFocus(i32),
    #[error("legacy mode needs menu mode ({menu_mode}) to mirror footer focus ({focus:?})")]
    LegacyMenuMismatch { focus: FocusedPanel, menu_mode: bool },
    #[error("negative layout size {width}x{height}")]
    NegativeSize { width: i32, height: i32 },
}

pub struct App {
    root: PathBuf,
    width: i32,
    height: i32,
    focused: FocusedPanel,
    menu_binding_mode: bool,
    debug_mode: bool,
    pub(super) quit: bool,
    pub(super) file_tree: FileTreePanel,
    pub(super) selected_files: SelectedFilesPanel,
    pub(super) chat: ChatPanel,
    pub(super) prompt_dialog: Dialog<TextContent>,
    pub(super) persona_dialog: Dialog<ListContent>,
    pub(super) notifications: Notifications,
    config: ConfigManager,
    settings: Arc<SettingsManager>,
    personas: PersonaManager,
    active_personas: Vec<String>,
    pending: VecDeque<AppMsg>,
}

impl App {
    /// Scans `root` and restores whatever was saved for it last time.
    pub fn new(
        root: PathBuf,
        mut config: ConfigManager,
        settings: Arc<SettingsManager>,
    ) -> Result<Self> {
        let workspace = config.open_workspace(&root)?;
        let current = settings.current();

        // Files deleted since the last run would only break prompt generation.
        let restored: Vec<PathBuf> = workspace
            .selected_files
            .iter()
            .filter(|path| path.is_file())
            .cloned()
            .collect();
        let mut file_tree = FileTreePanel::new(&restored);
        file_tree.load(&root)?;

        let mut selected_files = SelectedFilesPanel::default();
        selected_files.sync_from_selection(file_tree.selection());

        let mut personas = PersonaManager::new(&root);
        if let Err(err) = personas.discover() {
            debug!(error = %err, "no personas found");
        }
        let active_personas = personas.validate(&workspace.active_personas);

        let mut prompt_dialog = prompt_dialog();
        prompt_dialog.init();
        let mut persona_dialog = persona_dialog();
        persona_dialog.init();

        info!(root = %root.display(), restored = restored.len(), "workspace opened");
        Ok(Self {
            width: 0,
            height: 0,
            focused: FocusedPanel::FileTree,
            menu_binding_mode: false,
            debug_mode: current.debug.enabled,
            quit: false,
            file_tree,
            selected_files,
            chat: ChatPanel::new(&workspace.chat_input),
            prompt_dialog,
            persona_dialog,
            notifications: Notifications::new(current.notification_ttl()),
            config,
            settings,
            personas,
            active_personas,
            pending: VecDeque::new(),
            root,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn focused(&self) -> FocusedPanel {
        self.focused
    }

    pub fn menu_binding_mode(&self) -> bool {
        self.menu_binding_mode
    }

    pub fn debug_mode(&self) -> bool {
        self.debug_mode
    }

    #[cfg(test)]
    pub fn size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub fn active_personas(&self) -> &[String] {
        &self.active_personas
    }

    pub fn settings(&self) -> Arc<UserSettings> {
        self.settings.current()
    }

    fn is_legacy_mode(&self) -> bool {
        self.settings.current().is_legacy_mode()
    }

    /// Processes `msg` and everything it triggers before returning.
    pub fn update(&mut self, msg: AppMsg) {
        self.pending.push_back(msg);
        while let Some(msg) = self.pending.pop_front() {
            match self.handle_state_change(&msg) {
                StateOutcome::NotStateChange => self.dispatch(msg),
                StateOutcome::Rejected(reason) => {
                    debug!(reason = %reason, "state change rejected");
                    if self.debug_mode {
                        self.notifications.error(reason);
                    }
                }
                StateOutcome::Applied | StateOutcome::Unchanged => {}
            }
            if let Err(err) = self.validate_state_invariants() {
                warn!(error = %err, "state invariant violated");
            }
        }
    }

    /// The single place focus, menu mode, debug mode and layout change.
    pub fn handle_state_change(&mut self, msg: &AppMsg) -> StateOutcome {
        match msg {
            AppMsg::FocusChange(raw) => self.change_focus(*raw),
            AppMsg::MenuModeChange(enabled) => self.change_menu_mode(*enabled),
            AppMsg::DebugModeChange(enabled) => self.change_debug_mode(*enabled),
            AppMsg::LayoutChange { width, height } => self.change_layout(*width, *height),
            AppMsg::FileSelection(_)
            | AppMsg::FileDeselection(_)
            | AppMsg::ChatInput(_)
            | AppMsg::PersonaSelection(_)
            | AppMsg::SettingsReloaded
            | AppMsg::Key(_)
            | AppMsg::Mouse(_)
            | AppMsg::Tick => StateOutcome::NotStateChange,
        }
    }

    fn change_focus(&mut self, raw: i32) -> StateOutcome {
        let Some(panel) = FocusedPanel::from_index(raw) else {
            return StateOutcome::Rejected(format!("invalid focus panel: {raw}"));
        };
        if panel == self.focused {
            return StateOutcome::Unchanged;
        }
        self.focused = panel;
        if self.is_legacy_mode() {
            self.menu_binding_mode = panel == FocusedPanel::FooterMenu;
        }
        StateOutcome::Applied
    }

    fn change_menu_mode(&mut self, enabled: bool) -> StateOutcome {
        if enabled == self.menu_binding_mode {
            return StateOutcome::Unchanged;
        }
        self.menu_binding_mode = enabled;
        if enabled {
            self.focused = FocusedPanel::FooterMenu;
        } else if self.focused == FocusedPanel::FooterMenu {
            self.focused = FocusedPanel::Chat;
        }
        StateOutcome::Applied
    }

    fn change_debug_mode(&mut self, enabled: bool) -> StateOutcome {
        if enabled == self.debug_mode {
            return StateOutcome::Unchanged;
        }
        self.debug_mode = enabled;
        let label = if enabled { "enabled" } else { "disabled" };
        info!("debug mode {label}");
        self.notifications.info(format!("debug mode {label}"));
        StateOutcome::Applied
    }

    fn change_layout(&mut self, width: i32, height: i32) -> StateOutcome {
        if width <= 0 || height <= 0 {
            return StateOutcome::Rejected(format!("invalid layout size {width}x{height}"));
        }
        if (width, height) == (self.width, self.height) {
            return StateOutcome::Unchanged;
        }
        self.width = width;
        self.height = height;

        let w = u16::try_from(width).unwrap_or(u16::MAX);
        let h = u16::try_from(height).unwrap_or(u16::MAX);
        let (tree_w, tree_h) = file_tree_content_size(w, h);
        self.file_tree.set_size(tree_w, tree_h);
        self.prompt_dialog.set_size(w, h);
        self.persona_dialog.set_size(w, h);
        self.notifications.set_terminal_width(w);
        StateOutcome::Applied
    }

    pub fn validate_state_invariants(&self) -> std::result::Result<(), StateError> {
        let index = self.focused.index();
        if FocusedPanel::from_index(index).is_none() {
            return Err(StateError::InvalidFocus(index));
        }
        if self.is_legacy_mode()
            && self.menu_binding_mode != (self.focused == FocusedPanel::FooterMenu)
        {
            return Err(StateError::LegacyMenuMismatch {
                focus: self.focused,
                menu_mode: self.menu_binding_mode,
            });
        }
        if self.width < 0 || self.height < 0 {
            return Err(StateError::NegativeSize {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    fn dispatch(&mut self, msg: AppMsg) {
        match msg {
            AppMsg::FileSelection(selection) => {
                self.selected_files.sync_from_selection(&selection);
                self.persist_selection();
            }
            AppMsg::FileDeselection(path) => {
                self.file_tree.set_selected(&path, false);
                self.pending
                    .push_back(AppMsg::FileSelection(self.file_tree.selection().clone()));
            }
            AppMsg::ChatInput(text) => self.save_workspace(|ws| ws.chat_input = text),
            AppMsg::PersonaSelection(personas) => self.apply_personas(personas),
            AppMsg::SettingsReloaded => self.apply_settings(),
            AppMsg::Key(key) => self.handle_key(key),
            AppMsg::Mouse(mouse) => self.handle_mouse(mouse),
            AppMsg::Tick => self.notifications.expire(Instant::now()),
            AppMsg::FocusChange(_)
            | AppMsg::MenuModeChange(_)
            | AppMsg::DebugModeChange(_)
            | AppMsg::LayoutChange { .. } => {}
        }
    }

    fn save_workspace(&mut self, update: impl FnOnce(&mut WorkspaceState)) {
        if let Err(err) = self.config.update_workspace(&self.root, update) {
            warn!(error = %err, "failed to save workspace state");
            self.notifications.error(format!("failed to save workspace: {err}"));
        }
    }

    fn persist_selection(&mut self) {
        let mut selected: Vec<PathBuf> = self
            .file_tree
            .selection()
            .iter()
            .filter(|(_, on)| **on)
            .map(|(path, _)| path.clone())
            .collect();
        selected.sort();
        let unchanged = self
            .config
            .workspace(&self.root)
            .is_some_and(|ws| ws.selected_files == selected);
        if !unchanged {
            self.save_workspace(|ws| ws.selected_files = selected);
        }
    }

    fn apply_personas(&mut self, personas: Vec<String>) {
        let personas = if personas.is_empty() {
            vec![DEFAULT_PERSONA.to_string()]
        } else {
            personas
        };
        self.active_personas = personas.clone();
        self.notifications.info(persona_label(&personas));
        self.save_workspace(|ws| ws.active_personas = personas);
    }

    fn apply_settings(&mut self) {
        let current = self.settings.current();
        self.notifications.set_ttl(current.notification_ttl());
        // A reload may switch interaction modes; restore the legacy coupling.
        if current.is_legacy_mode() {
            let on_footer = self.focused == FocusedPanel::FooterMenu;
            self.handle_state_change(&AppMsg::MenuModeChange(on_footer));
        }
        self.notifications.info("settings reloaded");
    }

    fn handle_key(&mut self, key: KeyEvent) {
        let settings = self.settings.current();

        if self.prompt_dialog.is_visible() {
            if let Some(event) = self.prompt_dialog.update(key) {
                self.on_prompt_dialog_event(event);
            }
            return;
        }
        if self.persona_dialog.is_visible() {
            if let Some(DialogEvent::Selected(entries)) = self.persona_dialog.update(key) {
                self.persona_dialog.hide();
                let names = entries.into_iter().map(|e| e.label).collect();
                self.pending.push_back(AppMsg::PersonaSelection(names));
            }
            return;
        }

        if self.handle_menu_activation(key, &settings) {
            return;
        }

        if self.debug_mode {
            let described = describe_key(&key);
            debug!(key = %described, "key pressed");
            self.notifications.info(format!("key: {described}"));
        }

        if self.handle_global_key(key, &settings) {
            return;
        }

        if self.menu_binding_mode && binding_matches(settings.persona_menu_key(), &key) {
            self.open_persona_dialog();
            return;
        }

        self.forward_to_focused(key, &settings);
    }

    fn handle_menu_activation(&mut self, key: KeyEvent, settings: &UserSettings) -> bool {
        if !binding_matches(settings.menu_activation_key(), &key) {
            return false;
        }
        if settings.is_legacy_mode() {
            // Legacy menu mode follows footer focus; the key only confirms it.
            if self.focused != FocusedPanel::FooterMenu {
                return false;
            }
            self.notifications.info("menu mode activated");
            return true;
        }
        if self.menu_binding_mode {
            return false;
        }
        self.pending.push_back(AppMsg::MenuModeChange(true));
        true
    }

    fn handle_global_key(&mut self, key: KeyEvent, settings: &UserSettings) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') if ctrl => {
                self.quit = true;
                return true;
            }
            KeyCode::Char('s') if ctrl => {
                self.show_prompt();
                return true;
            }
            KeyCode::Char('y') if ctrl => {
                self.copy_prompt();
                return true;
            }
            KeyCode::Char('q')
                if key.modifiers.is_empty() && self.focused != FocusedPanel::Chat =>
            {
                self.quit = true;
                return true;
            }
            _ => {}
        }

        if binding_matches(&settings.debug.toggle_key, &key) {
            self.pending.push_back(AppMsg::DebugModeChange(!self.debug_mode));
            return true;
        }
        if binding_matches(&settings.bindings.normal_mode.tab, &key) {
            self.pending.push_back(AppMsg::focus(self.focused.next()));
            return true;
        }
        if binding_matches(&settings.bindings.normal_mode.shift_tab, &key) {
            self.pending.push_back(AppMsg::focus(self.focused.prev()));
            return true;
        }
        if self.menu_binding_mode
            && (binding_matches(settings.menu_mode_exit_key(), &key)
                || binding_matches(&settings.bindings.escape_to_normal, &key))
        {
            self.pending.push_back(AppMsg::MenuModeChange(false));
            return true;
        }
        false
    }

    fn forward_to_focused(&mut self, key: KeyEvent, settings: &UserSettings) {
        let msg = match self.focused {
            FocusedPanel::FileTree => self.file_tree.handle_key(key),
            FocusedPanel::SelectedFiles => self
                .selected_files
                .handle_key(key, &settings.selected_files.removal_keys),
            FocusedPanel::Chat => {
                let persisted = self
                    .config
                    .workspace(&self.root)
                    .map(|ws| ws.chat_input.as_str());
                if self.chat.handle_key(key) && persisted != Some(self.chat.text()) {
                    Some(AppMsg::ChatInput(self.chat.text().to_string()))
                } else {
                    None
                }
            }
            FocusedPanel::FooterMenu => None,
        };
        if let Some(msg) = msg {
            self.pending.push_back(msg);
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        if self.prompt_dialog.is_visible() || self.persona_dialog.is_visible() {
            return;
        }
        if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
            return;
        }
        let area = Rect::new(
            0,
            0,
            u16::try_from(self.width).unwrap_or(0),
            u16::try_from(self.height).unwrap_or(0),
        );
        if let Some(panel) = panel_at(area, mouse.column, mouse.row) {
            self.pending.push_back(AppMsg::focus(panel));
        }
    }

    fn build_prompt(&self) -> Result<String> {
        prompt_builder::build(&PromptRequest {
            root: &self.root,
            selection: self.file_tree.selection(),
            user_prompt: self.chat.text(),
            personas: &self.personas,
            active_personas: &self.active_personas,
        })
    }

    /// Saves the workspace, then shows the generated prompt.
    fn show_prompt(&mut self) {
        self.persist_selection();
        let chat = self.chat.text().to_string();
        self.save_workspace(|ws| ws.chat_input = chat);

        match self.build_prompt() {
            Ok(xml) => {
                debug!(bytes = xml.len(), "prompt generated");
                self.prompt_dialog.content_mut().set_text(&xml);
                self.prompt_dialog.show();
            }
            Err(err) => {
                warn!(error = %err, "prompt generation failed");
                self.notifications.error(format!("error building prompt: {err}"));
            }
        }
    }

    /// Copies the prompt on display, or a freshly built one.
    fn copy_prompt(&mut self) {
        let text = if self.prompt_dialog.is_visible() {
            Ok(self.prompt_dialog.content().text().to_string())
        } else {
            self.build_prompt()
        };
        let text = match text {
            Ok(text) => text,
            Err(err) => {
                warn!(error = %err, "prompt generation failed");
                self.notifications.error(format!("error building prompt: {err}"));
                return;
            }
        };
        match copy_to_clipboard(&text) {
            Ok(()) => {
                let tokens = approx_tokens(&text);
                info!(tokens, "prompt copied");
                self.notifications.info(format!("prompt copied (≈ {tokens} tokens)"));
            }
            Err(err) => {
                warn!(error = %err, "clipboard copy failed");
                self.notifications.error(format!("clipboard error: {err:#}"));
            }
        }
    }

    fn on_prompt_dialog_event(&mut self, event: DialogEvent) {
        match event {
            DialogEvent::Copy => self.copy_prompt(),
            DialogEvent::Close | DialogEvent::Selected(_) => {}
        }
    }

    fn open_persona_dialog(&mut self) {
        if let Err(err) = self.personas.discover() {
            debug!(error = %err, "persona rescan failed");
        }
        let entries = self
            .personas
            .available()
            .iter()
            .map(|name| ListEntry::new(name.clone(), self.active_personas.contains(name)))
            .collect();
        self.persona_dialog.content_mut().set_entries(entries);
        self.persona_dialog.show();
    }
}
