use super::keys::KeyCombination;
use crate::error::{PrompterError, Result};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const SETTINGS_DIR: &str = "coding-prompts";
pub const SETTINGS_FILE: &str = "coding_prompts.toml";

const LEGACY_MENU_ACTIVATION: &str = "x";
const LEGACY_PERSONA_MENU: &str = "p";
const DEFAULT_NOTIFICATION_TTL: i64 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct UserSettings {
    pub bindings: KeyBindings,
    pub ui: UiSettings,
    pub selected_files: SelectedFilesSettings,
    pub debug: DebugSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub escape_to_normal: String,
    pub menu_mode: MenuModeBindings,
    pub normal_mode: NormalModeBindings,
    /// Legacy single-character bindings. Either one being set switches the
    /// app into legacy interaction mode.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub menu_activation: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub persona_menu: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            escape_to_normal: "esc".to_string(),
            menu_mode: MenuModeBindings::default(),
            normal_mode: NormalModeBindings::default(),
            menu_activation: String::new(),
            persona_menu: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuModeBindings {
    pub activation: String,
    pub exit: String,
    pub persona_menu: String,
}

impl Default for MenuModeBindings {
    fn default() -> Self {
        Self {
            activation: "alt+m".to_string(),
            exit: "esc".to_string(),
            persona_menu: "p".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalModeBindings {
    pub tab: String,
    pub shift_tab: String,
}

impl Default for NormalModeBindings {
    fn default() -> Self {
        Self {
            tab: "tab".to_string(),
            shift_tab: "shift+tab".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    /// Seconds a notification stays on screen.
    pub notification_ttl: i64,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            notification_ttl: DEFAULT_NOTIFICATION_TTL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectedFilesSettings {
    pub removal_keys: Vec<String>,
    pub show_help_text: bool,
}

impl Default for SelectedFilesSettings {
    fn default() -> Self {
        Self {
            removal_keys: vec!["d".to_string(), "delete".to_string(), "backspace".to_string()],
            show_help_text: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugSettings {
    pub enabled: bool,
    pub toggle_key: String,
    pub file_logging: bool,
    /// Relative to the workspace root.
    pub log_file: String,
}

impl Default for DebugSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            toggle_key: "f11".to_string(),
            file_logging: true,
            log_file: "logs/error.log".to_string(),
        }
    }
}

impl UserSettings {
    pub fn is_legacy_mode(&self) -> bool {
        !self.bindings.menu_activation.is_empty() || !self.bindings.persona_menu.is_empty()
    }

    /// Legacy key when present, otherwise the menu-mode activation combination.
    pub fn menu_activation_key(&self) -> &str {
        if self.bindings.menu_activation.is_empty() {
            &self.bindings.menu_mode.activation
        } else {
            &self.bindings.menu_activation
        }
    }

    pub fn persona_menu_key(&self) -> &str {
        if self.bindings.persona_menu.is_empty() {
            &self.bindings.menu_mode.persona_menu
        } else {
            &self.bindings.persona_menu
        }
    }

    pub fn menu_mode_exit_key(&self) -> &str {
        &self.bindings.menu_mode.exit
    }

    pub fn notification_ttl(&self) -> Duration {
        let secs = if self.ui.notification_ttl <= 0 {
            DEFAULT_NOTIFICATION_TTL
        } else {
            self.ui.notification_ttl
        };
        Duration::from_secs(secs.unsigned_abs())
    }

    fn apply_defaults(&mut self) {
        let defaults = Self::default();
        fill_if_empty(&mut self.bindings.escape_to_normal, &defaults.bindings.escape_to_normal);
        fill_if_empty(&mut self.bindings.normal_mode.tab, &defaults.bindings.normal_mode.tab);
        fill_if_empty(
            &mut self.bindings.normal_mode.shift_tab,
            &defaults.bindings.normal_mode.shift_tab,
        );
        fill_if_empty(&mut self.debug.toggle_key, &defaults.debug.toggle_key);
        fill_if_empty(&mut self.debug.log_file, &defaults.debug.log_file);
        if self.ui.notification_ttl <= 0 {
            self.ui.notification_ttl = DEFAULT_NOTIFICATION_TTL;
        }
        if self.selected_files.removal_keys.is_empty() {
            self.selected_files.removal_keys = defaults.selected_files.removal_keys;
        }
    }

    fn validate(&mut self) -> std::result::Result<(), String> {
        if self.is_legacy_mode() {
            fill_if_empty(&mut self.bindings.menu_activation, LEGACY_MENU_ACTIVATION);
            fill_if_empty(&mut self.bindings.persona_menu, LEGACY_PERSONA_MENU);
            for (name, value) in [
                ("menu_activation", &self.bindings.menu_activation),
                ("persona_menu", &self.bindings.persona_menu),
            ] {
                if value.chars().count() != 1 {
                    return Err(format!(
                        "bindings.{name} must be a single character, got: {value:?}"
                    ));
                }
            }
        } else {
            let menu = &self.bindings.menu_mode;
            if menu.activation.is_empty() {
                return Err("bindings.menu_mode.activation cannot be empty".to_string());
            }
            check_binding("bindings.menu_mode.activation", &menu.activation)?;
            if !menu.exit.is_empty() {
                check_binding("bindings.menu_mode.exit", &menu.exit)?;
            }
            if !menu.persona_menu.is_empty() {
                check_binding("bindings.menu_mode.persona_menu", &menu.persona_menu)?;
            }
        }

        check_binding("debug.toggle_key", &self.debug.toggle_key)?;
        for key in &self.selected_files.removal_keys {
            check_binding("selected_files.removal_keys", key)?;
        }
        Ok(())
    }
}

fn fill_if_empty(value: &mut String, default: &str) {
    if value.is_empty() {
        *value = default.to_string();
    }
}

fn check_binding(name: &str, binding: &str) -> std::result::Result<(), String> {
    KeyCombination::parse(binding)
        .map(|_| ())
        .map_err(|err| format!("invalid {name}: {err}"))
}

/// Reads and validates the settings file. A missing file yields defaults.
pub fn load_settings(path: &Path) -> Result<UserSettings> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(UserSettings::default());
        }
        Err(err) => return Err(PrompterError::from_io(err, path)),
    };

    let mut settings: UserSettings = toml::from_str(&content)
        .map_err(|err| PrompterError::malformed(path, format!("invalid TOML format: {err}")))?;
    settings.apply_defaults();
    settings
        .validate()
        .map_err(|reason| PrompterError::malformed(path, reason))?;
    Ok(settings)
}

type ChangeCallback = Box<dyn Fn(&UserSettings) + Send + Sync>;

struct SharedSettings {
    path: PathBuf,
    current: RwLock<Arc<UserSettings>>,
    on_change: Mutex<Option<ChangeCallback>>,
}

impl SharedSettings {
    fn snapshot(&self) -> Arc<UserSettings> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    fn reload(&self) -> Result<bool> {
        let fresh = load_settings(&self.path)?;
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if **guard == fresh {
            return Ok(false);
        }
        *guard = Arc::new(fresh);
        Ok(true)
    }

    fn reload_and_notify(&self) -> Result<bool> {
        let changed = self.reload()?;
        if changed {
            info!(path = %self.path.display(), "settings reloaded");
            let snapshot = self.snapshot();
            let callback = self.on_change.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(callback) = callback.as_ref() {
                callback(&snapshot);
            }
        }
        Ok(changed)
    }
}

/// Owns the current settings snapshot and, once started, a filesystem
/// watcher that hot-reloads it.
pub struct SettingsManager {
    shared: Arc<SharedSettings>,
    watcher: Mutex<Option<RecommendedWatcher>>,
}

impl SettingsManager {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(SETTINGS_DIR).join(SETTINGS_FILE))
    }

    pub fn new() -> Result<Self> {
        let path = Self::default_path()
            .ok_or_else(|| PrompterError::NotFound(PathBuf::from(SETTINGS_DIR)))?;
        Self::with_path(path)
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let settings = load_settings(&path)?;
        Ok(Self {
            shared: Arc::new(SharedSettings {
                path,
                current: RwLock::new(Arc::new(settings)),
                on_change: Mutex::new(None),
            }),
            watcher: Mutex::new(None),
        })
    }

    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    /// The latest snapshot. Callers should not hold it across event-loop turns.
    pub fn current(&self) -> Arc<UserSettings> {
        self.shared.snapshot()
    }

    /// Re-reads the file. On error the previous snapshot stays in place.
    /// Returns whether the snapshot changed.
    #[cfg(test)]
    pub fn reload(&self) -> Result<bool> {
        self.shared.reload()
    }

    /// Like [`reload`](Self::reload), then runs the change callback if the
    /// snapshot changed.
    #[cfg(test)]
    pub fn reload_and_notify(&self) -> Result<bool> {
        self.shared.reload_and_notify()
    }

    pub fn set_on_change(&self, callback: impl Fn(&UserSettings) + Send + Sync + 'static) {
        let mut slot = self.shared.on_change.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Box::new(callback));
    }

    pub fn is_watching(&self) -> bool {
        self.watcher_slot().is_some()
    }

    /// Watches the settings directory. Calling it again while a watcher is
    /// installed does nothing.
    pub fn start_watching(&self) -> Result<()> {
        let mut slot = self.watcher_slot();
        if slot.is_some() {
            return Ok(());
        }

        let dir = self
            .shared
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        fs::create_dir_all(&dir).map_err(|err| PrompterError::from_io(err, &dir))?;

        let shared = Arc::clone(&self.shared);
        let file_name = shared.path.file_name().map(|n| n.to_os_string());
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let relevant = matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
                        && event
                            .paths
                            .iter()
                            .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                    if !relevant {
                        return;
                    }
                    if let Err(err) = shared.reload_and_notify() {
                        warn!(error = %err, "settings reload failed, keeping previous settings");
                    }
                }
                Err(err) => warn!(error = %err, "settings watcher error"),
            },
            Config::default(),
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        debug!(dir = %dir.display(), "watching settings directory");

        *slot = Some(watcher);
        Ok(())
    }

    /// Drops the watcher if one is installed.
    pub fn stop_watching(&self) {
        if self.watcher_slot().take().is_some() {
            debug!("stopped watching settings");
        }
    }

    fn watcher_slot(&self) -> MutexGuard<'_, Option<RecommendedWatcher>> {
        self.watcher.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for SettingsManager {
    fn drop(&mut self) {
        self.stop_watching();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn settings_file(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, content).expect("write settings");
        path
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        // Arrange
        let dir = TempDir::new().expect("tempdir");

        // Act
        let manager = SettingsManager::with_path(dir.path().join(SETTINGS_FILE)).expect("manager");
        let settings = manager.current();

        // Assert
        assert!(!settings.is_legacy_mode());
        assert_eq!(settings.bindings.menu_mode.activation, "alt+m");
        assert_eq!(settings.bindings.menu_mode.exit, "esc");
        assert_eq!(settings.notification_ttl(), Duration::from_secs(3));
        assert_eq!(settings.debug.toggle_key, "f11");
        assert_eq!(settings.debug.log_file, "logs/error.log");
        assert!(settings.debug.file_logging);
        assert_eq!(settings.selected_files.removal_keys, vec!["d", "delete", "backspace"]);
    }

    #[test]
    fn test_legacy_bindings_enable_legacy_mode() {
        // Arrange
        let dir = TempDir::new().expect("tempdir");
        let path = settings_file(&dir, "[bindings]\nmenu_activation = \"m\"\n");

        // Act
        let settings = load_settings(&path).expect("load");

        // Assert
        assert!(settings.is_legacy_mode());
        assert_eq!(settings.menu_activation_key(), "m");
        assert_eq!(settings.persona_menu_key(), "p");
    }

    #[test]
    fn test_multi_character_legacy_binding_is_rejected() {
        // Arrange
        let dir = TempDir::new().expect("tempdir");
        let path = settings_file(&dir, "[bindings]\nmenu_activation = \"xx\"\n");

        // Act
        let result = load_settings(&path);

        // Assert
        match result {
            Err(PrompterError::MalformedConfig { reason, .. }) => {
                assert!(reason.contains("single character"), "{reason}");
            }
            other => panic!("expected malformed config, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_toml_is_malformed() {
        // Arrange
        let dir = TempDir::new().expect("tempdir");
        let path = settings_file(&dir, "[bindings\nmenu_activation = \"x\"");

        // Act
        let result = load_settings(&path);

        // Assert
        match result {
            Err(PrompterError::MalformedConfig { reason, .. }) => {
                assert!(reason.contains("invalid TOML format"), "{reason}");
            }
            other => panic!("expected malformed config, got {other:?}"),
        }
    }

    #[test]
    fn test_explicit_empty_activation_is_rejected() {
        // Arrange
        let dir = TempDir::new().expect("tempdir");
        let path = settings_file(&dir, "[bindings.menu_mode]\nactivation = \"\"\n");

        // Act
        let result = load_settings(&path);

        // Assert
        match result {
            Err(PrompterError::MalformedConfig { reason, .. }) => {
                assert!(reason.contains("menu_mode.activation cannot be empty"), "{reason}");
            }
            other => panic!("expected malformed config, got {other:?}"),
        }
    }

    #[test]
    fn test_partial_tables_are_defaulted() {
        // Arrange
        let dir = TempDir::new().expect("tempdir");
        let path = settings_file(
            &dir,
            "[bindings.menu_mode]\nactivation = \"ctrl+k\"\n\n[ui]\nnotification_ttl = 0\n",
        );

        // Act
        let settings = load_settings(&path).expect("load");

        // Assert
        assert_eq!(settings.menu_activation_key(), "ctrl+k");
        assert_eq!(settings.menu_mode_exit_key(), "esc");
        assert_eq!(settings.bindings.normal_mode.shift_tab, "shift+tab");
        assert_eq!(settings.ui.notification_ttl, 3);
    }

    #[test]
    fn test_invalid_modifier_is_rejected() {
        // Arrange
        let dir = TempDir::new().expect("tempdir");
        let path = settings_file(&dir, "[bindings.menu_mode]\nactivation = \"super+m\"\n");

        // Act / Assert
        assert!(matches!(load_settings(&path), Err(PrompterError::MalformedConfig { .. })));
    }

    #[test]
    fn test_reload_swaps_snapshot_and_notifies_once() {
        // Arrange
        let dir = TempDir::new().expect("tempdir");
        let path = settings_file(&dir, "[ui]\nnotification_ttl = 3\n");
        let manager = SettingsManager::with_path(&path).expect("manager");
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        manager.set_on_change(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        // Act
        fs::write(&path, "[ui]\nnotification_ttl = 7\n").expect("rewrite");
        let first = manager.reload_and_notify().expect("reload");
        let second = manager.reload_and_notify().expect("reload");

        // Assert
        assert!(first);
        assert!(!second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(manager.current().notification_ttl(), Duration::from_secs(7));
    }

    #[test]
    fn test_failed_reload_keeps_previous_snapshot() {
        // Arrange
        let dir = TempDir::new().expect("tempdir");
        let path = settings_file(&dir, "[ui]\nnotification_ttl = 5\n");
        let manager = SettingsManager::with_path(&path).expect("manager");

        // Act
        fs::write(&path, "not = [valid").expect("rewrite");
        let result = manager.reload();

        // Assert
        assert!(result.is_err());
        assert_eq!(manager.current().notification_ttl(), Duration::from_secs(5));
    }

    #[test]
    fn test_start_and_stop_watching_are_idempotent() {
        // Arrange
        let dir = TempDir::new().expect("tempdir");
        let manager = SettingsManager::with_path(dir.path().join("nested").join(SETTINGS_FILE))
            .expect("manager");

        // Act
        manager.start_watching().expect("start");
        manager.start_watching().expect("start again");
        let watching = manager.is_watching();
        manager.stop_watching();
        manager.stop_watching();

        // Assert
        assert!(watching);
        assert!(!manager.is_watching());
        assert!(dir.path().join("nested").is_dir());
    }
}
