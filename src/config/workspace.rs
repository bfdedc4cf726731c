use crate::error::{PrompterError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const APP_DIR: &str = "prompter";
pub const CONFIG_FILE: &str = "config.json";
const SCHEMA_VERSION: &str = "1";

/// What is remembered about one workspace between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceState {
    pub path: PathBuf,
    pub last_accessed: DateTime<Utc>,
    #[serde(default)]
    pub selected_files: Vec<PathBuf>,
    #[serde(default)]
    pub chat_input: String,
    #[serde(default)]
    pub active_personas: Vec<String>,
}

impl WorkspaceState {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            last_accessed: Utc::now(),
            selected_files: Vec::new(),
            chat_input: String::new(),
            active_personas: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigMetadata {
    pub version: String,
    pub app_version: String,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub recent_workspaces: BTreeMap<String, WorkspaceState>,
    pub metadata: ConfigMetadata,
}

impl Default for AppConfig {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            recent_workspaces: BTreeMap::new(),
            metadata: ConfigMetadata {
                version: SCHEMA_VERSION.to_string(),
                app_version: env!("CARGO_PKG_VERSION").to_string(),
                created_at: now,
                last_modified: now,
            },
        }
    }
}

/// Loads and saves the JSON workspace-state file.
#[derive(Debug)]
pub struct ConfigManager {
    path: PathBuf,
    config: AppConfig,
}

impl ConfigManager {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    pub fn new() -> Result<Self> {
        let path = Self::default_path()
            .ok_or_else(|| PrompterError::NotFound(PathBuf::from(APP_DIR)))?;
        Self::with_path(path)
    }

    /// Loads `path`. A missing or unparseable file is replaced by a fresh
    /// default, which is written out immediately.
    pub fn with_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let config = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<AppConfig>(&content) {
                Ok(config) => Some(config),
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "workspace config unreadable, starting fresh"
                    );
                    None
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => return Err(PrompterError::from_io(err, &path)),
        };

        let mut manager = Self {
            path,
            config: config.clone().unwrap_or_default(),
        };
        if config.is_none() {
            manager.save()?;
        }
        Ok(manager)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn save(&mut self) -> Result<()> {
        self.config.metadata.last_modified = Utc::now();
        self.config.metadata.app_version = env!("CARGO_PKG_VERSION").to_string();

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|err| PrompterError::from_io(err, dir))?;
        }
        let data = serde_json::to_string_pretty(&self.config)?;
        fs::write(&self.path, data).map_err(|err| PrompterError::from_io(err, &self.path))?;
        debug!(path = %self.path.display(), "workspace config saved");
        Ok(())
    }

    /// Returns the state for `root`, creating it if needed, and stamps the
    /// access time. The result is saved right away.
    pub fn open_workspace(&mut self, root: &Path) -> Result<WorkspaceState> {
        let state = self.workspace_mut(root);
        state.last_accessed = Utc::now();
        let snapshot = state.clone();
        self.save()?;
        Ok(snapshot)
    }

    pub fn workspace(&self, root: &Path) -> Option<&WorkspaceState> {
        self.config.recent_workspaces.get(&workspace_key(root))
    }

    pub fn workspace_mut(&mut self, root: &Path) -> &mut WorkspaceState {
        self.config
            .recent_workspaces
            .entry(workspace_key(root))
            .or_insert_with(|| WorkspaceState::new(root))
    }

    /// Applies `update` to the workspace entry and saves.
    pub fn update_workspace(
        &mut self,
        root: &Path,
        update: impl FnOnce(&mut WorkspaceState),
    ) -> Result<()> {
        update(self.workspace_mut(root));
        self.save()
    }
}

fn workspace_key(root: &Path) -> String {
    root.to_string_lossy().into_owned()
}
