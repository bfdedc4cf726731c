//! Persistent state: per-workspace JSON and user TOML settings.

pub mod keys;
pub mod settings;
pub mod workspace;

pub use settings::{SettingsManager, UserSettings};
pub use workspace::{ConfigManager, WorkspaceState};
