use crate::config::{ConfigManager, SettingsManager};
use crate::{cli, logging, tui};
use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use std::sync::{Arc, mpsc};
use tracing::{info, warn};

// Resolves the positional DIR argument to an absolute, existing directory.
fn resolve_workspace(dir: &Path) -> Result<PathBuf> {
    if !dir.is_dir() {
        bail!("Directory '{}' does not exist", dir.display());
    }
    dir.canonicalize()
        .with_context(|| format!("failed to resolve '{}'", dir.display()))
}

// Installs the file logger when the settings ask for it. Logging problems
// never stop the app.
fn start_logging(settings: &SettingsManager, root: &Path) {
    let current = settings.current();
    if !current.debug.file_logging {
        return;
    }
    let log_path = root.join(&current.debug.log_file);
    if let Err(err) = logging::init_file_logging(&log_path) {
        eprintln!("⚠️ Warning: file logging disabled: {err:#}");
    }
}

pub fn run_prompter(cli_args: cli::Cli) -> Result<()> {
    let root = resolve_workspace(&cli_args.dir)?;

    let settings = Arc::new(SettingsManager::new().context("failed to load settings")?);
    start_logging(&settings, &root);
    info!(root = %root.display(), settings = %settings.path().display(), "starting prompter");

    let config = ConfigManager::new().context("failed to load workspace config")?;
    info!(
        config = %config.path().display(),
        workspaces = config.config().recent_workspaces.len(),
        "workspace config loaded"
    );

    // The watcher thread only signals; the UI thread reads the new snapshot.
    let (reload_tx, reload_rx) = mpsc::channel();
    settings.set_on_change(move |_| {
        let _ = reload_tx.send(());
    });
    if let Err(err) = settings.start_watching() {
        warn!(error = %err, "settings hot reload unavailable");
    }
    info!(watching = settings.is_watching(), "settings watcher");

    let mut app = tui::App::new(root.clone(), config, Arc::clone(&settings))
        .with_context(|| format!("failed to open workspace '{}'", root.display()))?;
    let result = tui::run_tui(&mut app, &reload_rx);

    settings.stop_watching();
    info!("prompter exited");
    result
}
