use anyhow::{Context, Result};
use arboard::Clipboard;
#[cfg(target_os = "linux")]
use arboard::SetExtLinux;

/// Hidden argument that turns the binary into a short-lived clipboard owner.
pub const CLIPBOARD_HELPER_FLAG: &str = "__prompter_clipboard_helper";

/// On X11/Wayland the clipboard empties when its owner exits, so the text is
/// handed to a detached copy of this binary that serves it until replaced.
#[cfg(target_os = "linux")]
fn serve_clipboard_from_stdin() -> Result<()> {
    let text = std::io::read_to_string(std::io::stdin()).context("reading clipboard text")?;
    let mut clipboard = Clipboard::new().context("opening clipboard")?;
    clipboard
        .set()
        .wait()
        .text(text)
        .context("publishing clipboard text")?;
    Ok(())
}

/// Runs the helper if this process was spawned as one. Returns `true` when
/// the caller should exit right away.
pub fn run_helper_if_requested() -> Result<bool> {
    if !std::env::args().any(|arg| arg == CLIPBOARD_HELPER_FLAG) {
        return Ok(false);
    }
    #[cfg(target_os = "linux")]
    serve_clipboard_from_stdin()?;
    Ok(true)
}

pub fn copy_to_clipboard(text: &str) -> Result<()> {
    #[cfg(not(target_os = "linux"))]
    {
        let mut clipboard = Clipboard::new().context("opening clipboard")?;
        clipboard.set_text(text).context("writing clipboard")?;
    }

    #[cfg(target_os = "linux")]
    {
        use std::io::Write;
        use std::process::{Command, Stdio};

        let mut child = Command::new(std::env::current_exe()?)
            .arg(CLIPBOARD_HELPER_FLAG)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .current_dir("/")
            .spawn()
            .context("spawning clipboard helper")?;

        let mut stdin = child
            .stdin
            .take()
            .context("clipboard helper has no stdin")?;
        stdin.write_all(text.as_bytes())?;
        stdin.flush()?;
    }

    tracing::debug!(bytes = text.len(), "copied prompt to clipboard");
    Ok(())
}
