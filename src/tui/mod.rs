mod app_logic;
mod app_state;
mod chat;
mod dialog;
mod event_handler;
mod file_tree;
mod layout;
mod notification;
mod selected_files;
mod ui_renderer;

pub use app_logic::App;

// The main function to run the TUI
pub use self::run_tui::run_tui;

mod run_tui {
    use super::app_logic::App;
    use super::app_state::AppMsg;
    use super::event_handler::next_message;
    use super::ui_renderer::ui_frame;
    use anyhow::Result;
    use crossterm::{
        event::{DisableMouseCapture, EnableMouseCapture},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    };
    use ratatui::prelude::{CrosstermBackend, Terminal};
    use std::io::{self, Stdout};
    use std::sync::mpsc::Receiver;
    use tracing::info;

    /// Runs until the user quits. Each `reload_rx` signal becomes a
    /// `SettingsReloaded` message on the UI thread.
    pub fn run_tui(app: &mut App, reload_rx: &Receiver<()>) -> Result<()> {
        let mut terminal = init_terminal()?;
        let result = event_loop(&mut terminal, app, reload_rx);
        restore_terminal(terminal)?;
        result
    }

    fn event_loop(
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
        app: &mut App,
        reload_rx: &Receiver<()>,
    ) -> Result<()> {
        let size = terminal.size()?;
        app.update(AppMsg::LayoutChange {
            width: i32::from(size.width),
            height: i32::from(size.height),
        });

        while !app.should_quit() {
            terminal.draw(|frame| ui_frame(frame, app))?;
            while reload_rx.try_recv().is_ok() {
                app.update(AppMsg::SettingsReloaded);
            }
            if let Some(msg) = next_message()? {
                app.update(msg);
            }
        }
        info!("quit requested");
        Ok(())
    }

    fn init_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        Terminal::new(backend).map_err(Into::into)
    }

    fn restore_terminal(mut terminal: Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor().map_err(Into::into)
    }
}
