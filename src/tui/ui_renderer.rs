use super::app_logic::App;
use super::app_state::FocusedPanel;
use super::layout::panel_rects;
use super::notification::NotificationKind;
use super::{chat, selected_files};
use crate::config::keys::display_binding;
use crate::persona::persona_label;
use crate::utils::wrap_text;
use ratatui::{
    prelude::*,
    widgets::{Block, BorderType, Clear, Padding, Paragraph},
};

fn panel_block(title: &str, focused: bool) -> Block<'_> {
    let border = if focused { Color::Cyan } else { Color::DarkGray };
    Block::bordered()
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border))
        .padding(Padding::uniform(1))
        .title(title)
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![
        Span::styled("Prompter", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(format!("  {}  ", app.root().display())),
        Span::styled(
            persona_label(app.active_personas()),
            Style::default().fg(Color::Magenta),
        ),
    ];
    if app.debug_mode() {
        spans.push(Span::styled("  [DEBUG]", Style::default().fg(Color::Yellow)));
    }
    let header = Paragraph::new(Line::from(spans)).block(
        Block::bordered()
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(header, area);
}

fn draw_file_tree(f: &mut Frame, app: &App, area: Rect) {
    let panel = &app.file_tree;
    let focused = app.focused() == FocusedPanel::FileTree;
    let block = panel_block("", focused);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let mut lines: Vec<Line> = panel
        .header_lines()
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            let style = if i == 0 {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            Line::styled(text, style)
        })
        .collect();

    for (i, item) in panel.visible_items().iter().enumerate() {
        let is_cursor = panel.offset() + i == panel.cursor();
        let marker = if is_cursor && focused { "▶ " } else { "  " };
        let icon = match (item.is_dir, item.expanded, item.selected) {
            (true, true, _) => "📂 ",
            (true, false, _) => "📁 ",
            (false, _, true) => "☑ ",
            (false, _, false) => "☐ ",
        };
        let name = if item.is_dir {
            format!("{}/", item.name)
        } else {
            item.name.clone()
        };
        let mut style = Style::default();
        if item.selected {
            style = style.fg(Color::Green);
        }
        if is_cursor {
            style = style.add_modifier(Modifier::REVERSED);
        }
        lines.push(Line::from(vec![
            Span::raw(marker),
            Span::raw("  ".repeat(item.level)),
            Span::raw(icon),
            Span::styled(name, style),
        ]));
    }

    if panel.items().is_empty() {
        lines.push(Line::styled(
            "(empty directory)",
            Style::default().fg(Color::DarkGray),
        ));
    }
    f.render_widget(Paragraph::new(lines), inner);
}

fn draw_selected_files(f: &mut Frame, app: &App, area: Rect) {
    let panel = &app.selected_files;
    let focused = app.focused() == FocusedPanel::SelectedFiles;
    let settings = app.settings();
    let block = panel_block(selected_files::TITLE, focused);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let mut lines: Vec<Line> = Vec::new();
    if settings.selected_files.show_help_text || panel.files().is_empty() {
        lines.push(Line::styled(
            panel.help_text(&settings.selected_files.removal_keys),
            Style::default().fg(Color::DarkGray),
        ));
        lines.push(Line::raw(""));
    }

    let room = usize::from(inner.height).saturating_sub(lines.len() + 2);
    let start = (panel.cursor() + 1).saturating_sub(room.max(1));
    for (i, file) in panel.files().iter().enumerate().skip(start).take(room) {
        let is_cursor = i == panel.cursor();
        let marker = if is_cursor && focused { "▶ " } else { "  " };
        let style = if is_cursor {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        };
        lines.push(Line::from(vec![
            Span::raw(marker),
            Span::styled(file.name.clone(), style),
        ]));
    }

    if !panel.files().is_empty() {
        lines.push(Line::raw(""));
        lines.push(Line::styled(
            panel.total_text(),
            Style::default().add_modifier(Modifier::BOLD),
        ));
    }
    f.render_widget(Paragraph::new(lines), inner);
}

fn draw_chat(f: &mut Frame, app: &App, area: Rect) {
    let focused = app.focused() == FocusedPanel::Chat;
    let block = panel_block(chat::TITLE, focused);
    let inner = block.inner(area);
    f.render_widget(block, area);
    if inner.height == 0 {
        return;
    }

    let help = Paragraph::new(chat::HELP_TEXT).style(Style::default().fg(Color::DarkGray));
    f.render_widget(help, Rect::new(inner.x, inner.y, inner.width, 1));

    let text_area = Rect::new(
        inner.x,
        inner.y + inner.height.min(2),
        inner.width,
        inner.height.saturating_sub(2),
    );
    if text_area.height == 0 {
        return;
    }

    let (row, col) = app.chat.cursor_position();
    let scroll = row.saturating_sub(usize::from(text_area.height) - 1);
    let body = if app.chat.text().is_empty() {
        Paragraph::new(chat::PLACEHOLDER).style(Style::default().fg(Color::DarkGray))
    } else {
        Paragraph::new(app.chat.text()).scroll((scroll as u16, 0))
    };
    f.render_widget(body, text_area);

    let dialog_open = app.prompt_dialog.is_visible() || app.persona_dialog.is_visible();
    if focused && !dialog_open {
        let x = text_area.x + (col as u16).min(text_area.width.saturating_sub(1));
        let y = text_area.y + (row - scroll) as u16;
        f.set_cursor_position((x, y));
    }
}

fn footer_hints(app: &App) -> String {
    let settings = app.settings();
    if app.menu_binding_mode() {
        return format!(
            "MENU  {}: personas | {}: back | tab: switch panel | q: quit",
            display_binding(settings.persona_menu_key()),
            display_binding(settings.menu_mode_exit_key()),
        );
    }
    let menu_hint = if settings.is_legacy_mode() {
        format!("focus here + {}: menu", settings.menu_activation_key())
    } else {
        format!("{}: menu", settings.menu_activation_key())
    };
    format!(
        "tab: switch panel | ctrl+s: generate | ctrl+y: copy | {menu_hint} | {}: debug | q: quit",
        settings.debug.toggle_key
    )
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let focused = app.focused() == FocusedPanel::FooterMenu;
    let style = if app.menu_binding_mode() {
        Style::default().fg(Color::Black).bg(Color::Cyan)
    } else {
        Style::default()
    };
    let border = if focused { Color::Cyan } else { Color::DarkGray };
    let footer = Paragraph::new(footer_hints(app)).style(style).block(
        Block::bordered()
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(border)),
    );
    f.render_widget(footer, area);
}

fn draw_notifications(f: &mut Frame, app: &App) {
    if app.notifications.is_empty() {
        return;
    }
    let screen = f.area();
    let width = app.notifications.width().min(screen.width);
    let text_width = usize::from(width.saturating_sub(2));
    let mut y = screen.y + 1;
    for notification in app.notifications.iter() {
        let lines = wrap_text(&notification.message, text_width);
        let height = (lines.len() as u16).saturating_add(2);
        if y + height > screen.y + screen.height {
            break;
        }
        let color = match notification.kind {
            NotificationKind::Info => Color::Green,
            NotificationKind::Error => Color::Red,
        };
        let area = Rect::new(screen.x + screen.width - width, y, width, height);
        f.render_widget(Clear, area);
        let body = Paragraph::new(lines.into_iter().map(Line::from).collect::<Vec<_>>()).block(
            Block::bordered()
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(color)),
        );
        f.render_widget(body, area);
        y += height;
    }
}

pub(super) fn ui_frame(frame: &mut Frame, app: &App) {
    let rects = panel_rects(frame.area());
    draw_header(frame, app, rects.header);
    draw_file_tree(frame, app, rects.file_tree);
    draw_selected_files(frame, app, rects.selected_files);
    draw_chat(frame, app, rects.chat);
    draw_footer(frame, app, rects.footer);

    app.prompt_dialog.render(frame);
    app.persona_dialog.render(frame);
    draw_notifications(frame, app);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigManager, SettingsManager};
    use crate::tui::app_state::AppMsg;
    use ratatui::backend::TestBackend;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn buffer_text(buffer: &ratatui::buffer::Buffer) -> String {
        buffer
            .content()
            .iter()
            .map(ratatui::buffer::Cell::symbol)
            .collect()
    }

    fn app_for(dir: &TempDir, files: &[&str]) -> App {
        let root = dir.path().join("ws");
        fs::create_dir_all(&root).expect("mkdir");
        for file in files {
            fs::write(root.join(file), "content").expect("write");
        }
        let settings = Arc::new(
            SettingsManager::with_path(dir.path().join("settings.toml")).expect("settings"),
        );
        let config = ConfigManager::with_path(dir.path().join("config.json")).expect("config");
        App::new(root, config, settings).expect("app")
    }

    fn draw(app: &mut App, width: u16, height: u16) -> String {
        app.update(AppMsg::LayoutChange {
            width: i32::from(width),
            height: i32::from(height),
        });
        let mut terminal =
            Terminal::new(TestBackend::new(width, height)).expect("failed to create terminal");
        terminal
            .draw(|frame| ui_frame(frame, app))
            .expect("failed to draw frame");
        buffer_text(terminal.backend().buffer())
    }

    #[test]
    fn test_render_shows_panels_and_files() {
        // Arrange
        let dir = TempDir::new().expect("tempdir");
        let mut app = app_for(&dir, &["main.rs", "notes.md"]);

        // Act
        let text = draw(&mut app, 120, 40);

        // Assert
        assert!(text.contains("File Tree"));
        assert!(text.contains("main.rs"));
        assert!(text.contains("notes.md"));
        assert!(text.contains(selected_files::EMPTY_TEXT));
        assert!(text.contains("Persona: default"));
        assert!(text.contains("ctrl+s: generate"));
    }

    #[test]
    fn test_render_empty_tree_in_tall_viewport() {
        // Arrange
        let dir = TempDir::new().expect("tempdir");
        let mut app = app_for(&dir, &[]);

        // Act
        let text = draw(&mut app, 100, 80);

        // Assert
        assert_eq!(app.file_tree.offset(), 0);
        assert!(text.contains("(empty directory)"));
    }

    #[test]
    fn test_render_survives_tiny_terminal() {
        // Arrange
        let dir = TempDir::new().expect("tempdir");
        let mut app = app_for(&dir, &["a.txt"]);
        app.notifications.info("a notification that cannot fit");

        // Act
        let text = draw(&mut app, 8, 4);

        // Assert
        assert!(!text.is_empty());
    }

    #[test]
    fn test_menu_mode_footer_lists_menu_keys() {
        // Arrange
        let dir = TempDir::new().expect("tempdir");
        let mut app = app_for(&dir, &["a.txt"]);
        app.update(AppMsg::MenuModeChange(true));

        // Act
        let text = draw(&mut app, 120, 40);

        // Assert
        assert!(text.contains("MENU  p: personas | esc: back"));
    }

    #[test]
    fn test_selected_file_shows_in_list_and_total() {
        // Arrange
        let dir = TempDir::new().expect("tempdir");
        let mut app = app_for(&dir, &["a.txt"]);
        app.update(AppMsg::Key(crossterm::event::KeyEvent::new(
            crossterm::event::KeyCode::Char(' '),
            crossterm::event::KeyModifiers::NONE,
        )));

        // Act
        let text = draw(&mut app, 120, 40);

        // Assert
        assert!(text.contains("Total: 1 files"));
        assert!(text.contains("d/del/backspace: remove file"));
    }
}
