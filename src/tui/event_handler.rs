use super::app_state::AppMsg;
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Waits briefly for terminal input. No input within the interval is a `Tick`.
pub(super) fn next_message() -> Result<Option<AppMsg>> {
    if !event::poll(POLL_INTERVAL)? {
        return Ok(Some(AppMsg::Tick));
    }
    Ok(translate(event::read()?))
}

fn translate(event: Event) -> Option<AppMsg> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => Some(AppMsg::Key(key)),
        Event::Mouse(mouse) => Some(AppMsg::Mouse(mouse)),
        Event::Resize(width, height) => Some(AppMsg::LayoutChange {
            width: i32::from(width),
            height: i32::from(height),
        }),
        _ => None,
    }
}
