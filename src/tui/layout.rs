use super::app_state::FocusedPanel;
use ratatui::layout::Rect;

pub const HEADER_HEIGHT: u16 = 3;
pub const FOOTER_HEIGHT: u16 = 3;
const TOP_ROW_SHARE: f64 = 0.66;
/// Border plus one cell of padding on every side.
const PANEL_CHROME: u16 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelRects {
    pub header: Rect,
    pub file_tree: Rect,
    pub selected_files: Rect,
    pub chat: Rect,
    pub footer: Rect,
}

/// Splits the screen: header, a top row with the tree on the left and the
/// selected files on the right, the chat below, then the footer.
pub fn panel_rects(area: Rect) -> PanelRects {
    let available = area.height.saturating_sub(HEADER_HEIGHT + FOOTER_HEIGHT);
    let top = (f64::from(available) * TOP_ROW_SHARE) as u16;
    let bottom = available - top;
    let left = area.width / 2;

    let header_h = HEADER_HEIGHT.min(area.height);
    let top_y = area.y + header_h;
    let chat_y = top_y + top;
    let footer_y = chat_y + bottom;

    PanelRects {
        header: Rect::new(area.x, area.y, area.width, header_h),
        file_tree: Rect::new(area.x, top_y, left, top),
        selected_files: Rect::new(area.x + left, top_y, area.width - left, top),
        chat: Rect::new(area.x, chat_y, area.width, bottom),
        footer: Rect::new(
            area.x,
            footer_y,
            area.width,
            area.height.saturating_sub(footer_y - area.y),
        ),
    }
}

/// Usable text area of the file tree panel for a `width` x `height` screen.
pub fn file_tree_content_size(width: u16, height: u16) -> (u16, u16) {
    let rects = panel_rects(Rect::new(0, 0, width, height));
    (
        rects.file_tree.width.saturating_sub(PANEL_CHROME),
        rects.file_tree.height.saturating_sub(PANEL_CHROME),
    )
}

/// Which panel a click at (`x`, `y`) lands on. The header is not focusable.
pub fn panel_at(area: Rect, x: u16, y: u16) -> Option<FocusedPanel> {
    let rects = panel_rects(area);
    let hit = |r: Rect| x >= r.x && x < r.x + r.width && y >= r.y && y < r.y + r.height;

    if hit(rects.header) {
        None
    } else if hit(rects.file_tree) {
        Some(FocusedPanel::FileTree)
    } else if hit(rects.selected_files) {
        Some(FocusedPanel::SelectedFiles)
    } else if hit(rects.chat) {
        Some(FocusedPanel::Chat)
    } else if hit(rects.footer) {
        Some(FocusedPanel::FooterMenu)
    } else {
        None
    }
}
