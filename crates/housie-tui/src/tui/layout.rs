// Screen layout: panel arrangement and sizing.
//
// +--------------------------------------------------+
// | Status Bar (1 row)                               |
// +--------------------------------------------------+
// | Header (3 rows)                                  |
// +---------------------------+----------------------+
// | Called Numbers (8 rows)   | Patterns             |
// +---------------------------+                      |
// | Ticket (fill)             |                      |
// +---------------------------+----------------------+
// | Help Bar (1 row)                                 |
// +--------------------------------------------------+
//
// While loading or after a failed load the middle section is one `body`
// area instead of panels.

use ratatui::layout::{Constraint, Direction, Flex, Layout, Rect};

#[derive(Debug, Clone)]
pub struct RoundLayout {
    pub status_bar: Rect,
    pub header: Rect,
    /// Whole middle section, used for loading and error pages.
    pub body: Rect,
    pub called_numbers: Rect,
    pub ticket: Rect,
    pub patterns: Rect,
    pub help_bar: Rect,
}

pub fn build_layout(area: Rect) -> RoundLayout {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // status bar
            Constraint::Length(3), // header
            Constraint::Min(12),   // panels
            Constraint::Length(1), // help bar
        ])
        .split(area);

    let body = vertical[2];

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(body);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(8), Constraint::Min(5)])
        .split(columns[0]);

    RoundLayout {
        status_bar: vertical[0],
        header: vertical[1],
        body,
        called_numbers: left[0],
        ticket: left[1],
        patterns: columns[1],
        help_bar: vertical[3],
    }
}

/// A `width` x `height` rectangle centered in `area`, clamped to fit.
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let vertical = Layout::vertical([Constraint::Length(height.min(area.height))])
        .flex(Flex::Center)
        .split(area);
    let horizontal = Layout::horizontal([Constraint::Length(width.min(area.width))])
        .flex(Flex::Center)
        .split(vertical[0]);
    horizontal[0]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
