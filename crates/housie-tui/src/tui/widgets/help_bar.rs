// Help bar: key hints for whatever the view currently allows.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use housie_core::protocol::{Role, ViewPhase};

use crate::tui::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let text = hints(state)
        .iter()
        .map(|(key, action)| format!("{key}:{action}"))
        .collect::<Vec<_>>()
        .join(" | ");

    let paragraph = Paragraph::new(Line::from(Span::styled(
        format!(" {text}"),
        Style::default().fg(Color::White).add_modifier(Modifier::DIM),
    )))
    .style(Style::default().bg(Color::DarkGray));
    frame.render_widget(paragraph, area);
}

/// `(key, action)` pairs, in display order.
pub fn hints(state: &ViewState) -> Vec<(&'static str, &'static str)> {
    let mut hints = Vec::new();
    if state.confirm_quit {
        hints.push(("y", "Leave"));
        hints.push(("n", "Stay"));
        return hints;
    }
    if state.role == Role::Creator && state.phase == ViewPhase::Ready {
        hints.push(("g", "Next number"));
    }
    if state.can_retry() {
        hints.push(("r", "Retry"));
    }
    if state.notices.modal().is_some() {
        hints.push(("Enter", "Close"));
    }
    hints.push(("q", "Quit"));
    hints
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
