// Header widget: game title, round number and the round's status.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use housie_core::protocol::RoundStatus;
use housie_core::round::snapshot::RoundSnapshot;

use crate::tui::ViewState;

const FALLBACK_TITLE: &str = "Housie";

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let line = match &state.snapshot {
        Some(snapshot) => header_line(snapshot),
        None => Line::from(Span::styled(
            format!(" {FALLBACK_TITLE}"),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        )),
    };

    let border = if state.snapshot.as_ref().is_some_and(|s| s.is_ended()) {
        Color::Red
    } else {
        Color::Yellow
    };

    let paragraph = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border)),
    );
    frame.render_widget(paragraph, area);
}

fn header_line(snapshot: &RoundSnapshot) -> Line<'static> {
    let title = if snapshot.game_title.trim().is_empty() {
        FALLBACK_TITLE.to_string()
    } else {
        snapshot.game_title.clone()
    };

    let mut spans = vec![Span::styled(
        format!(" {title}"),
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
    )];

    if let Some(number) = snapshot.round_number {
        spans.push(Span::styled(
            format!("  Round {number}"),
            Style::default().fg(Color::Gray),
        ));
    }

    spans.push(Span::raw("  "));
    spans.push(Span::styled(
        format!("[{}]", snapshot.status.label()),
        status_style(snapshot.status),
    ));
    Line::from(spans)
}

fn status_style(status: RoundStatus) -> Style {
    match status {
        RoundStatus::Live => Style::default().fg(Color::Green),
        RoundStatus::Ended => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        RoundStatus::Join | RoundStatus::Paused | RoundStatus::Other => {
            Style::default().fg(Color::Yellow)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
