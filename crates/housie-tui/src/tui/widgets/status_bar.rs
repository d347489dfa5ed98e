// Status bar widget: connection dot, view phase, round identity.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use housie_core::protocol::{ConnectionStatus, Role, ViewPhase};

use crate::tui::ViewState;

/// Render the status bar into the given area.
///
/// Layout: [connection dot + label] | [phase] | [round] [role]
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let (dot, dot_color) = connection_indicator(state.connection_status);
    let separator = Span::styled(" | ", Style::default().fg(Color::Gray));

    let mut spans = vec![
        Span::styled(format!(" {dot} "), Style::default().fg(dot_color)),
        Span::styled(
            connection_label(state.connection_status),
            Style::default().fg(Color::White),
        ),
        separator.clone(),
        Span::styled(
            phase_label(&state.phase),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
    ];

    if !state.round_label.is_empty() {
        spans.push(separator);
        spans.push(Span::styled(
            state.round_label.clone(),
            Style::default().fg(Color::White),
        ));
    }

    if state.role == Role::Creator {
        spans.push(Span::styled(" [host]", Style::default().fg(Color::Cyan)));
    }

    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, area);
}

pub fn connection_indicator(status: ConnectionStatus) -> (&'static str, Color) {
    match status {
        ConnectionStatus::Connected => ("●", Color::Green),
        ConnectionStatus::Disconnected => ("●", Color::Red),
    }
}

pub fn connection_label(status: ConnectionStatus) -> &'static str {
    match status {
        ConnectionStatus::Connected => "Live",
        ConnectionStatus::Disconnected => "Offline",
    }
}

pub fn phase_label(phase: &ViewPhase) -> &'static str {
    match phase {
        ViewPhase::Loading => "Loading",
        ViewPhase::Error(_) => "Error",
        ViewPhase::Ready => "Playing",
        ViewPhase::RoundEnded => "Round ended",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_indicator_colors() {
        assert_eq!(connection_indicator(ConnectionStatus::Connected).1, Color::Green);
        assert_eq!(connection_indicator(ConnectionStatus::Disconnected).1, Color::Red);
    }

    #[test]
    fn phase_label_values() {
        assert_eq!(phase_label(&ViewPhase::Loading), "Loading");
        assert_eq!(phase_label(&ViewPhase::Error("x".to_string())), "Error");
        assert_eq!(phase_label(&ViewPhase::Ready), "Playing");
        assert_eq!(phase_label(&ViewPhase::RoundEnded), "Round ended");
    }

    #[test]
    fn render_shows_round_label_and_host_tag() {
        let backend = ratatui::backend::TestBackend::new(80, 1);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        let mut state = ViewState::new(Role::Creator);
        state.round_label = "Game 3 / Round 8".to_string();
        terminal
            .draw(|frame| render(frame, frame.area(), &state))
            .unwrap();

        let line: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(line.contains("Offline"));
        assert!(line.contains("Loading"));
        assert!(line.contains("Game 3 / Round 8"));
        assert!(line.contains("[host]"));
    }
}
