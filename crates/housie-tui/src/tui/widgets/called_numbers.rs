// Called-numbers panel: the current call, history most recent first, and
// the running total.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use housie_core::round::snapshot::RoundSnapshot;
use housie_core::round::view::{called_board, CalledBoard};

pub fn render(frame: &mut Frame, area: Rect, snapshot: &RoundSnapshot) {
    let board = called_board(snapshot);

    let paragraph = Paragraph::new(build_lines(&board))
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Called Numbers"),
        );
    frame.render_widget(paragraph, area);
}

fn build_lines(board: &CalledBoard) -> Vec<Line<'static>> {
    let current = match board.current {
        Some(n) => Span::styled(
            format!(" {n:>2} "),
            Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        None => Span::styled(" -- ", Style::default().fg(Color::DarkGray)),
    };

    let mut lines = vec![
        Line::from(vec![
            Span::styled(" Current: ", Style::default().fg(Color::Gray)),
            current,
            Span::raw("   "),
            Span::styled(board.total_label(), Style::default().fg(Color::White)),
        ]),
        Line::from(""),
    ];

    if board.history.is_empty() {
        lines.push(Line::from(Span::styled(
            " Waiting for the first call...",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::DIM),
        )));
    } else {
        lines.push(history_line(&board.history));
    }
    lines
}

/// History as one wrapping line, the newest call highlighted.
fn history_line(history: &[u8]) -> Line<'static> {
    let spans = history
        .iter()
        .enumerate()
        .map(|(i, n)| {
            let style = if i == 0 {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            Span::styled(format!(" {n:>2}"), style)
        })
        .collect::<Vec<_>>();
    Line::from(spans)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
