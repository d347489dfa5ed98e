// Ticket panel: the 3x9 grid with called numbers marked.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use housie_core::round::snapshot::RoundSnapshot;
use housie_core::round::ticket::CellState;
use housie_core::round::view::{ticket_view, TicketView};

pub fn render(frame: &mut Frame, area: Rect, snapshot: &RoundSnapshot) {
    if snapshot.ticket.is_blank() {
        let paragraph = Paragraph::new(Line::from(Span::styled(
            " No ticket in this round (host view)",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::DIM),
        )))
        .block(Block::default().borders(Borders::ALL).title("Your Ticket"));
        frame.render_widget(paragraph, area);
        return;
    }

    let view = ticket_view(snapshot);
    let paragraph = Paragraph::new(grid_lines(&view)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Your Ticket ({})", view.marked_label())),
    );
    frame.render_widget(paragraph, area);
}

/// One line per ticket row with a spacer line between rows.
fn grid_lines(view: &TicketView) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for (i, row) in view.cells.iter().enumerate() {
        if i > 0 {
            lines.push(Line::from(""));
        }
        let mut spans = vec![Span::raw(" ")];
        for cell in row {
            spans.push(cell_span(*cell));
            spans.push(Span::raw(" "));
        }
        lines.push(Line::from(spans));
    }
    lines
}

fn cell_span(cell: CellState) -> Span<'static> {
    match cell {
        CellState::Blank => Span::styled("  · ", Style::default().fg(Color::DarkGray)),
        CellState::Uncalled(n) => Span::styled(format!(" {n:>2} "), Style::default().fg(Color::White)),
        CellState::Marked(n) => Span::styled(
            format!(" {n:>2} "),
            Style::default()
                .fg(Color::Black)
                .bg(Color::Green)
                .add_modifier(Modifier::BOLD),
        ),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
