// Pattern list: each prize pattern with its amount and claim badge.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};
use ratatui::Frame;

use housie_core::round::snapshot::{PatternState, RoundSnapshot};
use housie_core::round::view::{pattern_badge, BadgeTone};

pub fn render(frame: &mut Frame, area: Rect, snapshot: &RoundSnapshot) {
    let block = Block::default().borders(Borders::ALL).title("Patterns");

    if snapshot.patterns.is_empty() {
        let paragraph = Paragraph::new(Line::from(Span::styled(
            " No patterns for this round",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::DIM),
        )))
        .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let items: Vec<ListItem> = snapshot.patterns.iter().map(pattern_item).collect();
    frame.render_widget(List::new(items).block(block), area);
}

fn pattern_item(pattern: &PatternState) -> ListItem<'static> {
    let badge = pattern_badge(pattern);
    let mut lines = vec![
        Line::from(vec![
            Span::styled(
                format!(" {}", pattern.name),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  Prize: {}", pattern.amount),
                Style::default().fg(Color::Gray),
            ),
        ]),
        Line::from(Span::styled(format!("   {}", badge.label), badge_style(badge.tone))),
    ];
    if !pattern.description.is_empty() {
        lines.push(Line::from(Span::styled(
            format!("   {}", pattern.description),
            Style::default().fg(Color::DarkGray),
        )));
    }
    ListItem::new(lines)
}

fn badge_style(tone: BadgeTone) -> Style {
    match tone {
        BadgeTone::Pending => Style::default().fg(Color::Yellow),
        BadgeTone::Won => Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        BadgeTone::Claimed => Style::default().fg(Color::Magenta),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
