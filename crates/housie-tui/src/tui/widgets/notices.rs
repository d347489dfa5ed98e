// Toast stack (top right) and the winner modal overlay.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

use housie_core::round::winners::{Notice, NoticeTone, WinnerModal};

use crate::tui::layout::centered_rect;
use crate::tui::ViewState;

const TOAST_WIDTH: u16 = 40;
const TOAST_HEIGHT: u16 = 4;
const MODAL_WIDTH: u16 = 56;

/// Render toasts, then the modal on top of everything else.
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    // Newest toast on top, starting just below the status bar.
    let toasts: Vec<&Notice> = state.notices.toasts().collect();
    for (slot, notice) in toasts.iter().rev().enumerate() {
        match toast_rect(area, slot) {
            Some(rect) => render_toast(frame, rect, notice),
            None => break,
        }
    }

    if let Some(modal) = state.notices.modal() {
        render_modal(frame, area, modal);
    }
}

/// Area for the `slot`-th toast from the top, or `None` once the stack
/// would run off the screen.
fn toast_rect(area: Rect, slot: usize) -> Option<Rect> {
    let width = TOAST_WIDTH.min(area.width);
    let y = area.y + 1 + TOAST_HEIGHT.checked_mul(u16::try_from(slot).ok()?)?;
    if y + TOAST_HEIGHT > area.y + area.height {
        return None;
    }
    Some(Rect::new(area.x + area.width - width, y, width, TOAST_HEIGHT))
}

fn render_toast(frame: &mut Frame, rect: Rect, notice: &Notice) {
    let color = tone_color(notice.tone);
    frame.render_widget(Clear, rect);

    let title = format!(" {} {} ", notice.raised_at.format("%H:%M:%S"), notice.title);
    let paragraph = Paragraph::new(Line::from(Span::raw(notice.body.clone())))
        .wrap(Wrap { trim: true })
        .style(Style::default().bg(Color::Black))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color))
                .title(Span::styled(
                    title,
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                )),
        );
    frame.render_widget(paragraph, rect);
}

fn render_modal(frame: &mut Frame, area: Rect, modal: &WinnerModal) {
    let lines = modal_lines(modal);
    let height = u16::try_from(lines.len()).unwrap_or(u16::MAX).saturating_add(2);
    let rect = centered_rect(MODAL_WIDTH, height, area);
    frame.render_widget(Clear, rect);

    let color = if modal.includes_you {
        Color::Green
    } else {
        Color::Magenta
    };
    let paragraph = Paragraph::new(lines)
        .style(Style::default().bg(Color::Black))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color))
                .title(Span::styled(
                    format!(" {} ", modal.title()),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                )),
        );
    frame.render_widget(paragraph, rect);
}

fn modal_lines(modal: &WinnerModal) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from("")];
    for entry in &modal.entries {
        let who = if entry.is_current_user {
            Span::styled(
                "You",
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            )
        } else {
            Span::styled(entry.player_name.clone(), Style::default().fg(Color::White))
        };
        let pattern = if entry.pattern_name.is_empty() {
            entry.pattern_id.to_string()
        } else {
            entry.pattern_name.clone()
        };
        lines.push(Line::from(vec![
            Span::styled(
                format!("  {pattern}: "),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
            who,
            Span::styled(format!("  ({})", entry.amount), Style::default().fg(Color::Gray)),
        ]));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "  Enter to close",
        Style::default().fg(Color::DarkGray),
    )));
    lines
}

pub fn tone_color(tone: NoticeTone) -> Color {
    match tone {
        NoticeTone::Info => Color::Cyan,
        NoticeTone::Winner => Color::Magenta,
        NoticeTone::YouWon => Color::Green,
        NoticeTone::Error => Color::Red,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
