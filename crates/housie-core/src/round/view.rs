// Display projections derived from a snapshot.
//
// Pure functions the TUI renders from. Nothing here is stored; every frame
// recomputes from the latest snapshot.

use super::snapshot::{PatternState, PatternStatus, RoundSnapshot};
use super::ticket::CellState;
use super::ticket::{COLUMNS, ROWS};

/// Numbers that can be called in one round.
pub const TOTAL_NUMBERS: usize = 90;

/// Called-numbers panel contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalledBoard {
    pub current: Option<u8>,
    /// Most recent first.
    pub history: Vec<u8>,
    pub total_called: usize,
}

impl CalledBoard {
    pub fn total_label(&self) -> String {
        format!("Total Called: {} / {}", self.total_called, TOTAL_NUMBERS)
    }
}

pub fn called_board(snapshot: &RoundSnapshot) -> CalledBoard {
    CalledBoard {
        current: snapshot.current_number,
        history: snapshot.called_numbers.iter().rev().copied().collect(),
        total_called: snapshot.called_numbers.len(),
    }
}

/// Ticket panel contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketView {
    pub cells: [[CellState; COLUMNS]; ROWS],
    pub marked: usize,
    pub total: usize,
}

impl TicketView {
    pub fn marked_label(&self) -> String {
        format!("Marked: {} / {}", self.marked, self.total)
    }
}

pub fn ticket_view(snapshot: &RoundSnapshot) -> TicketView {
    let called = &snapshot.called_numbers;
    TicketView {
        cells: snapshot.ticket.cell_states(called),
        marked: snapshot.ticket.marked_count(called),
        total: snapshot.ticket.total_numbers(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeTone {
    Pending,
    Won,
    Claimed,
}

/// Status badge shown beside each pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternBadge {
    pub label: String,
    pub tone: BadgeTone,
}

pub fn pattern_badge(pattern: &PatternState) -> PatternBadge {
    match pattern.status {
        PatternStatus::Pending => PatternBadge {
            label: "In Progress".to_string(),
            tone: BadgeTone::Pending,
        },
        PatternStatus::WonByYou => PatternBadge {
            label: "You Won!".to_string(),
            tone: BadgeTone::Won,
        },
        PatternStatus::WonByOther => PatternBadge {
            label: match pattern.winner_label() {
                Some(names) => format!("Won by {names}"),
                None => "Won by another player".to_string(),
            },
            tone: BadgeTone::Claimed,
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
