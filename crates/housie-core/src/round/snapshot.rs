// Round snapshot: the client's view of one round in progress.

use serde::Deserialize;
use thiserror::Error;

use super::ticket::{Ticket, MAX_NUMBER};
use crate::protocol::{Amount, GameId, PatternId, RoundId, RoundStatus};

/// Claim status of a prize pattern.
///
/// Monotonic within a round: once a pattern leaves `Pending` it never goes
/// back, and it is never reassigned to another claimant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternStatus {
    #[default]
    Pending,
    WonByYou,
    WonByOther,
}

/// A named winning configuration and its claim state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternState {
    pub id: PatternId,
    pub name: String,
    pub description: String,
    pub amount: Amount,
    pub status: PatternStatus,
    /// Names of the winning players, attached when status leaves `Pending`.
    pub winners: Vec<String>,
}

impl PatternState {
    pub fn pending(
        id: impl Into<PatternId>,
        name: impl Into<String>,
        amount: impl Into<Amount>,
    ) -> Self {
        PatternState {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            amount: amount.into(),
            status: PatternStatus::Pending,
            winners: Vec::new(),
        }
    }

    pub fn is_claimed(&self) -> bool {
        self.status != PatternStatus::Pending
    }

    /// Winner names joined for display, or `None` if nobody is attached.
    pub fn winner_label(&self) -> Option<String> {
        if self.winners.is_empty() {
            None
        } else {
            Some(self.winners.join(", "))
        }
    }
}

/// Problems with a called-numbers sequence received from the backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequenceError {
    #[error("called number {0} is outside 1..=90")]
    OutOfRange(i64),

    #[error("called number {0} appears more than once")]
    Duplicate(u8),
}

/// Check that a called-numbers sequence only holds valid, distinct numbers.
pub fn validate_sequence(sequence: &[u8]) -> Result<(), SequenceError> {
    let mut seen = [false; MAX_NUMBER as usize + 1];
    for &n in sequence {
        if n == 0 || n > MAX_NUMBER {
            return Err(SequenceError::OutOfRange(n.into()));
        }
        if seen[n as usize] {
            return Err(SequenceError::Duplicate(n));
        }
        seen[n as usize] = true;
    }
    Ok(())
}

/// Narrow a sequence as it arrives on the wire to valid called numbers.
pub fn called_sequence(raw: &[i64]) -> Result<Vec<u8>, SequenceError> {
    let sequence = raw
        .iter()
        .map(|&n| {
            u8::try_from(n)
                .ok()
                .filter(|&n| (1..=MAX_NUMBER).contains(&n))
                .ok_or(SequenceError::OutOfRange(n))
        })
        .collect::<Result<Vec<_>, _>>()?;
    validate_sequence(&sequence)?;
    Ok(sequence)
}

/// Everything the client knows about one active round.
///
/// Created from the bootstrap fetch, replaced only by the reconciler, and
/// discarded when the round view unmounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundSnapshot {
    pub game_id: GameId,
    pub round_id: RoundId,
    pub game_title: String,
    pub round_number: Option<u32>,
    pub status: RoundStatus,
    /// Numbers in call order. Append-only within one connection session.
    pub called_numbers: Vec<u8>,
    /// Most recent call; when present it is the last element of
    /// `called_numbers`.
    pub current_number: Option<u8>,
    pub ticket: Ticket,
    pub patterns: Vec<PatternState>,
}

impl RoundSnapshot {
    /// An empty, live round with nothing called yet.
    pub fn new(game_id: GameId, round_id: RoundId, ticket: Ticket) -> Self {
        RoundSnapshot {
            game_id,
            round_id,
            game_title: String::new(),
            round_number: None,
            status: RoundStatus::Live,
            called_numbers: Vec::new(),
            current_number: None,
            ticket,
            patterns: Vec::new(),
        }
    }

    pub fn with_patterns(mut self, patterns: Vec<PatternState>) -> Self {
        self.patterns = patterns;
        self
    }

    pub fn pattern(&self, id: &PatternId) -> Option<&PatternState> {
        self.patterns.iter().find(|p| &p.id == id)
    }

    pub fn pattern_mut(&mut self, id: &PatternId) -> Option<&mut PatternState> {
        self.patterns.iter_mut().find(|p| &p.id == id)
    }

    pub fn is_called(&self, number: u8) -> bool {
        self.called_numbers.contains(&number)
    }

    pub fn is_ended(&self) -> bool {
        self.status == RoundStatus::Ended
    }

    /// Ticket numbers that have been called so far.
    pub fn marked_count(&self) -> usize {
        self.ticket.marked_count(&self.called_numbers)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
