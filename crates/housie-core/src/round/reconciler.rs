// Event reconciler: folds inbound channel frames into the round snapshot.
//
// `apply` is pure. It never mutates the snapshot it is given; callers hand
// the returned snapshot to the store as a wholesale replacement.

use thiserror::Error;
use tracing::{debug, warn};

use super::snapshot::{called_sequence, PatternStatus, RoundSnapshot};
use super::winners::WinnerEvent;
use crate::protocol::{PlayerId, RoundStatus, ServerFrame, WinnerEntry, WinnerGroup};

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Decode one raw text frame from the round channel.
pub fn parse_frame(raw: &str) -> Result<ServerFrame, FrameError> {
    Ok(serde_json::from_str(raw)?)
}

/// Outcome of applying one frame.
#[derive(Debug, Clone)]
pub struct Reconciled {
    /// The replacement snapshot. Equal to the input when `changed` is false.
    pub snapshot: RoundSnapshot,
    pub changed: bool,
    /// Every winner named in the frame, including repeats for patterns that
    /// were already claimed. Deduplication is the winner queue's job.
    pub winner_events: Vec<WinnerEvent>,
    /// Error text reported by the backend, for transient display only.
    pub server_error: Option<String>,
    /// True when this frame moved the round into `Ended`.
    pub round_ended: bool,
}

/// Apply one frame to a snapshot.
///
/// All branches present in the frame fire: called numbers, winners, status
/// and error. `local_player` decides between `WonByYou` and `WonByOther`.
pub fn apply(
    snapshot: &RoundSnapshot,
    frame: &ServerFrame,
    local_player: Option<&PlayerId>,
) -> Reconciled {
    let mut next = snapshot.clone();

    match (&frame.called_numbers, frame.number) {
        (Some(raw), number) => match called_sequence(raw) {
            Ok(sequence) => apply_sequence(&mut next, number, &sequence),
            Err(e) => warn!("Ignoring invalid called_numbers: {}", e),
        },
        (None, Some(number)) => {
            warn!("Ignoring number {} without a called_numbers sequence", number);
        }
        (None, None) => {}
    }

    let winner_events = match &frame.winners {
        Some(groups) => apply_winners(&mut next, groups, local_player),
        None => Vec::new(),
    };

    let round_ended = match frame.status {
        Some(status) => apply_status(&mut next, status),
        None => false,
    };

    let server_error = frame
        .error
        .as_ref()
        .map(|e| e.trim())
        .filter(|e| !e.is_empty())
        .map(str::to_string);

    let changed = next != *snapshot;
    Reconciled {
        snapshot: next,
        changed,
        winner_events,
        server_error,
        round_ended,
    }
}

// ---------------------------------------------------------------------------
// Branches
// ---------------------------------------------------------------------------

/// Take the server's sequence unless it is a strict prefix of ours.
///
/// A sequence that extends ours is the normal case. One that neither extends
/// nor trails ours means the backend's history differs from what we hold;
/// the backend is authoritative, so it replaces ours outright.
fn apply_sequence(next: &mut RoundSnapshot, number: Option<i64>, sequence: &[u8]) {
    let last = sequence.last().copied();

    if !sequence.starts_with(&next.called_numbers) {
        if next.called_numbers.starts_with(sequence) {
            debug!(
                "Ignoring stale called_numbers ({} held, {} received)",
                next.called_numbers.len(),
                sequence.len()
            );
            return;
        }
        warn!(
            "called_numbers diverge from the {} held; taking the server's {}",
            next.called_numbers.len(),
            sequence.len()
        );
        next.called_numbers = sequence.to_vec();
        next.current_number = last;
        return;
    }

    next.called_numbers = sequence.to_vec();

    match number {
        Some(n) if u8::try_from(n).ok() == last => next.current_number = last,
        Some(n) => {
            warn!(
                "Called number {} is not the last of its sequence; using {:?}",
                n, last
            );
            next.current_number = last;
        }
        // Resync: only fill the current number if we had none.
        None => {
            if next.current_number.is_none() {
                next.current_number = last;
            }
        }
    }
}

/// First write wins: only `Pending` patterns are claimed. Every entry is
/// still turned into an event.
fn apply_winners(
    next: &mut RoundSnapshot,
    groups: &[WinnerGroup],
    local_player: Option<&PlayerId>,
) -> Vec<WinnerEvent> {
    let mut events = Vec::new();

    for group in groups {
        let (pattern_name, pattern_amount) = match next.pattern_mut(&group.pattern_id) {
            Some(pattern) => {
                if pattern.status == PatternStatus::Pending && !group.winners.is_empty() {
                    let you_won = group
                        .winners
                        .iter()
                        .any(|w| Some(&w.player_id) == local_player);
                    pattern.status = if you_won {
                        PatternStatus::WonByYou
                    } else {
                        PatternStatus::WonByOther
                    };
                    pattern.winners = group.winners.iter().map(display_name).collect();
                } else if pattern.is_claimed() {
                    debug!("Pattern {} already claimed, keeping first winner", pattern.id);
                }
                (pattern.name.clone(), Some(pattern.amount.clone()))
            }
            None => {
                warn!("Winner announced for unknown pattern {}", group.pattern_id);
                (String::new(), None)
            }
        };

        let pattern_name = if group.pattern_name.is_empty() {
            pattern_name
        } else {
            group.pattern_name.clone()
        };

        for entry in &group.winners {
            events.push(WinnerEvent {
                pattern_id: group.pattern_id.clone(),
                pattern_name: pattern_name.clone(),
                player_id: entry.player_id.clone(),
                player_name: display_name(entry),
                amount: entry
                    .amount
                    .clone()
                    .or_else(|| pattern_amount.clone())
                    .unwrap_or_default(),
                is_current_user: Some(&entry.player_id) == local_player,
            });
        }
    }

    events
}

fn display_name(entry: &WinnerEntry) -> String {
    if entry.player_name.is_empty() {
        format!("Player {}", entry.player_id)
    } else {
        entry.player_name.clone()
    }
}

/// Returns true when the round newly became `Ended`.
fn apply_status(next: &mut RoundSnapshot, status: RoundStatus) -> bool {
    if next.status == status {
        return false;
    }
    if next.is_ended() {
        debug!("Round already ended, ignoring status {:?}", status);
        return false;
    }
    next.status = status;
    status == RoundStatus::Ended
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
