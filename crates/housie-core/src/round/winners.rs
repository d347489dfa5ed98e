// Winner notification queue and the transient notice board.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::protocol::{Amount, PatternId, PlayerId};

/// How long toasts and the winner modal stay up.
pub const DEFAULT_DISPLAY_DURATION: Duration = Duration::from_secs(5);

/// Toasts beyond this many push out the oldest.
const MAX_TOASTS: usize = 6;

// ---------------------------------------------------------------------------
// Winner events
// ---------------------------------------------------------------------------

/// One player credited with one pattern, as announced by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinnerEvent {
    pub pattern_id: PatternId,
    pub pattern_name: String,
    pub player_id: PlayerId,
    pub player_name: String,
    pub amount: Amount,
    pub is_current_user: bool,
}

impl WinnerEvent {
    pub fn dedup_key(&self) -> (PatternId, PlayerId) {
        (self.pattern_id.clone(), self.player_id.clone())
    }

    fn pattern_label(&self) -> &str {
        if self.pattern_name.is_empty() {
            self.pattern_id.as_str()
        } else {
            &self.pattern_name
        }
    }
}

/// Remembers which `(pattern, player)` pairs have already been announced in
/// this round session so each one surfaces exactly once.
#[derive(Debug, Default)]
pub struct WinnerQueue {
    seen: HashSet<(PatternId, PlayerId)>,
}

impl WinnerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if this pair was offered before, otherwise records it.
    pub fn offer(&mut self, event: &WinnerEvent) -> bool {
        self.seen.insert(event.dedup_key())
    }

    /// Offer every event from one frame. Returns the accepted ones, or `None`
    /// if all of them were repeats.
    pub fn offer_batch(&mut self, events: Vec<WinnerEvent>) -> Option<WinnerBatch> {
        let accepted: Vec<WinnerEvent> = events
            .into_iter()
            .filter(|e| {
                let fresh = self.offer(e);
                if !fresh {
                    debug!(
                        "Suppressing repeat winner {} for pattern {}",
                        e.player_id, e.pattern_id
                    );
                }
                fresh
            })
            .collect();

        if accepted.is_empty() {
            None
        } else {
            info!("{} new winner(s) announced", accepted.len());
            Some(WinnerBatch { accepted })
        }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Fresh winners from one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinnerBatch {
    accepted: Vec<WinnerEvent>,
}

impl WinnerBatch {
    pub fn events(&self) -> &[WinnerEvent] {
        &self.accepted
    }

    pub fn includes_you(&self) -> bool {
        self.accepted.iter().any(|e| e.is_current_user)
    }

    /// One toast per accepted winner.
    pub fn notices(&self) -> Vec<Notice> {
        self.accepted.iter().map(Notice::winner).collect()
    }

    pub fn modal(&self) -> WinnerModal {
        WinnerModal {
            entries: self.accepted.clone(),
            includes_you: self.includes_you(),
        }
    }
}

// ---------------------------------------------------------------------------
// Notices
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeTone {
    Info,
    Winner,
    YouWon,
    Error,
}

/// A transient toast.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub tone: NoticeTone,
    pub title: String,
    pub body: String,
    pub raised_at: DateTime<Local>,
}

impl Notice {
    pub fn info(title: impl Into<String>, body: impl Into<String>) -> Self {
        Notice::with_tone(NoticeTone::Info, title, body)
    }

    pub fn error(title: impl Into<String>, body: impl Into<String>) -> Self {
        Notice::with_tone(NoticeTone::Error, title, body)
    }

    pub fn winner(event: &WinnerEvent) -> Self {
        if event.is_current_user {
            Notice::with_tone(
                NoticeTone::YouWon,
                format!("You won {}!", event.pattern_label()),
                format!("Prize: {}", event.amount),
            )
        } else {
            Notice::with_tone(
                NoticeTone::Winner,
                format!("{} claimed", event.pattern_label()),
                format!("{} won {}", event.player_name, event.amount),
            )
        }
    }

    fn with_tone(tone: NoticeTone, title: impl Into<String>, body: impl Into<String>) -> Self {
        Notice {
            tone,
            title: title.into(),
            body: body.into(),
            raised_at: Local::now(),
        }
    }
}

/// Modal listing the winners of one or more batches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinnerModal {
    pub entries: Vec<WinnerEvent>,
    pub includes_you: bool,
}

impl WinnerModal {
    pub fn title(&self) -> &'static str {
        if self.includes_you {
            "Congratulations, you won!"
        } else {
            "We have a winner"
        }
    }
}

/// Live toasts and at most one modal, each auto-dismissed after the display
/// duration.
#[derive(Debug)]
pub struct NoticeBoard {
    duration: Duration,
    toasts: Vec<(Notice, Instant)>,
    modal: Option<(WinnerModal, Instant)>,
}

impl NoticeBoard {
    pub fn new(duration: Duration) -> Self {
        NoticeBoard {
            duration,
            toasts: Vec::new(),
            modal: None,
        }
    }

    pub fn push(&mut self, notice: Notice, now: Instant) {
        if self.toasts.len() >= MAX_TOASTS {
            self.toasts.remove(0);
        }
        self.toasts.push((notice, now + self.duration));
    }

    /// Show a modal. If one is already open the entries are merged and the
    /// timer restarts.
    pub fn show_modal(&mut self, modal: WinnerModal, now: Instant) {
        let expires = now + self.duration;
        match &mut self.modal {
            Some((open, deadline)) => {
                open.includes_you |= modal.includes_you;
                open.entries.extend(modal.entries);
                *deadline = expires;
            }
            None => self.modal = Some((modal, expires)),
        }
    }

    pub fn dismiss_modal(&mut self) -> bool {
        self.modal.take().is_some()
    }

    /// Drop everything whose display time has passed. Returns true if
    /// anything was removed.
    pub fn expire(&mut self, now: Instant) -> bool {
        let before = self.toasts.len();
        self.toasts.retain(|(_, deadline)| *deadline > now);
        let mut removed = self.toasts.len() != before;

        if matches!(&self.modal, Some((_, deadline)) if *deadline <= now) {
            self.modal = None;
            removed = true;
        }
        removed
    }

    pub fn toasts(&self) -> impl Iterator<Item = &Notice> {
        self.toasts.iter().map(|(n, _)| n)
    }

    pub fn modal(&self) -> Option<&WinnerModal> {
        self.modal.as_ref().map(|(m, _)| m)
    }

    pub fn clear(&mut self) {
        self.toasts.clear();
        self.modal = None;
    }
}

impl Default for NoticeBoard {
    fn default() -> Self {
        Self::new(DEFAULT_DISPLAY_DURATION)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
