// TUI round view: layout, input handling, and widget rendering.
//
// The TUI owns a `ViewState`. Snapshots arrive through the round store's
// watch channel; transient updates (phase, connection, notices) arrive as
// `UiUpdate` messages. Both are applied to `ViewState` and the screen is
// redrawn at ~30 fps.

pub mod input;
pub mod layout;
pub mod widgets;

use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{Event, EventStream};
use futures_util::StreamExt;
use ratatui::{DefaultTerminal, Frame};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, warn};

use housie_core::protocol::{
    ConnectionStatus, GameId, Role, RoundId, UiUpdate, UserCommand, ViewPhase,
};
use housie_core::round::snapshot::RoundSnapshot;
use housie_core::round::store::SnapshotReceiver;
use housie_core::round::winners::NoticeBoard;

use layout::build_layout;

// ---------------------------------------------------------------------------
// ViewState
// ---------------------------------------------------------------------------

/// TUI-local state the render functions read from.
pub struct ViewState {
    pub role: Role,
    /// "Game 3 / Round 8", shown in the status bar.
    pub round_label: String,
    pub phase: ViewPhase,
    pub connection_status: ConnectionStatus,
    /// Latest snapshot published by the round store.
    pub snapshot: Option<Arc<RoundSnapshot>>,
    pub notices: NoticeBoard,
    pub confirm_quit: bool,
    /// Set when the controller asks for a fresh sign-in.
    pub login_required: bool,
}

impl ViewState {
    pub fn new(role: Role) -> Self {
        ViewState {
            role,
            round_label: String::new(),
            phase: ViewPhase::Loading,
            connection_status: ConnectionStatus::Disconnected,
            snapshot: None,
            notices: NoticeBoard::default(),
            confirm_quit: false,
            login_required: false,
        }
    }

    pub fn with_round(mut self, game_id: &GameId, round_id: &RoundId) -> Self {
        self.round_label = format!("Game {game_id} / Round {round_id}");
        self
    }

    pub fn with_display_duration(mut self, duration: Duration) -> Self {
        self.notices = NoticeBoard::new(duration);
        self
    }

    /// Mirrors the controller: a failed load, or a ready view whose channel
    /// has dropped.
    pub fn can_retry(&self) -> bool {
        match self.phase {
            ViewPhase::Error(_) => true,
            ViewPhase::Ready => self.connection_status == ConnectionStatus::Disconnected,
            ViewPhase::Loading | ViewPhase::RoundEnded => false,
        }
    }
}

impl Default for ViewState {
    fn default() -> Self {
        ViewState::new(Role::Player)
    }
}

// ---------------------------------------------------------------------------
// UiUpdate processing
// ---------------------------------------------------------------------------

/// Apply a single `UiUpdate` to the view state.
pub fn apply_ui_update(state: &mut ViewState, update: UiUpdate, now: Instant) {
    match update {
        UiUpdate::Phase(phase) => {
            // A remount starts from a clean slate.
            if phase == ViewPhase::Loading {
                state.notices.clear();
                state.login_required = false;
            }
            state.phase = phase;
        }
        UiUpdate::ConnectionStatus(status) => {
            state.connection_status = status;
        }
        UiUpdate::Notice(notice) => {
            state.notices.push(notice, now);
        }
        UiUpdate::WinnerModal(modal) => {
            state.notices.show_modal(modal, now);
        }
        UiUpdate::RedirectToLogin => {
            warn!("Credentials missing or rejected; sign-in required");
            state.login_required = true;
        }
    }
}

// ---------------------------------------------------------------------------
// Render frame
// ---------------------------------------------------------------------------

/// Render the complete round view.
pub fn render_frame(frame: &mut Frame, state: &ViewState) {
    let area = frame.area();
    let layout = build_layout(area);

    widgets::status_bar::render(frame, layout.status_bar, state);
    widgets::header::render(frame, layout.header, state);

    match (&state.phase, &state.snapshot) {
        (ViewPhase::Error(message), _) => {
            widgets::page::render_error(frame, layout.body, message, state.login_required);
        }
        (ViewPhase::Ready | ViewPhase::RoundEnded, Some(snapshot)) => {
            widgets::called_numbers::render(frame, layout.called_numbers, snapshot);
            widgets::ticket::render(frame, layout.ticket, snapshot);
            widgets::patterns::render(frame, layout.patterns, snapshot);
        }
        _ => widgets::page::render_loading(frame, layout.body),
    }

    widgets::help_bar::render(frame, layout.help_bar, state);
    widgets::notices::render(frame, area, state);

    if state.confirm_quit {
        widgets::quit_confirm::render(frame, area);
    }
}

// ---------------------------------------------------------------------------
// Main TUI loop
// ---------------------------------------------------------------------------

/// Run the TUI event loop until the user quits or the controller goes away.
///
/// Initializes the terminal, installs a panic hook that restores it, runs
/// the select loop, and restores the terminal on the way out even when the
/// loop fails.
pub async fn run(
    ui_rx: mpsc::Receiver<UiUpdate>,
    snapshot_rx: SnapshotReceiver,
    cmd_tx: mpsc::Sender<UserCommand>,
    view_state: ViewState,
) -> anyhow::Result<()> {
    let mut terminal = ratatui::init();

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        ratatui::restore();
        original_hook(panic_info);
    }));

    let result = event_loop(&mut terminal, ui_rx, snapshot_rx, cmd_tx, view_state).await;

    ratatui::restore();
    result
}

async fn event_loop(
    terminal: &mut DefaultTerminal,
    mut ui_rx: mpsc::Receiver<UiUpdate>,
    mut snapshot_rx: SnapshotReceiver,
    cmd_tx: mpsc::Sender<UserCommand>,
    mut view_state: ViewState,
) -> anyhow::Result<()> {
    view_state.snapshot = snapshot_rx.borrow_and_update().clone();
    let mut snapshots_open = true;

    let mut event_stream = EventStream::new();

    let mut render_tick = tokio::time::interval(Duration::from_millis(33));
    render_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            update = ui_rx.recv() => {
                match update {
                    Some(update) => apply_ui_update(&mut view_state, update, Instant::now()),
                    None => {
                        debug!("UI channel closed, leaving the round view");
                        break;
                    }
                }
            }

            changed = snapshot_rx.changed(), if snapshots_open => {
                match changed {
                    Ok(()) => view_state.snapshot = snapshot_rx.borrow_and_update().clone(),
                    Err(_) => snapshots_open = false,
                }
            }

            maybe_event = event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key_event))) => {
                        if let Some(cmd) = input::handle_key(key_event, &mut view_state) {
                            let quit = cmd == UserCommand::Quit;
                            let _ = cmd_tx.send(cmd).await;
                            if quit {
                                break;
                            }
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("Terminal input error: {}", e);
                        break;
                    }
                    None => break,
                }
            }

            _ = render_tick.tick() => {
                view_state.notices.expire(Instant::now());
                terminal.draw(|frame| render_frame(frame, &view_state))?;
            }
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
