// Round view controller and its event loop.
//
// Owns the round store, the winner queue and the connection manager for one
// mounted round. Frames from the channel and commands from the TUI are
// handled one at a time, in arrival order; snapshot replacements go out on
// the store's watch channel and everything else as `UiUpdate`s.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::api::{self, BootstrapSource};
use crate::connection::{ConnectionManager, Connector, WsEvent};
use crate::credentials::CredentialProvider;
use crate::error::Surface;
use crate::protocol::{
    ClientCommand, ConnectionStatus, GameId, PlayerId, Role, RoundId, UiUpdate, UserCommand,
    ViewPhase,
};
use crate::round::reconciler::{self, parse_frame};
use crate::round::snapshot::RoundSnapshot;
use crate::round::store::{RoundStore, SnapshotReceiver};
use crate::round::winners::{Notice, WinnerQueue};

/// Shown when the session token is missing or rejected.
const LOGIN_REQUIRED: &str = "Login required: add a valid auth_token to credentials.toml";

/// Result of one mount attempt.
enum Mount {
    /// Snapshot loaded. Carries the channel's event stream when it opened.
    Ready(Option<mpsc::Receiver<WsEvent>>),
    Failed,
    Quit,
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

pub struct RoundController<C: Connector, B: BootstrapSource> {
    game_id: GameId,
    round_id: RoundId,
    role: Role,
    phase: ViewPhase,
    connection_status: ConnectionStatus,
    /// Read from the credential provider at mount time.
    local_player: Option<PlayerId>,
    store: RoundStore,
    winners: WinnerQueue,
    connection: ConnectionManager<C>,
    bootstrap: B,
    credentials: Arc<dyn CredentialProvider>,
}

impl<C: Connector, B: BootstrapSource> RoundController<C, B> {
    pub fn new(
        game_id: GameId,
        round_id: RoundId,
        role: Role,
        connection: ConnectionManager<C>,
        bootstrap: B,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        RoundController {
            game_id,
            round_id,
            role,
            phase: ViewPhase::Loading,
            connection_status: ConnectionStatus::Disconnected,
            local_player: None,
            store: RoundStore::new(),
            winners: WinnerQueue::new(),
            connection,
            bootstrap,
            credentials,
        }
    }

    /// Snapshot updates for the view. Subscribe before handing the
    /// controller to `run`.
    pub fn subscribe(&self) -> SnapshotReceiver {
        self.store.subscribe()
    }

    pub fn phase(&self) -> &ViewPhase {
        &self.phase
    }

    pub fn snapshot(&self) -> Option<Arc<RoundSnapshot>> {
        self.store.get()
    }

    /// Retry is offered after a failed load or a dropped channel.
    fn can_retry(&self) -> bool {
        match self.phase {
            ViewPhase::Error(_) => true,
            ViewPhase::Ready => self.connection_status == ConnectionStatus::Disconnected,
            ViewPhase::Loading | ViewPhase::RoundEnded => false,
        }
    }

    // -- mount / unmount --

    /// Fetch the round and open its channel.
    ///
    /// Both waits are raced against the command channel so a quit during
    /// loading abandons them.
    async fn mount(
        &mut self,
        cmd_rx: &mut mpsc::Receiver<UserCommand>,
        ui_tx: &mpsc::Sender<UiUpdate>,
    ) -> Mount {
        self.connection.close().await;
        self.set_connection(ConnectionStatus::Disconnected, ui_tx).await;
        self.store.clear();
        // The seen-winner set lives as long as the controller's round, so a
        // remount does not announce the same winners again.
        self.local_player = self.credentials.player_id();
        self.set_phase(ViewPhase::Loading, ui_tx).await;

        // --- bootstrap fetch ---
        let fetched = {
            let fetch = api::fetch_snapshot(
                &self.bootstrap,
                self.credentials.as_ref(),
                &self.game_id,
                &self.round_id,
            );
            tokio::pin!(fetch);
            loop {
                tokio::select! {
                    result = &mut fetch => break Some(result),
                    cmd = cmd_rx.recv() => match cmd {
                        Some(UserCommand::Quit) | None => break None,
                        Some(other) => debug!("Ignoring {:?} while loading", other),
                    }
                }
            }
        };

        let snapshot = match fetched {
            None => return Mount::Quit,
            Some(Ok(snapshot)) => snapshot,
            Some(Err(e)) => {
                if e.surface() == Surface::RedirectToLogin {
                    warn!("Round bootstrap needs login: {}", e);
                    let _ = ui_tx.send(UiUpdate::RedirectToLogin).await;
                    self.set_phase(ViewPhase::Error(LOGIN_REQUIRED.into()), ui_tx)
                        .await;
                } else {
                    error!("Failed to load round: {}", e);
                    self.set_phase(ViewPhase::Error(e.to_string()), ui_tx).await;
                }
                return Mount::Failed;
            }
        };

        info!(
            "Loaded round {} ({} called, {} patterns)",
            snapshot.round_id,
            snapshot.called_numbers.len(),
            snapshot.patterns.len()
        );
        let ended = snapshot.is_ended();
        if !self.store.replace(snapshot) {
            return Mount::Quit;
        }
        if ended {
            info!("Round already ended, not opening channel");
            self.set_phase(ViewPhase::RoundEnded, ui_tx).await;
            return Mount::Ready(None);
        }

        // --- channel handshake ---
        let opened = {
            let open =
                self.connection
                    .open(&self.game_id, &self.round_id, self.credentials.as_ref());
            tokio::pin!(open);
            loop {
                tokio::select! {
                    result = &mut open => break Some(result),
                    cmd = cmd_rx.recv() => match cmd {
                        Some(UserCommand::Quit) | None => break None,
                        Some(other) => debug!("Ignoring {:?} while connecting", other),
                    }
                }
            }
        };

        match opened {
            None => Mount::Quit,
            Some(Ok(rx)) => {
                self.set_phase(ViewPhase::Ready, ui_tx).await;
                Mount::Ready(Some(rx))
            }
            Some(Err(e)) => {
                self.set_phase(ViewPhase::Ready, ui_tx).await;
                if e.surface() == Surface::RedirectToLogin {
                    warn!("Round channel needs login: {}", e);
                    let _ = ui_tx.send(UiUpdate::RedirectToLogin).await;
                } else {
                    warn!("Could not open round channel: {}", e);
                    self.notify(Notice::error("Could not connect", e.to_string()), ui_tx)
                        .await;
                }
                Mount::Ready(None)
            }
        }
    }

    /// Close the channel and retire the store so late results are dropped.
    async fn unmount(&mut self) {
        self.connection.close().await;
        self.store.retire();
        info!("Round view unmounted");
    }

    // -- frames --

    async fn handle_ws_event(&mut self, event: WsEvent, ui_tx: &mpsc::Sender<UiUpdate>) {
        match event {
            WsEvent::Connected => {
                info!("Round channel connected");
                self.set_connection(ConnectionStatus::Connected, ui_tx).await;
            }
            WsEvent::Disconnected { reason } => {
                self.set_connection(ConnectionStatus::Disconnected, ui_tx)
                    .await;
                if self.phase == ViewPhase::Ready {
                    warn!("Round channel lost: {}", reason);
                    self.notify(Notice::error("Disconnected", "Press r to reconnect"), ui_tx)
                        .await;
                }
            }
            WsEvent::Message(raw) => self.handle_frame(&raw, ui_tx).await,
        }
    }

    /// Reconcile one frame into the store and surface its side effects.
    async fn handle_frame(&mut self, raw: &str, ui_tx: &mpsc::Sender<UiUpdate>) {
        let frame = match parse_frame(raw) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Dropping frame: {}", e);
                return;
            }
        };
        let Some(current) = self.store.get() else {
            debug!("Frame arrived before a snapshot; dropping");
            return;
        };

        let out = reconciler::apply(&current, &frame, self.local_player.as_ref());

        if let Some(message) = &out.server_error {
            warn!("Server reported: {}", message);
            self.notify(Notice::error("Server error", message.clone()), ui_tx)
                .await;
        }

        if out.changed {
            self.store.replace(out.snapshot);
        }

        if let Some(batch) = self.winners.offer_batch(out.winner_events) {
            for notice in batch.notices() {
                self.notify(notice, ui_tx).await;
            }
            let _ = ui_tx.send(UiUpdate::WinnerModal(batch.modal())).await;
        }

        if out.round_ended {
            info!("Round {} ended", self.round_id);
            self.set_phase(ViewPhase::RoundEnded, ui_tx).await;
            self.connection.close().await;
        }
    }

    // -- commands --

    /// Ask the backend for the next number. Nothing changes locally; the
    /// call comes back as a normal frame.
    async fn generate_number(&mut self, ui_tx: &mpsc::Sender<UiUpdate>) {
        if self.role != Role::Creator {
            self.notify(
                Notice::info("Not allowed", "Only the game creator can call numbers"),
                ui_tx,
            )
            .await;
            return;
        }
        if self.phase != ViewPhase::Ready {
            debug!("Ignoring generate_number in phase {:?}", self.phase);
            return;
        }
        match self.connection.send(ClientCommand::GenerateNumber) {
            Ok(()) => info!("Requested next number"),
            Err(e) => {
                warn!("generate_number dropped: {}", e);
                self.notify(Notice::error("Not connected", e.to_string()), ui_tx)
                    .await;
            }
        }
    }

    // -- helpers --

    async fn set_phase(&mut self, phase: ViewPhase, ui_tx: &mpsc::Sender<UiUpdate>) {
        if self.phase != phase {
            debug!("Phase {:?} -> {:?}", self.phase, phase);
            self.phase = phase.clone();
            let _ = ui_tx.send(UiUpdate::Phase(phase)).await;
        }
    }

    async fn set_connection(&mut self, status: ConnectionStatus, ui_tx: &mpsc::Sender<UiUpdate>) {
        if self.connection_status != status {
            self.connection_status = status;
            let _ = ui_tx.send(UiUpdate::ConnectionStatus(status)).await;
        }
    }

    async fn notify(&self, notice: Notice, ui_tx: &mpsc::Sender<UiUpdate>) {
        let _ = ui_tx.send(UiUpdate::Notice(notice)).await;
    }
}

// ---------------------------------------------------------------------------
// Event loop
// ---------------------------------------------------------------------------

/// Run the controller until the user quits or the command channel closes.
///
/// Listens on two channels with `tokio::select!`:
/// - `ws_rx`: events of the current round channel, if one is open
/// - `cmd_rx`: user commands from the TUI
pub async fn run<C, B>(
    mut controller: RoundController<C, B>,
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    ui_tx: mpsc::Sender<UiUpdate>,
) -> anyhow::Result<()>
where
    C: Connector,
    B: BootstrapSource,
{
    info!(
        "Round controller started for game {} round {} as {:?}",
        controller.game_id, controller.round_id, controller.role
    );

    let mut ws_rx = match controller.mount(&mut cmd_rx, &ui_tx).await {
        Mount::Ready(rx) => rx,
        Mount::Failed => None,
        Mount::Quit => {
            controller.unmount().await;
            return Ok(());
        }
    };

    loop {
        tokio::select! {
            // --- round channel events (only poll while a channel is open) ---
            event = recv_ws(&mut ws_rx), if ws_rx.is_some() => {
                match event {
                    Some(event) => controller.handle_ws_event(event, &ui_tx).await,
                    None => {
                        debug!("Round channel event stream closed");
                        ws_rx = None;
                        controller
                            .set_connection(ConnectionStatus::Disconnected, &ui_tx)
                            .await;
                    }
                }
            }

            // --- user commands ---
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::GenerateNumber) => {
                        controller.generate_number(&ui_tx).await;
                    }
                    Some(UserCommand::Retry) => {
                        if !controller.can_retry() {
                            debug!("Retry ignored in phase {:?}", controller.phase);
                            continue;
                        }
                        info!("Remounting round {}", controller.round_id);
                        ws_rx = None;
                        match controller.mount(&mut cmd_rx, &ui_tx).await {
                            Mount::Ready(rx) => ws_rx = rx,
                            Mount::Failed => {}
                            Mount::Quit => break,
                        }
                    }
                    Some(UserCommand::Quit) | None => {
                        info!("Quit command received, shutting down");
                        break;
                    }
                }
            }
        }
    }

    controller.unmount().await;
    Ok(())
}

async fn recv_ws(rx: &mut Option<mpsc::Receiver<WsEvent>>) -> Option<WsEvent> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
