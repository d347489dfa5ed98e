// Housie round client entry point.
//
// Startup sequence:
// 1. Parse CLI arguments
// 2. Initialize tracing (log to file, not terminal)
// 3. Load config
// 4. Build credentials, connector and bootstrap client
// 5. Create channels and spawn the round controller
// 6. Run the TUI until the user quits
// 7. Wait briefly for the controller to close the channel

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{error, info};

use housie_core::api::RoundApi;
use housie_core::app::{self, RoundController};
use housie_core::config;
use housie_core::connection::{ChannelAddress, ConnectionManager, TungsteniteConnector};
use housie_core::credentials::{CredentialProvider, FileCredentials};
use housie_core::protocol::{GameId, Role, RoundId};
use housie_tui::tui::{self, ViewState};

/// Follow a live housie round from the terminal.
#[derive(Debug, Parser)]
#[command(name = "housie", version)]
struct Args {
    /// Game to join.
    #[arg(long)]
    game: String,

    /// Round within the game.
    #[arg(long)]
    round: String,

    /// Host the round: enables calling the next number.
    #[arg(long)]
    creator: bool,

    /// Directory holding `config/` and `defaults/`.
    #[arg(long)]
    config_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_tracing()?;
    info!("Housie client starting up");

    let config = config::load_config(args.config_dir.as_deref())
        .context("failed to load configuration")?;
    info!(
        "Config loaded from {}: api={}",
        config.config_dir.display(),
        config.server.api_base_url
    );

    let game_id = GameId::new(args.game);
    let round_id = RoundId::new(args.round);
    let role = if args.creator {
        Role::Creator
    } else {
        Role::Player
    };

    let credentials: Arc<dyn CredentialProvider> =
        Arc::new(FileCredentials::new(config.credentials_path()));
    let address = ChannelAddress::from_config(&config.server)
        .context("invalid round channel address")?;
    let connector = TungsteniteConnector::new(config.server.handshake_timeout());
    let bootstrap = RoundApi::from_config(&config.server).context("failed to build HTTP client")?;

    let controller = RoundController::new(
        game_id.clone(),
        round_id.clone(),
        role,
        ConnectionManager::new(connector, address),
        bootstrap,
        credentials,
    );
    let snapshot_rx = controller.subscribe();

    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (ui_tx, ui_rx) = mpsc::channel(256);

    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(controller, cmd_rx, ui_tx).await {
            error!("Round controller error: {}", e);
        }
    });

    let view_state = ViewState::new(role)
        .with_round(&game_id, &round_id)
        .with_display_duration(config.notifications.display_duration());

    if let Err(e) = tui::run(ui_rx, snapshot_rx, cmd_tx, view_state).await {
        error!("TUI error: {}", e);
    }

    // cmd_tx went down with the TUI, which ends the controller loop. Give it
    // time to close the round channel.
    if tokio::time::timeout(Duration::from_secs(5), app_handle).await.is_err() {
        error!("Round controller did not stop in time");
    }

    info!("Housie client shut down cleanly");
    Ok(())
}

/// Log filter used when `RUST_LOG` is unset. Covers the binary, the TUI
/// library and the core library.
const DEFAULT_LOG_FILTER: &str = "housie=info,housie_tui=info,housie_core=info,warn";

/// Initialize tracing to log to a file (the terminal belongs to the TUI).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("housie.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
