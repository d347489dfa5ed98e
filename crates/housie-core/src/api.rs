// Round bootstrap: the one-shot HTTP fetch that seeds a round view.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{round_url, RoundPathError, ServerConfig};
use crate::credentials::CredentialProvider;
use crate::error::Surface;
use crate::protocol::{Amount, GameId, PatternId, RoundId, RoundStatus};
use crate::round::snapshot::{
    validate_sequence, PatternState, PatternStatus, RoundSnapshot, SequenceError,
};
use crate::round::ticket::{Ticket, TicketError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("not logged in")]
    MissingToken,

    #[error("session was rejected by the server")]
    Unauthorized,

    #[error("server returned HTTP {status}")]
    Status { status: u16 },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid round URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid round path: {0}")]
    Path(#[from] RoundPathError),

    #[error("could not decode round data: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid ticket: {0}")]
    InvalidTicket(#[from] TicketError),

    #[error("invalid called numbers: {0}")]
    InvalidCalledNumbers(#[from] SequenceError),
}

impl FetchError {
    pub fn surface(&self) -> Surface {
        match self {
            FetchError::MissingToken | FetchError::Unauthorized => Surface::RedirectToLogin,
            _ => Surface::FullPageError,
        }
    }
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// Round detail as returned by the bootstrap endpoint. Both snake_case and
/// camelCase field names are accepted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoundBootstrap {
    #[serde(default, alias = "gameTitle", alias = "title")]
    pub game_title: String,
    #[serde(default, alias = "roundNumber", alias = "number")]
    pub round_number: Option<u32>,
    #[serde(default, alias = "ticketNumbers")]
    pub ticket_numbers: Vec<Vec<Option<u8>>>,
    #[serde(default, alias = "calledNumbers")]
    pub called_numbers: Vec<u8>,
    #[serde(default, alias = "currentNumber")]
    pub current_number: Option<u8>,
    #[serde(default)]
    pub status: Option<RoundStatus>,
    #[serde(default)]
    pub patterns: Vec<PatternPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatternPayload {
    pub id: PatternId,
    #[serde(default, alias = "patternName", alias = "pattern_name")]
    pub name: String,
    #[serde(default, alias = "prizeDescription", alias = "prize_description")]
    pub description: String,
    #[serde(default, alias = "prizeAmount", alias = "prize_amount")]
    pub amount: Amount,
    #[serde(default)]
    pub status: PatternStatus,
    /// Single winner name, as older payloads send it.
    #[serde(default)]
    pub winner: Option<String>,
    #[serde(default)]
    pub winners: Vec<String>,
}

impl RoundBootstrap {
    /// Validate the payload and build the initial snapshot.
    ///
    /// An empty ticket is allowed (creators hold none). The current number is
    /// always the last called number.
    pub fn into_snapshot(
        self,
        game_id: GameId,
        round_id: RoundId,
    ) -> Result<RoundSnapshot, FetchError> {
        let ticket = if self.ticket_numbers.is_empty() {
            Ticket::blank()
        } else {
            Ticket::from_rows(self.ticket_numbers)?
        };

        validate_sequence(&self.called_numbers)?;
        let last = self.called_numbers.last().copied();
        if let Some(current) = self.current_number {
            if Some(current) != last {
                warn!(
                    "Bootstrap current_number {} is not the last called number {:?}",
                    current, last
                );
            }
        }

        let patterns = self
            .patterns
            .into_iter()
            .map(|p| {
                let winners = if p.winners.is_empty() {
                    p.winner.into_iter().filter(|w| !w.is_empty()).collect()
                } else {
                    p.winners
                };
                PatternState {
                    id: p.id,
                    name: p.name,
                    description: p.description,
                    amount: p.amount,
                    status: p.status,
                    winners,
                }
            })
            .collect();

        Ok(RoundSnapshot {
            game_id,
            round_id,
            game_title: self.game_title,
            round_number: self.round_number,
            status: self.status.unwrap_or_default(),
            called_numbers: self.called_numbers,
            current_number: last,
            ticket,
            patterns,
        })
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Where round bootstraps come from.
#[async_trait]
pub trait BootstrapSource: Send + Sync {
    async fn fetch_round(
        &self,
        game_id: &GameId,
        round_id: &RoundId,
        token: &str,
    ) -> Result<RoundBootstrap, FetchError>;
}

/// Fetch and validate a round, reading the token at call time.
pub async fn fetch_snapshot(
    source: &dyn BootstrapSource,
    credentials: &dyn CredentialProvider,
    game_id: &GameId,
    round_id: &RoundId,
) -> Result<RoundSnapshot, FetchError> {
    let token = credentials.auth_token().ok_or(FetchError::MissingToken)?;
    let bootstrap = source.fetch_round(game_id, round_id, &token).await?;
    bootstrap.into_snapshot(game_id.clone(), round_id.clone())
}

/// HTTP bootstrap client.
#[derive(Debug, Clone)]
pub struct RoundApi {
    client: reqwest::Client,
    base: Url,
    path_template: String,
}

impl RoundApi {
    pub fn from_config(server: &ServerConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(server.request_timeout())
            .build()?;
        Ok(RoundApi {
            client,
            base: Url::parse(&server.api_base_url)?,
            path_template: server.bootstrap_path.clone(),
        })
    }

    pub fn round_url(&self, game_id: &GameId, round_id: &RoundId) -> Result<Url, FetchError> {
        Ok(round_url(&self.base, &self.path_template, game_id, round_id)?)
    }
}

#[async_trait]
impl BootstrapSource for RoundApi {
    async fn fetch_round(
        &self,
        game_id: &GameId,
        round_id: &RoundId,
        token: &str,
    ) -> Result<RoundBootstrap, FetchError> {
        let url = self.round_url(game_id, round_id)?;
        info!("Fetching round {} of game {}", round_id, game_id);

        let response = self.client.get(url).bearer_auth(token).send().await?;
        let status = response.status();
        if matches!(status.as_u16(), 401 | 403) {
            return Err(FetchError::Unauthorized);
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        debug!("Round bootstrap: {} bytes", body.len());
        Ok(serde_json::from_str(&body)?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::StaticCredentials;
    use std::sync::Mutex;

    const SNAKE_PAYLOAD: &str = r#"{
        "game_title": "Diwali Housie",
        "round_number": 2,
        "ticket_numbers": [
            [1, null, 25, null, 41, null, 63, null, 82],
            [null, 12, null, 34, null, 55, null, 71, null],
            [7, null, 29, null, 48, null, 66, null, 90]
        ],
        "called_numbers": [12, 7, 90],
        "status": "live",
        "patterns": [
            {"id": 1, "name": "Early Five", "amount": 500, "status": "won_by_other", "winner": "Asha"},
            {"id": 2, "name": "Full House", "description": "All 15", "amount": "5000"}
        ]
    }"#;

    const CAMEL_PAYLOAD: &str = r#"{
        "gameTitle": "Diwali Housie",
        "ticketNumbers": [],
        "calledNumbers": [3],
        "currentNumber": 3,
        "patterns": [
            {"id": "9", "patternName": "Top Line", "prizeDescription": "First row",
             "prizeAmount": 1000.0}
        ]
    }"#;

    fn ids() -> (GameId, RoundId) {
        (GameId::new("g1"), RoundId::new("r2"))
    }

    #[test]
    fn snake_case_payload_builds_snapshot() {
        let (g, r) = ids();
        let bootstrap: RoundBootstrap = serde_json::from_str(SNAKE_PAYLOAD).unwrap();
        let snap = bootstrap.into_snapshot(g, r).unwrap();

        assert_eq!(snap.game_title, "Diwali Housie");
        assert_eq!(snap.round_number, Some(2));
        assert_eq!(snap.ticket.total_numbers(), 15);
        assert_eq!(snap.called_numbers, vec![12, 7, 90]);
        assert_eq!(snap.current_number, Some(90));
        assert_eq!(snap.status, RoundStatus::Live);

        let early = snap.pattern(&PatternId::new("1")).unwrap();
        assert_eq!(early.status, PatternStatus::WonByOther);
        assert_eq!(early.winners, vec!["Asha".to_string()]);
        assert_eq!(early.amount.as_str(), "500");

        let full = snap.pattern(&PatternId::new("2")).unwrap();
        assert_eq!(full.status, PatternStatus::Pending);
        assert_eq!(full.description, "All 15");
    }

    #[test]
    fn camel_case_payload_builds_snapshot() {
        let (g, r) = ids();
        let bootstrap: RoundBootstrap = serde_json::from_str(CAMEL_PAYLOAD).unwrap();
        let snap = bootstrap.into_snapshot(g, r).unwrap();

        assert!(snap.ticket.is_blank());
        assert_eq!(snap.current_number, Some(3));
        let top = snap.pattern(&PatternId::new("9")).unwrap();
        assert_eq!(top.name, "Top Line");
        assert_eq!(top.description, "First row");
        assert_eq!(top.amount.as_str(), "1000");
    }

    #[test]
    fn malformed_ticket_is_rejected() {
        let (g, r) = ids();
        let bootstrap = RoundBootstrap {
            ticket_numbers: vec![vec![Some(1); 9]; 3],
            ..RoundBootstrap::default()
        };
        let err = bootstrap.into_snapshot(g, r).unwrap_err();
        assert!(matches!(err, FetchError::InvalidTicket(TicketError::Duplicate { number: 1 })));
        assert_eq!(err.surface(), Surface::FullPageError);
    }

    #[test]
    fn duplicate_called_numbers_are_rejected() {
        let (g, r) = ids();
        let bootstrap = RoundBootstrap {
            called_numbers: vec![4, 4],
            ..RoundBootstrap::default()
        };
        assert!(matches!(
            bootstrap.into_snapshot(g, r),
            Err(FetchError::InvalidCalledNumbers(SequenceError::Duplicate(4)))
        ));
    }

    #[test]
    fn round_url_fills_template() {
        let api = RoundApi::from_config(&ServerConfig::new("https://api.example.com")).unwrap();
        let url = api
            .round_url(&GameId::new("12"), &RoundId::new("3"))
            .unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/api/games/12/rounds/3/");
    }

    #[test]
    fn round_url_keeps_hostile_ids_inside_their_segment() {
        let api = RoundApi::from_config(&ServerConfig::new("https://api.example.com")).unwrap();
        let url = api
            .round_url(&GameId::new("../users"), &RoundId::new("3?admin=1"))
            .unwrap();
        assert_eq!(
            url.path(),
            "/api/games/..%2Fusers/rounds/3%3Fadmin=1/"
        );
        assert_eq!(url.query(), None);

        let err = api
            .round_url(&GameId::new(".."), &RoundId::new("3"))
            .unwrap_err();
        assert!(matches!(err, FetchError::Path(RoundPathError::BadSegment(_))));
        assert_eq!(err.surface(), Surface::FullPageError);
    }

    #[test]
    fn auth_failures_redirect_to_login() {
        assert_eq!(FetchError::MissingToken.surface(), Surface::RedirectToLogin);
        assert_eq!(FetchError::Unauthorized.surface(), Surface::RedirectToLogin);
        assert_eq!(
            FetchError::Status { status: 500 }.surface(),
            Surface::FullPageError
        );
    }

    struct RecordingSource {
        tokens: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl BootstrapSource for RecordingSource {
        async fn fetch_round(
            &self,
            _game_id: &GameId,
            _round_id: &RoundId,
            token: &str,
        ) -> Result<RoundBootstrap, FetchError> {
            self.tokens.lock().unwrap().push(token.to_string());
            Ok(serde_json::from_str(SNAKE_PAYLOAD)?)
        }
    }

    #[tokio::test]
    async fn fetch_snapshot_requires_token() {
        let source = RecordingSource {
            tokens: Mutex::new(Vec::new()),
        };
        let (g, r) = ids();

        let err = fetch_snapshot(&source, &StaticCredentials::anonymous(), &g, &r)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::MissingToken));
        assert!(source.tokens.lock().unwrap().is_empty());

        let snap = fetch_snapshot(&source, &StaticCredentials::new("tok", "5"), &g, &r)
            .await
            .unwrap();
        assert_eq!(snap.round_id, r);
        assert_eq!(source.tokens.lock().unwrap().as_slice(), &["tok".to_string()]);
    }
}
