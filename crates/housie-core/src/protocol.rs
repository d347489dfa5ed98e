// Wire protocol and internal message types.
//
// Inbound frames pushed over the round channel, the single outbound command,
// and the messages exchanged between the controller loop and the TUI.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::round::winners::{Notice, WinnerModal};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Scalar as it appears on the wire. The backend is inconsistent about
/// quoting ids and amounts, so `3`, `3.0` and `"3"` all normalize to `"3"`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawScalar {
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<RawScalar> for String {
    fn from(raw: RawScalar) -> Self {
        match raw {
            RawScalar::Int(n) => n.to_string(),
            RawScalar::Float(f) if f.fract() == 0.0 => format!("{f:.0}"),
            RawScalar::Float(f) => f.to_string(),
            RawScalar::Text(s) => s,
        }
    }
}

macro_rules! scalar_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
        #[serde(from = "RawScalar")]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                $name(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<RawScalar> for $name {
            fn from(raw: RawScalar) -> Self {
                $name(String::from(raw))
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                $name(value.to_string())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

scalar_newtype!(
    /// Stable identifier of a hosted game.
    GameId
);
scalar_newtype!(
    /// Stable identifier of one round within a game.
    RoundId
);
scalar_newtype!(
    /// Identifier of a prize pattern within a round.
    PatternId
);
scalar_newtype!(
    /// Identifier of a registered player.
    PlayerId
);
scalar_newtype!(
    /// Prize amount. Opaque to the client: kept as text for display only.
    Amount
);

// ---------------------------------------------------------------------------
// Round status
// ---------------------------------------------------------------------------

/// Lifecycle status of a round as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    /// Registration open, no numbers called yet.
    Join,
    #[default]
    Live,
    Paused,
    #[serde(alias = "completed")]
    Ended,
    /// Any status string this client does not know about.
    #[serde(other)]
    Other,
}

impl RoundStatus {
    pub fn label(self) -> &'static str {
        match self {
            RoundStatus::Join => "Open for joining",
            RoundStatus::Live => "Game in Progress",
            RoundStatus::Paused => "Paused",
            RoundStatus::Ended => "Round Completed",
            RoundStatus::Other => "Unknown",
        }
    }
}

// ---------------------------------------------------------------------------
// Inbound channel frames
// ---------------------------------------------------------------------------

/// One raw message pushed by the backend over the round channel.
///
/// Every field is optional and a single frame may carry several of them:
/// a number call (`number` + `called_numbers`), a resync (`called_numbers`
/// alone), a winner announcement, a server error, and a status flip.
///
/// Numbers are kept as wire integers so one bad value only loses the number
/// branch; the reconciler narrows them to `1..=90`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ServerFrame {
    #[serde(default)]
    pub number: Option<i64>,
    #[serde(default)]
    pub called_numbers: Option<Vec<i64>>,
    #[serde(default)]
    pub winners: Option<Vec<WinnerGroup>>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub status: Option<RoundStatus>,
}

/// Winners announced for a single pattern.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WinnerGroup {
    pub pattern_id: PatternId,
    #[serde(default)]
    pub pattern_name: String,
    #[serde(default)]
    pub winners: Vec<WinnerEntry>,
}

/// One player credited with a pattern.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WinnerEntry {
    pub player_id: PlayerId,
    #[serde(default)]
    pub player_name: String,
    #[serde(default)]
    pub amount: Option<Amount>,
}

// ---------------------------------------------------------------------------
// Outbound commands
// ---------------------------------------------------------------------------

/// Commands the client may send over the round channel.
///
/// Serialized as `{"action": "generate_number"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Ask the backend to draw the next number (creator only).
    GenerateNumber,
}

// ---------------------------------------------------------------------------
// Controller <-> TUI messages
// ---------------------------------------------------------------------------

/// Whose view this is. Only creators may advance the round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    #[default]
    Player,
    Creator,
}

/// State of the round channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    Connected,
    #[default]
    Disconnected,
}

/// Top-level state of the round view.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ViewPhase {
    /// Bootstrap fetch or channel handshake in flight.
    #[default]
    Loading,
    /// Bootstrap failed; the message is shown with a retry action.
    Error(String),
    /// Snapshot available; the channel may be up or down.
    Ready,
    /// Terminal: the backend reported the round as ended.
    RoundEnded,
}

/// Actions requested by the user from the TUI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCommand {
    /// Ask the backend for the next number (creator only).
    GenerateNumber,
    /// Remount the round: refetch the bootstrap and reopen the channel.
    Retry,
    Quit,
}

/// Transient updates pushed from the controller loop to the TUI.
///
/// Snapshot changes do not travel here; they are published through the
/// round store's watch channel.
#[derive(Debug, Clone, PartialEq)]
pub enum UiUpdate {
    Phase(ViewPhase),
    ConnectionStatus(ConnectionStatus),
    Notice(Notice),
    WinnerModal(WinnerModal),
    /// Credentials are missing or were rejected; hand off to the login flow.
    RedirectToLogin,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_call_frame_parses() {
        let frame: ServerFrame =
            serde_json::from_str(r#"{"number": 42, "called_numbers": [7, 42]}"#).unwrap();
        assert_eq!(frame.number, Some(42));
        assert_eq!(frame.called_numbers, Some(vec![7, 42]));
        assert!(frame.winners.is_none());
        assert!(frame.error.is_none());
    }

    #[test]
    fn out_of_range_numbers_keep_the_rest_of_the_frame() {
        let raw = r#"{"number": 300, "called_numbers": [7, 300], "error": "late",
            "winners": [{"pattern_id": 1, "pattern_name": "Top Line",
                         "winners": [{"player_id": 9, "player_name": "A"}]}]}"#;
        let frame: ServerFrame = serde_json::from_str(raw).unwrap();
        assert_eq!(frame.number, Some(300));
        assert_eq!(frame.called_numbers, Some(vec![7, 300]));
        assert_eq!(frame.error.as_deref(), Some("late"));
        assert_eq!(frame.winners.map(|w| w.len()), Some(1));
    }

    #[test]
    fn resync_frame_has_no_number() {
        let frame: ServerFrame = serde_json::from_str(r#"{"called_numbers": [1, 4, 17]}"#).unwrap();
        assert!(frame.number.is_none());
        assert_eq!(frame.called_numbers, Some(vec![1, 4, 17]));
    }

    #[test]
    fn winner_frame_accepts_numeric_and_string_ids() {
        let raw = r#"{"winners": [
            {"pattern_id": 3, "pattern_name": "Four Corners",
             "winners": [{"player_id": 9, "player_name": "A", "amount": 2000}]},
            {"pattern_id": "4", "pattern_name": "Full House",
             "winners": [{"player_id": "11", "player_name": "B", "amount": "10000"}]}
        ]}"#;
        let frame: ServerFrame = serde_json::from_str(raw).unwrap();
        let groups = frame.winners.unwrap();
        assert_eq!(groups[0].pattern_id, PatternId::new("3"));
        assert_eq!(groups[0].winners[0].player_id, PlayerId::new("9"));
        assert_eq!(groups[0].winners[0].amount, Some(Amount::new("2000")));
        assert_eq!(groups[1].pattern_id, PatternId::new("4"));
        assert_eq!(groups[1].winners[0].amount, Some(Amount::new("10000")));
    }

    #[test]
    fn float_amount_without_fraction_prints_as_integer() {
        let entry: WinnerEntry =
            serde_json::from_str(r#"{"player_id": 1, "amount": 2500.0}"#).unwrap();
        assert_eq!(entry.amount.unwrap().as_str(), "2500");
    }

    #[test]
    fn error_frame_parses() {
        let frame: ServerFrame = serde_json::from_str(r#"{"error": "Round not live"}"#).unwrap();
        assert_eq!(frame.error.as_deref(), Some("Round not live"));
        assert!(frame.called_numbers.is_none());
    }

    #[test]
    fn unknown_status_maps_to_other() {
        let frame: ServerFrame = serde_json::from_str(r#"{"status": "archived"}"#).unwrap();
        assert_eq!(frame.status, Some(RoundStatus::Other));
        let frame: ServerFrame = serde_json::from_str(r#"{"status": "completed"}"#).unwrap();
        assert_eq!(frame.status, Some(RoundStatus::Ended));
    }

    #[test]
    fn out_of_range_number_is_rejected() {
        let result: Result<ServerFrame, _> = serde_json::from_str(r#"{"number": 300}"#);
        assert!(result.is_err());
    }

    #[test]
    fn generate_number_serializes_as_action() {
        let json = serde_json::to_string(&ClientCommand::GenerateNumber).unwrap();
        assert_eq!(json, r#"{"action":"generate_number"}"#);
    }
}
