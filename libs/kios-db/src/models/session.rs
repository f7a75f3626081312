use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::variant::GameVariant;

/// How many credential mismatches a chat gets before the conversation is
/// force-reset to the main menu.
pub const MAX_CREDENTIAL_STRIKES: i32 = 2;

/// What the bot is waiting for next from a given chat. The `none` state is
/// represented by the absence of a session row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    WaitingManualInput,
    WaitingExtendCredentials,
    WaitingExtendDuration,
    WaitingRedeemGame,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::WaitingManualInput => "waiting_manual_input",
            SessionState::WaitingExtendCredentials => "waiting_extend_credentials",
            SessionState::WaitingExtendDuration => "waiting_extend_duration",
            SessionState::WaitingRedeemGame => "waiting_redeem_game",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "waiting_manual_input" => Some(SessionState::WaitingManualInput),
            "waiting_extend_credentials" => Some(SessionState::WaitingExtendCredentials),
            "waiting_extend_duration" => Some(SessionState::WaitingExtendDuration),
            "waiting_redeem_game" => Some(SessionState::WaitingRedeemGame),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub chat_id: i64,
    pub state: SessionState,
    pub data: String,
    pub error_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MismatchOutcome {
    /// Let the user try again; carries the new strike count to persist.
    Retry(i32),
    /// Strike limit hit: clear the session entirely.
    Reset,
}

impl Session {
    /// Decide what a failed credential attempt does to this session.
    pub fn record_mismatch(&self) -> MismatchOutcome {
        let strikes = self.error_count + 1;
        if strikes >= MAX_CREDENTIAL_STRIKES {
            MismatchOutcome::Reset
        } else {
            MismatchOutcome::Retry(strikes)
        }
    }

    pub fn payload<T: for<'de> Deserialize<'de>>(&self) -> anyhow::Result<T> {
        Ok(serde_json::from_str(&self.data)?)
    }
}

// JSON payload schemas for each waiting state.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualInputData {
    pub variant: GameVariant,
    pub duration_days: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtendCredentialsData {
    pub variant: GameVariant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtendDurationData {
    pub variant: GameVariant,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedeemGameData {
    pub duration_days: i32,
    pub points_needed: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with_strikes(error_count: i32) -> Session {
        Session {
            chat_id: 1,
            state: SessionState::WaitingExtendCredentials,
            data: "{}".to_string(),
            error_count,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn first_mismatch_allows_retry() {
        assert_eq!(
            session_with_strikes(0).record_mismatch(),
            MismatchOutcome::Retry(1)
        );
    }

    #[test]
    fn second_mismatch_resets() {
        assert_eq!(
            session_with_strikes(1).record_mismatch(),
            MismatchOutcome::Reset
        );
    }

    #[test]
    fn state_round_trips() {
        for st in [
            SessionState::WaitingManualInput,
            SessionState::WaitingExtendCredentials,
            SessionState::WaitingExtendDuration,
            SessionState::WaitingRedeemGame,
        ] {
            assert_eq!(SessionState::parse(st.as_str()), Some(st));
        }
        assert_eq!(SessionState::parse("none"), None);
    }

    #[test]
    fn payload_deserializes() {
        let s = Session {
            data: r#"{"variant":"max","duration_days":7}"#.to_string(),
            ..session_with_strikes(0)
        };
        let d: ManualInputData = s.payload().unwrap();
        assert_eq!(d.variant, GameVariant::Max);
        assert_eq!(d.duration_days, 7);
    }
}
