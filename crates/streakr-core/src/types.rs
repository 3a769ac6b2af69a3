//! Shared types between the streakr service and its clients

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Quarter value used for questions about the whole game rather than one quarter.
pub const FULL_GAME_QUARTER: u8 = 0;
pub const MAX_QUARTER: u8 = 4;

/// Personal voids a player may spend in a single round.
pub const PANIC_VOIDS_PER_ROUND: u32 = 1;

/// What a player predicts for a question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickChoice {
    Yes,
    No,
}

impl PickChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            PickChoice::Yes => "yes",
            PickChoice::No => "no",
        }
    }
}

impl fmt::Display for PickChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored status of a question.
///
/// `Pending` means locked and awaiting a result. Older documents call this
/// state `locked`, which is accepted as an alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionStatusKind {
    Open,
    #[serde(alias = "locked")]
    Pending,
    #[serde(alias = "settled")]
    Final,
    #[serde(alias = "voided")]
    Void,
}

impl QuestionStatusKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Pending => "pending",
            Self::Final => "final",
            Self::Void => "void",
        }
    }

    /// Final and void questions carry an outcome; open and pending ones never do.
    pub fn has_outcome(&self) -> bool {
        matches!(self, Self::Final | Self::Void)
    }
}

impl fmt::Display for QuestionStatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result assigned to a question by settlement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Yes,
    No,
    Void,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Yes => "yes",
            Outcome::No => "no",
            Outcome::Void => "void",
        }
    }

    /// Whether a pick agrees with this outcome. A void outcome agrees with nothing.
    pub fn matches(&self, pick: PickChoice) -> bool {
        matches!(
            (self, pick),
            (Outcome::Yes, PickChoice::Yes) | (Outcome::No, PickChoice::No)
        )
    }
}

impl From<PickChoice> for Outcome {
    fn from(choice: PickChoice) -> Self {
        match choice {
            PickChoice::Yes => Outcome::Yes,
            PickChoice::No => Outcome::No,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical admin settlement vocabulary, produced by
/// [`crate::normalize_settlement_action`] from whatever the caller sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementAction {
    Lock,
    Settle(PickChoice),
    Void,
    Reopen,
}

impl SettlementAction {
    pub fn name(&self) -> &'static str {
        match self {
            SettlementAction::Lock => "lock",
            SettlementAction::Settle(_) => "settle",
            SettlementAction::Void => "void",
            SettlementAction::Reopen => "reopen",
        }
    }
}

impl fmt::Display for SettlementAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettlementAction::Settle(outcome) => write!(f, "settle({})", outcome),
            other => f.write_str(other.name()),
        }
    }
}

/// Admin settlement request body. The question id travels in the path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementCommand {
    pub action: String,
    #[serde(default)]
    pub outcome: Option<String>,
}

/// What a settlement call left behind in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementResult {
    pub question_id: Uuid,
    pub status: QuestionStatusKind,
    pub outcome: Option<Outcome>,
    pub version: i64,
    /// False when the call was an idempotent repeat and nothing was written.
    pub changed: bool,
}

/// Player pick request body; a null outcome clears the pick.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PickCommand {
    #[serde(default)]
    pub outcome: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanicVoidCommand {
    pub question_id: Uuid,
}

/// Admin override for whether a game accepts picks, independent of its start time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameLockCommand {
    pub is_unlocked_for_picks: bool,
}

/// Which games a leaderboard covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LeaderboardScope {
    #[default]
    Overall,
    Round(Uuid),
    Finals,
}

impl fmt::Display for LeaderboardScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeaderboardScope::Overall => f.write_str("overall"),
            LeaderboardScope::Round(round_id) => write!(f, "round:{}", round_id),
            LeaderboardScope::Finals => f.write_str("finals"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub player_id: String,
    pub display_name: String,
    pub rank: u32,
    pub streak: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardResponse {
    pub scope: String,
    pub entries: Vec<LeaderboardEntry>,
    /// The requesting player's own row when it did not make the top entries
    pub player_entry: Option<LeaderboardEntry>,
}
