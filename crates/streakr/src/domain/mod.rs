mod commissioner;
#[cfg(test)]
pub(crate) mod fixtures;
pub mod games;
pub mod insurance;
pub mod leaderboard;
pub mod picks;
pub mod players;
pub mod streaks;

pub use commissioner::*;
pub use games::*;
pub use insurance::*;
pub use leaderboard::*;
pub use picks::*;
pub use players::*;
pub use streaks::*;

use streakr_core::{CoreError, QuestionStatusKind, SettlementAction};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum Error {
    #[error("item not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("cannot {action} question {question_id} while it is {status}")]
    InvalidTransition {
        question_id: Uuid,
        action: SettlementAction,
        status: QuestionStatusKind,
    },
    #[error("question {0} was changed by another request, refetch and retry")]
    ConflictingTransition(Uuid),
    #[error("question {0} is locked and no longer accepts picks")]
    PickRejected(Uuid),
    #[error("player {0} has no free kick credit left")]
    InsufficientCredit(String),
    #[error("player {player_id} already used their personal void for round {round_id}")]
    QuotaExceeded { player_id: String, round_id: Uuid },
    #[error("invalid input: {0}")]
    Core(#[from] CoreError),
    #[error("problem querying db: {0}")]
    DbError(#[from] sqlx::Error),
    #[error("background thread died: {0}")]
    Thread(String),
}

impl Error {
    /// Stable machine readable name, returned to API callers next to the message.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "not_found",
            Error::BadRequest(_) | Error::Core(_) => "bad_request",
            Error::InvalidTransition { .. } => "invalid_transition",
            Error::ConflictingTransition(_) => "conflicting_transition",
            Error::PickRejected(_) => "pick_rejected",
            Error::InsufficientCredit(_) => "insufficient_credit",
            Error::QuotaExceeded { .. } => "quota_exceeded",
            Error::DbError(_) | Error::Thread(_) => "internal",
        }
    }
}
