//! Typestate machine for question settlement.
//!
//! Each status is its own struct. Transitions consume `self` and return the
//! next state, so an illegal move (locking a final question, settling a void
//! one) has no method to call.
//!
//! # State Flow
//!
//! ```text
//! Open ──lock──→ Pending
//!  │                │
//!  ├──settle────────┴──settle──→ Final
//!  │                │              │
//!  └──void──────────┴──void──────→ Voided ←── void (from Final)
//!
//! Pending, Final and Voided go back to Open through reopen.
//! ```

mod open;
mod pending;
mod settled;

pub use open::*;
pub use pending::*;
pub use settled::*;

use crate::domain::{games::Question, Error};
use std::fmt;
use streakr_core::{Outcome, PickChoice, QuestionStatusKind, SettlementAction};
use time::OffsetDateTime;
use uuid::Uuid;

/// Wrapper enum used when the state of a question is only known at runtime,
/// i.e. right after it is loaded from the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionState {
    Open(Open),
    Pending(Pending),
    Final(Final),
    Voided(Voided),
}

/// Result of applying an action. `Unchanged` is an idempotent repeat and
/// must not be written back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Changed(QuestionState),
    Unchanged(QuestionState),
}

impl Transition {
    pub fn is_changed(&self) -> bool {
        matches!(self, Transition::Changed(_))
    }

    pub fn state(&self) -> &QuestionState {
        match self {
            Transition::Changed(state) | Transition::Unchanged(state) => state,
        }
    }

    pub fn into_state(self) -> QuestionState {
        match self {
            Transition::Changed(state) | Transition::Unchanged(state) => state,
        }
    }
}

impl QuestionState {
    pub fn question_id(&self) -> Uuid {
        self.question().id
    }

    pub fn kind(&self) -> QuestionStatusKind {
        match self {
            Self::Open(_) => QuestionStatusKind::Open,
            Self::Pending(_) => QuestionStatusKind::Pending,
            Self::Final(_) => QuestionStatusKind::Final,
            Self::Voided(_) => QuestionStatusKind::Void,
        }
    }

    pub fn question(&self) -> &Question {
        match self {
            Self::Open(s) => s.question(),
            Self::Pending(s) => s.question(),
            Self::Final(s) => s.question(),
            Self::Voided(s) => s.question(),
        }
    }

    pub fn into_question(self) -> Question {
        match self {
            Self::Open(s) => s.into_question(),
            Self::Pending(s) => s.into_question(),
            Self::Final(s) => s.into_question(),
            Self::Voided(s) => s.into_question(),
        }
    }

    /// Whether the question already sits where `action` would take it.
    pub fn satisfies(&self, action: SettlementAction) -> bool {
        match (self, action) {
            (Self::Pending(_), SettlementAction::Lock) => true,
            (Self::Final(s), SettlementAction::Settle(choice)) => s.result == choice,
            (Self::Voided(_), SettlementAction::Void) => true,
            (Self::Open(_), SettlementAction::Reopen) => true,
            _ => false,
        }
    }

    pub fn apply(self, action: SettlementAction) -> Result<Transition, Error> {
        use SettlementAction::*;

        let transition = match (self, action) {
            (Self::Open(s), Lock) => Transition::Changed(Self::Pending(s.lock())),
            (Self::Open(s), Settle(choice)) => Transition::Changed(Self::Final(s.settle(choice))),
            (Self::Open(s), Void) => Transition::Changed(Self::Voided(s.void())),
            (Self::Open(s), Reopen) => Transition::Unchanged(Self::Open(s)),

            (Self::Pending(s), Settle(choice)) => {
                Transition::Changed(Self::Final(s.settle(choice)))
            }
            (Self::Pending(s), Void) => Transition::Changed(Self::Voided(s.void())),
            (Self::Pending(s), Reopen) => Transition::Changed(Self::Open(s.reopen())),

            (Self::Final(s), Settle(choice)) if s.result == choice => {
                Transition::Unchanged(Self::Final(s))
            }
            (Self::Final(s), Void) => Transition::Changed(Self::Voided(s.void())),
            (Self::Final(s), Reopen) => Transition::Changed(Self::Open(s.reopen())),

            (Self::Voided(s), Void) => Transition::Unchanged(Self::Voided(s)),
            (Self::Voided(s), Reopen) => Transition::Changed(Self::Open(s.reopen())),

            (state, action) => {
                return Err(Error::InvalidTransition {
                    question_id: state.question_id(),
                    action,
                    status: state.kind(),
                })
            }
        };

        Ok(transition)
    }
}

impl fmt::Display for QuestionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind())
    }
}

pub trait HasQuestionData {
    fn question(&self) -> &Question;

    fn into_question(self) -> Question;
}

impl From<Question> for QuestionState {
    fn from(question: Question) -> Self {
        match (question.status, question.outcome) {
            (QuestionStatusKind::Open, _) => Self::Open(Open::from_question(question)),
            (QuestionStatusKind::Pending, _) => Self::Pending(Pending::from_question(question)),
            (QuestionStatusKind::Final, Some(Outcome::Yes)) => {
                Self::Final(Final::from_question(question, PickChoice::Yes))
            }
            (QuestionStatusKind::Final, Some(Outcome::No)) => {
                Self::Final(Final::from_question(question, PickChoice::No))
            }
            // FromRow refuses rows breaking the outcome invariant, anything left is void
            (QuestionStatusKind::Final, _) | (QuestionStatusKind::Void, _) => {
                Self::Voided(Voided::from_question(question))
            }
        }
    }
}

/// Move the question data into `status`, bumping the version the store will
/// compare against.
pub(crate) fn advance(
    mut question: Question,
    status: QuestionStatusKind,
    outcome: Option<Outcome>,
) -> Question {
    question.status = status;
    question.outcome = outcome;
    question.version += 1;
    question.updated_at = OffsetDateTime::now_utc();
    question
}
