//! Pending state - locked, waiting on the result.

use super::{advance, HasQuestionData, Final, Open, Voided};
use crate::domain::games::Question;
use streakr_core::{Outcome, PickChoice, QuestionStatusKind};
use uuid::Uuid;

/// Picks are frozen. Stored as `pending`, older clients call this `locked`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pending {
    pub question_id: Uuid,
    pub(crate) question: Question,
}

impl Pending {
    pub fn from_question(question: Question) -> Self {
        Self {
            question_id: question.id,
            question,
        }
    }

    pub fn settle(self, result: PickChoice) -> Final {
        Final::from_question(
            advance(self.question, QuestionStatusKind::Final, Some(result.into())),
            result,
        )
    }

    pub fn void(self) -> Voided {
        Voided::from_question(advance(
            self.question,
            QuestionStatusKind::Void,
            Some(Outcome::Void),
        ))
    }

    pub fn reopen(self) -> Open {
        Open::from_question(advance(self.question, QuestionStatusKind::Open, None))
    }
}

impl HasQuestionData for Pending {
    fn question(&self) -> &Question {
        &self.question
    }

    fn into_question(self) -> Question {
        self.question
    }
}
