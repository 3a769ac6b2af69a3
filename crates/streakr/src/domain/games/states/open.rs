//! Open state - the question takes picks until its game locks.

use super::{advance, HasQuestionData, Final, Pending, Voided};
use crate::domain::games::Question;
use streakr_core::{Outcome, PickChoice, QuestionStatusKind};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Open {
    pub question_id: Uuid,
    pub(crate) question: Question,
}

impl Open {
    pub fn from_question(question: Question) -> Self {
        Self {
            question_id: question.id,
            question,
        }
    }

    pub fn lock(self) -> Pending {
        Pending::from_question(advance(self.question, QuestionStatusKind::Pending, None))
    }

    /// Results sometimes land before anyone locked the question, settle straight away.
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
}

impl HasQuestionData for Open {
    fn question(&self) -> &Question {
        &self.question
    }

    fn into_question(self) -> Question {
        self.question
    }
}
