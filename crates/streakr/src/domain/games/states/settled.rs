//! Terminal states. Only an explicit reopen (or a void of a final result)
//! moves a question out of them.

use super::{advance, HasQuestionData, Open};
use crate::domain::games::Question;
use streakr_core::{Outcome, PickChoice, QuestionStatusKind};
use uuid::Uuid;

/// Settled with a yes/no result that picks are scored against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Final {
    pub question_id: Uuid,
    pub result: PickChoice,
    pub(crate) question: Question,
}

impl Final {
    pub fn from_question(question: Question, result: PickChoice) -> Self {
        Self {
            question_id: question.id,
            result,
            question,
        }
    }

    /// Corrects a result that should never have counted.
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

impl HasQuestionData for Final {
    fn question(&self) -> &Question {
        &self.question
    }

    fn into_question(self) -> Question {
        self.question
    }
}

/// Voided for everyone, the question never touches a streak.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voided {
    pub question_id: Uuid,
    pub(crate) question: Question,
}

impl Voided {
    pub fn from_question(question: Question) -> Self {
        Self {
            question_id: question.id,
            question,
        }
    }

    pub fn reopen(self) -> Open {
        Open::from_question(advance(self.question, QuestionStatusKind::Open, None))
    }
}

impl HasQuestionData for Voided {
    fn question(&self) -> &Question {
        &self.question
    }

    fn into_question(self) -> Question {
        self.question
    }
}
