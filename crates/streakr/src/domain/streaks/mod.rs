//! Streak calculation
//!
//! A player's streak is never stored as the source of truth. It is derived
//! from scratch, game by game, from their picks and the settlement state of
//! each picked question:
//!
//! - games the player did not pick in are skipped
//! - a game with any unsettled pick stops the walk, nothing after it counts yet
//! - a game with a wrong pick resets the streak to 0 unless a Free Kick covers it;
//!   once a reset is recorded the game stays broken, later credits don't reach back
//! - otherwise the streak grows by the number of correct picks

mod service;
mod store;

pub use service::*;
pub use store::*;

use serde::{Deserialize, Serialize};
use streakr_core::{Outcome, PickChoice, QuestionStatusKind};
use time::OffsetDateTime;
use uuid::Uuid;

/// One question a player picked, with the question's settlement state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickedQuestion {
    pub question_id: Uuid,
    pub status: QuestionStatusKind,
    pub outcome: Option<Outcome>,
    pub pick: PickChoice,
    /// Panic voided by this player
    pub personally_voided: bool,
}

/// Everything the calculator needs to know about one game for one player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameHistory {
    pub game_id: Uuid,
    pub round_id: Uuid,
    pub start_time: OffsetDateTime,
    pub picks: Vec<PickedQuestion>,
    /// A Free Kick is already recorded against this game
    pub free_kick_used: bool,
    /// An earlier recomputation already judged this game broken
    pub reset_recorded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Correct,
    Wrong,
    Voided,
    Unsettled,
}

pub fn classify(question: &PickedQuestion) -> Classification {
    if question.personally_voided {
        return Classification::Voided;
    }
    match (question.status, question.outcome) {
        (QuestionStatusKind::Open | QuestionStatusKind::Pending, _) => Classification::Unsettled,
        (QuestionStatusKind::Void, _) | (_, Some(Outcome::Void)) => Classification::Voided,
        (QuestionStatusKind::Final, Some(outcome)) if outcome.matches(question.pick) => {
            Classification::Correct
        }
        (QuestionStatusKind::Final, Some(_)) => Classification::Wrong,
        // final without an outcome never leaves the store, treat it as not yet known
        (QuestionStatusKind::Final, None) => Classification::Unsettled,
    }
}

/// What a game did to the running streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameVerdict {
    /// Only voided picks, nothing changes
    Neutral,
    CleanSweep,
    /// Wrong pick, streak back to 0
    Broken,
    /// Wrong pick covered by a Free Kick
    Insured,
    /// Has unsettled picks
    Pending,
    /// Comes after a pending game and is not counted yet
    Waiting,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResult {
    pub game_id: Uuid,
    pub round_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    pub verdict: GameVerdict,
    pub correct: u32,
    pub wrong: u32,
    pub voided: u32,
    pub unsettled: u32,
    /// Unknown until every pick in this game and the ones before it are settled
    pub streak_after: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakOutcome {
    pub current: u32,
    /// Highest value the streak reached during this walk
    pub longest: u32,
    pub pending_game_id: Option<Uuid>,
    pub games: Vec<GameResult>,
    /// Games where an available credit was consumed, not yet persisted
    pub new_free_kicks: Vec<Uuid>,
    /// Broken games whose reset is not recorded yet
    pub new_resets: Vec<Uuid>,
}

/// Walks a player's games in start order and derives their streak.
///
/// `available_credits` is how many new Free Kicks may be consumed. Recorded
/// uses (`GameHistory::free_kick_used`) are always honoured and cost nothing.
pub fn calculate_streak(mut games: Vec<GameHistory>, available_credits: u32) -> StreakOutcome {
    games.sort_by(|a, b| {
        a.start_time
            .cmp(&b.start_time)
            .then_with(|| a.game_id.cmp(&b.game_id))
    });

    let mut outcome = StreakOutcome::default();
    let mut credits = available_credits;
    let mut streak: u32 = 0;

    for game in games.into_iter().filter(|game| !game.picks.is_empty()) {
        let mut result = GameResult {
            game_id: game.game_id,
            round_id: game.round_id,
            start_time: game.start_time,
            verdict: GameVerdict::Waiting,
            correct: 0,
            wrong: 0,
            voided: 0,
            unsettled: 0,
            streak_after: None,
        };

        for question in &game.picks {
            match classify(question) {
                Classification::Correct => result.correct += 1,
                Classification::Wrong => result.wrong += 1,
                Classification::Voided => result.voided += 1,
                Classification::Unsettled => result.unsettled += 1,
            }
        }

        if outcome.pending_game_id.is_some() {
            outcome.games.push(result);
            continue;
        }

        if result.unsettled > 0 {
            result.verdict = GameVerdict::Pending;
            outcome.pending_game_id = Some(game.game_id);
            outcome.games.push(result);
            continue;
        }

        if result.wrong > 0 {
            if game.free_kick_used {
                result.verdict = GameVerdict::Insured;
            } else if credits > 0 && !game.reset_recorded {
                credits -= 1;
                outcome.new_free_kicks.push(game.game_id);
                result.verdict = GameVerdict::Insured;
            } else {
                if !game.reset_recorded {
                    outcome.new_resets.push(game.game_id);
                }
                streak = 0;
                result.verdict = GameVerdict::Broken;
            }
        } else if result.correct > 0 {
            streak += result.correct;
            result.verdict = GameVerdict::CleanSweep;
        } else {
            result.verdict = GameVerdict::Neutral;
        }

        outcome.longest = outcome.longest.max(streak);
        result.streak_after = Some(streak);
        outcome.games.push(result);
    }

    outcome.current = streak;
    outcome
}
