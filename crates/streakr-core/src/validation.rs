//! Boundary normalization and validation shared between server and client
//!
//! Several generations of clients sent different spellings for the same
//! thing (`locked` vs `pending`, `final_yes` vs `settle` + `yes`). All of them
//! are translated here, once, into the canonical types.

use std::str::FromStr;

use uuid::Uuid;

use crate::{
    CoreError, LeaderboardScope, Outcome, PickChoice, PickCommand, QuestionStatusKind,
    SettlementAction, SettlementCommand, MAX_QUARTER,
};

impl FromStr for QuestionStatusKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "pending" | "locked" => Ok(Self::Pending),
            "final" | "settled" => Ok(Self::Final),
            "void" | "voided" => Ok(Self::Void),
            _ => Err(CoreError::UnknownStatus(s.to_string())),
        }
    }
}

impl FromStr for PickChoice {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yes" => Ok(Self::Yes),
            "no" => Ok(Self::No),
            _ => Err(CoreError::InvalidPick(s.to_string())),
        }
    }
}

impl FromStr for Outcome {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "void" | "voided" => Ok(Self::Void),
            other => other.parse::<PickChoice>().map(Outcome::from),
        }
    }
}

impl FromStr for LeaderboardScope {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let scope = s.trim();
        match scope.to_ascii_lowercase().as_str() {
            "" | "overall" => return Ok(Self::Overall),
            "finals" => return Ok(Self::Finals),
            _ => {}
        }

        scope
            .strip_prefix("round:")
            .and_then(|id| Uuid::parse_str(id).ok())
            .map(Self::Round)
            .ok_or_else(|| CoreError::InvalidScope(s.to_string()))
    }
}

/// Translate an admin action (any known spelling) into a [`SettlementAction`].
///
/// An outcome is required for `settle` and refused for every other action.
/// The legacy `final_yes` / `final_no` actions carry their outcome in the
/// action name itself.
pub fn normalize_settlement_action(
    action: &str,
    outcome: Option<&str>,
) -> Result<SettlementAction, CoreError> {
    let action = action.trim().to_ascii_lowercase();
    let outcome = outcome.map(str::trim).filter(|o| !o.is_empty());

    let normalized = match action.as_str() {
        "lock" | "locked" | "pending" => SettlementAction::Lock,
        "void" | "voided" => SettlementAction::Void,
        "reopen" | "open" => SettlementAction::Reopen,
        "final_yes" => SettlementAction::Settle(PickChoice::Yes),
        "final_no" => SettlementAction::Settle(PickChoice::No),
        "settle" | "final" => {
            let outcome = outcome.ok_or_else(|| {
                CoreError::Validation("outcome is required to settle a question".into())
            })?;
            return Ok(SettlementAction::Settle(outcome.parse()?));
        }
        _ => return Err(CoreError::UnknownAction(action)),
    };

    if let Some(outcome) = outcome {
        // final_yes + "yes" is redundant but harmless; anything else is a caller bug
        let agrees = matches!(normalized, SettlementAction::Settle(choice) if choice.as_str() == outcome.to_ascii_lowercase());
        if !agrees {
            return Err(CoreError::Validation(format!(
                "outcome {} is not allowed with action {}",
                outcome, action
            )));
        }
    }

    Ok(normalized)
}

impl SettlementCommand {
    pub fn normalize(&self) -> Result<SettlementAction, CoreError> {
        normalize_settlement_action(&self.action, self.outcome.as_deref())
    }
}

impl PickCommand {
    /// `None` means the pick should be cleared.
    pub fn choice(&self) -> Result<Option<PickChoice>, CoreError> {
        match self.outcome.as_deref().map(str::trim) {
            None | Some("") | Some("null") | Some("none") => Ok(None),
            Some(value) => value.parse().map(Some),
        }
    }
}

pub fn validate_quarter(quarter: u8) -> Result<(), CoreError> {
    if quarter > MAX_QUARTER {
        return Err(CoreError::Validation(format!(
            "quarter must be between 0 (full game) and {}, got {}",
            MAX_QUARTER, quarter
        )));
    }
    Ok(())
}

pub fn validate_question_text(text: &str) -> Result<(), CoreError> {
    if text.trim().is_empty() {
        return Err(CoreError::Validation("question text cannot be empty".into()));
    }
    Ok(())
}

pub fn validate_display_name(display_name: &str) -> Result<(), CoreError> {
    let trimmed = display_name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("display name cannot be empty".into()));
    }
    if trimmed.chars().count() > 40 {
        return Err(CoreError::Validation(
            "display name cannot be longer than 40 characters".into(),
        ));
    }
    Ok(())
}
