//! Shared error types

use thiserror::Error;

/// Core errors shared between server and client
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("unknown question status: {0}")]
    UnknownStatus(String),

    #[error("unknown settlement action: {0}")]
    UnknownAction(String),

    #[error("invalid pick value: {0}")]
    InvalidPick(String),

    #[error("invalid leaderboard scope: {0}")]
    InvalidScope(String),
}
