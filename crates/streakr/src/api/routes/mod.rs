mod admin;
mod players;
mod public;
mod system;

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use hyper::StatusCode;
use serde_json::json;
use std::borrow::Borrow;

use crate::domain::Error;

pub use admin::*;
pub use players::*;
pub use public::*;
pub use system::*;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match self.borrow() {
            Error::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            Error::BadRequest(_) | Error::Core(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            Error::InvalidTransition { .. }
            | Error::ConflictingTransition(_)
            | Error::InsufficientCredit(_) => (StatusCode::CONFLICT, self.to_string()),
            Error::PickRejected(_) => (StatusCode::LOCKED, self.to_string()),
            Error::QuotaExceeded { .. } => (StatusCode::TOO_MANY_REQUESTS, self.to_string()),
            Error::DbError(_) | Error::Thread(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                String::from("internal server error"),
            ),
        };
        let body = Json(json!({
            "error": self.kind(),
            "message": message,
        }));
        (status, body).into_response()
    }
}
