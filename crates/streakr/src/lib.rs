pub mod api;
pub mod config;
pub mod domain;
pub mod infra;
pub mod startup;

pub use config::*;
pub use domain::{Commissioner, Error as StreakrError};
pub use infra::clock::*;
pub use infra::db::*;
pub use startup::*;
