//! streakr-core: Shared types for the streakr service and its clients
//!
//! Everything in here is free of I/O so the same vocabulary can be used by the
//! server, admin tooling and any browser client.

pub mod errors;
pub mod types;
pub mod validation;

pub use errors::*;
pub use types::*;
pub use validation::*;
