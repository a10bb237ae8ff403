//! HTTP node for the proof-of-work ledger: shared state, routes and config.

pub mod api;
pub mod config;
pub mod error;
pub mod state;

mod constants;

pub use api::router;
pub use config::Args;
pub use error::ApiError;
pub use state::{AppState, MiningOptions};
