pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod telemetry;
pub mod utils;
#[cfg(test)]
mod tests;

pub use api::ApiClient;
pub use config::{ClientConfig, StoreBackend};
pub use db::{KeyValueStore, MemoryStore, TokenStore};
pub use error::{ApiError, AuthError, BoardError, FieldErrors, StoreError};
pub use models::jwt::TokenPair;
pub use services::session::SessionManager;
pub use services::task_board::{RankChange, RankStanding, SortOrder, TaskBoard, deletion_penalty};
pub use services::token_gate::TokenGate;
pub use tokio_util::sync::CancellationToken;
