pub mod api;
pub mod app;
pub mod auth;
pub mod campaign;
pub mod config;
pub mod dashboard;
pub mod errors;
pub mod forms;
pub mod handlers;
pub mod models;
pub mod notify;
pub mod registry;
pub mod relay;
pub mod session;
pub mod state;
pub mod stats;
pub mod storage;
pub mod ui;

#[cfg(test)]
mod testing;

pub use api::{ApiClient, CrmBackend};
pub use app::router;
pub use config::{ConsoleConfig, RelayConfig};
pub use errors::{AppError, ClientError};
pub use session::Session;
pub use state::AppState;
