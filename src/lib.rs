pub mod cache;
pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod services;
pub mod state;
pub mod telemetry;

pub use config::Config;
pub use error::{GatewayError, OrchestratorError, OrchestratorResult};
pub use state::AppState;
