pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod response;
pub mod router;
pub mod state;
pub mod study;
pub mod tracing;
pub mod validation;

pub use config::ApiConfig;
pub use state::{ApiState, AuthConfig};
