//! webhookd HTTP API.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod server;
pub mod state;

pub use config::{Config, ServerSection};
pub use error::ApiError;
pub use server::{create_router, serve, shutdown_signal, start_server};
pub use state::{AppState, RouteProtection};
