//! HTTP request handlers.
//!
//! - `health` - liveness check
//! - `webhooks` - hook registration and deactivation
//! - `hooks` - hook invocation and replay
//! - `debug` - route listing and token echo

pub mod debug;
pub mod health;
pub mod hooks;
pub mod webhooks;

pub use debug::{list_routes, private_message};
pub use health::health_check;
pub use hooks::invoke_hook;
pub use webhooks::{create_webhook, deactivate_webhook};
