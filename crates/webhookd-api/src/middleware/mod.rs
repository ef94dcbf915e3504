//! HTTP middleware for authentication and request processing.

pub mod auth;
pub mod request_id;
