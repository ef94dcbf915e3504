//! Test infrastructure for deterministic authentication and registry tests.
//!
//! Provides fixture RSA key pairs with self-signed certificates, a token
//! builder that signs with them, and a wiremock-backed JWKS endpoint.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod fixtures;
pub mod jwks;
pub mod tokens;

pub use fixtures::{ec_certificate_x5c, KeyPair};
pub use jwks::{jwk_entry, jwks_document, JwksServer};
pub use tokens::TokenBuilder;
pub use webhookd_core::{Clock, TestClock};

/// Issuer used by default in minted tokens.
pub const TEST_ISSUER: &str = "https://issuer.webhookd.test/";

/// Audience used by default in minted tokens.
pub const TEST_AUDIENCE: &str = "webhookd-api";
