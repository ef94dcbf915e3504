//! Bearer-token authentication for webhookd.
//!
//! Tokens are RS256 JWTs whose signing keys are published as X.509
//! certificates in a remote JWKS document. The pieces, leaf first:
//!
//! - [`KeyCache`] fetches and caches the key set with a time-to-live
//! - [`TokenVerifier`] checks signature, issuer and audience
//! - [`AuthGate`] adds token extraction and per-request policy

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod claims;
pub mod error;
pub mod extract;
pub mod gate;
pub mod jwks;
pub mod verifier;

pub use claims::{Audience, VerifiedClaims};
pub use error::{AuthConfigError, AuthError, KeySourceError};
pub use extract::{extract_token, TokenExtractor};
pub use gate::{AuthConfig, AuthGate, AuthOutcome};
pub use jwks::{KeyCache, DEFAULT_CACHE_TTL, DEFAULT_FETCH_TIMEOUT};
pub use verifier::TokenVerifier;
