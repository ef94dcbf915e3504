//! Error types for token authentication.
//!
//! Messages are safe to return to clients: they never carry claim
//! contents or key material.

use thiserror::Error;

/// Why a request failed authentication.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No extractor produced a token and credentials are required.
    #[error("missing bearer token")]
    MissingToken,

    /// An `Authorization` header is present but not `Bearer <token>`.
    #[error("authorization header format must be Bearer {{token}}")]
    MalformedHeader,

    /// The token is structurally invalid, uses the wrong algorithm, lacks a
    /// key ID, or failed signature or time checks.
    #[error("invalid token")]
    InvalidToken,

    /// No published key matches the token's key ID, even after a refresh.
    #[error("unknown signing key")]
    UnknownKey,

    /// The `iss` claim does not match the configured issuer.
    #[error("invalid issuer")]
    InvalidIssuer,

    /// The `aud` claim does not contain the configured audience.
    #[error("invalid audience")]
    InvalidAudience,

    /// Issuer, audience or JWKS URL is not configured.
    #[error("auth not configured")]
    Misconfigured,

    /// The key set could not be refreshed.
    #[error("signing keys unavailable: {0}")]
    KeySource(#[from] KeySourceError),
}

impl AuthError {
    /// Returns whether the failure lies with the server rather than the
    /// presented credentials.
    pub const fn is_server_side(&self) -> bool {
        matches!(self, Self::Misconfigured | Self::KeySource(_))
    }
}

/// Failure to refresh the key set from its remote source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeySourceError {
    /// Transport failure, non-success status, or an undecodable document.
    #[error("JWKS fetch failed: {0}")]
    Unavailable(String),

    /// The document decoded but contained no usable RSA key.
    #[error("JWKS contained no usable keys")]
    Empty,
}

/// Invalid authentication settings, detected at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthConfigError {
    /// Some but not all of issuer, audience and JWKS URL are set.
    #[error("OAuth settings are incomplete, missing: {}", .0.join(", "))]
    Incomplete(Vec<&'static str>),

    /// A duration setting is zero.
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}
