//! Bearer-token extraction from requests.

use http::{header::AUTHORIZATION, HeaderMap, Uri};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Query parameters searched for a token, in order.
const TOKEN_PARAMS: [&str; 2] = ["access_token", "token"];

/// Where to look for a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenExtractor {
    /// `Authorization: Bearer <token>`
    Headers,
    /// `?access_token=<token>` or `?token=<token>`
    Params,
}

impl TokenExtractor {
    /// The extractor list used when none is configured.
    pub const DEFAULT: &'static [Self] = &[Self::Headers];

    /// Parses a configured name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "headers" => Some(Self::Headers),
            "params" => Some(Self::Params),
            _ => None,
        }
    }
}

/// Runs the extractors in order and returns the first token found.
///
/// An empty list behaves like [`TokenExtractor::DEFAULT`].
///
/// # Errors
///
/// Returns `AuthError::MalformedHeader` as soon as the header extractor
/// sees an `Authorization` value that is not exactly `Bearer <token>`;
/// later extractors are not consulted.
pub fn extract_token(
    extractors: &[TokenExtractor],
    headers: &HeaderMap,
    uri: &Uri,
) -> Result<Option<String>, AuthError> {
    let extractors = if extractors.is_empty() { TokenExtractor::DEFAULT } else { extractors };

    for extractor in extractors {
        let token = match extractor {
            TokenExtractor::Headers => from_authorization(headers)?,
            TokenExtractor::Params => from_query(uri),
        };
        if token.is_some() {
            return Ok(token);
        }
    }

    Ok(None)
}

fn from_authorization(headers: &HeaderMap) -> Result<Option<String>, AuthError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| AuthError::MalformedHeader)?;
    if value.is_empty() {
        return Ok(None);
    }

    let mut fields = value.split_whitespace();
    match (fields.next(), fields.next(), fields.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => {
            Ok(Some(token.to_string()))
        },
        _ => Err(AuthError::MalformedHeader),
    }
}

fn from_query(uri: &Uri) -> Option<String> {
    let params: Vec<(String, String)> = serde_urlencoded::from_str(uri.query()?).ok()?;

    TOKEN_PARAMS.iter().find_map(|name| {
        params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
            .filter(|value| !value.is_empty())
    })
}
